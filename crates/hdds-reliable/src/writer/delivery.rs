// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data path: history insert, per-reader delivery, GAPs, ack bookkeeping.

use std::sync::Arc;

use super::{Destination, ProxyRef, WriterInner, WriterSubmessage};
use crate::reliability::{
    ChangeForReader, ChangeStatus, DataFragMsg, DataMsg, GapMsg, RtpsRange, WriteHistory,
};
use crate::types::{
    CacheChange, ChangeKind, InstanceHandle, SequenceNumber, SEQUENCE_NUMBER_UNKNOWN,
};
use crate::Result;

/// Outcome of sending one change to one reader.
enum Sent {
    /// Whole change (or its last fragment) went out.
    Complete,
    /// Some fragments went out, others remain.
    Partial,
    Failed,
}

impl WriterInner {
    pub(super) fn write(
        &self,
        kind: ChangeKind,
        instance: InstanceHandle,
        payload: Vec<u8>,
    ) -> Result<SequenceNumber> {
        let fragment_size = match self.attributes.fragment_size {
            0 => 0,
            size if payload.len() > size as usize => size,
            _ => 0,
        };

        let seq = {
            let _serial = self.write_lock.lock();
            let (change, evicted) =
                self.history.add_change(kind, instance, payload, fragment_size)?;

            for old in evicted {
                self.change_removed(old);
            }
            self.add_to_proxies(&change);
            change.sequence_number
        };

        log::trace!("[writer] {} wrote seq={}", self.guid, seq);
        self.deliver_pending();
        self.check_acked_status();
        Ok(seq)
    }

    fn add_to_proxies(&self, change: &Arc<CacheChange>) {
        let filter = self.filter();
        let fragment_count = change.fragment_count();

        for proxy in self.proxies() {
            let reader = proxy.lock().guid();
            let relevant = filter
                .as_ref()
                .map_or(true, |f| f.is_relevant(change, &reader));

            let mut p = proxy.lock();
            if !p.is_active() {
                continue;
            }
            let entry = ChangeForReader::new(change.sequence_number, fragment_count);
            if let Err(e) = p.add_change(entry, relevant, false) {
                self.metrics.record_ledger_rejection();
                log::warn!(
                    "[writer] {} not tracked for {}: {}",
                    change.sequence_number,
                    reader,
                    e
                );
            }
        }
    }

    pub(super) fn remove_change(&self, seq: SequenceNumber) -> bool {
        let removed = {
            let _serial = self.write_lock.lock();
            let removed = self.history.remove_change(seq).is_some();
            if removed {
                self.change_removed(seq);
            }
            removed
        };
        if removed {
            self.check_acked_status();
        }
        removed
    }

    /// Tell every proxy that `seq` left the history.
    fn change_removed(&self, seq: SequenceNumber) {
        for proxy in self.proxies() {
            let dest = {
                let mut p = proxy.lock();
                if !p.change_has_been_removed(seq) {
                    continue;
                }
                Destination::for_proxy(&p)
            };
            log::debug!("[writer] GAP {} to local reader {} (removed)", seq, dest.reader_guid);
            self.send_gap(&dest, &RtpsRange::from_sequence(seq));
        }
    }

    /// Send every UNSENT change to every matched reader.
    pub(super) fn deliver_pending(&self) {
        for proxy in self.proxies() {
            self.deliver_to(&proxy);
        }
    }

    pub(super) fn deliver_to(&self, proxy: &ProxyRef) {
        let (dest, pending, reliable, local) = {
            let p = proxy.lock();
            if !p.is_active() {
                return;
            }
            (
                Destination::for_proxy(&p),
                p.unsent_changes(),
                p.is_reliable(),
                p.is_local_reader(),
            )
        };
        if pending.is_empty() {
            return;
        }

        let min_seq = self
            .history
            .min_sequence()
            .unwrap_or(SEQUENCE_NUMBER_UNKNOWN);
        let settled = if !reliable {
            ChangeStatus::Acknowledged
        } else if local {
            ChangeStatus::Unacknowledged
        } else {
            ChangeStatus::Underway
        };
        let restart_nack_supression = reliable && !local;
        let mut delivered_reliably = false;

        for seq in pending {
            let Some(unsent) = proxy.lock().change_is_unsent(seq, min_seq) else {
                continue;
            };
            let Some(change) = self.history.get(seq) else {
                // Evicted meanwhile; the removal notice settles the entry.
                continue;
            };

            if let Some(gap_start) = unsent.gap_start {
                if let Some(range) = RtpsRange::checked(gap_start, seq) {
                    self.send_gap(&dest, &range);
                }
            }

            let outcome = if change.is_fragmented() {
                self.send_fragments(proxy, &dest, &change)
            } else if self.send(&dest, self.data_msg(&dest, &change)) {
                self.metrics.record_data();
                Sent::Complete
            } else {
                Sent::Failed
            };

            match outcome {
                Sent::Complete => {
                    proxy
                        .lock()
                        .from_unsent_to_status(seq, settled, restart_nack_supression, true);
                    delivered_reliably |= restart_nack_supression;
                }
                Sent::Partial => {
                    proxy
                        .lock()
                        .from_unsent_to_status(seq, ChangeStatus::Unsent, false, true);
                    break;
                }
                Sent::Failed => break,
            }
        }

        if delivered_reliably && !self.periodic_heartbeat.is_armed() {
            self.periodic_heartbeat.restart(None);
        }
        if !reliable {
            self.notify_acknowledged(proxy);
        }
    }

    fn data_msg(&self, dest: &Destination, change: &Arc<CacheChange>) -> WriterSubmessage {
        WriterSubmessage::Data(DataMsg {
            writer_guid: self.guid,
            reader_guid: dest.reader_guid,
            change: Arc::clone(change),
            inline_qos: change.kind.is_not_alive(),
        })
    }

    /// Send the fragments still unsent for this reader, in order.
    fn send_fragments(
        &self,
        proxy: &ProxyRef,
        dest: &Destination,
        change: &Arc<CacheChange>,
    ) -> Sent {
        let seq = change.sequence_number;
        let fragments = proxy.lock().unsent_fragments(seq);
        if fragments.is_empty() {
            log::trace!("[writer] {} has no fragment left for {}", seq, dest.reader_guid);
            return Sent::Complete;
        }
        let sample_size = u32::try_from(change.payload.len()).unwrap_or(u32::MAX);
        let mut any_sent = false;

        for fragment_number in fragments {
            let msg = WriterSubmessage::DataFrag(DataFragMsg {
                writer_guid: self.guid,
                reader_guid: dest.reader_guid,
                change: Arc::clone(change),
                fragment_number,
                fragment_size: change.fragment_size,
                sample_size,
                inline_qos: change.kind.is_not_alive(),
            });
            if !self.send(dest, msg) {
                return if any_sent { Sent::Partial } else { Sent::Failed };
            }
            self.metrics.record_data_frag();
            any_sent = true;

            if proxy.lock().mark_fragment_as_sent_for_change(seq, fragment_number) == Some(true) {
                return Sent::Complete;
            }
        }
        if any_sent {
            Sent::Partial
        } else {
            Sent::Failed
        }
    }

    pub(super) fn send_gap(&self, dest: &Destination, range: &RtpsRange) -> bool {
        let msg = GapMsg::from_range(self.guid, dest.reader_guid, range);
        let sent = self.send(dest, WriterSubmessage::Gap(msg));
        if sent {
            self.metrics.record_gap(range.len());
        }
        sent
    }

    pub(super) fn send(&self, dest: &Destination, msg: WriterSubmessage) -> bool {
        match self.sender.send(dest, &msg) {
            Ok(()) => true,
            Err(e) => {
                self.metrics.record_send_failure();
                log::debug!(
                    "[writer] {} to {} failed: {}",
                    msg.kind_name(),
                    dest.reader_guid,
                    e
                );
                false
            }
        }
    }

    /// Fire `on_data_acknowledged` for everything the proxy folded.
    pub(super) fn notify_acknowledged(&self, proxy: &ProxyRef) {
        let (reader, acked) = {
            let mut p = proxy.lock();
            (p.guid(), p.take_acknowledged())
        };
        if acked.is_empty() {
            return;
        }
        if let Some(listener) = self.listener() {
            for seq in &acked {
                listener.on_data_acknowledged(reader, *seq);
            }
        }
    }

    /// Drop fully acknowledged changes (VOLATILE writers) and wake waiters.
    pub(super) fn check_acked_status(&self) {
        if self.attributes.durability.is_volatile() {
            let min_low_mark = self
                .proxies()
                .iter()
                .map(|proxy| proxy.lock().changes_low_mark())
                .min()
                .unwrap_or_else(|| self.history.last_sequence_number());
            if min_low_mark > 0 {
                let removed = self.history.remove_acknowledged(min_low_mark);
                if !removed.is_empty() {
                    log::trace!(
                        "[history] {} removed {} acknowledged changes (<= {})",
                        self.guid,
                        removed.len(),
                        min_low_mark
                    );
                }
            }
        }
        self.notify_acked();
    }
}
