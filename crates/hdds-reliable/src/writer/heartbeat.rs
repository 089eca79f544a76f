// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HEARTBEAT emission: periodic, initial and after nack supression.

use std::sync::atomic::Ordering;

use super::{Destination, WriterInner, WriterSubmessage};
use crate::reliability::{HeartbeatMsg, WriteHistory};
use crate::timer::TimerAction;
use crate::types::{Guid, SequenceNumber};

impl WriterInner {
    /// `[first, last]` announced in HEARTBEATs.
    ///
    /// An empty history announces `[next, next - 1]`.
    fn heartbeat_range(&self) -> (SequenceNumber, SequenceNumber) {
        let next = self.history.next_sequence_number();
        let first = self.history.min_sequence().unwrap_or(next);
        (first, next.saturating_sub(1))
    }

    pub(super) fn send_heartbeat_to(&self, dest: &Destination) -> bool {
        let (first_seq, last_seq) = self.heartbeat_range();
        let count = self
            .heartbeat_count
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1);
        let msg = HeartbeatMsg {
            writer_guid: self.guid,
            reader_guid: dest.reader_guid,
            first_seq,
            last_seq,
            count,
            final_flag: false,
            liveliness_flag: false,
        };
        let sent = self.send(dest, WriterSubmessage::Heartbeat(msg));
        if sent {
            self.metrics.record_heartbeat();
            log::trace!(
                "[heartbeat] {} -> {} [{}, {}] count={}",
                self.guid,
                dest.reader_guid,
                first_seq,
                last_seq,
                count
            );
        }
        sent
    }

    /// Heartbeat every remote reliable reader with something unacknowledged.
    pub(super) fn send_periodic_heartbeats(&self) -> usize {
        if !self.attributes.is_reliable() {
            return 0;
        }
        let first = self.history.min_sequence().unwrap_or(0);
        let targets: Vec<Destination> = self
            .proxies()
            .iter()
            .filter_map(|proxy| {
                let p = proxy.lock();
                let wanted = p.is_active()
                    && p.is_reliable()
                    && !p.is_local_reader()
                    && p.has_unacknowledged(first);
                wanted.then(|| Destination::for_proxy(&p))
            })
            .collect();

        targets
            .iter()
            .filter(|dest| self.send_heartbeat_to(dest))
            .count()
    }

    pub(super) fn on_periodic_heartbeat(&self) -> TimerAction {
        if self.send_periodic_heartbeats() > 0 {
            TimerAction::Rearm
        } else {
            log::trace!("[heartbeat] {} all readers settled, periodic heartbeat idle", self.guid);
            TimerAction::Stop
        }
    }

    /// Nack-supression expired for `reader`: UNDERWAY changes are now
    /// UNACKNOWLEDGED, prompt the reader for an ACKNACK.
    pub(super) fn on_nack_supression(&self, reader: &Guid) {
        let Some(proxy) = self.proxy(reader) else {
            return;
        };
        let dest = {
            let mut p = proxy.lock();
            if !p.timers_enabled() || !p.perform_nack_supression() {
                return;
            }
            Destination::for_proxy(&p)
        };
        self.send_heartbeat_to(&dest);
        if !self.periodic_heartbeat.is_armed() {
            self.periodic_heartbeat.restart(None);
        }
    }

    /// First HEARTBEAT after matching, so the reader learns the range.
    pub(super) fn on_initial_heartbeat(&self, reader: &Guid) {
        let Some(dest) = self
            .proxy(reader)
            .and_then(|proxy| {
                let p = proxy.lock();
                p.is_active().then(|| Destination::for_proxy(&p))
            })
        else {
            return;
        };
        log::debug!("[heartbeat] initial heartbeat {} -> {}", self.guid, reader);
        self.send_heartbeat_to(&dest);
    }
}
