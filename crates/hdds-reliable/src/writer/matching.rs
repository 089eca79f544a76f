// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader matching: proxy creation, late-joiner replay, unmatch.

use std::sync::Arc;

use parking_lot::Mutex;

use super::WriterInner;
use crate::qos::{Durability, Reliability};
use crate::reliability::{
    ChangeForReader, ChangeStatus, ProxyTimers, ReaderProxy, ReaderProxyData, WriteHistory,
};
use crate::timer::TimerAction;
use crate::types::{Guid, SequenceNumber};
use crate::{Error, Result};

/// Point-in-time view of one reader proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderSnapshot {
    pub guid: Guid,
    pub changes_low_mark: SequenceNumber,
    /// Tracked changes above the low mark, in order.
    pub entries: Vec<(SequenceNumber, ChangeStatus)>,
    pub is_active: bool,
    pub is_reliable: bool,
}

impl ReaderSnapshot {
    pub fn status_of(&self, seq: SequenceNumber) -> Option<ChangeStatus> {
        self.entries
            .iter()
            .find(|(s, _)| *s == seq)
            .map(|(_, status)| *status)
    }
}

impl WriterInner {
    pub(super) fn matched_reader_add(&self, mut data: ReaderProxyData) -> Result<bool> {
        let guid = data.guid;
        let proxy = {
            let _serial = self.write_lock.lock();

            if let Some(existing) = self.proxy(&guid) {
                existing.lock().update(&data);
                log::debug!("[writer] {} updated reader {}", self.guid, guid);
                return Ok(false);
            }
            if self.matched.len() >= self.attributes.max_matched_readers {
                return Err(Error::ResourceLimitExceeded(format!(
                    "max_matched_readers ({})",
                    self.attributes.max_matched_readers
                )));
            }

            // A writer cannot offer more than it has.
            if self.attributes.durability.is_volatile() {
                data.durability = Durability::Volatile;
            }
            if !self.attributes.is_reliable() {
                data.reliability = Reliability::BestEffort;
            }

            let history: Arc<dyn WriteHistory> = self.history.clone();
            let mut proxy = ReaderProxy::new(history, self.attributes.max_changes_per_reader())
                .with_timers(self.proxy_timers(guid));
            proxy.start(data);
            self.replay_history(&mut proxy);

            let proxy = Arc::new(Mutex::new(proxy));
            self.matched.insert(guid, Arc::clone(&proxy));
            proxy
        };

        log::debug!(
            "[writer] {} matched reader {} ({} readers)",
            self.guid,
            guid,
            self.matched.len()
        );
        if let Some(listener) = self.listener() {
            listener.on_reader_matched(guid);
        }
        self.deliver_to(&proxy);
        self.check_acked_status();
        Ok(true)
    }

    /// Late joiner: track the changes still in history.
    ///
    /// Remote reliable readers get them as UNACKNOWLEDGED and ask for what
    /// they miss after the initial HEARTBEAT; the others get them UNSENT.
    fn replay_history(&self, proxy: &mut ReaderProxy) {
        if proxy.durability_kind().is_volatile() {
            return;
        }
        let status = if proxy.is_reliable() && !proxy.is_local_reader() {
            ChangeStatus::Unacknowledged
        } else {
            ChangeStatus::Unsent
        };
        let filter = self.filter();
        let reader = proxy.guid();
        let changes = self.history.changes_after(proxy.changes_low_mark());
        let count = changes.len();

        for change in changes {
            let relevant = filter
                .as_ref()
                .map_or(true, |f| f.is_relevant(&change, &reader));
            let entry = ChangeForReader::new(change.sequence_number, change.fragment_count())
                .with_status(status);
            if let Err(e) = proxy.add_change(entry, relevant, false) {
                self.metrics.record_ledger_rejection();
                log::warn!("[writer] replay to {} stopped: {}", reader, e);
                break;
            }
        }
        log::debug!("[writer] replaying {} changes to {} as {}", count, reader, status);
    }

    fn proxy_timers(&self, reader: Guid) -> ProxyTimers {
        let times = self.times();
        let nack_supression = WriterInner::writer_timer(
            self.me.clone(),
            self.timers.as_ref(),
            times.nack_supression_duration,
            move |writer| {
                writer.on_nack_supression(&reader);
                TimerAction::Stop
            },
        );
        let initial_heartbeat = WriterInner::writer_timer(
            self.me.clone(),
            self.timers.as_ref(),
            times.initial_heartbeat_delay,
            move |writer| {
                writer.on_initial_heartbeat(&reader);
                TimerAction::Stop
            },
        );
        ProxyTimers::new(nack_supression, initial_heartbeat)
    }

    pub(super) fn matched_reader_remove(&self, guid: &Guid) -> bool {
        let Some((_, proxy)) = self.matched.remove(guid) else {
            return false;
        };
        proxy.lock().stop();
        log::debug!("[writer] {} unmatched reader {}", self.guid, guid);

        if let Some(listener) = self.listener() {
            listener.on_reader_unmatched(*guid);
        }
        self.check_acked_status();
        true
    }

    pub(super) fn reader_snapshot(&self, guid: &Guid) -> Option<ReaderSnapshot> {
        let proxy = self.proxy(guid)?;
        let p = proxy.lock();
        Some(ReaderSnapshot {
            guid: p.guid(),
            changes_low_mark: p.changes_low_mark(),
            entries: p
                .ledger()
                .iter()
                .map(|e| (e.sequence_number(), e.status()))
                .collect(),
            is_active: p.is_active(),
            is_reliable: p.is_reliable(),
        })
    }
}
