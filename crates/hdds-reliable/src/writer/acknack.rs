// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader feedback: ACKNACK and NACKFRAG processing, acknack response.

use super::{Destination, WriterInner};
use crate::reliability::{AckNackMsg, GapBuilder, NackFragMsg, WriteHistory};
use crate::types::Guid;

/// What an accepted ACKNACK asks the writer to do once the proxy is unlocked.
struct AckNackOutcome {
    dest: Destination,
    gaps: GapBuilder,
    requested: bool,
    deliver_local: bool,
    heartbeat: bool,
}

impl WriterInner {
    fn addressed_to_me(&self, writer_guid: &Guid) -> bool {
        *writer_guid == self.guid || writer_guid.is_unknown()
    }

    pub(super) fn process_acknack(&self, msg: &AckNackMsg) -> bool {
        if !self.addressed_to_me(&msg.writer_guid) || !self.attributes.is_reliable() {
            return false;
        }
        let Some(proxy) = self.proxy(&msg.reader_guid) else {
            log::trace!("[writer] ACKNACK from unknown reader {}", msg.reader_guid);
            return false;
        };

        let set = &msg.reader_sn_state;
        let base = set.base();
        let next = self.history.next_sequence_number();
        if base > next {
            self.metrics.record_acknack(false);
            log::debug!(
                "[writer] invalid ACKNACK from {}: base {} beyond next sequence {}",
                msg.reader_guid,
                base,
                next
            );
            return false;
        }
        let first_in_history = self.history.min_sequence().unwrap_or(0);

        let outcome = {
            let mut p = proxy.lock();
            if !p.is_active() || !p.is_reliable() {
                return false;
            }
            if !p.check_and_set_acknack_count(msg.count) {
                self.metrics.record_acknack(false);
                log::trace!(
                    "[writer] duplicate ACKNACK count={} from {}",
                    msg.count,
                    msg.reader_guid
                );
                return false;
            }
            self.metrics.record_acknack(true);

            let mut gaps = GapBuilder::new();
            let mut requested = false;
            let mut deliver_local = false;
            let mut initial_remote = false;

            if base <= 1 && set.is_empty() {
                if p.process_initial_acknack(|_| {}) {
                    if p.is_local_reader() {
                        deliver_local = true;
                    } else {
                        initial_remote = true;
                    }
                }
            } else {
                if base >= 1 {
                    p.acked_changes_set(base);
                }
                requested = p.requested_changes_set(set, &mut gaps);
            }

            let heartbeat = initial_remote
                || (!msg.final_flag && p.has_unacknowledged(first_in_history));

            AckNackOutcome {
                dest: Destination::for_proxy(&p),
                gaps,
                requested,
                deliver_local,
                heartbeat,
            }
        };

        for range in outcome.gaps.build() {
            log::debug!(
                "[writer] GAP [{}, {}) to {} (requested, unavailable)",
                range.start(),
                range.end(),
                outcome.dest.reader_guid
            );
            self.send_gap(&outcome.dest, &range);
        }
        if outcome.requested {
            self.schedule_acknack_response();
        }
        if outcome.deliver_local {
            self.deliver_to(&proxy);
        }
        if outcome.heartbeat {
            self.send_heartbeat_to(&outcome.dest);
        }

        self.notify_acknowledged(&proxy);
        self.check_acked_status();
        true
    }

    pub(super) fn process_nack_frag(&self, msg: &NackFragMsg) -> bool {
        if !self.addressed_to_me(&msg.writer_guid) || !self.attributes.is_reliable() {
            return false;
        }
        let Some(proxy) = self.proxy(&msg.reader_guid) else {
            return false;
        };

        let accepted = {
            let mut p = proxy.lock();
            p.is_active()
                && p.process_nack_frag(
                    msg.reader_guid,
                    msg.count,
                    msg.writer_sn,
                    &msg.fragment_number_state,
                )
        };
        self.metrics.record_nackfrag(accepted);
        if !accepted {
            log::trace!(
                "[writer] NACKFRAG count={} seq={} from {} ignored",
                msg.count,
                msg.writer_sn,
                msg.reader_guid
            );
            return false;
        }

        self.schedule_acknack_response();
        // Fragments of a still-UNSENT change go out on the next delivery pass.
        self.deliver_to(&proxy);
        true
    }

    /// Run the acknack response now or arm the nack-response timer.
    fn schedule_acknack_response(&self) {
        if self.times().nack_response_delay.is_zero() {
            self.perform_acknack_responses();
        } else if !self.nack_response.is_armed() {
            self.nack_response.restart(None);
        }
    }

    /// REQUESTED changes of every reader go back to UNSENT and are resent.
    pub(super) fn perform_acknack_responses(&self) {
        let listener = self.listener();
        for proxy in self.proxies() {
            let (reader, resent) = {
                let mut p = proxy.lock();
                if !p.is_active() {
                    continue;
                }
                let mut resent = Vec::new();
                p.perform_acknack_response(|seq| resent.push(seq));
                (p.guid(), resent)
            };
            if resent.is_empty() {
                continue;
            }

            log::debug!(
                "[writer] {} resending {} changes to {}",
                self.guid,
                resent.len(),
                reader
            );
            self.metrics.record_resends(resent.len() as u64);
            if let Some(listener) = &listener {
                for seq in &resent {
                    listener.on_resend_data(reader, *seq);
                }
            }
            self.deliver_to(&proxy);
        }
    }
}
