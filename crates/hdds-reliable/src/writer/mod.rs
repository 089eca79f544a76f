// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # StatefulWriter
//!
//! Reliable RTPS writer that keeps one [`ReaderProxy`] per matched reader.
//!
//! ## Threads
//!
//! ```text
//!   application ── write() ──────────┐
//!   receive     ── process_acknack() ┼──▶ WriterInner ──▶ MessageSender
//!   hdds-timer  ── heartbeat/nack ───┘        │
//!                                   DashMap<Guid, Arc<Mutex<ReaderProxy>>>
//! ```
//!
//! ## Locking
//!
//! - `write_lock` serializes history inserts with proxy updates so every
//!   ledger sees sequence numbers in order.
//! - Proxy locks are taken after cloning the `Arc` out of the map; no map
//!   guard is held while a proxy is locked.
//! - Order: `write_lock` → proxy → history. Sends happen with no proxy lock.
//! - Timer callbacks hold a `Weak<WriterInner>`; a dropped writer turns
//!   them into no-ops.

mod acknack;
mod delivery;
mod heartbeat;
mod interfaces;
mod matching;

pub use interfaces::{
    Destination, MessageSender, ReaderDataFilter, WriterListener, WriterSubmessage,
};
pub use matching::ReaderSnapshot;

use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, RwLock};

use crate::config::{WriterAttributes, WriterTimes};
use crate::reliability::{
    AckNackMsg, HistoryCache, NackFragMsg, ReaderProxy, ReaderProxyData, WriterMetrics,
    WriterMetricsSnapshot,
};
use crate::timer::{TimerAction, TimerHandle, TimerService};
use crate::types::{ChangeKind, Guid, InstanceHandle, SequenceNumber};
use crate::{Error, Result};

type ProxyRef = Arc<Mutex<ReaderProxy>>;

pub(crate) struct WriterInner {
    me: Weak<WriterInner>,
    guid: Guid,
    attributes: WriterAttributes,
    times: ArcSwap<WriterTimes>,
    history: Arc<HistoryCache>,
    matched: DashMap<Guid, ProxyRef>,
    sender: Arc<dyn MessageSender>,
    timers: Arc<dyn TimerService>,
    listener: RwLock<Option<Arc<dyn WriterListener>>>,
    filter: RwLock<Option<Arc<dyn ReaderDataFilter>>>,
    metrics: WriterMetrics,
    heartbeat_count: AtomicU32,
    periodic_heartbeat: TimerHandle,
    nack_response: TimerHandle,
    write_lock: Mutex<()>,
    ack_lock: Mutex<()>,
    ack_cv: Condvar,
}

impl WriterInner {
    fn proxy(&self, guid: &Guid) -> Option<ProxyRef> {
        self.matched.get(guid).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of matched proxies; map guards are released on return.
    fn proxies(&self) -> Vec<ProxyRef> {
        self.matched
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    fn listener(&self) -> Option<Arc<dyn WriterListener>> {
        self.listener.read().clone()
    }

    fn filter(&self) -> Option<Arc<dyn ReaderDataFilter>> {
        self.filter.read().clone()
    }

    fn times(&self) -> WriterTimes {
        **self.times.load()
    }

    /// Build a timer whose callback runs `body` on a live writer.
    fn writer_timer<F>(
        weak: Weak<WriterInner>,
        timers: &dyn TimerService,
        interval: Duration,
        body: F,
    ) -> TimerHandle
    where
        F: Fn(&WriterInner) -> TimerAction + Send + Sync + 'static,
    {
        timers.create(
            interval,
            Arc::new(move || match weak.upgrade() {
                Some(writer) => body(writer.as_ref()),
                None => TimerAction::Stop,
            }),
        )
    }

    fn is_fully_acked(&self) -> bool {
        self.proxies().iter().all(|proxy| proxy.lock().all_acked())
    }

    fn notify_acked(&self) {
        let _guard = self.ack_lock.lock();
        self.ack_cv.notify_all();
    }
}

/// Reliable RTPS writer with per-reader state.
///
/// Dropping it cancels the writer's timers and stops every proxy.
pub struct StatefulWriter {
    inner: Arc<WriterInner>,
}

impl StatefulWriter {
    /// Create a writer; nothing is sent until a reader is matched.
    ///
    /// # Errors
    ///
    /// `Error::Config` / `Error::InvalidQos` for invalid attributes.
    pub fn new(
        guid: Guid,
        attributes: WriterAttributes,
        sender: Arc<dyn MessageSender>,
        timers: Arc<dyn TimerService>,
    ) -> Result<Self> {
        attributes.validate()?;
        let times = attributes.times;
        let history = Arc::new(HistoryCache::new(
            guid,
            attributes.history,
            attributes.resource_limits,
        ));

        let inner = Arc::new_cyclic(|me: &Weak<WriterInner>| {
            let periodic_heartbeat = WriterInner::writer_timer(
                me.clone(),
                timers.as_ref(),
                times.heartbeat_period,
                WriterInner::on_periodic_heartbeat,
            );
            let nack_response = WriterInner::writer_timer(
                me.clone(),
                timers.as_ref(),
                times.nack_response_delay,
                |writer| {
                    writer.perform_acknack_responses();
                    TimerAction::Stop
                },
            );

            WriterInner {
                me: me.clone(),
                guid,
                attributes,
                times: ArcSwap::from_pointee(times),
                history,
                matched: DashMap::new(),
                sender,
                timers,
                listener: RwLock::new(None),
                filter: RwLock::new(None),
                metrics: WriterMetrics::new(),
                heartbeat_count: AtomicU32::new(0),
                periodic_heartbeat,
                nack_response,
                write_lock: Mutex::new(()),
                ack_lock: Mutex::new(()),
                ack_cv: Condvar::new(),
            }
        });

        log::debug!(
            "[writer] created {} ({:?}, {:?}, {:?})",
            guid,
            inner.attributes.reliability,
            inner.attributes.durability,
            inner.attributes.history
        );
        Ok(Self { inner })
    }

    pub fn with_listener(self, listener: Arc<dyn WriterListener>) -> Self {
        *self.inner.listener.write() = Some(listener);
        self
    }

    pub fn with_filter(self, filter: Arc<dyn ReaderDataFilter>) -> Self {
        *self.inner.filter.write() = Some(filter);
        self
    }

    pub fn guid(&self) -> Guid {
        self.inner.guid
    }

    pub fn attributes(&self) -> &WriterAttributes {
        &self.inner.attributes
    }

    pub fn times(&self) -> WriterTimes {
        self.inner.times()
    }

    pub fn history(&self) -> &Arc<HistoryCache> {
        &self.inner.history
    }

    // ========================================================================
    // Data path
    // ========================================================================

    /// Add a change to the history and deliver it to every matched reader.
    ///
    /// # Errors
    ///
    /// - `Error::WouldBlock` when a KEEP_ALL history is full
    /// - `Error::ResourceLimitExceeded` when `max_instances` is reached
    pub fn write(
        &self,
        kind: ChangeKind,
        instance: InstanceHandle,
        payload: Vec<u8>,
    ) -> Result<SequenceNumber> {
        self.inner.write(kind, instance, payload)
    }

    /// Drop `seq` from the history (lifespan expiry, explicit removal).
    pub fn remove_change(&self, seq: SequenceNumber) -> bool {
        self.inner.remove_change(seq)
    }

    /// Retry delivery of every UNSENT change (e.g. after transport errors).
    pub fn deliver_pending(&self) {
        self.inner.deliver_pending();
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Match a reader; `Ok(false)` when it was already matched (updated).
    ///
    /// # Errors
    ///
    /// `Error::ResourceLimitExceeded` beyond `max_matched_readers`.
    pub fn matched_reader_add(&self, data: ReaderProxyData) -> Result<bool> {
        self.inner.matched_reader_add(data)
    }

    pub fn matched_reader_remove(&self, guid: &Guid) -> bool {
        self.inner.matched_reader_remove(guid)
    }

    pub fn matched_reader_is_matched(&self, guid: &Guid) -> bool {
        self.inner.matched.contains_key(guid)
    }

    pub fn matched_readers(&self) -> Vec<Guid> {
        let mut guids: Vec<Guid> = self.inner.matched.iter().map(|e| *e.key()).collect();
        guids.sort_unstable();
        guids
    }

    pub fn reader_snapshot(&self, guid: &Guid) -> Option<ReaderSnapshot> {
        self.inner.reader_snapshot(guid)
    }

    // ========================================================================
    // Reader feedback
    // ========================================================================

    /// Returns `true` when the ACKNACK was accepted.
    pub fn process_acknack(&self, msg: &AckNackMsg) -> bool {
        self.inner.process_acknack(msg)
    }

    /// Returns `true` when the NACKFRAG was accepted.
    pub fn process_nack_frag(&self, msg: &NackFragMsg) -> bool {
        self.inner.process_nack_frag(msg)
    }

    /// Heartbeat every reader that still has unacknowledged changes.
    ///
    /// Returns the number of HEARTBEATs sent.
    pub fn send_heartbeat(&self) -> usize {
        self.inner.send_periodic_heartbeats()
    }

    // ========================================================================
    // Acknowledgement state
    // ========================================================================

    /// `seq` needs nothing more from any matched reader.
    pub fn is_acked_by_all(&self, seq: SequenceNumber) -> bool {
        self.inner
            .proxies()
            .iter()
            .all(|proxy| proxy.lock().change_is_acked(seq))
    }

    /// Block until every matched reader acknowledged every change.
    ///
    /// # Errors
    ///
    /// `Error::WriteTimeout` if `timeout` elapses first.
    pub fn wait_for_all_acked(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.ack_lock.lock();
        loop {
            if self.inner.is_fully_acked() {
                return Ok(());
            }
            if self.inner.ack_cv.wait_until(&mut guard, deadline).timed_out() {
                return if self.inner.is_fully_acked() {
                    Ok(())
                } else {
                    Err(Error::WriteTimeout)
                };
            }
        }
    }

    /// Hot-swap reliability timings; pending timers keep their deadline.
    ///
    /// # Errors
    ///
    /// `Error::Config` for invalid times (left unchanged).
    pub fn update_times(&self, times: WriterTimes) -> Result<()> {
        times.validate()?;
        self.inner.times.store(Arc::new(times));
        self.inner.periodic_heartbeat.set_interval(times.heartbeat_period);
        self.inner.nack_response.set_interval(times.nack_response_delay);
        for proxy in self.inner.proxies() {
            proxy
                .lock()
                .update_nack_supression_interval(times.nack_supression_duration);
        }
        log::debug!("[config] writer {} times updated: {:?}", self.inner.guid, times);
        Ok(())
    }

    pub fn metrics(&self) -> WriterMetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl Drop for StatefulWriter {
    fn drop(&mut self) {
        self.inner.timers.cancel(&self.inner.periodic_heartbeat);
        self.inner.timers.cancel(&self.inner.nack_response);
        for proxy in self.inner.proxies() {
            proxy.lock().stop();
        }
        self.inner.matched.clear();
        log::debug!("[writer] dropped {}", self.inner.guid);
    }
}
