//! Periodic payment scanning
//!
//! One task per monitored recipient scans an [`AnnouncementSource`] on a fixed
//! interval and reports detected payments on a single ordered channel.
//!
//! Each target has:
//! - an in-flight flag, so a target never has two overlapping scans
//! - a delivery gate plus an `active` flag, checked under the gate right before
//!   any event is sent
//!
//! [`ScanMonitor::stop_monitoring`] takes the gate, clears `active`, then
//! aborts and joins the task. Once it returns, nothing more is delivered for
//! that target.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::crypto::{Announcement, DetectedPayment, MetaAddress, ViewKey};
use crate::error::Result;

/// Stream of ephemeral-key-tagged outputs, e.g. a chain indexer
#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    /// Announcements with `sequence >= cursor`, in ascending order
    async fn announcements_since(&self, cursor: u64) -> Result<Vec<Announcement>>;
}

/// In-memory source for tests and file-based scanning
#[derive(Debug, Default)]
pub struct MemoryAnnouncementSource {
    announcements: RwLock<Vec<Announcement>>,
}

impl MemoryAnnouncementSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load announcements as-is, keeping their sequence numbers
    pub fn from_announcements(mut announcements: Vec<Announcement>) -> Self {
        announcements.sort_by_key(|a| a.sequence);
        Self {
            announcements: RwLock::new(announcements),
        }
    }

    /// Append an announcement and return the sequence number it was given
    pub fn publish(&self, mut announcement: Announcement) -> u64 {
        let mut announcements = self.announcements.write();
        let sequence = announcements.last().map_or(0, |last| last.sequence + 1);
        announcement.sequence = sequence;
        announcements.push(announcement);
        sequence
    }

    /// Every announcement, in sequence order
    pub fn snapshot(&self) -> Vec<Announcement> {
        self.announcements.read().clone()
    }

    pub fn len(&self) -> usize {
        self.announcements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.announcements.read().is_empty()
    }
}

#[async_trait]
impl AnnouncementSource for MemoryAnnouncementSource {
    async fn announcements_since(&self, cursor: u64) -> Result<Vec<Announcement>> {
        Ok(self
            .announcements
            .read()
            .iter()
            .filter(|a| a.sequence >= cursor)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEvent {
    pub target: MetaAddress,
    pub payment: DetectedPayment,
}

struct Target {
    meta: MetaAddress,
    view_key: ViewKey,
    /// Next sequence number to fetch
    cursor: AtomicU64,
    in_flight: AtomicBool,
    active: AtomicBool,
    gate: tokio::sync::Mutex<()>,
}

/// Clears the in-flight flag however the scan ends, including abort
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Target {
    /// `None` if a scan of this target is already running
    async fn scan_once(
        &self,
        source: &dyn AnnouncementSource,
        events: &mpsc::UnboundedSender<MonitorEvent>,
    ) -> Result<Option<usize>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }
        let _in_flight = InFlightGuard(&self.in_flight);

        let cursor = self.cursor.load(Ordering::Acquire);
        let announcements = source.announcements_since(cursor).await?;
        let next_cursor = announcements
            .iter()
            .map(|a| a.sequence.saturating_add(1))
            .max()
            .map_or(cursor, |next| next.max(cursor));
        let detected = self.view_key.scan(&announcements)?;

        let _gate = self.gate.lock().await;
        if !self.active.load(Ordering::Acquire) {
            return Ok(Some(0));
        }
        let delivered = detected.len();
        for payment in detected {
            if events
                .send(MonitorEvent {
                    target: self.meta,
                    payment,
                })
                .is_err()
            {
                break;
            }
        }
        self.cursor.fetch_max(next_cursor, Ordering::AcqRel);
        Ok(Some(delivered))
    }
}

struct MonitorHandle {
    target: Arc<Target>,
    task: JoinHandle<()>,
}

pub struct ScanMonitor {
    source: Arc<dyn AnnouncementSource>,
    interval: Duration,
    events: mpsc::UnboundedSender<MonitorEvent>,
    handles: Mutex<HashMap<MetaAddress, MonitorHandle>>,
}

impl ScanMonitor {
    pub fn new(
        source: Arc<dyn AnnouncementSource>,
        interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let monitor = Self {
            source,
            interval,
            events,
            handles: Mutex::new(HashMap::new()),
        };
        (monitor, receiver)
    }

    /// Start a periodic scan task for the view key's recipient. Starting an
    /// already monitored target is a no-op. Must be called inside a Tokio
    /// runtime.
    pub fn start_monitoring(&self, view_key: ViewKey) -> MetaAddress {
        let meta = view_key.meta_address();
        let mut handles = self.handles.lock();
        if handles.contains_key(&meta) {
            return meta;
        }

        let target = Arc::new(Target {
            meta,
            view_key,
            cursor: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
            active: AtomicBool::new(true),
            gate: tokio::sync::Mutex::new(()),
        });

        let task = tokio::spawn({
            let target = Arc::clone(&target);
            let source = Arc::clone(&self.source);
            let events = self.events.clone();
            let interval = self.interval;
            async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !target.active.load(Ordering::Acquire) {
                        break;
                    }
                    match target.scan_once(source.as_ref(), &events).await {
                        Ok(Some(0)) => {}
                        Ok(Some(found)) => {
                            tracing::info!(recipient = %target.meta, found, "detected payments");
                        }
                        Ok(None) => {
                            tracing::debug!(recipient = %target.meta, "scan already in flight, skipping tick");
                        }
                        Err(err) => {
                            tracing::warn!(recipient = %target.meta, "scan failed: {err}");
                        }
                    }
                }
            }
        });

        tracing::info!(recipient = %meta, interval_ms = self.interval.as_millis() as u64, "monitoring started");
        handles.insert(meta, MonitorHandle { target, task });
        meta
    }

    /// Stop a target. Returns `false` if it was not monitored. No event for
    /// the target is delivered after this returns.
    pub async fn stop_monitoring(&self, meta: &MetaAddress) -> bool {
        let Some(handle) = self.handles.lock().remove(meta) else {
            return false;
        };

        {
            let _gate = handle.target.gate.lock().await;
            handle.target.active.store(false, Ordering::Release);
        }
        handle.task.abort();
        let _ = handle.task.await;

        tracing::info!(recipient = %meta, "monitoring stopped");
        true
    }

    /// Scan a target now. `Ok(None)` if it is not monitored or a scan is
    /// already in flight.
    pub async fn trigger_scan(&self, meta: &MetaAddress) -> Result<Option<usize>> {
        let target = match self.handles.lock().get(meta) {
            Some(handle) => Arc::clone(&handle.target),
            None => return Ok(None),
        };
        target.scan_once(self.source.as_ref(), &self.events).await
    }

    pub fn is_monitoring(&self, meta: &MetaAddress) -> bool {
        self.handles.lock().contains_key(meta)
    }

    pub fn targets(&self) -> Vec<MetaAddress> {
        self.handles.lock().keys().copied().collect()
    }

    /// Stop every target
    pub async fn shutdown(&self) {
        for meta in self.targets() {
            self.stop_monitoring(&meta).await;
        }
    }
}

impl Drop for ScanMonitor {
    fn drop(&mut self) {
        for (_, handle) in self.handles.lock().drain() {
            handle.target.active.store(false, Ordering::Release);
            handle.task.abort();
        }
    }
}
