//! Refresh scheduler: tick accounting and in-flight fetch tracking.
//!
//! The host owns the timer; the scheduler decides what a tick does. With
//! overlap disabled (the default) a tick that finds a fetch still in flight
//! skips its fetch. Pending fetches older than `call_timeout + interval` are
//! treated as abandoned and pruned, so a host that never calls back cannot
//! stall refreshes forever.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use hostgate_core::error::{HostGateError, Result};

use crate::config::FilterConfig;
use crate::host::{CallToken, PluginHost};

/// One dispatched, not yet completed, control-plane call.
#[derive(Debug, Clone)]
pub struct PendingFetch {
    pub token: CallToken,
    pub dispatched_at: Instant,
    /// Tick that issued the fetch (0 = startup fetch).
    pub tick: u64,
}

/// What a tick should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    Fetch,
    SkipInFlight,
}

#[derive(Debug)]
pub struct RefreshScheduler {
    interval: Duration,
    abandon_after: Duration,
    allow_overlap: bool,
    ticks: u64,
    pending: BTreeMap<CallToken, PendingFetch>,
}

impl RefreshScheduler {
    pub fn new(cfg: &FilterConfig) -> Self {
        Self {
            interval: cfg.refresh_interval(),
            abandon_after: cfg.call_timeout() + cfg.refresh_interval(),
            allow_overlap: cfg.allow_overlapping_fetches,
            ticks: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Install the periodic tick with the host.
    pub fn arm(&self, host: &mut dyn PluginHost) -> Result<()> {
        host.set_tick_period(self.interval).map_err(|e| match e {
            HostGateError::Scheduling(_) => e,
            other => HostGateError::Scheduling(other.to_string()),
        })
    }

    /// Account for one tick and decide whether it fetches.
    pub fn on_tick(&mut self, now: Instant) -> TickAction {
        self.ticks += 1;
        self.prune_abandoned(now);

        if !self.allow_overlap && !self.pending.is_empty() {
            return TickAction::SkipInFlight;
        }
        TickAction::Fetch
    }

    pub fn track(&mut self, token: CallToken, now: Instant) {
        self.pending.insert(
            token,
            PendingFetch {
                token,
                dispatched_at: now,
                tick: self.ticks,
            },
        );
    }

    /// Remove and return the pending fetch for `token`, if known.
    pub fn complete(&mut self, token: CallToken) -> Option<PendingFetch> {
        self.pending.remove(&token)
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn prune_abandoned(&mut self, now: Instant) {
        let limit = self.abandon_after;
        self.pending.retain(|token, p| {
            let keep = now.saturating_duration_since(p.dispatched_at) < limit;
            if !keep {
                tracing::warn!(%token, tick = p.tick, "control-plane call abandoned (no completion)");
            }
            keep
        });
    }
}
