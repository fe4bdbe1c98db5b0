//! Tokio host for one filter instance.
//!
//! Each instance runs on its own task: ticks and call completions are pulled
//! from one `select!` loop, so the plugin context never sees two events at
//! once. Outbound calls run on separate tasks and report back through the
//! instance's event queue. Request authorization does not go through the
//! queue; handlers get an [`HttpContextFactory`] reading the shared store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use hostgate_core::allowlist::AllowlistStore;
use hostgate_core::error::{HostGateError, Result};

use crate::filter::{HttpContext, HttpContextFactory, PluginContext};
use crate::host::{CallResponse, CallToken, HeaderPairs, PluginHost};
use crate::obs::GatewayMetrics;
use crate::runtime::caller::{HttpCaller, OutboundCall};

#[derive(Debug)]
pub(crate) enum Event {
    CallCompleted {
        token: CallToken,
        outcome: Result<CallResponse>,
    },
    Shutdown,
}

/// Everything needed to start one instance.
#[derive(Clone)]
pub struct InstanceSpec {
    pub configuration: Vec<u8>,
    pub clusters: Arc<BTreeMap<String, String>>,
    pub caller: Arc<dyn HttpCaller>,
    pub metrics: Arc<GatewayMetrics>,
}

/// [`PluginHost`] implementation backed by tokio.
pub struct TokioHost {
    configuration: Vec<u8>,
    tick_period: Option<Duration>,
    clusters: Arc<BTreeMap<String, String>>,
    caller: Arc<dyn HttpCaller>,
    events: mpsc::UnboundedSender<Event>,
    runtime: tokio::runtime::Handle,
    next_token: u32,
}

impl TokioHost {
    fn base_url(&self, upstream: &str, authority: &str) -> String {
        match self.clusters.get(upstream) {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => {
                tracing::debug!(upstream, authority, "no cluster configured; calling authority directly");
                format!("http://{authority}")
            }
        }
    }
}

impl PluginHost for TokioHost {
    fn plugin_configuration(&self) -> Result<Vec<u8>> {
        Ok(self.configuration.clone())
    }

    fn set_tick_period(&mut self, period: Duration) -> Result<()> {
        if period.is_zero() {
            return Err(HostGateError::Scheduling("tick period must be greater than 0".into()));
        }
        self.tick_period = Some(period);
        Ok(())
    }

    fn dispatch_http_call(
        &mut self,
        upstream: &str,
        headers: HeaderPairs,
        body: Option<Bytes>,
        timeout: Duration,
    ) -> Result<CallToken> {
        if self.events.is_closed() {
            return Err(HostGateError::Dispatch("instance event queue closed".into()));
        }
        let call = OutboundCall::from_pairs(headers, body)?;
        let base = self.base_url(upstream, &call.authority);

        let token = CallToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);

        let caller = Arc::clone(&self.caller);
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let outcome = match time::timeout(timeout, caller.call(&base, call)).await {
                Ok(res) => res,
                Err(_) => Err(HostGateError::Timeout(timeout)),
            };
            // Receiver gone means the instance stopped; nothing left to update.
            let _ = events.send(Event::CallCompleted { token, outcome });
        });

        Ok(token)
    }
}

/// Handle to a running instance.
pub struct InstanceHandle {
    id: u32,
    http: HttpContextFactory,
    store: Arc<AllowlistStore>,
    events: mpsc::UnboundedSender<Event>,
    task: JoinHandle<()>,
}

impl InstanceHandle {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn store(&self) -> &Arc<AllowlistStore> {
        &self.store
    }

    pub fn new_http_context(&self) -> HttpContext {
        self.http.new_http_context()
    }

    /// Ask the instance loop to stop after the current event.
    pub fn shutdown(&self) {
        let _ = self.events.send(Event::Shutdown);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Start an instance: run `on_plugin_start` now, then spawn the event loop.
///
/// A start failure is returned and no task is spawned.
pub fn spawn_instance(id: u32, spec: InstanceSpec) -> Result<InstanceHandle> {
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| HostGateError::Internal(format!("no tokio runtime: {e}")))?;
    let (tx, rx) = mpsc::unbounded_channel();

    let mut host = TokioHost {
        configuration: spec.configuration,
        tick_period: None,
        clusters: spec.clusters,
        caller: spec.caller,
        events: tx.clone(),
        runtime: runtime.clone(),
        next_token: 1,
    };

    let mut plugin = PluginContext::new(id, spec.metrics);
    plugin.on_plugin_start(&mut host)?;

    let http = plugin.http_context_factory();
    let store = Arc::clone(plugin.store());
    let task = runtime.spawn(run(plugin, host, rx));

    Ok(InstanceHandle {
        id,
        http,
        store,
        events: tx,
        task,
    })
}

async fn run(mut plugin: PluginContext, mut host: TokioHost, mut events: mpsc::UnboundedReceiver<Event>) {
    // First tick fires one full period after start.
    let mut ticker = host.tick_period.map(|period| {
        let mut t = time::interval_at(Instant::now() + period, period);
        t.set_missed_tick_behavior(MissedTickBehavior::Burst);
        t
    });

    loop {
        tokio::select! {
            _ = next_tick(&mut ticker) => plugin.on_tick(&mut host),
            ev = events.recv() => match ev {
                Some(Event::CallCompleted { token, outcome }) => {
                    plugin.on_http_call_response(token, outcome);
                }
                Some(Event::Shutdown) | None => break,
            },
        }
    }

    tracing::info!(instance = plugin.instance_id(), "filter instance stopped");
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
