//! Plugin context: configuration, periodic refresh, call completions.

use std::sync::Arc;
use std::time::Instant;

use hostgate_core::allowlist::AllowlistStore;
use hostgate_core::decision::DecisionEngine;
use hostgate_core::error::{ErrorKind, HostGateError, Result};

use crate::config::FilterConfig;
use crate::filter::fetcher::ControlPlaneFetcher;
use crate::filter::http::{HttpContext, HttpContextFactory};
use crate::filter::scheduler::{RefreshScheduler, TickAction};
use crate::host::{CallResponse, CallToken, PluginHost};
use crate::obs::GatewayMetrics;

struct Running {
    config: FilterConfig,
    fetcher: ControlPlaneFetcher,
    scheduler: RefreshScheduler,
}

/// One filter instance. Owns its allowlist; nothing is shared across instances.
pub struct PluginContext {
    instance_id: u32,
    instance: String,
    store: Arc<AllowlistStore>,
    metrics: Arc<GatewayMetrics>,
    http: HttpContextFactory,
    running: Option<Running>,
}

impl PluginContext {
    pub fn new(instance_id: u32, metrics: Arc<GatewayMetrics>) -> Self {
        let store = Arc::new(AllowlistStore::new());
        let http = HttpContextFactory::new(
            instance_id,
            DecisionEngine::new(Arc::clone(&store)),
            Arc::clone(&metrics),
        );
        Self {
            instance_id,
            instance: instance_id.to_string(),
            store,
            metrics,
            http,
            running: None,
        }
    }

    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    pub fn store(&self) -> &Arc<AllowlistStore> {
        &self.store
    }

    pub fn config(&self) -> Option<&FilterConfig> {
        self.running.as_ref().map(|r| &r.config)
    }

    pub fn in_flight(&self) -> usize {
        self.running.as_ref().map_or(0, |r| r.scheduler.in_flight())
    }

    pub fn ticks(&self) -> u64 {
        self.running.as_ref().map_or(0, |r| r.scheduler.ticks())
    }

    pub fn new_http_context(&self) -> HttpContext {
        self.http.new_http_context()
    }

    /// Factory handed to request handlers running outside the instance task.
    pub fn http_context_factory(&self) -> HttpContextFactory {
        self.http.clone()
    }

    /// Read configuration and arm the refresh tick.
    ///
    /// Any error here is fatal: it is logged at critical severity and the
    /// instance must not be started.
    pub fn on_plugin_start(&mut self, host: &mut dyn PluginHost) -> Result<()> {
        let config = host
            .plugin_configuration()
            .map_err(|e| HostGateError::Config(format!("error reading plugin configuration: {e}")))
            .and_then(|raw| FilterConfig::from_json(&raw))
            .map_err(|e| self.critical(e))?;

        let scheduler = RefreshScheduler::new(&config);
        scheduler.arm(host).map_err(|e| self.critical(e))?;
        tracing::info!(
            instance = self.instance_id,
            api_host = %config.api_host,
            tick_ms = scheduler.interval().as_millis() as u64,
            "set tick period"
        );

        let fetcher = ControlPlaneFetcher::new(&config, Arc::clone(&self.store));
        let fetch_on_start = config.fetch_on_start;
        self.running = Some(Running { config, fetcher, scheduler });

        if fetch_on_start {
            self.dispatch(host);
        }
        Ok(())
    }

    pub fn on_tick(&mut self, host: &mut dyn PluginHost) {
        let Some(running) = self.running.as_mut() else {
            tracing::debug!(instance = self.instance_id, "tick before start ignored");
            return;
        };
        tracing::trace!(instance = self.instance_id, "tick");

        match running.scheduler.on_tick(Instant::now()) {
            TickAction::Fetch => self.dispatch(host),
            TickAction::SkipInFlight => {
                tracing::debug!(
                    instance = self.instance_id,
                    in_flight = running.scheduler.in_flight(),
                    "previous fetch still in flight; skipping"
                );
                self.count_refresh("skipped_in_flight");
            }
        }
    }

    pub fn on_http_call_response(&mut self, token: CallToken, outcome: Result<CallResponse>) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        let Some(pending) = running.scheduler.complete(token) else {
            tracing::warn!(instance = self.instance_id, %token, "completion for unknown call ignored");
            return;
        };
        self.metrics.fetch_duration.observe(
            &[("instance", self.instance.as_str())],
            pending.dispatched_at.elapsed(),
        );

        match running.fetcher.apply(outcome) {
            Ok(installed) => {
                tracing::info!(
                    instance = self.instance_id,
                    revision = installed.revision,
                    domains = installed.domains,
                    "allowlist refreshed"
                );
                tracing::debug!(
                    instance = self.instance_id,
                    allowed = ?self.store.snapshot().sorted(),
                    "allowed domains"
                );
                if installed.skipped > 0 {
                    tracing::warn!(
                        instance = self.instance_id,
                        skipped = installed.skipped,
                        "skipped malformed allowlist entries"
                    );
                }
                self.metrics
                    .allowlist_domains
                    .set(&[("instance", self.instance.as_str())], installed.domains as i64);
                self.count_refresh("ok");
            }
            Err(e) => {
                tracing::error!(
                    instance = self.instance_id,
                    %token,
                    error = %e,
                    "allowlist refresh failed; keeping previous snapshot"
                );
                self.count_refresh(failure_label(&e));
            }
        }
    }

    fn dispatch(&mut self, host: &mut dyn PluginHost) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        match running.fetcher.dispatch(host) {
            Ok(token) => {
                running.scheduler.track(token, Instant::now());
                tracing::debug!(instance = self.instance_id, %token, "control-plane call dispatched");
            }
            Err(e) => {
                tracing::error!(
                    severity = "critical",
                    instance = self.instance_id,
                    error = %e,
                    "dispatch httpcall failed"
                );
                self.count_refresh("dispatch_error");
            }
        }
    }

    fn count_refresh(&self, outcome: &str) {
        self.metrics
            .refreshes
            .inc(&[("instance", self.instance.as_str()), ("outcome", outcome)]);
    }

    fn critical(&self, e: HostGateError) -> HostGateError {
        tracing::error!(
            severity = "critical",
            instance = self.instance_id,
            kind = e.kind().as_str(),
            error = %e,
            "plugin start failed"
        );
        e
    }
}

fn failure_label(e: &HostGateError) -> &'static str {
    match e.kind() {
        ErrorKind::Dispatch => "dispatch_error",
        ErrorKind::Response => "response_error",
        ErrorKind::Parse => "parse_error",
        _ => "internal_error",
    }
}
