//! Shared application state for the hostgate gateway.
//!
//! Starts the configured number of filter instances. Each one owns its
//! allowlist and refreshes it on its own schedule. Requests are spread over
//! instances round-robin.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hostgate_core::error::{HostGateError, Result};

use crate::config::GatewayConfig;
use crate::obs::GatewayMetrics;
use crate::runtime::{spawn_instance, HttpCaller, InstanceHandle, InstanceSpec, ReqwestCaller};
use crate::transport::forward::Forwarder;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    instances: Vec<InstanceHandle>,
    next: AtomicUsize,
    metrics: Arc<GatewayMetrics>,
    forwarder: Forwarder,
}

impl AppState {
    /// Build application state with the default `reqwest` caller.
    /// Must be called inside a tokio runtime.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let caller: Arc<dyn HttpCaller> = Arc::new(ReqwestCaller::new()?);
        Self::with_caller(cfg, caller)
    }

    /// Build application state with a custom control-plane caller.
    pub fn with_caller(cfg: GatewayConfig, caller: Arc<dyn HttpCaller>) -> Result<Self> {
        let metrics = Arc::new(GatewayMetrics::default());
        let spec = InstanceSpec {
            configuration: cfg.plugin_configuration()?,
            clusters: Arc::new(cfg.clusters.clone()),
            caller,
            metrics: Arc::clone(&metrics),
        };

        let mut instances: Vec<InstanceHandle> = Vec::with_capacity(cfg.gateway.instances);
        for id in 0..cfg.gateway.instances {
            let id = u32::try_from(id)
                .map_err(|_| HostGateError::Config("too many instances".into()))?;
            let handle = spawn_instance(id, spec.clone()).map_err(|e| {
                for started in &instances {
                    started.shutdown();
                }
                e
            })?;
            instances.push(handle);
        }
        tracing::info!(instances = instances.len(), "filter instances started");

        let forwarder = Forwarder::new(&cfg.gateway)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                instances,
                next: AtomicUsize::new(0),
                metrics,
                forwarder,
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn instances(&self) -> &[InstanceHandle] {
        &self.inner.instances
    }

    /// Next instance in round-robin order.
    pub fn pick_instance(&self) -> &InstanceHandle {
        let instances = &self.inner.instances;
        let i = self.inner.next.fetch_add(1, Ordering::Relaxed) % instances.len();
        &instances[i]
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.inner.forwarder
    }

    /// Ready once every instance installed at least one snapshot.
    pub fn is_ready(&self) -> bool {
        self.inner
            .instances
            .iter()
            .all(|i| i.store().is_populated())
    }

    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("hostgate_instances", self.inner.instances.len() as u64),
            ("hostgate_ready", u64::from(self.is_ready())),
        ]
    }

    /// Stop all filter instances.
    pub fn shutdown(&self) {
        for i in &self.inner.instances {
            i.shutdown();
        }
    }
}
