//! Test doubles for the host capability traits.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use hostgate_core::error::{HostGateError, Result};
use hostgate_gateway::filter::PluginContext;
use hostgate_gateway::host::{CallResponse, CallToken, HeaderPairs, PluginHost, StreamHost};
use hostgate_gateway::obs::GatewayMetrics;

#[derive(Debug, Clone)]
pub struct Dispatched {
    pub token: CallToken,
    pub upstream: String,
    pub headers: HeaderPairs,
    pub timeout: Duration,
}

/// Records everything the plugin asks of its host.
#[derive(Debug, Default)]
pub struct FakePluginHost {
    pub configuration: Option<Vec<u8>>,
    pub tick_period: Option<Duration>,
    pub fail_tick: bool,
    pub fail_dispatch: bool,
    pub dispatched: Vec<Dispatched>,
    next_token: u32,
}

impl FakePluginHost {
    pub fn with_config(json: &str) -> Self {
        Self {
            configuration: Some(json.as_bytes().to_vec()),
            ..Self::default()
        }
    }

    pub fn last_token(&self) -> CallToken {
        self.dispatched.last().expect("nothing dispatched").token
    }
}

impl PluginHost for FakePluginHost {
    fn plugin_configuration(&self) -> Result<Vec<u8>> {
        self.configuration
            .clone()
            .ok_or_else(|| HostGateError::Internal("no configuration".into()))
    }

    fn set_tick_period(&mut self, period: Duration) -> Result<()> {
        if self.fail_tick {
            return Err(HostGateError::Internal("timer unavailable".into()));
        }
        self.tick_period = Some(period);
        Ok(())
    }

    fn dispatch_http_call(
        &mut self,
        upstream: &str,
        headers: HeaderPairs,
        _body: Option<Bytes>,
        timeout: Duration,
    ) -> Result<CallToken> {
        if self.fail_dispatch {
            return Err(HostGateError::Dispatch("cluster not found".into()));
        }
        self.next_token += 1;
        let token = CallToken(self.next_token);
        self.dispatched.push(Dispatched {
            token,
            upstream: upstream.to_string(),
            headers,
            timeout,
        });
        Ok(token)
    }
}

/// One request as the filter sees it.
#[derive(Debug, Default)]
pub struct FakeStream {
    /// `None` makes `request_headers` fail.
    pub headers: Option<HeaderPairs>,
    pub reply: Option<(u16, HeaderPairs, Option<Bytes>)>,
}

impl FakeStream {
    pub fn with_authority(authority: &str) -> Self {
        Self {
            headers: Some(vec![
                (":method".into(), "GET".into()),
                (":authority".into(), authority.into()),
                (":path".into(), "/".into()),
            ]),
            reply: None,
        }
    }

    pub fn without_authority() -> Self {
        Self {
            headers: Some(vec![(":method".into(), "GET".into()), (":path".into(), "/".into())]),
            reply: None,
        }
    }
}

impl StreamHost for FakeStream {
    fn request_headers(&self) -> Result<HeaderPairs> {
        self.headers
            .clone()
            .ok_or_else(|| HostGateError::Internal("headers unavailable".into()))
    }

    fn send_http_response(
        &mut self,
        status: u16,
        headers: HeaderPairs,
        body: Option<Bytes>,
    ) -> Result<()> {
        self.reply = Some((status, headers, body));
        Ok(())
    }
}

pub fn ok_body(body: &str) -> Result<CallResponse> {
    Ok(CallResponse {
        status: 200,
        headers: vec![("content-type".into(), "application/json".into())],
        body: Bytes::from(body.to_string()),
    })
}

pub fn plugin() -> PluginContext {
    PluginContext::new(0, Arc::new(GatewayMetrics::default()))
}

/// Start a plugin with `config`, then complete one refresh with `body`.
pub fn started_with(config: &str, body: &str) -> (PluginContext, FakePluginHost) {
    let mut p = plugin();
    let mut host = FakePluginHost::with_config(config);
    p.on_plugin_start(&mut host).unwrap();
    p.on_tick(&mut host);
    let token = host.last_token();
    p.on_http_call_response(token, ok_body(body));
    (p, host)
}

/// Serve `router` on an ephemeral loopback port.
pub async fn serve_stub(router: axum::Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Poll `cond` every 20ms until it holds or `within` elapses.
pub async fn eventually(within: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}
