//! Outbound HTTP seam used by the tokio host to execute dispatched calls.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HOST;

use hostgate_core::error::{HostGateError, Result};

use crate::host::{CallResponse, HeaderPairs};

/// A dispatched call, with pseudo-headers split out.
#[derive(Debug, Clone)]
pub struct OutboundCall {
    pub method: String,
    pub authority: String,
    pub path: String,
    /// Regular (non-pseudo) headers.
    pub headers: HeaderPairs,
    pub body: Option<Bytes>,
}

impl OutboundCall {
    /// Build from proxy-style header pairs. `:authority` and `:path` are
    /// required; `:method` defaults to GET.
    pub fn from_pairs(pairs: HeaderPairs, body: Option<Bytes>) -> Result<Self> {
        let mut method = None;
        let mut authority = None;
        let mut path = None;
        let mut headers = Vec::with_capacity(pairs.len());

        for (name, value) in pairs {
            match name.as_str() {
                ":method" => method = Some(value),
                ":authority" => authority = Some(value),
                ":path" => path = Some(value),
                n if n.starts_with(':') => {}
                _ => headers.push((name, value)),
            }
        }

        Ok(Self {
            method: method.unwrap_or_else(|| "GET".into()),
            authority: authority
                .filter(|a| !a.is_empty())
                .ok_or_else(|| HostGateError::Dispatch("missing :authority".into()))?,
            path: path
                .filter(|p| p.starts_with('/'))
                .ok_or_else(|| HostGateError::Dispatch("missing or invalid :path".into()))?,
            headers,
            body,
        })
    }
}

#[async_trait]
pub trait HttpCaller: Send + Sync {
    /// Execute `call` against `base_url` (scheme + host[:port], no trailing slash).
    async fn call(&self, base_url: &str, call: OutboundCall) -> Result<CallResponse>;
}

/// `reqwest`-backed caller.
#[derive(Debug, Clone)]
pub struct ReqwestCaller {
    client: reqwest::Client,
}

impl ReqwestCaller {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("hostgate/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .map_err(|e| HostGateError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpCaller for ReqwestCaller {
    async fn call(&self, base_url: &str, call: OutboundCall) -> Result<CallResponse> {
        let method = reqwest::Method::from_bytes(call.method.as_bytes())
            .map_err(|_| HostGateError::Dispatch(format!("invalid method: {}", call.method)))?;
        let url = format!("{base_url}{}", call.path);

        let mut req = self
            .client
            .request(method, &url)
            .header(HOST, call.authority.as_str());
        for (name, value) in &call.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = call.body {
            req = req.body(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| HostGateError::Dispatch(format!("{url}: {e}")))?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| HostGateError::Response(format!("failed to get http response body: {e}")))?;

        Ok(CallResponse { status, headers, body })
    }
}
