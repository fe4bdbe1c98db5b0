//! Forwarding of authorized requests.
//!
//! - forward-proxy mode: `http://{authority}{path}`
//! - reverse-proxy mode (`gateway.upstream` set): `{upstream}{path}`, Host kept
//!
//! Bodies are buffered. Hop-by-hop headers are stripped both ways.

use std::time::Duration;

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        Method, StatusCode,
    },
    response::{IntoResponse, Response},
};
use thiserror::Error;

use hostgate_core::error::{HostGateError, Result};

use crate::app_state::AppState;
use crate::config::GatewaySection;
use crate::transport::target::Target;

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),
    #[error("request has no usable authority")]
    NoAuthority,
    #[error("CONNECT tunnelling is not supported")]
    ConnectUnsupported,
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ForwardError::NoAuthority => StatusCode::BAD_REQUEST,
            ForwardError::ConnectUnsupported => StatusCode::NOT_IMPLEMENTED,
            ForwardError::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::BodyTooLarge(_) => "body_too_large",
            ForwardError::NoAuthority => "no_authority",
            ForwardError::ConnectUnsupported => "connect_unsupported",
            ForwardError::Upstream(_) => "upstream",
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

pub struct Forwarder {
    client: reqwest::Client,
    upstream: Option<String>,
    max_body_bytes: usize,
}

impl Forwarder {
    pub fn new(section: &GatewaySection) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(section.forward_timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| HostGateError::Internal(format!("forward client build failed: {e}")))?;

        Ok(Self {
            client,
            upstream: section
                .upstream
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            max_body_bytes: section.max_body_bytes,
        })
    }

    /// Forward mode connects to the validated host and port only.
    pub fn target_url(&self, target: &Target, path_and_query: &str) -> String {
        match (&self.upstream, target.port()) {
            (Some(base), _) => format!("{base}{path_and_query}"),
            (None, Some(port)) => format!("http://{}:{}{}", target.host(), port, path_and_query),
            (None, None) => format!("http://{}{}", target.host(), path_and_query),
        }
    }

    pub async fn forward(&self, req: Request) -> std::result::Result<Response, ForwardError> {
        if req.method() == Method::CONNECT {
            return Err(ForwardError::ConnectUnsupported);
        }

        let (parts, body) = req.into_parts();
        let target =
            Target::from_request(&parts.uri, &parts.headers).ok_or(ForwardError::NoAuthority)?;
        let host_value =
            HeaderValue::from_str(&target.to_string()).map_err(|_| ForwardError::NoAuthority)?;

        let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
        let url = self.target_url(&target, path_and_query);

        let body = body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|_| ForwardError::BodyTooLarge(self.max_body_bytes))?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);
        headers.insert(header::HOST, host_value);

        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let mut resp_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut resp_headers);
        resp_headers.remove(header::CONTENT_LENGTH);
        let bytes = upstream.bytes().await?;

        let mut resp = Response::new(Body::from(bytes));
        *resp.status_mut() = status;
        *resp.headers_mut() = resp_headers;
        Ok(resp)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by `Connection` are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Fallback handler on the proxy listener.
pub async fn proxy(State(state): State<AppState>, req: Request) -> Response {
    match state.forwarder().forward(req).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(error = %e, "forward failed");
            state.metrics().forward_errors.inc(&[("kind", e.kind())]);
            e.into_response()
        }
    }
}
