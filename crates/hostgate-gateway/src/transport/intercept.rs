//! Request interception middleware (axum).
//!
//! Converts the incoming request into proxy-style header pairs, runs the
//! instance's [`HttpContext`](crate::filter::HttpContext) and either passes
//! the request on or answers with the local reply the filter sent.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::HOST, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;

use hostgate_core::decision::{rejection_headers, REJECT_STATUS};
use hostgate_core::error::{HostGateError, Result};

use crate::app_state::AppState;
use crate::filter::Action;
use crate::host::{HeaderPairs, StreamHost};
use crate::transport::target::Target;

/// A local reply produced by the filter.
#[derive(Debug, Clone)]
pub struct LocalReply {
    pub status: u16,
    pub headers: HeaderPairs,
    pub body: Option<Bytes>,
}

impl LocalReply {
    pub fn rejection() -> Self {
        Self {
            status: REJECT_STATUS,
            headers: rejection_headers(),
            body: None,
        }
    }

    pub fn into_response(self) -> Response {
        let mut resp = Response::new(self.body.map(Body::from).unwrap_or_else(Body::empty));
        *resp.status_mut() = StatusCode::from_u16(self.status).unwrap_or(StatusCode::FORBIDDEN);
        for (name, value) in self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                (Ok(n), Ok(v)) => {
                    resp.headers_mut().append(n, v);
                }
                _ => tracing::warn!(header = %name, "dropping invalid local reply header"),
            }
        }
        resp
    }
}

/// [`StreamHost`] view over one axum request.
#[derive(Debug)]
pub struct AxumStream {
    headers: HeaderPairs,
    reply: Option<LocalReply>,
}

impl AxumStream {
    pub fn from_request(req: &Request) -> Self {
        Self {
            headers: request_header_pairs(req),
            reply: None,
        }
    }

    pub fn into_reply(self) -> Option<LocalReply> {
        self.reply
    }
}

impl StreamHost for AxumStream {
    fn request_headers(&self) -> Result<HeaderPairs> {
        Ok(self.headers.clone())
    }

    fn send_http_response(
        &mut self,
        status: u16,
        headers: HeaderPairs,
        body: Option<Bytes>,
    ) -> Result<()> {
        if self.reply.is_some() {
            return Err(HostGateError::Internal("local reply already sent".into()));
        }
        self.reply = Some(LocalReply { status, headers, body });
        Ok(())
    }
}

/// Header pairs with HTTP/2-style pseudo-headers.
///
/// `:authority` comes from the request target when it is in absolute or
/// authority form (forward proxy, HTTP/2), otherwise from `Host`, and is
/// emitted in the normalized form the forwarder connects to.
pub fn request_header_pairs(req: &Request) -> HeaderPairs {
    let uri = req.uri();
    let mut out = Vec::with_capacity(req.headers().len() + 4);

    out.push((":method".to_string(), req.method().as_str().to_string()));
    out.push((
        ":scheme".to_string(),
        uri.scheme_str().unwrap_or("http").to_string(),
    ));

    // An authority that does not parse cleanly is left out; the filter then
    // rejects the request as having none.
    match Target::from_request(uri, req.headers()) {
        Some(target) => out.push((":authority".to_string(), target.to_string())),
        None => tracing::debug!(uri = %uri, "request authority missing or malformed"),
    }

    out.push((
        ":path".to_string(),
        uri.path_and_query().map_or("/", |pq| pq.as_str()).to_string(),
    ));

    for (name, value) in req.headers() {
        if name == HOST {
            continue;
        }
        if let Ok(v) = value.to_str() {
            out.push((name.as_str().to_string(), v.to_string()));
        }
    }
    out
}

/// Middleware entry: authorize, then continue or reply locally.
pub async fn intercept(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let instance = state.pick_instance();
    let mut ctx = instance.new_http_context();
    let mut stream = AxumStream::from_request(&req);

    match ctx.on_http_request_headers(&mut stream) {
        Action::Continue => next.run(req).await,
        Action::Pause => stream
            .into_reply()
            .unwrap_or_else(LocalReply::rejection)
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority_of(host: &str) -> Option<String> {
        let req = axum::http::Request::builder()
            .uri("/x")
            .header(HOST, host)
            .body(Body::empty())
            .unwrap();
        request_header_pairs(&req)
            .into_iter()
            .find(|(k, _)| k == ":authority")
            .map(|(_, v)| v)
    }

    #[test]
    fn authority_pair_is_normalized_target() {
        assert_eq!(authority_of("svc.example.com:8443").as_deref(), Some("svc.example.com:8443"));
    }

    #[test]
    fn userinfo_or_bad_port_drops_authority() {
        assert_eq!(authority_of("svc.example.com:x@127.0.0.1:80"), None);
        assert_eq!(authority_of("svc.example.com:abc"), None);
    }
}
