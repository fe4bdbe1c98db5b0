//! The allowlist scenario end to end, with the filter driven by a fake host.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use hostgate_gateway::filter::Action;

use common::{ok_body, plugin, FakePluginHost, FakeStream};

#[test]
fn control_plane_allowlist_gates_requests() {
    let mut p = plugin();
    let mut host = FakePluginHost::with_config(r#"{"api_host":"cp.internal"}"#);
    p.on_plugin_start(&mut host).unwrap();

    // Before the first refresh everything is rejected.
    let mut early = FakeStream::with_authority("svc.example.com:8443");
    assert_eq!(p.new_http_context().on_http_request_headers(&mut early), Action::Pause);

    p.on_tick(&mut host);
    let call = host.dispatched.last().unwrap();
    assert!(call.headers.contains(&(":authority".to_string(), "cp.internal".to_string())));
    let token = call.token;
    p.on_http_call_response(token, ok_body(r#"[{"name":"svc.example.com"}]"#));

    let mut allowed = FakeStream::with_authority("svc.example.com:8443");
    assert_eq!(p.new_http_context().on_http_request_headers(&mut allowed), Action::Continue);
    assert!(allowed.reply.is_none());

    let mut denied = FakeStream::with_authority("evil.example.com");
    assert_eq!(p.new_http_context().on_http_request_headers(&mut denied), Action::Pause);
    let (status, headers, body) = denied.reply.expect("rejected locally");
    assert_eq!(status, 403);
    assert!(headers.contains(&("wasm-reason".to_string(), "domain not allowed".to_string())));
    assert!(body.is_none());
}
