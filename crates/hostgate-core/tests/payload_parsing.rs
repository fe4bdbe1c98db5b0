//! Control-plane payload tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use hostgate_core::allowlist::AllowlistStore;
use hostgate_core::domains::parse_domains;

#[test]
fn skips_malformed_entries_individually() {
    let body = br#"[{"name":"a.com"},{"x":1},{"name":"b.com"}]"#;
    let parsed = parse_domains(body).unwrap();
    assert_eq!(parsed.domains, vec!["a.com", "b.com"]);
    assert_eq!(parsed.skipped, 1);

    let store = AllowlistStore::new();
    store.replace(&parsed.domains);
    assert_eq!(store.snapshot().sorted(), vec!["a.com", "b.com"]);
}

#[test]
fn skips_empty_and_non_string_names() {
    let body = br#"[{"name":""},{"name":"  "},{"name":42},{"name":null},"c.com",7,{"name":"d.com","id":3}]"#;
    let parsed = parse_domains(body).unwrap();
    assert_eq!(parsed.domains, vec!["d.com"]);
    assert_eq!(parsed.skipped, 6);
}

#[test]
fn empty_array_is_a_valid_empty_list() {
    let parsed = parse_domains(b"[]").unwrap();
    assert!(parsed.domains.is_empty());
    assert_eq!(parsed.skipped, 0);
}

#[test]
fn non_array_body_is_a_parse_error() {
    let bodies: [&[u8]; 3] = [br#"{"name":"a.com"}"#, b"null", b"\"a.com\""];
    for body in bodies {
        let err = parse_domains(body).expect_err("must fail");
        assert_eq!(err.kind().as_str(), "PARSE");
        assert!(!err.is_fatal());
    }
}

#[test]
fn invalid_json_is_a_parse_error() {
    let err = parse_domains(b"[{\"name\":").expect_err("must fail");
    assert_eq!(err.kind().as_str(), "PARSE");
}
