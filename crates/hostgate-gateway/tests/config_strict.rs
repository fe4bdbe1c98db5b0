#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use hostgate_gateway::config::{self, FilterConfig};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
gateway:
  listen: "0.0.0.0:8080"
  instancez: 2 # typo should fail
filter:
  api_host: "cp.internal"
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
    assert!(err.is_fatal());
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
filter:
  api_host: "cp.internal"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.instances, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:8080");
    assert!(cfg.gateway.upstream.is_none());

    let filter = FilterConfig::from_json(&cfg.plugin_configuration().unwrap()).unwrap();
    assert_eq!(filter.api_host, "cp.internal");
}

#[test]
fn rejects_unsupported_version_and_bad_ranges() {
    let v2 = "version: 2\nfilter: { api_host: a }\n";
    assert_eq!(config::load_from_str(v2).unwrap_err().kind().as_str(), "CONFIG");

    let zero = "version: 1\ngateway: { instances: 0 }\nfilter: { api_host: a }\n";
    assert!(config::load_from_str(zero).is_err());

    let cluster = "version: 1\nclusters: { controlplane: \"127.0.0.1:9000\" }\nfilter: { api_host: a }\n";
    assert!(config::load_from_str(cluster).is_err());
}

#[test]
fn filter_defaults() {
    let cfg = FilterConfig::from_json(br#"{"api_host":"cp.internal"}"#).unwrap();
    assert_eq!(cfg.refresh_interval_ms, 5000);
    assert_eq!(cfg.call_timeout_ms, 5000);
    assert_eq!(cfg.cluster, "controlplane");
    assert_eq!(cfg.domains_path, "/domains");
    assert!(!cfg.fetch_on_start);
    assert!(!cfg.allow_overlapping_fetches);
}

#[test]
fn filter_requires_api_host() {
    let cases: [&[u8]; 3] = [br#"{}"#, br#"{"api_host":""}"#, br#"{"api_host":"   "}"#];
    for raw in cases {
        let err = FilterConfig::from_json(raw).expect_err("must fail");
        assert_eq!(err.kind().as_str(), "CONFIG");
        assert!(err.to_string().contains("api_host is not set"));
    }
}

#[test]
fn filter_rejects_bad_values() {
    let cases: [&[u8]; 4] = [
        br#"{"api_host":"a","refresh_interval_ms":0}"#,
        br#"{"api_host":"a","call_timeout_ms":999999}"#,
        br#"{"api_host":"a","domains_path":"domains"}"#,
        br#"{"api_host":"a","tick":1}"#,
    ];
    for raw in cases {
        assert!(FilterConfig::from_json(raw).is_err());
    }
}
