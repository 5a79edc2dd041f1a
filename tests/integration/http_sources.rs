use super::builtin_manager;
use mockito::{Matcher, Server};
use serde_json::json;
use tera_datasources::core::{DataError, data_error};

#[test]
fn test_csv_with_response_content_type() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/data")
        .match_query(Matcher::UrlEncoded("type".into(), "text/csv".into()))
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body("a,b\n1,2")
        .expect(1)
        .create();

    let decl = format!("web={}/data?type=text/csv", server.url());
    let data = builtin_manager(&[&decl], &[]);

    assert_eq!(data.get("web", &[]).unwrap(), json!([["a", "b"], ["1", "2"]]));
    // cached: the second call does not reach the server
    assert_eq!(data.include_raw("web", &[]).unwrap(), "a,b\n1,2");
    mock.assert();
}

#[test]
fn test_response_type_overrides_declared_type() {
    let mut server = Server::new();
    server
        .mock("GET", "/config.json")
        .with_status(200)
        .with_header("content-type", "application/yaml")
        .with_body("key: value\n")
        .create();

    let decl = format!("cfg={}/config.json", server.url());
    let data = builtin_manager(&[&decl], &[]);

    assert_eq!(data.get("cfg", &[]).unwrap(), json!({"key": "value"}));
    assert_eq!(data.source("cfg").unwrap().media_type().essence(), "application/json");
}

#[test]
fn test_declared_headers_are_sent() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/private.json")
        .match_header("authorization", "Bearer s3cret")
        .match_header("x-team", "platform")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true}"#)
        .create();

    let decl = format!("api={}/private.json", server.url());
    let data = builtin_manager(&[&decl], &["api=Authorization: Bearer s3cret", "api=X-Team: platform"]);

    assert_eq!(data.get("api", &[]).unwrap(), json!({"ok": true}));
    mock.assert();
}

#[test]
fn test_non_200_status_is_an_error() {
    let mut server = Server::new();
    server.mock("GET", "/missing.json").with_status(404).with_body("no such thing").create();

    let decl = format!("m={}/missing.json", server.url());
    let data = builtin_manager(&[&decl], &[]);

    let err = data.get("m", &[]).unwrap_err();
    match data_error(&err) {
        Some(DataError::Transport {
            status,
            reason,
            ..
        }) => {
            assert_eq!(*status, Some(404));
            assert!(reason.contains("Unexpected HTTP status 404"), "{reason}");
            assert!(reason.contains("no such thing"), "{reason}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_failures_are_retried_on_next_call() {
    let mut server = Server::new();
    let mock = server.mock("GET", "/flaky.txt").with_status(500).expect(2).create();

    let decl = format!("f={}/flaky.txt", server.url());
    let data = builtin_manager(&[&decl], &[]);

    assert!(!data.is_reachable("f", &[]));
    assert!(!data.is_reachable("f", &[]));
    mock.assert();
}
