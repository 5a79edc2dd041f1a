use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use tera_datasources::config::EngineConfig;
use tera_datasources::data::DataManager;
use tera_datasources::readers::{ReaderRegistry, StdinReader};

fn manager_with_input(input: &'static [u8], decls: &[&str]) -> DataManager {
    let readers = ReaderRegistry::builder()
        .with_builtins(&EngineConfig::default())
        .register("stdin", Arc::new(StdinReader::from_reader(Cursor::new(input))))
        .build();
    DataManager::new(decls, &[] as &[&str], Arc::new(readers)).unwrap()
}

#[test]
fn test_stdin_read_once() {
    let data = manager_with_input(b"hello", &["in=-"]);

    assert_eq!(data.include_raw("in", &[]).unwrap(), "hello");
    // the stream is exhausted; only the cache can answer
    assert_eq!(data.include_raw("in", &[]).unwrap(), "hello");
    assert_eq!(data.get("in", &[]).unwrap(), json!("hello"));
    assert_eq!(data.cache_stats().misses, 1);
}

#[test]
fn test_stdin_with_declared_type() {
    let data = manager_with_input(b"{\"n\": 2}", &["in=stdin:///?type=application/json"]);
    assert_eq!(data.get("in", &[]).unwrap(), json!({"n": 2}));
}
