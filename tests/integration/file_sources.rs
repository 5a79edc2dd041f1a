use super::builtin_manager;
use serde_json::json;
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tera_datasources::core::{DataError, data_error};
use url::Url;

/// Switch the working directory for the life of the guard.
struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    fn enter(dir: &Path) -> Self {
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        Self {
            previous,
        }
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous);
    }
}

fn file_url(path: &Path) -> String {
    Url::from_file_path(path).unwrap().to_string()
}

#[test]
#[serial]
fn test_relative_declaration_from_working_directory() {
    tera_datasources::test_utils::init_test_logging(None);

    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("testdata")).unwrap();
    fs::write(temp.path().join("testdata/config.json"), r#"{"a":1}"#).unwrap();
    let _cwd = CwdGuard::enter(temp.path());

    let data = builtin_manager(&["cfg=testdata/config.json"], &[]);

    assert!(data.exists("cfg"));
    assert!(!data.exists("missing"));
    assert_eq!(data.get("cfg", &[]).unwrap(), json!({"a": 1}));
}

#[test]
#[serial]
fn test_bare_filename_alias() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("settings.prod.yaml"), "replicas: 3\n").unwrap();
    let _cwd = CwdGuard::enter(temp.path());

    let data = builtin_manager(&["settings.prod.yaml"], &[]);

    assert_eq!(data.aliases(), vec!["settings"]);
    assert_eq!(data.get("settings", &[]).unwrap(), json!({"replicas": 3}));
}

#[test]
fn test_bare_filename_with_separator_rejected() {
    let readers = std::sync::Arc::new(tera_datasources::readers::ReaderRegistry::default());
    let err = tera_datasources::data::DataManager::new(&["dir/config.json"], &[] as &[&str], readers).unwrap_err();
    assert!(matches!(data_error(&err), Some(DataError::Parse { .. })));
}

#[test]
fn test_absolute_file_urls_by_type() {
    let temp = TempDir::new().unwrap();
    let files = [
        ("a.json", r#"{"k":"v"}"#),
        ("b.yml", "- one\n- two\n"),
        ("c.csv", "x,y\n1,2\n"),
        ("d.toml", "name = \"svc\"\n"),
        ("e.txt", "plain"),
    ];
    for (name, body) in files {
        fs::write(temp.path().join(name), body).unwrap();
    }

    let decls: Vec<String> = files
        .iter()
        .map(|(name, _)| format!("{}={}", &name[..1], file_url(&temp.path().join(name))))
        .collect();
    let decls: Vec<&str> = decls.iter().map(String::as_str).collect();
    let data = builtin_manager(&decls, &[]);

    assert_eq!(data.get("a", &[]).unwrap(), json!({"k": "v"}));
    assert_eq!(data.get("b", &[]).unwrap(), json!(["one", "two"]));
    assert_eq!(data.get("c", &[]).unwrap(), json!([["x", "y"], ["1", "2"]]));
    assert_eq!(data.get("d", &[]).unwrap(), json!({"name": "svc"}));
    assert_eq!(data.get("e", &[]).unwrap(), json!("plain"));
}

#[test]
fn test_type_parameter_overrides_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("data.txt");
    fs::write(&path, r#"{"from":"txt"}"#).unwrap();

    let decl = format!("d={}?type=application/json", file_url(&path));
    let data = builtin_manager(&[&decl], &[]);

    assert_eq!(data.source("d").unwrap().media_type().essence(), "application/json");
    assert_eq!(data.get("d", &[]).unwrap(), json!({"from": "txt"}));
}

#[test]
fn test_missing_file_is_not_found() {
    let temp = TempDir::new().unwrap();
    let decl = format!("gone={}", file_url(&temp.path().join("gone.json")));
    let data = builtin_manager(&[&decl], &[]);

    let err = data.get("gone", &[]).unwrap_err();
    assert_eq!(err.to_string(), "Couldn't read datasource 'gone'");
    assert!(matches!(data_error(&err), Some(DataError::NotFound { .. })));
    assert!(!data.is_reachable("gone", &[]));
}

#[test]
fn test_file_read_once_per_process() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v.txt");
    fs::write(&path, "first").unwrap();

    let decl = format!("v={}", file_url(&path));
    let data = builtin_manager(&[&decl], &[]);

    assert_eq!(data.include_raw("v", &[]).unwrap(), "first");
    fs::write(&path, "second").unwrap();
    assert_eq!(data.include_raw("v", &[]).unwrap(), "first");

    let stats = data.cache_stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn test_unsupported_scheme_only_on_read() {
    let data = builtin_manager(&["f=ftp://example.com/data.json"], &[]);
    assert!(data.exists("f"));

    let err = data.get("f", &[]).unwrap_err();
    assert_eq!(err.to_string(), "Datasources with scheme ftp not yet supported");
}
