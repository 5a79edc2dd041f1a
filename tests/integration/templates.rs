use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tera::{Context, Tera};
use tera_datasources::templating::{register_functions, render_str};
use url::Url;

#[test]
fn test_render_with_file_datasources() {
    let temp = TempDir::new().unwrap();
    let json_path = temp.path().join("svc.json");
    let toml_path = temp.path().join("limits.toml");
    fs::write(&json_path, r#"{"name":"api","ports":[80,443]}"#).unwrap();
    fs::write(&toml_path, "[memory]\nmax = \"512Mi\"\n").unwrap();

    let svc = format!("svc={}", Url::from_file_path(&json_path).unwrap());
    let limits = format!("limits={}", Url::from_file_path(&toml_path).unwrap());
    let data = Arc::new(super::builtin_manager(&[&svc, &limits], &[]));

    let template = r#"{% set s = datasource(alias="svc") %}{{ s.name }}:{% for p in s.ports %}{{ p }}{% if not loop.last %},{% endif %}{% endfor %} {% set l = ds(alias="limits") %}mem={{ l.memory.max }}"#;
    let out = render_str(template, Arc::clone(&data)).unwrap();
    assert_eq!(out, "api:80,443 mem=512Mi");
    assert_eq!(data.cache_stats().misses, 2);
}

#[test]
fn test_functions_alongside_context_variables() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("motd.txt");
    fs::write(&path, "welcome").unwrap();
    let decl = format!("motd={}", Url::from_file_path(&path).unwrap());
    let data = Arc::new(super::builtin_manager(&[&decl], &[]));

    let mut tera = Tera::default();
    register_functions(&mut tera, data);
    tera.add_raw_template("banner", r#"{{ user }}: {{ include(alias="motd") }}"#).unwrap();

    let mut context = Context::new();
    context.insert("user", &json!("ops"));
    assert_eq!(tera.render("banner", &context).unwrap(), "ops: welcome");
}

#[test]
fn test_guarded_optional_datasource() {
    let data = Arc::new(super::builtin_manager(&["remote=ftp://example.com/x.json"], &[]));
    let template = r#"{% if datasource_reachable(alias="remote") %}{{ ds(alias="remote") }}{% else %}fallback{% endif %}"#;
    assert_eq!(render_str(template, data).unwrap(), "fallback");
}
