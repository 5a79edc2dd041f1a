use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temp directory with an (initially empty) config file.
struct CliProject {
    dir: TempDir,
}

impl CliProject {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tds.toml"), "").unwrap();
        Self {
            dir,
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn tds(&self) -> Command {
        let mut cmd = Command::cargo_bin("tds").unwrap();
        cmd.current_dir(self.path())
            .arg("--config")
            .arg(self.path().join("tds.toml"))
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

#[test]
fn test_get_prints_json() {
    let project = CliProject::new();
    project.write("config.json", r#"{"a":1}"#);

    project
        .tds()
        .args(["-d", "cfg=config.json", "get", "cfg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"a\": 1"));
}

#[test]
fn test_render_inline_template() {
    let project = CliProject::new();
    project.write("app.yaml", "name: billing\nreplicas: 2\n");

    project
        .tds()
        .args([
            "-d",
            "app=app.yaml",
            "render",
            "--in",
            r#"{% set a = ds(alias="app") %}{{ a.name }} x{{ a.replicas }}"#,
        ])
        .assert()
        .success()
        .stdout("billing x2");
}

#[test]
fn test_render_file_to_output() {
    let project = CliProject::new();
    project.write("hosts.csv", "web,10.0.0.1\ndb,10.0.0.2\n");
    let template = project.write(
        "hosts.tmpl",
        "{% set hosts = datasource(alias=\"hosts\") %}{% for row in hosts %}{{ row.1 }} {{ row.0 }}\n{% endfor %}",
    );
    let out = project.path().join("hosts");

    project
        .tds()
        .args(["-d", "hosts=hosts.csv", "render", "--file"])
        .arg(&template)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(out).unwrap(), "10.0.0.1 web\n10.0.0.2 db\n");
}

#[test]
fn test_raw_from_stdin() {
    let project = CliProject::new();

    project.tds().args(["-d", "in=-", "raw", "in"]).write_stdin("hello").assert().success().stdout("hello");
}

#[test]
fn test_list_includes_configured_datasources() {
    let project = CliProject::new();
    project.write("tds.toml", "[datasources]\nremote = \"https://example.com/data.csv\"\n");

    project
        .tds()
        .args(["-d", "local=local.json", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("remote https://example.com/data.csv (text/csv)"))
        .stdout(predicate::str::contains("local"));
}

#[test]
fn test_undefined_alias_fails_with_suggestion() {
    let project = CliProject::new();
    project.write("config.json", "{}");

    project
        .tds()
        .args(["-d", "config=config.json", "get", "confg"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Undefined datasource 'confg'"))
        .stderr(predicate::str::contains("config"));
}

#[test]
fn test_render_requires_a_template() {
    let project = CliProject::new();
    project.tds().arg("render").assert().failure();
}

#[test]
fn test_invalid_config_is_reported() {
    let project = CliProject::new();
    project.write("tds.toml", "[http]\ntimeout_secs = 0\n");

    project
        .tds()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout_secs"));
}
