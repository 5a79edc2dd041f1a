use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tera_datasources::config::{ConsulConfig, EngineConfig, VaultConfig};
use tera_datasources::core::{DataError, data_error};
use tera_datasources::data::DataManager;
use tera_datasources::readers::{AwsSmpReader, ReaderRegistry, VaultReader};
use tera_datasources::stores::{AwsCredentials, SsmClient};
use tera_datasources::test_utils::{MockSecretStore, StoreCall};
use url::Url;

fn vault_config(server: &Server) -> EngineConfig {
    EngineConfig {
        vault: VaultConfig {
            addr: Some(server.url()),
            role_id: Some("role".to_string()),
            secret_id: Some("secret".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_vault_approle_login_read_and_revoke() {
    tera_datasources::test_utils::init_test_logging(None);

    let mut server = Server::new();
    let login = server
        .mock("POST", "/v1/auth/approle/login")
        .match_body(Matcher::Json(json!({"role_id": "role", "secret_id": "secret"})))
        .with_status(200)
        .with_body(r#"{"auth":{"client_token":"t-123"}}"#)
        .expect(1)
        .create();
    let read = server
        .mock("GET", "/v1/secret/app/db")
        .match_header("x-vault-token", "t-123")
        .with_status(200)
        .with_body(r#"{"data":{"password":"hunter2"}}"#)
        .expect(1)
        .create();
    let revoke = server
        .mock("POST", "/v1/auth/token/revoke-self")
        .match_header("x-vault-token", "t-123")
        .with_status(204)
        .expect(1)
        .create();

    let data = DataManager::from_config(&vault_config(&server), &["sec=vault:///secret/app"], &[] as &[&str]).unwrap();

    let db = "db".to_string();
    assert_eq!(data.get("sec", std::slice::from_ref(&db)).unwrap(), json!({"password": "hunter2"}));
    assert_eq!(data.get("sec", std::slice::from_ref(&db)).unwrap(), json!({"password": "hunter2"}));

    let report = data.cleanup();
    assert!(report.is_clean());
    assert_eq!(report.closed, vec!["sec"]);

    login.assert();
    read.assert();
    revoke.assert();
}

#[test]
fn test_vault_dynamic_secret_write() {
    let mut server = Server::new();
    let write = server
        .mock("PUT", "/v1/aws/creds/deploy")
        .match_header("x-vault-token", "static-token")
        .match_body(Matcher::Json(json!({"ttl": "1h"})))
        .with_status(200)
        .with_body(r#"{"data":{"access_key":"AKIA"}}"#)
        .create();

    let config = EngineConfig {
        vault: VaultConfig {
            token: Some("static-token".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let decl = format!("aws=vault+{}/aws/creds", server.url());
    let data = DataManager::from_config(&config, &[decl], &[] as &[&str]).unwrap();

    let value = data.get("aws", &["deploy?ttl=1h".to_string()]).unwrap();
    assert_eq!(value["access_key"], "AKIA");
    write.assert();

    // a supplied token is never revoked
    assert!(data.cleanup().is_clean());
}

#[test]
fn test_vault_missing_secret() {
    let mut server = Server::new();
    server.mock("GET", "/v1/secret/none").with_status(404).create();

    let config = EngineConfig {
        vault: VaultConfig {
            addr: Some(server.url()),
            token: Some("tok".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let data = DataManager::from_config(&config, &["v=vault:///secret/none"], &[] as &[&str]).unwrap();

    let err = data.get("v", &[]).unwrap_err();
    assert!(matches!(data_error(&err), Some(DataError::NotFound { .. })));
    assert!(format!("{err:#}").contains("no value found for path /secret/none"));
}

#[test]
fn test_consul_key_lookup() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/v1/kv/app/db")
        .match_query(Matcher::Any)
        .match_header("x-consul-token", "acl")
        .with_status(200)
        .with_body(r#"{"host":"db.internal"}"#)
        .create();

    let config = EngineConfig {
        consul: ConsulConfig {
            addr: None,
            token: Some("acl".to_string()),
        },
        ..Default::default()
    };
    let decl = format!("kv=consul+{}/app?type=application/json", server.url());
    let data = DataManager::from_config(&config, &[decl], &[] as &[&str]).unwrap();

    assert_eq!(data.get("kv", &["db".to_string()]).unwrap(), json!({"host": "db.internal"}));
    mock.assert();
}

#[test]
fn test_consul_key_argument_is_escaped() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/v1/kv/app/a%3Fb")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("right")
        .create();

    let decl = format!("kv=consul+{}/app", server.url());
    let data = DataManager::from_config(&EngineConfig::default(), &[decl], &[] as &[&str]).unwrap();

    assert_eq!(data.include_raw("kv", &["a?b".to_string()]).unwrap(), "right");
    mock.assert();
}

#[test]
fn test_boltdb_requires_key_and_reads_bucket() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.db");
    {
        let db = sled::open(&path).unwrap();
        let tree = db.open_tree("Bucket1").unwrap();
        tree.insert("config", r#"{"debug":true}"#).unwrap();
        tree.flush().unwrap();
    }

    let decl = format!("db=boltdb://{}?type=application/json#Bucket1", path.display());
    let data = super::builtin_manager(&[&decl], &[]);

    let err = data.get("db", &[]).unwrap_err();
    assert!(matches!(data_error(&err), Some(DataError::ContractViolation { .. })));
    assert!(format!("{err:#}").contains("missing key"));

    assert_eq!(data.get("db", &["config".to_string()]).unwrap(), json!({"debug": true}));

    let err = data.get("db", &["absent".to_string()]).unwrap_err();
    assert!(matches!(data_error(&err), Some(DataError::NotFound { .. })));

    assert!(data.cleanup().is_clean());
}

#[test]
fn test_aws_parameter_store() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/")
        .match_header("x-amz-target", "AmazonSSM.GetParameter")
        .match_header("authorization", Matcher::Regex("^AWS4-HMAC-SHA256 Credential=AKID/".to_string()))
        .match_body(Matcher::Json(json!({"Name": "/prod/app/db_host", "WithDecryption": true})))
        .with_status(200)
        .with_body(r#"{"Parameter":{"Name":"/prod/app/db_host","Type":"String","Value":"db.internal","Version":3}}"#)
        .create();

    let endpoint = Url::parse(&format!("{}/", server.url())).unwrap();
    let reader = AwsSmpReader::with_connector(move |_| {
        let credentials = AwsCredentials {
            access_key_id: "AKID".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
        };
        Ok(Box::new(SsmClient::with_credentials(endpoint.clone(), "eu-west-1", credentials, Duration::from_secs(5))?))
    });
    let readers = ReaderRegistry::builder().register("aws+smp", Arc::new(reader)).build();
    let data = DataManager::new(&["param=aws+smp:///prod/app"], &[] as &[&str], Arc::new(readers)).unwrap();

    let value = data.get("param", &["db_host".to_string()]).unwrap();
    assert_eq!(value["Value"], "db.internal");
    assert_eq!(value["Version"], 3);
    mock.assert();
}

#[test]
fn test_cleanup_reports_failures_and_runs_once() {
    let store = MockSecretStore::new().with_secret("/secret/a", r#"{"v":1}"#).failing_logout();
    let shared = store.clone();
    let vault = VaultReader::with_connector(move |_| Ok(Box::new(shared.clone())));
    let readers = ReaderRegistry::builder().register("vault", Arc::new(vault)).build();
    let data = DataManager::new(&["a=vault:///secret/a"], &[] as &[&str], Arc::new(readers)).unwrap();

    data.get("a", &[]).unwrap();

    let report = data.cleanup();
    assert_eq!(report.failures.len(), 1);
    assert!(data.cleanup().failures.is_empty());

    let logouts = store.calls().into_iter().filter(|c| *c == StoreCall::Logout).count();
    assert_eq!(logouts, 1);
}
