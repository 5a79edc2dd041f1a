//! AWS Systems Manager Parameter Store client.
//!
//! Calls `GetParameter` over the JSON 1.1 protocol, signing each request with
//! AWS Signature Version 4 (`hmac` + `sha2`). Credentials come from
//! `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.

use super::{Parameter, ParameterStore};
use crate::config::AwsConfig;
use crate::core::DataError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "ssm";
const DEFAULT_REGION: &str = "us-east-1";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET: &str = "AmazonSSM.GetParameter";

/// AWS credentials used to sign requests.
#[derive(Clone)]
pub struct AwsCredentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Session token for temporary credentials
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Load credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// and optionally `AWS_SESSION_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Config`] if either required variable is unset.
    pub fn from_env() -> Result<Self, DataError> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| DataError::Config {
                message: format!("{name} environment variable not set"),
            })
        };

        Ok(Self {
            access_key_id: var("AWS_ACCESS_KEY_ID")?,
            secret_access_key: var("AWS_SECRET_ACCESS_KEY")?,
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
        })
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterResponse {
    parameter: Parameter,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: String,
}

/// A Parameter Store client bound to one region and endpoint.
pub struct SsmClient {
    http: Client,
    endpoint: Url,
    region: String,
    credentials: AwsCredentials,
}

impl SsmClient {
    /// Build a client from configuration and environment credentials.
    ///
    /// The region defaults to `us-east-1`; the endpoint defaults to the
    /// regional public endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing, the endpoint is invalid,
    /// or the HTTP client cannot be built.
    pub fn new(config: &AwsConfig, timeout: Duration) -> Result<Self> {
        let region = config.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://ssm.{region}.amazonaws.com/"),
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| DataError::parse(endpoint.clone(), format!("invalid AWS endpoint: {e}")))?;

        Self::with_credentials(endpoint, region, AwsCredentials::from_env()?, timeout)
    }

    /// Build a client with explicit credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_credentials(
        endpoint: Url,
        region: impl Into<String>,
        credentials: AwsCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build().context("Failed to build SSM HTTP client")?;
        Ok(Self {
            http,
            endpoint,
            region: region.into(),
            credentials,
        })
    }

    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

impl ParameterStore for SsmClient {
    fn get_parameter(&mut self, name: &str) -> Result<Parameter> {
        let operation = format!("ssm GetParameter {name}");
        let body = serde_json::to_string(&serde_json::json!({ "Name": name, "WithDecryption": true }))?;
        let signed = sign_request(
            &self.credentials,
            &self.region,
            &self.host(),
            self.endpoint.path(),
            body.as_bytes(),
            Utc::now(),
        );

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", TARGET)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization);
        if let Some(token) = &self.credentials.session_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request.body(body).send().map_err(|e| DataError::transport(operation.clone(), e))?;
        let status = response.status();
        let text = response.text().with_context(|| format!("Failed to read response of {operation}"))?;

        if !status.is_success() {
            let error: Option<ErrorResponse> = serde_json::from_str(&text).ok();
            if error.as_ref().is_some_and(|e| e.kind.ends_with("ParameterNotFound")) {
                return Err(DataError::not_found(format!("Parameter not found: {name}")).into());
            }
            let reason = match error {
                Some(error) => format!("HTTP {status}: {} {}", error.kind, error.message),
                None => format!("HTTP {status}: {}", text.trim()),
            };
            return Err(DataError::Transport {
                operation,
                reason,
                status: Some(status.as_u16()),
            }
            .into());
        }

        let parsed: GetParameterResponse = serde_json::from_str(&text)
            .map_err(|e| DataError::transport(operation, format!("invalid response: {e}")))?;
        Ok(parsed.parameter)
    }
}

/// The signature-bearing headers for one request.
struct SignedRequest {
    amz_date: String,
    authorization: String,
}

/// Sign a JSON 1.1 `POST` to the SSM API.
fn sign_request(
    creds: &AwsCredentials,
    region: &str,
    host: &str,
    path: &str,
    payload: &[u8],
    now: DateTime<Utc>,
) -> SignedRequest {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let payload_hash = hex_sha256(payload);

    let mut headers = vec![
        ("content-type".to_string(), CONTENT_TYPE.to_string()),
        ("host".to_string(), host.to_string()),
        ("x-amz-date".to_string(), amz_date.clone()),
        ("x-amz-target".to_string(), TARGET.to_string()),
    ];
    if let Some(token) = &creds.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers = headers.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(";");
    let canonical_headers: String = headers.iter().map(|(k, v)| format!("{k}:{v}\n")).collect();
    let canonical_path = if path.is_empty() {
        "/"
    } else {
        path
    };

    let canonical_request =
        format!("POST\n{canonical_path}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}");

    let credential_scope = format!("{date_stamp}/{region}/{SERVICE}/aws4_request");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{}",
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(&creds.secret_access_key, &date_stamp, region, SERVICE);
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    SignedRequest {
        amz_date,
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            creds.access_key_id
        ),
    }
}

fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}
