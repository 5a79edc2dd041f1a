//! Test utilities for tera-datasources
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration tests.
//!
//! - [`init_test_logging`] - once-only tracing subscriber for tests
//! - [`MockSecretStore`], [`MockKvStore`], [`MockParameterStore`] - in-memory
//!   backends that record every call
//! - [`CountingReader`] - a reader that counts how often it is invoked
//!
//! The mocks are cheap to clone and clones share state, so a test can hand
//! one clone to a reader's connector and inspect the other.
//!
//! # Example
//!
//! ```rust,no_run
//! use tera_datasources::readers::VaultReader;
//! use tera_datasources::test_utils::{MockSecretStore, StoreCall};
//!
//! let store = MockSecretStore::new().with_secret("/secret/app", r#"{"password":"pw"}"#);
//! let shared = store.clone();
//! let reader = VaultReader::with_connector(move |_| Ok(Box::new(shared.clone())));
//! // ... register `reader` and render ...
//! assert!(store.calls().contains(&StoreCall::Login));
//! ```

use crate::core::DataError;
use crate::readers::{Handle, Reader, Retrieved};
use crate::source::{MediaType, Source};
use crate::stores::{KvStore, Parameter, ParameterStore, SecretStore};
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has any effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=tera_datasources=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A call recorded by one of the mock stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// Session authentication
    Login,
    /// Read of a path or key
    Read(String),
    /// Write of a path with its parameters
    Write(String, BTreeMap<String, String>),
    /// Parameter lookup by full name
    GetParameter(String),
    /// Session release
    Logout,
}

#[derive(Default)]
struct MockState {
    values: HashMap<String, Vec<u8>>,
    calls: Vec<StoreCall>,
    fail_login: bool,
    fail_logout: bool,
}

impl MockState {
    fn record(&mut self, call: StoreCall) {
        self.calls.push(call);
    }
}

/// Shared, lock-protected state behind every mock store.
#[derive(Clone, Default)]
struct Shared(Arc<Mutex<MockState>>);

impl Shared {
    fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut state)
    }

    fn insert(self, key: &str, value: impl Into<Vec<u8>>) -> Self {
        self.with(|s| s.values.insert(key.to_string(), value.into()));
        self
    }

    fn calls(&self) -> Vec<StoreCall> {
        self.with(|s| s.calls.clone())
    }

    fn login(&self) -> Result<()> {
        self.with(|s| {
            s.record(StoreCall::Login);
            if s.fail_login {
                return Err(DataError::Transport {
                    operation: "mock login".to_string(),
                    reason: "permission denied".to_string(),
                    status: Some(403),
                }
                .into());
            }
            Ok(())
        })
    }

    fn logout(&self) -> Result<()> {
        self.with(|s| {
            s.record(StoreCall::Logout);
            if s.fail_logout {
                return Err(DataError::transport("mock logout", "connection reset").into());
            }
            Ok(())
        })
    }
}

/// In-memory [`SecretStore`]. Reads and writes both return the secret stored
/// at the path, or nothing.
#[derive(Clone, Default)]
pub struct MockSecretStore {
    state: Shared,
}

impl MockSecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `path`.
    #[must_use]
    pub fn with_secret(self, path: &str, value: &str) -> Self {
        Self {
            state: self.state.insert(path, value),
        }
    }

    /// Make every logout fail.
    #[must_use]
    pub fn failing_logout(self) -> Self {
        self.state.with(|s| s.fail_logout = true);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.calls()
    }
}

impl SecretStore for MockSecretStore {
    fn login(&mut self) -> Result<()> {
        self.state.login()
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        Ok(self.state.with(|s| {
            s.record(StoreCall::Read(path.to_string()));
            s.values.get(path).cloned().unwrap_or_default()
        }))
    }

    fn write(&mut self, path: &str, params: &BTreeMap<String, String>) -> Result<Vec<u8>> {
        Ok(self.state.with(|s| {
            s.record(StoreCall::Write(path.to_string(), params.clone()));
            s.values.get(path).cloned().unwrap_or_default()
        }))
    }

    fn logout(&mut self) -> Result<()> {
        self.state.logout()
    }
}

/// In-memory [`KvStore`]. Missing keys are [`DataError::NotFound`].
#[derive(Clone, Default)]
pub struct MockKvStore {
    state: Shared,
}

impl MockKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`.
    #[must_use]
    pub fn with_value(self, key: &str, value: &str) -> Self {
        Self {
            state: self.state.insert(key, value),
        }
    }

    /// Make every login fail with a 403 transport error.
    #[must_use]
    pub fn failing_login(self) -> Self {
        self.state.with(|s| s.fail_login = true);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.calls()
    }
}

impl KvStore for MockKvStore {
    fn login(&mut self) -> Result<()> {
        self.state.login()
    }

    fn read(&mut self, key: &str) -> Result<Vec<u8>> {
        self.state.with(|s| {
            s.record(StoreCall::Read(key.to_string()));
            s.values
                .get(key)
                .cloned()
                .ok_or_else(|| DataError::not_found(format!("Key not found: {key}")).into())
        })
    }

    fn logout(&mut self) -> Result<()> {
        self.state.logout()
    }
}

/// In-memory [`ParameterStore`] holding `String` parameters.
#[derive(Clone, Default)]
pub struct MockParameterStore {
    state: Shared,
}

impl MockParameterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a parameter.
    #[must_use]
    pub fn with_parameter(self, name: &str, value: &str) -> Self {
        Self {
            state: self.state.insert(name, value),
        }
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.calls()
    }
}

impl ParameterStore for MockParameterStore {
    fn get_parameter(&mut self, name: &str) -> Result<Parameter> {
        self.state.with(|s| {
            s.record(StoreCall::GetParameter(name.to_string()));
            let Some(value) = s.values.get(name) else {
                return Err(DataError::not_found(format!("Parameter not found: {name}")).into());
            };
            Ok(Parameter {
                name: name.to_string(),
                kind: "String".to_string(),
                value: String::from_utf8_lossy(value).into_owned(),
                version: 1,
                ..Default::default()
            })
        })
    }
}

/// A [`Reader`] that returns a fixed payload (or a fixed error) and counts
/// its invocations.
#[derive(Clone)]
pub struct CountingReader {
    calls: Arc<AtomicUsize>,
    outcome: std::result::Result<Retrieved, DataError>,
}

impl CountingReader {
    /// Succeed with `payload` on every call.
    pub fn returning(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            outcome: Ok(Retrieved::new(payload.into())),
        }
    }

    /// Succeed with `payload`, reporting `media_type` as authoritative.
    ///
    /// # Errors
    ///
    /// Returns an error if `media_type` does not parse.
    pub fn returning_typed(payload: impl Into<Vec<u8>>, media_type: &str) -> Result<Self> {
        Ok(Self {
            calls: Arc::new(AtomicUsize::new(0)),
            outcome: Ok(Retrieved::new(payload.into()).with_media_type(MediaType::parse(media_type)?)),
        })
    }

    /// Fail with `error` on every call.
    #[must_use]
    pub fn failing(error: DataError) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            outcome: Err(error),
        }
    }

    /// Number of times [`Reader::read`] has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Reader for CountingReader {
    fn read(&self, _source: &Source, _handle: &mut Handle, _args: &[String]) -> Result<Retrieved> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(retrieved) => Ok(retrieved.clone()),
            Err(error) => Err(error.clone().into()),
        }
    }
}
