//! Integration tests for the login handshake and heartbeat handlers,
//! exercised through the crate's public API only.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rpcforge_protocol::{ConnectionId, LoginOverrides, Parameters};
use rpcforge_session::{
    AcceptAll, ApiError, CredentialVerifier, HandshakeHandler, KEY_ATTRIBUTE,
    KeepaliveHandler, KeyDeriver, LogSink, SERVER_TIME, Session,
    SessionConfig,
};
use serde_json::json;

// =========================================================================
// Test doubles
// =========================================================================

/// Captures everything a session writes.
#[derive(Default)]
struct RecordingSink {
    prefix_calls: AtomicUsize,
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl LogSink for RecordingSink {
    fn set_prefix(&self, _prefix: &str) {
        self.prefix_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn write(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Returns a fixed result and counts how often it was asked.
struct ScriptedVerifier {
    result: fn() -> Result<Option<LoginOverrides>, ApiError>,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    fn new(result: fn() -> Result<Option<LoginOverrides>, ApiError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }
}

impl CredentialVerifier for ScriptedVerifier {
    async fn verify(
        &self,
        _user: &str,
        _pass: &str,
    ) -> Result<Option<LoginOverrides>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.result)()
    }
}

/// Records how many keys it was asked for.
#[derive(Clone, Default)]
struct SpyDeriver {
    calls: Arc<AtomicUsize>,
}

impl KeyDeriver for SpyDeriver {
    fn derive_key(&self) -> Result<Vec<u8>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08])
    }
}

struct FailingDeriver;

impl KeyDeriver for FailingDeriver {
    fn derive_key(&self) -> Result<Vec<u8>, ApiError> {
        Err(ApiError::InternalFailure("entropy unavailable".into()))
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn recorded_session(id: u64) -> (Session, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let session = Session::new(ConnectionId::new(id), sink.clone());
    (session, sink)
}

fn params(value: serde_json::Value) -> Parameters {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

// =========================================================================
// Login: required username
// =========================================================================

#[tokio::test]
async fn test_login_empty_user_fails_before_any_side_effect() {
    let verifier = ScriptedVerifier::new(|| {
        Ok(Some(LoginOverrides::new().with_user("someone")))
    });
    let handler = HandshakeHandler::new(SessionConfig::default(), verifier);
    let (session, sink) = recorded_session(1);

    let err = handler.login(&session, "", "x").await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidArgument { code: 3, .. }));
    assert_eq!(err.code(), 3);
    assert_eq!(handler.verifier().calls.load(Ordering::SeqCst), 0);
    assert!(session.identity().is_none());
    assert!(session.key_material().is_none());
    assert!(session.attribute(KEY_ATTRIBUTE).is_none());
    assert!(sink.lines().is_empty(), "nothing should be logged");
}

#[tokio::test]
async fn test_login_empty_user_fails_with_rejecting_verifier_too() {
    let verifier = ScriptedVerifier::new(|| {
        Err(ApiError::CredentialRejected("bad password".into()))
    });
    let handler = HandshakeHandler::new(SessionConfig::default(), verifier);
    let (session, _) = recorded_session(1);

    let err = handler.login(&session, "", "").await.unwrap_err();

    assert_eq!(err.code(), 3);
}

#[tokio::test]
async fn test_login_user_overridden_to_empty_fails_without_commit() {
    let deriver = SpyDeriver::default();
    let verifier =
        ScriptedVerifier::new(|| Ok(Some(LoginOverrides::new().with_user(""))));
    let handler = HandshakeHandler::with_deriver(
        SessionConfig::default(),
        verifier,
        deriver.clone(),
    );
    let (session, _) = recorded_session(1);

    let err = handler.login(&session, "alice", "pw").await.unwrap_err();

    assert_eq!(err.code(), 3);
    assert_eq!(deriver.calls.load(Ordering::SeqCst), 0);
    assert!(session.identity().is_none());
    assert!(session.key_material().is_none());
    assert!(session.attribute(KEY_ATTRIBUTE).is_none());
}

// =========================================================================
// Login: identity commit and overrides
// =========================================================================

#[tokio::test]
async fn test_login_noop_verifier_commits_submitted_user() {
    let handler = HandshakeHandler::new(SessionConfig::default(), AcceptAll);
    let (session, _) = recorded_session(1);

    let response = handler.login(&session, "alice", "pw").await.unwrap();

    assert_eq!(session.identity().as_deref(), Some("alice"));
    assert!(session.is_authenticated());
    let key = response.key_str().expect("generated key is a hex string");
    assert_eq!(key.len(), 16);
    assert_eq!(hex::decode(key).unwrap(), session.key_material().unwrap());
}

#[tokio::test]
async fn test_login_user_override_is_committed() {
    let verifier = ScriptedVerifier::new(|| {
        Ok(Some(LoginOverrides::new().with_user("alice2")))
    });
    let handler = HandshakeHandler::new(SessionConfig::default(), verifier);
    let (session, _) = recorded_session(1);

    let response = handler.login(&session, "alice", "pw").await.unwrap();

    assert_eq!(session.identity().as_deref(), Some("alice2"));
    assert_eq!(response.user.as_deref(), Some("alice2"));
}

#[tokio::test]
async fn test_login_user_and_pass_overrides_never_leak_originals() {
    let verifier = ScriptedVerifier::new(|| {
        Ok(Some(
            LoginOverrides::new()
                .with_user("registered-7")
                .with_pass("issued-secret"),
        ))
    });
    let handler = HandshakeHandler::new(SessionConfig::default(), verifier);
    let (session, sink) = recorded_session(1);

    let response = handler.login(&session, "guest", "guestpw").await.unwrap();

    assert_eq!(session.identity().as_deref(), Some("registered-7"));
    assert_eq!(response.user.as_deref(), Some("registered-7"));
    assert_eq!(response.pass.as_deref(), Some("issued-secret"));
    assert!(session.attribute("guest").is_none());
    assert!(session.attribute("guestpw").is_none());

    // The key record is already attributed to the rewritten identity.
    let lines = sink.lines();
    assert!(lines[1].contains(" registered-7 key generated "), "{lines:?}");
}

// =========================================================================
// Login: key presence and derivation
// =========================================================================

#[tokio::test]
async fn test_login_response_always_has_key() {
    let deriver = SpyDeriver::default();
    let handler = HandshakeHandler::with_deriver(
        SessionConfig::default(),
        AcceptAll,
        deriver.clone(),
    );
    let (session, _) = recorded_session(1);

    let response = handler.login(&session, "alice", "pw").await.unwrap();

    assert_eq!(response.key_str(), Some("0102030405060708"));
    assert_eq!(deriver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        session.attribute(KEY_ATTRIBUTE).unwrap().as_bytes(),
        Some(&[1u8, 2, 3, 4, 5, 6, 7, 8][..])
    );
}

#[tokio::test]
async fn test_login_verifier_key_suppresses_deriver() {
    let deriver = SpyDeriver::default();
    let verifier = ScriptedVerifier::new(|| {
        Ok(Some(LoginOverrides::new().with_key("CAFEBABE")))
    });
    let handler = HandshakeHandler::with_deriver(
        SessionConfig::default(),
        verifier,
        deriver.clone(),
    );
    let (session, sink) = recorded_session(1);

    let response = handler.login(&session, "alice", "pw").await.unwrap();

    assert_eq!(response.key_str(), Some("CAFEBABE"));
    assert_eq!(deriver.calls.load(Ordering::SeqCst), 0);
    assert!(session.key_material().is_none());
    assert!(session.attribute(KEY_ATTRIBUTE).is_none());
    assert_eq!(sink.lines().len(), 1, "key record must be skipped");
}

#[tokio::test]
async fn test_relogin_with_verifier_key_drops_earlier_derived_key() {
    let first = HandshakeHandler::new(SessionConfig::default(), AcceptAll);
    let second = HandshakeHandler::new(
        SessionConfig::default(),
        ScriptedVerifier::new(|| {
            Ok(Some(LoginOverrides::new().with_key("CAFEBABE")))
        }),
    );
    let (session, _) = recorded_session(1);

    first.login(&session, "alice", "pw").await.unwrap();
    assert!(session.key_material().is_some());
    let response = second.login(&session, "alice", "pw").await.unwrap();

    assert_eq!(response.key_str(), Some("CAFEBABE"));
    assert!(session.key_material().is_none());
    assert!(session.attribute(KEY_ATTRIBUTE).is_none());
}

#[tokio::test]
async fn test_login_deriver_failure_commits_nothing() {
    let handler = HandshakeHandler::with_deriver(
        SessionConfig::default(),
        AcceptAll,
        FailingDeriver,
    );
    let (session, _) = recorded_session(1);

    let err = handler.login(&session, "alice", "pw").await.unwrap_err();

    assert!(matches!(err, ApiError::InternalFailure(ref m) if m == "entropy unavailable"));
    assert_eq!(err.code(), 500);
    assert!(session.identity().is_none());
    assert!(session.key_material().is_none());
}

#[tokio::test]
async fn test_login_verifier_error_propagates_unchanged() {
    let verifier = ScriptedVerifier::new(|| {
        Err(ApiError::CredentialRejected("bad password".into()))
    });
    let handler = HandshakeHandler::new(SessionConfig::default(), verifier);
    let (session, _) = recorded_session(1);

    let err = handler.login(&session, "alice", "nope").await.unwrap_err();

    assert!(matches!(err, ApiError::CredentialRejected(ref m) if m == "bad password"));
    assert!(session.identity().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_login_concurrent_sessions_never_share_keys() {
    let handler =
        Arc::new(HandshakeHandler::new(SessionConfig::default(), AcceptAll));

    let tasks: Vec<_> = (0..10_000u64)
        .map(|i| {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let (session, _) = recorded_session(i);
                handler.login(&session, "load", "pw").await.unwrap();
                session.key_material().unwrap()
            })
        })
        .collect();

    let mut keys = HashSet::new();
    for task in tasks {
        let key = task.await.unwrap();
        assert_eq!(key.len(), 8);
        assert!(keys.insert(key), "two sessions received the same key");
    }
    assert_eq!(keys.len(), 10_000);
}

// =========================================================================
// Ping
// =========================================================================

#[test]
fn test_ping_echoes_params_and_adds_server_time() {
    let handler = KeepaliveHandler::new(SessionConfig::default());
    let (session, _) = recorded_session(1);

    let response = handler.ping(&session, params(json!({ "foo": 1 }))).unwrap();
    let now = Utc::now();

    assert_eq!(response.extra, params(json!({ "foo": 1 })));
    let drift = now - response.server_time;
    assert!(drift.num_milliseconds().abs() < 1_000, "drift {drift}");

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["foo"], 1);
    assert!(json[SERVER_TIME].is_string());
}

#[test]
fn test_ping_works_before_login() {
    let handler = KeepaliveHandler::new(SessionConfig::default());
    let (session, _) = recorded_session(1);

    handler.ping(&session, Parameters::new()).unwrap();

    assert!(session.identity().is_none());
}

// =========================================================================
// Diagnostic label
// =========================================================================

#[tokio::test]
async fn test_logged_operations_share_one_label() {
    let config = SessionConfig {
        display_name: "Echo".into(),
        ..SessionConfig::default()
    };
    let login = HandshakeHandler::new(config.clone(), AcceptAll);
    let ping = KeepaliveHandler::new(config);
    let (session, sink) = recorded_session(9);

    ping.ping(&session, Parameters::new()).unwrap();
    login.login(&session, "alice", "pw").await.unwrap();
    ping.ping(&session, Parameters::new()).unwrap();

    let lines = sink.lines();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|l| l.starts_with("Echo[9] ")), "{lines:?}");
    assert_eq!(lines[0], "Echo[9]  ping");
    assert_eq!(lines[1], "Echo[9]  login alice/pw");
    assert_eq!(lines[3], "Echo[9] alice ping");
    assert_eq!(sink.prefix_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.diagnostics().cached_label(), Some("Echo[9]"));
}

#[test]
fn test_label_computed_once_under_concurrent_first_use() {
    let handler = Arc::new(KeepaliveHandler::new(SessionConfig::default()));
    let (session, sink) = recorded_session(3);
    let session = Arc::new(session);

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let handler = Arc::clone(&handler);
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                handler.ping(&session, Parameters::new()).unwrap();
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(sink.prefix_calls.load(Ordering::SeqCst), 1);
    let lines = sink.lines();
    assert_eq!(lines.len(), 8);
    assert!(lines.iter().all(|l| l == "Api[3]  ping"), "{lines:?}");
}
