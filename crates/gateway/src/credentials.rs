// Service-account key file loading

use std::path::Path;

use serde::Deserialize;

use crate::error::GatewayError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The parts of a Google service-account JSON key the bot needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// Never print the private key
impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, GatewayError> {
        let key: ServiceAccountKey = serde_json::from_str(raw)
            .map_err(|e| GatewayError::Credentials(format!("invalid key file: {}", e)))?;
        if key.client_email.trim().is_empty() {
            return Err(GatewayError::Credentials("client_email is empty".into()));
        }
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(GatewayError::Credentials("private_key is not a PEM key".into()));
        }
        Ok(key)
    }
}

pub fn load_service_account(path: &Path) -> Result<ServiceAccountKey, GatewayError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        GatewayError::Credentials(format!("cannot read {}: {}", path.display(), e))
    })?;
    warn_if_world_readable(path);
    ServiceAccountKey::from_json(&raw)
}

#[cfg(unix)]
fn warn_if_world_readable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = std::fs::metadata(path) {
        if meta.permissions().mode() & 0o004 != 0 {
            log::warn!("{} is world-readable; consider chmod 600", path.display());
        }
    }
}

#[cfg(not(unix))]
fn warn_if_world_readable(_path: &Path) {}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_KEY_PEM: &str =
        include_str!("../tests/fixtures/service_account_key.pem");

    pub(crate) fn test_key(token_uri: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "ledger-bot@example.iam.gserviceaccount.com".into(),
            private_key: TEST_KEY_PEM.into(),
            private_key_id: Some("kid-1".into()),
            token_uri: token_uri.into(),
        }
    }

    #[test]
    fn test_load_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let json = serde_json::json!({
            "type": "service_account",
            "client_email": "ledger-bot@example.iam.gserviceaccount.com",
            "private_key": TEST_KEY_PEM,
            "private_key_id": "abc",
        });
        std::fs::write(&path, json.to_string()).unwrap();

        let key = load_service_account(&path).unwrap();
        assert_eq!(key.client_email, "ledger-bot@example.iam.gserviceaccount.com");
        assert_eq!(key.private_key_id.as_deref(), Some("abc"));
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_missing_file_is_credentials_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_service_account(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, GatewayError::Credentials(ref m) if m.contains("nope.json")));
    }

    #[test]
    fn test_rejects_non_pem_key() {
        let err = ServiceAccountKey::from_json(
            r#"{"client_email": "a@b.c", "private_key": "hunter2"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Credentials(_)));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let shown = format!("{:?}", test_key(DEFAULT_TOKEN_URI));
        assert!(shown.contains("<redacted>"));
        assert!(!shown.contains("BEGIN PRIVATE KEY"));
    }
}
