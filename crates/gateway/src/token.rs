//! OAuth2 access tokens for the Sheets API.
//!
//! [`ServiceAccountTokens`] signs an RS256 JWT with the service-account key,
//! exchanges it at the key's `token_uri` (JWT bearer grant) and caches the
//! access token until shortly before it expires.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::Serialize;

use crate::client::{ApiClient, RetryPolicy};
use crate::credentials::ServiceAccountKey;
use crate::error::GatewayError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Anything that can hand out a bearer token.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Result<String, GatewayError>;

    /// Drop any cached token; the next `token()` fetches a fresh one.
    fn invalidate(&self);
}

/// A fixed token. Used in tests and for pre-issued tokens.
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn token(&self) -> Result<String, GatewayError> {
        Ok(self.0.clone())
    }

    fn invalidate(&self) {}
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct ServiceAccountTokens {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    api: ApiClient,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey, timeout: Duration) -> Result<Self, GatewayError> {
        Self::with_policy(key, timeout, RetryPolicy::default())
    }

    pub fn with_policy(
        key: ServiceAccountKey,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self, GatewayError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| GatewayError::Credentials(format!("unusable private key: {}", e)))?;
        let api = ApiClient::new("Google OAuth", timeout, policy, extract_oauth_error)?;
        Ok(Self { key, signing_key, api, cached: Mutex::new(None) })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn claims(&self, now: DateTime<Utc>) -> Claims<'_> {
        let iat = now.timestamp();
        Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, GatewayError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        jsonwebtoken::encode(&header, &self.claims(now), &self.signing_key)
            .map_err(|e| GatewayError::Credentials(format!("failed to sign assertion: {}", e)))
    }

    fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, GatewayError> {
        let assertion = self.sign_assertion(now)?;
        let body = self.api.request_with_retry(|http| {
            http.post(&self.key.token_uri)
                .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        })?;

        let access_token = body["access_token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::Parse("token response has no access_token".into()))?
            .to_string();
        let expires_in = body["expires_in"].as_i64().unwrap_or(ASSERTION_LIFETIME_SECS);

        log::debug!("access token issued for {}, expires in {}s", self.key.client_email, expires_in);
        Ok(CachedToken {
            access_token,
            expires_at: now + chrono::Duration::seconds(expires_in - EXPIRY_MARGIN_SECS),
        })
    }
}

impl TokenSource for ServiceAccountTokens {
    fn token(&self) -> Result<String, GatewayError> {
        // Held across the exchange so concurrent callers share one fetch
        let mut cached = self.cached.lock();
        let now = Utc::now();
        if let Some(tok) = cached.as_ref() {
            if now < tok.expires_at {
                return Ok(tok.access_token.clone());
            }
        }
        let fresh = self.exchange(now)?;
        let token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}

fn extract_oauth_error(body: &serde_json::Value, status: u16) -> String {
    body["error_description"]
        .as_str()
        .or_else(|| body["error"].as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {}", status))
}
