//! Blocking HTTP adapters for the ledger bot.
//!
//! - [`sheets::SheetsClient`]: Google Sheets v4 values API as a `TabularStore`
//! - [`token::ServiceAccountTokens`]: OAuth2 service-account token source
//! - [`telegram::TelegramClient`]: Telegram Bot API long polling
//!
//! All of them share [`client::ApiClient`] for timeouts, retries and the
//! circuit breaker.

pub mod breaker;
pub mod client;
pub mod credentials;
pub mod error;
pub mod sheets;
pub mod telegram;
pub mod token;

pub use breaker::CircuitBreaker;
pub use client::{ApiClient, RetryPolicy};
pub use credentials::{load_service_account, ServiceAccountKey};
pub use error::GatewayError;
pub use sheets::SheetsClient;
pub use telegram::{Incoming, TelegramClient, Update};
pub use token::{ServiceAccountTokens, StaticToken, TokenSource};
