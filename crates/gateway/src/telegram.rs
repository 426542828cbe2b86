//! Telegram Bot API client (long polling).
//!
//! Only the handful of methods the bot needs: `getMe`, `getUpdates`,
//! `sendMessage` and `answerCallbackQuery`. Request URLs embed the bot
//! token, so they are never logged and transport errors are stripped of
//! their URL before they surface.

use std::time::Duration;

use nasiya_engine::{Actor, InboundEvent, ParseMode, Reply};
use serde::Deserialize;

use crate::client::ApiClient;
use crate::error::GatewayError;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// An update the bot can act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub chat_id: i64,
    pub event: InboundEvent,
    /// Set for button presses; must be answered to stop the client spinner.
    pub callback_id: Option<String>,
}

fn actor(user: &User) -> Actor {
    Actor { id: user.id, handle: user.username.clone() }
}

impl Update {
    /// `None` for update kinds the bot ignores (edits, stickers, channel posts).
    pub fn incoming(&self) -> Option<Incoming> {
        if let Some(msg) = &self.message {
            let from = msg.from.as_ref()?;
            let text = msg.text.as_deref()?;
            return Some(Incoming {
                chat_id: msg.chat.id,
                event: InboundEvent::message(actor(from), text),
                callback_id: None,
            });
        }
        if let Some(query) = &self.callback_query {
            let chat_id = query.message.as_ref().map(|m| m.chat.id).unwrap_or(query.from.id);
            let data = query.data.as_deref().unwrap_or("");
            return Some(Incoming {
                chat_id,
                event: InboundEvent::button(actor(&query.from), data),
                callback_id: Some(query.id.clone()),
            });
        }
        None
    }
}

fn extract_telegram_error(body: &serde_json::Value, status: u16) -> String {
    body["description"]
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

pub struct TelegramClient {
    api: ApiClient,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(api: ApiClient, token: impl Into<String>) -> Self {
        Self::with_base_url(api, token, TELEGRAM_API_BASE)
    }

    pub fn with_base_url(api: ApiClient, token: impl Into<String>, base_url: &str) -> Self {
        Self { api, base_url: base_url.trim_end_matches('/').to_string(), token: token.into() }
    }

    pub fn error_extractor() -> fn(&serde_json::Value, u16) -> String {
        extract_telegram_error
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// POST a method call and unwrap the `{ok, result}` envelope.
    fn call(&self, method: &str, params: &serde_json::Value) -> Result<serde_json::Value, GatewayError> {
        let url = self.method_url(method);
        let body = self.api.request_with_retry(|http| http.post(&url).json(params))?;
        if body["ok"].as_bool() != Some(true) {
            return Err(GatewayError::Rejected(
                200,
                format!("{} refused: {}", method, extract_telegram_error(&body, 200)),
            ));
        }
        Ok(body["result"].clone())
    }

    pub fn get_me(&self) -> Result<User, GatewayError> {
        let result = self.call("getMe", &serde_json::json!({}))?;
        serde_json::from_value(result)
            .map_err(|e| GatewayError::Parse(format!("getMe result: {}", e)))
    }

    /// Long-poll for updates after `offset`. Blocks up to `timeout`.
    pub fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, GatewayError> {
        let params = serde_json::json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        let result = self.call("getUpdates", &params)?;
        serde_json::from_value(result)
            .map_err(|e| GatewayError::Parse(format!("getUpdates result: {}", e)))
    }

    pub fn send_message(&self, chat_id: i64, reply: &Reply) -> Result<(), GatewayError> {
        let mut params = serde_json::json!({
            "chat_id": chat_id,
            "text": reply.text,
        });
        if reply.mode == ParseMode::Html {
            params["parse_mode"] = "HTML".into();
        }
        if let Some(keyboard) = &reply.keyboard {
            let rows: Vec<Vec<serde_json::Value>> = keyboard
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| serde_json::json!({"text": b.label, "callback_data": b.data}))
                        .collect()
                })
                .collect();
            params["reply_markup"] = serde_json::json!({ "inline_keyboard": rows });
        }
        self.call("sendMessage", &params)?;
        Ok(())
    }

    pub fn answer_callback_query(&self, callback_id: &str) -> Result<(), GatewayError> {
        self.call("answerCallbackQuery", &serde_json::json!({ "callback_query_id": callback_id }))?;
        Ok(())
    }
}
