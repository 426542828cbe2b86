// Google Sheets v4 values API as a TabularStore

use std::sync::Arc;

use nasiya_engine::layout::CellAddress;
use nasiya_engine::record::Cell;
use nasiya_engine::{StoreError, TabularStore};
use url::Url;

use crate::client::ApiClient;
use crate::error::GatewayError;
use crate::token::TokenSource;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

fn extract_sheets_error(body: &serde_json::Value, status: u16) -> String {
    body["error"]["message"]
        .as_str()
        .or_else(|| body["error"]["status"].as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

pub struct SheetsClient {
    api: ApiClient,
    base_url: Url,
    spreadsheet_id: String,
    sheet_name: String,
    read_range: String,
    tokens: Arc<dyn TokenSource>,
}

impl SheetsClient {
    pub fn new(
        api: ApiClient,
        tokens: Arc<dyn TokenSource>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        read_range: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        Self::with_base_url(api, tokens, spreadsheet_id, sheet_name, read_range, SHEETS_API_BASE)
    }

    pub fn with_base_url(
        api: ApiClient,
        tokens: Arc<dyn TokenSource>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        read_range: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::Parse(format!("invalid Sheets base URL {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Parse(format!("Sheets base URL {} cannot be a base", base_url)));
        }
        Ok(Self {
            api,
            base_url,
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            read_range: read_range.into(),
            tokens,
        })
    }

    pub fn error_extractor() -> fn(&serde_json::Value, u16) -> String {
        extract_sheets_error
    }

    pub fn read_range(&self) -> String {
        format!("{}!{}", self.sheet_name, self.read_range)
    }

    fn values_url(&self, range: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        }
        url
    }

    /// Runs `call` with a bearer token. An auth failure drops the cached
    /// token and retries once with a fresh one.
    fn authorized(
        &self,
        call: impl Fn(&str) -> Result<serde_json::Value, GatewayError>,
    ) -> Result<serde_json::Value, GatewayError> {
        let token = self.tokens.token()?;
        match call(&token) {
            Err(e) if e.is_auth() => {
                log::warn!("Sheets rejected access token ({}), refreshing", e);
                self.tokens.invalidate();
                let token = self.tokens.token()?;
                call(&token)
            }
            other => other,
        }
    }

    /// All rows of the configured read range.
    pub fn get_values(&self) -> Result<Vec<Vec<Cell>>, GatewayError> {
        let url = self.values_url(&self.read_range());
        let body = self.authorized(|token| {
            self.api.request_with_retry(|http| {
                http.get(url.clone())
                    .bearer_auth(token)
                    .query(&[("majorDimension", "ROWS")])
            })
        })?;

        let rows = match body.get("values") {
            // An empty sheet comes back without "values"
            None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
            Some(serde_json::Value::Array(rows)) => rows,
            Some(other) => {
                return Err(GatewayError::Parse(format!("values is not an array: {}", other)))
            }
        };

        rows.iter()
            .map(|row| match row {
                serde_json::Value::Array(cells) => {
                    Ok(cells.iter().cloned().map(Cell::from).collect())
                }
                other => Err(GatewayError::Parse(format!("row is not an array: {}", other))),
            })
            .collect()
    }

    /// Write one row of user-entered values starting at `range`.
    pub fn put_values(&self, range: &str, values: &[String]) -> Result<(), GatewayError> {
        let url = self.values_url(range);
        let payload = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });
        self.authorized(|token| {
            self.api.request_with_retry(|http| {
                http.put(url.clone())
                    .bearer_auth(token)
                    .query(&[("valueInputOption", "USER_ENTERED")])
                    .json(&payload)
            })
        })?;
        Ok(())
    }
}

impl TabularStore for SheetsClient {
    fn fetch_rows(&self) -> Result<Vec<Vec<Cell>>, StoreError> {
        let rows = self.get_values()?;
        log::debug!("fetched {} rows from {}", rows.len(), self.read_range());
        Ok(rows)
    }

    fn append_row(&self, row: u32, cells: &[String]) -> Result<(), StoreError> {
        let range = format!("{}!A{}", self.sheet_name, row);
        self.put_values(&range, cells)?;
        log::info!("wrote {} cells to {}", cells.len(), range);
        Ok(())
    }

    fn update_cell(&self, address: &CellAddress, value: &str) -> Result<(), StoreError> {
        let range = format!("{}!{}", self.sheet_name, address);
        self.put_values(&range, &[value.to_string()])?;
        log::info!("updated {}", range);
        Ok(())
    }
}
