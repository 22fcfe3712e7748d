use std::sync::Mutex;
use std::time::Duration as StdDuration;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::table::{Table, HEADER_ROW};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument};
use crate::store::{RowStore, StoreError};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const REQUEST_TIMEOUT_SECS: u64 = 15;
const ERROR_BODY_EXCERPT: usize = 200;

/// The fields of a Google service-account key file this store needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Malformed(format!("service account key: {e}")))
    }
}

struct AccessToken {
    value: String,
    expires_at: OffsetDateTime,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Row store backed by one Google spreadsheet; each table is a worksheet tab.
///
/// Uses the blocking HTTP client, so calls must run off the async executor.
pub struct SheetsStore {
    client: Client,
    spreadsheet_id: String,
    account: ServiceAccountKey,
    signer: RsaKeyPair,
    rng: SystemRandom,
    token: Mutex<Option<AccessToken>>,
}

impl SheetsStore {
    pub fn connect(spreadsheet_id: impl Into<String>, account: ServiceAccountKey) -> Result<Self, StoreError> {
        let der = pem_to_der(&account.private_key)?;
        let signer = RsaKeyPair::from_pkcs8(&der)
            .map_err(|e| StoreError::Malformed(format!("service account private key rejected: {e}")))?;
        let client = Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;

        let store = Self {
            client,
            spreadsheet_id: spreadsheet_id.into(),
            account,
            signer,
            rng: SystemRandom::new(),
            token: Mutex::new(None),
        };
        store.access_token()?;
        info!("📗 Connected to spreadsheet {} as {}", store.spreadsheet_id, store.account.client_email);
        Ok(store)
    }

    fn signed_assertion(&self, now: OffsetDateTime) -> Result<String, StoreError> {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let claims = json!({
            "iss": self.account.client_email,
            "scope": SPREADSHEETS_SCOPE,
            "aud": self.account.token_uri,
            "iat": now.unix_timestamp(),
            "exp": now.unix_timestamp() + ASSERTION_LIFETIME_SECS,
        });
        let signing_input = format!("{header}.{}", URL_SAFE_NO_PAD.encode(claims.to_string()));

        let mut signature = vec![0u8; self.signer.public_modulus_len()];
        self.signer
            .sign(&RSA_PKCS1_SHA256, &self.rng, signing_input.as_bytes(), &mut signature)
            .map_err(|_| StoreError::Unauthorized("failed to sign service account assertion".into()))?;

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    fn access_token(&self) -> Result<String, StoreError> {
        let mut cached = self.token.lock().map_err(|_| StoreError::LockFailed)?;
        let now = OffsetDateTime::now_utc();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.signed_assertion(now)?;
        let response = self.client
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(connectivity)?;
        let token: TokenResponse = check_status(response)?.json().map_err(malformed)?;
        debug!("Refreshed spreadsheet access token, valid for {}s", token.expires_in);

        let value = token.access_token.clone();
        *cached = Some(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });
        Ok(value)
    }

    fn values_url(&self, range: &str, action: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(SHEETS_API).map_err(|e| StoreError::Malformed(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Malformed("spreadsheet API url cannot take a path".into()))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{range}{action}"));
        Ok(url)
    }

    fn get_values(&self, range: &str, major_dimension: &str) -> Result<Vec<Vec<Value>>, StoreError> {
        let url = self.values_url(range, "")?;
        let response = self.client
            .get(url)
            .bearer_auth(self.access_token()?)
            .query(&read_query(major_dimension))
            .send()
            .map_err(connectivity)?;
        let body: ValueRange = check_status(response)?.json().map_err(malformed)?;
        Ok(body.values)
    }
}

impl RowStore for SheetsStore {
    #[instrument(skip(self))]
    fn read_all(&self, table: &str) -> Result<Table, StoreError> {
        let mut rows = self.get_values(&quote_sheet(table), "ROWS")?.into_iter().map(row_text);
        let header = rows.next().unwrap_or_default();
        Ok(Table::new(header, rows.collect()))
    }

    fn header(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let range = format!("{}!{HEADER_ROW}:{HEADER_ROW}", quote_sheet(table));
        Ok(self.get_values(&range, "ROWS")?.into_iter().next().map(row_text).unwrap_or_default())
    }

    fn column_values(&self, table: &str, column: usize) -> Result<Vec<String>, StoreError> {
        if column == 0 {
            return Err(StoreError::InvalidColumn(column));
        }
        let letters = column_letters(column);
        let range = format!("{}!{letters}:{letters}", quote_sheet(table));
        Ok(self.get_values(&range, "COLUMNS")?.into_iter().next().map(row_text).unwrap_or_default())
    }

    #[instrument(skip(self, fields))]
    fn append_row(&self, table: &str, fields: &[String]) -> Result<(), StoreError> {
        let url = self.values_url(&quote_sheet(table), ":append")?;
        let body = json!({ "values": [fields.iter().map(|f| cell_json(f)).collect::<Vec<_>>()] });
        let response = self.client
            .post(url)
            .bearer_auth(self.access_token()?)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&body)
            .send()
            .map_err(connectivity)?;
        check_status(response)?;
        Ok(())
    }

    #[instrument(skip(self, value))]
    fn write_cell(&self, table: &str, row: usize, column: usize, value: &str) -> Result<(), StoreError> {
        if row <= HEADER_ROW {
            return Err(StoreError::InvalidRow(row));
        }
        if column == 0 {
            return Err(StoreError::InvalidColumn(column));
        }
        let range = format!("{}!{}{row}", quote_sheet(table), column_letters(column));
        let url = self.values_url(&range, "")?;
        let response = self.client
            .put(url)
            .bearer_auth(self.access_token()?)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "values": [[cell_json(value)]] }))
            .send()
            .map_err(connectivity)?;
        check_status(response)?;
        Ok(())
    }
}

/// Reads raw cell values so number formatting (thousands separators, currency) never reaches
/// the points parser.
pub(crate) fn read_query(major_dimension: &str) -> [(&'static str, &str); 2] {
    [("majorDimension", major_dimension), ("valueRenderOption", "UNFORMATTED_VALUE")]
}

fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthorized(format!("{status}: {excerpt}"))),
        _ => Err(StoreError::Connectivity(format!("{status}: {excerpt}"))),
    }
}

fn connectivity(e: reqwest::Error) -> StoreError {
    StoreError::Connectivity(e.to_string())
}

fn malformed(e: reqwest::Error) -> StoreError {
    StoreError::Malformed(e.to_string())
}

pub(crate) fn pem_to_der(pem: &str) -> Result<Vec<u8>, StoreError> {
    // Keys pasted into TOML secrets often keep their newlines escaped.
    let pem = pem.replace("\\n", "\n");
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();
    if body.is_empty() {
        return Err(StoreError::Malformed("service account private key is empty".into()));
    }
    STANDARD
        .decode(body)
        .map_err(|e| StoreError::Malformed(format!("service account private key: {e}")))
}

/// A1 column letters for a 1-based column index.
pub(crate) fn column_letters(column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

pub(crate) fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Integers travel as JSON numbers so they stay numeric in the sheet; anything else as text.
pub(crate) fn cell_json(value: &str) -> Value {
    match value.parse::<i64>() {
        Ok(n) if n.to_string() == value => Value::from(n),
        _ => Value::from(value),
    }
}

pub(crate) fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => if b { "TRUE".into() } else { "FALSE".into() },
        other => other.to_string(),
    }
}

fn row_text(row: Vec<Value>) -> Vec<String> {
    row.into_iter().map(cell_text).collect()
}
