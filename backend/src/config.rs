use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;
use time::Duration;
use tracing::{info, warn};
use crate::{
    ledger::MemberSchema,
    raffle::RaffleSchema,
    sheets::ServiceAccountKey,
};

const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required secret {0} is not set")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Sheets { spreadsheet_id: String, account: ServiceAccountKey },
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub admin_password: String,
    pub session_ttl: Duration,
    pub allowed_origin: String,
    pub members: MemberSchema,
    pub raffle: RaffleSchema,
    pub store: StoreConfig,
}

impl Config {
    /// Builds the configuration from a secret lookup such as Shuttle's `SecretStore::get`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| {
            get(key).unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let admin_password = get("ADMIN_PASSWORD").ok_or(ConfigError::Missing("ADMIN_PASSWORD"))?;
        let ttl_minutes: i64 = parse("SESSION_TTL_MINUTES", get("SESSION_TTL_MINUTES"), DEFAULT_SESSION_TTL_MINUTES)?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::Invalid { key: "SESSION_TTL_MINUTES", reason: "must be positive".into() });
        }

        let store = match get("GOOGLE_SERVICE_ACCOUNT") {
            Some(raw) => StoreConfig::Sheets {
                spreadsheet_id: get("SPREADSHEET_ID").ok_or(ConfigError::Missing("SPREADSHEET_ID"))?,
                account: ServiceAccountKey::from_json(&raw)
                    .map_err(|e| ConfigError::Invalid { key: "GOOGLE_SERVICE_ACCOUNT", reason: e.to_string() })?,
            },
            None => {
                warn!("GOOGLE_SERVICE_ACCOUNT not found - data will live in memory and be lost on restart");
                StoreConfig::Memory
            }
        };

        let members = MemberSchema {
            table: or_default("MEMBERS_SHEET", "members"),
            nickname_column: or_default("MEMBER_NICKNAME_COLUMN", "nickname"),
            points_column: or_default("MEMBER_POINTS_COLUMN", "points"),
        };
        let raffle = RaffleSchema {
            table: or_default("RAFFLE_SHEET", "raffle"),
            name_column: or_default("RAFFLE_NAME_COLUMN", "name"),
            email_column: or_default("RAFFLE_EMAIL_COLUMN", "email"),
            status_column: or_default("RAFFLE_STATUS_COLUMN", "won"),
            won_value: or_default("RAFFLE_WON_VALUE", "TRUE"),
        };

        Ok(Self {
            admin_password,
            session_ttl: Duration::minutes(ttl_minutes),
            allowed_origin: or_default("ALLOWED_ORIGIN", DEFAULT_ALLOWED_ORIGIN),
            members,
            raffle,
            store,
        })
    }
}

fn parse<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string() }),
        None => Ok(default),
    }
}
