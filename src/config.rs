use crate::application::LendingPolicy;
use crate::domain::{
    LoanPeriod, Role, UserId,
    loan::{DEFAULT_LOAN_PERIOD_DAYS, MAX_LOAN_PERIOD_DAYS},
    value_objects::Actor,
};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 5;

/// 起動時設定のエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("AUTH_TOKENS entry {0:?} must look like token:user-uuid:role")]
    InvalidAuthToken(String),
}

/// アプリケーション設定
///
/// 環境変数から読み込む。未設定の項目は既定値を使う。
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// 未設定ならインメモリのストレージで起動する
    pub database_url: Option<String>,
    pub port: u16,
    pub max_db_connections: u32,
    pub policy: LendingPolicy,
    /// モック認証サービスに登録するトークン
    pub auth_tokens: Vec<(String, Actor)>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の取得関数から設定を組み立てる
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let max_db_connections = parse_or(
            "MAX_DB_CONNECTIONS",
            lookup("MAX_DB_CONNECTIONS"),
            DEFAULT_MAX_DB_CONNECTIONS,
        )?;

        let loan_period_days: i64 = parse_or(
            "LOAN_PERIOD_DAYS",
            lookup("LOAN_PERIOD_DAYS"),
            DEFAULT_LOAN_PERIOD_DAYS,
        )?;
        let loan_period =
            LoanPeriod::days(loan_period_days).ok_or_else(|| ConfigError::InvalidValue {
                name: "LOAN_PERIOD_DAYS",
                value: loan_period_days.to_string(),
                reason: format!("must be between 1 and {}", MAX_LOAN_PERIOD_DAYS),
            })?;

        let strict_release = match lookup("STRICT_RELEASE") {
            Some(value) => parse_bool("STRICT_RELEASE", &value)?,
            None => LendingPolicy::default().strict_release,
        };

        let auth_tokens = match lookup("AUTH_TOKENS") {
            Some(value) => parse_auth_tokens(&value)?,
            None => Vec::new(),
        };

        Ok(Self {
            database_url,
            port,
            max_db_connections,
            policy: LendingPolicy {
                loan_period,
                strict_release,
            },
            auth_tokens,
        })
    }
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name,
                reason: e.to_string(),
                value,
            }),
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

/// `token:uuid:role`をカンマ区切りで並べた値を読む
fn parse_auth_tokens(value: &str) -> Result<Vec<(String, Actor)>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidAuthToken(entry.to_string());
            let mut fields = entry.split(':');
            let (Some(token), Some(user_id), Some(role), None) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(invalid());
            };
            if token.is_empty() {
                return Err(invalid());
            }
            let user_id = Uuid::parse_str(user_id).map_err(|_| invalid())?;
            let role = Role::from_str(role).map_err(|_| invalid())?;
            Ok((
                token.to_string(),
                Actor {
                    user_id: UserId::from_uuid(user_id),
                    role,
                },
            ))
        })
        .collect()
}
