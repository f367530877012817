/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, APP_ROOT, Auth cookie, index / error route など)
 * - 設定値のバリデーション (不正なら起動失敗)
 * - VALKEY_URL / DATABASE_URL は任意: 未設定ならメモリ session / account ファイル
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::routing::RouteDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub app_root: PathBuf,

    pub auth_cookie: String,
    pub auth_expires: Duration,

    pub index_view: String,
    pub error_view: String,
    // Takes precedence over error_view when set.
    pub error_action: Option<String>,

    pub valkey_url: Option<String>,
    pub database_url: Option<String>,
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn name_or(key: &'static str, default: &str) -> Result<String, ConfigError> {
    let value = non_empty(key).unwrap_or_else(|| default.to_string());
    if value.contains([';', ',', '=', ' ']) {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = match non_empty("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();
        let app_root = PathBuf::from(non_empty("APP_ROOT").unwrap_or_else(|| ".".to_string()));

        let auth_cookie = name_or("AUTH_COOKIE", "auth")?;
        let auth_expires_seconds: u64 = match non_empty("AUTH_EXPIRES_SECONDS") {
            Some(v) => v
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Invalid("AUTH_EXPIRES_SECONDS"))?,
            None => 86_400, // 24 h
        };

        let index_view = non_empty("INDEX_VIEW").unwrap_or_else(|| "home".to_string());
        let error_view = non_empty("ERROR_VIEW").unwrap_or_else(|| "error".to_string());
        let error_action = non_empty("ERROR_ACTION");

        Ok(Self {
            addr,
            app_env,
            app_root,
            auth_cookie,
            auth_expires: Duration::from_secs(auth_expires_seconds),
            index_view,
            error_view,
            error_action,
            valkey_url: non_empty("VALKEY_URL"),
            database_url: non_empty("DATABASE_URL"),
        })
    }

    pub fn index_route(&self) -> RouteDefinition {
        RouteDefinition::template(self.index_view.clone())
    }

    pub fn error_route(&self) -> RouteDefinition {
        match &self.error_action {
            Some(action) => RouteDefinition::action(action.clone()),
            None => RouteDefinition::template(self.error_view.clone()),
        }
    }
}
