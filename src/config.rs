/*
 * Responsibility
 * - 環境変数からの設定読み込み (DATABASE_URL, CORS, Auth, HTTP limits)
 * - 値のバリデーション (不足・不正なら起動失敗)
 * - Auth 部分は GateConfig に変換して AccessGate に明示的に渡す
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, jwk::JwkSet};

use crate::services::auth::{GateConfig, KeySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Which claims feed the principal's authorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthoritySource {
    Scope,
    RealmRoles,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
    Unreadable { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
            ConfigError::Unreadable { key, reason } => {
                write!(f, "unreadable configuration: {} ({})", key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // None: in-memory user store
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub database_migrate: bool,

    pub cors_allowed_origins: Vec<String>,
    pub request_timeout_seconds: u64,
    pub request_body_limit_bytes: usize,

    pub auth_issuer: String,
    pub auth_audience: Option<String>,
    pub access_token_leeway_seconds: u64,
    pub access_jwt_algorithm: Algorithm,
    pub access_jwt_keys: KeySource,

    pub auth_authorities: Vec<AuthoritySource>,
    pub auth_authority_prefix: Option<String>,
    pub auth_client_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value lookup (the environment, or a map in tests).
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port: u16 = parse_or(&non_empty, "PORT", 3000)?;
        let addr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV"));

        let database_url = non_empty("DATABASE_URL");
        let database_max_connections = parse_or(&non_empty, "DATABASE_MAX_CONNECTIONS", 10)?;
        let database_migrate = parse_or(&non_empty, "DATABASE_MIGRATE", true)?;

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let request_timeout_seconds = parse_or(&non_empty, "REQUEST_TIMEOUT_SECONDS", 30)?;
        let request_body_limit_bytes =
            parse_or(&non_empty, "REQUEST_BODY_LIMIT_BYTES", 1024 * 1024)?;

        let auth_issuer = non_empty("AUTH_ISSUER").ok_or(ConfigError::Missing("AUTH_ISSUER"))?;
        url::Url::parse(&auth_issuer).map_err(|_| ConfigError::Invalid("AUTH_ISSUER"))?;

        let auth_audience = non_empty("AUTH_AUDIENCE");

        let access_token_leeway_seconds = parse_or(&non_empty, "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;

        let access_jwt_algorithm = match non_empty("ACCESS_JWT_ALGORITHM") {
            Some(raw) => {
                Algorithm::from_str(&raw).map_err(|_| ConfigError::Invalid("ACCESS_JWT_ALGORITHM"))?
            }
            None => Algorithm::EdDSA,
        };

        let access_jwt_keys = match (
            non_empty("ACCESS_JWT_PUBLIC_KEY_PEM"),
            non_empty("ACCESS_JWKS_PATH"),
        ) {
            (Some(pem), None) => KeySource::Pem(pem.replace("\\n", "\n")),
            (None, Some(path)) => KeySource::JwkSet(read_jwk_set(&path)?),
            (Some(_), Some(_)) => return Err(ConfigError::Invalid("ACCESS_JWKS_PATH")),
            (None, None) => return Err(ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM")),
        };

        let auth_authorities = match non_empty("AUTH_AUTHORITIES") {
            Some(raw) => parse_authority_sources(&raw)?,
            None => vec![AuthoritySource::Scope, AuthoritySource::RealmRoles],
        };
        let auth_authority_prefix = get("AUTH_AUTHORITY_PREFIX");
        let auth_client_id = non_empty("AUTH_CLIENT_ID");

        Ok(Self {
            addr,
            app_env,
            database_url,
            database_max_connections,
            database_migrate,
            cors_allowed_origins,
            request_timeout_seconds,
            request_body_limit_bytes,
            auth_issuer,
            auth_audience,
            access_token_leeway_seconds,
            access_jwt_algorithm,
            access_jwt_keys,
            auth_authorities,
            auth_authority_prefix,
            auth_client_id,
        })
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            issuer: self.auth_issuer.clone(),
            audience: self.auth_audience.clone(),
            leeway_seconds: self.access_token_leeway_seconds,
            algorithm: self.access_jwt_algorithm,
            keys: self.access_jwt_keys.clone(),
        }
    }
}

fn parse_or<T, F>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn read_jwk_set(path: &str) -> Result<JwkSet, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        key: "ACCESS_JWKS_PATH",
        reason: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Unreadable {
        key: "ACCESS_JWKS_PATH",
        reason: e.to_string(),
    })
}

fn parse_authority_sources(raw: &str) -> Result<Vec<AuthoritySource>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.to_ascii_lowercase().as_str() {
            "scope" | "scopes" => Ok(AuthoritySource::Scope),
            "realm-roles" | "roles" => Ok(AuthoritySource::RealmRoles),
            _ => Err(ConfigError::Invalid("AUTH_AUTHORITIES")),
        })
        .collect()
}
