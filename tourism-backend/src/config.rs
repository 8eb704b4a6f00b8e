use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Default session lifetime (7 days)
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;
/// Default upload size cap (5 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
/// Default number of delivery attempts for outbound n8n webhooks
pub const DEFAULT_N8N_MAX_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub session_ttl_hours: i64,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub n8n_base_url: Option<String>,
    pub n8n_webhook_secret: Option<String>,
    pub n8n_max_attempts: u32,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: parse_var("PORT", 8080),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "./.db/tourism.db".to_string()),
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./public/uploads".to_string()),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            n8n_base_url: optional_var("N8N_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            n8n_webhook_secret: optional_var("N8N_WEBHOOK_SECRET"),
            n8n_max_attempts: parse_var("N8N_MAX_ATTEMPTS", DEFAULT_N8N_MAX_ATTEMPTS).max(1),
            admin_email: optional_var("ADMIN_EMAIL"),
            admin_password: optional_var("ADMIN_PASSWORD"),
            cors_origin: optional_var("CORS_ORIGIN"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: ":memory:".to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            upload_dir: "./public/uploads".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            n8n_base_url: None,
            n8n_webhook_secret: None,
            n8n_max_attempts: DEFAULT_N8N_MAX_ATTEMPTS,
            admin_email: None,
            admin_password: None,
            cors_origin: None,
        }
    }
}

/// Read a variable, treating empty values as unset
fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional_var(key) {
        Some(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{} must be a valid number ({}): {}", key, raw, e)),
        None => {
            log::debug!("{} not set, using default: {}", key, default);
            default
        }
    }
}
