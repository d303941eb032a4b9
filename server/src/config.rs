use anyhow::{Context, Result, anyhow};
use axum_extra::extract::cookie::Key;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use products_hr::DEFAULT_SESSION_TTL_HOURS;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub cookie_key: Key,
    pub cookie_secure: bool,
    pub session_ttl_hours: i64,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let cookie_secret =
            std::env::var("COOKIE_SECRET_BASE64").context("COOKIE_SECRET_BASE64 missing")?;
        let secret_bytes = STANDARD
            .decode(cookie_secret.trim())
            .context("invalid COOKIE_SECRET_BASE64")?;
        if secret_bytes.len() < 32 {
            return Err(anyhow!(
                "COOKIE_SECRET_BASE64 must decode to at least 32 bytes"
            ));
        }
        let cookie_key = Key::derive_from(&secret_bytes);

        let cookie_secure = std::env::var("COOKIE_SECURE")
            .ok()
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(true);

        let session_ttl_hours = match std::env::var("SESSION_TTL_HOURS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .with_context(|| format!("invalid SESSION_TTL_HOURS {raw:?}"))?,
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };

        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        Ok(Self {
            cookie_key,
            cookie_secure,
            session_ttl_hours,
            cors_allowed_origins,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            cookie_key: Key::from(&[7u8; 64]),
            cookie_secure: false,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            cors_allowed_origins: Vec::new(),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
