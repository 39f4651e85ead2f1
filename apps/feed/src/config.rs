use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Where the last successfully loaded feed is kept between sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheBackend {
    File { dir: PathBuf },
    Redis { url: String },
}

/// Feed tuning. `Default` is the reference behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    /// Candidates requested from the source per load.
    pub fetch_limit: usize,
    /// Maximum queue length after client-side filtering.
    pub page_size: usize,
    pub fetch_attempts: u32,
    /// Attempt `n` waits `backoff_unit * n` before the next one.
    pub backoff_unit: Duration,
    pub undo_depth: usize,
    /// Upper bound on the exit transition; a swipe arriving inside it is ignored.
    pub settle_window: Duration,
    /// New decisions allowed per UTC day. Zero disables the limit.
    pub daily_swipe_limit: u32,
    /// Sessions untouched for this long are torn down and dropped.
    pub session_idle_timeout: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            fetch_limit: 50,
            page_size: 20,
            fetch_attempts: 3,
            backoff_unit: Duration::from_millis(500),
            undo_depth: 1,
            settle_window: Duration::from_millis(400),
            daily_swipe_limit: 50,
            session_idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl FeedSettings {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            fetch_limit: env_or("FEED_FETCH_LIMIT", defaults.fetch_limit)?,
            page_size: env_or("FEED_PAGE_SIZE", defaults.page_size)?,
            fetch_attempts: env_or("FEED_FETCH_ATTEMPTS", defaults.fetch_attempts)?,
            backoff_unit: Duration::from_millis(env_or(
                "FEED_BACKOFF_MS",
                defaults.backoff_unit.as_millis() as u64,
            )?),
            undo_depth: env_or("FEED_UNDO_DEPTH", defaults.undo_depth)?,
            settle_window: Duration::from_millis(env_or(
                "FEED_SETTLE_MS",
                defaults.settle_window.as_millis() as u64,
            )?),
            daily_swipe_limit: env_or("DAILY_SWIPE_LIMIT", defaults.daily_swipe_limit)?,
            session_idle_timeout: Duration::from_secs(env_or(
                "FEED_SESSION_IDLE_SECS",
                defaults.session_idle_timeout.as_secs(),
            )?),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.fetch_attempts == 0 {
            bail!("FEED_FETCH_ATTEMPTS must be at least 1");
        }
        if self.page_size == 0 || self.page_size > self.fetch_limit {
            bail!(
                "FEED_PAGE_SIZE must be between 1 and FEED_FETCH_LIMIT ({})",
                self.fetch_limit
            );
        }
        if self.undo_depth == 0 {
            bail!("FEED_UNDO_DEPTH must be at least 1");
        }
        if self.session_idle_timeout.is_zero() {
            bail!("FEED_SESSION_IDLE_SECS must be at least 1");
        }
        Ok(())
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub cache: CacheBackend,
    pub feed: FeedSettings,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let cache = match std::env::var("FEED_CACHE_BACKEND")
            .unwrap_or_else(|_| "file".to_string())
            .as_str()
        {
            "file" => CacheBackend::File {
                dir: std::env::var("FEED_CACHE_DIR")
                    .unwrap_or_else(|_| ".feed-cache".to_string())
                    .into(),
            },
            "redis" => CacheBackend::Redis {
                url: require_env("REDIS_URL")?,
            },
            other => bail!("FEED_CACHE_BACKEND must be 'file' or 'redis', got '{other}'"),
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            cache,
            feed: FeedSettings::from_env()?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{v}'")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_falls_back_on_missing_or_blank() {
        assert_eq!(parse_or::<u32>("X", None, 3).unwrap(), 3);
        assert_eq!(parse_or::<u32>("X", Some("  ".to_string()), 3).unwrap(), 3);
        assert_eq!(parse_or::<u32>("X", Some(" 7 ".to_string()), 3).unwrap(), 7);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        let err = parse_or::<u16>("PORT", Some("eighty".to_string()), 8080).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_default_settings_are_reference_behaviour() {
        let s = FeedSettings::default();
        assert_eq!(s.fetch_limit, 50);
        assert_eq!(s.page_size, 20);
        assert_eq!(s.fetch_attempts, 3);
        assert_eq!(s.backoff_unit, Duration::from_millis(500));
        assert_eq!(s.undo_depth, 1);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_zero_idle_timeout_is_rejected() {
        let s = FeedSettings {
            session_idle_timeout: Duration::ZERO,
            ..FeedSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_page_size_cannot_exceed_fetch_limit() {
        let s = FeedSettings {
            page_size: 60,
            ..FeedSettings::default()
        };
        assert!(s.validate().is_err());
    }
}
