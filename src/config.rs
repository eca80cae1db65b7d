use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "ClinicDesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default clinical-records API base URL (local development backend).
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Quiet period after the last keystroke before a lookup fires.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Attempts per reference-data fetch (first try included).
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Fixed delay between reference-data fetch attempts.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Calling code split off the front of phone queries (Jordan).
pub const DEFAULT_COUNTRY_CODE: &str = "962";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Get the default log filter.
/// Debug builds log everything from this crate; release builds stay at info.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "clinicdesk_lib=debug"
    } else {
        "clinicdesk_lib=info"
    }
}

/// Client configuration resolved once at startup and passed into the
/// controller. Nothing below reads the environment after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub debounce: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub country_code: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Resolve configuration from `CLINICDESK_*` environment variables.
    ///
    /// Missing variables use the defaults; unparseable ones log a warning and
    /// fall back too, so a typo never prevents the page from loading.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("CLINICDESK_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_url);

        let debounce_ms = parse_or(&lookup, "CLINICDESK_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS);
        let retry_attempts = parse_or(&lookup, "CLINICDESK_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS)
            .max(1);
        let retry_delay_ms = parse_or(&lookup, "CLINICDESK_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS);
        let timeout_secs = parse_or(&lookup, "CLINICDESK_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);

        let country_code = match lookup("CLINICDESK_COUNTRY_CODE") {
            Some(code) if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) => code,
            Some(code) => {
                tracing::warn!(value = %code, "Ignoring non-numeric CLINICDESK_COUNTRY_CODE");
                defaults.country_code
            }
            None => defaults.country_code,
        };

        Self {
            api_url,
            debounce: Duration::from_millis(debounce_ms),
            retry_attempts,
            retry_delay: Duration::from_millis(retry_delay_ms),
            country_code,
            timeout_secs,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid config value, using default");
            default
        }),
        None => default,
    }
}
