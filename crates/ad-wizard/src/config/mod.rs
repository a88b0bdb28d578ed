use std::env;
use std::fmt;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub wizard: WizardConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            telemetry: TelemetryConfig {
                log_level,
                environment,
            },
            wizard: WizardConfig::from_env()?,
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// A bare level (`debug`) or a full directive string (`ad_wizard=trace,warn`).
    pub log_level: String,
    /// Selects the output format.
    pub environment: AppEnvironment,
}

/// Timing and media limits for one wizard instance.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardConfig {
    /// Delay between a navigation request and the step index moving.
    pub settle_delay: Duration,
    /// Delay between a successful commit and the completion callback.
    pub close_delay: Duration,
    /// Period of the simulated video progress ticker.
    pub progress_tick: Duration,
    pub avatar_max_bytes: u64,
    pub video_max_bytes: u64,
    pub video_max_seconds: f64,
    pub avatar_bucket: String,
    pub video_bucket: String,
    /// Identities granted the admin bypass by [`AllowlistAuthority`].
    ///
    /// [`AllowlistAuthority`]: crate::workflows::ad_submission::AllowlistAuthority
    pub admin_emails: Vec<String>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(300),
            close_delay: Duration::from_millis(3000),
            progress_tick: Duration::from_millis(200),
            avatar_max_bytes: 5 * MIB,
            video_max_bytes: 100 * MIB,
            video_max_seconds: 120.0,
            avatar_bucket: "ad-images".to_string(),
            video_bucket: "ad-videos".to_string(),
            admin_emails: Vec::new(),
        }
    }
}

impl WizardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let settle_delay = millis_var("AD_WIZARD_SETTLE_MS", defaults.settle_delay)?;
        let close_delay = millis_var("AD_WIZARD_CLOSE_DELAY_MS", defaults.close_delay)?;
        let progress_tick = millis_var("AD_WIZARD_PROGRESS_TICK_MS", defaults.progress_tick)?;
        if progress_tick.is_zero() {
            return Err(ConfigError::MustBePositive {
                key: "AD_WIZARD_PROGRESS_TICK_MS",
            });
        }
        let avatar_max_bytes = mib_var("AD_WIZARD_AVATAR_MAX_MB", 5)?;
        let video_max_bytes = mib_var("AD_WIZARD_VIDEO_MAX_MB", 100)?;
        let video_max_seconds = number_var("AD_WIZARD_VIDEO_MAX_SECONDS", 120)? as f64;

        let admin_emails = env::var("AD_WIZARD_ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|email| email.trim().to_string())
                    .filter(|email| !email.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            settle_delay,
            close_delay,
            progress_tick,
            avatar_max_bytes,
            video_max_bytes,
            video_max_seconds,
            admin_emails,
            ..defaults
        })
    }

    pub fn avatar_max_mb(&self) -> u64 {
        self.avatar_max_bytes / MIB
    }

    pub fn video_max_mb(&self) -> u64 {
        self.video_max_bytes / MIB
    }
}

fn number_var(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn mib_var(key: &'static str, default_mb: u64) -> Result<u64, ConfigError> {
    number_var(key, default_mb)?
        .checked_mul(MIB)
        .ok_or(ConfigError::InvalidNumber { key })
}

fn millis_var(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let millis = number_var(key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { key: &'static str },
    MustBePositive { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative whole number")
            }
            ConfigError::MustBePositive { key } => write!(f, "{key} must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {}
