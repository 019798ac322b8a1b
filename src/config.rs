use anyhow::{Context, Result, ensure};
use std::{env, sync::OnceLock, time::Duration};

/// Application configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Device HTTP endpoint configuration
    pub device: DeviceConfig,

    /// Workflow polling cadence
    pub polling: PollingConfig,
}

#[derive(Clone, Debug)]
pub struct DeviceConfig {
    pub base_url: String,
    /// `None` keeps requests unbounded, matching the device's unpredictable latency.
    pub request_timeout: Option<Duration>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollingConfig {
    pub wireless_interval: Duration,
    pub wired_interval: Duration,
    pub countdown_tick: Duration,
    pub countdown_start: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            wireless_interval: Duration::from_millis(PollingConfig::WIRELESS_INTERVAL_MS),
            wired_interval: Duration::from_millis(PollingConfig::WIRED_INTERVAL_MS),
            countdown_tick: Duration::from_millis(PollingConfig::COUNTDOWN_TICK_MS),
            countdown_start: PollingConfig::COUNTDOWN_START,
        }
    }
}

impl AppConfig {
    /// Get or load the application configuration
    ///
    /// Returns a reference to the cached configuration. On first call, it loads
    /// and validates all configuration from environment variables. Subsequent
    /// calls return the cached instance.
    ///
    /// # Panics
    /// Panics if configuration loading fails. The client cannot talk to the
    /// device without a valid configuration.
    pub fn get() -> &'static Self {
        static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();
        APP_CONFIG.get_or_init(|| Self::load().expect("failed to load application configuration"))
    }

    /// Load and validate all configuration from environment variables
    pub fn load() -> Result<Self> {
        let device = DeviceConfig::load()?;
        let polling = PollingConfig::load()?;

        Ok(Self { device, polling })
    }
}

impl DeviceConfig {
    const DEFAULT_URL: &str = "http://192.168.4.1";

    fn load() -> Result<Self> {
        let base_url = env::var("DEVICE_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_string());

        ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "failed to parse DEVICE_URL: expected http:// or https:// scheme, got {base_url}"
        );

        let request_timeout = optional_millis("DEVICE_REQUEST_TIMEOUT_MS")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }
}

impl PollingConfig {
    const WIRELESS_INTERVAL_MS: u64 = 2800;
    const WIRED_INTERVAL_MS: u64 = 2000;
    const COUNTDOWN_TICK_MS: u64 = 1000;
    const COUNTDOWN_START: u32 = 10;

    fn load() -> Result<Self> {
        let wireless_interval = millis_or("WIFI_STATUS_INTERVAL_MS", Self::WIRELESS_INTERVAL_MS)?;
        let wired_interval = millis_or("ETH_STATUS_INTERVAL_MS", Self::WIRED_INTERVAL_MS)?;
        let countdown_tick = millis_or("REBOOT_COUNTDOWN_TICK_MS", Self::COUNTDOWN_TICK_MS)?;

        Ok(Self {
            wireless_interval,
            wired_interval,
            countdown_tick,
            countdown_start: Self::COUNTDOWN_START,
        })
    }
}

fn millis_or(name: &str, default: u64) -> Result<Duration> {
    Ok(optional_millis(name)?.unwrap_or(Duration::from_millis(default)))
}

fn optional_millis(name: &str) -> Result<Option<Duration>> {
    let Ok(value) = env::var(name) else {
        return Ok(None);
    };

    let millis = value
        .parse::<u64>()
        .context(format!("failed to parse {name}: invalid format"))?;

    ensure!(millis > 0, "failed to parse {name}: must be greater than zero");

    Ok(Some(Duration::from_millis(millis)))
}
