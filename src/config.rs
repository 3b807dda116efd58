use std::time::Duration;

use url::Url;

use crate::error::NotifyError;

/// Notification endpoint of the local development stack
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8004/ws";

pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_RECONNECT_BASE: Duration = Duration::from_millis(1000);
pub const DEFAULT_RECONNECT_MAX: Duration = Duration::from_millis(30000);
pub const DEFAULT_RECONNECT_JITTER: Duration = Duration::from_millis(1000);

/// Settings for a [`NotificationChannel`](crate::NotificationChannel)
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub endpoint: String,
    pub ping_interval: Duration,
    pub reconnect_base: Duration,
    pub reconnect_max: Duration,
    pub reconnect_jitter: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            ping_interval: DEFAULT_PING_INTERVAL,
            reconnect_base: DEFAULT_RECONNECT_BASE,
            reconnect_max: DEFAULT_RECONNECT_MAX,
            reconnect_jitter: DEFAULT_RECONNECT_JITTER,
        }
    }
}

impl ChannelConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            ..Self::default()
        }
    }

    /// Build a config from `NOTIFICATION_*` environment variables.
    ///
    /// Unset variables fall back to the defaults; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, NotifyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("NOTIFICATION_WS_URL") {
            config.endpoint = endpoint;
        }
        if let Some(secs) = parse_u64(&lookup, "NOTIFICATION_PING_INTERVAL_SECS")? {
            config.ping_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_u64(&lookup, "NOTIFICATION_RECONNECT_BASE_MS")? {
            config.reconnect_base = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, "NOTIFICATION_RECONNECT_MAX_MS")? {
            config.reconnect_max = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, "NOTIFICATION_RECONNECT_JITTER_MS")? {
            config.reconnect_jitter = Duration::from_millis(ms);
        }

        if config.ping_interval.is_zero() {
            return Err(NotifyError::ConfigError(
                "NOTIFICATION_PING_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if config.reconnect_max < config.reconnect_base {
            return Err(NotifyError::ConfigError(format!(
                "NOTIFICATION_RECONNECT_MAX_MS ({}) is below NOTIFICATION_RECONNECT_BASE_MS ({})",
                config.reconnect_max.as_millis(),
                config.reconnect_base.as_millis()
            )));
        }

        Ok(config)
    }

    /// Set the liveness ping interval; zero selects [`DEFAULT_PING_INTERVAL`]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = if interval.is_zero() {
            DEFAULT_PING_INTERVAL
        } else {
            interval
        };
        self
    }

    /// Set the reconnect backoff base delay and ceiling.
    ///
    /// A ceiling below `base` is raised to `base`.
    pub fn with_reconnect_delays(mut self, base: Duration, max: Duration) -> Self {
        self.reconnect_base = base;
        self.reconnect_max = max.max(base);
        self
    }

    /// Set the upper bound (exclusive) of the random jitter added to each reconnect delay
    pub fn with_reconnect_jitter(mut self, jitter: Duration) -> Self {
        self.reconnect_jitter = jitter;
        self
    }

    /// Endpoint URL with the credential attached as the `token` query parameter
    pub fn endpoint_url(&self, credential: &str) -> Result<Url, NotifyError> {
        let mut url = Url::parse(&self.endpoint)?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(NotifyError::InvalidEndpoint(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        url.query_pairs_mut().append_pair("token", credential);
        Ok(url)
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, NotifyError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| NotifyError::ConfigError(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}
