use std::time::Duration;

/// Tuning for the broadcast core and its helper-bot replies
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Chance that a user message triggers a helper reply
    pub helper_reply_probability: f64,
    /// Lower bound (inclusive) of the helper reply delay
    pub helper_reply_min_delay: Duration,
    /// Upper bound (exclusive) of the helper reply delay
    pub helper_reply_max_delay: Duration,
    /// Capacity of the inbound command queue
    pub queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            helper_reply_probability: 0.5,
            helper_reply_min_delay: Duration::from_millis(1000),
            helper_reply_max_delay: Duration::from_millis(3000),
            queue_capacity: 1024,
        }
    }
}

/// Process-wide settings read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// When absent the server runs on in-memory stores
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub session_expiration_days: i64,
    pub max_message_length: usize,
    pub broadcast: BroadcastConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            session_expiration_days: std::env::var("SESSION_EXPIRATION_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.session_expiration_days),
            max_message_length: std::env::var("MAX_MESSAGE_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_message_length),
            broadcast: defaults.broadcast,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            session_expiration_days: 7,
            max_message_length: 2000,
            broadcast: BroadcastConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_defaults_match_helper_reply_policy() {
        let config = BroadcastConfig::default();

        assert_eq!(config.helper_reply_probability, 0.5);
        assert_eq!(config.helper_reply_min_delay, Duration::from_millis(1000));
        assert_eq!(config.helper_reply_max_delay, Duration::from_millis(3000));
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(config.database_url.is_none());
        assert_eq!(config.session_expiration_days, 7);
        assert_eq!(config.max_message_length, 2000);
    }
}
