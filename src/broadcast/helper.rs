use rand::{rngs::StdRng, seq::IndexedRandom, Rng, SeedableRng};
use std::time::Duration;

use crate::config::BroadcastConfig;

pub const HELPER_BOT_ID: &str = "helper-bot";
pub const HELPER_BOT_NAME: &str = "Bot Uklízeč";

pub const HELPER_RESPONSES: [&str; 5] = [
    "Rozumím. Přidávám k tomu šplích osvěžovače.",
    "Legendární. Mám ti to vyrýt na dveře kabinky?",
    "Odvážné. Mám zalarmovat úklidovou jednotku?",
    "Voní to přesně tak, jak má. 10/10, opakoval bych.",
    "Potřebuješ alibi? Klidně to hodím na stupačky z patra.",
];

/// A helper reply decided on but not yet sent
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedReply {
    pub delay: Duration,
    pub body: String,
}

/// Decides whether a message gets a helper reply, when, and with what body
pub struct HelperReplyPolicy {
    probability: f64,
    min_delay_ms: u64,
    max_delay_ms: u64,
    rng: StdRng,
}

impl HelperReplyPolicy {
    pub fn new(config: &BroadcastConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic policy for tests
    pub fn seeded(config: &BroadcastConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &BroadcastConfig, rng: StdRng) -> Self {
        Self {
            probability: config.helper_reply_probability.clamp(0.0, 1.0),
            min_delay_ms: config.helper_reply_min_delay.as_millis() as u64,
            max_delay_ms: config.helper_reply_max_delay.as_millis() as u64,
            rng,
        }
    }

    /// Rolls for a reply; the delay is uniform in `[min, max)`
    pub fn plan(&mut self) -> Option<PlannedReply> {
        if !self.rng.random_bool(self.probability) {
            return None;
        }

        let delay_ms = if self.max_delay_ms > self.min_delay_ms {
            self.rng.random_range(self.min_delay_ms..self.max_delay_ms)
        } else {
            self.min_delay_ms
        };
        let body = HELPER_RESPONSES.choose(&mut self.rng)?;

        Some(PlannedReply {
            delay: Duration::from_millis(delay_ms),
            body: body.to_string(),
        })
    }
}
