use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReputationConfig {
    /// Lowest possible score; absent users read as this.
    #[serde(default = "default_floor")]
    pub floor: i64,
    #[serde(default = "default_ceiling")]
    pub ceiling: i64,
    /// Inactivity gap after which a sweep deducts points.
    #[serde(default = "default_decay_after_secs")]
    pub decay_after_secs: u64,
    #[serde(default = "default_decay_step")]
    pub decay_step: i64,
    /// Sweep period. Must stay >= `decay_after_secs`: the sweep deducts on
    /// every tick that observes a qualifying gap, so a shorter period would
    /// over-decay idle users.
    #[serde(default = "default_sweep_secs")]
    pub sweep_secs: u64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            floor: default_floor(),
            ceiling: default_ceiling(),
            decay_after_secs: default_decay_after_secs(),
            decay_step: default_decay_step(),
            sweep_secs: default_sweep_secs(),
        }
    }
}

fn default_floor() -> i64 {
    100
}

fn default_ceiling() -> i64 {
    1000
}

fn default_decay_after_secs() -> u64 {
    1800
}

fn default_decay_step() -> i64 {
    5
}

fn default_sweep_secs() -> u64 {
    1800
}
