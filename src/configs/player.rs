use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    /// How long an idle player keeps its voice connection before
    /// disconnecting. 0 disables the linger disconnect.
    #[serde(default = "default_idle_linger_secs")]
    pub idle_linger_secs: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            idle_linger_secs: default_idle_linger_secs(),
        }
    }
}

fn default_idle_linger_secs() -> u64 {
    300
}
