use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PresenceConfig {
    /// Display statuses the rotator cycles through.
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,
    #[serde(default = "default_rotate_secs")]
    pub rotate_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            statuses: default_statuses(),
            rotate_secs: default_rotate_secs(),
        }
    }
}

fn default_statuses() -> Vec<String> {
    vec![
        "Servers".to_string(),
        "the queue".to_string(),
        "reputation".to_string(),
    ]
}

fn default_rotate_secs() -> u64 {
    1320
}
