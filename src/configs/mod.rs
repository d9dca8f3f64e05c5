pub mod logging;
pub mod player;
pub mod presence;
pub mod reputation;
pub mod storage;

pub use logging::*;
pub use player::*;
pub use presence::*;
pub use reputation::*;
pub use storage::*;

use serde::{Deserialize, Serialize};

use crate::common::types::AnyResult;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub reputation: ReputationConfig,
  #[serde(default)]
  pub player: PlayerConfig,
  #[serde(default)]
  pub presence: PresenceConfig,
  #[serde(default)]
  pub logging: Option<LoggingConfig>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      storage: StorageConfig::default(),
      reputation: ReputationConfig::default(),
      player: PlayerConfig::default(),
      presence: PresenceConfig::default(),
      logging: None,
    }
  }
}

impl Config {
  pub fn load() -> AnyResult<Self> {
    let config_path = if std::path::Path::new("config.toml").exists() {
      "config.toml"
    } else if std::path::Path::new("config.default.toml").exists() {
      "config.default.toml"
    } else {
      return Err("config.toml or config.default.toml not found".into());
    };

    crate::log_println!("Loading configuration from: {}", config_path);

    let config_str = std::fs::read_to_string(config_path)?;
    if config_str.is_empty() {
      return Err(format!("{} is empty", config_path).into());
    }

    let config: Config = toml::from_str(&config_str)?;
    Ok(config)
  }
}
