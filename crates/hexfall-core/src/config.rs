//! Session configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration for a standard four-player game.

use crate::disaster::{standard_disasters, DisasterDefinition};
use crate::player::DEFAULT_CONVERSION_RATE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything needed to start a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// One entry per player, in seating order
    #[serde(default = "default_player_names")]
    pub player_names: Vec<String>,
    #[serde(default = "default_points_to_win")]
    pub points_to_win: u32,
    /// Seed for the session RNG; fresh entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_conversion_rate")]
    pub base_conversion_rate: u32,
    #[serde(default)]
    pub disasters: DisasterConfig,
}

fn default_player_names() -> Vec<String> {
    ["Amber", "Basalt", "Cedar", "Dune"].iter().map(|s| s.to_string()).collect()
}

fn default_points_to_win() -> u32 {
    10
}

fn default_conversion_rate() -> u32 {
    DEFAULT_CONVERSION_RATE
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_names: default_player_names(),
            points_to_win: default_points_to_win(),
            seed: None,
            base_conversion_rate: default_conversion_rate(),
            disasters: DisasterConfig::default(),
        }
    }
}

impl GameConfig {
    /// Default configuration with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn player_count(&self) -> usize {
        self.player_names.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let players = self.player_names.len();
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) {
            return Err(ConfigError::Invalid(format!(
                "{players} players, expected {MIN_PLAYERS} to {MAX_PLAYERS}"
            )));
        }
        if self.points_to_win == 0 {
            return Err(ConfigError::Invalid("points_to_win must be positive".to_string()));
        }
        if self.base_conversion_rate == 0 {
            return Err(ConfigError::Invalid("base_conversion_rate must be positive".to_string()));
        }
        self.disasters.validate()
    }
}

/// Disaster timing and the disaster table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterConfig {
    /// Ended turns before the first disaster
    #[serde(default = "default_first_disaster_in")]
    pub first_disaster_in: u32,
    #[serde(default = "default_min_turns_between")]
    pub min_turns_between: u32,
    /// Exclusive upper bound of the countdown
    #[serde(default = "default_max_turns_between")]
    pub max_turns_between: u32,
    /// Chance that a finished countdown actually brings a disaster
    #[serde(default = "default_disaster_chance")]
    pub disaster_chance: f64,
    #[serde(default = "default_tornado_min_steps")]
    pub tornado_min_steps: u32,
    /// Ticks between two struck tiles during a rollout
    #[serde(default = "default_rollout_stagger_ticks")]
    pub rollout_stagger_ticks: u32,
    #[serde(default = "standard_disasters")]
    pub definitions: Vec<DisasterDefinition>,
}

fn default_first_disaster_in() -> u32 {
    4
}

fn default_min_turns_between() -> u32 {
    4
}

fn default_max_turns_between() -> u32 {
    8
}

fn default_disaster_chance() -> f64 {
    1.0
}

fn default_tornado_min_steps() -> u32 {
    5
}

fn default_rollout_stagger_ticks() -> u32 {
    1
}

impl Default for DisasterConfig {
    fn default() -> Self {
        Self {
            first_disaster_in: default_first_disaster_in(),
            min_turns_between: default_min_turns_between(),
            max_turns_between: default_max_turns_between(),
            disaster_chance: default_disaster_chance(),
            tornado_min_steps: default_tornado_min_steps(),
            rollout_stagger_ticks: default_rollout_stagger_ticks(),
            definitions: standard_disasters(),
        }
    }
}

impl DisasterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.definitions.is_empty() {
            return Err(ConfigError::Invalid("no disasters defined".to_string()));
        }
        if self.definitions.iter().any(|d| !(0.0..=1.0).contains(&d.probability)) {
            return Err(ConfigError::Invalid("disaster probability outside [0, 1]".to_string()));
        }
        let total: f64 = self.definitions.iter().map(|d| d.probability).sum();
        if total > 1.0 + 1e-9 {
            return Err(ConfigError::Invalid(format!("disaster probabilities sum to {total}")));
        }
        if self.min_turns_between == 0 || self.min_turns_between >= self.max_turns_between {
            return Err(ConfigError::Invalid(format!(
                "turns between disasters must satisfy 0 < min < max, got {}..{}",
                self.min_turns_between, self.max_turns_between
            )));
        }
        if self.first_disaster_in == 0 {
            return Err(ConfigError::Invalid("first_disaster_in must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.disaster_chance) {
            return Err(ConfigError::Invalid("disaster_chance outside [0, 1]".to_string()));
        }
        if self.rollout_stagger_ticks == 0 {
            return Err(ConfigError::Invalid("rollout_stagger_ticks must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = GameConfig::from_json_str("{}").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.player_count(), 4);
        assert_eq!(config.points_to_win, 10);
        assert_eq!(config.disasters.definitions.len(), 8);
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "player_names": ["North", "South"],
            "seed": 7,
            "disasters": { "disaster_chance": 0.5 }
        }"#;
        let config = GameConfig::from_json_str(json).unwrap();
        assert_eq!(config.player_count(), 2);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.disasters.disaster_chance, 0.5);
        assert_eq!(config.disasters.max_turns_between, 8);
    }

    #[test]
    fn test_player_count_is_checked() {
        let result = GameConfig::from_json_str(r#"{"player_names": ["Solo"]}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let five = r#"{"player_names": ["a", "b", "c", "d", "e"]}"#;
        assert!(matches!(GameConfig::from_json_str(five), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_probability_sum_is_checked() {
        let mut config = GameConfig::default();
        config.disasters.definitions[0].probability = 0.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_countdown_range_is_checked() {
        let mut config = GameConfig::default();
        config.disasters.min_turns_between = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(GameConfig::from_json_str("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            GameConfig::from_path("/nonexistent/hexfall.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
