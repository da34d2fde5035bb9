// Configuration module for reading Painter.toml
// Session parameters, executor timing, search switches, agent roster and logging

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::agents::AgentOptions;
use crate::types::MAX_PLAYERS;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub session: SessionConfig,
    pub timing: TimingConfig,
    pub search: SearchConfig,
    pub agents: AgentsConfig,
    pub logging: LoggingConfig,
}

/// Parameters of a single game
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SessionConfig {
    /// Map file name, resolved inside `maps_folder`
    pub map: String,
    pub maps_folder: String,
    pub max_rounds: u32,
    /// Per-move think budget in seconds; 0 disables the deadline
    pub max_think_time_secs: f64,
    /// Search depth budget for MaxN and Minimax
    pub max_depth: u32,
    /// Mirror move logs to the console
    pub verbose: bool,
}

/// Executor timing constants
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TimingConfig {
    pub polling_interval_ms: u64,
}

impl TimingConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }
}

/// Search switches
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Evaluate the root's children in parallel (MaxN and Minimax)
    pub parallel_root: bool,
}

/// Agent roster
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AgentsConfig {
    /// Agent names in player order; the last one is reused for remaining players
    pub roster: Vec<String>,
    pub max_players: usize,
    /// Pause before each decision, counted against the think budget
    pub think_delay_ms: u64,
}

/// Move log sink
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Write the per-game log file
    pub enabled: bool,
    pub log_folder: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Painter.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&contents).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Painter.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Painter.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Painter.toml
    pub fn default_hardcoded() -> Self {
        Config {
            session: SessionConfig {
                map: "example_map.txt".to_string(),
                maps_folder: "maps".to_string(),
                max_rounds: 5,
                max_think_time_secs: 0.0,
                max_depth: 5,
                verbose: true,
            },
            timing: TimingConfig {
                polling_interval_ms: 1,
            },
            search: SearchConfig {
                parallel_root: false,
            },
            agents: AgentsConfig {
                roster: vec!["RandomAgent".to_string()],
                max_players: MAX_PLAYERS,
                think_delay_ms: 0,
            },
            logging: LoggingConfig {
                enabled: true,
                log_folder: "logs".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            eprintln!(
                "Warning: Could not load Painter.toml ({}), using hardcoded defaults",
                e
            );
            Self::default_hardcoded()
        })
    }

    /// Agent construction options derived from this configuration
    pub fn agent_options(&self) -> AgentOptions {
        AgentOptions {
            think_delay: Duration::from_millis(self.agents.think_delay_ms),
            parallel_root: self.search.parallel_root,
        }
    }

    /// Checks cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.agents.max_players == 0 || self.agents.max_players > MAX_PLAYERS {
            return Err(format!(
                "agents.max_players must be between 1 and {}",
                MAX_PLAYERS
            ));
        }
        if self.agents.roster.is_empty() {
            return Err("agents.roster must name at least one agent".to_string());
        }
        let budget = self.session.max_think_time_secs;
        if budget.is_nan() || budget < 0.0 {
            return Err("session.max_think_time_secs must be zero or positive".to_string());
        }
        if Duration::try_from_secs_f64(budget).is_err() {
            return Err(format!(
                "session.max_think_time_secs is too large: {}",
                budget
            ));
        }
        if self.timing.polling_interval_ms == 0 {
            return Err("timing.polling_interval_ms must be positive".to_string());
        }
        Ok(())
    }
}
