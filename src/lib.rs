// Library exports for the spaceship painter game
// The binary and the integration tests drive the game through these modules

pub mod agents;
pub mod bitmask;
pub mod board;
pub mod cli;
pub mod config;
pub mod executor;
pub mod game;
pub mod game_log;
pub mod map;
pub mod search;
pub mod types;
