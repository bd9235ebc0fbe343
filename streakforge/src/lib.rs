#![doc = "streakforge: CLI wiring around streakforge-core."]

//! Command parsing, YAML config adaptation and collaborator assembly for the
//! `streakforge` binary. All domain logic lives in `streakforge-core`.

pub mod cli;
pub mod load_config;
