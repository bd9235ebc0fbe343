#![doc = "streakforge-core: core logic library for streakforge."]

//! This crate contains the scheduling, content-generation and commit/push
//! pipelines for simulated contribution activity. Presentation and delivery
//! concerns (CLI, notification transports, dashboards) are not included here.
//!
//! # Usage
//! Add this as a dependency for the scheduling, generation, git orchestration
//! and reporting code. The CLI crate wires the pieces together from a YAML
//! configuration.

pub mod analytics;
pub mod analyze;
pub mod config;
pub mod contract;
pub mod contribute;
pub mod error;
pub mod generate;
pub mod markov;
pub mod mcp;
pub mod notify;
pub mod repo;
pub mod retry;
pub mod schedule;
