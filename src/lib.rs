//! Retrogen: deferred retroactive terrain generation.
//!
//! Retrofits previously generated tiles of a persistent world with the output
//! of generator plugins installed after those tiles were first created. The
//! scheduler substitutes delegating wrappers for opted-in plugins, keeps
//! per-world pending/completed ledgers keyed by tile coordinate, drains a
//! bounded amount of regeneration work per simulation step, and records
//! completion markers in each tile's serialized state so finished work is
//! never redone and unfinished work survives restarts.

pub mod api;
pub mod config;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod logging;
pub mod persistence;
pub mod registry;
pub mod scheduler;
pub mod types;
