//! Core types and definitions for the propviz client.
//!
//! This crate defines the vocabulary shared across all other crates:
//! positions, entities, scenes, heat samples, routes, commands, events,
//! snapshots, errors and constants. It has no dependency on any runtime
//! or network stack.

pub mod commands;
pub mod constants;
pub mod enums;
pub mod error;
pub mod events;
pub mod results;
pub mod state;
pub mod types;
