//! propviz client application.
//!
//! This crate wires the engine to the physics backend: the `Backend`
//! trait and its HTTP implementation, the wire format, the event loop
//! thread and the runtime configuration. The `propviz` binary drives it
//! from the command line.

pub mod backend;
pub mod config;
pub mod event_loop;
pub mod state;
pub mod wire;

pub use propviz_core as core;
