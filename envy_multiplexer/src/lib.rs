//! Session core for the envy terminal multiplexer.
//!
//! This crate owns panes, their bounded output buffers, and the child
//! processes running in them, along with the environment profiles those
//! processes are started with. It is intentionally independent of the
//! terminal front-end so that it can be tested in isolation.

pub mod buffer;
pub mod command;
pub mod config;
pub mod error;
pub mod history;
pub mod input;
pub mod line;
pub mod pane;
pub mod process;
pub mod profile;
pub mod registry;
pub mod state;
pub mod statusbar;
