//! TUI debugger for the F4F emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and flag visualization
//! - Word-oriented memory view
//! - Step/run/breakpoint controls
//! - Disassembly around the PC

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
