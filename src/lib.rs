//! Simple to use cli/daemon for measuring how long you spend in each window.
//! Time is split between windows and AFK, grouped by rules matching title suffixes, and shown as
//! a live summary in a terminal.
//!

pub mod cli;
pub mod daemon;
pub mod engine;
pub mod fs;
pub mod storage;
pub mod utils;
pub mod window_api;
