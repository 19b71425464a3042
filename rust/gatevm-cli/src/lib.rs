//! Library surface of the `gatevm` command-line tool.

pub mod colors;
pub mod commands;
pub mod config;
