//! Settings are loaded from TOML through `config`; the path can be overridden with
//! `--settings`. See `bin/settings_demo.rs` for a walkthrough.

mod cli;
pub use clap::{Parser, Subcommand};
pub use cli::*;

mod settings;
pub use settings::*;
