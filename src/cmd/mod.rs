//! Auxiliary subcommands exposed by the herald binary.

pub mod check_config;

pub use check_config::CheckConfigArgs;
