//! Discord adapter for the crosspost relay.
//!
//! Connects to the Discord Gateway using serenity, registers the
//! administrative slash commands, and feeds message and interaction events
//! into the relay core.

pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod handler;
pub mod outbound;

pub use {
    config::DiscordAccountConfig,
    error::{Error, Result},
    handler::DiscordHandler,
};
