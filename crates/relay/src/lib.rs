//! Cross-server message relay core.
//!
//! Mirrors posts from a host channel into a recipient channel, threads
//! replies back to the original posters, and gates the administrative
//! commands behind one manage role. The chat platform itself is reached only
//! through [`platform::RelayPlatform`].

pub mod access;
pub mod attachments;
pub mod commands;
pub mod correlator;
pub mod error;
pub mod ids;
pub mod pipeline;
pub mod platform;
pub mod settings;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    commands::{Command, CommandReply, CommandRouter},
    error::{Error, Result},
    pipeline::{Outcome, RelayPipeline, Skip},
    platform::{InboundMessage, RelayPlatform},
    settings::Settings,
};
