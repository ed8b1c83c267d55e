use std::path::PathBuf;

use {crosspost_relay::correlator, secrecy::Secret, serde::Deserialize};

/// Root of `crosspost.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrosspostConfig {
    /// Directory holding the persisted bot records. Defaults to the working
    /// directory.
    pub data_dir: Option<PathBuf>,
    pub relay: RelaySection,
    pub discord: DiscordSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelaySection {
    /// How many relayed messages stay resolvable for reply threading.
    pub correlation_capacity: usize,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            correlation_capacity: correlator::DEFAULT_CAPACITY,
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscordSection {
    /// Bot token. Usually supplied through `DISCORD_TOKEN` instead.
    pub token: Option<Secret<String>>,
}

impl std::fmt::Debug for DiscordSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSection")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
