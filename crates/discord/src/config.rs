use secrecy::{ExposeSecret, Secret};

/// Configuration for the Discord bot account.
#[derive(Clone)]
pub struct DiscordAccountConfig {
    /// Bot token from the Discord developer portal.
    pub token: Secret<String>,

    /// Overwrite the global slash-command set on every ready event.
    pub register_commands: bool,
}

impl DiscordAccountConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token.into()),
            ..Default::default()
        }
    }

    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for DiscordAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordAccountConfig")
            .field("token", &"[REDACTED]")
            .field("register_commands", &self.register_commands)
            .finish()
    }
}

impl Default for DiscordAccountConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            register_commands: true,
        }
    }
}
