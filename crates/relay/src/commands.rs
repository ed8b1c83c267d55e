//! Administrative commands and their dispatch.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    Result,
    access::{AccessDenied, Action, AuthorizationGate},
    ids::{ChannelId, RoleId, UserId},
    platform::RelayPlatform,
    settings::{ChannelSide, Settings},
};

/// Channel types as far as channel selection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOption {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOption {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOption {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlacklistAction {
    Add(UserOption),
    Remove(UserOption),
    List,
}

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetHostChannel(ChannelOption),
    SetRecipientChannel(ChannelOption),
    Blacklist(BlacklistAction),
    SetManageRole(RoleOption),
}

impl Command {
    pub const SET_HOST_CHANNEL: &'static str = "sethostchannel";
    pub const SET_RECIPIENT_CHANNEL: &'static str = "setrecipientchannel";
    pub const BLACKLIST: &'static str = "blacklist";
    pub const SET_MANAGE_ROLE: &'static str = "setmanagerole";

    pub fn name(&self) -> &'static str {
        match self {
            Self::SetHostChannel(_) => Self::SET_HOST_CHANNEL,
            Self::SetRecipientChannel(_) => Self::SET_RECIPIENT_CHANNEL,
            Self::Blacklist(_) => Self::BLACKLIST,
            Self::SetManageRole(_) => Self::SET_MANAGE_ROLE,
        }
    }

    fn action(&self) -> Action {
        match self {
            Self::SetManageRole(_) => Action::SetManageRole,
            _ => Action::Administer,
        }
    }
}

/// Text sent back to the invoking user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub content: String,
    /// Visible only to the invoker.
    pub ephemeral: bool,
}

impl CommandReply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// A command refused without any state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Access(AccessDenied),
    NotATextChannel,
    SameChannel,
}

impl From<AccessDenied> for Rejection {
    fn from(denied: AccessDenied) -> Self {
        Self::Access(denied)
    }
}

impl Rejection {
    pub fn reply(&self) -> CommandReply {
        match self {
            Self::Access(denied) => CommandReply::ephemeral(denied.to_string()),
            Self::NotATextChannel => CommandReply::public("Please select a text channel."),
            Self::SameChannel => {
                CommandReply::public("The host and recipient channels must be different.")
            },
        }
    }
}

/// Routes commands through the authorization gate into settings changes.
pub struct CommandRouter {
    settings: Arc<Settings>,
    gate: AuthorizationGate,
}

impl CommandRouter {
    pub fn new(settings: Arc<Settings>) -> Self {
        let gate = AuthorizationGate::new(Arc::clone(&settings));
        Self { settings, gate }
    }

    /// Run `command` on behalf of `actor`.
    ///
    /// Only a failed save surfaces as `Err`; refusals become replies.
    pub async fn dispatch(
        &self,
        platform: &dyn RelayPlatform,
        actor: &UserId,
        command: Command,
    ) -> Result<CommandReply> {
        let name = command.name();
        if let Err(denied) = self.gate.check(platform, actor, command.action()).await {
            debug!(command = name, user_id = %actor, reason = ?denied, "command refused");
            return Ok(Rejection::from(denied).reply());
        }
        let reply = match command {
            Command::SetHostChannel(channel) => self.set_channel(ChannelSide::Source, channel)?,
            Command::SetRecipientChannel(channel) => {
                self.set_channel(ChannelSide::Destination, channel)?
            },
            Command::Blacklist(action) => self.blacklist(action)?,
            Command::SetManageRole(role) => self.set_manage_role(role)?,
        };
        debug!(command = name, user_id = %actor, "command handled");
        Ok(reply)
    }

    fn set_channel(&self, side: ChannelSide, channel: ChannelOption) -> Result<CommandReply> {
        if channel.kind != ChannelKind::Text {
            return Ok(Rejection::NotATextChannel.reply());
        }
        if !self.settings.set_channel(side, channel.id.clone())? {
            return Ok(Rejection::SameChannel.reply());
        }
        info!(side = ?side, channel_id = %channel.id, "relay channel set");
        let label = match side {
            ChannelSide::Source => "Host",
            ChannelSide::Destination => "Recipient",
        };
        Ok(CommandReply::public(format!(
            "{label} channel set to {}",
            channel.name
        )))
    }

    fn blacklist(&self, action: BlacklistAction) -> Result<CommandReply> {
        let reply = match action {
            BlacklistAction::Add(user) => {
                if self.settings.add_to_blacklist(user.id.clone())? {
                    info!(user_id = %user.id, "user blacklisted");
                    format!("{} has been added to the blacklist.", user.username)
                } else {
                    format!("{} is already blacklisted.", user.username)
                }
            },
            BlacklistAction::Remove(user) => {
                if self.settings.remove_from_blacklist(&user.id)? {
                    info!(user_id = %user.id, "user removed from blacklist");
                    format!("{} has been removed from the blacklist.", user.username)
                } else {
                    format!("{} is not in the blacklist.", user.username)
                }
            },
            BlacklistAction::List => {
                let list = self.settings.blacklist();
                if list.is_empty() {
                    "The blacklist is empty.".to_string()
                } else {
                    let mentions: Vec<String> = list.iter().map(|id| format!("<@{id}>")).collect();
                    format!("Blacklisted users:\n{}", mentions.join("\n"))
                }
            },
        };
        Ok(CommandReply::ephemeral(reply))
    }

    fn set_manage_role(&self, role: RoleOption) -> Result<CommandReply> {
        let first = self.settings.manage_role().is_none();
        self.settings.set_manage_role(role.id.clone())?;
        info!(role_id = %role.id, first, "manage role set");
        let verb = if first {
            "set"
        } else {
            "updated"
        };
        Ok(CommandReply::public(format!(
            "Manage role {verb} to {}",
            role.name
        )))
    }
}
