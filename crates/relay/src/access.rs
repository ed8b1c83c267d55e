//! Who may run administrative commands.
//!
//! One manage role applies bot-wide, but roles belong to individual
//! communities, so an actor qualifies if any community the bot is in grants
//! them the role.

use std::sync::Arc;

use tracing::debug;

use crate::{
    ids::{RoleId, UserId},
    platform::RelayPlatform,
    settings::Settings,
};

/// The kind of administrative action being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `setmanagerole`, the only action allowed before a role exists.
    SetManageRole,
    /// Every other administrative command.
    Administer,
}

/// Reason an administrative action was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    ManageRoleNotSet,
    MissingRoleToChangeManageRole,
    MissingRole,
}

impl std::fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManageRoleNotSet => write!(
                f,
                "The manage role has not been set yet. Use /setmanagerole to set a role."
            ),
            Self::MissingRoleToChangeManageRole => write!(
                f,
                "You do not have the required role to change the manage role."
            ),
            Self::MissingRole => {
                write!(f, "You do not have the required role to use this command.")
            },
        }
    }
}

/// Role-based gate over the current [`Settings`].
#[derive(Clone)]
pub struct AuthorizationGate {
    settings: Arc<Settings>,
}

impl AuthorizationGate {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// True while no manage role is configured, or when `actor` holds the
    /// configured role in at least one community.
    pub async fn can_manage(&self, platform: &dyn RelayPlatform, actor: &UserId) -> bool {
        match self.settings.manage_role() {
            None => true,
            Some(role) => holds_role_anywhere(platform, actor, &role).await,
        }
    }

    /// Decide whether `actor` may perform `action` right now.
    pub async fn check(
        &self,
        platform: &dyn RelayPlatform,
        actor: &UserId,
        action: Action,
    ) -> Result<(), AccessDenied> {
        let Some(role) = self.settings.manage_role() else {
            return match action {
                Action::SetManageRole => Ok(()),
                Action::Administer => Err(AccessDenied::ManageRoleNotSet),
            };
        };
        if holds_role_anywhere(platform, actor, &role).await {
            return Ok(());
        }
        match action {
            Action::SetManageRole => Err(AccessDenied::MissingRoleToChangeManageRole),
            Action::Administer => Err(AccessDenied::MissingRole),
        }
    }
}

/// Any failed or empty member lookup counts as "no role in that community".
pub async fn holds_role_anywhere(
    platform: &dyn RelayPlatform,
    actor: &UserId,
    role: &RoleId,
) -> bool {
    for guild in platform.guild_ids().await {
        match platform.fetch_member(&guild, actor).await {
            Ok(Some(member)) if member.roles.contains(role) => {
                debug!(user_id = %actor, guild_id = %guild, role_id = %role, "manage role found");
                return true;
            },
            Ok(Some(_)) => {},
            Ok(None) => debug!(user_id = %actor, guild_id = %guild, "not a member"),
            Err(e) => {
                debug!(user_id = %actor, guild_id = %guild, error = %e, "member lookup failed");
            },
        }
    }
    false
}
