//! The chat-platform surface the relay core depends on.

use async_trait::async_trait;

use crate::{
    Result,
    ids::{ChannelId, GuildId, MessageId, RoleId, UserId},
};

/// A file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    /// MIME type as declared by the platform, if any.
    pub content_type: Option<String>,
}

/// Who posted an inbound message.
#[derive(Debug, Clone)]
pub struct Author {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bot: bool,
}

/// One message-create event, already lifted out of the platform's types.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub guild_name: String,
    pub author: Author,
    pub content: String,
    pub attachments: Vec<Attachment>,
    /// The message this one replies to.
    pub reply_to: Option<MessageId>,
    /// Creation time, unix seconds.
    pub created_at: i64,
}

impl InboundMessage {
    pub fn has_text(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// A user's membership in one community.
#[derive(Debug, Clone)]
pub struct Member {
    /// Nickname, falling back to the username.
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub roles: Vec<RoleId>,
}

/// Author-attributed embed posted by the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayEmbed {
    pub author_name: String,
    pub author_icon_url: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub footer: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Collaborator calls used by the authorization gate and the pipeline.
///
/// Lookups return `Ok(None)` when the platform reports the entity does not
/// exist or is not visible; `Err` is reserved for everything else.
#[async_trait]
pub trait RelayPlatform: Send + Sync {
    /// Every community the bot currently participates in.
    async fn guild_ids(&self) -> Vec<GuildId>;

    async fn fetch_member(&self, guild: &GuildId, user: &UserId) -> Result<Option<Member>>;

    /// Whether `message` can still be fetched from `channel`.
    async fn message_exists(&self, channel: &ChannelId, message: &MessageId) -> Result<bool>;

    async fn send_text(&self, channel: &ChannelId, content: &str) -> Result<MessageId>;

    async fn send_embed(&self, channel: &ChannelId, embed: &RelayEmbed) -> Result<MessageId>;

    /// Post `embed` as a threaded reply to `message` in `channel`.
    async fn reply_embed(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        embed: &RelayEmbed,
    ) -> Result<MessageId>;
}
