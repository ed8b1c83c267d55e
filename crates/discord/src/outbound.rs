//! [`RelayPlatform`] over serenity's HTTP client and cache.

use std::{num::NonZeroU64, sync::Arc};

use {
    async_trait::async_trait,
    serenity::{
        all::{Cache, Context, Http, Timestamp},
        builder::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage},
        model::id as discord,
    },
    tracing::warn,
};

use crosspost_relay::{
    Error as RelayError, Result as RelayResult,
    ids::{ChannelId, GuildId, MessageId, RoleId, UserId},
    platform::{Member, RelayEmbed, RelayPlatform},
};

/// Outbound calls for one gateway connection.
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    pub fn from_context(ctx: &Context) -> Self {
        Self::new(Arc::clone(&ctx.http), Arc::clone(&ctx.cache))
    }

    async fn send(&self, channel: &ChannelId, message: CreateMessage) -> RelayResult<MessageId> {
        let channel_id: discord::ChannelId = parse_id("channel", channel.as_str())?;
        let sent = channel_id
            .send_message(&self.http, message)
            .await
            .map_err(|e| RelayError::platform(format!("send to channel {channel}"), e))?;
        Ok(MessageId::new(sent.id.to_string()))
    }
}

#[async_trait]
impl RelayPlatform for DiscordPlatform {
    async fn guild_ids(&self) -> Vec<GuildId> {
        self.cache
            .guilds()
            .into_iter()
            .map(|g| GuildId::new(g.to_string()))
            .collect()
    }

    async fn fetch_member(&self, guild: &GuildId, user: &UserId) -> RelayResult<Option<Member>> {
        let guild_id: discord::GuildId = parse_id("guild", guild.as_str())?;
        let user_id: discord::UserId = parse_id("user", user.as_str())?;
        match self.http.get_member(guild_id, user_id).await {
            Ok(member) => Ok(Some(Member {
                display_name: member
                    .nick
                    .clone()
                    .unwrap_or_else(|| member.user.name.clone()),
                avatar_url: Some(member.face()),
                roles: member
                    .roles
                    .iter()
                    .map(|r| RoleId::new(r.to_string()))
                    .collect(),
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(RelayError::platform(
                format!("fetch member {user} in guild {guild}"),
                e,
            )),
        }
    }

    async fn message_exists(&self, channel: &ChannelId, message: &MessageId) -> RelayResult<bool> {
        let channel_id: discord::ChannelId = parse_id("channel", channel.as_str())?;
        let message_id: discord::MessageId = parse_id("message", message.as_str())?;
        match self.http.get_message(channel_id, message_id).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(RelayError::platform(
                format!("fetch message {message} in channel {channel}"),
                e,
            )),
        }
    }

    async fn send_text(&self, channel: &ChannelId, content: &str) -> RelayResult<MessageId> {
        self.send(channel, CreateMessage::new().content(content))
            .await
    }

    async fn send_embed(&self, channel: &ChannelId, embed: &RelayEmbed) -> RelayResult<MessageId> {
        self.send(channel, CreateMessage::new().embed(build_embed(embed)))
            .await
    }

    async fn reply_embed(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        embed: &RelayEmbed,
    ) -> RelayResult<MessageId> {
        let channel_id: discord::ChannelId = parse_id("channel", channel.as_str())?;
        let message_id: discord::MessageId = parse_id("message", message.as_str())?;
        let builder = CreateMessage::new()
            .embed(build_embed(embed))
            .reference_message((channel_id, message_id));
        self.send(channel, builder).await
    }
}

/// Parse a string id into a serenity id. Discord ids are never zero.
pub(crate) fn parse_id<T: From<NonZeroU64>>(kind: &'static str, raw: &str) -> RelayResult<T> {
    raw.parse::<NonZeroU64>()
        .map(T::from)
        .map_err(|_| RelayError::invalid_id(kind, raw))
}

fn is_not_found(e: &serenity::Error) -> bool {
    match e {
        serenity::Error::Http(http) => http.status_code().is_some_and(|s| s.as_u16() == 404),
        _ => false,
    }
}

fn build_embed(embed: &RelayEmbed) -> CreateEmbed {
    let mut author = CreateEmbedAuthor::new(&embed.author_name);
    if let Some(ref icon) = embed.author_icon_url {
        author = author.icon_url(icon);
    }
    let mut builder = CreateEmbed::new()
        .author(author)
        .footer(CreateEmbedFooter::new(&embed.footer));
    if let Some(ref description) = embed.description {
        builder = builder.description(description);
    }
    if let Some(ref image) = embed.image_url {
        builder = builder.image(image);
    }
    match Timestamp::from_unix_timestamp(embed.timestamp) {
        Ok(timestamp) => builder = builder.timestamp(timestamp),
        Err(e) => warn!(timestamp = embed.timestamp, error = %e, "invalid embed timestamp"),
    }
    builder
}
