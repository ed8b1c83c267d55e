//! Recording [`RelayPlatform`] used by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    Error, Result,
    ids::{ChannelId, GuildId, MessageId, RoleId, UserId},
    platform::{Member, RelayEmbed, RelayPlatform},
    store::{ConfigStore, MemoryStore, StoreKey},
};

/// A call that reached the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        channel: ChannelId,
        content: String,
    },
    Embed {
        channel: ChannelId,
        embed: RelayEmbed,
        id: MessageId,
    },
    Reply {
        channel: ChannelId,
        message: MessageId,
        embed: RelayEmbed,
    },
}

#[derive(Default)]
pub struct FakePlatform {
    guilds: Vec<GuildId>,
    members: HashMap<(GuildId, UserId), Member>,
    failing_guilds: HashSet<GuildId>,
    messages: HashSet<(ChannelId, MessageId)>,
    fail_message_lookups: bool,
    fail_sends: bool,
    next_id: AtomicU64,
    sent: Mutex<Vec<Sent>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guild(mut self, guild: &str) -> Self {
        let guild = GuildId::new(guild);
        if !self.guilds.contains(&guild) {
            self.guilds.push(guild);
        }
        self
    }

    pub fn with_failing_guild(mut self, guild: &str) -> Self {
        self.failing_guilds.insert(GuildId::new(guild));
        self.with_guild(guild)
    }

    pub fn with_member(mut self, guild: &str, user: &str, roles: &[&str]) -> Self {
        self.members.insert((GuildId::new(guild), UserId::new(user)), Member {
            display_name: format!("{user}-nick"),
            avatar_url: Some(format!("https://cdn/avatars/{user}.png")),
            roles: roles.iter().map(|r| RoleId::new(*r)).collect(),
        });
        self.with_guild(guild)
    }

    pub fn with_message(mut self, channel: &str, message: &str) -> Self {
        self.messages
            .insert((ChannelId::new(channel), MessageId::new(message)));
        self
    }

    pub fn with_failing_message_lookups(mut self) -> Self {
        self.fail_message_lookups = true;
        self
    }

    pub fn with_failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, sent: Sent) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sent);
    }

    fn allocate_id(&self) -> MessageId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        MessageId::new(format!("sent-{n}"))
    }

    fn check_send(&self) -> Result<()> {
        if self.fail_sends {
            return Err(Error::message("send rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl RelayPlatform for FakePlatform {
    async fn guild_ids(&self) -> Vec<GuildId> {
        self.guilds.clone()
    }

    async fn fetch_member(&self, guild: &GuildId, user: &UserId) -> Result<Option<Member>> {
        if self.failing_guilds.contains(guild) {
            return Err(Error::message("member lookup failed"));
        }
        Ok(self.members.get(&(guild.clone(), user.clone())).cloned())
    }

    async fn message_exists(&self, channel: &ChannelId, message: &MessageId) -> Result<bool> {
        if self.fail_message_lookups {
            return Err(Error::message("message lookup failed"));
        }
        Ok(self.messages.contains(&(channel.clone(), message.clone())))
    }

    async fn send_text(&self, channel: &ChannelId, content: &str) -> Result<MessageId> {
        self.check_send()?;
        self.push(Sent::Text {
            channel: channel.clone(),
            content: content.to_string(),
        });
        Ok(self.allocate_id())
    }

    async fn send_embed(&self, channel: &ChannelId, embed: &RelayEmbed) -> Result<MessageId> {
        self.check_send()?;
        let id = self.allocate_id();
        self.push(Sent::Embed {
            channel: channel.clone(),
            embed: embed.clone(),
            id: id.clone(),
        });
        Ok(id)
    }

    async fn reply_embed(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        embed: &RelayEmbed,
    ) -> Result<MessageId> {
        self.check_send()?;
        self.push(Sent::Reply {
            channel: channel.clone(),
            message: message.clone(),
            embed: embed.clone(),
        });
        Ok(self.allocate_id())
    }
}

/// In-memory store whose writes can be made to fail part-way through a test.
#[derive(Default)]
pub struct SwitchableStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl SwitchableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

impl ConfigStore for SwitchableStore {
    fn read(&self, key: StoreKey) -> Result<Option<serde_json::Value>> {
        self.inner.read(key)
    }

    fn write(&self, key: StoreKey, value: &serde_json::Value) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "disk full").into(),
            );
        }
        self.inner.write(key, value)
    }
}
