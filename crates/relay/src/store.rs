//! Durable key-value storage for the three bot records.
//!
//! Each record lives under its own key and is always rewritten whole. A
//! missing or unreadable record loads as its default.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::RwLock,
};

use {
    serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned},
    tracing::{debug, warn},
};

use crate::{
    Result,
    ids::{ChannelId, RoleId, UserId},
};

/// Independent storage keys, one per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Blacklist,
    Channels,
    ManageRole,
}

impl StoreKey {
    /// File name used by [`JsonFileStore`].
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Blacklist => "blacklistedUsers.json",
            Self::Channels => "channels.json",
            Self::ManageRole => "manageRole.json",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Raw record storage.
///
/// `read` returns `Ok(None)` when nothing has been saved under `key`.
pub trait ConfigStore: Send + Sync {
    fn read(&self, key: StoreKey) -> Result<Option<serde_json::Value>>;
    fn write(&self, key: StoreKey, value: &serde_json::Value) -> Result<()>;
}

/// A typed record bound to its storage key.
pub trait Record: Default + Serialize + DeserializeOwned {
    const KEY: StoreKey;
}

/// Load a record, falling back to its default when absent or corrupt.
pub fn load<T: Record>(store: &dyn ConfigStore) -> T {
    let value = match store.read(T::KEY) {
        Ok(Some(value)) => value,
        Ok(None) => {
            debug!(key = %T::KEY, "record not found, using default");
            return T::default();
        },
        Err(e) => {
            warn!(key = %T::KEY, error = %e, "failed to read record, using default");
            return T::default();
        },
    };
    match serde_json::from_value(value) {
        Ok(record) => record,
        Err(e) => {
            warn!(key = %T::KEY, error = %e, "corrupt record, using default");
            T::default()
        },
    }
}

/// Persist a record, overwriting whatever was stored under its key.
pub fn save<T: Record>(store: &dyn ConfigStore, record: &T) -> Result<()> {
    let value = serde_json::to_value(record)?;
    store.write(T::KEY, &value)
}

// ── Records ─────────────────────────────────────────────────────────────────

/// Users whose messages are never relayed. Holds no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<UserId>", into = "Vec<UserId>")]
pub struct Blacklist(Vec<UserId>);

impl Blacklist {
    pub fn contains(&self, user: &UserId) -> bool {
        self.0.contains(user)
    }

    /// Returns `false` when the user was already present.
    pub fn insert(&mut self, user: UserId) -> bool {
        if self.contains(&user) {
            return false;
        }
        self.0.push(user);
        true
    }

    /// Returns `false` when the user was not present.
    pub fn remove(&mut self, user: &UserId) -> bool {
        let before = self.0.len();
        self.0.retain(|u| u != user);
        self.0.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.0.iter()
    }
}

impl From<Vec<UserId>> for Blacklist {
    fn from(users: Vec<UserId>) -> Self {
        let mut list = Self::default();
        for user in users {
            list.insert(user);
        }
        list
    }
}

impl From<Blacklist> for Vec<UserId> {
    fn from(list: Blacklist) -> Self {
        list.0
    }
}

impl Record for Blacklist {
    const KEY: StoreKey = StoreKey::Blacklist;
}

/// Host (source) and recipient (destination) channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelPair {
    #[serde(with = "empty_as_none")]
    pub source_channel: Option<ChannelId>,
    #[serde(with = "empty_as_none")]
    pub destination_channel: Option<ChannelId>,
}

impl ChannelPair {
    /// Both ends, or `None` while relay is inactive.
    pub fn complete(&self) -> Option<(&ChannelId, &ChannelId)> {
        Some((
            self.source_channel.as_ref()?,
            self.destination_channel.as_ref()?,
        ))
    }
}

impl Record for ChannelPair {
    const KEY: StoreKey = StoreKey::Channels;
}

/// The single role allowed to run administrative commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManageRole {
    #[serde(with = "empty_as_none")]
    pub role_id: Option<RoleId>,
}

impl Record for ManageRole {
    const KEY: StoreKey = StoreKey::ManageRole;
}

/// Stored files use `""` for an unset id.
mod empty_as_none {
    use super::*;

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<str>,
    {
        serializer.serialize_str(value.as_ref().map_or("", AsRef::as_ref))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: From<String>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.trim().is_empty()).map(T::from))
    }
}

// ── Backends ────────────────────────────────────────────────────────────────

/// One pretty-printed JSON file per record inside a directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: StoreKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl ConfigStore for JsonFileStore {
    fn read(&self, key: StoreKey) -> Result<Option<serde_json::Value>> {
        let path = self.path(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write(&self, key: StoreKey, value: &serde_json::Value) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
        std::fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "saved record");
        Ok(())
    }
}

/// Process-local store, used by tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<StoreKey, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self, key: StoreKey) -> Result<Option<serde_json::Value>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(&key).cloned())
    }

    fn write(&self, key: StoreKey, value: &serde_json::Value) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert(key, value.clone());
        Ok(())
    }
}
