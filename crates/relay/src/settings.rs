//! Owned configuration context shared by the router and the pipeline.

use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::{
    Result,
    ids::{ChannelId, RoleId, UserId},
    store::{self, Blacklist, ChannelPair, ConfigStore, ManageRole, Record},
};

#[derive(Debug, Clone, Default)]
struct Records {
    blacklist: Blacklist,
    channels: ChannelPair,
    manage_role: ManageRole,
}

/// Which side of the relay a channel command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSide {
    Source,
    Destination,
}

/// In-memory view of the persisted records.
///
/// Every mutation is written through to the store before it becomes
/// visible; a failed save leaves the previous value in place. The lock is
/// never held across an `.await`.
pub struct Settings {
    store: Arc<dyn ConfigStore>,
    records: RwLock<Records>,
}

impl Settings {
    /// Load all three records once.
    pub fn load(store: Arc<dyn ConfigStore>) -> Self {
        let records = Records {
            blacklist: store::load(store.as_ref()),
            channels: store::load(store.as_ref()),
            manage_role: store::load(store.as_ref()),
        };
        info!(
            blacklisted = records.blacklist.len(),
            source = ?records.channels.source_channel,
            destination = ?records.channels.destination_channel,
            manage_role = ?records.manage_role.role_id,
            "settings loaded"
        );
        if let Some((src, dst)) = records.channels.complete()
            && src == dst
        {
            warn!(channel_id = %src, "host and recipient channel are the same; only relaying");
        }
        Self {
            store,
            records: RwLock::new(records),
        }
    }

    pub fn blacklist(&self) -> Blacklist {
        self.read(|r| r.blacklist.clone())
    }

    pub fn is_blacklisted(&self, user: &UserId) -> bool {
        self.read(|r| r.blacklist.contains(user))
    }

    pub fn channels(&self) -> ChannelPair {
        self.read(|r| r.channels.clone())
    }

    pub fn manage_role(&self) -> Option<RoleId> {
        self.read(|r| r.manage_role.role_id.clone())
    }

    /// Returns `false` if the user was already blacklisted (nothing saved).
    pub fn add_to_blacklist(&self, user: UserId) -> Result<bool> {
        self.update(|r| &mut r.blacklist, |list| list.insert(user))
    }

    /// Returns `false` if the user was not blacklisted (nothing saved).
    pub fn remove_from_blacklist(&self, user: &UserId) -> Result<bool> {
        self.update(|r| &mut r.blacklist, |list| list.remove(user))
    }

    /// Returns `false`, leaving the pair untouched, when `channel` is
    /// already configured as the other side.
    pub fn set_channel(&self, side: ChannelSide, channel: ChannelId) -> Result<bool> {
        self.update(
            |r| &mut r.channels,
            |pair| {
                let (target, opposite) = match side {
                    ChannelSide::Source => {
                        (&mut pair.source_channel, &pair.destination_channel)
                    },
                    ChannelSide::Destination => {
                        (&mut pair.destination_channel, &pair.source_channel)
                    },
                };
                if opposite.as_ref() == Some(&channel) {
                    return false;
                }
                *target = Some(channel);
                true
            },
        )
    }

    pub fn set_manage_role(&self, role: RoleId) -> Result<()> {
        self.update(
            |r| &mut r.manage_role,
            |record| {
                record.role_id = Some(role);
                true
            },
        )
        .map(|_| ())
    }

    fn read<T>(&self, f: impl FnOnce(&Records) -> T) -> T {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        f(&records)
    }

    /// Apply `change` to a copy of one record, persist it when `change`
    /// reports a modification, then publish it.
    fn update<R: Record + Clone>(
        &self,
        field: impl Fn(&mut Records) -> &mut R,
        change: impl FnOnce(&mut R) -> bool,
    ) -> Result<bool> {
        let mut guard = self.records.write().unwrap_or_else(|e| e.into_inner());
        let records: &mut Records = &mut guard;
        let mut next = field(&mut *records).clone();
        if !change(&mut next) {
            return Ok(false);
        }
        store::save(self.store.as_ref(), &next)?;
        *field(records) = next;
        Ok(true)
    }
}
