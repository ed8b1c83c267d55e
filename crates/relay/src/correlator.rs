//! Maps relayed messages back to the posts they were copied from.

use std::collections::{HashMap, VecDeque};

use crate::ids::{ChannelId, MessageId};

/// Default number of relayed messages remembered.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Where a relayed message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRecord {
    pub destination_message_id: MessageId,
    pub original_message_id: MessageId,
    pub original_channel_id: ChannelId,
}

/// Bounded map keyed by destination message id.
///
/// Once `capacity` entries are held, recording a new one evicts the oldest.
#[derive(Debug)]
pub struct RelayCorrelator {
    records: HashMap<MessageId, RelayRecord>,
    order: VecDeque<MessageId>,
    capacity: usize,
}

impl Default for RelayCorrelator {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RelayCorrelator {
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn record(
        &mut self,
        destination_message_id: MessageId,
        original_message_id: MessageId,
        original_channel_id: ChannelId,
    ) {
        let record = RelayRecord {
            destination_message_id: destination_message_id.clone(),
            original_message_id,
            original_channel_id,
        };
        if self
            .records
            .insert(destination_message_id.clone(), record)
            .is_some()
        {
            return;
        }
        self.order.push_back(destination_message_id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.records.remove(&oldest);
            }
        }
    }

    pub fn resolve(&self, destination_message_id: &MessageId) -> Option<&RelayRecord> {
        self.records.get(destination_message_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
