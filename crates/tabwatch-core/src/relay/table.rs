use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use super::protocol::{NotificationId, TabId};

/// A notification waiting for the user, and the tab it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    pub tab_id: TabId,
    pub created_at: DateTime<Utc>,
}

impl PendingNotification {
    /// Time the notification has been on screen
    pub fn age(&self) -> TimeDelta {
        Utc::now() - self.created_at
    }
}

/// Owned notification-id → tab-id table.
///
/// Entries are inserted when the platform accepts a notification and removed
/// on click, close, or when their tab goes away.
#[derive(Debug, Default)]
pub struct NotificationTable {
    entries: HashMap<NotificationId, PendingNotification>,
}

impl NotificationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NotificationId, tab_id: TabId) {
        self.entries.insert(
            id,
            PendingNotification {
                tab_id,
                created_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, id: &NotificationId) -> Option<&PendingNotification> {
        self.entries.get(id)
    }

    pub fn remove(&mut self, id: &NotificationId) -> Option<PendingNotification> {
        self.entries.remove(id)
    }

    /// Remove every entry that belongs to `tab_id`, returning the removed ids (sorted)
    pub fn remove_for_tab(&mut self, tab_id: TabId) -> Vec<NotificationId> {
        let mut removed: Vec<NotificationId> = self
            .entries
            .iter()
            .filter(|(_, pending)| pending.tab_id == tab_id)
            .map(|(id, _)| id.clone())
            .collect();
        removed.sort();
        for id in &removed {
            self.entries.remove(id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
