use thiserror::Error;

use super::protocol::{NotificationId, PageEvent, TabId, WindowId};

/// Errors reported by the notification platform
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The platform refused to create or clear a notification
    #[error("notification rejected: {0}")]
    Rejected(String),

    /// The tab no longer exists
    #[error("tab {0} not found")]
    TabGone(TabId),

    /// The window no longer exists
    #[error("window {0} not found")]
    WindowGone(WindowId),

    /// The tab exists but its page did not accept the message
    #[error("tab {0} did not receive the message")]
    Unreachable(TabId),
}

/// What the relay asks the platform to display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSpec {
    pub title: String,
    pub message: String,
    /// Keep the notification on screen until the user acts on it
    pub require_interaction: bool,
}

/// Tab details needed to focus it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabInfo {
    pub tab_id: TabId,
    pub window_id: WindowId,
}

/// Host notification/tab/window API as seen by the relay
pub trait NotificationPlatform: Send {
    fn create_notification(
        &mut self,
        id: &NotificationId,
        spec: &NotificationSpec,
    ) -> Result<(), PlatformError>;

    fn clear_notification(&mut self, id: &NotificationId) -> Result<(), PlatformError>;

    /// Look up a tab; `None` when it is gone
    fn tab(&self, tab_id: TabId) -> Option<TabInfo>;

    fn window_exists(&self, window_id: WindowId) -> bool;

    fn activate_tab(&mut self, tab_id: TabId) -> Result<(), PlatformError>;

    fn focus_window(&mut self, window_id: WindowId) -> Result<(), PlatformError>;

    /// Deliver an event to the page running in `tab_id`
    fn send_to_tab(&mut self, tab_id: TabId, event: PageEvent) -> Result<(), PlatformError>;
}
