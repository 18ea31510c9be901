//! Notification relay: the single owner of notification → tab bookkeeping.

mod memory;
mod platform;
mod protocol;
mod service;
mod table;

pub use memory::MemoryPlatform;
pub use platform::{NotificationPlatform, NotificationSpec, PlatformError, TabInfo};
pub use protocol::{
    NotificationId, PageEvent, PlatformEvent, RelayClient, RelayEnvelope, RelayRequest, TabId,
    WindowId,
};
pub use service::{ClickOutcome, NotificationRelay, RelayService};
pub use table::{NotificationTable, PendingNotification};
