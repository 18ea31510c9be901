//! Messages exchanged between pages, the relay, and the notification platform.
//!
//! Pages and the relay never share memory: every interaction is a message on
//! a channel. The page-facing messages serialize to the extension wire format
//! (`{"action": "showNotification", ...}`).

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Browser tab identifier
pub type TabId = i64;

/// Browser window identifier
pub type WindowId = i64;

/// Identifier of a platform notification
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Request from a page to the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RelayRequest {
    /// Ask which tab the page is running in
    GetCurrentTabId,
    /// Raise a completion notification for `tab_id`
    #[serde(rename_all = "camelCase")]
    ShowNotification { message: String, tab_id: TabId },
}

/// Event delivered from the relay to a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageEvent {
    /// Drop all indicators and return to idle
    ResetNotificationState,
}

/// Event raised by the notification platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The user clicked a notification
    Clicked(NotificationId),
    /// A notification was dismissed or cleared
    Closed(NotificationId),
    /// A tab was closed
    TabRemoved(TabId),
}

/// A page request together with its origin
#[derive(Debug)]
pub struct RelayEnvelope {
    /// Tab the request came from, as reported by the host
    pub sender: Option<TabId>,
    pub request: RelayRequest,
    /// Reply slot for requests that expect an answer
    pub reply: Option<oneshot::Sender<Option<TabId>>>,
}

/// Page-side handle to the relay
#[derive(Debug, Clone)]
pub struct RelayClient {
    sender: Option<TabId>,
    tx: mpsc::UnboundedSender<RelayEnvelope>,
}

impl RelayClient {
    /// Create a handle for a page running in tab `sender`
    pub fn new(sender: Option<TabId>, tx: mpsc::UnboundedSender<RelayEnvelope>) -> Self {
        Self { sender, tx }
    }

    /// Fire-and-forget notification request. Returns `false` if the relay is gone.
    pub fn request_notification(&self, message: String, tab_id: TabId) -> bool {
        self.tx
            .send(RelayEnvelope {
                sender: self.sender,
                request: RelayRequest::ShowNotification { message, tab_id },
                reply: None,
            })
            .is_ok()
    }

    /// Ask the relay for this page's tab id
    pub async fn current_tab_id(&self) -> Option<TabId> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RelayEnvelope {
                sender: self.sender,
                request: RelayRequest::GetCurrentTabId,
                reply: Some(reply_tx),
            })
            .ok()?;
        reply_rx.await.ok().flatten()
    }
}
