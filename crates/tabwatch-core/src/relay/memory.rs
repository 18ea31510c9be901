//! In-process notification platform.
//!
//! Keeps tabs, windows and displayed notifications in memory and routes
//! page events over per-tab channels. Used by the demo driver and by tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::platform::{NotificationPlatform, NotificationSpec, PlatformError, TabInfo};
use super::protocol::{NotificationId, PageEvent, TabId, WindowId};

#[derive(Debug, Default)]
struct Inner {
    tabs: HashMap<TabId, WindowId>,
    windows: HashSet<WindowId>,
    routes: HashMap<TabId, mpsc::UnboundedSender<PageEvent>>,
    shown: BTreeMap<NotificationId, NotificationSpec>,
    active_tab: Option<TabId>,
    focused_window: Option<WindowId>,
    reject_notifications: bool,
    fail_activation: bool,
    created_tx: Option<mpsc::UnboundedSender<NotificationId>>,
}

/// Shared in-memory platform; clones observe the same state
#[derive(Debug, Clone, Default)]
pub struct MemoryPlatform {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a tab in `window_id`, creating the window if needed.
    ///
    /// Returns the receiver for events addressed to the tab's page.
    pub fn open_tab(&self, tab_id: TabId, window_id: WindowId) -> mpsc::UnboundedReceiver<PageEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        inner.windows.insert(window_id);
        inner.tabs.insert(tab_id, window_id);
        inner.routes.insert(tab_id, tx);
        rx
    }

    /// Close a tab (the relay still has to be told via `PlatformEvent::TabRemoved`)
    pub fn close_tab(&self, tab_id: TabId) {
        let mut inner = self.inner.lock();
        inner.tabs.remove(&tab_id);
        inner.routes.remove(&tab_id);
    }

    pub fn close_window(&self, window_id: WindowId) {
        self.inner.lock().windows.remove(&window_id);
    }

    /// Make every following `create_notification` fail
    pub fn reject_notifications(&self, reject: bool) {
        self.inner.lock().reject_notifications = reject;
    }

    /// Make every following `activate_tab` fail
    pub fn fail_activation(&self, fail: bool) {
        self.inner.lock().fail_activation = fail;
    }

    /// Receive the id of every notification created from now on
    pub fn subscribe_created(&self) -> mpsc::UnboundedReceiver<NotificationId> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().created_tx = Some(tx);
        rx
    }

    /// Notifications currently on screen
    pub fn shown(&self) -> Vec<(NotificationId, NotificationSpec)> {
        self.inner
            .lock()
            .shown
            .iter()
            .map(|(id, spec)| (id.clone(), spec.clone()))
            .collect()
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.inner.lock().active_tab
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.inner.lock().focused_window
    }

}

impl NotificationPlatform for MemoryPlatform {
    fn create_notification(
        &mut self,
        id: &NotificationId,
        spec: &NotificationSpec,
    ) -> Result<(), PlatformError> {
        let mut inner = self.inner.lock();
        if inner.reject_notifications {
            return Err(PlatformError::Rejected("notifications are disabled".to_string()));
        }
        inner.shown.insert(id.clone(), spec.clone());
        if let Some(tx) = &inner.created_tx {
            let _ = tx.send(id.clone());
        }
        Ok(())
    }

    fn clear_notification(&mut self, id: &NotificationId) -> Result<(), PlatformError> {
        self.inner.lock().shown.remove(id);
        Ok(())
    }

    fn tab(&self, tab_id: TabId) -> Option<TabInfo> {
        self.inner
            .lock()
            .tabs
            .get(&tab_id)
            .map(|&window_id| TabInfo { tab_id, window_id })
    }

    fn window_exists(&self, window_id: WindowId) -> bool {
        self.inner.lock().windows.contains(&window_id)
    }

    fn activate_tab(&mut self, tab_id: TabId) -> Result<(), PlatformError> {
        let mut inner = self.inner.lock();
        if inner.fail_activation || !inner.tabs.contains_key(&tab_id) {
            return Err(PlatformError::TabGone(tab_id));
        }
        inner.active_tab = Some(tab_id);
        Ok(())
    }

    fn focus_window(&mut self, window_id: WindowId) -> Result<(), PlatformError> {
        let mut inner = self.inner.lock();
        if !inner.windows.contains(&window_id) {
            return Err(PlatformError::WindowGone(window_id));
        }
        inner.focused_window = Some(window_id);
        Ok(())
    }

    fn send_to_tab(&mut self, tab_id: TabId, event: PageEvent) -> Result<(), PlatformError> {
        let inner = self.inner.lock();
        let sent = inner
            .routes
            .get(&tab_id)
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false);
        if !sent {
            return Err(PlatformError::Unreachable(tab_id));
        }
        Ok(())
    }
}
