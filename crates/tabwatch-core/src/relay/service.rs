use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::NotificationSettings;

use super::platform::{NotificationPlatform, NotificationSpec};
use super::protocol::{NotificationId, PageEvent, PlatformEvent, RelayEnvelope, RelayRequest, TabId};
use super::table::NotificationTable;

/// Result of handling a notification click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Tab activated, window focused, page reset
    Focused { tab_id: TabId },
    /// The id was not (or no longer) tracked
    Unknown,
    /// The tab was closed before the click; entry dropped
    TabGone,
    /// The tab's window was closed before the click; entry dropped
    WindowGone,
    /// The platform refused to activate the tab; entry dropped
    ActivationFailed,
}

/// Owns the notification table and reacts to page requests and platform events
pub struct NotificationRelay<P> {
    platform: P,
    table: NotificationTable,
    settings: NotificationSettings,
}

impl<P: NotificationPlatform> NotificationRelay<P> {
    pub fn new(platform: P, settings: NotificationSettings) -> Self {
        Self {
            platform,
            table: NotificationTable::new(),
            settings,
        }
    }

    pub fn table(&self) -> &NotificationTable {
        &self.table
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Dispatch one page request
    pub fn handle_request(&mut self, envelope: RelayEnvelope) {
        match envelope.request {
            RelayRequest::GetCurrentTabId => {
                let tab_id = self.current_tab_id(envelope.sender);
                if let Some(reply) = envelope.reply {
                    // The page may have gone away; nothing to do then
                    let _ = reply.send(tab_id);
                }
            }
            RelayRequest::ShowNotification { message, tab_id } => {
                self.show_notification(&message, tab_id);
            }
        }
    }

    /// Answer a page's tab-id handshake with the tab the host says it came from
    pub fn current_tab_id(&self, sender: Option<TabId>) -> Option<TabId> {
        match sender {
            Some(tab_id) if self.platform.tab(tab_id).is_some() => Some(tab_id),
            Some(tab_id) => {
                tracing::warn!(tab_id, "Tab id requested by a tab the platform does not know");
                None
            }
            None => {
                tracing::warn!("Tab id requested by a sender without a tab");
                None
            }
        }
    }

    /// Dispatch one platform event
    pub fn handle_platform_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::Clicked(id) => {
                self.on_clicked(&id);
            }
            PlatformEvent::Closed(id) => {
                self.on_closed(&id);
            }
            PlatformEvent::TabRemoved(tab_id) => {
                self.on_tab_removed(tab_id);
            }
        }
    }

    /// Create a platform notification pointing at `tab_id`
    pub fn show_notification(&mut self, message: &str, tab_id: TabId) -> Option<NotificationId> {
        if tab_id <= 0 {
            tracing::error!(tab_id, "Invalid tab id in notification request");
            return None;
        }

        let id = NotificationId(format!(
            "{}-{}-{}",
            self.settings.id_prefix,
            Uuid::new_v4().simple(),
            tab_id
        ));
        let spec = NotificationSpec {
            title: self.settings.title.clone(),
            message: message.to_string(),
            require_interaction: true,
        };

        if let Err(e) = self.platform.create_notification(&id, &spec) {
            tracing::error!(error = %e, tab_id, "Notification creation failed");
            return None;
        }

        tracing::info!(notification = %id, tab_id, "Notification shown");
        self.table.insert(id.clone(), tab_id);
        Some(id)
    }

    /// Focus the notification's tab and reset its page
    pub fn on_clicked(&mut self, id: &NotificationId) -> ClickOutcome {
        let (tab_id, age) = match self.table.get(id) {
            Some(pending) => (pending.tab_id, pending.age()),
            None => {
                tracing::warn!(notification = %id, "Click on untracked notification");
                return ClickOutcome::Unknown;
            }
        };
        tracing::debug!(
            notification = %id,
            tab_id,
            age_secs = age.num_seconds(),
            "Notification clicked"
        );

        let tab = match self.platform.tab(tab_id) {
            Some(tab) => tab,
            None => {
                tracing::warn!(notification = %id, tab_id, "Clicked notification's tab no longer exists");
                self.discard(id);
                return ClickOutcome::TabGone;
            }
        };

        if !self.platform.window_exists(tab.window_id) {
            tracing::warn!(notification = %id, window_id = tab.window_id, "Clicked notification's window no longer exists");
            self.discard(id);
            return ClickOutcome::WindowGone;
        }

        if let Err(e) = self.platform.activate_tab(tab_id) {
            tracing::error!(error = %e, tab_id, "Failed to activate tab");
            self.discard(id);
            return ClickOutcome::ActivationFailed;
        }

        if let Err(e) = self.platform.focus_window(tab.window_id) {
            tracing::warn!(error = %e, window_id = tab.window_id, "Failed to focus window");
        }

        self.discard(id);

        if let Err(e) = self
            .platform
            .send_to_tab(tab_id, PageEvent::ResetNotificationState)
        {
            tracing::warn!(error = %e, tab_id, "Reset message not delivered");
        }

        tracing::info!(notification = %id, tab_id, "Focused tab from notification");
        ClickOutcome::Focused { tab_id }
    }

    /// Reset the page of a dismissed notification. Returns whether it was tracked.
    pub fn on_closed(&mut self, id: &NotificationId) -> bool {
        let Some(pending) = self.table.remove(id) else {
            return false;
        };
        tracing::info!(
            notification = %id,
            tab_id = pending.tab_id,
            age_secs = pending.age().num_seconds(),
            "Notification dismissed"
        );

        if let Err(e) = self
            .platform
            .send_to_tab(pending.tab_id, PageEvent::ResetNotificationState)
        {
            tracing::warn!(error = %e, tab_id = pending.tab_id, "Reset message not delivered");
        }
        true
    }

    /// Drop every notification of a closed tab. Returns how many were removed.
    pub fn on_tab_removed(&mut self, tab_id: TabId) -> usize {
        let removed = self.table.remove_for_tab(tab_id);
        for id in &removed {
            if let Err(e) = self.platform.clear_notification(id) {
                tracing::warn!(error = %e, notification = %id, "Failed to clear notification");
            }
            tracing::info!(notification = %id, tab_id, "Cleared notification for closed tab");
        }
        removed.len()
    }

    fn discard(&mut self, id: &NotificationId) {
        self.table.remove(id);
        if let Err(e) = self.platform.clear_notification(id) {
            tracing::warn!(error = %e, notification = %id, "Failed to clear notification");
        }
    }
}

/// Runs a [`NotificationRelay`] as its own task
pub struct RelayService<P> {
    relay: NotificationRelay<P>,
    requests: mpsc::UnboundedReceiver<RelayEnvelope>,
    events: mpsc::UnboundedReceiver<PlatformEvent>,
}

impl<P: NotificationPlatform + 'static> RelayService<P> {
    pub fn new(
        relay: NotificationRelay<P>,
        requests: mpsc::UnboundedReceiver<RelayEnvelope>,
        events: mpsc::UnboundedReceiver<PlatformEvent>,
    ) -> Self {
        Self {
            relay,
            requests,
            events,
        }
    }

    /// Start in a background task; the relay is handed back once all page handles are dropped
    pub fn start(self) -> tokio::task::JoinHandle<NotificationRelay<P>> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(mut self) -> NotificationRelay<P> {
        tracing::debug!("Relay service started");
        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(envelope) => self.relay.handle_request(envelope),
                    None => break,
                },
                Some(event) = self.events.recv() => {
                    self.relay.handle_platform_event(event);
                }
            }
        }
        tracing::debug!("Relay service stopped (no pages left)");
        self.relay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{MemoryPlatform, RelayClient};
    use pretty_assertions::assert_eq;

    fn relay_with_tab(
        tab_id: TabId,
        window_id: i64,
    ) -> (
        NotificationRelay<MemoryPlatform>,
        MemoryPlatform,
        mpsc::UnboundedReceiver<PageEvent>,
    ) {
        let platform = MemoryPlatform::new();
        let page_rx = platform.open_tab(tab_id, window_id);
        let relay = NotificationRelay::new(platform.clone(), NotificationSettings::default());
        (relay, platform, page_rx)
    }

    #[test]
    fn test_show_notification_tracks_entry() {
        let (mut relay, platform, _rx) = relay_with_tab(5, 1);

        let id = relay.show_notification("Done", 5).unwrap();
        assert!(id.as_str().starts_with("tabwatch-notification-"));
        assert!(id.as_str().ends_with("-5"));
        assert_eq!(relay.table().get(&id).map(|p| p.tab_id), Some(5));

        let shown = platform.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].1.title, "Tab Watch");
        assert_eq!(shown[0].1.message, "Done");
        assert!(shown[0].1.require_interaction);
    }

    #[test]
    fn test_show_notification_rejected_by_platform() {
        let (mut relay, platform, _rx) = relay_with_tab(5, 1);
        platform.reject_notifications(true);

        assert!(relay.show_notification("Done", 5).is_none());
        assert!(relay.table().is_empty());
    }

    #[test]
    fn test_show_notification_invalid_tab() {
        let (mut relay, platform, _rx) = relay_with_tab(5, 1);
        assert!(relay.show_notification("Done", 0).is_none());
        assert!(relay.show_notification("Done", -3).is_none());
        assert!(platform.shown().is_empty());
    }

    #[test]
    fn test_click_focuses_and_resets() {
        let (mut relay, platform, mut page_rx) = relay_with_tab(5, 2);
        let id = relay.show_notification("Done", 5).unwrap();

        assert_eq!(relay.on_clicked(&id), ClickOutcome::Focused { tab_id: 5 });
        assert_eq!(platform.active_tab(), Some(5));
        assert_eq!(platform.focused_window(), Some(2));
        assert!(platform.shown().is_empty());
        assert!(relay.table().is_empty());
        assert_eq!(page_rx.try_recv().unwrap(), PageEvent::ResetNotificationState);
    }

    #[test]
    fn test_click_with_closed_tab_drops_entry_without_focus() {
        let (mut relay, platform, _rx) = relay_with_tab(5, 2);
        let id = relay.show_notification("Done", 5).unwrap();
        platform.close_tab(5);

        assert_eq!(relay.on_clicked(&id), ClickOutcome::TabGone);
        assert!(relay.table().is_empty());
        assert_eq!(platform.active_tab(), None);
        assert_eq!(platform.focused_window(), None);
        assert!(platform.shown().is_empty());
    }

    #[test]
    fn test_click_with_closed_window() {
        let (mut relay, platform, _rx) = relay_with_tab(5, 2);
        let id = relay.show_notification("Done", 5).unwrap();
        platform.close_window(2);

        assert_eq!(relay.on_clicked(&id), ClickOutcome::WindowGone);
        assert!(relay.table().is_empty());
        assert_eq!(platform.active_tab(), None);
    }

    #[test]
    fn test_click_activation_failure_drops_entry() {
        let (mut relay, platform, mut page_rx) = relay_with_tab(5, 2);
        let id = relay.show_notification("Done", 5).unwrap();
        platform.fail_activation(true);

        assert_eq!(relay.on_clicked(&id), ClickOutcome::ActivationFailed);
        assert!(relay.table().is_empty());
        assert!(page_rx.try_recv().is_err());
    }

    #[test]
    fn test_click_unknown_notification() {
        let (mut relay, _platform, _rx) = relay_with_tab(5, 2);
        assert_eq!(
            relay.on_clicked(&NotificationId::from("nope")),
            ClickOutcome::Unknown
        );
    }

    #[test]
    fn test_closed_sends_reset() {
        let (mut relay, _platform, mut page_rx) = relay_with_tab(5, 2);
        let id = relay.show_notification("Done", 5).unwrap();

        assert!(relay.on_closed(&id));
        assert!(relay.table().is_empty());
        assert_eq!(page_rx.try_recv().unwrap(), PageEvent::ResetNotificationState);

        // A second close (e.g. after a click cleared it) is a no-op
        assert!(!relay.on_closed(&id));
    }

    #[test]
    fn test_tab_removed_clears_its_notifications() {
        let platform = MemoryPlatform::new();
        let _a = platform.open_tab(1, 1);
        let _b = platform.open_tab(2, 1);
        let mut relay = NotificationRelay::new(platform.clone(), NotificationSettings::default());

        relay.show_notification("first", 1).unwrap();
        relay.show_notification("second", 1).unwrap();
        let keep = relay.show_notification("other", 2).unwrap();

        platform.close_tab(1);
        relay.handle_platform_event(PlatformEvent::TabRemoved(1));

        assert_eq!(relay.table().len(), 1);
        assert!(relay.table().get(&keep).is_some());
        let shown: Vec<_> = platform.shown().into_iter().map(|(id, _)| id).collect();
        assert_eq!(shown, vec![keep]);
    }

    #[test]
    fn test_current_tab_id_requires_known_tab() {
        let (relay, platform, _rx) = relay_with_tab(4, 1);
        assert_eq!(relay.current_tab_id(Some(4)), Some(4));
        assert_eq!(relay.current_tab_id(Some(8)), None);
        assert_eq!(relay.current_tab_id(None), None);

        platform.close_tab(4);
        assert_eq!(relay.current_tab_id(Some(4)), None);
    }

    #[tokio::test]
    async fn test_service_round_trip() {
        let platform = MemoryPlatform::new();
        let _page_rx = platform.open_tab(9, 1);
        let mut created = platform.subscribe_created();
        let relay = NotificationRelay::new(platform.clone(), NotificationSettings::default());

        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let handle = RelayService::new(relay, req_rx, event_rx).start();

        let client = RelayClient::new(Some(9), req_tx);
        assert_eq!(client.current_tab_id().await, Some(9));
        assert!(client.request_notification("Done".to_string(), 9));

        let id = created.recv().await.unwrap();
        assert!(platform.shown().iter().any(|(shown, _)| shown == &id));

        platform.close_tab(9);
        event_tx.send(PlatformEvent::TabRemoved(9)).unwrap();
        for _ in 0..100 {
            if platform.shown().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(platform.shown().is_empty());

        drop(client);
        let relay = handle.await.unwrap();
        assert!(relay.table().is_empty());
    }
}
