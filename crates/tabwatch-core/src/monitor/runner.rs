use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Settings;
use crate::page::{PageLocator, PageSurface};
use crate::relay::{PageEvent, RelayClient};

use super::session::PageSession;

/// Drives a [`PageSession`] from page signals.
///
/// Each `()` on the mutation channel stands for one batch of document
/// changes; bursts are coalesced into a single evaluation. The runner stops
/// when the mutation channel closes (the page went away) and hands the
/// session back.
pub struct SessionRunner<L, S> {
    session: PageSession<L, S>,
    relay: RelayClient,
    tick_interval: Duration,
    mutations: mpsc::Receiver<()>,
    events: mpsc::UnboundedReceiver<PageEvent>,
}

impl<L, S> SessionRunner<L, S>
where
    L: PageLocator + Send + 'static,
    S: PageSurface + Send + 'static,
{
    pub fn new(
        locator: L,
        surface: S,
        settings: &Settings,
        relay: RelayClient,
        mutations: mpsc::Receiver<()>,
        events: mpsc::UnboundedReceiver<PageEvent>,
    ) -> Self {
        Self {
            session: PageSession::new(locator, surface, settings, relay.clone()),
            relay,
            tick_interval: settings.monitor.tick_interval(),
            mutations,
            events,
        }
    }

    /// Spawn the loop on the current runtime
    pub fn start(self) -> JoinHandle<PageSession<L, S>> {
        tokio::spawn(self.run())
    }

    /// Run until the page stops sending mutation signals
    pub async fn run(mut self) -> PageSession<L, S> {
        let tab_id = self.relay.current_tab_id().await;
        match tab_id {
            Some(tab_id) => tracing::debug!(tab_id, "Page registered with relay"),
            None => tracing::warn!("Relay did not report a tab id"),
        }
        self.session.set_tab_id(tab_id);

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                signal = self.mutations.recv() => {
                    if signal.is_none() {
                        break;
                    }
                    while self.mutations.try_recv().is_ok() {}
                    self.session.on_mutation(now());
                }
                Some(event) = self.events.recv() => match event {
                    PageEvent::ResetNotificationState => self.session.reset_notification_state(),
                },
                _ = ticker.tick() => self.session.tick(now()),
            }
        }

        tracing::debug!(state = %self.session.state(), "Page session stopped");
        self.session
    }
}

/// Wall clock that follows tokio's (pausable) time
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
