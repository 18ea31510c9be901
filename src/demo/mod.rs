//! Scripted end-to-end run: one page, the monitor, the relay, and a user
//! who clicks every notification.

mod page;
mod scenario;

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};

use tabwatch_core::config::{DemoScenario, Settings};
use tabwatch_core::monitor::{ObservationState, SessionRunner};
use tabwatch_core::page::Favicon;
use tabwatch_core::relay::{
    MemoryPlatform, NotificationId, NotificationRelay, PlatformEvent, RelayClient, RelayService,
    TabId,
};

use page::ScriptedPage;
use scenario::TimelineEvent;

const TAB_ID: TabId = 1;
const WINDOW_ID: i64 = 1;

/// How long the simulated user takes to click a notification
const USER_CLICK_DELAY: Duration = Duration::from_secs(1);

/// Extra wait for the retry click beyond the configured countdown
const CLICK_GRACE: Duration = Duration::from_secs(10);

/// What happened during a demo run
#[derive(Debug)]
pub struct DemoReport {
    /// Page state when the run ended
    pub state: ObservationState,
    /// Text of every notification raised
    pub notifications: Vec<String>,
    /// Retry control clicks
    pub clicks: u32,
    /// Tab focused by a notification click
    pub focused_tab: Option<TabId>,
    pub favicons: Vec<Favicon>,
    pub banners_shown: u32,
}

/// Play `kind` against a monitored page
pub async fn run(settings: &Settings, kind: DemoScenario, hidden: bool) -> Result<DemoReport> {
    let script = scenario::script(kind);
    tracing::info!(scenario = ?kind, hidden, alert = %settings.alert_option, "Starting demo");

    let platform = MemoryPlatform::new();
    let page_events = platform.open_tab(TAB_ID, WINDOW_ID);
    let created = platform.subscribe_created();

    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (platform_tx, platform_rx) = mpsc::unbounded_channel();
    let relay = RelayService::new(
        NotificationRelay::new(platform.clone(), settings.notification.clone()),
        request_rx,
        platform_rx,
    )
    .start();

    let page = ScriptedPage::new(
        "Chat",
        "https://chat.example/c/demo",
        script.on_click,
        hidden,
    );
    let mut clicks = page.subscribe_clicks();
    let (stop_tx, stop_rx) = oneshot::channel();
    let user = tokio::spawn(simulate_user(
        created,
        platform.clone(),
        platform_tx,
        page.clone(),
        stop_rx,
    ));

    let (mutation_tx, mutation_rx) = mpsc::channel(32);
    let runner = SessionRunner::new(
        page.clone(),
        page.clone(),
        settings,
        RelayClient::new(Some(TAB_ID), request_tx),
        mutation_rx,
        page_events,
    )
    .start();

    play(&page, &mutation_tx, &script.opening).await?;

    if !script.after_click.is_empty() {
        let wait = Duration::from_secs(settings.retry.max_delay_secs) + CLICK_GRACE;
        tokio::time::timeout(wait, clicks.recv())
            .await
            .context("Timed out waiting for the retry click")?
            .context("Page closed before the retry click")?;
        // The click itself changed the page
        mutation_tx.send(()).await?;
        play(&page, &mutation_tx, &script.after_click).await?;
    }

    tokio::time::sleep(script.linger).await;
    drop(mutation_tx);

    let session = runner.await.context("Monitor task failed")?;
    let state = session.state();
    drop(session);

    let relay = relay.await.context("Relay task failed")?;
    let _ = stop_tx.send(());
    let notifications = user.await.context("User task failed")?;

    Ok(DemoReport {
        state,
        notifications,
        clicks: page.clicks(),
        focused_tab: relay.platform().active_tab(),
        favicons: page.favicons(),
        banners_shown: page.banners_shown(),
    })
}

/// Apply timeline events at their offsets, signalling a mutation after each
async fn play(
    page: &ScriptedPage,
    mutation_tx: &mpsc::Sender<()>,
    events: &[TimelineEvent],
) -> Result<()> {
    let start = tokio::time::Instant::now();
    for event in events {
        tokio::time::sleep_until(start + event.at).await;
        page.apply(event.change);
        mutation_tx.send(()).await?;
    }
    Ok(())
}

/// Click every notification shortly after it appears and bring the tab forward
async fn simulate_user(
    mut created: mpsc::UnboundedReceiver<NotificationId>,
    platform: MemoryPlatform,
    platform_tx: mpsc::UnboundedSender<PlatformEvent>,
    page: ScriptedPage,
    mut stop: oneshot::Receiver<()>,
) -> Vec<String> {
    let mut seen = Vec::new();
    loop {
        tokio::select! {
            _ = &mut stop => break,
            Some(id) = created.recv() => {
                let message = platform
                    .shown()
                    .into_iter()
                    .find(|(shown, _)| *shown == id)
                    .map(|(_, spec)| spec.message)
                    .unwrap_or_default();
                tracing::info!(notification = %id, "Notification: {}", message.replace('\n', " | "));
                seen.push(message);

                tokio::time::sleep(USER_CLICK_DELAY).await;
                page.set_hidden(false);
                if platform_tx.send(PlatformEvent::Clicked(id)).is_err() {
                    break;
                }
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabwatch_core::config::AlertOption;

    fn demo_settings(alert: AlertOption) -> Settings {
        let mut settings = Settings::default();
        settings.alert_option = alert;
        settings.retry.min_delay_secs = 2;
        settings.retry.max_delay_secs = 2;
        settings
    }

    #[tokio::test(start_paused = true)]
    async fn test_simple_demo_notifies_and_focuses() {
        let report = run(&demo_settings(AlertOption::Always), DemoScenario::Simple, false)
            .await
            .unwrap();

        assert_eq!(report.notifications.len(), 1);
        assert!(!report.notifications[0].contains("saved you"));
        assert_eq!(report.focused_tab, Some(TAB_ID));
        assert_eq!(report.clicks, 0);
        // The notification click resets the page
        assert_eq!(report.state, ObservationState::Idle);
        assert_eq!(report.favicons.last(), Some(&Favicon::Default));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_demo_counts_saved_click() {
        let report = run(&demo_settings(AlertOption::Retry), DemoScenario::Retry, true)
            .await
            .unwrap();

        assert_eq!(report.clicks, 1);
        assert_eq!(report.notifications.len(), 1);
        assert!(report.notifications[0].contains("saved you: ~1 clicks"));
        assert!(report.favicons.contains(&Favicon::Gray));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_demo_shows_banner_then_recovers() {
        let report = run(&demo_settings(AlertOption::Always), DemoScenario::Blocked, false)
            .await
            .unwrap();

        assert_eq!(report.banners_shown, 1);
        assert_eq!(report.notifications.len(), 1);
        assert!(report.clicks >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_demo_stays_quiet_in_foreground() {
        let report = run(&demo_settings(AlertOption::Inactive), DemoScenario::Simple, false)
            .await
            .unwrap();

        assert!(report.notifications.is_empty());
        assert_eq!(report.focused_tab, None);
        assert_eq!(report.state, ObservationState::Complete);
        assert_eq!(report.favicons.last(), Some(&Favicon::Green));
    }
}
