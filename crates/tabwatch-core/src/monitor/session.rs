//! Per-page state machine.
//!
//! A [`PageSession`] is driven from outside with the current time: once per
//! mutation batch ([`PageSession::on_mutation`]) and on every timer tick
//! ([`PageSession::tick`]). It reads the page only through its
//! [`PageLocator`], writes indicators only through its [`PageSurface`], and
//! talks to the relay only through a [`RelayClient`]. Delayed actions (settle,
//! retry clicks, restart, block check, blink) live in a small deadline list
//! that is drained on each tick, so the whole machine is deterministic for a
//! given sequence of snapshots and instants.

use std::time::{Duration, Instant};

use crate::config::{AlertOption, MonitorSettings, RetrySettings, Settings};
use crate::page::{Favicon, PageLocator, PageSnapshot, PageSurface};
use crate::relay::{RelayClient, TabId};

use super::alert::{format_completion_message, retries_from_counter};
use super::state::{format_seconds, ObservationState, Timer};

/// Title shown on alternate blink frames
const BLINK_TITLE: &str = "🚨 Response Ready! 🚨";

const BLINK_INTERVAL: Duration = Duration::from_secs(1);

/// Delayed actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    /// Read the final content and decide on a notification
    Settle { elapsed: Duration },
    /// Show the done favicon
    Done,
    /// Retry click attempt (1-based)
    ClickAttempt(u32),
    /// Start a new waiting cycle after the last click
    Restart,
    /// Check that loading started after a click
    BlockCheck,
    /// Toggle the attention blink
    Blink,
}

#[derive(Debug, Default)]
struct Schedule {
    pending: Vec<(Instant, Wake)>,
}

impl Schedule {
    fn at(&mut self, when: Instant, wake: Wake) {
        self.pending.push((when, wake));
    }

    fn cancel(&mut self, pred: impl Fn(&Wake) -> bool) {
        self.pending.retain(|(_, wake)| !pred(wake));
    }

    fn clear(&mut self) {
        self.pending.clear();
    }

    /// Remove and return the earliest wake due at `now`
    fn pop_due(&mut self, now: Instant) -> Option<Wake> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (when, _))| *when <= now)
            .min_by_key(|(_, (when, _))| *when)
            .map(|(idx, _)| idx)?;
        Some(self.pending.remove(idx).1)
    }
}

/// Monitor state of one watched page
pub struct PageSession<L, S> {
    locator: L,
    surface: S,
    monitor: MonitorSettings,
    retry: RetrySettings,
    alert_option: AlertOption,
    app_name: String,
    relay: RelayClient,
    tab_id: Option<TabId>,

    state: ObservationState,
    timer: Option<Timer>,
    schedule: Schedule,
    original_title: String,
    location: String,
    favicon: Option<Favicon>,
    /// Loading marker observed in the current waiting cycle
    loading_seen: bool,
    /// Next retry-control probe; `None` when not probing
    next_probe: Option<Instant>,
    /// Successful retry clicks for the current response
    retries: u32,
    loading_since_click: bool,
    countdown_visible: bool,
    banner_visible: bool,
    blink_on: bool,
}

impl<L: PageLocator, S: PageSurface> PageSession<L, S> {
    /// Start watching a page. Captures its current title and address.
    pub fn new(locator: L, surface: S, settings: &Settings, relay: RelayClient) -> Self {
        let original_title = surface.title();
        let location = locator.snapshot().location;

        Self {
            locator,
            surface,
            monitor: settings.monitor.clone(),
            retry: settings.retry.clone(),
            alert_option: settings.alert_option,
            app_name: settings.notification.title.clone(),
            relay,
            tab_id: None,
            state: ObservationState::Idle,
            timer: None,
            schedule: Schedule::default(),
            original_title,
            location,
            favicon: None,
            loading_seen: false,
            next_probe: None,
            retries: 0,
            loading_since_click: false,
            countdown_visible: false,
            banner_visible: false,
            blink_on: false,
        }
    }

    /// Set the tab this page runs in (answer of the relay handshake)
    pub fn set_tab_id(&mut self, tab_id: Option<TabId>) {
        self.tab_id = tab_id;
    }

    pub fn tab_id(&self) -> Option<TabId> {
        self.tab_id
    }

    pub fn state(&self) -> ObservationState {
        self.state
    }

    pub fn timer(&self) -> Option<Timer> {
        self.timer
    }

    /// Retry clicks that took effect for the current response
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Handle one batch of document mutations
    pub fn on_mutation(&mut self, now: Instant) {
        let snapshot = self.locator.snapshot();
        // A new address may arrive together with the first loading marker
        self.follow_navigation(&snapshot);
        self.observe_loading(&snapshot);

        if !snapshot.has_response {
            return;
        }

        match self.state {
            ObservationState::Idle | ObservationState::Complete => {
                if snapshot.loading && self.timer.is_none() {
                    self.begin_waiting(now);
                }
            }
            ObservationState::AwaitingResponse => self.check_awaiting(now, &snapshot),
            ObservationState::ResponseReceived => {
                if snapshot.retry_control {
                    self.enter_erred(now);
                } else if snapshot.complete {
                    self.begin_completion(now);
                }
            }
            ObservationState::Regenerating => {
                if snapshot.loading {
                    self.restart(now, &snapshot);
                }
            }
            ObservationState::Erred | ObservationState::TimedOut => {}
        }
    }

    /// Timer cadence: refresh indicators, probe for the retry control, run due actions
    pub fn tick(&mut self, now: Instant) {
        let snapshot = self.locator.snapshot();
        if self.follow_navigation(&snapshot) {
            return;
        }
        self.observe_loading(&snapshot);

        match self.timer {
            Some(Timer::Elapsed { .. }) => self.refresh_elapsed_title(now),
            Some(Timer::Countdown { .. }) => {
                if self.refresh_countdown(now) {
                    self.countdown_expired(now);
                }
            }
            None => {}
        }

        if self.state == ObservationState::AwaitingResponse {
            if let Some(next) = self.next_probe {
                if now >= next {
                    self.next_probe = Some(now + self.monitor.probe_interval());
                    if snapshot.retry_control {
                        self.enter_erred(now);
                    }
                }
            }
        }

        while let Some(wake) = self.schedule.pop_due(now) {
            self.handle_wake(wake, now);
        }
    }

    /// Inbound `resetNotificationState`: back to idle with all indicators cleared
    pub fn reset_notification_state(&mut self) {
        self.reset_to_idle("notification reset");
    }

    fn check_awaiting(&mut self, now: Instant, snapshot: &PageSnapshot) {
        if snapshot.loading {
            self.loading_seen = true;
        }
        if snapshot.retry_control {
            self.enter_erred(now);
            return;
        }
        if self.loading_seen && !snapshot.loading {
            self.response_received(now);
            if snapshot.complete {
                self.begin_completion(now);
            }
        }
    }

    /// Fresh response: loading marker appeared while idle
    fn begin_waiting(&mut self, now: Instant) {
        self.schedule.cancel(|w| {
            matches!(w, Wake::Settle { .. } | Wake::Done | Wake::Blink)
        });
        self.stop_blink();
        self.retries = 0;
        tracing::info!("Waiting for response...");
        self.start_cycle(now, true);
    }

    fn start_cycle(&mut self, now: Instant, loading: bool) {
        self.timer = Some(Timer::Elapsed { started: now });
        self.loading_seen = loading;
        self.next_probe = Some(now + self.monitor.probe_interval());
        self.set_favicon(Favicon::Yellow);
        self.transition(ObservationState::AwaitingResponse);
        self.refresh_elapsed_title(now);
    }

    fn response_received(&mut self, now: Instant) {
        let elapsed = self.elapsed(now);
        tracing::info!(
            "Response received in {}s, waiting for completion...",
            format_seconds(elapsed)
        );
        self.next_probe = None;
        self.set_favicon(Favicon::Orange);
        self.transition(ObservationState::ResponseReceived);
    }

    fn enter_erred(&mut self, now: Instant) {
        let elapsed = self.elapsed(now);
        tracing::info!("Retry control detected after {}s", format_seconds(elapsed));

        self.transition(ObservationState::Erred);
        self.set_favicon(Favicon::Red);
        self.stop_timer();
        self.next_probe = None;

        let delay = self.retry.pick_delay();
        self.timer = Some(Timer::Countdown {
            started: now,
            duration: delay,
        });
        self.set_favicon(Favicon::Gray);
        self.transition(ObservationState::TimedOut);
        self.refresh_countdown(now);
        tracing::info!(delay_secs = delay.as_secs(), "Waiting before clicking retry");
    }

    /// Countdown reached zero: clear it and make the first click attempt
    fn countdown_expired(&mut self, now: Instant) {
        self.timer = None;
        self.clear_countdown();
        self.surface.set_title(&self.original_title);
        self.set_favicon(Favicon::Default);
        self.attempt_click(1, now);
    }

    fn attempt_click(&mut self, attempt: u32, now: Instant) {
        let snapshot = self.locator.snapshot();
        let regenerating = self.state == ObservationState::Regenerating;

        if regenerating && (!snapshot.retry_control || snapshot.loading) {
            // An earlier click took effect
            self.restart(now, &snapshot);
            return;
        }

        if !snapshot.retry_control {
            tracing::warn!(attempt, "Retry control not found, abandoning retry");
            self.reset_to_idle("retry control vanished");
            return;
        }

        tracing::info!(attempt, "Clicking retry control");
        if self.locator.click_retry_control() {
            if !regenerating {
                self.retries += 1;
                self.loading_since_click = false;
                self.transition(ObservationState::Regenerating);
                self.schedule.cancel(|w| matches!(w, Wake::BlockCheck));
                self.schedule
                    .at(now + self.monitor.block_check(), Wake::BlockCheck);
            }
        } else {
            tracing::warn!(attempt, "Retry click had no target");
        }

        if attempt < self.monitor.click_attempts {
            self.schedule.at(
                now + self.monitor.click_spacing(),
                Wake::ClickAttempt(attempt + 1),
            );
        } else if self.state == ObservationState::Regenerating {
            self.schedule
                .at(now + self.monitor.restart_delay(), Wake::Restart);
        } else {
            tracing::warn!(attempts = attempt, "Giving up on retry control");
            self.reset_to_idle("retry attempts exhausted");
        }
    }

    /// Begin a new waiting cycle after a retry click
    fn restart(&mut self, now: Instant, snapshot: &PageSnapshot) {
        self.schedule
            .cancel(|w| matches!(w, Wake::ClickAttempt(_) | Wake::Restart));
        tracing::info!(retries = self.retries, "Restarting after retry");
        self.start_cycle(now, snapshot.loading);
    }

    fn begin_completion(&mut self, now: Instant) {
        let elapsed = self.elapsed(now);
        tracing::info!(
            "Operation completed. Execution time: {}s",
            format_seconds(elapsed)
        );
        self.stop_timer();
        self.next_probe = None;
        self.transition(ObservationState::Complete);
        self.schedule
            .at(now + self.monitor.settle_delay(), Wake::Settle { elapsed });
    }

    fn finish_completion(&mut self, now: Instant, elapsed: Duration) {
        if self.state != ObservationState::Complete {
            return;
        }

        let content_len = self
            .locator
            .last_response_text()
            .map(|text| text.trim().chars().count())
            .unwrap_or(0);
        tracing::debug!(content_len, "Final response content read");
        self.schedule.at(now + self.monitor.done_delay(), Wake::Done);

        let counter_retries = self
            .locator
            .snapshot()
            .attempt_counter
            .as_deref()
            .map(retries_from_counter)
            .unwrap_or(0);
        let retries = self.retries.max(counter_retries);
        let hidden = self.surface.is_hidden();

        if !self.alert_option.should_notify(hidden, retries) {
            tracing::debug!(
                alert = %self.alert_option,
                hidden,
                retries,
                "Completion not announced"
            );
            return;
        }

        let Some(tab_id) = self.tab_id else {
            tracing::error!("Tab id is missing, notification skipped");
            return;
        };

        let message = format_completion_message(&self.app_name, elapsed, retries);
        if self.relay.request_notification(message, tab_id) {
            tracing::info!(tab_id, retries, "Notification requested");
        } else {
            tracing::warn!(tab_id, "Relay unavailable, notification dropped");
        }

        if hidden {
            self.blink_on = false;
            self.schedule.at(now + BLINK_INTERVAL, Wake::Blink);
        }
    }

    fn handle_wake(&mut self, wake: Wake, now: Instant) {
        match wake {
            Wake::Settle { elapsed } => self.finish_completion(now, elapsed),
            Wake::Done => self.set_favicon(Favicon::Green),
            Wake::ClickAttempt(attempt) => {
                if matches!(
                    self.state,
                    ObservationState::TimedOut | ObservationState::Regenerating
                ) {
                    self.attempt_click(attempt, now);
                }
            }
            Wake::Restart => {
                if self.state == ObservationState::Regenerating {
                    let snapshot = self.locator.snapshot();
                    self.restart(now, &snapshot);
                }
            }
            Wake::BlockCheck => {
                if !self.loading_since_click && !self.locator.snapshot().loading {
                    tracing::warn!("Loading did not start after retry click");
                    self.surface.show_block_banner();
                    self.banner_visible = true;
                }
            }
            Wake::Blink => self.blink(now),
        }
    }

    fn blink(&mut self, now: Instant) {
        if !self.surface.is_hidden() {
            self.stop_blink();
            self.set_favicon(Favicon::Default);
            return;
        }

        self.blink_on = !self.blink_on;
        if self.blink_on {
            self.surface.set_title(BLINK_TITLE);
            self.set_favicon(Favicon::Red);
        } else {
            self.surface.set_title(&self.original_title);
            self.set_favicon(Favicon::Default);
        }
        self.schedule.at(now + BLINK_INTERVAL, Wake::Blink);
    }

    fn stop_blink(&mut self) {
        self.schedule.cancel(|w| matches!(w, Wake::Blink));
        if self.blink_on {
            self.surface.set_title(&self.original_title);
            self.blink_on = false;
        }
    }

    /// Address changed: drop everything from the previous page
    fn follow_navigation(&mut self, snapshot: &PageSnapshot) -> bool {
        if snapshot.location == self.location {
            return false;
        }
        tracing::debug!(from = %self.location, to = %snapshot.location, "Navigation detected");
        self.location = snapshot.location.clone();
        self.reset_to_idle("navigation");
        true
    }

    fn observe_loading(&mut self, snapshot: &PageSnapshot) {
        if !snapshot.loading {
            return;
        }
        self.loading_since_click = true;
        if self.banner_visible {
            self.surface.remove_block_banner();
            self.banner_visible = false;
        }
    }

    fn reset_to_idle(&mut self, reason: &str) {
        tracing::info!(reason, from = %self.state, "Resetting page state");
        self.schedule.clear();
        self.timer = None;
        self.next_probe = None;
        self.loading_seen = false;
        self.retries = 0;
        self.blink_on = false;
        self.clear_countdown();
        if self.banner_visible {
            self.surface.remove_block_banner();
            self.banner_visible = false;
        }
        self.surface.set_title(&self.original_title);
        self.set_favicon(Favicon::Default);
        self.transition(ObservationState::Idle);
    }

    fn stop_timer(&mut self) {
        self.timer = None;
        self.surface.set_title(&self.original_title);
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.timer
            .map(|timer| timer.elapsed(now))
            .unwrap_or_default()
    }

    fn refresh_elapsed_title(&mut self, now: Instant) {
        if let Some(timer @ Timer::Elapsed { .. }) = self.timer {
            let title = format!(
                "{}s | {}",
                format_seconds(timer.elapsed(now)),
                self.original_title
            );
            self.surface.set_title(&title);
        }
    }

    /// Update countdown title and inline display. Returns `true` once it reached zero.
    fn refresh_countdown(&mut self, now: Instant) -> bool {
        let Some(remaining) = self.timer.and_then(|timer| timer.remaining(now)) else {
            return false;
        };
        let text = format!("⏳ {}s", format_seconds(remaining));
        let title = format!("{} | {}", text, self.original_title);
        self.surface.set_title(&title);
        self.surface.show_countdown(&text);
        self.countdown_visible = true;
        remaining.is_zero()
    }

    fn clear_countdown(&mut self) {
        if self.countdown_visible {
            self.surface.clear_countdown();
            self.countdown_visible = false;
        }
    }

    fn set_favicon(&mut self, favicon: Favicon) {
        if self.favicon == Some(favicon) {
            return;
        }
        self.surface.set_favicon(favicon);
        self.favicon = Some(favicon);
    }

    fn transition(&mut self, to: ObservationState) {
        if self.state != to {
            tracing::debug!(from = %self.state, to = %to, "Page state changed");
            self.state = to;
        }
    }
}
