use std::time::Duration;

use tabwatch_core::config::DemoScenario;

/// A change applied to the scripted page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageChange {
    /// Loading marker appears
    StartLoading,
    /// Loading marker disappears, partial response visible
    StopLoading,
    /// Server refused: loading stops and the retry control shows
    Refuse,
    /// Completion marker appears
    Complete,
}

/// What the scripted page does when its retry control is clicked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickReaction {
    /// The control goes away and a new response starts loading
    Regenerate,
    /// The control goes away and nothing happens
    Swallow,
}

/// A single event in the page timeline
#[derive(Debug, Clone, Copy)]
pub struct TimelineEvent {
    /// Offset from the start of its phase
    pub at: Duration,
    pub change: PageChange,
}

/// Complete page script
pub struct Script {
    /// Events from the start of the demo
    pub opening: Vec<TimelineEvent>,
    pub on_click: ClickReaction,
    /// Events after the first retry click; empty when no click is expected
    pub after_click: Vec<TimelineEvent>,
    /// How long to keep watching after the last event
    pub linger: Duration,
}

fn event(at_ms: u64, change: PageChange) -> TimelineEvent {
    TimelineEvent {
        at: Duration::from_millis(at_ms),
        change,
    }
}

/// Build the page script for `kind`
pub fn script(kind: DemoScenario) -> Script {
    match kind {
        DemoScenario::Simple => Script {
            opening: vec![
                event(0, PageChange::StartLoading),
                event(2000, PageChange::StopLoading),
                event(4000, PageChange::Complete),
            ],
            on_click: ClickReaction::Regenerate,
            after_click: Vec::new(),
            linger: Duration::from_secs(3),
        },
        DemoScenario::Retry => Script {
            opening: vec![
                event(0, PageChange::StartLoading),
                event(1500, PageChange::Refuse),
            ],
            on_click: ClickReaction::Regenerate,
            after_click: vec![
                event(2000, PageChange::StopLoading),
                event(3500, PageChange::Complete),
            ],
            linger: Duration::from_secs(3),
        },
        DemoScenario::Blocked => Script {
            opening: vec![
                event(0, PageChange::StartLoading),
                event(1500, PageChange::Refuse),
            ],
            on_click: ClickReaction::Swallow,
            after_click: vec![
                event(5000, PageChange::StartLoading),
                event(7000, PageChange::StopLoading),
                event(8000, PageChange::Complete),
            ],
            linger: Duration::from_secs(3),
        },
    }
}
