use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use tabwatch_core::page::{Favicon, PageLocator, PageSnapshot, PageSurface};

use super::scenario::{ClickReaction, PageChange};

#[derive(Debug)]
struct PageState {
    snapshot: PageSnapshot,
    title: String,
    favicons: Vec<Favicon>,
    countdown: Option<String>,
    banners_shown: u32,
    hidden: bool,
    clicks: u32,
    reaction: ClickReaction,
    click_tx: Option<mpsc::UnboundedSender<()>>,
}

/// In-memory chat page driven by a script
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    state: Arc<Mutex<PageState>>,
}

impl ScriptedPage {
    pub fn new(title: &str, location: &str, reaction: ClickReaction, hidden: bool) -> Self {
        let snapshot = PageSnapshot {
            location: location.to_string(),
            has_response: true,
            ..PageSnapshot::default()
        };
        Self {
            state: Arc::new(Mutex::new(PageState {
                snapshot,
                title: title.to_string(),
                favicons: Vec::new(),
                countdown: None,
                banners_shown: 0,
                hidden,
                clicks: 0,
                reaction,
                click_tx: None,
            })),
        }
    }

    /// Receive a signal for every successful retry click
    pub fn subscribe_clicks(&self) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().click_tx = Some(tx);
        rx
    }

    pub fn apply(&self, change: PageChange) {
        let mut state = self.state.lock();
        let snapshot = &mut state.snapshot;
        match change {
            PageChange::StartLoading => {
                snapshot.complete = false;
                snapshot.loading = true;
            }
            PageChange::StopLoading => snapshot.loading = false,
            PageChange::Refuse => {
                snapshot.loading = false;
                snapshot.retry_control = true;
            }
            PageChange::Complete => {
                snapshot.loading = false;
                snapshot.complete = true;
            }
        }
        tracing::debug!(?change, "Page changed");
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.state.lock().hidden = hidden;
    }

    pub fn clicks(&self) -> u32 {
        self.state.lock().clicks
    }

    pub fn favicons(&self) -> Vec<Favicon> {
        self.state.lock().favicons.clone()
    }

    pub fn banners_shown(&self) -> u32 {
        self.state.lock().banners_shown
    }
}

impl PageLocator for ScriptedPage {
    fn snapshot(&self) -> PageSnapshot {
        self.state.lock().snapshot.clone()
    }

    fn click_retry_control(&mut self) -> bool {
        let mut state = self.state.lock();
        if !state.snapshot.retry_control {
            return false;
        }
        state.clicks += 1;
        state.snapshot.retry_control = false;
        if state.reaction == ClickReaction::Regenerate {
            state.snapshot.loading = true;
        }
        if let Some(tx) = &state.click_tx {
            let _ = tx.send(());
        }
        true
    }

    fn last_response_text(&self) -> Option<String> {
        let state = self.state.lock();
        state
            .snapshot
            .complete
            .then(|| "Here is the finished answer.".to_string())
    }
}

impl PageSurface for ScriptedPage {
    fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    fn set_title(&mut self, title: &str) {
        let mut state = self.state.lock();
        if state.title != title {
            tracing::debug!(title, "Title");
            state.title = title.to_string();
        }
    }

    fn set_favicon(&mut self, favicon: Favicon) {
        tracing::info!(favicon = %favicon, asset = %favicon.asset(), "Favicon");
        self.state.lock().favicons.push(favicon);
    }

    fn show_countdown(&mut self, text: &str) {
        let mut state = self.state.lock();
        if state.countdown.as_deref() != Some(text) {
            tracing::info!("Retrying in {}", text);
            state.countdown = Some(text.to_string());
        }
    }

    fn clear_countdown(&mut self) {
        self.state.lock().countdown = None;
    }

    fn show_block_banner(&mut self) {
        tracing::warn!("Banner: temporary block or network error, reload the page if this persists");
        self.state.lock().banners_shown += 1;
    }

    fn remove_block_banner(&mut self) {
        tracing::info!("Banner removed");
    }

    fn is_hidden(&self) -> bool {
        self.state.lock().hidden
    }
}
