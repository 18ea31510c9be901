//! Scriptable page used by monitor tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::page::{Favicon, PageLocator, PageSnapshot, PageSurface};

#[derive(Debug, Default)]
struct FakePageState {
    snapshot: PageSnapshot,
    response_text: Option<String>,
    hidden: bool,
    title: String,
    favicons: Vec<Favicon>,
    countdown: Option<String>,
    countdown_history: Vec<String>,
    banner: bool,
    clicks: u32,
    keep_control_on_click: bool,
}

/// Page handle shared between a session (as locator and surface) and the test
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<FakePageState>>,
}

impl FakePage {
    /// Page at `location` that already shows a response block
    pub fn new(title: &str, location: &str) -> Self {
        let page = Self::default();
        {
            let mut state = page.state.lock();
            state.title = title.to_string();
            state.snapshot.location = location.to_string();
            state.snapshot.has_response = true;
            state.response_text = Some("Hello".to_string());
        }
        page
    }

    pub fn set_location(&self, location: &str) {
        self.state.lock().snapshot.location = location.to_string();
    }

    pub fn set_has_response(&self, present: bool) {
        self.state.lock().snapshot.has_response = present;
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.lock().snapshot.loading = loading;
    }

    pub fn set_complete(&self, complete: bool) {
        self.state.lock().snapshot.complete = complete;
    }

    pub fn set_retry_control(&self, present: bool) {
        self.state.lock().snapshot.retry_control = present;
    }

    pub fn set_attempt_counter(&self, counter: Option<&str>) {
        self.state.lock().snapshot.attempt_counter = counter.map(str::to_string);
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.state.lock().hidden = hidden;
    }

    /// Whether a click makes the retry control disappear (default: it does)
    pub fn set_click_clears_control(&self, clears: bool) {
        self.state.lock().keep_control_on_click = !clears;
    }

    pub fn current_title(&self) -> String {
        self.state.lock().title.clone()
    }

    /// Last favicon applied
    pub fn favicon(&self) -> Option<Favicon> {
        self.state.lock().favicons.last().copied()
    }

    pub fn favicon_history(&self) -> Vec<Favicon> {
        self.state.lock().favicons.clone()
    }

    pub fn countdown(&self) -> Option<String> {
        self.state.lock().countdown.clone()
    }

    pub fn countdown_history(&self) -> Vec<String> {
        self.state.lock().countdown_history.clone()
    }

    pub fn banner(&self) -> bool {
        self.state.lock().banner
    }

    pub fn clicks(&self) -> u32 {
        self.state.lock().clicks
    }
}

impl PageLocator for FakePage {
    fn snapshot(&self) -> PageSnapshot {
        self.state.lock().snapshot.clone()
    }

    fn click_retry_control(&mut self) -> bool {
        let mut state = self.state.lock();
        if !state.snapshot.retry_control {
            return false;
        }
        state.clicks += 1;
        if !state.keep_control_on_click {
            state.snapshot.retry_control = false;
        }
        true
    }

    fn last_response_text(&self) -> Option<String> {
        self.state.lock().response_text.clone()
    }
}

impl PageSurface for FakePage {
    fn title(&self) -> String {
        self.current_title()
    }

    fn set_title(&mut self, title: &str) {
        self.state.lock().title = title.to_string();
    }

    fn set_favicon(&mut self, favicon: Favicon) {
        self.state.lock().favicons.push(favicon);
    }

    fn show_countdown(&mut self, text: &str) {
        let mut state = self.state.lock();
        state.countdown = Some(text.to_string());
        state.countdown_history.push(text.to_string());
    }

    fn clear_countdown(&mut self) {
        self.state.lock().countdown = None;
    }

    fn show_block_banner(&mut self) {
        self.state.lock().banner = true;
    }

    fn remove_block_banner(&mut self) {
        self.state.lock().banner = false;
    }

    fn is_hidden(&self) -> bool {
        self.state.lock().hidden
    }
}
