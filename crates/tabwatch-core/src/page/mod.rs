//! Capabilities the monitor needs from the watched page.
//!
//! The monitor never queries a document directly. A [`PageLocator`] answers
//! structural questions (is the loading spinner there? the retry control?)
//! and a [`PageSurface`] receives the visual side effects (title, favicon,
//! inline countdown and banner). Both are supplied by whoever hosts the page.

mod favicon;

pub use favicon::Favicon;

/// Observable fragments of the page at one instant.
///
/// Absent elements are simply `false`/`None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    /// Current document address
    pub location: String,
    /// A response block exists
    pub has_response: bool,
    /// The loading marker is present in the latest response
    pub loading: bool,
    /// The completion marker is present in the latest response
    pub complete: bool,
    /// The regenerate/retry control is present near the latest response
    pub retry_control: bool,
    /// Raw text of the response attempt counter (e.g. "2 / 3"), if shown
    pub attempt_counter: Option<String>,
}

/// Structural queries and the one action the monitor performs on the page
pub trait PageLocator {
    /// Read the current page fragments
    fn snapshot(&self) -> PageSnapshot;

    /// Click the retry control. Returns `false` when it could not be found.
    fn click_retry_control(&mut self) -> bool;

    /// Text of the latest response block
    fn last_response_text(&self) -> Option<String>;
}

/// Visual side channel of the page
pub trait PageSurface {
    /// Current document title
    fn title(&self) -> String;

    fn set_title(&mut self, title: &str);

    fn set_favicon(&mut self, favicon: Favicon);

    /// Show or update the inline countdown next to the refused response
    fn show_countdown(&mut self, text: &str);

    fn clear_countdown(&mut self);

    /// Show the "temporary block or network error" banner under the latest response
    fn show_block_banner(&mut self);

    fn remove_block_banner(&mut self);

    /// Whether the page is currently a background tab
    fn is_hidden(&self) -> bool;
}
