use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed favicon palette used as a status side channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Favicon {
    /// The page's own icon
    Default,
    /// Retry countdown running
    Gray,
    /// Waiting for a response
    Yellow,
    /// Response streaming, not yet complete
    Orange,
    /// Refused response, or attention blink
    Red,
    /// Response complete
    Green,
}

impl Favicon {
    /// Palette name
    pub fn name(&self) -> &'static str {
        match self {
            Favicon::Default => "default",
            Favicon::Gray => "gray",
            Favicon::Yellow => "yellow",
            Favicon::Orange => "orange",
            Favicon::Red => "red",
            Favicon::Green => "green",
        }
    }

    /// Bundled asset file for this icon
    pub fn asset(&self) -> String {
        format!("{}.svg", self.name())
    }
}

impl fmt::Display for Favicon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
