//! Browser automation seam
//!
//! The runner talks to a page only through [`Browser`]. The WebDriver
//! client implements it for real browsers; tests implement it over a
//! scripted page.

mod selector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::Result;

pub use selector::Selector;

/// Opaque handle to an element on the current page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub String);

/// Snapshot of page loading activity, sampled by the settle wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadState {
    /// `document.readyState == "complete"`
    pub complete: bool,
    /// Number of network resources the page has started so far
    pub resources: u64,
}

/// One live browser page
#[async_trait]
pub trait Browser: Send {
    /// Load a URL in the current page
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Sample the page's loading activity
    async fn load_state(&mut self) -> Result<LoadState>;

    /// All elements currently matching the selector, in document order
    async fn find_all(&mut self, selector: &Selector) -> Result<Vec<ElementRef>>;

    async fn click(&mut self, element: &ElementRef) -> Result<()>;

    /// Replace the value of an input
    async fn fill(&mut self, element: &ElementRef, value: &str) -> Result<()>;

    /// Whether a checkbox or radio is checked
    async fn is_checked(&mut self, element: &ElementRef) -> Result<bool>;

    /// Select the `<option>` of a `<select>` by value or label
    async fn select_option(&mut self, element: &ElementRef, value: &str) -> Result<()>;

    /// Rendered text of an element
    async fn text(&mut self, element: &ElementRef) -> Result<String>;

    /// PNG bytes of the current viewport
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    async fn current_url(&mut self) -> Result<String>;

    async fn title(&mut self) -> Result<String>;

    /// End the session. Called exactly once by the runner.
    async fn close(&mut self) -> Result<()>;
}
