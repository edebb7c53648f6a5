//! The element-driver capability consumed by the engine
//!
//! The engine never touches a browser or device directly. Everything it needs
//! from the application under test goes through [`ElementDriver`]: locating
//! elements by id, a handful of element operations, and a few page-level ones.
//! Drivers report failures as [`DriverError`]; the engine adds step context.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::step::OptionSelector;

pub mod scripted;

pub use scripted::{FakeElement, ScriptedDriver};

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Element '{id}' not found within {timeout_ms}ms")]
    ElementNotFound { id: String, timeout_ms: u64 },

    #[error("Element '{0}' has no bounding box")]
    NoBoundingBox(String),

    #[error("Alert did not appear within {timeout_ms}ms")]
    DialogTimeout { timeout_ms: u64 },

    #[error("Driver error: {0}")]
    Failed(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Opaque reference to one located element: the `index`-th match for `id`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub id: String,
    pub index: usize,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>, index: usize) -> Self {
        Self {
            id: id.into(),
            index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Kind of native dialog currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Alert,
    Confirm,
    Prompt,
    BeforeUnload,
}

/// What to do with a dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogResponse {
    Accept,
    Dismiss,
}

/// Decides the response once the dialog kind is known
pub type DialogDecision<'a> = &'a (dyn Fn(DialogKind) -> DialogResponse + Send + Sync);

/// Automation backend for the application under test
#[async_trait]
pub trait ElementDriver: Send + Sync {
    /// All elements currently matching `id` (possibly none)
    async fn locate(&self, id: &str) -> DriverResult<Vec<ElementHandle>>;

    /// Wait until the first element matching `id` is visible
    async fn wait_visible(&self, id: &str, timeout: Duration) -> DriverResult<ElementHandle>;

    async fn is_visible(&self, element: &ElementHandle) -> DriverResult<bool>;

    async fn click(&self, element: &ElementHandle) -> DriverResult<()>;

    async fn double_click(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Replace the element's (or its nested input's) value with `text`
    async fn type_text(&self, element: &ElementHandle, text: &str) -> DriverResult<()>;

    async fn clear(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Text content, or the current value for form fields
    async fn read_text(&self, element: &ElementHandle) -> DriverResult<String>;

    async fn is_enabled(&self, element: &ElementHandle) -> DriverResult<bool>;

    async fn bounding_box(&self, element: &ElementHandle) -> DriverResult<Option<BoundingBox>>;

    async fn scroll_by(&self, element: &ElementHandle, dx: f64, dy: f64) -> DriverResult<()>;

    /// Press at `from`, hold for `hold`, move to `to`, release
    async fn gesture(&self, from: Point, to: Point, hold: Duration) -> DriverResult<()>;

    async fn click_at(&self, point: Point) -> DriverResult<()>;

    async fn select_option(&self, element: &ElementHandle, selector: &OptionSelector) -> DriverResult<()>;

    /// Wait until the application reports it is idle
    async fn wait_idle(&self) -> DriverResult<()>;

    /// Wait a fixed delay
    async fn pause(&self, duration: Duration) -> DriverResult<()>;

    async fn back(&self) -> DriverResult<()>;

    async fn screenshot(&self, path: &Path) -> DriverResult<()>;

    /// Handle the next native dialog, waiting at most `timeout` for it
    async fn handle_next_dialog(&self, timeout: Duration, decide: DialogDecision<'_>) -> DriverResult<DialogKind>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_center() {
        let bbox = BoundingBox::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(bbox.center(), Point::new(60.0, 40.0));
    }
}
