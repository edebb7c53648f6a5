//! Action dispatch onto the element driver

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::RunnerConfig;
use crate::driver::{BoundingBox, DialogKind, DialogResponse, DriverError, ElementDriver, ElementHandle, Point};
use crate::error::{RunnerError, RunnerResult};
use crate::step::{Action, Direction};

const CONFIRM_ACCEPT: &[&str] = &["OK", "Yes", "Confirm", "Accept", "はい", "確認"];
const CONFIRM_DISMISS: &[&str] = &["Cancel", "No", "Dismiss", "いいえ", "キャンセル"];
const PROMPT_ACCEPT: &[&str] = &["OK", "Submit", "Yes", "はい", "確認"];

/// Performs [`Action`]s against a driver
pub struct ActionExecutor<'a, D: ElementDriver + ?Sized> {
    driver: &'a D,
    config: &'a RunnerConfig,
}

impl<'a, D: ElementDriver + ?Sized> ActionExecutor<'a, D> {
    pub fn new(driver: &'a D, config: &'a RunnerConfig) -> Self {
        Self { driver, config }
    }

    pub async fn execute(&self, action: &Action, timeout: Duration) -> RunnerResult<()> {
        match action {
            Action::Tap { id, text: None } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                self.driver.click(&element).await?;
            }
            Action::Tap { id, text: Some(text) } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                self.tap_text_portion(&element, text).await?;
            }
            Action::DoubleTap { id } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                self.driver.double_click(&element).await?;
            }
            Action::LongPress { id, duration } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                let center = self.require_bbox(&element).await?.center();
                self.driver.gesture(center, center, *duration).await?;
            }
            Action::Input { id, value } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                self.driver.type_text(&element, value).await?;
            }
            Action::Clear { id } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                self.driver.clear(&element).await?;
            }
            Action::Scroll { id, direction, amount } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                self.require_bbox(&element).await?;
                let (dx, dy) = scroll_offset(*direction, *amount);
                self.driver.scroll_by(&element, dx, dy).await?;
            }
            Action::Swipe { id, direction } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                let bbox = self.require_bbox(&element).await?;
                let (from, to) = swipe_endpoints(&bbox, *direction);
                self.driver.gesture(from, to, Duration::ZERO).await?;
            }
            Action::WaitFor { id } => {
                self.driver.wait_visible(id, timeout).await?;
            }
            Action::WaitForAny { ids } => self.wait_for_any(ids, timeout).await?,
            Action::Wait { duration } => self.driver.pause(*duration).await?,
            Action::Back => self.driver.back().await?,
            Action::Screenshot { name, path } => {
                let target = self.screenshot_path(name.as_deref(), path.as_deref());
                self.driver.screenshot(&target).await?;
            }
            Action::AlertTap { button } => {
                let decide = |kind: DialogKind| choose_dialog_response(kind, button);
                let kind = self.driver.handle_next_dialog(timeout, &decide).await?;
                debug!("Handled {:?} dialog with '{}'", kind, button);
            }
            Action::SelectOption { id, selector } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                self.driver.select_option(&element, selector).await?;
            }
            Action::TapItem { id, index } => {
                let item = format!("{}_item_{}", id, index);
                let element = self.driver.wait_visible(&item, timeout).await?;
                self.driver.click(&element).await?;
            }
            Action::SelectTab { id, index } => {
                let tab = format!("{}_tab_{}", id, index);
                let element = self.driver.wait_visible(&tab, timeout).await?;
                self.driver.click(&element).await?;
            }
        }
        Ok(())
    }

    async fn require_bbox(&self, element: &ElementHandle) -> RunnerResult<BoundingBox> {
        self.driver
            .bounding_box(element)
            .await?
            .ok_or_else(|| DriverError::NoBoundingBox(element.id.clone()).into())
    }

    async fn tap_text_portion(&self, element: &ElementHandle, target: &str) -> RunnerResult<()> {
        let full = self.driver.read_text(element).await?;
        let bbox = self.require_bbox(element).await?;
        let point = text_portion_point(&bbox, &full, target).ok_or_else(|| RunnerError::TextPortionNotFound {
            target: target.to_string(),
            text: full.clone(),
        })?;
        self.driver.click_at(point).await?;
        Ok(())
    }

    /// Poll every id until one is visible or `timeout` elapses
    async fn wait_for_any(&self, ids: &[String], timeout: Duration) -> RunnerResult<()> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            for id in ids {
                let found = self.driver.locate(id).await?;
                if let Some(first) = found.first() {
                    if self.driver.is_visible(first).await? {
                        debug!("waitForAny: '{}' appeared", id);
                        return Ok(());
                    }
                }
            }
            sleep(self.config.poll_interval()).await;
        }

        Err(RunnerError::WaitTimeout {
            ids: ids.join(", "),
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    fn screenshot_path(&self, name: Option<&str>, path: Option<&str>) -> PathBuf {
        match (path, name) {
            (Some(path), _) => PathBuf::from(path),
            (None, Some(name)) => self.config.screenshot_dir.join(format!("{}.png", name)),
            (None, None) => self
                .config
                .screenshot_dir
                .join(format!("screenshot_{}.png", chrono::Utc::now().timestamp_millis())),
        }
    }
}

/// Pixel offset for scrolling `amount` towards `direction`
pub fn scroll_offset(direction: Direction, amount: f64) -> (f64, f64) {
    match direction {
        Direction::Up => (0.0, -amount),
        Direction::Down => (0.0, amount),
        Direction::Left => (-amount, 0.0),
        Direction::Right => (amount, 0.0),
    }
}

/// Start and end of a swipe through the centre of `bbox`.
///
/// The finger travels half the smaller side on each side of the centre and
/// moves the way `direction` names (`up` ends above where it started).
pub fn swipe_endpoints(bbox: &BoundingBox, direction: Direction) -> (Point, Point) {
    let c = bbox.center();
    let d = bbox.width.min(bbox.height) / 2.0;
    match direction {
        Direction::Up => (Point::new(c.x, c.y + d), Point::new(c.x, c.y - d)),
        Direction::Down => (Point::new(c.x, c.y - d), Point::new(c.x, c.y + d)),
        Direction::Left => (Point::new(c.x + d, c.y), Point::new(c.x - d, c.y)),
        Direction::Right => (Point::new(c.x - d, c.y), Point::new(c.x + d, c.y)),
    }
}

/// Approximate position of `target` inside an element showing `full`.
///
/// Character offsets are mapped linearly onto the element width; the point
/// sits on the vertical centre. `None` when `target` is not part of `full`.
pub fn text_portion_point(bbox: &BoundingBox, full: &str, target: &str) -> Option<Point> {
    let byte_start = full.find(target)?;
    let total = full.chars().count();
    if total == 0 {
        return Some(bbox.center());
    }
    let start = full[..byte_start].chars().count();
    let end = start + target.chars().count();
    let offset = bbox.width * (start + end) as f64 / (2 * total) as f64;

    Some(Point::new(bbox.x + offset, bbox.y + bbox.height / 2.0))
}

/// Whether `alertTap` with `button` accepts or dismisses a dialog of `kind`
pub fn choose_dialog_response(kind: DialogKind, button: &str) -> DialogResponse {
    let matches = |list: &[&str]| list.iter().any(|text| text.to_lowercase() == button.to_lowercase());

    match kind {
        DialogKind::Confirm if matches(CONFIRM_ACCEPT) => DialogResponse::Accept,
        DialogKind::Confirm if matches(CONFIRM_DISMISS) => DialogResponse::Dismiss,
        DialogKind::Prompt if matches(PROMPT_ACCEPT) => DialogResponse::Accept,
        DialogKind::Prompt => DialogResponse::Dismiss,
        DialogKind::Confirm | DialogKind::Alert | DialogKind::BeforeUnload => DialogResponse::Accept,
    }
}
