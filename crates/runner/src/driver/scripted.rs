//! In-memory driver with a scripted element table
//!
//! Used by the test suite and by rehearsal runs. Every call is recorded so a
//! caller can check exactly what the engine did and in which order.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    BoundingBox, DialogDecision, DialogKind, DriverError, DriverResult, ElementDriver, ElementHandle, Point,
};
use crate::step::OptionSelector;

/// One scripted element id
#[derive(Debug, Clone, PartialEq)]
pub struct FakeElement {
    count: usize,
    visible: bool,
    enabled: bool,
    text: String,
    bbox: Option<BoundingBox>,
    hidden_probes: usize,
}

impl Default for FakeElement {
    fn default() -> Self {
        Self {
            count: 1,
            visible: true,
            enabled: true,
            text: String::new(),
            bbox: Some(BoundingBox::new(0.0, 0.0, 100.0, 40.0)),
            hidden_probes: 0,
        }
    }
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements sharing the id
    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn bbox(mut self, bbox: Option<BoundingBox>) -> Self {
        self.bbox = bbox;
        self
    }

    /// Report hidden for the first `probes` visibility checks
    pub fn hidden_for(mut self, probes: usize) -> Self {
        self.hidden_probes = probes;
        self
    }

    fn probe_visible(&mut self) -> bool {
        if self.hidden_probes > 0 {
            self.hidden_probes -= 1;
            return false;
        }
        self.visible && self.count > 0
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    elements: HashMap<String, FakeElement>,
    dialogs: VecDeque<DialogKind>,
    calls: Vec<String>,
    fail_screenshots: bool,
}

/// Scripted [`ElementDriver`]
///
/// In strict mode only registered ids exist. In permissive mode every id
/// resolves to a default element (visible, enabled, empty text) and a missing
/// dialog is treated as a plain alert.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    permissive: bool,
    state: Mutex<ScriptState>,
}

impl ScriptedDriver {
    /// Only registered elements exist
    pub fn strict() -> Self {
        Self::default()
    }

    /// Every element exists
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Register (or replace) an element
    pub fn with_element(self, id: &str, element: FakeElement) -> Self {
        self.set_element(id, element);
        self
    }

    pub fn set_element(&self, id: &str, element: FakeElement) {
        self.state.lock().elements.insert(id.to_string(), element);
    }

    /// Queue a dialog for the next `handle_next_dialog`
    pub fn queue_dialog(&self, kind: DialogKind) {
        self.state.lock().dialogs.push_back(kind);
    }

    /// Make every screenshot capture fail
    pub fn fail_screenshots(&self) {
        self.state.lock().fail_screenshots = true;
    }

    /// Current text of an element, if it exists
    pub fn text_of(&self, id: &str) -> Option<String> {
        self.state.lock().elements.get(id).map(|el| el.text.clone())
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Calls whose name starts with `prefix`
    pub fn calls_to(&self, prefix: &str) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }

    /// Run `f` against the element behind `id`, creating it in permissive mode
    fn with_element_mut<T>(&self, id: &str, f: impl FnOnce(&mut FakeElement) -> T) -> Option<T> {
        let mut state = self.state.lock();
        if self.permissive && !state.elements.contains_key(id) {
            state.elements.insert(id.to_string(), FakeElement::default());
        }
        state.elements.get_mut(id).map(f)
    }

    fn element(&self, handle: &ElementHandle) -> DriverResult<FakeElement> {
        self.with_element_mut(&handle.id, |el| el.clone())
            .filter(|el| handle.index < el.count)
            .ok_or_else(|| DriverError::Failed(format!("element '{}' is detached", label(handle))))
    }
}

fn label(handle: &ElementHandle) -> String {
    if handle.index == 0 {
        handle.id.clone()
    } else {
        format!("{}[{}]", handle.id, handle.index)
    }
}

#[async_trait]
impl ElementDriver for ScriptedDriver {
    async fn locate(&self, id: &str) -> DriverResult<Vec<ElementHandle>> {
        let count = self.with_element_mut(id, |el| el.count).unwrap_or(0);
        Ok((0..count).map(|index| ElementHandle::new(id, index)).collect())
    }

    async fn wait_visible(&self, id: &str, timeout: Duration) -> DriverResult<ElementHandle> {
        self.record(format!("wait_visible({})", id));
        match self.with_element_mut(id, FakeElement::probe_visible) {
            Some(true) => Ok(ElementHandle::new(id, 0)),
            _ => Err(DriverError::ElementNotFound {
                id: id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn is_visible(&self, element: &ElementHandle) -> DriverResult<bool> {
        Ok(self
            .with_element_mut(&element.id, FakeElement::probe_visible)
            .unwrap_or(false))
    }

    async fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        self.element(element)?;
        self.record(format!("click({})", label(element)));
        Ok(())
    }

    async fn double_click(&self, element: &ElementHandle) -> DriverResult<()> {
        self.element(element)?;
        self.record(format!("double_click({})", label(element)));
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        self.element(element)?;
        self.with_element_mut(&element.id, |el| el.text = text.to_string());
        self.record(format!("type({}, {})", label(element), text));
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> DriverResult<()> {
        self.element(element)?;
        self.with_element_mut(&element.id, |el| el.text.clear());
        self.record(format!("clear({})", label(element)));
        Ok(())
    }

    async fn read_text(&self, element: &ElementHandle) -> DriverResult<String> {
        Ok(self.element(element)?.text)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> DriverResult<bool> {
        Ok(self.element(element)?.enabled)
    }

    async fn bounding_box(&self, element: &ElementHandle) -> DriverResult<Option<BoundingBox>> {
        Ok(self.element(element)?.bbox)
    }

    async fn scroll_by(&self, element: &ElementHandle, dx: f64, dy: f64) -> DriverResult<()> {
        self.element(element)?;
        self.record(format!("scroll({}, {}, {})", label(element), dx, dy));
        Ok(())
    }

    async fn gesture(&self, from: Point, to: Point, hold: Duration) -> DriverResult<()> {
        self.record(format!(
            "gesture({},{} -> {},{}, {}ms)",
            from.x,
            from.y,
            to.x,
            to.y,
            hold.as_millis()
        ));
        Ok(())
    }

    async fn click_at(&self, point: Point) -> DriverResult<()> {
        self.record(format!("click_at({},{})", point.x, point.y));
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, selector: &OptionSelector) -> DriverResult<()> {
        self.element(element)?;
        let choice = match selector {
            OptionSelector::Value(value) => format!("value={}", value),
            OptionSelector::Label(label) => format!("label={}", label),
            OptionSelector::Index(index) => format!("index={}", index),
        };
        self.record(format!("select({}, {})", label(element), choice));
        Ok(())
    }

    async fn wait_idle(&self) -> DriverResult<()> {
        self.record("wait_idle".to_string());
        Ok(())
    }

    async fn pause(&self, duration: Duration) -> DriverResult<()> {
        self.record(format!("pause({}ms)", duration.as_millis()));
        Ok(())
    }

    async fn back(&self) -> DriverResult<()> {
        self.record("back".to_string());
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> DriverResult<()> {
        if self.state.lock().fail_screenshots {
            return Err(DriverError::Failed(format!(
                "screenshot capture failed: {}",
                path.display()
            )));
        }
        self.record(format!("screenshot({})", path.display()));
        Ok(())
    }

    async fn handle_next_dialog(&self, timeout: Duration, decide: DialogDecision<'_>) -> DriverResult<DialogKind> {
        let queued = self.state.lock().dialogs.pop_front();
        let kind = match queued {
            Some(kind) => kind,
            None if self.permissive => DialogKind::Alert,
            None => {
                return Err(DriverError::DialogTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };
        let response = decide(kind);
        self.record(format!("dialog({:?}, {:?})", kind, response));
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DialogResponse;

    #[tokio::test]
    async fn test_strict_driver_knows_only_registered_elements() {
        let driver = ScriptedDriver::strict().with_element("ok", FakeElement::new().count(2));

        assert_eq!(driver.locate("ok").await.unwrap().len(), 2);
        assert!(driver.locate("nope").await.unwrap().is_empty());

        let err = driver
            .wait_visible("nope", Duration::from_millis(250))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Element 'nope' not found within 250ms");
    }

    #[tokio::test]
    async fn test_permissive_driver_creates_elements_on_demand() {
        let driver = ScriptedDriver::permissive();
        let handle = driver.wait_visible("anything", Duration::from_secs(1)).await.unwrap();

        driver.type_text(&handle, "hello").await.unwrap();
        assert_eq!(driver.read_text(&handle).await.unwrap(), "hello");
        assert_eq!(driver.text_of("anything").as_deref(), Some("hello"));
        assert_eq!(
            driver.calls(),
            vec!["wait_visible(anything)", "type(anything, hello)"]
        );
    }

    #[tokio::test]
    async fn test_hidden_for_reports_hidden_then_visible() {
        let driver = ScriptedDriver::strict().with_element("late", FakeElement::new().hidden_for(2));
        let handle = ElementHandle::new("late", 0);

        assert!(!driver.is_visible(&handle).await.unwrap());
        assert!(!driver.is_visible(&handle).await.unwrap());
        assert!(driver.is_visible(&handle).await.unwrap());
    }

    #[tokio::test]
    async fn test_dialogs_are_consumed_in_order() {
        let driver = ScriptedDriver::strict();
        driver.queue_dialog(DialogKind::Confirm);

        let accept = |_: DialogKind| DialogResponse::Accept;
        let kind = driver
            .handle_next_dialog(Duration::from_secs(1), &accept)
            .await
            .unwrap();
        assert_eq!(kind, DialogKind::Confirm);

        let err = driver
            .handle_next_dialog(Duration::from_secs(1), &accept)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::DialogTimeout { timeout_ms: 1000 }));
    }
}
