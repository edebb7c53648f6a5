//! Steps: the atomic unit of a test
//!
//! A [`Step`] is stored exactly as authored in JSON: a flat record of optional
//! fields. It is only turned into a typed [`StepOp`] when it is about to be
//! dispatched, so a malformed step fails the unit it belongs to rather than the
//! whole file load.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

/// Default hold time for `longPress`
pub const DEFAULT_LONG_PRESS_MS: u64 = 500;

/// Default scroll distance in pixels
pub const DEFAULT_SCROLL_AMOUNT: f64 = 300.0;

/// One step as written in a test file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert: Option<String>,

    /// Target element id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,

    /// Gesture duration (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    /// Per-step timeout (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Fixed delay for `wait` (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// Swipe/scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn parse(operation: &'static str, raw: &str) -> RunnerResult<Self> {
        match raw {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(RunnerError::InvalidStepField {
                operation,
                field: "direction",
                reason: format!("expected up, down, left or right, got '{}'", other),
            }),
        }
    }
}

/// How `selectOption` picks an entry
#[derive(Debug, Clone, PartialEq)]
pub enum OptionSelector {
    Value(String),
    Label(String),
    Index(u32),
}

/// Expected text for the `text` assertion
#[derive(Debug, Clone, PartialEq)]
pub enum TextExpectation {
    Equals(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Tap { id: String, text: Option<String> },
    DoubleTap { id: String },
    LongPress { id: String, duration: Duration },
    Input { id: String, value: String },
    Clear { id: String },
    Scroll { id: String, direction: Direction, amount: f64 },
    Swipe { id: String, direction: Direction },
    WaitFor { id: String },
    WaitForAny { ids: Vec<String> },
    Wait { duration: Duration },
    Back,
    Screenshot { name: Option<String>, path: Option<String> },
    AlertTap { button: String },
    SelectOption { id: String, selector: OptionSelector },
    TapItem { id: String, index: u32 },
    SelectTab { id: String, index: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    Visible { id: String },
    NotVisible { id: String },
    Enabled { id: String },
    Disabled { id: String },
    Text { id: String, expected: TextExpectation },
    Count { id: String, expected: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOp {
    Action(Action),
    Assertion(Assertion),
}

/// A step ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStep {
    pub op: StepOp,
    pub timeout: Duration,
}

impl Step {
    /// Build an action step with only its kind set
    pub fn action(kind: &str) -> Self {
        Self {
            action: Some(kind.to_string()),
            ..Default::default()
        }
    }

    /// Build an assertion step with only its kind set
    pub fn assertion(kind: &str) -> Self {
        Self {
            assert: Some(kind.to_string()),
            ..Default::default()
        }
    }

    pub fn is_assertion(&self) -> bool {
        self.assert.is_some()
    }

    /// Effective timeout for this step
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.map(Duration::from_millis).unwrap_or(default)
    }

    /// Classify this step and check the fields its operation requires.
    pub fn resolve(&self, default_timeout: Duration) -> RunnerResult<ResolvedStep> {
        let op = match (&self.action, &self.assert) {
            (Some(_), Some(_)) => return Err(RunnerError::StepKindConflict),
            (None, None) => return Err(RunnerError::StepKindMissing),
            (Some(action), None) => StepOp::Action(self.resolve_action(action)?),
            (None, Some(assertion)) => StepOp::Assertion(self.resolve_assertion(assertion)?),
        };

        Ok(ResolvedStep {
            op,
            timeout: self.timeout_or(default_timeout),
        })
    }

    fn resolve_action(&self, kind: &str) -> RunnerResult<Action> {
        let action = match kind {
            "tap" => Action::Tap {
                id: self.require_id("tap")?,
                text: self.text.clone().filter(|t| !t.is_empty()),
            },
            "doubleTap" => Action::DoubleTap {
                id: self.require_id("doubleTap")?,
            },
            "longPress" => Action::LongPress {
                id: self.require_id("longPress")?,
                duration: Duration::from_millis(self.duration.unwrap_or(DEFAULT_LONG_PRESS_MS)),
            },
            "input" => Action::Input {
                id: self.require_id("input")?,
                value: require("input", "value", self.value.as_ref())?,
            },
            "clear" => Action::Clear {
                id: self.require_id("clear")?,
            },
            "scroll" => Action::Scroll {
                id: self.require_id("scroll")?,
                direction: self.require_direction("scroll")?,
                amount: self.amount.unwrap_or(DEFAULT_SCROLL_AMOUNT),
            },
            "swipe" => Action::Swipe {
                id: self.require_id("swipe")?,
                direction: self.require_direction("swipe")?,
            },
            "waitFor" => Action::WaitFor {
                id: self.require_id("waitFor")?,
            },
            "waitForAny" => match &self.ids {
                Some(ids) if !ids.is_empty() => Action::WaitForAny { ids: ids.clone() },
                _ => {
                    return Err(RunnerError::MissingStepField {
                        operation: "waitForAny",
                        field: "ids",
                    })
                }
            },
            "wait" => Action::Wait {
                duration: Duration::from_millis(require("wait", "ms", self.ms.as_ref())?),
            },
            "back" => Action::Back,
            "screenshot" => Action::Screenshot {
                name: self.name.clone(),
                path: self.path.clone(),
            },
            "alertTap" => Action::AlertTap {
                button: require("alertTap", "button", self.button.as_ref())?,
            },
            "selectOption" => Action::SelectOption {
                id: self.require_id("selectOption")?,
                selector: self.option_selector()?,
            },
            "tapItem" => Action::TapItem {
                id: self.require_id("tapItem")?,
                index: require("tapItem", "index", self.index.as_ref())?,
            },
            "selectTab" => Action::SelectTab {
                id: self.require_id("selectTab")?,
                index: require("selectTab", "index", self.index.as_ref())?,
            },
            other => return Err(RunnerError::UnknownAction(other.to_string())),
        };
        Ok(action)
    }

    fn resolve_assertion(&self, kind: &str) -> RunnerResult<Assertion> {
        let assertion = match kind {
            "visible" => Assertion::Visible {
                id: self.require_id("visible")?,
            },
            "notVisible" => Assertion::NotVisible {
                id: self.require_id("notVisible")?,
            },
            "enabled" => Assertion::Enabled {
                id: self.require_id("enabled")?,
            },
            "disabled" => Assertion::Disabled {
                id: self.require_id("disabled")?,
            },
            "text" => {
                let id = self.require_id("text")?;
                let expected = match (&self.equals, &self.contains) {
                    (Some(_), Some(_)) => {
                        return Err(RunnerError::InvalidStepField {
                            operation: "text",
                            field: "equals",
                            reason: "only one of 'equals' or 'contains' may be given".to_string(),
                        })
                    }
                    (Some(equals), None) => TextExpectation::Equals(value_as_text(equals)),
                    (None, Some(contains)) => TextExpectation::Contains(contains.clone()),
                    (None, None) => {
                        return Err(RunnerError::MissingStepField {
                            operation: "text",
                            field: "equals' or 'contains",
                        })
                    }
                };
                Assertion::Text { id, expected }
            }
            "count" => {
                let id = self.require_id("count")?;
                let expected = match &self.equals {
                    None => {
                        return Err(RunnerError::MissingStepField {
                            operation: "count",
                            field: "equals",
                        })
                    }
                    Some(value) => value.as_u64().ok_or_else(|| RunnerError::InvalidStepField {
                        operation: "count",
                        field: "equals",
                        reason: format!("expected a non-negative integer, got {}", value),
                    })?,
                };
                Assertion::Count { id, expected }
            }
            other => return Err(RunnerError::UnknownAssertion(other.to_string())),
        };
        Ok(assertion)
    }

    fn require_id(&self, operation: &'static str) -> RunnerResult<String> {
        match &self.id {
            Some(id) if !id.is_empty() => Ok(id.clone()),
            _ => Err(RunnerError::MissingStepField {
                operation,
                field: "id",
            }),
        }
    }

    fn require_direction(&self, operation: &'static str) -> RunnerResult<Direction> {
        let raw = require(operation, "direction", self.direction.as_ref())?;
        Direction::parse(operation, &raw)
    }

    fn option_selector(&self) -> RunnerResult<OptionSelector> {
        if let Some(value) = &self.value {
            Ok(OptionSelector::Value(value.clone()))
        } else if let Some(label) = &self.label {
            Ok(OptionSelector::Label(label.clone()))
        } else if let Some(index) = self.index {
            Ok(OptionSelector::Index(index))
        } else {
            Err(RunnerError::MissingStepField {
                operation: "selectOption",
                field: "value', 'label', or 'index",
            })
        }
    }

    /// Short description used in logs
    pub fn describe(&self) -> String {
        if let Some(action) = &self.action {
            let target = self
                .id
                .clone()
                .or_else(|| self.ids.as_ref().map(|ids| ids.join(",")))
                .unwrap_or_else(|| "-".to_string());
            format!("action={}, id={}", action, target)
        } else if let Some(assertion) = &self.assert {
            format!("assert={}, id={}", assertion, self.id.as_deref().unwrap_or("-"))
        } else {
            "unknown step".to_string()
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn require<T: Clone>(operation: &'static str, field: &'static str, value: Option<&T>) -> RunnerResult<T> {
    value
        .cloned()
        .ok_or(RunnerError::MissingStepField { operation, field })
}

/// Render a JSON value the way it should appear in UI text
pub fn value_as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    const DEFAULT: Duration = Duration::from_millis(5000);

    fn step(value: serde_json::Value) -> Step {
        serde_json::from_value(value).unwrap()
    }

    #[test_case("tap" ; "tap")]
    #[test_case("doubleTap" ; "double tap")]
    #[test_case("longPress" ; "long press")]
    #[test_case("input" ; "input")]
    #[test_case("clear" ; "clear")]
    #[test_case("scroll" ; "scroll")]
    #[test_case("swipe" ; "swipe")]
    #[test_case("waitFor" ; "wait for")]
    #[test_case("selectOption" ; "select option")]
    #[test_case("tapItem" ; "tap item")]
    #[test_case("selectTab" ; "select tab")]
    fn test_action_without_id_names_operation(kind: &str) {
        let err = Step::action(kind).resolve(DEFAULT).unwrap_err();
        assert_eq!(err.to_string(), format!("{} requires 'id'", kind));
    }

    #[test_case("visible")]
    #[test_case("notVisible")]
    #[test_case("enabled")]
    #[test_case("disabled")]
    #[test_case("text")]
    #[test_case("count")]
    fn test_assertion_without_id_names_operation(kind: &str) {
        let err = Step::assertion(kind).resolve(DEFAULT).unwrap_err();
        assert_eq!(err.to_string(), format!("{} requires 'id'", kind));
    }

    #[test_case(json!({"action": "input", "id": "name"}), "input requires 'value'" ; "input without value")]
    #[test_case(json!({"action": "scroll", "id": "list"}), "scroll requires 'direction'" ; "scroll without direction")]
    #[test_case(json!({"action": "swipe", "id": "list"}), "swipe requires 'direction'" ; "swipe without direction")]
    #[test_case(json!({"action": "waitForAny", "ids": []}), "waitForAny requires 'ids'" ; "wait for any with empty ids")]
    #[test_case(json!({"action": "wait"}), "wait requires 'ms'" ; "wait without ms")]
    #[test_case(json!({"action": "alertTap"}), "alertTap requires 'button'" ; "alert tap without button")]
    #[test_case(json!({"action": "tapItem", "id": "list"}), "tapItem requires 'index'" ; "tap item without index")]
    #[test_case(json!({"action": "selectTab", "id": "tabs"}), "selectTab requires 'index'" ; "select tab without index")]
    #[test_case(json!({"assert": "count", "id": "row"}), "count requires 'equals'" ; "count without equals")]
    fn test_missing_required_field(raw: serde_json::Value, message: &str) {
        let err = step(raw).resolve(DEFAULT).unwrap_err();
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn test_both_or_neither_kind_is_rejected() {
        let both = step(json!({"action": "tap", "assert": "visible", "id": "x"}));
        let neither = step(json!({"id": "x"}));

        let err = both.resolve(DEFAULT).unwrap_err();
        assert!(err.to_string().contains("must have either"));
        let err = neither.resolve(DEFAULT).unwrap_err();
        assert!(err.to_string().contains("must have either"));
    }

    #[test]
    fn test_unknown_operations() {
        let err = Step::action("pinch").resolve(DEFAULT).unwrap_err();
        assert_eq!(err.to_string(), "Unknown action: pinch");
        let err = Step::assertion("focused").resolve(DEFAULT).unwrap_err();
        assert_eq!(err.to_string(), "Unknown assertion: focused");
    }

    #[test]
    fn test_step_timeout_overrides_default() {
        let resolved = step(json!({"action": "tap", "id": "ok", "timeout": 250}))
            .resolve(DEFAULT)
            .unwrap();
        assert_eq!(resolved.timeout, Duration::from_millis(250));

        let resolved = Step::action("back").resolve(DEFAULT).unwrap();
        assert_eq!(resolved.timeout, DEFAULT);
        assert_eq!(resolved.op, StepOp::Action(Action::Back));
    }

    #[test]
    fn test_text_assertion_requires_exactly_one_expectation() {
        let both = step(json!({"assert": "text", "id": "t", "equals": "a", "contains": "b"}));
        assert!(both.resolve(DEFAULT).is_err());

        let neither = step(json!({"assert": "text", "id": "t"}));
        let err = neither.resolve(DEFAULT).unwrap_err();
        assert!(err.to_string().starts_with("text requires"));

        let numeric = step(json!({"assert": "text", "id": "t", "equals": 42}));
        let resolved = numeric.resolve(DEFAULT).unwrap();
        assert_eq!(
            resolved.op,
            StepOp::Assertion(Assertion::Text {
                id: "t".to_string(),
                expected: TextExpectation::Equals("42".to_string()),
            })
        );
    }

    #[test]
    fn test_count_requires_integer_equals() {
        let err = step(json!({"assert": "count", "id": "row", "equals": "3"}))
            .resolve(DEFAULT)
            .unwrap_err();
        assert!(err.to_string().contains("non-negative integer"));

        let resolved = step(json!({"assert": "count", "id": "row", "equals": 3}))
            .resolve(DEFAULT)
            .unwrap();
        assert_eq!(
            resolved.op,
            StepOp::Assertion(Assertion::Count {
                id: "row".to_string(),
                expected: 3,
            })
        );
    }

    #[test]
    fn test_select_option_priority() {
        let resolved = step(json!({"action": "selectOption", "id": "s", "label": "Two", "index": 1}))
            .resolve(DEFAULT)
            .unwrap();
        assert_eq!(
            resolved.op,
            StepOp::Action(Action::SelectOption {
                id: "s".to_string(),
                selector: OptionSelector::Label("Two".to_string()),
            })
        );

        let err = step(json!({"action": "selectOption", "id": "s"}))
            .resolve(DEFAULT)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "selectOption requires 'value', 'label', or 'index'"
        );
    }

    #[test]
    fn test_invalid_direction() {
        let err = step(json!({"action": "swipe", "id": "card", "direction": "sideways"}))
            .resolve(DEFAULT)
            .unwrap_err();
        assert!(err.to_string().starts_with("swipe has invalid 'direction'"));
    }

    #[test]
    fn test_defaults_for_gestures() {
        let resolved = step(json!({"action": "longPress", "id": "item"}))
            .resolve(DEFAULT)
            .unwrap();
        assert_eq!(
            resolved.op,
            StepOp::Action(Action::LongPress {
                id: "item".to_string(),
                duration: Duration::from_millis(DEFAULT_LONG_PRESS_MS),
            })
        );

        let resolved = step(json!({"action": "scroll", "id": "list", "direction": "down"}))
            .resolve(DEFAULT)
            .unwrap();
        assert_eq!(
            resolved.op,
            StepOp::Action(Action::Scroll {
                id: "list".to_string(),
                direction: Direction::Down,
                amount: DEFAULT_SCROLL_AMOUNT,
            })
        );
    }

    #[test]
    fn test_describe() {
        let s = step(json!({"action": "waitForAny", "ids": ["a", "b"]}));
        assert_eq!(s.describe(), "action=waitForAny, id=a,b");
        assert_eq!(step(json!({})).describe(), "unknown step");
    }
}
