//! Test definitions: screen tests, flow tests and their building blocks

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::resolve::ResolutionContext;
use crate::step::Step;

/// Named argument values used for `@{name}` substitution
pub type ArgMap = serde_json::Map<String, serde_json::Value>;

/// Platform restriction: a single platform, `"all"`, or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlatformTarget {
    One(String),
    Many(Vec<String>),
}

impl PlatformTarget {
    pub fn includes(&self, platform: &str) -> bool {
        match self {
            PlatformTarget::One(target) => target == platform || target == "all",
            PlatformTarget::Many(targets) => targets.iter().any(|t| t == platform),
        }
    }
}

/// No restriction means every platform
pub fn platform_includes(target: Option<&PlatformTarget>, platform: &str) -> bool {
    target.map_or(true, |t| t.includes(platform))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Layout (and optional spec) the screen test was written against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSource {
    pub layout: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTestSource {
    pub layout: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub skip: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformTarget>,

    /// Opaque hint for the application under test
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<serde_json::Value>,

    /// Default values for `@{name}` placeholders
    #[serde(default, skip_serializing_if = "ArgMap::is_empty")]
    pub args: ArgMap,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl TestCase {
    /// Whether this case is skipped on `platform`, and why
    pub fn skip_reason(&self, platform: &str) -> Option<&'static str> {
        if self.skip {
            Some("marked skip")
        } else if !platform_includes(self.platform.as_ref(), platform) {
            Some("platform mismatch")
        } else {
            None
        }
    }
}

/// A test of a single screen with several named cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenTest {
    pub source: TestSource,

    pub metadata: TestMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformTarget>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<Vec<Step>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teardown: Option<Vec<Step>>,

    pub cases: Vec<TestCase>,
}

impl ScreenTest {
    pub fn find_case(&self, name: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub name: String,

    /// 1-based index of the main flow step after which this checkpoint fires
    pub after_step: usize,

    #[serde(default)]
    pub screenshot: bool,
}

/// A journey across screens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<FlowTestSource>>,

    pub metadata: TestMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformTarget>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<Vec<FlowStep>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teardown: Option<Vec<FlowStep>>,

    pub steps: Vec<FlowStep>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checkpoints: Vec<Checkpoint>,
}

impl FlowTest {
    /// Checkpoints that fire once `completed` main steps have run
    pub fn checkpoints_after(&self, completed: usize) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints
            .iter()
            .filter(move |c| c.after_step == completed)
    }
}

/// Delegation to some or all cases of a screen test in another file
#[derive(Debug, Clone, PartialEq)]
pub struct FileReference {
    pub file: String,
    pub case: Option<String>,
    pub cases: Option<Vec<String>>,
    pub args: ArgMap,
    pub screen: Option<String>,
}

/// An inline group of plain steps
#[derive(Debug, Clone, PartialEq)]
pub struct StepBlock {
    pub name: String,
    pub screen: Option<String>,
    pub steps: Vec<Step>,
}

/// One entry of a flow's step list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFlowStep", into = "RawFlowStep")]
pub enum FlowStep {
    FileReference(FileReference),
    Block(StepBlock),
    Inline { screen: Option<String>, step: Step },
}

impl FlowStep {
    /// Screen label, for logging only
    pub fn screen(&self) -> Option<&str> {
        match self {
            FlowStep::FileReference(r) => r.screen.as_deref(),
            FlowStep::Block(b) => b.screen.as_deref(),
            FlowStep::Inline { screen, .. } => screen.as_deref(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FlowStep::FileReference(r) => match (&r.case, &r.cases) {
                (Some(case), _) => format!("file={} case={}", r.file, case),
                (None, Some(cases)) => format!("file={} cases={}", r.file, cases.join(",")),
                (None, None) => format!("file={} (all cases)", r.file),
            },
            FlowStep::Block(b) => format!("block={} ({} steps)", b.name, b.steps.len()),
            FlowStep::Inline { step, .. } => step.describe(),
        }
    }
}

/// Wire shape of a flow step: a plain step plus flow-only fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFlowStep {
    #[serde(flatten)]
    pub step: Step,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cases: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "ArgMap::is_empty")]
    pub args: ArgMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,

    /// Inner steps of a block; these must be plain steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<RawFlowStep>>,
}

impl RawFlowStep {
    fn is_plain(&self) -> bool {
        self.file.is_none() && self.block.is_none() && self.steps.is_none()
    }
}

impl TryFrom<RawFlowStep> for FlowStep {
    type Error = String;

    fn try_from(raw: RawFlowStep) -> Result<Self, Self::Error> {
        let has_operation = raw.step.action.is_some() || raw.step.assert.is_some();

        if let Some(file) = raw.file {
            if raw.block.is_some() {
                return Err(format!("flow step for file '{}' cannot also be a block", file));
            }
            if has_operation {
                return Err(format!(
                    "flow step for file '{}' cannot also have 'action' or 'assert'",
                    file
                ));
            }
            return Ok(FlowStep::FileReference(FileReference {
                file,
                case: raw.case,
                cases: raw.cases,
                args: raw.args,
                screen: raw.screen,
            }));
        }

        if let Some(name) = raw.block {
            if has_operation {
                return Err(format!(
                    "block '{}' cannot also have 'action' or 'assert'",
                    name
                ));
            }
            let steps = raw
                .steps
                .ok_or_else(|| format!("block '{}' is missing 'steps'", name))?
                .into_iter()
                .enumerate()
                .map(|(index, inner)| {
                    if inner.is_plain() {
                        Ok(inner.step)
                    } else {
                        Err(format!(
                            "block '{}' step {} cannot reference a file or nest a block",
                            name,
                            index + 1
                        ))
                    }
                })
                .collect::<Result<Vec<Step>, String>>()?;
            return Ok(FlowStep::Block(StepBlock {
                name,
                screen: raw.screen,
                steps,
            }));
        }

        Ok(FlowStep::Inline {
            screen: raw.screen,
            step: raw.step,
        })
    }
}

impl From<FlowStep> for RawFlowStep {
    fn from(step: FlowStep) -> Self {
        match step {
            FlowStep::FileReference(r) => RawFlowStep {
                screen: r.screen,
                file: Some(r.file),
                case: r.case,
                cases: r.cases,
                args: r.args,
                ..Default::default()
            },
            FlowStep::Block(b) => RawFlowStep {
                screen: b.screen,
                block: Some(b.name),
                steps: Some(
                    b.steps
                        .into_iter()
                        .map(|step| RawFlowStep {
                            step,
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            },
            FlowStep::Inline { screen, step } => RawFlowStep {
                step,
                screen,
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Screen,
    Flow,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Screen => "screen",
            TestKind::Flow => "flow",
        }
    }
}

/// A validated test together with the file it came from
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedTest {
    Screen { test: ScreenTest, file_path: PathBuf },
    Flow { test: FlowTest, file_path: PathBuf },
}

impl LoadedTest {
    pub fn kind(&self) -> TestKind {
        match self {
            LoadedTest::Screen { .. } => TestKind::Screen,
            LoadedTest::Flow { .. } => TestKind::Flow,
        }
    }

    pub fn metadata(&self) -> &TestMetadata {
        match self {
            LoadedTest::Screen { test, .. } => &test.metadata,
            LoadedTest::Flow { test, .. } => &test.metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    pub fn file_path(&self) -> &Path {
        match self {
            LoadedTest::Screen { file_path, .. } | LoadedTest::Flow { file_path, .. } => file_path,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata().tags.iter().any(|t| t == tag)
    }

    /// Context for resolving this test's own file references
    pub fn resolution_context(&self) -> ResolutionContext {
        ResolutionContext::for_test_file(self.file_path())
    }
}

/// Keep only tests tagged with `tag`
pub fn filter_by_tag<'a>(tests: &'a [LoadedTest], tag: &str) -> Vec<&'a LoadedTest> {
    tests.iter().filter(|t| t.has_tag(tag)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_target() {
        let ios: PlatformTarget = serde_json::from_value(json!("ios")).unwrap();
        let all: PlatformTarget = serde_json::from_value(json!("all")).unwrap();
        let list: PlatformTarget = serde_json::from_value(json!(["ios", "web"])).unwrap();

        assert!(!ios.includes("web"));
        assert!(all.includes("web"));
        assert!(list.includes("web"));
        assert!(!list.includes("android"));
        assert!(platform_includes(None, "web"));
    }

    #[test]
    fn test_flow_step_shapes() {
        let file: FlowStep =
            serde_json::from_value(json!({"file": "login", "case": "happyPath", "args": {"user": "amy"}}))
                .unwrap();
        let block: FlowStep = serde_json::from_value(json!({
            "block": "fill form",
            "steps": [{"action": "tap", "id": "submit"}]
        }))
        .unwrap();
        let inline: FlowStep =
            serde_json::from_value(json!({"screen": "home", "assert": "visible", "id": "title"}))
                .unwrap();

        match file {
            FlowStep::FileReference(r) => {
                assert_eq!(r.file, "login");
                assert_eq!(r.case.as_deref(), Some("happyPath"));
                assert_eq!(r.args.get("user"), Some(&json!("amy")));
            }
            other => panic!("expected file reference, got {:?}", other),
        }
        assert!(matches!(block, FlowStep::Block(ref b) if b.steps.len() == 1));
        assert_eq!(inline.screen(), Some("home"));
        assert!(matches!(inline, FlowStep::Inline { ref step, .. } if step.is_assertion()));
    }

    #[test]
    fn test_ambiguous_flow_steps_are_rejected() {
        let file_and_block = serde_json::from_value::<FlowStep>(json!({
            "file": "login", "block": "b", "steps": []
        }));
        let file_and_action =
            serde_json::from_value::<FlowStep>(json!({"file": "login", "action": "tap", "id": "x"}));
        let block_and_assert = serde_json::from_value::<FlowStep>(json!({
            "block": "b", "steps": [], "assert": "visible", "id": "x"
        }));
        let block_without_steps = serde_json::from_value::<FlowStep>(json!({"block": "b"}));

        assert!(file_and_block.is_err());
        assert!(file_and_action.is_err());
        assert!(block_and_assert.is_err());
        assert!(block_without_steps.is_err());
    }

    #[test]
    fn test_block_steps_must_be_plain() {
        let nested_file = serde_json::from_value::<FlowStep>(json!({
            "block": "pay",
            "steps": [{"action": "tap", "id": "a"}, {"file": "login"}]
        }))
        .unwrap_err();
        assert!(
            nested_file
                .to_string()
                .contains("block 'pay' step 2 cannot reference a file or nest a block"),
            "{}",
            nested_file
        );

        let nested_block = serde_json::from_value::<FlowStep>(json!({
            "block": "outer",
            "steps": [{"block": "inner", "steps": []}]
        }))
        .unwrap_err();
        assert!(nested_block.to_string().contains("block 'outer' step 1"));
    }

    #[test]
    fn test_block_round_trips_through_wire_shape() {
        let block: FlowStep = serde_json::from_value(json!({
            "block": "pay",
            "screen": "Checkout",
            "steps": [{"action": "tap", "id": "pay"}]
        }))
        .unwrap();
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["steps"], json!([{"action": "tap", "id": "pay"}]));
        assert_eq!(serde_json::from_value::<FlowStep>(value).unwrap(), block);
    }

    #[test]
    fn test_inline_step_without_operation_still_loads() {
        let step: FlowStep = serde_json::from_value(json!({"screen": "home", "id": "x"})).unwrap();
        assert!(matches!(step, FlowStep::Inline { .. }));
    }

    #[test]
    fn test_case_skip_reason() {
        let case: TestCase = serde_json::from_value(json!({
            "name": "ios only",
            "platform": ["ios"],
            "steps": []
        }))
        .unwrap();
        assert_eq!(case.skip_reason("web"), Some("platform mismatch"));
        assert_eq!(case.skip_reason("ios"), None);

        let skipped = TestCase {
            skip: true,
            ..case
        };
        assert_eq!(skipped.skip_reason("ios"), Some("marked skip"));
    }

    #[test]
    fn test_flow_step_serializes_back_to_wire_shape() {
        let step: FlowStep = serde_json::from_value(json!({"file": "login", "cases": ["a", "b"]})).unwrap();
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value, json!({"file": "login", "cases": ["a", "b"]}));
    }
}
