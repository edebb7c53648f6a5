//! Loading test definitions from JSON

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};
use crate::model::{FlowTest, LoadedTest, ScreenTest};

/// Suffix every discoverable test file carries
pub const TEST_FILE_SUFFIX: &str = ".test.json";

/// Plain JSON, accepted for referenced files
pub const JSON_SUFFIX: &str = ".json";

/// Stateless loader; each call carries the path it works on
pub struct TestLoader;

impl TestLoader {
    /// Load a single test file
    pub fn load_file(path: &Path) -> RunnerResult<LoadedTest> {
        let absolute = std::path::absolute(path).map_err(|source| RunnerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let content = fs::read_to_string(&absolute).map_err(|source| RunnerError::Read {
            path: absolute.clone(),
            source,
        })?;
        debug!("Loading test file: {}", absolute.display());
        Self::load_str(&content, &absolute)
    }

    /// Parse a test from JSON text; `file_path` anchors its file references
    pub fn load_str(json: &str, file_path: &Path) -> RunnerResult<LoadedTest> {
        let path = file_path.display().to_string();
        let data: Value = serde_json::from_str(json).map_err(|source| RunnerError::Definition {
            path: path.clone(),
            source,
        })?;

        match data.get("type") {
            None | Some(Value::Null) => Err(RunnerError::MissingType { path }),
            Some(Value::String(kind)) if kind == "screen" => Ok(LoadedTest::Screen {
                test: validate_screen_test(data, &path)?,
                file_path: file_path.to_path_buf(),
            }),
            Some(Value::String(kind)) if kind == "flow" => Ok(LoadedTest::Flow {
                test: validate_flow_test(data, &path)?,
                file_path: file_path.to_path_buf(),
            }),
            Some(Value::String(kind)) => Err(RunnerError::UnknownType {
                kind: kind.clone(),
                path,
            }),
            Some(other) => Err(RunnerError::UnknownType {
                kind: other.to_string(),
                path,
            }),
        }
    }

    /// Load every test file under `dir`, stopping at the first failure
    pub fn load_dir(dir: &Path) -> RunnerResult<Vec<LoadedTest>> {
        Self::find_test_files(dir)?
            .iter()
            .map(|file| Self::load_file(file))
            .collect()
    }

    /// Load a file, or every test file below a directory
    pub fn load_path(path: &Path) -> RunnerResult<Vec<LoadedTest>> {
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            Ok(vec![Self::load_file(path)?])
        }
    }

    /// Recursively find `*.test.json` files, sorted by path
    pub fn find_test_files(dir: &Path) -> RunnerResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let is_test_file = entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| name.ends_with(TEST_FILE_SUFFIX))
                    .unwrap_or(false);
            if is_test_file {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn has_name(metadata: &Value) -> bool {
    match metadata.get("name") {
        Some(Value::String(name)) => !name.is_empty(),
        _ => false,
    }
}

fn is_empty_list(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Array(items)) => items.is_empty(),
        _ => true,
    }
}

fn validate_screen_test(data: Value, path: &str) -> RunnerResult<ScreenTest> {
    let missing = |field| RunnerError::MissingField {
        kind: "Screen",
        path: path.to_string(),
        field,
    };

    if is_missing(data.get("source")) {
        return Err(missing("source"));
    }
    match data.get("metadata") {
        None | Some(Value::Null) => return Err(missing("metadata")),
        Some(metadata) if !has_name(metadata) => return Err(missing("metadata.name")),
        Some(_) => {}
    }
    if is_empty_list(data.get("cases")) {
        return Err(RunnerError::NoCases(path.to_string()));
    }

    let test: ScreenTest = serde_json::from_value(data).map_err(|source| RunnerError::Definition {
        path: path.to_string(),
        source,
    })?;
    if test.source.layout.is_empty() {
        return Err(missing("source.layout"));
    }
    Ok(test)
}

fn validate_flow_test(data: Value, path: &str) -> RunnerResult<FlowTest> {
    let missing = |field| RunnerError::MissingField {
        kind: "Flow",
        path: path.to_string(),
        field,
    };

    // `sources` is optional: flows built from file references do not need it
    match data.get("metadata") {
        None | Some(Value::Null) => return Err(missing("metadata")),
        Some(metadata) if !has_name(metadata) => return Err(missing("metadata.name")),
        Some(_) => {}
    }
    if is_empty_list(data.get("steps")) {
        return Err(RunnerError::NoSteps(path.to_string()));
    }

    serde_json::from_value(data).map_err(|source| RunnerError::Definition {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlowStep, TestKind};
    use serde_json::json;
    use tempfile::TempDir;

    fn screen_json() -> Value {
        json!({
            "type": "screen",
            "source": {"layout": "login"},
            "metadata": {"name": "Login", "tags": ["auth"]},
            "cases": [
                {"name": "happyPath", "steps": [{"action": "tap", "id": "submit"}]}
            ]
        })
    }

    fn load(value: Value) -> RunnerResult<LoadedTest> {
        TestLoader::load_str(&value.to_string(), Path::new("/tests/screens/login.test.json"))
    }

    #[test]
    fn test_load_screen_test() {
        let loaded = load(screen_json()).unwrap();
        assert_eq!(loaded.kind(), TestKind::Screen);
        assert_eq!(loaded.name(), "Login");
        assert!(loaded.has_tag("auth"));
        assert_eq!(loaded.file_path(), Path::new("/tests/screens/login.test.json"));
    }

    #[test]
    fn test_missing_or_unknown_type() {
        let mut data = screen_json();
        data.as_object_mut().unwrap().remove("type");
        let err = load(data).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Test file '/tests/screens/login.test.json' is missing 'type' field"
        );

        let mut data = screen_json();
        data["type"] = json!("widget");
        let err = load(data).unwrap_err();
        assert!(err.to_string().contains("Unknown test type 'widget'"));
        assert!(err.to_string().contains("login.test.json"));
    }

    #[test]
    fn test_screen_validation_names_the_field() {
        let mut data = screen_json();
        data.as_object_mut().unwrap().remove("source");
        assert!(load(data).unwrap_err().to_string().contains("missing 'source'"));

        let mut data = screen_json();
        data["metadata"]["name"] = json!("");
        assert!(load(data).unwrap_err().to_string().contains("missing 'metadata.name'"));

        let mut data = screen_json();
        data["cases"] = json!([]);
        assert!(matches!(load(data), Err(RunnerError::NoCases(_))));

        let mut data = screen_json();
        data["source"]["layout"] = json!("");
        assert!(load(data).unwrap_err().to_string().contains("missing 'source.layout'"));
    }

    #[test]
    fn test_flow_validation() {
        let flow = json!({
            "type": "flow",
            "metadata": {"name": "Checkout"},
            "steps": [
                {"file": "login", "case": "happyPath"},
                {"screen": "cart", "action": "tap", "id": "checkout"}
            ]
        });
        let loaded = load(flow.clone()).unwrap();
        match &loaded {
            LoadedTest::Flow { test, .. } => {
                assert!(test.sources.is_none());
                assert!(matches!(test.steps[0], FlowStep::FileReference(_)));
            }
            other => panic!("expected flow, got {:?}", other.kind()),
        }

        let mut no_steps = flow.clone();
        no_steps["steps"] = json!([]);
        assert!(matches!(load(no_steps), Err(RunnerError::NoSteps(_))));

        let mut no_name = flow;
        no_name["metadata"] = json!({});
        assert!(load(no_name).unwrap_err().to_string().contains("metadata.name"));
    }

    #[test]
    fn test_steps_are_not_validated_at_load() {
        let mut data = screen_json();
        data["cases"][0]["steps"] = json!([{"id": "orphan"}, {"action": "teleport"}]);
        assert!(load(data).is_ok());
    }

    #[test]
    fn test_malformed_json() {
        let err = TestLoader::load_str("{ not json", Path::new("broken.test.json")).unwrap_err();
        assert!(matches!(err, RunnerError::Definition { .. }));
    }

    #[test]
    fn test_directory_discovery() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("screens/login");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("login.test.json"), screen_json().to_string()).unwrap();
        fs::write(dir.path().join("notes.json"), "{}").unwrap();
        fs::write(dir.path().join("README.md"), "docs").unwrap();

        let files = TestLoader::find_test_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("screens/login/login.test.json"));

        let tests = TestLoader::load_dir(dir.path()).unwrap();
        assert_eq!(tests.len(), 1);
        assert!(tests[0].file_path().is_absolute());
    }

    #[test]
    fn test_directory_load_propagates_first_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.test.json"), screen_json().to_string()).unwrap();
        fs::write(dir.path().join("b.test.json"), r#"{"metadata": {"name": "x"}}"#).unwrap();

        let err = TestLoader::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, RunnerError::MissingType { .. }));
    }
}
