//! Flow composition: resolving file references to concrete screen test cases
//!
//! Every flow carries its own [`ResolutionContext`], anchored at the directory
//! of the flow file, so two flows can be resolved side by side without sharing
//! any state.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RunnerError, RunnerResult};
use crate::loader::{TestLoader, JSON_SUFFIX, TEST_FILE_SUFFIX};
use crate::model::{FileReference, LoadedTest, ScreenTest, TestCase};
use crate::substitution::substitute_case;

/// Name of the directory that conventionally holds screen tests
pub const SCREENS_DIR: &str = "screens";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    base_dir: PathBuf,
}

impl ResolutionContext {
    /// Context for references written inside `file`.
    ///
    /// Relative paths are taken from the working directory.
    pub fn for_test_file(file: &Path) -> Self {
        let file = std::path::absolute(file).unwrap_or_else(|_| file.to_path_buf());
        let base_dir = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self { base_dir }
    }

    /// Context anchored directly at `dir`
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Candidate paths for `file_ref`, in search order.
    ///
    /// The sibling `screens/` directory (next to the flow's own directory) is
    /// searched before the flow's directory.
    pub fn candidates(&self, file_ref: &str) -> Vec<PathBuf> {
        let parent = match self.base_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => self.base_dir.join(".."),
        };
        let screens = parent.join(SCREENS_DIR);
        let with = |suffix: &str| format!("{}{}", file_ref, suffix);

        vec![
            screens.join(file_ref).join(with(TEST_FILE_SUFFIX)),
            screens.join(file_ref).join(with(JSON_SUFFIX)),
            screens.join(with(TEST_FILE_SUFFIX)),
            screens.join(with(JSON_SUFFIX)),
            self.base_dir.join(with(TEST_FILE_SUFFIX)),
            self.base_dir.join(with(JSON_SUFFIX)),
            self.base_dir.join(file_ref),
        ]
    }

    /// First existing candidate for `file_ref`
    pub fn resolve_path(&self, file_ref: &str) -> RunnerResult<PathBuf> {
        self.candidates(file_ref)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| RunnerError::TestFileNotFound(file_ref.to_string()))
    }

    /// Load the screen test a reference points to
    pub fn resolve_screen_test(&self, file_ref: &str) -> RunnerResult<ScreenTest> {
        let path = self.resolve_path(file_ref)?;
        debug!("Resolved file reference '{}' to {}", file_ref, path.display());

        match TestLoader::load_file(&path)? {
            LoadedTest::Screen { test, .. } => Ok(test),
            LoadedTest::Flow { .. } => Err(RunnerError::NotAScreenTest(file_ref.to_string())),
        }
    }

    /// Resolve a file reference into the concrete cases it selects, with the
    /// reference's `args` applied.
    pub fn resolve_cases(&self, reference: &FileReference) -> RunnerResult<Vec<TestCase>> {
        let screen = self.resolve_screen_test(&reference.file)?;
        select_cases(&screen, reference)
    }
}

/// Pick the cases a reference names (all cases when it names none), in the
/// order requested, and substitute their placeholders.
pub fn select_cases(screen: &ScreenTest, reference: &FileReference) -> RunnerResult<Vec<TestCase>> {
    let find = |name: &str| {
        screen
            .find_case(name)
            .ok_or_else(|| RunnerError::CaseNotFound {
                case: name.to_string(),
                file: reference.file.clone(),
            })
    };

    let selected: Vec<&TestCase> = match (&reference.case, &reference.cases) {
        (Some(case), _) => vec![find(case.as_str())?],
        (None, Some(cases)) if !cases.is_empty() => cases
            .iter()
            .map(|name| find(name.as_str()))
            .collect::<RunnerResult<_>>()?,
        _ => screen.cases.iter().collect(),
    };

    Ok(selected
        .into_iter()
        .map(|case| substitute_case(case, &reference.args))
        .map(Cow::into_owned)
        .collect())
}
