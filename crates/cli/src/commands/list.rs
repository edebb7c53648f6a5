//! List Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use jsonui_test::{LoadedTest, TestLoader};

use crate::output::{print_list, print_warning, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ListArgs {
    /// Test file or directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Only tests carrying this tag
    #[arg(long)]
    pub tag: Option<String>,
}

/// One discovered test
#[derive(Serialize)]
pub struct TestDisplay {
    pub kind: String,
    pub name: String,
    pub units: String,
    pub tags: Vec<String>,
    pub file: String,
}

impl From<&LoadedTest> for TestDisplay {
    fn from(test: &LoadedTest) -> Self {
        let units = match test {
            LoadedTest::Screen { test, .. } => format!("{} cases", test.cases.len()),
            LoadedTest::Flow { test, .. } => format!("{} steps", test.steps.len()),
        };
        Self {
            kind: test.kind().as_str().to_string(),
            name: test.name().to_string(),
            units,
            tags: test.metadata().tags.clone(),
            file: test.file_path().display().to_string(),
        }
    }
}

impl TableDisplay for TestDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Kind", "Name", "Cases/Steps", "Tags", "File"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.kind.clone(),
            self.name.clone(),
            self.units.clone(),
            self.tags.join(", "),
            self.file.clone(),
        ]
    }
}

/// Files that fail to load are reported but do not hide the others
pub fn execute(args: ListArgs, format: OutputFormat) -> Result<bool> {
    let files = if args.path.is_dir() {
        TestLoader::find_test_files(&args.path)?
    } else {
        vec![args.path.clone()]
    };

    let mut ok = true;
    let mut displays = Vec::new();
    for file in &files {
        match TestLoader::load_file(file) {
            Ok(test) => {
                if args.tag.as_deref().map_or(true, |tag| test.has_tag(tag)) {
                    displays.push(TestDisplay::from(&test));
                }
            }
            Err(e) => {
                ok = false;
                print_warning(&e.to_string());
            }
        }
    }

    print_list(&displays, format);
    Ok(ok)
}
