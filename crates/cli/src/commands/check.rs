//! Check Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use jsonui_test::{check_test, TestLoader};

use crate::output::{print_error, print_success};

#[derive(Args)]
pub struct CheckArgs {
    /// Test file or directory
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

pub fn execute(args: CheckArgs) -> Result<bool> {
    let files = if args.path.is_dir() {
        TestLoader::find_test_files(&args.path)?
    } else {
        vec![args.path.clone()]
    };

    let mut problem_count = 0;
    for file in &files {
        let problems: Vec<String> = match TestLoader::load_file(file) {
            Ok(test) => check_test(&test).iter().map(ToString::to_string).collect(),
            Err(e) => vec![e.to_string()],
        };

        if problems.is_empty() {
            println!("{} {}", "ok".green(), file.display());
            continue;
        }
        println!("{} {}", "FAIL".red().bold(), file.display());
        for problem in &problems {
            println!("    {}", problem);
        }
        problem_count += problems.len();
    }

    if problem_count == 0 {
        print_success(&format!("{} file(s) checked, no problems", files.len()));
        Ok(true)
    } else {
        print_error(&format!(
            "{} problem(s) in {} file(s) checked",
            problem_count,
            files.len()
        ));
        Ok(false)
    }
}
