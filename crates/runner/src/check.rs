//! Static checking of loaded tests
//!
//! Running a test only reports the first broken step of each unit. This walks
//! everything up front: every step is classified, every file reference is
//! resolved, and leftover placeholders and unreachable checkpoints are flagged.

use std::fmt;
use std::time::Duration;

use crate::model::{ArgMap, FlowStep, FlowTest, LoadedTest, ScreenTest};
use crate::resolve::ResolutionContext;
use crate::step::Step;
use crate::substitution::{placeholders, substitute_case};

/// One problem found in a test file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// Where in the test, e.g. `case 'login' step 2`
    pub location: String,
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Every problem in `test`; empty when the test is runnable as written
pub fn check_test(test: &LoadedTest) -> Vec<Problem> {
    let mut checker = Checker::default();
    match test {
        LoadedTest::Screen { test, .. } => checker.screen(test),
        LoadedTest::Flow { test: flow, .. } => checker.flow(flow, &test.resolution_context()),
    }
    checker.problems
}

#[derive(Default)]
struct Checker {
    problems: Vec<Problem>,
}

impl Checker {
    fn report(&mut self, location: String, message: impl Into<String>) {
        self.problems.push(Problem {
            location,
            message: message.into(),
        });
    }

    fn screen(&mut self, test: &ScreenTest) {
        if let Some(setup) = &test.setup {
            self.steps("setup", setup);
        }
        for case in &test.cases {
            let case = substitute_case(case, &ArgMap::new());
            self.steps(&format!("case '{}'", case.name), &case.steps);
        }
        if let Some(teardown) = &test.teardown {
            self.steps("teardown", teardown);
        }
    }

    fn flow(&mut self, test: &FlowTest, ctx: &ResolutionContext) {
        if let Some(setup) = &test.setup {
            self.flow_steps("setup", setup, ctx);
        }
        self.flow_steps("flow", &test.steps, ctx);
        if let Some(teardown) = &test.teardown {
            self.flow_steps("teardown", teardown, ctx);
        }

        for checkpoint in &test.checkpoints {
            if checkpoint.after_step == 0 || checkpoint.after_step > test.steps.len() {
                self.report(
                    format!("checkpoint '{}'", checkpoint.name),
                    format!(
                        "afterStep {} is outside 1..={}, it never fires",
                        checkpoint.after_step,
                        test.steps.len()
                    ),
                );
            }
        }
    }

    fn flow_steps(&mut self, section: &str, steps: &[FlowStep], ctx: &ResolutionContext) {
        for (index, step) in steps.iter().enumerate() {
            let location = format!("{} step {}", section, index + 1);
            match step {
                FlowStep::FileReference(reference) => match ctx.resolve_cases(reference) {
                    Ok(cases) => {
                        for case in cases {
                            self.steps(
                                &format!("{} ({} case '{}')", location, reference.file, case.name),
                                &case.steps,
                            );
                        }
                    }
                    Err(e) => self.report(location, e.to_string()),
                },
                FlowStep::Block(block) => {
                    self.steps(&format!("{} (block '{}')", location, block.name), &block.steps);
                }
                FlowStep::Inline { step, .. } => self.step(location, step),
            }
        }
    }

    fn steps(&mut self, section: &str, steps: &[Step]) {
        for (index, step) in steps.iter().enumerate() {
            self.step(format!("{} step {}", section, index + 1), step);
        }
    }

    fn step(&mut self, location: String, step: &Step) {
        if let Err(e) = step.resolve(Duration::ZERO) {
            self.report(location.clone(), e.to_string());
        }
        for field in substitutable_text(step) {
            for name in placeholders(field) {
                self.report(location.clone(), format!("unresolved placeholder '@{{{}}}'", name));
            }
        }
    }
}

/// String fields of a step that take part in substitution
fn substitutable_text(step: &Step) -> Vec<&str> {
    let mut fields: Vec<&str> = [
        &step.id,
        &step.text,
        &step.value,
        &step.contains,
        &step.button,
        &step.label,
    ]
    .into_iter()
    .filter_map(|field| field.as_deref())
    .collect();

    if let Some(ids) = &step.ids {
        fields.extend(ids.iter().map(String::as_str));
    }
    if let Some(serde_json::Value::String(equals)) = &step.equals {
        fields.push(equals);
    }
    fields
}
