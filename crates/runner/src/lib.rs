//! JsonUI Test Runner
//!
//! Executes declarative JSON UI tests against an application through an
//! [`ElementDriver`]:
//! - Loads `*.test.json` screen and flow tests and validates their shape
//! - Resolves flow file references to cases of screen tests in other files
//! - Substitutes `@{name}` placeholders from case defaults and call-site args
//! - Dispatches each step to the action or assertion executor
//! - Aggregates pass/fail results with timing and failure screenshots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  TestLoader                                                 │
//! │    ├── load_file / load_dir -> LoadedTest                   │
//! │    └── type: "screen" | "flow"                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ResolutionContext (per flow file)                          │
//! │    ├── file reference -> screens/<f>/<f>.test.json, ...     │
//! │    └── case | cases | all -> substitute_case(args)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── run_screen_test -> one result per case               │
//! │    ├── run_flow_test   -> one "flow" result                 │
//! │    └── execute_step -> Step::resolve -> StepOp              │
//! │          ├── ActionExecutor    (tap, input, swipe, ...)     │
//! │          └── AssertionExecutor (visible, text, count, ...)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ElementDriver (browser / device / ScriptedDriver)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod assertions;
pub mod check;
pub mod config;
pub mod driver;
pub mod error;
pub mod loader;
pub mod model;
pub mod resolve;
pub mod result;
pub mod runner;
pub mod step;
pub mod substitution;

pub use check::{check_test, Problem};
pub use config::RunnerConfig;
pub use driver::{DriverError, DriverResult, ElementDriver, FakeElement, ScriptedDriver};
pub use error::{RunnerError, RunnerResult};
pub use loader::TestLoader;
pub use model::{filter_by_tag, FlowStep, FlowTest, LoadedTest, ScreenTest, TestCase, TestKind};
pub use resolve::ResolutionContext;
pub use result::{write_results, RunReport, TestResult, TestSuiteResult};
pub use runner::TestRunner;
pub use step::{Action, Assertion, Step, StepOp};
