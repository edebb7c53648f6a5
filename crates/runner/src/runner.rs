//! Execution engine: runs loaded screen and flow tests through a driver

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::actions::ActionExecutor;
use crate::assertions::AssertionExecutor;
use crate::config::RunnerConfig;
use crate::driver::ElementDriver;
use crate::error::RunnerResult;
use crate::model::{platform_includes, FlowStep, FlowTest, LoadedTest, ScreenTest, TestCase};
use crate::resolve::ResolutionContext;
use crate::result::{RunReport, TestResult, TestSuiteResult, FLOW_CASE_NAME, SETUP_CASE_NAME};
use crate::step::{Step, StepOp};
use crate::substitution::substitute_case;

/// Runs tests strictly one step at a time against a single driver
pub struct TestRunner<D: ElementDriver + ?Sized> {
    config: RunnerConfig,
    driver: Arc<D>,
}

impl<D: ElementDriver + ?Sized> TestRunner<D> {
    pub fn new(driver: Arc<D>, config: RunnerConfig) -> Self {
        Self { config, driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Run one loaded test
    pub async fn run(&self, test: &LoadedTest) -> RunnerResult<TestSuiteResult> {
        match test {
            LoadedTest::Screen { test, .. } => self.run_screen_test(test).await,
            LoadedTest::Flow { test: flow, .. } => {
                let ctx = test.resolution_context();
                Ok(self.run_flow_test(flow, &ctx).await)
            }
        }
    }

    /// Run several tests in order.
    ///
    /// A screen test whose setup fails is reported as one failed `setup`
    /// result; the remaining tests still run.
    pub async fn run_all(&self, tests: &[LoadedTest]) -> RunReport {
        let start = Instant::now();
        let mut suites = Vec::with_capacity(tests.len());

        info!("Running {} test(s)...", tests.len());

        for test in tests {
            let suite_start = Instant::now();
            let suite = match self.run(test).await {
                Ok(suite) => suite,
                Err(e) => {
                    let duration_ms = suite_start.elapsed().as_millis() as u64;
                    TestSuiteResult {
                        suite_name: test.name().to_string(),
                        results: vec![TestResult::failed(test.name(), SETUP_CASE_NAME, e.to_string(), duration_ms)],
                        total_duration_ms: duration_ms,
                    }
                }
            };

            if suite.all_passed() {
                info!("✓ {} ({} ms)", suite.suite_name, suite.total_duration_ms);
            } else {
                error!("✗ {} - {} failed", suite.suite_name, suite.failed_count());
            }
            suites.push(suite);
        }

        let report = RunReport {
            suites,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            report.passed(),
            report.failed(),
            report.skipped(),
            report.total_duration_ms
        );
        report
    }

    /// Run a screen test: setup, every case in isolation, then teardown.
    ///
    /// Only a setup failure (or the driver failing to become ready) is
    /// returned as an error; case failures become failed results.
    pub async fn run_screen_test(&self, test: &ScreenTest) -> RunnerResult<TestSuiteResult> {
        let start = Instant::now();
        let suite_name = test.metadata.name.as_str();

        if !platform_includes(test.platform.as_ref(), &self.config.platform) {
            info!("Skipping screen test '{}': platform mismatch", suite_name);
            return Ok(TestSuiteResult::empty(suite_name));
        }

        info!("Running screen test: {}", suite_name);
        self.wait_ready().await?;

        if let Some(setup) = &test.setup {
            debug!("Running setup ({} steps)", setup.len());
            if let Err(e) = self.execute_steps(setup).await {
                error!("Setup failed for '{}': {}", suite_name, e);
                return Err(e);
            }
        }

        let mut results = Vec::with_capacity(test.cases.len());
        for case in &test.cases {
            results.push(self.run_case(suite_name, case).await);
        }

        if let Some(teardown) = &test.teardown {
            debug!("Running teardown ({} steps)", teardown.len());
            if let Err(e) = self.execute_steps(teardown).await {
                warn!("Teardown failed for '{}': {}", suite_name, e);
            }
        }

        Ok(TestSuiteResult {
            suite_name: suite_name.to_string(),
            results,
            total_duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn run_case(&self, suite_name: &str, case: &TestCase) -> TestResult {
        if let Some(reason) = case.skip_reason(&self.config.platform) {
            info!("Skipping case '{}': {}", case.name, reason);
            return TestResult::skipped(suite_name, &case.name);
        }

        let start = Instant::now();
        info!("Running case: {}", case.name);

        let case = substitute_case(case, &Default::default());
        match self.execute_steps(&case.steps).await {
            Ok(()) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                info!("✓ {} ({} ms)", case.name, duration_ms);
                TestResult::passed(suite_name, &case.name, duration_ms)
            }
            Err(e) => {
                warn!("✗ {} - {}", case.name, e);
                self.failure_screenshot(suite_name, &case.name).await;
                TestResult::failed(suite_name, &case.name, e.to_string(), start.elapsed().as_millis() as u64)
            }
        }
    }

    /// Run a flow test as a single unit of work.
    ///
    /// Always produces one `flow` result (or none when the platform does not
    /// match); the first error anywhere ends the flow.
    pub async fn run_flow_test(&self, test: &FlowTest, ctx: &ResolutionContext) -> TestSuiteResult {
        let start = Instant::now();
        let name = test.metadata.name.as_str();

        if !platform_includes(test.platform.as_ref(), &self.config.platform) {
            info!("Skipping flow test '{}': platform mismatch", name);
            return TestSuiteResult::empty(name);
        }

        info!("Running flow test: {}", name);
        let result = match self.execute_flow(test, ctx).await {
            Ok(()) => TestResult::passed(name, FLOW_CASE_NAME, start.elapsed().as_millis() as u64),
            Err(e) => {
                warn!("Flow test '{}' failed: {}", name, e);
                self.failure_screenshot(name, FLOW_CASE_NAME).await;
                TestResult::failed(name, FLOW_CASE_NAME, e.to_string(), start.elapsed().as_millis() as u64)
            }
        };

        TestSuiteResult {
            suite_name: name.to_string(),
            results: vec![result],
            total_duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn execute_flow(&self, test: &FlowTest, ctx: &ResolutionContext) -> RunnerResult<()> {
        if let Some(setup) = &test.setup {
            debug!("Running flow setup ({} steps)", setup.len());
            self.execute_flow_steps(setup, ctx).await?;
        }

        for (index, step) in test.steps.iter().enumerate() {
            debug!(
                "Flow step {}: screen={} {}",
                index + 1,
                step.screen().unwrap_or("-"),
                step.describe()
            );
            self.execute_flow_step(step, ctx).await?;

            for checkpoint in test.checkpoints_after(index + 1) {
                info!("Checkpoint reached: {}", checkpoint.name);
                if checkpoint.screenshot {
                    let file = format!(
                        "checkpoint_{}_{}",
                        sanitize(&test.metadata.name),
                        sanitize(&checkpoint.name)
                    );
                    self.capture(&file).await;
                }
            }
        }

        if let Some(teardown) = &test.teardown {
            debug!("Running flow teardown ({} steps)", teardown.len());
            if let Err(e) = self.execute_flow_steps(teardown, ctx).await {
                warn!("Flow teardown failed for '{}': {}", test.metadata.name, e);
            }
        }
        Ok(())
    }

    async fn execute_flow_steps(&self, steps: &[FlowStep], ctx: &ResolutionContext) -> RunnerResult<()> {
        for step in steps {
            self.execute_flow_step(step, ctx).await?;
        }
        Ok(())
    }

    async fn execute_flow_step(&self, step: &FlowStep, ctx: &ResolutionContext) -> RunnerResult<()> {
        match step {
            FlowStep::FileReference(reference) => {
                for case in ctx.resolve_cases(reference)? {
                    if let Some(reason) = case.skip_reason(&self.config.platform) {
                        info!("Skipping case '{}' from '{}': {}", case.name, reference.file, reason);
                        continue;
                    }
                    debug!("Running case '{}' from '{}'", case.name, reference.file);
                    self.execute_steps(&case.steps).await?;
                }
            }
            FlowStep::Block(block) => {
                debug!("Running block '{}'", block.name);
                self.execute_steps(&block.steps).await?;
            }
            FlowStep::Inline { step, .. } => self.execute_step(step).await?,
        }
        Ok(())
    }

    /// Run plain steps in order, stopping at the first failure
    pub async fn execute_steps(&self, steps: &[Step]) -> RunnerResult<()> {
        for (index, step) in steps.iter().enumerate() {
            debug!("  Step {}: {}", index + 1, step);
            self.execute_step(step).await?;
        }
        Ok(())
    }

    /// Classify one step and hand it to the action or assertion executor
    pub async fn execute_step(&self, step: &Step) -> RunnerResult<()> {
        let resolved = step.resolve(self.config.default_timeout())?;
        match &resolved.op {
            StepOp::Action(action) => {
                ActionExecutor::new(&*self.driver, &self.config)
                    .execute(action, resolved.timeout)
                    .await
            }
            StepOp::Assertion(assertion) => {
                AssertionExecutor::new(&*self.driver)
                    .execute(assertion, resolved.timeout)
                    .await
            }
        }
    }

    async fn wait_ready(&self) -> RunnerResult<()> {
        debug!("Waiting for UI to be ready...");
        self.driver.wait_idle().await?;
        self.driver.pause(self.config.settle_delay()).await?;
        Ok(())
    }

    async fn failure_screenshot(&self, suite_name: &str, case_name: &str) {
        if self.config.screenshot_on_failure {
            let file = format!("failure_{}_{}", sanitize(suite_name), sanitize(case_name));
            self.capture(&file).await;
        }
    }

    /// Capture `<screenshot_dir>/<file>.png`; failures are only logged
    async fn capture(&self, file: &str) {
        let path: PathBuf = self.config.screenshot_dir.join(format!("{}.png", file));
        match self.driver.screenshot(&path).await {
            Ok(()) => debug!("Screenshot saved: {}", path.display()),
            Err(e) => warn!("Failed to take screenshot {}: {}", path.display(), e),
        }
    }
}

/// Make a test or case name safe to use in a file name
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
