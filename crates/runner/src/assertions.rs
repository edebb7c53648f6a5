//! Assertion checks against the element driver

use std::time::Duration;

use crate::driver::{DriverError, ElementDriver};
use crate::error::{RunnerError, RunnerResult};
use crate::step::{Assertion, TextExpectation};

/// Upper bound on how long `notVisible` lets the UI settle
const NOT_VISIBLE_GRACE: Duration = Duration::from_millis(1000);

/// Checks [`Assertion`]s; an unmet expectation is [`RunnerError::AssertionFailed`]
pub struct AssertionExecutor<'a, D: ElementDriver + ?Sized> {
    driver: &'a D,
}

impl<'a, D: ElementDriver + ?Sized> AssertionExecutor<'a, D> {
    pub fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    pub async fn execute(&self, assertion: &Assertion, timeout: Duration) -> RunnerResult<()> {
        match assertion {
            Assertion::Visible { id } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                if !self.driver.is_visible(&element).await? {
                    return Err(failed(format!("Element '{}' should be visible but it is not", id)));
                }
            }
            Assertion::NotVisible { id } => {
                self.driver.pause(timeout.min(NOT_VISIBLE_GRACE)).await?;
                if let Some(first) = self.driver.locate(id).await?.first() {
                    if self.driver.is_visible(first).await? {
                        return Err(failed(format!("Element '{}' should not be visible but it is", id)));
                    }
                }
            }
            Assertion::Enabled { id } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                if !self.driver.is_enabled(&element).await? {
                    return Err(failed(format!("Element '{}' should be enabled but it is disabled", id)));
                }
            }
            Assertion::Disabled { id } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                if self.driver.is_enabled(&element).await? {
                    return Err(failed(format!("Element '{}' should be disabled but it is enabled", id)));
                }
            }
            Assertion::Text { id, expected } => {
                let element = self.driver.wait_visible(id, timeout).await?;
                let actual = self.driver.read_text(&element).await?;
                check_text(id, &actual, expected)?;
            }
            Assertion::Count { id, expected } => self.assert_count(id, *expected, timeout).await?,
        }
        Ok(())
    }

    async fn assert_count(&self, id: &str, expected: u64, timeout: Duration) -> RunnerResult<()> {
        match self.driver.wait_visible(id, timeout).await {
            Ok(_) => {}
            Err(DriverError::ElementNotFound { .. }) if expected == 0 => return Ok(()),
            Err(DriverError::ElementNotFound { .. }) => return Err(count_mismatch(id, expected, 0)),
            Err(e) => return Err(e.into()),
        }

        let actual = self.driver.locate(id).await?.len() as u64;
        if actual != expected {
            return Err(count_mismatch(id, expected, actual));
        }
        Ok(())
    }
}

fn failed(message: String) -> RunnerError {
    RunnerError::AssertionFailed(message)
}

fn count_mismatch(id: &str, expected: u64, actual: u64) -> RunnerError {
    failed(format!(
        "Expected {} elements with id '{}', but found {}",
        expected, id, actual
    ))
}

fn check_text(id: &str, actual: &str, expected: &TextExpectation) -> RunnerResult<()> {
    match expected {
        TextExpectation::Equals(want) if actual != want => Err(failed(format!(
            "Expected text '{}' but got '{}' for element '{}'",
            want, actual, id
        ))),
        TextExpectation::Contains(part) if !actual.contains(part.as_str()) => Err(failed(format!(
            "Expected text containing '{}' but got '{}' for element '{}'",
            part, actual, id
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{FakeElement, ScriptedDriver};

    const T: Duration = Duration::from_millis(2000);

    fn text_eq(id: &str, want: &str) -> Assertion {
        Assertion::Text {
            id: id.to_string(),
            expected: TextExpectation::Equals(want.to_string()),
        }
    }

    #[tokio::test]
    async fn test_text_equals_and_contains() {
        let driver = ScriptedDriver::strict().with_element("title", FakeElement::new().text("Welcome back"));
        let exec = AssertionExecutor::new(&driver);

        exec.execute(&text_eq("title", "Welcome back"), T).await.unwrap();

        let err = exec.execute(&text_eq("title", "Welcome"), T).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Assertion failed: Expected text 'Welcome' but got 'Welcome back' for element 'title'"
        );

        let contains = Assertion::Text {
            id: "title".into(),
            expected: TextExpectation::Contains("back".into()),
        };
        exec.execute(&contains, T).await.unwrap();
    }

    #[tokio::test]
    async fn test_not_visible_waits_at_most_one_second() {
        let driver = ScriptedDriver::strict()
            .with_element("dialog", FakeElement::new().hidden())
            .with_element("banner", FakeElement::new());
        let exec = AssertionExecutor::new(&driver);

        exec.execute(&Assertion::NotVisible { id: "dialog".into() }, T).await.unwrap();
        exec.execute(&Assertion::NotVisible { id: "absent".into() }, Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(driver.calls_to("pause"), vec!["pause(1000ms)", "pause(200ms)"]);

        let err = exec
            .execute(&Assertion::NotVisible { id: "banner".into() }, T)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("should not be visible"));
    }

    #[tokio::test]
    async fn test_enabled_and_disabled() {
        let driver = ScriptedDriver::strict()
            .with_element("submit", FakeElement::new().disabled())
            .with_element("cancel", FakeElement::new());
        let exec = AssertionExecutor::new(&driver);

        exec.execute(&Assertion::Disabled { id: "submit".into() }, T).await.unwrap();
        exec.execute(&Assertion::Enabled { id: "cancel".into() }, T).await.unwrap();
        let err = exec
            .execute(&Assertion::Enabled { id: "submit".into() }, T)
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::AssertionFailed(_)));
    }

    #[tokio::test]
    async fn test_count() {
        let driver = ScriptedDriver::strict().with_element("row", FakeElement::new().count(3));
        let exec = AssertionExecutor::new(&driver);

        exec.execute(&Assertion::Count { id: "row".into(), expected: 3 }, T).await.unwrap();
        exec.execute(&Assertion::Count { id: "empty".into(), expected: 0 }, T).await.unwrap();

        let err = exec
            .execute(&Assertion::Count { id: "row".into(), expected: 2 }, T)
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("Expected 2 elements with id 'row', but found 3"));

        let err = exec
            .execute(&Assertion::Count { id: "empty".into(), expected: 1 }, T)
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("but found 0"));
    }

    #[tokio::test]
    async fn test_missing_element_is_a_driver_error() {
        let driver = ScriptedDriver::strict();
        let exec = AssertionExecutor::new(&driver);
        let err = exec
            .execute(&Assertion::Visible { id: "ghost".into() }, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Element 'ghost' not found within 100ms");
    }
}
