//! `@{name}` placeholder substitution for reusable test cases
//!
//! A screen test case can declare default `args`; a flow step that delegates to
//! it can pass its own `args`. The two are merged (flow wins) and every
//! placeholder in the case's string fields is replaced. Unknown names are left
//! as written.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::model::{ArgMap, TestCase};
use crate::step::{value_as_text, Step};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Case defaults overlaid with call-site overrides (one level deep)
pub fn merge_args(defaults: &ArgMap, overrides: &ArgMap) -> ArgMap {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Make `case` concrete for one call site.
///
/// Returns the case untouched (borrowed) when there is nothing to substitute.
pub fn substitute_case<'a>(case: &'a TestCase, overrides: &ArgMap) -> Cow<'a, TestCase> {
    let args = merge_args(&case.args, overrides);
    if args.is_empty() {
        return Cow::Borrowed(case);
    }

    let steps = case
        .steps
        .iter()
        .map(|step| substitute_step(step, &args))
        .collect();

    Cow::Owned(TestCase {
        steps,
        ..case.clone()
    })
}

/// Substitute placeholders in the string fields of one step
pub fn substitute_step(step: &Step, args: &ArgMap) -> Step {
    let sub = |field: &Option<String>| field.as_deref().map(|s| substitute_str(s, args).into_owned());

    Step {
        id: sub(&step.id),
        ids: step
            .ids
            .as_ref()
            .map(|ids| ids.iter().map(|id| substitute_str(id, args).into_owned()).collect()),
        text: sub(&step.text),
        value: sub(&step.value),
        contains: sub(&step.contains),
        button: sub(&step.button),
        label: sub(&step.label),
        equals: step.equals.as_ref().map(|equals| match equals {
            serde_json::Value::String(s) => serde_json::Value::String(substitute_str(s, args).into_owned()),
            other => other.clone(),
        }),
        ..step.clone()
    }
}

/// Replace every `@{name}` in `input` whose name is present in `args`
pub fn substitute_str<'a>(input: &'a str, args: &ArgMap) -> Cow<'a, str> {
    PLACEHOLDER.replace_all(input, |caps: &Captures<'_>| match args.get(&caps[1]) {
        Some(value) => value_as_text(value),
        None => caps[0].to_string(),
    })
}

/// Placeholder names referenced by a string, in order of appearance
pub fn placeholders(input: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(input)
        .map(|caps| caps[1].to_string())
        .collect()
}
