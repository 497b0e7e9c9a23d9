//! Walkthrough definition types
//!
//! Defines the data structures for deserializing YAML walkthroughs.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::browser::Selector;
use crate::common::{Error, Result};

/// YAML source of the built-in onboarding walkthrough
pub const BUILTIN_YAML: &str = include_str!("../../walkthroughs/onboarding.yaml");

/// A complete walkthrough loaded from a YAML file
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Walkthrough {
    /// Name of the walkthrough
    pub name: String,
    /// Optional description of the flow it exercises
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The sequence of steps to execute
    pub steps: Vec<Step>,
}

/// A single step of a walkthrough
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL (relative to the base URL) and wait for the network to settle
    Navigate { url: String },

    /// Wait for the network to settle without navigating
    WaitForIdle,

    /// Run nested steps only if the selector appears within the timeout
    WaitForOptional {
        selector: String,
        #[serde(default = "default_optional_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        steps: Vec<Step>,
    },

    /// Check a checkbox (no-op when already checked)
    Check {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Click an element, typically located by its text
    Click {
        #[serde(alias = "target")]
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Replace the value of an input field
    Fill {
        selector: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Choose an option of a `<select>` by value or label
    SelectOption {
        selector: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Capture the viewport to `<screenshot_dir>/<label>.png`
    Screenshot { label: String },

    /// Compare observed page state against an expected value
    ///
    /// An exact URL `expected` is resolved against the base URL first.
    Assert {
        subject: Subject,
        expected: String,
        #[serde(default)]
        mode: MatchMode,
    },
}

fn default_optional_timeout() -> u64 {
    2000
}

/// Page state an assertion observes
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Url,
    Title,
    /// Rendered text of the element matching the selector
    Text(String),
}

/// How observed and expected values are compared
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Exact,
    Contains,
}

impl Step {
    /// One-line description used in progress output and reports
    pub fn describe(&self) -> String {
        match self {
            Step::Navigate { url } => format!("navigate {}", url),
            Step::WaitForIdle => "wait for idle".to_string(),
            Step::WaitForOptional {
                selector,
                timeout_ms,
                ..
            } => format!("optional {} ({}ms)", selector, timeout_ms),
            Step::Check { selector, .. } => format!("check {}", selector),
            Step::Click { selector, .. } => format!("click {}", selector),
            Step::Fill {
                selector, value, ..
            } => format!("fill {} = {:?}", selector, value),
            Step::SelectOption {
                selector, value, ..
            } => format!("select {} = {:?}", selector, value),
            Step::Screenshot { label } => format!("screenshot {}", label),
            Step::Assert {
                subject,
                expected,
                mode,
            } => {
                let op = match mode {
                    MatchMode::Exact => "==",
                    MatchMode::Contains => "contains",
                };
                format!("assert {} {} {:?}", subject.describe(), op, expected)
            }
        }
    }

    /// Selector this step resolves, if any
    pub fn selector(&self) -> Option<&str> {
        match self {
            Step::WaitForOptional { selector, .. }
            | Step::Check { selector, .. }
            | Step::Click { selector, .. }
            | Step::Fill { selector, .. }
            | Step::SelectOption { selector, .. } => Some(selector),
            Step::Assert {
                subject: Subject::Text(selector),
                ..
            } => Some(selector),
            _ => None,
        }
    }
}

impl Subject {
    pub fn describe(&self) -> String {
        match self {
            Subject::Url => "url".to_string(),
            Subject::Title => "title".to_string(),
            Subject::Text(selector) => format!("text of {}", selector),
        }
    }
}

impl Walkthrough {
    /// Parse a walkthrough from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a walkthrough from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| Error::WalkthroughParse {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// The built-in onboarding walkthrough
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_YAML)
    }

    /// Check selectors and labels before any browser is started
    pub fn validate(&self) -> Result<()> {
        validate_steps(&self.steps)
    }

    /// Total number of steps including nested ones
    pub fn step_count(&self) -> usize {
        fn count(steps: &[Step]) -> usize {
            steps
                .iter()
                .map(|s| match s {
                    Step::WaitForOptional { steps, .. } => 1 + count(steps),
                    _ => 1,
                })
                .sum()
        }
        count(&self.steps)
    }
}

fn validate_steps(steps: &[Step]) -> Result<()> {
    for step in steps {
        if let Some(selector) = step.selector() {
            Selector::parse(selector)?;
        }
        match step {
            Step::Screenshot { label } if label.trim().is_empty() => {
                return Err(Error::Config("screenshot label is empty".to_string()));
            }
            Step::WaitForOptional { steps, .. } => validate_steps(steps)?,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_walkthrough_is_valid() {
        let walkthrough = Walkthrough::builtin().unwrap();
        assert_eq!(walkthrough.name, "onboarding");
        walkthrough.validate().unwrap();

        assert_eq!(
            walkthrough.steps[0],
            Step::Navigate {
                url: "/".to_string()
            }
        );
        let optional: Vec<_> = walkthrough
            .steps
            .iter()
            .filter(|s| matches!(s, Step::WaitForOptional { .. }))
            .collect();
        assert_eq!(optional.len(), 2);
    }

    #[test]
    fn test_parse_optional_branch_with_defaults() {
        let yaml = r##"
name: optional
steps:
  - action: wait_for_optional
    selector: "#disclaimer"
    steps:
      - action: check
        selector: "#agree"
      - action: click
        target: "#start"
  - action: wait_for_idle
"##;
        let walkthrough = Walkthrough::from_yaml(yaml).unwrap();
        match &walkthrough.steps[0] {
            Step::WaitForOptional {
                timeout_ms, steps, ..
            } => {
                assert_eq!(*timeout_ms, 2000);
                assert_eq!(steps.len(), 2);
                assert!(matches!(&steps[1], Step::Click { selector, .. } if selector == "#start"));
            }
            other => panic!("unexpected step: {:?}", other),
        }
        assert_eq!(walkthrough.steps[1], Step::WaitForIdle);
        assert_eq!(walkthrough.step_count(), 4);
    }

    #[test]
    fn test_parse_assert_subjects() {
        let yaml = r#"
name: asserts
steps:
  - action: assert
    subject: title
    expected: 首页 - 童智星探
  - action: assert
    subject:
      text: h1
    expected: 开始
    mode: contains
"#;
        let walkthrough = Walkthrough::from_yaml(yaml).unwrap();
        assert!(matches!(
            &walkthrough.steps[0],
            Step::Assert { subject: Subject::Title, mode: MatchMode::Exact, .. }
        ));
        assert!(matches!(
            &walkthrough.steps[1],
            Step::Assert { subject: Subject::Text(sel), mode: MatchMode::Contains, .. } if sel == "h1"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_nested_selector() {
        let yaml = r#"
name: bad
steps:
  - action: wait_for_optional
    selector: text=ok
    steps:
      - action: click
        selector: "text="
"#;
        let walkthrough = Walkthrough::from_yaml(yaml).unwrap();
        assert!(matches!(
            walkthrough.validate(),
            Err(Error::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let yaml = "name: x\nsteps:\n  - action: teleport\n";
        assert!(Walkthrough::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_describe() {
        let step = Step::Fill {
            selector: "input".to_string(),
            value: "测试儿童".to_string(),
            timeout_ms: None,
        };
        assert_eq!(step.describe(), "fill input = \"测试儿童\"");
        assert_eq!(Step::WaitForIdle.describe(), "wait for idle");
    }
}
