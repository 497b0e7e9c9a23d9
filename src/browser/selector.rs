//! Selector syntax for locating elements
//!
//! Supported forms:
//! ```text
//! text=开始探索               text match, case-insensitive substring
//! text="继续"                 text match, exact after whitespace normalisation
//! button:has-text("男")      CSS filtered by contained text
//! xpath=//button | //button  XPath
//! css=#agree | #agree        CSS (default)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

/// A parsed element selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    Css { query: String },
    #[serde(rename = "xpath")]
    XPath { query: String },
    Text { text: String, exact: bool },
    CssHasText { query: String, text: String },
}

impl Selector {
    /// Parse a selector string
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid(raw, "selector is empty"));
        }

        if let Some(rest) = raw.strip_prefix("text=") {
            let (text, exact) = unquote(rest);
            if text.is_empty() {
                return Err(invalid(raw, "text selector has no text"));
            }
            return Ok(Selector::Text { text, exact });
        }

        if let Some(rest) = raw.strip_prefix("xpath=") {
            return Ok(Selector::XPath {
                query: rest.to_string(),
            });
        }
        if raw.starts_with("//") || raw.starts_with("(//") {
            return Ok(Selector::XPath {
                query: raw.to_string(),
            });
        }

        let css = raw.strip_prefix("css=").unwrap_or(raw);

        if let Some(pos) = css.find(":has-text(") {
            let inner = css[pos + ":has-text(".len()..]
                .strip_suffix(')')
                .ok_or_else(|| invalid(raw, "unterminated :has-text("))?;
            let (text, _) = unquote(inner);
            let query = css[..pos].trim();
            if query.is_empty() {
                return Err(invalid(raw, ":has-text needs a CSS selector before it"));
            }
            return Ok(Selector::CssHasText {
                query: query.to_string(),
                text,
            });
        }

        Ok(Selector::Css {
            query: css.to_string(),
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css { query } => write!(f, "{}", query),
            Selector::XPath { query } => write!(f, "xpath={}", query),
            Selector::Text { text, exact: true } => write!(f, "text=\"{}\"", text),
            Selector::Text { text, exact: false } => write!(f, "text={}", text),
            Selector::CssHasText { query, text } => write!(f, "{}:has-text(\"{}\")", query, text),
        }
    }
}

fn invalid(raw: &str, reason: &str) -> Error {
    Error::InvalidSelector {
        selector: raw.to_string(),
        reason: reason.to_string(),
    }
}

/// Strip one pair of matching quotes, reporting whether they were present
fn unquote(s: &str) -> (String, bool) {
    let s = s.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return (s[1..s.len() - 1].to_string(), true);
        }
    }
    (s.to_string(), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_selectors() {
        assert_eq!(
            Selector::parse("text=开始探索").unwrap(),
            Selector::Text {
                text: "开始探索".to_string(),
                exact: false
            }
        );
        assert_eq!(
            Selector::parse("text=\"继续\"").unwrap(),
            Selector::Text {
                text: "继续".to_string(),
                exact: true
            }
        );
    }

    #[test]
    fn test_parse_has_text() {
        let sel = Selector::parse("button:has-text(\"男\")").unwrap();
        assert_eq!(
            sel,
            Selector::CssHasText {
                query: "button".to_string(),
                text: "男".to_string()
            }
        );
        assert_eq!(sel.to_string(), "button:has-text(\"男\")");
    }

    #[test]
    fn test_parse_css_and_xpath() {
        assert!(matches!(
            Selector::parse("input[placeholder*=\"姓名\"]").unwrap(),
            Selector::Css { query } if query == "input[placeholder*=\"姓名\"]"
        ));
        assert!(matches!(
            Selector::parse("css=#agree").unwrap(),
            Selector::Css { query } if query == "#agree"
        ));
        assert!(matches!(Selector::parse("//div[@id='x']").unwrap(), Selector::XPath { .. }));
        assert!(matches!(Selector::parse("xpath=//a").unwrap(), Selector::XPath { query } if query == "//a"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(Selector::parse("  "), Err(Error::InvalidSelector { .. })));
        assert!(matches!(Selector::parse("text="), Err(Error::InvalidSelector { .. })));
        assert!(matches!(
            Selector::parse("button:has-text(\"男\""),
            Err(Error::InvalidSelector { .. })
        ));
        assert!(matches!(
            Selector::parse(":has-text(\"x\")"),
            Err(Error::InvalidSelector { .. })
        ));
    }
}
