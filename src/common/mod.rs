//! Common utilities shared by the CLI and the runner

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Collapse runs of whitespace and trim, the way selectors compare text
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  开始\n  探索 "), "开始 探索");
        assert_eq!(normalize_text(""), "");
    }
}
