//! W3C WebDriver wire types
//!
//! Every response is an object with a single `value` member. Failed commands
//! carry `{error, message, stacktrace}` in `value` with a 4xx/5xx status.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::browser::ElementRef;

/// Key under which the protocol serialises element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a5ab-bd8d-07d0fc4e";

/// Response envelope
#[derive(Debug, Deserialize)]
pub struct Response<T> {
    pub value: T,
}

/// Error payload of a failed command
#[derive(Debug, Deserialize, Clone)]
pub struct ErrorValue {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// Value of a successful New Session command
#[derive(Debug, Deserialize)]
pub struct NewSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(default)]
    pub capabilities: Value,
}

/// Value of the Status command
#[derive(Debug, Deserialize)]
pub struct Status {
    pub ready: bool,
    #[serde(default)]
    pub message: String,
}

/// A web element reference as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebElement {
    #[serde(rename = "element-6066-11e4-a5ab-bd8d-07d0fc4e")]
    pub id: String,
}

impl From<WebElement> for ElementRef {
    fn from(e: WebElement) -> Self {
        ElementRef(e.id)
    }
}

impl From<&ElementRef> for WebElement {
    fn from(e: &ElementRef) -> Self {
        WebElement { id: e.0.clone() }
    }
}

/// Body of the Execute Script command
#[derive(Debug, Serialize)]
pub struct ExecuteScript<'a> {
    pub script: &'a str,
    pub args: Vec<Value>,
}

/// Body of the Navigate To command
#[derive(Debug, Serialize)]
pub struct NavigateTo<'a> {
    pub url: &'a str,
}

/// Body of the Element Send Keys command
#[derive(Debug, Serialize)]
pub struct SendKeys<'a> {
    pub text: &'a str,
}

/// Browser options for the New Session command
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub browser_name: String,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub page_load_timeout_ms: u64,
}

impl SessionOptions {
    /// Build the `capabilities` request body
    ///
    /// Vendor options are only attached for the browser family that reads
    /// them.
    pub fn to_request(&self) -> Value {
        let mut always_match = json!({
            "browserName": self.browser_name,
            "pageLoadStrategy": "normal",
            "timeouts": {
                "pageLoad": self.page_load_timeout_ms,
                "script": self.page_load_timeout_ms,
            },
        });

        match self.browser_name.as_str() {
            "chrome" | "chromium" => {
                let mut args = vec![format!(
                    "--window-size={},{}",
                    self.window_width, self.window_height
                )];
                if self.headless {
                    args.push("--headless=new".to_string());
                }
                always_match["goog:chromeOptions"] = json!({ "args": args });
            }
            "firefox" => {
                let mut args = vec![
                    format!("--width={}", self.window_width),
                    format!("--height={}", self.window_height),
                ];
                if self.headless {
                    args.push("-headless".to_string());
                }
                always_match["moz:firefoxOptions"] = json!({ "args": args });
            }
            _ => {}
        }

        json!({ "capabilities": { "alwaysMatch": always_match } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(browser: &str, headless: bool) -> SessionOptions {
        SessionOptions {
            browser_name: browser.to_string(),
            headless,
            window_width: 1280,
            window_height: 720,
            page_load_timeout_ms: 10_000,
        }
    }

    #[test]
    fn test_chrome_headless_arguments() {
        let req = options("chrome", true).to_request();
        let caps = &req["capabilities"]["alwaysMatch"];
        assert_eq!(caps["browserName"], "chrome");
        assert_eq!(caps["timeouts"]["pageLoad"], 10_000);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(args.iter().any(|a| a == "--window-size=1280,720"));
        assert!(caps.get("moz:firefoxOptions").is_none());
    }

    #[test]
    fn test_firefox_headed_has_no_headless_flag() {
        let req = options("firefox", false).to_request();
        let args = req["capabilities"]["alwaysMatch"]["moz:firefoxOptions"]["args"]
            .as_array()
            .unwrap();
        assert!(!args.iter().any(|a| a == "-headless"));
    }

    #[test]
    fn test_element_reference_wire_format() {
        let value = json!([{ ELEMENT_KEY: "abc" }, { ELEMENT_KEY: "def" }]);
        let elements: Vec<WebElement> = serde_json::from_value(value).unwrap();
        let refs: Vec<ElementRef> = elements.into_iter().map(Into::into).collect();
        assert_eq!(refs, vec![ElementRef("abc".into()), ElementRef("def".into())]);

        let back = serde_json::to_value(WebElement::from(&refs[0])).unwrap();
        assert_eq!(back, json!({ ELEMENT_KEY: "abc" }));
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"value":{"error":"no such window","message":"window closed","stacktrace":""}}"#;
        let resp: Response<ErrorValue> = serde_json::from_str(body).unwrap();
        assert_eq!(resp.value.error, "no such window");
    }
}
