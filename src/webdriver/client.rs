//! WebDriver client for driving one browser session
//!
//! Implements [`Browser`] on top of the W3C WebDriver HTTP protocol.
//! Element lookup runs in-page through a single locator script so every
//! selector kind resolves to a list of element references the same way.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::browser::{Browser, ElementRef, LoadState, Selector};
use crate::common::config::BrowserConfig;
use crate::common::{Error, Result};

use super::driver::DriverProcess;
use super::types::*;

/// Resolves a serialised [`Selector`] to the matching elements
const LOCATE_SCRIPT: &str = r#"
const sel = arguments[0];
const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
const matches = (el, text, exact) => {
  const t = norm(el.textContent);
  return exact ? t === text : t.toLowerCase().includes(text.toLowerCase());
};
const skip = new Set(['SCRIPT', 'STYLE', 'HEAD', 'TITLE', 'NOSCRIPT', 'TEMPLATE']);
switch (sel.kind) {
  case 'css':
    return Array.from(document.querySelectorAll(sel.query));
  case 'xpath': {
    const r = document.evaluate(sel.query, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    const out = [];
    for (let i = 0; i < r.snapshotLength; i++) {
      const n = r.snapshotItem(i);
      if (n.nodeType === Node.ELEMENT_NODE) out.push(n);
    }
    return out;
  }
  case 'text': {
    const text = norm(sel.text);
    const root = document.body || document.documentElement;
    const hits = Array.from(root.querySelectorAll('*'))
      .filter((el) => !skip.has(el.tagName) && matches(el, text, sel.exact));
    return hits.filter((el) => !hits.some((o) => o !== el && el.contains(o)));
  }
  case 'css_has_text': {
    const text = norm(sel.text);
    return Array.from(document.querySelectorAll(sel.query)).filter((el) => matches(el, text, false));
  }
}
return [];
"#;

const LOAD_STATE_SCRIPT: &str = r#"
return [document.readyState, performance.getEntriesByType('resource').length];
"#;

/// Select an option by value, falling back to its visible label
const SELECT_SCRIPT: &str = r#"
const [el, value] = arguments;
const opts = Array.from(el.options || []);
const opt = opts.find((o) => o.value === value)
  || opts.find((o) => o.label.trim() === value || o.text.trim() === value);
if (!opt) return false;
el.value = opt.value;
opt.selected = true;
el.dispatchEvent(new Event('input', { bubbles: true }));
el.dispatchEvent(new Event('change', { bubbles: true }));
return true;
"#;

/// WebDriver client owning one session
pub struct WebDriverClient {
    http: reqwest::Client,
    /// Server base URL with a trailing slash
    endpoint: String,
    /// Open session (None once closed)
    session_id: Option<String>,
    /// Driver process when this client spawned it
    driver: Option<DriverProcess>,
}

impl WebDriverClient {
    /// Start a browser session according to configuration
    ///
    /// Spawns the driver binary unless `webdriver_url` points at a running
    /// server. Any failure is reported as a launch error.
    pub async fn launch(
        config: &BrowserConfig,
        page_load_timeout_ms: u64,
        launch_timeout: Duration,
    ) -> Result<Self> {
        let options = SessionOptions {
            browser_name: config.browser_name.clone(),
            headless: config.headless,
            window_width: config.window_width,
            window_height: config.window_height,
            page_load_timeout_ms,
        };

        let (endpoint, driver) = match &config.webdriver_url {
            Some(url) => (url.clone(), None),
            None => {
                let driver = DriverProcess::spawn(config, launch_timeout).await?;
                (driver.url().to_string(), Some(driver))
            }
        };

        let mut client = Self::new(&endpoint)?;
        client.driver = driver;

        match tokio::time::timeout(launch_timeout, client.new_session(&options)).await {
            Ok(Ok(())) => Ok(client),
            Ok(Err(e)) => {
                client.shutdown_driver().await;
                Err(match e {
                    Error::Launch(_) | Error::DriverNotFound { .. } => e,
                    other => Error::Launch(other.to_string()),
                })
            }
            Err(_) => {
                client.shutdown_driver().await;
                Err(Error::Launch(format!(
                    "New session did not complete within {}ms",
                    launch_timeout.as_millis()
                )))
            }
        }
    }

    /// Create a client for a WebDriver server without opening a session
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{}/", endpoint)
        };
        reqwest::Url::parse(&endpoint)
            .map_err(|e| Error::Config(format!("Invalid WebDriver URL '{}': {}", endpoint, e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            session_id: None,
            driver: None,
        })
    }

    /// Open a new session
    pub async fn new_session(&mut self, options: &SessionOptions) -> Result<()> {
        let session: NewSession = self
            .request(Method::POST, "session", Some(options.to_request()))
            .await?;
        tracing::info!(
            session = %session.session_id,
            browser = %session.capabilities["browserName"],
            headless = options.headless,
            "Browser session started"
        );
        self.session_id = Some(session.session_id);
        Ok(())
    }

    /// Send a command and unwrap the response envelope
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.endpoint, path);
        tracing::debug!("WebDriver >>> {} {}", method, path);

        let mut req = self.http.request(method, &url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        tracing::trace!("WebDriver <<< {} {}", status, text);

        if status.is_success() {
            let envelope: Response<T> = serde_json::from_str(&text).map_err(|e| {
                Error::WebDriverProtocol(format!("Failed to parse {} response: {}", path, e))
            })?;
            return Ok(envelope.value);
        }

        match serde_json::from_str::<Response<ErrorValue>>(&text) {
            Ok(envelope) => Err(Error::webdriver(
                command_name(path),
                &format!("{}: {}", envelope.value.error, envelope.value.message),
            )),
            Err(_) => Err(Error::webdriver(
                command_name(path),
                &format!("HTTP {}: {}", status, text),
            )),
        }
    }

    /// Send a command scoped to the open session
    async fn session_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let id = self.session_id.as_deref().ok_or(Error::SessionClosed)?;
        let full = if path.is_empty() {
            format!("session/{}", id)
        } else {
            format!("session/{}/{}", id, path)
        };
        self.request(method, &full, body).await
    }

    async fn execute<T: DeserializeOwned>(&self, script: &str, args: Vec<Value>) -> Result<T> {
        let body = serde_json::to_value(ExecuteScript { script, args })?;
        self.session_request(Method::POST, "execute/sync", Some(body))
            .await
    }

    async fn shutdown_driver(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.shutdown().await;
        }
    }
}

/// Short command name for error messages (`session/<id>/element/<id>/click` -> `click`)
fn command_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn element_arg(element: &ElementRef) -> Result<Value> {
    Ok(serde_json::to_value(WebElement::from(element))?)
}

#[async_trait]
impl Browser for WebDriverClient {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let body = serde_json::to_value(NavigateTo { url })?;
        self.session_request::<Value>(Method::POST, "url", Some(body))
            .await?;
        Ok(())
    }

    async fn load_state(&mut self) -> Result<LoadState> {
        let (ready, resources): (String, u64) = self.execute(LOAD_STATE_SCRIPT, vec![]).await?;
        Ok(LoadState {
            complete: ready == "complete",
            resources,
        })
    }

    async fn find_all(&mut self, selector: &Selector) -> Result<Vec<ElementRef>> {
        let elements: Vec<WebElement> = self
            .execute(LOCATE_SCRIPT, vec![serde_json::to_value(selector)?])
            .await?;
        Ok(elements.into_iter().map(Into::into).collect())
    }

    async fn click(&mut self, element: &ElementRef) -> Result<()> {
        self.session_request::<Value>(
            Method::POST,
            &format!("element/{}/click", element.0),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn fill(&mut self, element: &ElementRef, value: &str) -> Result<()> {
        self.session_request::<Value>(
            Method::POST,
            &format!("element/{}/clear", element.0),
            Some(json!({})),
        )
        .await?;
        let body = serde_json::to_value(SendKeys { text: value })?;
        self.session_request::<Value>(
            Method::POST,
            &format!("element/{}/value", element.0),
            Some(body),
        )
        .await?;
        Ok(())
    }

    async fn is_checked(&mut self, element: &ElementRef) -> Result<bool> {
        self.session_request(
            Method::GET,
            &format!("element/{}/selected", element.0),
            None,
        )
        .await
    }

    async fn select_option(&mut self, element: &ElementRef, value: &str) -> Result<()> {
        let found: bool = self
            .execute(SELECT_SCRIPT, vec![element_arg(element)?, json!(value)])
            .await?;
        if !found {
            return Err(Error::ElementNotFound {
                selector: format!("option '{}'", value),
                elapsed_ms: 0,
            });
        }
        Ok(())
    }

    async fn text(&mut self, element: &ElementRef) -> Result<String> {
        self.session_request(Method::GET, &format!("element/{}/text", element.0), None)
            .await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let encoded: String = self
            .session_request(Method::GET, "screenshot", None)
            .await?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| Error::WebDriverProtocol(format!("Invalid screenshot payload: {}", e)))
    }

    async fn current_url(&mut self) -> Result<String> {
        self.session_request(Method::GET, "url", None).await
    }

    async fn title(&mut self) -> Result<String> {
        self.session_request(Method::GET, "title", None).await
    }

    async fn close(&mut self) -> Result<()> {
        let result = if self.session_id.is_some() {
            let r = self
                .session_request::<Value>(Method::DELETE, "", None)
                .await
                .map(|_| ());
            self.session_id = None;
            r
        } else {
            Ok(())
        };
        self.shutdown_driver().await;
        tracing::debug!("Browser session closed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_gets_trailing_slash() {
        let client = WebDriverClient::new("http://127.0.0.1:4444").unwrap();
        assert_eq!(client.endpoint, "http://127.0.0.1:4444/");
        let client = WebDriverClient::new("http://127.0.0.1:4444/wd/hub/").unwrap();
        assert_eq!(client.endpoint, "http://127.0.0.1:4444/wd/hub/");
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        assert!(matches!(
            WebDriverClient::new("not a url"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_command_name() {
        assert_eq!(command_name("session/abc/element/def/click"), "click");
        assert_eq!(command_name("session"), "session");
    }

    #[tokio::test]
    async fn test_commands_without_session_fail() {
        let mut client = WebDriverClient::new("http://127.0.0.1:9/").unwrap();
        assert!(matches!(client.title().await, Err(Error::SessionClosed)));
        // Closing an unopened client is a no-op
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_launch_against_unreachable_server_is_launch_error() {
        let config = BrowserConfig {
            webdriver_url: Some("http://127.0.0.1:9/".to_string()),
            ..Default::default()
        };
        let err = WebDriverClient::launch(&config, 1000, Duration::from_secs(2))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Launch(_)));
    }

    #[test]
    fn test_selector_serialises_for_locator_script() {
        let value = serde_json::to_value(Selector::parse("button:has-text(\"男\")").unwrap()).unwrap();
        assert_eq!(value["kind"], "css_has_text");
        assert_eq!(value["query"], "button");
        assert!(LOCATE_SCRIPT.contains("case 'css_has_text'"));

        let value = serde_json::to_value(Selector::parse("//a").unwrap()).unwrap();
        assert_eq!(value["kind"], "xpath");
        assert!(LOCATE_SCRIPT.contains("case 'xpath'"));
    }
}
