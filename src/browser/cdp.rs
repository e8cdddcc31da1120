//! CDP-backed browser driver built on chromiumoxide.
//!
//! Launches a local Chrome/Chromium (discovered from common install
//! locations or `PATH`) or attaches to an already-running instance via
//! its DevTools endpoint.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use tracing::{debug, info};

use super::{Driver, DriverError, PageElement};

/// Launch-time settings for the CDP session.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Run without a visible window.
    pub headless: bool,
    /// DevTools endpoint of an existing browser (e.g. "ws://localhost:9222").
    /// When set, no local browser is launched.
    pub remote_url: Option<String>,
    /// Per-request CDP timeout.
    pub timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            remote_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A single-page CDP session.
pub struct CdpDriver {
    browser: Browser,
    page: Page,
    remote: bool,
}

impl CdpDriver {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    /// Launch a local browser or attach to a remote one, and open the
    /// working page.
    pub async fn start(settings: &BrowserSettings) -> Result<Self, DriverError> {
        let remote = settings.remote_url.is_some();
        let browser = if let Some(ref url) = settings.remote_url {
            Self::connect_remote(url).await?
        } else {
            Self::launch_local(settings).await?
        };

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Session(e.to_string()))?;

        Ok(Self {
            browser,
            page,
            remote,
        })
    }

    async fn launch_local(settings: &BrowserSettings) -> Result<Browser, DriverError> {
        let chrome_path = Self::find_chrome()?;
        info!(
            "Launching browser (headless={}) from {}",
            settings.headless,
            chrome_path.display()
        );

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(settings.timeout);

        // with_head means NOT headless, confusingly.
        if !settings.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--window-size=1920,1080");

        let config = builder
            .build()
            .map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        // Drain browser events for the lifetime of the session.
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    /// Connect to a remote Chrome instance through its `/json/version`
    /// endpoint.
    async fn connect_remote(url: &str) -> Result<Browser, DriverError> {
        info!("Connecting to remote browser at {}", url);

        let http_url = url.replace("ws://", "http://").replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let client = reqwest::Client::new();
        let resp: serde_json::Value = client
            .get(&version_url)
            .send()
            .await
            .map_err(|e| DriverError::Connect(e.to_string()))?
            .json()
            .await
            .map_err(|e| DriverError::Connect(e.to_string()))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DriverError::Connect("no webSocketDebuggerUrl in version response".to_string())
            })?;

        let (browser, mut handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| DriverError::Connect(e.to_string()))?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    /// Find a Chrome executable on this machine.
    fn find_chrome() -> Result<PathBuf, DriverError> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        info!("Found Chrome in PATH: {}", path);
                        return Ok(PathBuf::from(path));
                    }
                }
            }
        }

        Err(DriverError::Launch(
            "Chrome/Chromium not found; install it or set BROWSER_REMOTE_URL".to_string(),
        ))
    }
}

/// Element handle for [`CdpDriver`].
pub struct CdpElement(Element);

#[async_trait]
impl PageElement for CdpElement {
    async fn text(&self) -> Result<String, DriverError> {
        let text = self
            .0
            .inner_text()
            .await
            .map_err(|e| DriverError::Session(e.to_string()))?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        self.0
            .attribute(name)
            .await
            .map_err(|e| DriverError::Session(e.to_string()))
    }

    async fn click(&self) -> Result<(), DriverError> {
        self.0
            .click()
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Session(e.to_string()))
    }

    async fn type_text(&self, text: &str) -> Result<(), DriverError> {
        self.0
            .type_str(text)
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Session(e.to_string()))
    }

    async fn is_enabled(&self) -> Result<bool, DriverError> {
        // CDP has no direct enabled probe; the `disabled`/`aria-disabled`
        // attributes cover the dashboard's controls.
        if self.attribute("disabled").await?.is_some() {
            return Ok(false);
        }
        if let Some(aria) = self.attribute("aria-disabled").await? {
            if aria == "true" {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn query(&self, selector: &str) -> Result<Option<Self>, DriverError> {
        Ok(self.0.find_element(selector).await.ok().map(CdpElement))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Self>, DriverError> {
        Ok(self
            .0
            .find_elements(selector)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(CdpElement)
            .collect())
    }
}

#[async_trait]
impl Driver for CdpDriver {
    type Element = CdpElement;

    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        debug!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Navigation(e.to_string()))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| DriverError::Session(e.to_string()))?;
        Ok(url.map(|u| u.to_string()).unwrap_or_default())
    }

    async fn query(&self, selector: &str) -> Result<Option<Self::Element>, DriverError> {
        Ok(self.page.find_element(selector).await.ok().map(CdpElement))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, DriverError> {
        Ok(self
            .page
            .find_elements(selector)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(CdpElement)
            .collect())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        let value = self
            .evaluate("document.body ? document.body.innerText : ''")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        self.page
            .content()
            .await
            .map_err(|e| DriverError::Session(e.to_string()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| DriverError::Session(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        info!("Closing browser session");
        if self.remote {
            // Leave a remote browser running; only drop our page.
            let _ = self.page.clone().close().await;
        } else {
            let _ = self.browser.close().await;
            let _ = self.browser.wait().await;
        }
        Ok(())
    }
}
