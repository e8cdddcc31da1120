//! Page-automation capability boundary.
//!
//! The crawl logic never talks to a concrete browser; it drives the
//! [`Driver`]/[`PageElement`] traits. The CDP-backed implementation
//! lives in [`cdp`]; tests substitute an in-memory fake.

pub mod cdp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the underlying browser session.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("failed to attach to remote browser: {0}")]
    Connect(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("browser session error: {0}")]
    Session(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A live element handle scoped to the current document.
///
/// Handles go stale on navigation; callers re-resolve instead of
/// holding them across page loads.
#[async_trait]
pub trait PageElement: Send + Sync + Sized {
    /// Rendered text content, trimmed. Empty string when the element
    /// has no text.
    async fn text(&self) -> Result<String, DriverError>;

    /// Attribute value, `None` when absent.
    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError>;

    /// Activate the element (native click).
    async fn click(&self) -> Result<(), DriverError>;

    /// Send keystrokes into the element.
    async fn type_text(&self, text: &str) -> Result<(), DriverError>;

    /// Whether the control currently accepts interaction.
    async fn is_enabled(&self) -> Result<bool, DriverError>;

    /// First descendant matching `selector`, if any.
    async fn query(&self, selector: &str) -> Result<Option<Self>, DriverError>;

    /// All descendants matching `selector`.
    async fn query_all(&self, selector: &str) -> Result<Vec<Self>, DriverError>;
}

/// Operations the crawl needs from a browser session.
///
/// `query`/`query_all` report a miss as `Ok(None)`/`Ok(vec![])`; errors
/// are reserved for the session itself becoming unusable.
#[async_trait]
pub trait Driver: Send + Sync {
    type Element: PageElement;

    /// Navigate the session to `url` and wait for the load to settle.
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// Current location of the session.
    async fn current_url(&self) -> Result<String, DriverError>;

    /// First element matching `selector` in the current document.
    async fn query(&self, selector: &str) -> Result<Option<Self::Element>, DriverError>;

    /// All elements matching `selector` in the current document.
    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, DriverError>;

    /// Run a script against the live document and return its result as
    /// JSON (`Null` when the script yields nothing usable).
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError>;

    /// Full visible text of the document body.
    async fn body_text(&self) -> Result<String, DriverError>;

    /// Current rendered markup of the document.
    async fn page_source(&self) -> Result<String, DriverError>;

    /// PNG capture of the current viewport/page.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Tear the session down. Must be safe to call exactly once on
    /// every exit path.
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Best-effort capture of failure artifacts for offline inspection.
///
/// Capture failures are logged and swallowed; diagnostics never affect
/// control flow.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    screenshot_dir: PathBuf,
    markup_dir: PathBuf,
}

impl Diagnostics {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            screenshot_dir: output_dir.join("screenshots"),
            markup_dir: output_dir.join("debug"),
        }
    }

    /// Save a PNG of the current page as `<label>_<timestamp>.png`.
    pub async fn capture_screenshot<D: Driver>(&self, driver: &D, label: &str) {
        let result = async {
            let bytes = driver.screenshot().await?;
            std::fs::create_dir_all(&self.screenshot_dir)?;
            let path = self.screenshot_dir.join(timestamped(label, "png"));
            std::fs::write(&path, bytes)?;
            Ok::<_, DriverError>(path)
        }
        .await;

        match result {
            Ok(path) => info!("Saved screenshot to {}", path.display()),
            Err(e) => warn!("Screenshot capture failed ({}): {}", label, e),
        }
    }

    /// Save the rendered markup as `<label>_<timestamp>.html`.
    pub async fn capture_markup<D: Driver>(&self, driver: &D, label: &str) {
        let result = async {
            let source = driver.page_source().await?;
            std::fs::create_dir_all(&self.markup_dir)?;
            let path = self.markup_dir.join(timestamped(label, "html"));
            std::fs::write(&path, source)?;
            Ok::<_, DriverError>(path)
        }
        .await;

        match result {
            Ok(path) => info!("Saved page source to {}", path.display()),
            Err(e) => warn!("Page source capture failed ({}): {}", label, e),
        }
    }

    /// Capture both artifacts for a failure site.
    pub async fn capture_failure<D: Driver>(&self, driver: &D, label: &str) {
        self.capture_screenshot(driver, label).await;
        self.capture_markup(driver, label).await;
    }
}

fn timestamped(label: &str, ext: &str) -> String {
    format!("{}_{}.{}", label, Local::now().format("%Y%m%d%H%M%S"), ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamped_names_keep_label_and_extension() {
        let name = timestamped("login_failed", "png");
        assert!(name.starts_with("login_failed_"));
        assert!(name.ends_with(".png"));
    }
}
