//! Dashboard crawl: login, navigation, paginated listing extraction and
//! per-article enrichment.
//!
//! The crawl is a strictly sequential flow over one browser session.
//! Field-level misses degrade to defaults; only login, dashboard
//! navigation and the session itself can end a crawl early, and the
//! session is torn down on every exit path.

pub mod auth;
pub mod detail;
pub mod listing;
pub mod navigate;
pub mod pagination;
pub mod parse;
pub mod resolve;
pub mod selectors;

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::browser::{Diagnostics, Driver, DriverError};
use crate::config::Credentials;
use crate::models::Article;

pub use navigate::ReportingPeriod;
pub use selectors::SelectorTables;

pub const BASE_URL: &str = "https://note.com";
pub const LOGIN_URL: &str = "https://note.com/login";
pub const STATS_URL: &str = "https://note.com/sitesettings/stats";

pub const LOGIN_PATH: &str = "/login";
pub const STATS_PATH: &str = "/sitesettings/stats";

/// Failures that end a crawl phase.
///
/// Everything below this level (a selector miss, an empty listing page,
/// an unreadable detail field) is absorbed where it happens.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The browser session could not be acquired or stopped responding.
    #[error("page automation capability failed: {0}")]
    Capability(#[from] DriverError),
    /// The login flow did not complete.
    #[error("login was not completed")]
    LoginFailed,
    /// An expected location was never reached.
    #[error("navigation failed: expected {expected}, ended at {actual}")]
    Navigation { expected: String, actual: String },
}

/// Caller-facing knobs for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Reporting window to select on the dashboard.
    pub period: ReportingPeriod,
    /// Visit at most this many listing pages.
    pub max_pages: Option<usize>,
    /// Enrich at most this many articles.
    pub max_articles: Option<usize>,
    /// Whether to visit article pages at all.
    pub fetch_details: bool,
    /// Courtesy delay between page interactions.
    pub request_delay: Duration,
    /// Bound for element waits and navigation confirmation.
    pub timeout: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            period: ReportingPeriod::All,
            max_pages: None,
            max_articles: None,
            fetch_details: true,
            request_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
        }
    }
}

/// One crawl over one browser session.
///
/// Owns the driver for its whole lifetime; [`Crawler::run`] consumes
/// the crawler and releases the session on every path out.
pub struct Crawler<D: Driver> {
    driver: D,
    credentials: Credentials,
    options: CrawlOptions,
    selectors: SelectorTables,
    diagnostics: Diagnostics,
}

impl<D: Driver> Crawler<D> {
    pub fn new(
        driver: D,
        credentials: Credentials,
        options: CrawlOptions,
        output_dir: &Path,
    ) -> Self {
        Self {
            driver,
            credentials,
            options,
            selectors: SelectorTables::default(),
            diagnostics: Diagnostics::new(output_dir),
        }
    }

    /// Run the crawl to completion and release the browser session.
    ///
    /// Login and navigation failures are reported through logs and
    /// diagnostics and yield an empty record list; only a failing
    /// session surfaces as an error. Either way the session is closed
    /// exactly once.
    pub async fn run(mut self) -> Result<Vec<Article>, CrawlError> {
        info!("Starting dashboard crawl");
        let outcome = self.crawl().await;

        if let Err(e) = self.driver.close().await {
            warn!("Browser teardown reported an error: {}", e);
        }

        match outcome {
            Ok(articles) => {
                info!("Crawl finished with {} article(s)", articles.len());
                Ok(articles)
            }
            Err(e @ (CrawlError::LoginFailed | CrawlError::Navigation { .. })) => {
                error!("Crawl aborted: {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn crawl(&self) -> Result<Vec<Article>, CrawlError> {
        let mut authenticator = auth::Authenticator::new(
            &self.selectors.login,
            &self.credentials,
            self.options.timeout,
            self.options.request_delay,
        );
        authenticator.run(&self.driver, &self.diagnostics).await?;

        navigate::open_stats_dashboard(
            &self.driver,
            &self.selectors.dashboard,
            self.options.period,
            self.options.request_delay,
            &self.diagnostics,
        )
        .await?;

        let mut articles = pagination::collect_pages(
            &self.driver,
            &self.selectors,
            self.options.max_pages,
            self.options.request_delay,
            &self.diagnostics,
        )
        .await;

        if self.options.fetch_details && !articles.is_empty() {
            detail::enrich_all(
                &self.driver,
                &self.selectors.detail,
                &mut articles,
                self.options.max_articles,
                self.options.request_delay,
            )
            .await;
        }

        Ok(articles)
    }
}
