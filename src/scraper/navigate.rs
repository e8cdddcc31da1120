//! Navigation to the statistics view and reporting-period control.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::browser::{Diagnostics, Driver, PageElement};

use super::resolve;
use super::selectors::DashboardSelectors;
use super::{CrawlError, STATS_PATH, STATS_URL};

/// Reporting window shown by the statistics view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReportingPeriod {
    /// All-time totals.
    #[default]
    All,
    Month,
    Week,
}

impl ReportingPeriod {
    /// Button label as rendered by the period switcher.
    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "全期間",
            Self::Month => "月",
            Self::Week => "週",
        }
    }
}

/// Clicks the period button whose label matches. The switcher has no
/// stable classes, so this goes straight at the labelled control group.
const PERIOD_SWITCH_SCRIPT: &str = r#"
(() => {
    const buttons = document.querySelectorAll('ul[aria-label="表示期間切り替え"] button');
    for (const button of buttons) {
        if (button.textContent.trim() === __LABEL__) {
            if (button.classList.contains('is-active')) {
                return 'already-active';
            }
            if (!button.disabled) {
                button.click();
                return 'clicked';
            }
        }
    }
    return 'missing';
})()
"#;

/// Bring the session to the statistics view with the requested
/// reporting window active.
///
/// Direct navigation is preferred; the dashboard-link route is only a
/// fallback for sessions that get bounced off the direct URL.
pub async fn open_stats_dashboard<D: Driver>(
    driver: &D,
    selectors: &DashboardSelectors,
    period: ReportingPeriod,
    delay: Duration,
    diagnostics: &Diagnostics,
) -> Result<(), CrawlError> {
    info!("Navigating to the statistics dashboard");
    driver.goto(STATS_URL).await?;
    tokio::time::sleep(delay).await;
    diagnostics.capture_markup(driver, "dashboard_page").await;

    if !at_stats_view(driver).await {
        warn!("Direct navigation did not land on the stats view, trying the dashboard link");
        follow_dashboard_links(driver, selectors, delay).await;
    }

    let location = driver.current_url().await.unwrap_or_default();
    if !location.contains(STATS_PATH) && !location.contains("/dashboard") {
        error!("Failed to reach the statistics dashboard (at {})", location);
        diagnostics
            .capture_failure(driver, "dashboard_navigation_failed")
            .await;
        return Err(CrawlError::Navigation {
            expected: STATS_PATH.to_string(),
            actual: location,
        });
    }

    switch_period(driver, period, delay).await;
    info!("Statistics dashboard ready");
    Ok(())
}

async fn at_stats_view<D: Driver>(driver: &D) -> bool {
    driver
        .current_url()
        .await
        .map(|url| url.contains(STATS_PATH))
        .unwrap_or(false)
}

/// Legacy route: a dashboard link followed by the articles tab.
async fn follow_dashboard_links<D: Driver>(
    driver: &D,
    selectors: &DashboardSelectors,
    delay: Duration,
) {
    if let Some(link) = resolve::find_one(driver, selectors.link).await {
        if link.click().await.is_ok() {
            tokio::time::sleep(delay).await;
        }
    }
    if let Some(tab) = resolve::find_one(driver, selectors.articles_tab).await {
        if tab.click().await.is_ok() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Switch the reporting window. Best-effort: a missing switcher leaves
/// whatever window the dashboard defaulted to.
async fn switch_period<D: Driver>(driver: &D, period: ReportingPeriod, delay: Duration) {
    let label =
        serde_json::to_string(period.label()).unwrap_or_else(|_| "\"全期間\"".to_string());
    let script = PERIOD_SWITCH_SCRIPT.replace("__LABEL__", &label);

    match driver.evaluate(&script).await {
        Ok(value) => match value.as_str() {
            Some("clicked") => {
                info!("Switched reporting period to {}", period.label());
                // Let the table reload with the new window.
                tokio::time::sleep(delay).await;
            }
            Some("already-active") => {
                info!("Reporting period {} already active", period.label());
            }
            _ => {
                warn!("Period switcher not found or not clickable");
            }
        },
        Err(e) => {
            warn!("Period switch failed: {}", e);
        }
    }
}
