//! Pagination over the statistics table.
//!
//! Strictly sequential: one page at a time, with a courtesy delay after
//! every advance so the crawl never looks like a burst.

use std::time::Duration;

use tracing::{info, warn};

use crate::browser::{Diagnostics, Driver, PageElement};
use crate::models::Article;

use super::listing;
use super::resolve;
use super::selectors::SelectorTables;

/// Whether an enabled "next page" control is present.
pub async fn has_next<D: Driver>(driver: &D, selectors: &SelectorTables) -> bool {
    match resolve::find_one(driver, selectors.pagination.next).await {
        Some(control) => control.is_enabled().await.unwrap_or(false),
        None => false,
    }
}

/// Activate the "next page" control. Returns whether navigation was
/// actually triggered.
pub async fn advance<D: Driver>(
    driver: &D,
    selectors: &SelectorTables,
    delay: Duration,
) -> bool {
    let control = match resolve::find_one(driver, selectors.pagination.next).await {
        Some(control) => control,
        None => {
            info!("No further pages");
            return false;
        }
    };
    if !control.is_enabled().await.unwrap_or(false) {
        info!("No further pages");
        return false;
    }

    match control.click().await {
        Ok(()) => {
            tokio::time::sleep(delay).await;
            true
        }
        Err(e) => {
            warn!("Failed to advance to the next page: {}", e);
            false
        }
    }
}

/// Extract every listing page, up to `max_pages` when given.
///
/// The loop stops on the first failed advance even if a "next" control
/// is still reported, so a wedged paginator cannot spin forever.
pub async fn collect_pages<D: Driver>(
    driver: &D,
    selectors: &SelectorTables,
    max_pages: Option<usize>,
    delay: Duration,
    diagnostics: &Diagnostics,
) -> Vec<Article> {
    let mut all_articles = Vec::new();
    let mut page_count = 1usize;

    let page_articles = listing::extract_page(driver, &selectors.listing, diagnostics).await;
    info!("Page {}: {} articles", page_count, page_articles.len());
    all_articles.extend(page_articles);

    while has_next(driver, selectors).await
        && max_pages.map(|cap| page_count < cap).unwrap_or(true)
    {
        if !advance(driver, selectors, delay).await {
            break;
        }
        page_count += 1;
        let page_articles =
            listing::extract_page(driver, &selectors.listing, diagnostics).await;
        info!("Page {}: {} articles", page_count, page_articles.len());
        all_articles.extend(page_articles);
    }

    info!(
        "Collected {} articles across {} page(s)",
        all_articles.len(),
        page_count
    );
    all_articles
}
