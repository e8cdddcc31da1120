//! Article extraction from the statistics table.
//!
//! The primary path harvests the whole table in one scripted query,
//! which survives cell-level markup drift as long as the stats classes
//! exist. The structured fallback walks table rows by position and is
//! deliberately tolerant: any cell it cannot read stays at its default.

use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{Diagnostics, Driver, PageElement};
use crate::models::Article;

use super::parse::parse_count;
use super::resolve;
use super::selectors::ListingSelectors;
use super::BASE_URL;

/// Harvest all rows of the stats table in one pass. Publish dates are
/// intentionally omitted: the listing's date column is unreliable and
/// the detail pass resolves them from the article pages.
const LISTING_HARVEST_SCRIPT: &str = r#"
(() => {
    const articles = [];
    const table = document.querySelector('.o-statsContent__table');
    if (!table) return articles;

    const rows = table.querySelectorAll('tbody tr');
    if (!rows || rows.length === 0) return articles;

    rows.forEach(row => {
        const titleCell = row.querySelector('.o-statsContent__tableTitle');
        if (!titleCell) return;
        const titleLink = titleCell.querySelector('a');
        if (!titleLink) return;

        const viewCell = row.querySelector('.o-statsContent__tableStat--type_view');
        const commentCell = row.querySelector('.o-statsContent__tableStat--type_comment');
        const likeCell = row.querySelector('.o-statsContent__tableStat--type_suki');

        articles.push({
            title: titleLink.textContent.trim(),
            url: titleLink.href,
            published_at: '',
            views: viewCell ? viewCell.textContent.trim() : '0',
            likes: likeCell ? likeCell.textContent.trim() : '0',
            comments: commentCell ? commentCell.textContent.trim() : '0'
        });
    });

    return articles;
})()
"#;

/// Row shape produced by the harvest script.
#[derive(Debug, Deserialize)]
struct RawRow {
    title: String,
    url: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    views: String,
    #[serde(default)]
    likes: String,
    #[serde(default)]
    comments: String,
}

/// Extract all article records from the currently loaded listing page.
///
/// Yields an empty vector (plus a diagnostic capture) when neither tier
/// finds anything; the caller decides whether to keep paginating.
pub async fn extract_page<D: Driver>(
    driver: &D,
    selectors: &ListingSelectors,
    diagnostics: &Diagnostics,
) -> Vec<Article> {
    let articles = harvest_rows(driver).await;
    if !articles.is_empty() {
        info!("Extracted {} articles via scripted harvest", articles.len());
        return articles;
    }

    warn!("Scripted harvest found nothing, walking the table structurally");
    let articles = walk_table(driver, selectors).await;
    if articles.is_empty() {
        warn!("No articles found on this listing page");
        diagnostics.capture_screenshot(driver, "no_stats_table").await;
    } else {
        info!("Extracted {} articles via table walk", articles.len());
    }
    articles
}

/// Tier 1: one scripted query over the stats table.
async fn harvest_rows<D: Driver>(driver: &D) -> Vec<Article> {
    let value = match driver.evaluate(LISTING_HARVEST_SCRIPT).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Listing harvest script failed: {}", e);
            return Vec::new();
        }
    };

    let rows: Vec<RawRow> = match serde_json::from_value(value) {
        Ok(rows) => rows,
        Err(e) => {
            debug!("Listing harvest returned an unexpected shape: {}", e);
            return Vec::new();
        }
    };

    rows.into_iter()
        .map(|row| {
            let mut article = Article::new(
                placeholder_title(&row.title),
                absolutize(&row.url),
                row.published_at,
            );
            article.views = parse_count(&row.views);
            article.likes = parse_count(&row.likes);
            article.comments = parse_count(&row.comments);
            article
        })
        .collect()
}

/// Tier 2: locate a table by candidates and read fixed column
/// positions. Column layout: title+link, then date in column 2, views,
/// likes and comments in columns 3..5.
async fn walk_table<D: Driver>(driver: &D, selectors: &ListingSelectors) -> Vec<Article> {
    let table = match resolve::find_one(driver, selectors.table).await {
        Some(table) => table,
        None => return Vec::new(),
    };

    let rows = table.query_all("tbody tr").await.unwrap_or_default();
    debug!("Table walk found {} rows", rows.len());

    let mut articles = Vec::new();
    for row in rows {
        let cells = row.query_all("td").await.unwrap_or_default();

        // A row without a title link is decoration, not an article.
        let link = match cells.first() {
            Some(cell) => match cell.query("a").await {
                Ok(Some(link)) => link,
                _ => continue,
            },
            None => continue,
        };
        let title = link.text().await.unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        let href = link
            .attribute("href")
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        let mut article = Article::new(title, absolutize(&href), String::new());

        if let Some(cell) = cells.get(2) {
            if let Ok(text) = cell.text().await {
                article.published_at = text;
            }
        }
        if let Some(cell) = cells.get(3) {
            if let Ok(text) = cell.text().await {
                article.views = parse_count(&text);
            }
        }
        if let Some(cell) = cells.get(4) {
            if let Ok(text) = cell.text().await {
                article.likes = parse_count(&text);
            }
        }
        if let Some(cell) = cells.get(5) {
            if let Ok(text) = cell.text().await {
                article.comments = parse_count(&text);
            }
        }

        articles.push(article);
    }
    articles
}

fn placeholder_title(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        "unknown".to_string()
    } else {
        title.to_string()
    }
}

/// Resolve a possibly-relative permalink against the site base. An
/// unparseable href yields an empty URL, which marks the record as
/// ineligible for enrichment.
fn absolutize(href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    match Url::parse(href) {
        Ok(url) => url.to_string(),
        Err(_) => Url::parse(BASE_URL)
            .and_then(|base| base.join(href))
            .map(|url| url.to_string())
            .unwrap_or_default(),
    }
}
