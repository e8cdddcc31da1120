//! Per-article enrichment from the public article pages.
//!
//! The listing tier cannot see publish dates or body text, and its view
//! counts are occasionally blank. Each target article gets one visit
//! that fills those fields through the usual fallback chains. Every
//! field resolution is isolated: a miss or error leaves that field
//! alone and the loop moves on.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::browser::{Driver, PageElement};
use crate::models::Article;

use super::parse::parse_count;
use super::resolve::{resolve_text, FallbackChain};
use super::selectors::DetailSelectors;

/// Date shapes seen on article pages: Japanese year/month/day, a
/// day/month form with trailing year, and plain ISO.
static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"\d{4}[年/\-]\s*\d{1,2}[月/\-]\s*\d{1,2}日?").unwrap(),
        Regex::new(r"\d{1,2}[月/]\s*\d{1,2}日?,\s*\d{4}").unwrap(),
        Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap(),
    ]
});

/// Labelled or unit-suffixed view counts in running text.
static VIEW_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(\d[\d.,]*)\s*(?:views|view|回|閲覧)").unwrap(),
        Regex::new(r"閲覧数[：:]\s*(\d[\d.,]*)").unwrap(),
        Regex::new(r"(?i)views[：:]\s*(\d[\d.,]*)").unwrap(),
    ]
});

/// Probes the same elements the structured candidates address, but from
/// inside the document, where `datetime` attributes on shadowed nodes
/// are still reachable.
const DATE_PROBE_SCRIPT: &str = r#"
(() => {
    const candidates = [
        document.querySelector('.o-noteContentHeader__date time'),
        document.querySelector('.o-noteContentHeader time'),
        document.querySelector('.m-article__date time'),
        document.querySelector('.note-common-styles__date time'),
        document.querySelector('time'),
        document.querySelector('[datetime]'),
        document.querySelector('.o-noteContentData__date')
    ];
    for (const el of candidates) {
        if (!el) continue;
        const text = el.textContent.trim();
        if (text) return text;
        const attr = el.getAttribute('datetime');
        if (attr) return attr;
    }
    return '';
})()
"#;

/// Body containers in preference order, with the whole body as a last
/// resort so long-form articles never come back empty.
const BODY_TEXT_SCRIPT: &str = r#"
(() => {
    const candidates = [
        document.querySelector('.note-common-styles__textnote-body'),
        document.querySelector('.o-noteContentText'),
        document.querySelector('article .o-noteEmbedContainer'),
        document.querySelector('.m-textContent'),
        document.querySelector('article')
    ];
    for (const el of candidates) {
        if (el && el.textContent.trim()) {
            return el.textContent.trim();
        }
    }
    return document.body ? document.body.textContent.trim() : '';
})()
"#;

/// Scan for any element whose text pairs a view-related keyword with a
/// digit. Returns the raw text; the caller digs the number out.
const VIEW_SCAN_SCRIPT: &str = r#"
(() => {
    const all = document.querySelectorAll('*');
    for (const el of all) {
        const text = el.textContent.trim();
        if (text.length > 80) continue;
        if ((text.includes('閲覧') || text.includes('view') ||
             text.includes('View') || text.includes('読者')) && /\d/.test(text)) {
            return text;
        }
    }
    return '';
})()
"#;

/// Enrich the first `cap` articles (all of them when uncapped).
pub async fn enrich_all<D: Driver>(
    driver: &D,
    selectors: &DetailSelectors,
    articles: &mut [Article],
    cap: Option<usize>,
    delay: Duration,
) {
    let limit = cap.unwrap_or(articles.len()).min(articles.len());
    info!("Fetching details for {} article(s)", limit);

    for (index, article) in articles.iter_mut().take(limit).enumerate() {
        info!(
            "Fetching article details ({}/{}): {}",
            index + 1,
            limit,
            article.title
        );
        enrich_article(driver, selectors, article, delay).await;
        // Uniform inter-article delay, whatever happened above.
        tokio::time::sleep(delay).await;
    }

    info!("Article detail pass complete");
}

/// Fill in publish date, body text and (when missing) views for one
/// article. Never fails: unresolved fields keep their current values.
pub async fn enrich_article<D: Driver>(
    driver: &D,
    selectors: &DetailSelectors,
    article: &mut Article,
    delay: Duration,
) {
    if !article.enrichable() {
        debug!("Skipping article without permalink: {}", article.title);
        return;
    }

    if let Err(e) = driver.goto(&article.url).await {
        warn!("Could not open article page {}: {}", article.url, e);
        return;
    }
    tokio::time::sleep(delay).await;

    resolve_published_at(driver, selectors, article).await;
    resolve_body(driver, selectors, article).await;

    // The listing usually supplies views; only chase them when it
    // did not.
    if article.views == 0 {
        let views = resolve_views(driver, selectors).await;
        if views > 0 {
            article.views = views;
            debug!("Views resolved from article page: {}", views);
        }
    }
}

async fn resolve_published_at<D: Driver>(
    driver: &D,
    selectors: &DetailSelectors,
    article: &mut Article,
) {
    let structured = FallbackChain {
        candidates: selectors.published_at,
        attribute: Some("datetime"),
        script: None,
        patterns: &[],
    };
    if let Some(date) = resolve_text(driver, &structured).await {
        debug!("Publish date from structured selector: {}", date);
        article.published_at = date;
        return;
    }

    // Scripted and pattern tiers only run while the field is still
    // empty, so a listing-supplied date survives a structured miss.
    if article.published_at.is_empty() {
        let fallback = FallbackChain {
            candidates: &[],
            attribute: None,
            script: Some(DATE_PROBE_SCRIPT),
            patterns: DATE_PATTERNS.as_slice(),
        };
        if let Some(date) = resolve_text(driver, &fallback).await {
            debug!("Publish date from fallback tiers: {}", date);
            article.published_at = date;
        }
    }
}

async fn resolve_body<D: Driver>(
    driver: &D,
    selectors: &DetailSelectors,
    article: &mut Article,
) {
    let chain = FallbackChain {
        candidates: selectors.body,
        attribute: None,
        script: Some(BODY_TEXT_SCRIPT),
        patterns: &[],
    };
    if let Some(text) = resolve_text(driver, &chain).await {
        article.set_text_content(text);
        debug!("Body text resolved ({} chars)", article.char_count);
    }
}

/// Three-tier view-count resolution. The structured tier stops at the
/// first candidate that parses to a positive number.
async fn resolve_views<D: Driver>(driver: &D, selectors: &DetailSelectors) -> u64 {
    for selector in selectors.views {
        if let Ok(Some(element)) = driver.query(selector).await {
            if let Ok(text) = element.text().await {
                let views = parse_count(&text);
                if views > 0 {
                    return views;
                }
            }
        }
    }

    if let Ok(value) = driver.evaluate(VIEW_SCAN_SCRIPT).await {
        if let Some(text) = value.as_str() {
            let views = count_from_noisy_text(text);
            if views > 0 {
                return views;
            }
        }
    }

    let chain = FallbackChain {
        candidates: &[],
        attribute: None,
        script: None,
        patterns: VIEW_PATTERNS.as_slice(),
    };
    match resolve_text(driver, &chain).await {
        Some(text) => parse_count(&text),
        None => 0,
    }
}

/// Pull a count out of free text like "閲覧数: 1,234" or "450 views".
fn count_from_noisy_text(text: &str) -> u64 {
    let direct = parse_count(text);
    if direct > 0 {
        return direct;
    }
    for pattern in VIEW_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            if let Some(m) = caps.get(1) {
                let views = parse_count(m.as_str());
                if views > 0 {
                    return views;
                }
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_patterns_cover_known_shapes() {
        assert!(DATE_PATTERNS[0].is_match("2023年10月1日"));
        assert!(DATE_PATTERNS[0].is_match("2023/10/1"));
        assert!(DATE_PATTERNS[1].is_match("10月1日, 2023"));
        assert!(DATE_PATTERNS[2].is_match("公開: 2023-10-01"));
    }

    #[test]
    fn noisy_view_text_yields_counts() {
        assert_eq!(count_from_noisy_text("1,234"), 1234);
        assert_eq!(count_from_noisy_text("450 views"), 450);
        assert_eq!(count_from_noisy_text("閲覧数: 450"), 450);
        assert_eq!(count_from_noisy_text("1,234 回"), 1234);
        assert_eq!(count_from_noisy_text("スキ"), 0);
    }

    #[test]
    fn view_patterns_prefer_the_labelled_number() {
        let caps = VIEW_PATTERNS[1].captures("プロフィール 閲覧数: 450 フォロー").unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "450");
    }
}
