//! Multi-candidate element resolution.
//!
//! Every lookup in the crawl funnels through these helpers: ordered
//! structured candidates first, then (for text fields) a scripted
//! document query, then regex patterns over the full page text. A miss
//! at any tier is silent; only total exhaustion yields `None`.

use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::browser::{Driver, PageElement};

/// Poll interval for bounded waits.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// First candidate that resolves to an element.
pub async fn find_one<D: Driver>(driver: &D, candidates: &[&str]) -> Option<D::Element> {
    for selector in candidates {
        match driver.query(selector).await {
            Ok(Some(element)) => return Some(element),
            Ok(None) => continue,
            Err(e) => {
                debug!("Lookup error for {}: {}", selector, e);
                continue;
            }
        }
    }
    None
}

/// Full match set of the first candidate that yields a non-empty set.
///
/// Candidates are alternatives for the same logical field, so sets are
/// never unioned across them.
pub async fn find_all<D: Driver>(driver: &D, candidates: &[&str]) -> Vec<D::Element> {
    for selector in candidates {
        match driver.query_all(selector).await {
            Ok(elements) if !elements.is_empty() => return elements,
            Ok(_) => continue,
            Err(e) => {
                debug!("Lookup error for {}: {}", selector, e);
                continue;
            }
        }
    }
    Vec::new()
}

/// Like [`find_one`], but each candidate is polled until it appears or
/// its share of `timeout` elapses. Candidates are tried in order, never
/// in parallel.
pub async fn wait_for_one<D: Driver>(
    driver: &D,
    candidates: &[&str],
    timeout: Duration,
) -> Option<D::Element> {
    if candidates.is_empty() {
        return None;
    }
    let share = timeout / candidates.len() as u32;

    for selector in candidates {
        let deadline = tokio::time::Instant::now() + share;
        loop {
            if let Ok(Some(element)) = driver.query(selector).await {
                return Some(element);
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
    None
}

/// Poll the current location until `pred` accepts it or `timeout`
/// elapses. Returns whether the predicate was satisfied.
pub async fn wait_for_location<D, F>(driver: &D, timeout: Duration, pred: F) -> bool
where
    D: Driver,
    F: Fn(&str) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Ok(url) = driver.current_url().await {
            if pred(&url) {
                return true;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// One field's full fallback chain.
///
/// Tiers run in order: structured candidates (text content, optionally
/// a named attribute when the text is empty), then a scripted document
/// query, then regex patterns applied to the whole body text. The first
/// non-empty result wins.
pub struct FallbackChain<'a> {
    pub candidates: &'a [&'a str],
    /// Attribute consulted when a candidate's text content is empty.
    pub attribute: Option<&'a str>,
    /// Scripted query returning a string (or nothing).
    pub script: Option<&'a str>,
    /// Patterns matched against the full body text. Capture group 1 is
    /// used when present, the whole match otherwise.
    pub patterns: &'a [Regex],
}

/// Resolve a text field through its fallback chain.
pub async fn resolve_text<D: Driver>(driver: &D, chain: &FallbackChain<'_>) -> Option<String> {
    // Tier 1: structured candidates.
    for selector in chain.candidates {
        let element = match driver.query(selector).await {
            Ok(Some(element)) => element,
            _ => continue,
        };

        if let Ok(text) = element.text().await {
            if !text.is_empty() {
                return Some(text);
            }
        }
        if let Some(attr) = chain.attribute {
            if let Ok(Some(value)) = element.attribute(attr).await {
                if !value.trim().is_empty() {
                    return Some(value.trim().to_string());
                }
            }
        }
    }

    // Tier 2: scripted document query.
    if let Some(script) = chain.script {
        if let Ok(value) = driver.evaluate(script).await {
            if let Some(text) = value.as_str() {
                let text = text.trim();
                if !text.is_empty() {
                    debug!("Field resolved via scripted query");
                    return Some(text.to_string());
                }
            }
        }
    }

    // Tier 3: pattern search over the full page text.
    if !chain.patterns.is_empty() {
        if let Ok(body) = driver.body_text().await {
            for pattern in chain.patterns {
                if let Some(caps) = pattern.captures(&body) {
                    let text = caps
                        .get(1)
                        .or_else(|| caps.get(0))
                        .map(|m| m.as_str().trim().to_string());
                    if let Some(text) = text {
                        if !text.is_empty() {
                            debug!("Field resolved via text pattern {}", pattern.as_str());
                            return Some(text);
                        }
                    }
                }
            }
        }
    }

    None
}
