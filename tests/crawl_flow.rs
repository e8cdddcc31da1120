//! End-to-end crawl scenarios against an in-memory page driver.
//!
//! The fake driver models just enough of the dashboard to exercise the
//! full flow: a login form, a paginated stats table served through the
//! scripted harvest, and article pages that only give their data up to
//! the text-pattern tier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use notestats::browser::{Driver, DriverError, PageElement};
use notestats::config::Credentials;
use notestats::scraper::resolve::{resolve_text, FallbackChain};
use notestats::scraper::{CrawlOptions, Crawler, ReportingPeriod};

#[derive(Default)]
struct FakeState {
    url: String,
    page_index: usize,
    /// One JSON array of row objects per listing page.
    listing_pages: Vec<Value>,
    /// Whether the login form exposes any submit control.
    login_has_submit: bool,
    /// Body text of article pages, keyed by permalink.
    detail_bodies: HashMap<String, String>,
    /// Canned results for ad hoc scripted queries, keyed by a substring
    /// of the script.
    scripted_results: HashMap<String, Value>,
    closes: u32,
}

#[derive(Clone)]
struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    fn new(state: FakeState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn closes(&self) -> u32 {
        self.state.lock().unwrap().closes
    }

    fn handle(&self, kind: ElementKind) -> FakeElement {
        FakeElement {
            kind,
            state: Arc::clone(&self.state),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ElementKind {
    EmailField,
    PasswordField,
    SubmitButton,
    NextButton,
}

struct FakeElement {
    kind: ElementKind,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl PageElement for FakeElement {
    async fn text(&self) -> Result<String, DriverError> {
        Ok(String::new())
    }

    async fn attribute(&self, _name: &str) -> Result<Option<String>, DriverError> {
        Ok(None)
    }

    async fn click(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        match self.kind {
            ElementKind::SubmitButton => {
                // Successful login routes the session off the login page.
                state.url = "https://note.com/".to_string();
            }
            ElementKind::NextButton => {
                state.page_index += 1;
            }
            _ => {}
        }
        Ok(())
    }

    async fn type_text(&self, _text: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn is_enabled(&self) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn query(&self, _selector: &str) -> Result<Option<Self>, DriverError> {
        Ok(None)
    }

    async fn query_all(&self, _selector: &str) -> Result<Vec<Self>, DriverError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl Driver for FakeDriver {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.state.lock().unwrap().url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn query(&self, selector: &str) -> Result<Option<Self::Element>, DriverError> {
        let (url, has_submit, more_pages) = {
            let state = self.state.lock().unwrap();
            (
                state.url.clone(),
                state.login_has_submit,
                state.page_index + 1 < state.listing_pages.len(),
            )
        };

        if url.contains("/login") {
            if selector.contains("email") || selector.contains("メール") {
                return Ok(Some(self.handle(ElementKind::EmailField)));
            }
            if selector.contains("password") || selector.contains("パスワード") {
                return Ok(Some(self.handle(ElementKind::PasswordField)));
            }
            if selector.contains("button") || selector.contains("submit") {
                return Ok(has_submit.then(|| self.handle(ElementKind::SubmitButton)));
            }
            return Ok(None);
        }

        if url.contains("/sitesettings/stats")
            && (selector.contains("pagination-next")
                || selector.contains("next-page")
                || selector.contains("次のページ"))
        {
            return Ok(more_pages.then(|| self.handle(ElementKind::NextButton)));
        }

        Ok(None)
    }

    async fn query_all(&self, _selector: &str) -> Result<Vec<Self::Element>, DriverError> {
        Ok(Vec::new())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        let state = self.state.lock().unwrap();

        if let Some((_, value)) = state
            .scripted_results
            .iter()
            .find(|(key, _)| script.contains(key.as_str()))
        {
            return Ok(value.clone());
        }

        if script.contains("表示期間切り替え") {
            return Ok(json!("already-active"));
        }
        if script.contains("o-login__button") {
            // Scripted submit fallback mirrors the structured state.
            return Ok(json!(state.login_has_submit));
        }
        if script.contains("o-statsContent__table") {
            if state.url.contains("/sitesettings/stats") {
                return Ok(state
                    .listing_pages
                    .get(state.page_index)
                    .cloned()
                    .unwrap_or_else(|| json!([])));
            }
            return Ok(json!([]));
        }
        if script.contains("textnote-body") {
            let body = state.detail_bodies.get(&state.url).cloned();
            return Ok(json!(body.unwrap_or_default()));
        }

        Ok(Value::Null)
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        let state = self.state.lock().unwrap();
        Ok(state.detail_bodies.get(&state.url).cloned().unwrap_or_default())
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        Ok("<html><body></body></html>".to_string())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

fn row(title: &str, views: &str, likes: &str, comments: &str) -> Value {
    json!({
        "title": title,
        "url": format!("https://note.com/writer/n/{title}"),
        "published_at": "",
        "views": views,
        "likes": likes,
        "comments": comments,
    })
}

fn credentials() -> Credentials {
    Credentials {
        username: "writer@example.com".to_string(),
        password: "secret".to_string(),
    }
}

fn fast_options() -> CrawlOptions {
    CrawlOptions {
        period: ReportingPeriod::All,
        max_pages: None,
        max_articles: None,
        fetch_details: true,
        request_delay: Duration::ZERO,
        timeout: Duration::from_millis(200),
    }
}

#[tokio::test]
async fn two_page_listing_yields_all_records() {
    let state = FakeState {
        listing_pages: vec![
            json!([
                row("a1", "100", "10", "1"),
                row("a2", "1.2k", "20", "2"),
                row("a3", "300", "30", "3"),
                row("a4", "400", "40", "4"),
                row("a5", "500", "50", "5"),
            ]),
            json!([
                row("b1", "600", "60", "6"),
                row("b2", "700", "70", "7"),
                row("b3", "800", "80", "8"),
            ]),
        ],
        login_has_submit: true,
        ..Default::default()
    };
    let driver = FakeDriver::new(state);
    let probe = driver.clone();

    let output = tempfile::tempdir().unwrap();
    let mut options = fast_options();
    options.fetch_details = false;

    let crawler = Crawler::new(driver, credentials(), options, output.path());
    let articles = crawler.run().await.unwrap();

    assert_eq!(articles.len(), 8);
    assert_eq!(articles[0].views, 100);
    assert_eq!(articles[1].views, 1200);
    assert_eq!(articles[7].likes, 80);
    // Publish dates stay empty until the detail pass runs.
    assert!(articles.iter().all(|a| a.published_at.is_empty()));
    assert!(articles.iter().all(|a| a.url.starts_with("https://note.com/")));
    assert_eq!(probe.closes(), 1);
}

#[tokio::test]
async fn failed_login_returns_nothing_and_releases_the_session_once() {
    let state = FakeState {
        listing_pages: vec![json!([row("a1", "100", "10", "1")])],
        login_has_submit: false,
        ..Default::default()
    };
    let driver = FakeDriver::new(state);
    let probe = driver.clone();

    let output = tempfile::tempdir().unwrap();
    let crawler = Crawler::new(driver, credentials(), fast_options(), output.path());
    let articles = crawler.run().await.unwrap();

    assert!(articles.is_empty());
    assert_eq!(probe.closes(), 1);
}

#[tokio::test]
async fn page_cap_bounds_the_crawl() {
    let state = FakeState {
        listing_pages: vec![
            json!([row("a1", "1", "0", "0"), row("a2", "2", "0", "0")]),
            json!([row("b1", "3", "0", "0"), row("b2", "4", "0", "0")]),
            json!([row("c1", "5", "0", "0"), row("c2", "6", "0", "0")]),
        ],
        login_has_submit: true,
        ..Default::default()
    };
    let driver = FakeDriver::new(state);

    let output = tempfile::tempdir().unwrap();
    let mut options = fast_options();
    options.fetch_details = false;
    options.max_pages = Some(2);

    let crawler = Crawler::new(driver, credentials(), options, output.path());
    let articles = crawler.run().await.unwrap();

    // Two pages visited, the third never reached.
    assert_eq!(articles.len(), 4);
    assert!(articles.iter().all(|a| !a.title.starts_with('c')));
}

#[tokio::test]
async fn detail_pass_recovers_views_through_the_text_pattern_tier() {
    let body = "記事のヘッダー 公開 2023年10月1日 閲覧数: 450 本文テキストです。";
    let mut detail_bodies = HashMap::new();
    detail_bodies.insert(
        "https://note.com/writer/n/a1".to_string(),
        body.to_string(),
    );

    let state = FakeState {
        listing_pages: vec![json!([
            row("a1", "0", "10", "1"),
            row("a2", "500", "5", "0"),
        ])],
        login_has_submit: true,
        detail_bodies,
        ..Default::default()
    };
    let driver = FakeDriver::new(state);

    let output = tempfile::tempdir().unwrap();
    let crawler = Crawler::new(driver, credentials(), fast_options(), output.path());
    let articles = crawler.run().await.unwrap();

    assert_eq!(articles.len(), 2);

    // Views missing from the listing come back from the page text.
    let enriched = &articles[0];
    assert_eq!(enriched.views, 450);
    assert!(enriched.published_at.contains("2023年10月1日"));
    assert_eq!(enriched.text_content, body);
    assert_eq!(
        enriched.char_count,
        body.chars().count() as u64
    );

    // A listing-supplied count is never downgraded, and identity
    // fields survive enrichment untouched.
    let untouched = &articles[1];
    assert_eq!(untouched.views, 500);
    assert_eq!(untouched.title, "a2");
    assert_eq!(untouched.url, "https://note.com/writer/n/a2");
    assert!(untouched.text_content.is_empty());
    assert_eq!(untouched.char_count, 0);
}

#[tokio::test]
async fn scripted_tier_result_wins_when_structured_candidates_miss() {
    let mut scripted_results = HashMap::new();
    scripted_results.insert("custom field probe".to_string(), json!("tier-two-value"));

    let state = FakeState {
        url: "https://note.com/writer/n/a1".to_string(),
        scripted_results,
        ..Default::default()
    };
    let driver = FakeDriver::new(state);

    let chain = FallbackChain {
        candidates: &[".missing-everywhere", "#also-missing"],
        attribute: None,
        script: Some("/* custom field probe */"),
        patterns: &[],
    };
    let resolved = resolve_text(&driver, &chain).await;

    assert_eq!(resolved.as_deref(), Some("tier-two-value"));
}
