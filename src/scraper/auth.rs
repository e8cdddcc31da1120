//! Login flow for the note.com account.
//!
//! Locates the credential fields through the usual candidate tables,
//! falls back to scripted fills when the structured selectors have
//! drifted, and confirms success by watching the location leave the
//! login path.

use std::time::Duration;

use tracing::{debug, error, info};

use crate::browser::{Diagnostics, Driver, PageElement};
use crate::config::Credentials;

use super::resolve::{self, wait_for_location};
use super::selectors::LoginSelectors;
use super::{CrawlError, LOGIN_PATH, LOGIN_URL};

/// Progress of the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    NotStarted,
    CredentialsEntered,
    Submitted,
    Confirmed,
    Failed,
}

/// Scripted fill used when no email candidate resolves. Dispatches an
/// `input` event so the framework picks the value up.
const EMAIL_FILL_FALLBACK: &str = r#"
(() => {
    const input = document.querySelector('input[type="email"]') ||
                  document.querySelector('input[placeholder*="メール"]') ||
                  document.querySelector('input[placeholder*="mail"]');
    if (!input) return false;
    input.value = __VALUE__;
    input.dispatchEvent(new Event('input', { bubbles: true }));
    return true;
})()
"#;

const PASSWORD_FILL_FALLBACK: &str = r#"
(() => {
    const input = document.querySelector('input[type="password"]') ||
                  document.querySelector('input[placeholder*="パスワード"]') ||
                  document.querySelector('input[placeholder*="password"]');
    if (!input) return false;
    input.value = __VALUE__;
    input.dispatchEvent(new Event('input', { bubbles: true }));
    return true;
})()
"#;

const SUBMIT_CLICK_FALLBACK: &str = r#"
(() => {
    const button = document.querySelector('button[type="submit"]') ||
                   document.querySelector('.o-login__button button') ||
                   document.querySelector('button.a-button[data-type="primary"]');
    if (!button) return false;
    button.click();
    return true;
})()
"#;

/// Drives the login sequence once. No automatic retry: a failed login
/// aborts the crawl so bad credentials never hammer the endpoint.
pub struct Authenticator<'a> {
    selectors: &'a LoginSelectors,
    credentials: &'a Credentials,
    timeout: Duration,
    delay: Duration,
    state: AuthState,
}

impl<'a> Authenticator<'a> {
    pub fn new(
        selectors: &'a LoginSelectors,
        credentials: &'a Credentials,
        timeout: Duration,
        delay: Duration,
    ) -> Self {
        Self {
            selectors,
            credentials,
            timeout,
            delay,
            state: AuthState::NotStarted,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Run the full login sequence against the current session.
    pub async fn run<D: Driver>(
        &mut self,
        driver: &D,
        diagnostics: &Diagnostics,
    ) -> Result<(), CrawlError> {
        info!("Opening login page");
        driver.goto(LOGIN_URL).await?;
        diagnostics.capture_markup(driver, "login_page").await;

        // Let the client-side form render before probing for fields.
        tokio::time::sleep(self.delay).await;

        if !self.fill_identifier(driver).await {
            self.state = AuthState::Failed;
            error!("Email input field not found");
            diagnostics.capture_screenshot(driver, "email_not_found").await;
            return Err(CrawlError::LoginFailed);
        }

        if !self.fill_secret(driver).await {
            self.state = AuthState::Failed;
            error!("Password input field not found");
            diagnostics
                .capture_screenshot(driver, "password_not_found")
                .await;
            return Err(CrawlError::LoginFailed);
        }
        self.state = AuthState::CredentialsEntered;

        if !self.submit(driver).await {
            self.state = AuthState::Failed;
            error!("Login button not found");
            diagnostics.capture_screenshot(driver, "submit_not_found").await;
            return Err(CrawlError::LoginFailed);
        }
        self.state = AuthState::Submitted;
        info!("Login form submitted");

        // Success means the session has been routed away from /login.
        if wait_for_location(driver, self.timeout, |url| !url.contains(LOGIN_PATH)).await {
            self.state = AuthState::Confirmed;
            info!("Login confirmed");
            Ok(())
        } else {
            self.state = AuthState::Failed;
            error!("Login was not confirmed within the timeout");
            diagnostics.capture_screenshot(driver, "login_failed").await;
            Err(CrawlError::LoginFailed)
        }
    }

    async fn fill_identifier<D: Driver>(&self, driver: &D) -> bool {
        if let Some(field) = resolve::wait_for_one(driver, self.selectors.email, self.timeout).await
        {
            if field.type_text(&self.credentials.username).await.is_ok() {
                debug!("Email entered via structured selector");
                return true;
            }
        }
        self.scripted_fill(driver, EMAIL_FILL_FALLBACK, &self.credentials.username)
            .await
    }

    async fn fill_secret<D: Driver>(&self, driver: &D) -> bool {
        if let Some(field) = resolve::find_one(driver, self.selectors.password).await {
            if field.type_text(&self.credentials.password).await.is_ok() {
                debug!("Password entered via structured selector");
                return true;
            }
        }
        self.scripted_fill(driver, PASSWORD_FILL_FALLBACK, &self.credentials.password)
            .await
    }

    async fn submit<D: Driver>(&self, driver: &D) -> bool {
        if let Some(button) = resolve::find_one(driver, self.selectors.submit).await {
            if button.click().await.is_ok() {
                debug!("Login button clicked via structured selector");
                return true;
            }
        }
        matches!(
            driver.evaluate(SUBMIT_CLICK_FALLBACK).await,
            Ok(serde_json::Value::Bool(true))
        )
    }

    /// Fill a field by script, with the value passed as a JSON string
    /// literal so quoting in credentials cannot break out of it.
    async fn scripted_fill<D: Driver>(&self, driver: &D, template: &str, value: &str) -> bool {
        let literal = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string());
        let script = template.replace("__VALUE__", &literal);
        matches!(
            driver.evaluate(&script).await,
            Ok(serde_json::Value::Bool(true))
        )
    }
}
