//! Environment-backed configuration.
//!
//! Everything comes from the process environment (optionally seeded
//! from a `.env` file before startup): account credentials, output
//! location, browser mode and pacing. Values are read once into a
//! typed struct; nothing here is mutated during a crawl.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

/// Account credentials for the note.com login.
///
/// `Debug` never prints the password.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Login credentials, when both env vars are present.
    pub credentials: Option<Credentials>,
    /// Where CSV output, reports and diagnostics land.
    pub output_dir: PathBuf,
    /// Run the browser without a window.
    pub headless: bool,
    /// Courtesy delay between page interactions, in seconds.
    pub request_delay: u64,
    /// Element-wait and navigation-confirmation bound, in seconds.
    pub timeout: u64,
    /// DevTools endpoint of an already-running browser, if any.
    pub remote_browser_url: Option<String>,
}

impl Config {
    /// Read configuration from the environment and prepare the output
    /// directory.
    pub fn from_env() -> anyhow::Result<Self> {
        let username = nonempty_var("NOTE_USERNAME");
        let password = nonempty_var("NOTE_PASSWORD");
        let credentials = match (username, password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => {
                warn!("NOTE_USERNAME / NOTE_PASSWORD are not set; extraction will be unavailable");
                None
            }
        };

        let output_dir = nonempty_var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("output"));
        if !output_dir.exists() {
            info!("Creating output directory {}", output_dir.display());
        }
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            credentials,
            output_dir,
            headless: bool_var("HEADLESS", false),
            request_delay: parsed_var("REQUEST_DELAY", 2),
            timeout: parsed_var("TIMEOUT", 30),
            remote_browser_url: nonempty_var("BROWSER_REMOTE_URL"),
        })
    }
}

fn nonempty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn bool_var(name: &str, default: bool) -> bool {
    match nonempty_var(name) {
        Some(value) => matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}

fn parsed_var(name: &str, default: u64) -> u64 {
    match nonempty_var(name) {
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={:?}", name, value);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "writer@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("writer@example.com"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("********"));
    }
}
