//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use chrono::Local;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::browser::cdp::{BrowserSettings, CdpDriver};
use crate::config::Config;
use crate::report;
use crate::scraper::{CrawlOptions, Crawler, ReportingPeriod};

#[derive(Parser)]
#[command(name = "notestats")]
#[command(about = "note.com dashboard metrics extraction and reporting")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract article metrics from the note.com dashboard
    Extract {
        /// Run the browser without a window
        #[arg(long)]
        headless: bool,
        /// Output directory (overrides OUTPUT_DIR)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Reporting window to select on the dashboard
        #[arg(long, value_enum, default_value_t = ReportingPeriod::All)]
        period: ReportingPeriod,
        /// Visit at most this many listing pages
        #[arg(long)]
        max_pages: Option<usize>,
        /// Fetch details for at most this many articles
        #[arg(long)]
        max_articles: Option<usize>,
        /// Skip the per-article detail pass
        #[arg(long)]
        skip_details: bool,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Extract {
            headless,
            output,
            period,
            max_pages,
            max_articles,
            skip_details,
        } => {
            cmd_extract(
                headless,
                output,
                period,
                max_pages,
                max_articles,
                skip_details,
            )
            .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_extract(
    headless: bool,
    output: Option<PathBuf>,
    period: ReportingPeriod,
    max_pages: Option<usize>,
    max_articles: Option<usize>,
    skip_details: bool,
) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(output) = output {
        std::fs::create_dir_all(&output)?;
        config.output_dir = output;
    }
    if headless {
        config.headless = true;
    }

    let credentials = match config.credentials.clone() {
        Some(credentials) => credentials,
        None => bail!("NOTE_USERNAME and NOTE_PASSWORD must be set (e.g. in .env)"),
    };

    let started = Local::now();
    println!(
        "{} Extracting dashboard metrics (started {}, headless: {}, period: {:?})",
        style("→").cyan(),
        started.format("%Y-%m-%d %H:%M:%S"),
        config.headless,
        period
    );

    let settings = BrowserSettings {
        headless: config.headless,
        remote_url: config.remote_browser_url.clone(),
        timeout: Duration::from_secs(config.timeout),
    };
    let options = CrawlOptions {
        period,
        max_pages,
        max_articles,
        fetch_details: !skip_details,
        request_delay: Duration::from_secs(config.request_delay),
        timeout: Duration::from_secs(config.timeout),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message("Logging in and crawling the dashboard...");

    let driver = CdpDriver::start(&settings).await?;
    let crawler = Crawler::new(driver, credentials, options, &config.output_dir);
    let articles = crawler.run().await?;

    spinner.finish_and_clear();
    let elapsed = Local::now().signed_duration_since(started);
    println!(
        "{} Crawl finished in {}s with {} article(s)",
        style("→").cyan(),
        elapsed.num_seconds(),
        articles.len()
    );

    if articles.is_empty() {
        println!(
            "{} No article data was extracted; see the logs and the diagnostics under {}",
            style("✗").red(),
            config.output_dir.display()
        );
        bail!("no article data extracted");
    }

    let csv_path = report::write_csv(&articles, &config.output_dir)?;
    println!("{} Data written to {}", style("✓").green(), csv_path.display());

    let report_path = report::write_summary_report(&articles, &config.output_dir)?;
    println!(
        "{} Summary report written to {}",
        style("✓").green(),
        report_path.display()
    );

    Ok(())
}
