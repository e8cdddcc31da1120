//! Aggregation of crawl results: statistics, CSV export and the
//! human-readable summary report.
//!
//! This layer owns all date normalization; the crawl hands over raw
//! locale text and never parses it.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use regex::Regex;
use tracing::info;

use crate::models::Article;

/// Aggregate statistics over one crawl's records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub total_articles: usize,
    pub total_views: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_chars: u64,
    pub average_views: f64,
    pub average_likes: f64,
    pub average_comments: f64,
    pub average_chars: f64,
    /// Likes per view over articles with at least one view, as a
    /// percentage. `None` when no article has views.
    pub like_ratio: Option<f64>,
}

/// Compute the summary statistics for a set of records.
pub fn compute_statistics(articles: &[Article]) -> Statistics {
    let mut stats = Statistics {
        total_articles: articles.len(),
        ..Default::default()
    };
    if articles.is_empty() {
        return stats;
    }

    for article in articles {
        stats.total_views += article.views;
        stats.total_likes += article.likes;
        stats.total_comments += article.comments;
        stats.total_chars += article.char_count;
    }

    let count = articles.len() as f64;
    stats.average_views = stats.total_views as f64 / count;
    stats.average_likes = stats.total_likes as f64 / count;
    stats.average_comments = stats.total_comments as f64 / count;
    stats.average_chars = stats.total_chars as f64 / count;

    let (viewed_likes, viewed_views) = articles
        .iter()
        .filter(|a| a.views > 0)
        .fold((0u64, 0u64), |(l, v), a| (l + a.likes, v + a.views));
    if viewed_views > 0 {
        stats.like_ratio = Some(viewed_likes as f64 / viewed_views as f64 * 100.0);
    }

    stats
}

/// Publish-date shapes the dashboard and article pages emit.
static PUBLISHED_AT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // 2023年10月1日
        Regex::new(r"(\d{4})年\s*(\d{1,2})月\s*(\d{1,2})日?").unwrap(),
        // 2023/10/1 and 2023-10-01
        Regex::new(r"(\d{4})[/-](\d{1,2})[/-](\d{1,2})").unwrap(),
    ]
});

/// Normalize raw publish-date text to a calendar date, if possible.
pub fn normalize_published_at(raw: &str) -> Option<NaiveDate> {
    for pattern in PUBLISHED_AT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(raw) {
            let year: i32 = caps.get(1)?.as_str().parse().ok()?;
            let month: u32 = caps.get(2)?.as_str().parse().ok()?;
            let day: u32 = caps.get(3)?.as_str().parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }
    }
    None
}

/// Write the records to `note_data_<timestamp>.csv` in `dir`.
///
/// The normalized `published_date` column is derived here; the raw
/// `published_at` text is preserved next to it.
pub fn write_csv(articles: &[Article], dir: &Path) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!(
        "note_data_{}.csv",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "title",
        "url",
        "published_at",
        "published_date",
        "views",
        "likes",
        "comments",
        "char_count",
        "text_content",
    ])?;

    for article in articles {
        let published_date = normalize_published_at(&article.published_at)
            .map(|d| d.to_string())
            .unwrap_or_default();
        let views = article.views.to_string();
        let likes = article.likes.to_string();
        let comments = article.comments.to_string();
        let char_count = article.char_count.to_string();
        writer.write_record([
            article.title.as_str(),
            article.url.as_str(),
            article.published_at.as_str(),
            published_date.as_str(),
            views.as_str(),
            likes.as_str(),
            comments.as_str(),
            char_count.as_str(),
            article.text_content.as_str(),
        ])?;
    }

    writer.flush()?;
    info!("Wrote {} record(s) to {}", articles.len(), path.display());
    Ok(path)
}

/// Write the summary report to `note_report_<timestamp>.txt` in `dir`.
pub fn write_summary_report(articles: &[Article], dir: &Path) -> anyhow::Result<PathBuf> {
    let stats = compute_statistics(articles);
    let path = dir.join(format!(
        "note_report_{}.txt",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("creating {}", path.display()))?;

    writeln!(file, "# note Dashboard Data Report")?;
    writeln!(file)?;
    writeln!(file, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(file)?;

    writeln!(file, "## Overview")?;
    writeln!(file)?;
    writeln!(file, "- Articles: {}", stats.total_articles)?;
    writeln!(file, "- Total views: {}", stats.total_views)?;
    writeln!(file, "- Total likes: {}", stats.total_likes)?;
    writeln!(file, "- Total comments: {}", stats.total_comments)?;
    writeln!(file, "- Total characters: {}", stats.total_chars)?;
    writeln!(file)?;

    writeln!(file, "## Averages per article")?;
    writeln!(file)?;
    writeln!(file, "- Views: {:.1}", stats.average_views)?;
    writeln!(file, "- Likes: {:.1}", stats.average_likes)?;
    writeln!(file, "- Comments: {:.1}", stats.average_comments)?;
    writeln!(file, "- Characters: {:.1}", stats.average_chars)?;
    writeln!(file)?;

    writeln!(file, "## Engagement")?;
    writeln!(file)?;
    match stats.like_ratio {
        Some(ratio) => writeln!(file, "- Like ratio: {:.2}% (likes / views)", ratio)?,
        None => writeln!(file, "- Like ratio: n/a (no recorded views)")?,
    }
    writeln!(file)?;

    write_top_section(&mut file, "## Top 5 by views", articles, |a| a.views)?;
    write_top_section(&mut file, "## Top 5 by likes", articles, |a| a.likes)?;

    info!("Wrote summary report to {}", path.display());
    Ok(path)
}

fn write_top_section(
    file: &mut std::fs::File,
    heading: &str,
    articles: &[Article],
    key: fn(&Article) -> u64,
) -> anyhow::Result<()> {
    writeln!(file, "{}", heading)?;
    writeln!(file)?;
    if articles.is_empty() {
        writeln!(file, "No data available")?;
        writeln!(file)?;
        return Ok(());
    }

    let mut ranked: Vec<&Article> = articles.iter().collect();
    ranked.sort_by(|a, b| key(b).cmp(&key(a)));
    for (rank, article) in ranked.iter().take(5).enumerate() {
        writeln!(file, "{}. {} - {}", rank + 1, article.title, key(article))?;
    }
    writeln!(file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(title: &str, views: u64, likes: u64) -> Article {
        let mut article = Article::new(title, format!("https://note.com/n/{title}"), "");
        article.views = views;
        article.likes = likes;
        article.comments = 1;
        article.set_text_content("body");
        article
    }

    #[test]
    fn statistics_over_empty_input_are_zeroed() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats.total_articles, 0);
        assert_eq!(stats.total_views, 0);
        assert!(stats.like_ratio.is_none());
    }

    #[test]
    fn statistics_totals_and_averages() {
        let articles = vec![sample("a", 100, 10), sample("b", 300, 30)];
        let stats = compute_statistics(&articles);
        assert_eq!(stats.total_articles, 2);
        assert_eq!(stats.total_views, 400);
        assert_eq!(stats.total_likes, 40);
        assert_eq!(stats.average_views, 200.0);
        assert_eq!(stats.like_ratio, Some(10.0));
    }

    #[test]
    fn like_ratio_ignores_unviewed_articles() {
        let articles = vec![sample("a", 0, 50), sample("b", 100, 10)];
        let stats = compute_statistics(&articles);
        // The zero-view article's likes stay out of the ratio.
        assert_eq!(stats.like_ratio, Some(10.0));
    }

    #[test]
    fn japanese_dates_normalize() {
        assert_eq!(
            normalize_published_at("2023年10月1日"),
            NaiveDate::from_ymd_opt(2023, 10, 1)
        );
        assert_eq!(
            normalize_published_at("2024年 3月 7日"),
            NaiveDate::from_ymd_opt(2024, 3, 7)
        );
    }

    #[test]
    fn slashed_and_iso_dates_normalize() {
        assert_eq!(
            normalize_published_at("2023/10/1"),
            NaiveDate::from_ymd_opt(2023, 10, 1)
        );
        assert_eq!(
            normalize_published_at("2023-10-01"),
            NaiveDate::from_ymd_opt(2023, 10, 1)
        );
    }

    #[test]
    fn unparseable_dates_stay_raw() {
        assert_eq!(normalize_published_at(""), None);
        assert_eq!(normalize_published_at("昨日"), None);
        assert_eq!(normalize_published_at("2023年13月40日"), None);
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let articles = vec![sample("first", 100, 10)];
        let path = write_csv(&articles, dir.path()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("title,url,published_at"));
        let row = lines.next().unwrap();
        assert!(row.contains("first"));
        assert!(row.contains("100"));
    }

    #[test]
    fn summary_report_lists_top_articles() {
        let dir = tempfile::tempdir().unwrap();
        let articles = vec![sample("quiet", 10, 1), sample("popular", 500, 80)];
        let path = write_summary_report(&articles, dir.path()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Articles: 2"));
        assert!(content.contains("1. popular - 500"));
        assert!(content.contains("Top 5 by likes"));
    }
}
