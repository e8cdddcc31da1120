//! Selector tables for the note.com dashboard markup.
//!
//! The front-end markup shifts across releases, so every logical field
//! carries an ordered list of candidates, current generation first and
//! legacy class names last. Lookups walk the list until one resolves;
//! the cost of drift is proportional to how far the markup has moved,
//! not to the table size.
//!
//! Tables are plain static configuration: built once per crawl, never
//! mutated.

/// Login form controls.
#[derive(Debug, Clone)]
pub struct LoginSelectors {
    pub email: &'static [&'static str],
    pub password: &'static [&'static str],
    pub submit: &'static [&'static str],
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            email: &[
                "input[type=\"email\"]",
                "input[name=\"email\"]",
                "input[placeholder=\"メールアドレス\"]",
                ".o-login__mail input[type=\"email\"]",
                ".o-login input[type=\"email\"]",
            ],
            password: &[
                "input[type=\"password\"]",
                "input[name=\"password\"]",
                "input[placeholder=\"パスワード\"]",
                ".o-login__mail input[type=\"password\"]",
                ".o-login input[type=\"password\"]",
            ],
            submit: &[
                "button[type=\"submit\"]",
                "button.n-button--primary",
                ".o-login__button button",
                "button.a-button[data-type=\"primary\"]",
                ".o-login__button .a-button",
            ],
        }
    }
}

/// Links used when direct navigation to the stats view fails.
#[derive(Debug, Clone)]
pub struct DashboardSelectors {
    pub link: &'static [&'static str],
    pub articles_tab: &'static [&'static str],
}

impl Default for DashboardSelectors {
    fn default() -> Self {
        Self {
            link: &[
                "a[href*=\"/dashboard\"]",
                ".dashboard-link",
                "a[href=\"/dashboard/notes\"]",
            ],
            articles_tab: &[
                "a[href*=\"/dashboard/notes\"]",
                ".articles-tab",
                "a[href=\"/dashboard/notes\"]",
            ],
        }
    }
}

/// Statistics table candidates for the structured listing fallback.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub table: &'static [&'static str],
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            table: &[
                "table.o-statsContent__table",
                "table.statsTable",
                "table.article-stats-table",
                "table",
                ".table-container table",
                ".stats-container table",
            ],
        }
    }
}

/// Pagination controls.
#[derive(Debug, Clone)]
pub struct PaginationSelectors {
    pub next: &'static [&'static str],
}

impl Default for PaginationSelectors {
    fn default() -> Self {
        Self {
            next: &[
                ".pagination-next:not(.disabled)",
                ".next-page:not(.disabled)",
                "button[aria-label=\"次のページ\"]",
            ],
        }
    }
}

/// Article-page fields resolved by the detail pass.
#[derive(Debug, Clone)]
pub struct DetailSelectors {
    pub published_at: &'static [&'static str],
    pub body: &'static [&'static str],
    pub views: &'static [&'static str],
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            published_at: &[
                ".o-noteContentHeader__date time",
                ".o-noteContentHeader time",
                ".m-article__date time",
                ".note-common-styles__date time",
                "time",
                "[datetime]",
                ".o-noteContentData__date",
            ],
            body: &[
                ".note-common-styles__textnote-body",
                ".o-noteContentText",
                "article .o-noteEmbedContainer",
                ".m-textContent",
                "article .note-body",
            ],
            views: &[
                ".o-noteContentData .viewCount",
                ".o-noteContentData__item--views",
                ".noteStat span[data-test='viewCount']",
                ".viewCountText",
                "span[title*='閲覧']",
                ".o-noteContentStats__count",
                ".m-noteContent__viewCount",
                ".o-noteContentData__viewCount",
                "span[title*='view']",
                ".viewCount",
                ".o-noteContentFooter .count",
                "div[class*='viewCount']",
            ],
        }
    }
}

/// All per-area tables for one crawl.
#[derive(Debug, Clone, Default)]
pub struct SelectorTables {
    pub login: LoginSelectors,
    pub dashboard: DashboardSelectors,
    pub listing: ListingSelectors,
    pub pagination: PaginationSelectors,
    pub detail: DetailSelectors,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_has_at_least_one_candidate() {
        let tables = SelectorTables::default();
        assert!(!tables.login.email.is_empty());
        assert!(!tables.login.password.is_empty());
        assert!(!tables.login.submit.is_empty());
        assert!(!tables.dashboard.link.is_empty());
        assert!(!tables.listing.table.is_empty());
        assert!(!tables.pagination.next.is_empty());
        assert!(!tables.detail.published_at.is_empty());
        assert!(!tables.detail.body.is_empty());
        assert!(!tables.detail.views.is_empty());
    }

    #[test]
    fn current_generation_selectors_come_first() {
        let tables = SelectorTables::default();
        // The bare-tag catch-alls must stay behind the specific ones.
        assert_eq!(tables.listing.table[0], "table.o-statsContent__table");
        assert!(tables.listing.table.iter().position(|s| *s == "table").unwrap() > 0);
        assert_eq!(tables.detail.published_at[0], ".o-noteContentHeader__date time");
        assert!(tables.detail.published_at.iter().position(|s| *s == "time").unwrap() > 0);
    }
}
