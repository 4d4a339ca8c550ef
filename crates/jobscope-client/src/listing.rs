//! Listing page parsing: job cards and the next-page reference.

use jobscope_core::error::AppError;
use jobscope_core::models::{ListingPage, RawPosting};
use jobscope_core::traits::{Fetcher, PageSource};
use scraper::{ElementRef, Html, Selector};

// Parse a known-good selector literal.
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

/// CSS selectors locating postings on a listing page.
///
/// `title`, `company` and `description` are evaluated inside each card. The
/// title element's `href` is the posting link.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub card: Selector,
    pub title: Selector,
    pub company: Selector,
    pub description: Selector,
    pub next_page: Selector,
}

impl ListingSelectors {
    /// Build selectors from CSS strings, e.g. from user configuration.
    pub fn parse(
        card: &str,
        title: &str,
        company: &str,
        description: &str,
        next_page: &str,
    ) -> Result<Self, AppError> {
        let parse = |css: &str| {
            Selector::parse(css)
                .map_err(|e| AppError::ConfigError(format!("invalid CSS selector '{css}': {e}")))
        };
        Ok(Self {
            card: parse(card)?,
            title: parse(title)?,
            company: parse(company)?,
            description: parse(description)?,
            next_page: parse(next_page)?,
        })
    }

    /// Layout of kariyer.net search result pages.
    pub fn kariyer() -> Self {
        Self {
            card: parse_selector!("div.list-items > div"),
            title: parse_selector!("div.job-card-head > a"),
            company: parse_selector!("div.job-card-head > p"),
            description: parse_selector!("div.job-card-body > div.job-card-desc"),
            next_page: parse_selector!("div.pagination a.next"),
        }
    }
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self::kariyer()
    }
}

/// Extract the postings and next-page reference from one listing page.
///
/// Values are taken as found: links stay relative and text is only
/// whitespace-trimmed. Missing elements yield `None` fields.
pub fn parse_listing(html: &str, page_url: &str, selectors: &ListingSelectors) -> ListingPage {
    let document = Html::parse_document(html);

    let postings = document
        .select(&selectors.card)
        .map(|card| {
            let title = card.select(&selectors.title).next();
            RawPosting {
                title: title.and_then(element_text),
                company: first_text(card, &selectors.company),
                description: first_text(card, &selectors.description),
                link: title
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| href.trim().to_string()),
            }
        })
        .collect();

    let next_page = document
        .select(&selectors.next_page)
        .find_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty());

    ListingPage {
        url: page_url.to_string(),
        postings,
        next_page,
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).next().and_then(element_text)
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// [`PageSource`] that downloads listing pages and parses them with CSS
/// selectors.
#[derive(Clone)]
pub struct HtmlListingSource<F: Fetcher> {
    fetcher: F,
    selectors: ListingSelectors,
}

impl<F: Fetcher> HtmlListingSource<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_selectors(fetcher, ListingSelectors::default())
    }

    pub fn with_selectors(fetcher: F, selectors: ListingSelectors) -> Self {
        Self { fetcher, selectors }
    }
}

impl<F: Fetcher> PageSource for HtmlListingSource<F> {
    async fn fetch_page(&self, url: &str) -> Result<ListingPage, AppError> {
        let html = self.fetcher.fetch(url).await?;
        let page = parse_listing(&html, url, &self.selectors);
        if page.postings.is_empty() {
            tracing::warn!(%url, "No job cards matched on page");
        }
        Ok(page)
    }
}
