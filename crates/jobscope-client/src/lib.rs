pub mod fetcher;
pub mod listing;

pub use fetcher::ReqwestFetcher;
pub use listing::{HtmlListingSource, ListingSelectors, parse_listing};
