use url::{ParseError, Url};

use crate::cleaner::CleanerChain;
use crate::error::AppError;
use crate::models::{NormalizedPosting, RawPosting};
use crate::traits::TextCleaner;

/// Turns a [`RawPosting`] into a [`NormalizedPosting`].
///
/// Text fields go through the configured cleaner chain; absent fields become
/// empty strings. The link is resolved against the page it came from and
/// canonicalized (fragment dropped). Only an unusable link is an error.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    chain: CleanerChain,
}

impl Normalizer {
    pub fn new(chain: CleanerChain) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &CleanerChain {
        &self.chain
    }

    pub fn normalize(
        &self,
        raw: &RawPosting,
        base: Option<&Url>,
    ) -> Result<NormalizedPosting, AppError> {
        let link = canonical_link(raw.link.as_deref(), base)?;

        Ok(NormalizedPosting {
            title: self.chain.clean_opt(raw.title.as_deref()),
            company: self.chain.clean_opt(raw.company.as_deref()),
            description: self.chain.clean_opt(raw.description.as_deref()),
            link,
        })
    }
}

/// Resolve a possibly relative link into its canonical absolute form.
///
/// Only `http` and `https` links are usable posting keys.
pub fn canonical_link(link: Option<&str>, base: Option<&Url>) -> Result<String, AppError> {
    let link = link.unwrap_or_default().trim();
    if link.is_empty() {
        return Err(AppError::MalformedRecord("link is empty".into()));
    }

    let mut url = match Url::parse(link) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base.join(link).map_err(|e| {
                AppError::MalformedRecord(format!("cannot resolve '{link}' against {base}: {e}"))
            })?,
            None => {
                return Err(AppError::MalformedRecord(format!(
                    "relative link '{link}' without a base URL"
                )));
            }
        },
        Err(e) => {
            return Err(AppError::MalformedRecord(format!("invalid link '{link}': {e}")));
        }
    };

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::MalformedRecord(format!(
                "link scheme '{scheme}' is not usable: {link}"
            )));
        }
    }

    url.set_fragment(None);
    Ok(url.into())
}
