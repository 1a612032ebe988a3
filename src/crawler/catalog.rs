//! Catalog discovery
//!
//! The index page is fetched exactly once, without retry; if it cannot be
//! fetched there is nothing to harvest and the run fails.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::ExtractionRules;
use crate::state::CatalogEntry;
use crate::FetchError;
use url::Url;

/// Fetches the index page and returns its catalog entries in link order
///
/// An index page without a matching catalog yields an empty list, not an
/// error. Links are resolved against the final URL of the index page, so
/// relative links keep working across redirects.
pub async fn discover(
    fetcher: &PageFetcher,
    index_url: &Url,
    rules: &ExtractionRules,
) -> Result<Vec<CatalogEntry>, FetchError> {
    let page = fetcher.fetch(index_url).await?;
    let html = fetcher.decode_page(&page)?;

    let entries = entries_from_links(rules.extract_catalog_links(&html, &page.url));
    tracing::info!(
        "Discovered {} catalog entries on {}",
        entries.len(),
        index_url
    );

    Ok(entries)
}

/// Numbers links by their rank in the list
pub fn entries_from_links(links: Vec<Url>) -> Vec<CatalogEntry> {
    links
        .into_iter()
        .enumerate()
        .map(|(position, url)| CatalogEntry::new(position, url))
        .collect()
}
