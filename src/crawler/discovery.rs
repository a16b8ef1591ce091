//! Catalog URL discovery
//!
//! Walks the paginated listing to enumerate every detail-page URL.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{parse_index_page, parse_page_count};
use crate::SentinelError;
use url::Url;

/// Builds every listing-page URL for a catalog with `total_pages` pages
///
/// Page 1 is the site root; page `n` lives at `catalogue/page-n.html`.
pub fn listing_page_urls(base_url: &Url, total_pages: u32) -> Vec<String> {
    let mut urls = vec![base_url.to_string()];
    for page in 2..=total_pages {
        urls.push(format!("{}catalogue/page-{}.html", base_url, page));
    }
    urls
}

/// Discovers every detail-page URL listed on the site
///
/// The root listing page must be reachable; any other listing page that
/// fails to fetch contributes no URLs. Duplicates are kept.
///
/// # Arguments
///
/// * `fetcher` - The fetcher used for all listing pages
/// * `base_url` - The site root (listing page 1)
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Detail-page URLs in listing order
/// * `Err(SentinelError::Discovery)` - The root listing page could not be fetched
pub async fn discover_all_urls(fetcher: &Fetcher, base_url: &Url) -> Result<Vec<String>, SentinelError> {
    tracing::info!("Discovering catalog URLs from {}", base_url);

    let root_html = fetcher
        .fetch(base_url.as_str())
        .await
        .map_err(|e| SentinelError::Discovery {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

    let total_pages = parse_page_count(&root_html);
    tracing::info!("Found {} listing pages", total_pages);

    let mut all_urls = parse_index_page(&root_html, base_url);

    let remaining: Vec<String> = listing_page_urls(base_url, total_pages)
        .into_iter()
        .skip(1)
        .collect();

    // Results come back in completion order; restore listing order
    let mut pages = fetcher.fetch_batch(&remaining).await;
    pages.sort_by_key(|(url, _)| remaining.iter().position(|u| u == url));

    for (page_url, result) in pages {
        match result {
            Ok(html) => {
                let urls = parse_index_page(&html, base_url);
                tracing::debug!("{} lists {} records", page_url, urls.len());
                all_urls.extend(urls);
            }
            Err(e) => tracing::warn!("Skipping listing page {}: {}", page_url, e),
        }
    }

    tracing::info!("Discovered {} record URLs", all_urls.len());
    Ok(all_urls)
}
