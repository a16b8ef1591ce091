//! HTML parser for catalog pages
//!
//! This module turns raw page markup into:
//! - A canonical [`Record`] (detail pages)
//! - The detail-page URLs linked from a listing page
//! - The total page count from a listing page's pager
//!
//! Parsing is lenient: missing optional fields fall back to "Unknown" or
//! zero. Only a detail page with no `<h1>` at all is rejected.

use crate::record::{Record, UNKNOWN};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors that reject a page outright
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("required element '{0}' not found")]
    MissingAnchor(&'static str),
}

const PRICE_INCL_TAX: &str = "Price (incl. tax)";
const PRICE_EXCL_TAX: &str = "Price (excl. tax)";
const AVAILABILITY: &str = "Availability";
const NUMBER_OF_REVIEWS: &str = "Number of reviews";

/// Parses a detail page into a record
///
/// # Arguments
///
/// * `html` - The page markup
/// * `source_url` - The URL the page was fetched from; becomes the record key
/// * `site_root` - The catalog root used to absolutize the image URL
///
/// # Returns
///
/// * `Ok(Record)` - Parsed record with limits enforced and fingerprint set
/// * `Err(ParseError)` - The page has no `<h1>`
///
/// # Example
///
/// ```
/// use catalog_sentinel::crawler::parse_detail_page;
/// use url::Url;
///
/// let root = Url::parse("https://books.toscrape.com/").unwrap();
/// let html = "<html><body><h1>Sharp Objects</h1></body></html>";
/// let record = parse_detail_page(html, "https://books.toscrape.com/catalogue/x/index.html", &root).unwrap();
/// assert_eq!(record.name, "Sharp Objects");
/// assert_eq!(record.price_incl_tax, 0.0);
/// ```
pub fn parse_detail_page(html: &str, source_url: &str, site_root: &Url) -> Result<Record, ParseError> {
    let document = Html::parse_document(html);

    let heading = select_first(&document, "h1").ok_or(ParseError::MissingAnchor("h1"))?;
    let name = non_empty(element_text(&heading)).unwrap_or_else(|| UNKNOWN.to_string());

    let mut record = Record::new(source_url, name);
    record.category = extract_category(&document).unwrap_or_else(|| UNKNOWN.to_string());
    record.description = select_first(&document, "#product_description ~ p")
        .and_then(|p| non_empty(element_text(&p)));
    record.image_url = extract_image_url(&document, site_root);
    record.rating = extract_rating(&document);

    if let Ok(row_selector) = Selector::parse("table.table-striped tr") {
        for row in document.select(&row_selector) {
            let (Some(header), Some(value)) = (child_text(&row, "th"), child_text(&row, "td"))
            else {
                continue;
            };

            match header.as_str() {
                PRICE_INCL_TAX => record.price_incl_tax = clean_price(&value),
                PRICE_EXCL_TAX => record.price_excl_tax = clean_price(&value),
                AVAILABILITY => {
                    record.availability = non_empty(value).unwrap_or_else(|| UNKNOWN.to_string())
                }
                NUMBER_OF_REVIEWS => record.number_of_reviews = value.parse().unwrap_or(0),
                _ => {}
            }
        }
    }

    record.raw_html_snapshot = Some(html.to_string());
    record.enforce_limits();
    record.refresh_fingerprint();

    Ok(record)
}

/// Extracts the detail-page URLs from a listing page
///
/// A page with no product entries yields an empty list.
pub fn parse_index_page(html: &str, site_root: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(link_selector) = Selector::parse("article.product_pod h3 a") else {
        return Vec::new();
    };

    document
        .select(&link_selector)
        .filter_map(|link| link.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| {
            let href = href.replace("../", "");
            let path = if href.starts_with("catalogue/") {
                href
            } else {
                format!("catalogue/{}", href)
            };
            site_root.join(&path).ok().map(|url| url.to_string())
        })
        .collect()
}

/// Reads the total page count from a "Page X of Y" pager marker
///
/// Returns 1 when the marker is absent or unparsable.
pub fn parse_page_count(html: &str) -> u32 {
    let document = Html::parse_document(html);

    select_first(&document, "ul.pager li.current")
        .map(|current| element_text(&current))
        .and_then(|text| {
            let parts: Vec<&str> = text.split("of").collect();
            match parts.as_slice() {
                [_, total] => total.trim().parse::<u32>().ok(),
                _ => None,
            }
        })
        .filter(|total| *total >= 1)
        .unwrap_or(1)
}

/// Converts price text such as "£51.77" to a number
///
/// Unparsable text yields 0.0.
pub fn clean_price(text: &str) -> f64 {
    text.replace('£', "").trim().parse().unwrap_or(0.0)
}

/// Maps a star-rating word to 1..=5, or 0 when unrecognized
pub fn parse_rating(word: &str) -> u8 {
    match word.trim() {
        "One" => 1,
        "Two" => 2,
        "Three" => 3,
        "Four" => 4,
        "Five" => 5,
        _ => 0,
    }
}

fn extract_category(document: &Html) -> Option<String> {
    let selector = Selector::parse("ul.breadcrumb li").ok()?;
    let item = document.select(&selector).nth(2)?;
    child_text(&item, "a").and_then(non_empty)
}

fn extract_image_url(document: &Html, site_root: &Url) -> Option<String> {
    let image = select_first(document, "div.item.active img")?;
    let src = image.value().attr("src")?.trim();
    if src.is_empty() {
        return None;
    }

    let mut relative = src;
    while let Some(rest) = relative.strip_prefix("../") {
        relative = rest;
    }

    site_root.join(relative).ok().map(|url| url.to_string())
}

fn extract_rating(document: &Html) -> u8 {
    select_first(document, "p.star-rating")
        .and_then(|p| {
            p.value()
                .classes()
                .find(|class| *class != "star-rating")
                .map(parse_rating)
        })
        .unwrap_or(0)
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn child_text(element: &ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    element.select(&selector).next().map(|child| element_text(&child))
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
