pub mod amazon;
pub mod hepsiburada;

pub use amazon::AmazonScraper;
pub use hepsiburada::HepsiburadaScraper;

use scraper::{ElementRef, Html, Selector};

/// Whitespace-collapsed text of the first element matching `selector`.
pub(crate) fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}
