// src/checker/html.rs
// =============================================================================
// This module extracts links from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// Unlike a plain link list, we return the href values exactly as written.
// Classification (internal / external / ignored) happens in classify.rs,
// because "/docs" and "docs" mean different things to the crawler.
// =============================================================================

use scraper::{Html, Selector};

/// Returns every `<a href>` value in document order.
///
/// Example:
///   html = "<a href='/docs'>Docs</a><a>no href</a>"
///   result = ["/docs"]
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    // Constant selector, known to be valid
    let selector = Selector::parse("a[href]").unwrap();

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}
