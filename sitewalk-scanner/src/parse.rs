use scraper::{Html, Selector};
use std::sync::LazyLock;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static TEXT_BLOCKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("body p, body h1, body h2, body h3, body h4, body h5, body h6, body li")
        .expect("valid selector")
});

/// What the crawler needs out of an HTML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    pub title: String,
    /// Raw `href` values in document order, unresolved.
    pub links: Vec<String>,
    pub text: String,
}

/// Extracts title, hrefs and readable body text.
///
/// html5ever recovers from any malformed markup, so this never fails; garbage in
/// yields an empty title and no links.
pub fn parse_html(body: &str) -> ParsedPage {
    let document = Html::parse_document(body);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| collapse(el.text()))
        .unwrap_or_default();

    let links = document
        .select(&LINKS)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| href.trim())
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect();

    let text = document
        .select(&TEXT_BLOCKS)
        .map(|el| collapse(el.text()))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    ParsedPage { title, links, text }
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
