//! Small helpers over `scraper` shared by the directory, registry and
//! website analyzer code.

use anyhow::{Result, anyhow};
use scraper::{ElementRef, Selector};
use url::Url;

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "em", "font", "i", "img", "kbd", "label",
    "mark", "q", "s", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Failed to parse selector {css:?}: {e:?}"))
}

/// Whitespace-collapsed text of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text of the first match of `selector` under `element`, if non-empty.
pub fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

pub fn first_attr(element: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Rendered text of an element, one entry per visual line.
///
/// Block elements and `<br>` start new lines, scripts and styles are skipped.
pub fn text_lines(element: ElementRef<'_>) -> Vec<String> {
    let mut rendered = String::new();
    render_text(element, &mut rendered);

    rendered
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

fn render_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_ELEMENTS.contains(&name) {
        return;
    }

    let block = !INLINE_ELEMENTS.contains(&name);
    if block || name == "br" {
        out.push('\n');
    }

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            render_text(child_element, out);
        } else if let Some(text) = child.value().as_text() {
            // Source line breaks inside text are plain whitespace
            out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
        }
    }

    if block {
        out.push('\n');
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Capitalises the first letter of every word, lowercasing the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;

    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }

    out
}

/// Resolves `href` against `base`, dropping any fragment.
///
/// Returns `None` for hrefs that cannot become an http(s) URL
/// (`mailto:`, `javascript:`, malformed).
pub fn absolute_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut url = Url::parse(base).ok()?.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);

    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn text_lines_break_on_blocks_but_not_inline_tags() {
        let document = Html::parse_document(
            r"<html><body>
                <div><p>Meet our <b>Owner</b> Jane   Doe.</p>
                <p>Call us<br>today</p></div>
                <script>var hidden = 1;</script>
            </body></html>",
        );
        let body = document
            .select(&selector("body").unwrap())
            .next()
            .unwrap();

        assert_eq!(
            text_lines(body),
            vec!["Meet our Owner Jane Doe.", "Call us", "today"]
        );
    }

    #[test]
    fn absolute_url_resolves_relative_and_rejects_mailto() {
        assert_eq!(
            absolute_url("https://example.com/a/b", "/contact#form").as_deref(),
            Some("https://example.com/contact")
        );
        assert_eq!(
            absolute_url("https://example.com/a/", "team.html").as_deref(),
            Some("https://example.com/a/team.html")
        );
        assert_eq!(absolute_url("https://example.com", "mailto:x@y.com"), None);
        assert_eq!(absolute_url("https://example.com", "  "), None);
    }

    #[test]
    fn title_case_handles_initials_and_apostrophes() {
        assert_eq!(title_case("NEMES, JOHN A"), "Nemes, John A");
        assert_eq!(title_case("O'BRIEN, PAT"), "O'Brien, Pat");
        assert_eq!(title_case("ceo"), "Ceo");
    }

    #[test]
    fn invalid_selector_is_an_error() {
        assert!(selector("div[").is_err());
    }
}
