//! Small extraction helpers over `scraper` element trees.

use scraper::{ElementRef, Selector};
use url::Url;

/// Parse a selector, logging rather than failing on invalid syntax.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::debug!("Invalid selector {css:?}: {e}");
            None
        }
    }
}

/// Visible text of an element with whitespace collapsed.
pub fn inline_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text of an element, trimmed but otherwise as authored.
pub fn block_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of the first descendant matching `css` that has any text.
pub fn first_text(el: ElementRef<'_>, css: &str) -> String {
    let Some(sel) = selector(css) else {
        return String::new();
    };
    el.select(&sel)
        .map(inline_text)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// Attribute of the first descendant matching `css` that carries it.
pub fn first_attr(el: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css)?;
    el.select(&sel)
        .filter_map(|e| e.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(String::from)
}

/// Non-empty texts of every descendant matching `css`, in document order.
pub fn all_texts(el: ElementRef<'_>, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    el.select(&sel)
        .map(inline_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Resolve a possibly relative href against the source's base URL.
pub fn resolve_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    Url::parse(base_url)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", base_url.trim_end_matches('/'), href))
}

/// Last non-empty path segment of an href, ignoring query and fragment.
pub fn last_segment(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or("");
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map(String::from)
}
