//! HTML link rewriter
//!
//! This module streams a page through `lol_html`, collecting every URL-bearing
//! attribute on anchors, images, scripts and `<link>` elements, and replacing
//! each value with whatever the caller's mapping returns for it.

use crate::RewriteError;
use lol_html::html_content::Element;
use lol_html::{element, HtmlRewriter, Settings};
use std::cell::RefCell;
use url::Url;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// `rel` values that make a `<link href>` an asset rather than a page link
const ASSET_RELS: &[&str] = &["stylesheet", "icon", "preload"];

/// Schemes that never point at something worth mirroring
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// How a discovered reference is treated by the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Navigable page, subject to the depth limit
    Page,
    /// Resource needed to render a page
    Asset,
}

/// Output of a rewrite pass
#[derive(Debug, Clone, Default)]
pub struct RewrittenPage {
    /// Serialized document with mapped attribute values
    pub html: Vec<u8>,

    /// Page links in document order, duplicates preserved
    pub page_links: Vec<Url>,

    /// Asset references in document order, duplicates preserved
    pub asset_links: Vec<Url>,
}

/// Rewrites links in an HTML document
///
/// # Reference Rules
///
/// - `<a href>` → page link
/// - `<img src>`, `<script src>` → asset
/// - `<link href>` → asset when `rel` contains `stylesheet`, `icon` or
///   `preload` (case-insensitive), otherwise page link
///
/// Character references in attribute values (`&amp;`, `&#38;`, ...) are
/// decoded before resolving. Values are resolved against `base` with the
/// fragment removed. Empty and
/// fragment-only values, `javascript:`/`mailto:`/`tel:`/`data:` values, and
/// anything that does not resolve to http(s) are left alone.
///
/// For each reference `map` is called; a non-empty result replaces the
/// attribute value, `None` or an empty string leaves it untouched.
///
/// # Example
///
/// ```
/// use site_mirror::crawler::rewrite_html;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let html = br#"<a href="/about">About</a><img src="logo.png">"#;
/// let page = rewrite_html(&base, html, |u| Some(u.path().trim_start_matches('/').to_string())).unwrap();
///
/// assert_eq!(page.page_links[0].as_str(), "https://example.com/about");
/// assert_eq!(page.asset_links[0].as_str(), "https://example.com/logo.png");
/// assert!(String::from_utf8(page.html).unwrap().contains(r#"href="about""#));
/// ```
pub fn rewrite_html<F>(base: &Url, html: &[u8], map: F) -> Result<RewrittenPage, RewriteError>
where
    F: Fn(&Url) -> Option<String>,
{
    let page_links = RefCell::new(Vec::new());
    let asset_links = RefCell::new(Vec::new());
    let mut output = Vec::with_capacity(html.len());

    {
        let map: &dyn Fn(&Url) -> Option<String> = &map;
        let found = Found {
            base,
            map,
            page_links: &page_links,
            asset_links: &asset_links,
        };

        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![
                    element!("a[href]", |el| found.visit(el, "href", ReferenceKind::Page)),
                    element!("img[src]", |el| found.visit(el, "src", ReferenceKind::Asset)),
                    element!("script[src]", |el| found.visit(el, "src", ReferenceKind::Asset)),
                    element!("link[href]", |el| {
                        let kind = match el.get_attribute("rel") {
                            Some(rel) if is_asset_rel(&rel) => ReferenceKind::Asset,
                            _ => ReferenceKind::Page,
                        };
                        found.visit(el, "href", kind)
                    }),
                ],
                ..Settings::default()
            },
            |chunk: &[u8]| output.extend_from_slice(chunk),
        );

        rewriter.write(html)?;
        rewriter.end()?;
    }

    Ok(RewrittenPage {
        html: output,
        page_links: page_links.into_inner(),
        asset_links: asset_links.into_inner(),
    })
}

/// Shared context for the element handlers of one rewrite pass
struct Found<'a> {
    base: &'a Url,
    map: &'a dyn Fn(&Url) -> Option<String>,
    page_links: &'a RefCell<Vec<Url>>,
    asset_links: &'a RefCell<Vec<Url>>,
}

impl Found<'_> {
    fn visit(&self, el: &mut Element, attr: &str, kind: ReferenceKind) -> HandlerResult {
        let Some(raw) = el.get_attribute(attr) else {
            return Ok(());
        };
        let value = html_escape::decode_html_entities(&raw);
        let Some(url) = resolve_reference(self.base, &value) else {
            return Ok(());
        };

        if let Some(mapped) = (self.map)(&url).filter(|m| !m.is_empty()) {
            el.set_attribute(attr, &mapped)?;
        }

        match kind {
            ReferenceKind::Page => self.page_links.borrow_mut().push(url),
            ReferenceKind::Asset => self.asset_links.borrow_mut().push(url),
        }
        Ok(())
    }
}

/// Resolves an attribute value to an absolute http(s) URL without fragment
///
/// Returns None for values that are not references to mirrorable content.
pub fn resolve_reference(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }

    let lower = raw.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let mut url = base.join(raw).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Returns true if a `<link rel>` value marks the target as an asset
pub fn is_asset_rel(rel: &str) -> bool {
    let rel = rel.to_ascii_lowercase();
    ASSET_RELS.iter().any(|needle| rel.contains(needle))
}
