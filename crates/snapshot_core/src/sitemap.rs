use url::Url;

/// A parsed sitemap document, classified by its root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<sitemapindex>`: locations of child sitemap documents.
    Index(Vec<String>),
    /// `<urlset>`: locations of pages.
    UrlSet(Vec<String>),
}

/// Path component of a page location: path plus query, scheme and host stripped.
///
/// Locations that are not absolute URLs are returned unchanged.
pub fn location_path(location: &str) -> String {
    match Url::parse(location) {
        Ok(url) if !url.cannot_be_a_base() => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        _ => location.to_string(),
    }
}
