//! Sitemap XML parsing.
//!
//! Recognizes `<sitemapindex><sitemap><loc>` and `<urlset><url><loc>` by
//! local element name, so namespace prefixes do not matter.
use engine_logging::engine_warn;
use quick_xml::events::Event;
use quick_xml::Reader;
use snapshot_core::SitemapDocument;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SitemapError {
    #[error("{0}")]
    Malformed(String),
    #[error("root element <{0}> is not a urlset or sitemapindex")]
    Unrecognized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootKind {
    Index,
    UrlSet,
}

impl RootKind {
    fn entry_name(self) -> &'static [u8] {
        match self {
            RootKind::Index => b"sitemap",
            RootKind::UrlSet => b"url",
        }
    }
}

pub fn parse_sitemap(body: &str) -> Result<SitemapDocument, SitemapError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut root: Option<RootKind> = None;
    let mut depth = 0usize;
    let mut in_entry = false;
    let mut in_loc = false;
    let mut loc_text = String::new();
    let mut entry_loc: Option<String> = None;
    let mut locations = Vec::new();
    let mut missing_loc = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                match depth {
                    1 => root = Some(classify_root(name.as_ref())?),
                    2 if root.is_some_and(|kind| name.as_ref() == kind.entry_name()) => {
                        in_entry = true;
                        entry_loc = None;
                    }
                    3 if in_entry && name.as_ref() == b"loc" => {
                        in_loc = true;
                        loc_text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name();
                match depth {
                    0 => root = Some(classify_root(name.as_ref())?),
                    1 if root.is_some_and(|kind| name.as_ref() == kind.entry_name()) => {
                        missing_loc += 1;
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| SitemapError::Malformed(err.to_string()))?;
                if in_loc {
                    loc_text.push_str(&text);
                } else if depth == 0 && root.is_none() {
                    return Err(SitemapError::Malformed(
                        "non-whitespace before first tag".to_string(),
                    ));
                }
            }
            Ok(Event::CData(e)) => {
                if in_loc {
                    loc_text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if depth == 3 && in_loc {
                    in_loc = false;
                    entry_loc = Some(loc_text.trim().to_string());
                } else if depth == 2 && in_entry {
                    in_entry = false;
                    match entry_loc.take().filter(|loc| !loc.is_empty()) {
                        Some(loc) => locations.push(loc),
                        None => missing_loc += 1,
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(SitemapError::Malformed(err.to_string())),
        }
    }

    if depth != 0 {
        return Err(SitemapError::Malformed(
            "unexpected end of document".to_string(),
        ));
    }
    if missing_loc > 0 {
        engine_warn!("Skipped {} sitemap entries without <loc>", missing_loc);
    }

    match root {
        Some(RootKind::Index) => Ok(SitemapDocument::Index(locations)),
        Some(RootKind::UrlSet) => Ok(SitemapDocument::UrlSet(locations)),
        None => Err(SitemapError::Malformed("document has no root element".to_string())),
    }
}

fn classify_root(name: &[u8]) -> Result<RootKind, SitemapError> {
    match name {
        b"sitemapindex" => Ok(RootKind::Index),
        b"urlset" => Ok(RootKind::UrlSet),
        other => Err(SitemapError::Unrecognized(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}
