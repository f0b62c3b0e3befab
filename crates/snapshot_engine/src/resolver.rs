use std::sync::Arc;

use engine_logging::{engine_debug, engine_info};
use snapshot_core::{
    ExclusionFilter, FetchRequest, ResolutionTree, ResolveError, ResolveStep, SitemapDocument,
};
use tokio::task::JoinSet;

use crate::fetch::SitemapFetcher;
use crate::sitemap::{parse_sitemap, SitemapError};
use crate::FetchError;

type FetchResult = (FetchRequest, Result<String, FetchError>);

/// Resolve the sitemap hierarchy rooted at `root_url` into an ordered path list.
///
/// Every child sitemap of an index is fetched concurrently. Children are
/// merged in the order they finish. The first fetch, parse or shape error
/// ends the resolution; fetches still in flight are dropped.
pub async fn resolve_sitemap(
    fetcher: Arc<dyn SitemapFetcher>,
    root_url: &str,
    filter: ExclusionFilter,
) -> Result<Vec<String>, ResolveError> {
    let (mut tree, root) = ResolutionTree::new(root_url, filter);
    let mut in_flight: JoinSet<FetchResult> = JoinSet::new();
    spawn_fetch(&mut in_flight, &fetcher, root);

    while let Some(joined) = in_flight.join_next().await {
        let (request, body) = joined.map_err(|err| ResolveError::Fetch {
            url: root_url.to_string(),
            message: format!("sitemap fetch task failed: {err}"),
        })?;
        let document = load_document(&request, body)?;
        let step = tree.apply(request.node, document)?;
        for location in tree.take_excluded() {
            engine_debug!("Excluded {}", location);
        }

        match step {
            ResolveStep::Pending(requests) => {
                for child in requests {
                    spawn_fetch(&mut in_flight, &fetcher, child);
                }
            }
            ResolveStep::Complete(paths) => {
                engine_info!("Resolved {} urls from {}", paths.len(), root_url);
                return Ok(paths);
            }
        }
    }

    Err(ResolveError::Fetch {
        url: root_url.to_string(),
        message: format!(
            "resolution stopped with {} sitemap(s) unresolved",
            tree.pending_fetches()
        ),
    })
}

fn spawn_fetch(
    in_flight: &mut JoinSet<FetchResult>,
    fetcher: &Arc<dyn SitemapFetcher>,
    request: FetchRequest,
) {
    engine_debug!("Fetching sitemap {}", request.url);
    let fetcher = Arc::clone(fetcher);
    in_flight.spawn(async move {
        let body = fetcher.fetch(&request.url).await;
        (request, body)
    });
}

fn load_document(
    request: &FetchRequest,
    body: Result<String, FetchError>,
) -> Result<SitemapDocument, ResolveError> {
    let body = body.map_err(|err| ResolveError::Fetch {
        url: request.url.clone(),
        message: err.to_string(),
    })?;
    parse_sitemap(&body).map_err(|err| match err {
        SitemapError::Malformed(message) => ResolveError::Parse {
            url: request.url.clone(),
            message,
        },
        SitemapError::Unrecognized(_) => ResolveError::UnrecognizedDocument {
            url: request.url.clone(),
        },
    })
}
