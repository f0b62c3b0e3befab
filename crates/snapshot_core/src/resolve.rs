//! Sitemap resolution as an explicit tree of fetch tasks.
//!
//! Every fetched document becomes a node. A node owns the paths collected
//! below it and a count of children that have not joined yet. Once its own
//! document has been applied and that count reaches zero, the node joins its
//! parent: its paths are appended to the parent's accumulator and the
//! parent's count drops by one. The run is resolved when the root joins.
use crate::{location_path, ExclusionFilter, SitemapDocument};

pub type NodeId = usize;

/// A sitemap document that must be fetched and applied to `node`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub node: NodeId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveStep {
    /// The root is still waiting; these documents must be fetched next.
    Pending(Vec<FetchRequest>),
    /// The root joined. Payload is the flattened, filtered path list.
    Complete(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("error loading {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("error parsing {url}: {message}")]
    Parse { url: String, message: String },
    #[error("error: {url} is not a valid urlset or sitemapindex")]
    UnrecognizedDocument { url: String },
    #[error("unknown resolution node {0}")]
    UnknownNode(NodeId),
    #[error("resolution node {0} was already applied")]
    AlreadyApplied(NodeId),
}

#[derive(Debug)]
struct ResolutionNode {
    parent: Option<NodeId>,
    applied: bool,
    outstanding: usize,
    collected: Vec<String>,
}

impl ResolutionNode {
    fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            applied: false,
            outstanding: 0,
            collected: Vec::new(),
        }
    }

    fn is_complete(&self) -> bool {
        self.applied && self.outstanding == 0
    }
}

#[derive(Debug)]
pub struct ResolutionTree {
    filter: ExclusionFilter,
    nodes: Vec<ResolutionNode>,
    excluded: Vec<String>,
    finished: bool,
}

impl ResolutionTree {
    /// Start a resolution rooted at `root_url`. The returned request is the root fetch.
    pub fn new(root_url: impl Into<String>, filter: ExclusionFilter) -> (Self, FetchRequest) {
        let root_url = root_url.into();
        let tree = Self {
            filter,
            nodes: vec![ResolutionNode::new(None)],
            excluded: Vec::new(),
            finished: false,
        };
        (tree, FetchRequest { node: 0, url: root_url })
    }

    /// Number of documents requested but not yet applied.
    pub fn pending_fetches(&self) -> usize {
        self.nodes.iter().filter(|n| !n.applied).count()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Locations skipped by the exclusion filter since the last call.
    pub fn take_excluded(&mut self) -> Vec<String> {
        std::mem::take(&mut self.excluded)
    }

    /// Apply the parsed document fetched for `node`.
    pub fn apply(
        &mut self,
        node: NodeId,
        document: SitemapDocument,
    ) -> Result<ResolveStep, ResolveError> {
        let entry = self.nodes.get(node).ok_or(ResolveError::UnknownNode(node))?;
        if entry.applied {
            return Err(ResolveError::AlreadyApplied(node));
        }

        let mut requests = Vec::new();
        match document {
            SitemapDocument::UrlSet(locations) => {
                let mut paths = Vec::with_capacity(locations.len());
                for location in locations {
                    if self.filter.excludes(&location) {
                        self.excluded.push(location);
                    } else {
                        paths.push(location_path(&location));
                    }
                }
                self.nodes[node].collected.extend(paths);
            }
            SitemapDocument::Index(locations) => {
                for location in locations {
                    if self.filter.excludes(&location) {
                        self.excluded.push(location);
                        continue;
                    }
                    let child = self.nodes.len();
                    self.nodes.push(ResolutionNode::new(Some(node)));
                    requests.push(FetchRequest {
                        node: child,
                        url: location,
                    });
                }
                self.nodes[node].outstanding = requests.len();
            }
        }
        self.nodes[node].applied = true;

        match self.join(node) {
            Some(paths) => Ok(ResolveStep::Complete(paths)),
            None => Ok(ResolveStep::Pending(requests)),
        }
    }

    /// Propagate completion upward from `node`. Returns the root's paths once it joins.
    fn join(&mut self, mut node: NodeId) -> Option<Vec<String>> {
        loop {
            if !self.nodes[node].is_complete() {
                return None;
            }
            let collected = std::mem::take(&mut self.nodes[node].collected);
            match self.nodes[node].parent {
                Some(parent) => {
                    let parent_node = &mut self.nodes[parent];
                    parent_node.collected.extend(collected);
                    parent_node.outstanding -= 1;
                    node = parent;
                }
                None => {
                    self.finished = true;
                    return Some(collected);
                }
            }
        }
    }
}
