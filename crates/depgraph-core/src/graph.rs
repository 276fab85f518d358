//! Graph store for package nodes and dependency edges.
//!
//! Nodes are keyed by normalized package name and hold the version or range
//! recorded for them so far. At most one edge exists per ordered pair of
//! packages; writing an edge again replaces its label.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use petgraph::dot::Dot;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{DepGraphError, DepGraphResult};
use crate::package::PackageName;

/// Relationship recorded on an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeLabel {
    #[serde(rename = "DEPENDS_ON")]
    DependsOn,
    /// Terminal marker: the target could not be reconciled, not explored further
    #[serde(rename = "INCOMPATIBLE_UPGRADE_REQUIRED")]
    IncompatibleUpgradeRequired,
}

impl EdgeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLabel::DependsOn => "DEPENDS_ON",
            EdgeLabel::IncompatibleUpgradeRequired => "INCOMPATIBLE_UPGRADE_REQUIRED",
        }
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A package and the version or range currently recorded for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNode {
    pub name: PackageName,
    pub version: String,
}

impl fmt::Display for PackageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// How `find_node` matches names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    /// Normalized name must be equal
    #[default]
    Exact,
    /// First stored name starting with the requested name
    Prefix,
}

/// Durable node/edge store with upsert semantics
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Look up a node by name
    async fn find_node(&self, name: &PackageName) -> DepGraphResult<Option<PackageNode>>;

    /// Create the node or overwrite its recorded version
    async fn upsert_node(&mut self, name: &PackageName, version: &str) -> DepGraphResult<()>;

    /// Create the edge or overwrite its label; both nodes must exist
    async fn upsert_edge(
        &mut self,
        from: &PackageName,
        to: &PackageName,
        label: EdgeLabel,
    ) -> DepGraphResult<()>;

    /// Persist pending writes
    async fn flush(&mut self) -> DepGraphResult<()>;
}

/// Serialized form of a graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<PackageNode>,
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: PackageName,
    pub to: PackageName,
    pub label: EdgeLabel,
}

/// In-memory graph backed by petgraph
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    graph: StableDiGraph<PackageNode, EdgeLabel>,
    index: BTreeMap<PackageName, NodeIndex>,
    lookup: LookupMode,
}

impl MemoryGraphStore {
    pub fn new(lookup: LookupMode) -> Self {
        Self {
            lookup,
            ..Self::default()
        }
    }

    /// Rebuild a store from a snapshot
    pub fn from_snapshot(snapshot: GraphSnapshot, lookup: LookupMode) -> DepGraphResult<Self> {
        let mut store = Self::new(lookup);
        for node in snapshot.nodes {
            store.put_node(&node.name, &node.version);
        }
        for edge in snapshot.edges {
            store.put_edge(&edge.from, &edge.to, edge.label)?;
        }
        Ok(store)
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .index
            .values()
            .map(|&idx| self.graph[idx].clone())
            .collect();
        let mut edges: Vec<EdgeRecord> = self
            .graph
            .edge_references()
            .map(|edge| EdgeRecord {
                from: self.graph[edge.source()].name.clone(),
                to: self.graph[edge.target()].name.clone(),
                label: *edge.weight(),
            })
            .collect();
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        GraphSnapshot { nodes, edges }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node stored under exactly this name
    pub fn node(&self, name: &PackageName) -> Option<&PackageNode> {
        self.index.get(name).map(|&idx| &self.graph[idx])
    }

    /// Label of the edge between two packages, if any
    pub fn edge(&self, from: &PackageName, to: &PackageName) -> Option<EdgeLabel> {
        let (&a, &b) = (self.index.get(from)?, self.index.get(to)?);
        self.graph.find_edge(a, b).map(|edge| self.graph[edge])
    }

    /// Render the graph in Graphviz DOT format
    pub fn to_dot(&self) -> String {
        Dot::new(&self.graph).to_string()
    }

    fn lookup(&self, name: &PackageName) -> Option<&PackageNode> {
        match self.lookup {
            LookupMode::Exact => self.node(name),
            LookupMode::Prefix => self
                .index
                .range(name.clone()..)
                .next()
                .filter(|(key, _)| key.as_str().starts_with(name.as_str()))
                .map(|(_, &idx)| &self.graph[idx]),
        }
    }

    fn put_node(&mut self, name: &PackageName, version: &str) {
        match self.index.get(name) {
            Some(&idx) => self.graph[idx].version = version.to_string(),
            None => {
                let idx = self.graph.add_node(PackageNode {
                    name: name.clone(),
                    version: version.to_string(),
                });
                self.index.insert(name.clone(), idx);
            }
        }
    }

    fn put_edge(&mut self, from: &PackageName, to: &PackageName, label: EdgeLabel) -> DepGraphResult<()> {
        let missing = |name: &PackageName| {
            DepGraphError::store(format!("Cannot link {} -> {}: node {} does not exist", from, to, name))
        };
        let a = *self.index.get(from).ok_or_else(|| missing(from))?;
        let b = *self.index.get(to).ok_or_else(|| missing(to))?;
        match self.graph.find_edge(a, b) {
            Some(edge) => self.graph[edge] = label,
            None => {
                self.graph.add_edge(a, b, label);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn find_node(&self, name: &PackageName) -> DepGraphResult<Option<PackageNode>> {
        Ok(self.lookup(name).cloned())
    }

    async fn upsert_node(&mut self, name: &PackageName, version: &str) -> DepGraphResult<()> {
        debug!("Upserting node {} = {}", name, version);
        self.put_node(name, version);
        Ok(())
    }

    async fn upsert_edge(
        &mut self,
        from: &PackageName,
        to: &PackageName,
        label: EdgeLabel,
    ) -> DepGraphResult<()> {
        debug!("Upserting edge {} -[{}]-> {}", from, label, to);
        self.put_edge(from, to, label)
    }

    async fn flush(&mut self) -> DepGraphResult<()> {
        Ok(())
    }
}

/// Graph store persisted as a JSON snapshot
///
/// An existing snapshot is loaded on open, so repeated runs merge into the
/// same graph.
#[derive(Debug)]
pub struct JsonGraphStore {
    path: PathBuf,
    inner: MemoryGraphStore,
}

impl JsonGraphStore {
    pub async fn open<P: AsRef<Path>>(path: P, lookup: LookupMode) -> DepGraphResult<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = if fs::try_exists(&path).await? {
            let json = fs::read_to_string(&path).await.map_err(|e| {
                DepGraphError::store(format!("Failed to read graph {}: {}", path.display(), e))
            })?;
            let snapshot: GraphSnapshot = serde_json::from_str(&json)?;
            info!(
                "Loaded graph with {} nodes from {}",
                snapshot.nodes.len(),
                path.display()
            );
            MemoryGraphStore::from_snapshot(snapshot, lookup)?
        } else {
            MemoryGraphStore::new(lookup)
        };
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn graph(&self) -> &MemoryGraphStore {
        &self.inner
    }
}

#[async_trait]
impl GraphStore for JsonGraphStore {
    async fn find_node(&self, name: &PackageName) -> DepGraphResult<Option<PackageNode>> {
        self.inner.find_node(name).await
    }

    async fn upsert_node(&mut self, name: &PackageName, version: &str) -> DepGraphResult<()> {
        self.inner.upsert_node(name, version).await
    }

    async fn upsert_edge(
        &mut self,
        from: &PackageName,
        to: &PackageName,
        label: EdgeLabel,
    ) -> DepGraphResult<()> {
        self.inner.upsert_edge(from, to, label).await
    }

    async fn flush(&mut self) -> DepGraphResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&self.inner.snapshot())?;
        fs::write(&self.path, json).await.map_err(|e| {
            DepGraphError::store(format!("Failed to write graph {}: {}", self.path.display(), e))
        })?;
        debug!("Flushed graph to {}", self.path.display());
        Ok(())
    }
}
