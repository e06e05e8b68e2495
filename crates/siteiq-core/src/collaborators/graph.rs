//! Knowledge graph collaborator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::types::ValueMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub node_type: String,
    pub label: String,
    #[serde(default)]
    pub properties: ValueMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub relation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Subgraph {
    /// Nodes other than `root`
    pub fn neighbors<'a>(&'a self, root: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |node| node.id != root)
    }
}

#[async_trait]
pub trait KnowledgeGraphCollaborator: Send + Sync {
    async fn search_nodes(
        &self,
        node_type: Option<&str>,
        label_contains: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Node>, CollaboratorError>;

    async fn get_connected_subgraph(
        &self,
        node_id: &str,
        depth: usize,
        limit: usize,
    ) -> Result<Subgraph, CollaboratorError>;
}
