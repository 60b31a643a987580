//! Read-only view of the road/rail network.
//!
//! The editor never changes topology; it only resolves links and nodes by id
//! to find where a path has to start and end.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::ids::{DuplicateId, LinkId, NodeId, TransportMode};

/// A planar coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A graph vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub coord: Coord,
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    /// Length in metres, used as routing cost.
    pub length: f64,
    #[serde(default)]
    pub allowed_modes: BTreeSet<TransportMode>,
}

impl Link {
    /// Returns true if any of `modes` may use this link.
    pub fn allows_any(&self, modes: &BTreeSet<TransportMode>) -> bool {
        !self.allowed_modes.is_disjoint(modes)
    }
}

/// Error returned when adding a link whose end nodes are unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("link {link} references unknown node {node}")]
pub struct UnknownNode {
    pub link: LinkId,
    pub node: NodeId,
}

/// Error returned when a serialized network is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidNetwork {
    #[error(transparent)]
    Duplicate(#[from] DuplicateId),

    #[error(transparent)]
    UnknownNode(#[from] UnknownNode),
}

/// Nodes and links addressed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "NetworkRecord", into = "NetworkRecord")]
pub struct Network {
    nodes: HashMap<NodeId, Node>,
    links: HashMap<LinkId, Link>,
}

impl Network {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a node.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Add or replace a link. Both end nodes must already exist.
    pub fn add_link(&mut self, link: Link) -> Result<(), UnknownNode> {
        for node in [&link.from, &link.to] {
            if !self.nodes.contains_key(node) {
                return Err(UnknownNode {
                    link: link.id.clone(),
                    node: node.clone(),
                });
            }
        }
        self.links.insert(link.id.clone(), link);
        Ok(())
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn link(&self, id: &LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    /// Mutable access to a link's attributes. Topology is left to
    /// [`Network::add_link`].
    pub fn link_mut(&mut self, id: &LinkId) -> Option<&mut Link> {
        self.links.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Returns true if `links` is a contiguous path: every link exists and
    /// each link ends where the next one starts.
    pub fn is_contiguous(&self, links: &[LinkId]) -> bool {
        let resolved: Option<Vec<&Link>> = links.iter().map(|id| self.link(id)).collect();
        match resolved {
            Some(resolved) => resolved.windows(2).all(|pair| pair[0].to == pair[1].from),
            None => false,
        }
    }
}

/// Serialized form: plain lists, sorted for stable output.
#[derive(Serialize, Deserialize)]
struct NetworkRecord {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl TryFrom<NetworkRecord> for Network {
    type Error = InvalidNetwork;

    fn try_from(r: NetworkRecord) -> Result<Self, Self::Error> {
        let mut network = Network::new();
        for node in r.nodes {
            if network.nodes.contains_key(&node.id) {
                return Err(DuplicateId {
                    kind: "node",
                    id: node.id.to_string(),
                }
                .into());
            }
            network.add_node(node);
        }
        for link in r.links {
            if network.links.contains_key(&link.id) {
                return Err(DuplicateId {
                    kind: "link",
                    id: link.id.to_string(),
                }
                .into());
            }
            network.add_link(link)?;
        }
        Ok(network)
    }
}

impl From<Network> for NetworkRecord {
    fn from(n: Network) -> Self {
        let mut nodes: Vec<Node> = n.nodes.into_values().collect();
        let mut links: Vec<Link> = n.links.into_values().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        links.sort_by(|a, b| a.id.cmp(&b.id));
        NetworkRecord { nodes, links }
    }
}
