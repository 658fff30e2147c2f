//! Node placement and radio adjacency
//!
//! Provides functions to place nodes:
//! - Line: nodes on the x axis, evenly spaced
//! - Grid: row-major rows of a fixed width
//! - Custom: explicit positions
//!
//! Two nodes are radio neighbors when their distance is within range.

use std::collections::BTreeMap;

use manet_core::NodeId;
use serde::{Deserialize, Serialize};

use crate::config::Layout;

/// Position in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Where every node sits; node `i` is at index `i`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    positions: Vec<Position>,
}

impl Topology {
    /// Nodes on the x axis, `spacing` apart
    pub fn line(nodes: u32, spacing: f64) -> Self {
        let positions = (0..nodes)
            .map(|i| Position::new(f64::from(i) * spacing, 0.0))
            .collect();
        Self { positions }
    }

    /// Row-major grid, `columns` wide; a zero width is treated as one
    pub fn grid(nodes: u32, columns: u32, spacing: f64) -> Self {
        let columns = columns.max(1);
        let positions = (0..nodes)
            .map(|i| {
                Position::new(
                    f64::from(i % columns) * spacing,
                    f64::from(i / columns) * spacing,
                )
            })
            .collect();
        Self { positions }
    }

    pub fn from_layout(layout: Layout, nodes: u32, spacing: f64) -> Self {
        match layout {
            Layout::Line => Self::line(nodes, spacing),
            Layout::Grid { columns } => Self::grid(nodes, columns, spacing),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        (0..self.positions.len() as u32).map(NodeId).collect()
    }

    /// Every node with its position, in id order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Position)> + '_ {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, position)| (NodeId(i as u32), *position))
    }

    pub fn contains(&self, node: NodeId) -> bool {
        (node.index() as usize) < self.positions.len()
    }

    pub fn position(&self, node: NodeId) -> Option<Position> {
        self.positions.get(node.index() as usize).copied()
    }

    pub fn distance(&self, a: NodeId, b: NodeId) -> Option<f64> {
        Some(self.position(a)?.distance_to(&self.position(b)?))
    }

    /// Every other node within `range` of `node`, in id order
    pub fn neighbors_within(&self, node: NodeId, range: f64) -> Vec<NodeId> {
        let Some(origin) = self.position(node) else {
            return Vec::new();
        };
        self.node_ids()
            .into_iter()
            .filter(|&other| other != node)
            .filter(|&other| {
                self.position(other)
                    .is_some_and(|p| origin.distance_to(&p) <= range)
            })
            .collect()
    }

    fn adjacency(&self, range: f64) -> BTreeMap<NodeId, Vec<NodeId>> {
        self.node_ids()
            .into_iter()
            .map(|node| (node, self.neighbors_within(node, range)))
            .collect()
    }

    /// Number of undirected radio links
    pub fn edge_count(&self, range: f64) -> usize {
        self.adjacency(range).values().map(Vec::len).sum::<usize>() / 2
    }

    /// Human-readable summary of placement, radio links and tunnel
    pub fn visualize(&self, range: f64, tunnel: Option<(NodeId, NodeId)>) -> String {
        let mut output = String::new();
        output.push_str("Topology:\n");
        output.push_str(&format!("  Nodes: {}\n", self.len()));
        output.push_str(&format!("  Radio links: {} (range {range} m)\n", self.edge_count(range)));
        if let Some((a, b)) = tunnel {
            output.push_str(&format!("  Tunnel: {a} <=> {b}\n"));
        }
        output.push('\n');

        for (node, neighbors) in self.adjacency(range) {
            let Some(position) = self.position(node) else {
                continue;
            };
            let neighbor_str: Vec<String> = neighbors.iter().map(|n| n.to_string()).collect();
            let mut line = format!(
                "  {node} ({:.0}, {:.0}) -> [{}]",
                position.x,
                position.y,
                neighbor_str.join(", ")
            );
            if let Some((a, b)) = tunnel {
                if node == a {
                    line.push_str(&format!(" <=> {b}"));
                } else if node == b {
                    line.push_str(&format!(" <=> {a}"));
                }
            }
            output.push_str(&line);
            output.push('\n');
        }
        output
    }
}
