// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Flowchart syntax tree

/// Flow direction declared in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `TD` / `TB`
    TopDown,
    /// `BT`
    BottomUp,
    /// `LR`
    LeftRight,
    /// `RL`
    RightLeft,
}

impl Direction {
    /// True when ranks are stacked vertically
    #[must_use]
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::TopDown | Self::BottomUp)
    }

    /// True when ranks run against reading order
    #[must_use]
    pub fn is_reversed(self) -> bool {
        matches!(self, Self::BottomUp | Self::RightLeft)
    }
}

/// Box outline used for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// `[..]` and the other square-cornered forms
    Rect,
    /// `(..)`, `([..])`, `((..))`
    Round,
    /// `{..}` and `{{..}}`
    Rhombus,
}

/// A declared or implied node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Identifier used by links
    pub id: String,
    /// Text shown inside the box
    pub label: String,
    /// Outline
    pub shape: NodeShape,
}

/// Line style of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    /// `-->`, `---`
    Solid,
    /// `-.->`, `-.-`
    Dotted,
    /// `==>`, `===`
    Thick,
}

/// Directed link between two nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Source node id
    pub from: String,
    /// Target node id
    pub to: String,
    /// Line style
    pub stroke: Stroke,
    /// Whether the target end carries an arrowhead
    pub arrow: bool,
    /// Optional text on the link
    pub label: Option<String>,
}

/// A parsed `graph` / `flowchart` diagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flowchart {
    /// Declared direction
    pub direction: Direction,
    /// Nodes in first-mention order
    pub nodes: Vec<Node>,
    /// Links in declaration order
    pub links: Vec<Link>,
}

impl Flowchart {
    /// Empty chart flowing in `direction`
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Position of a node in `nodes`
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Record a node mention. A mention with a shape relabels an earlier
    /// bare mention; a bare mention never overrides a declared label.
    pub fn mention(&mut self, id: &str, shape: Option<(NodeShape, String)>) {
        match (self.position(id), shape) {
            (Some(idx), Some((shape, label))) => {
                self.nodes[idx].shape = shape;
                self.nodes[idx].label = label;
            }
            (Some(_), None) => {}
            (None, Some((shape, label))) => self.nodes.push(Node {
                id: id.to_string(),
                label,
                shape,
            }),
            (None, None) => self.nodes.push(Node {
                id: id.to_string(),
                label: id.to_string(),
                shape: NodeShape::Rect,
            }),
        }
    }
}
