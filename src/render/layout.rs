// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Layered layout for flowcharts
//!
//! Ranks are longest-path depths in the chart with DFS back edges removed,
//! so cycles still get a stable layering. Nodes share a rank in declaration
//! order and each rank is centered on the widest one.

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent};
use unicode_width::UnicodeWidthStr;

use super::ast::Flowchart;
use super::RenderError;

/// Height of every node box
pub const BOX_HEIGHT: usize = 3;
/// Rows between vertically stacked ranks
const RANK_GAP_ROWS: usize = 4;
/// Columns between nodes sharing a vertical rank
const NODE_GAP_COLS: usize = 4;
/// Minimum columns between horizontal ranks
const RANK_GAP_COLS: usize = 6;
/// Rows between nodes sharing a horizontal rank
const NODE_GAP_ROWS: usize = 1;

/// Placement of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeBox {
    /// Left column
    pub x: usize,
    /// Top row
    pub y: usize,
    /// Width in columns, borders included
    pub width: usize,
    /// Last row/column (along the flow axis) of the rank band holding this box
    pub band_end: usize,
}

impl NodeBox {
    /// Last column
    #[must_use]
    pub fn right(&self) -> usize {
        self.x + self.width - 1
    }

    /// Last row
    #[must_use]
    pub fn bottom(&self) -> usize {
        self.y + BOX_HEIGHT - 1
    }

    /// Middle column
    #[must_use]
    pub fn center_x(&self) -> usize {
        self.x + self.width / 2
    }

    /// Middle row
    #[must_use]
    pub fn center_y(&self) -> usize {
        self.y + BOX_HEIGHT / 2
    }
}

/// Computed positions for a chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// One box per chart node, same order as `Flowchart::nodes`
    pub boxes: Vec<NodeBox>,
    /// Rank of each node after applying the direction
    pub ranks: Vec<usize>,
    /// Whether ranks stack top-to-bottom (otherwise left-to-right)
    pub vertical: bool,
    /// Canvas width
    pub width: usize,
    /// Canvas height
    pub height: usize,
}

/// Width of a node box for `label`
#[must_use]
pub fn box_width(label: &str) -> usize {
    UnicodeWidthStr::width(label) + 4
}

/// Lay out a parsed chart
pub fn compute(chart: &Flowchart) -> Result<Layout, RenderError> {
    if chart.nodes.is_empty() {
        return Err(RenderError::Layout("no nodes to draw".into()));
    }

    let mut ranks = assign_ranks(chart)?;
    let max_rank = ranks.iter().copied().max().unwrap_or(0);
    if chart.direction.is_reversed() {
        for rank in &mut ranks {
            *rank = max_rank - *rank;
        }
    }

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
    for (idx, rank) in ranks.iter().enumerate() {
        members[*rank].push(idx);
    }

    let widths: Vec<usize> = chart.nodes.iter().map(|n| box_width(&n.label)).collect();
    let label_width = chart
        .links
        .iter()
        .filter_map(|l| l.label.as_deref())
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0);

    let vertical = chart.direction.is_vertical();
    let (boxes, width, height) = if vertical {
        place_vertical(&members, &widths, label_width)
    } else {
        place_horizontal(&members, &widths, label_width)
    };

    Ok(Layout {
        boxes,
        ranks,
        vertical,
        width,
        height,
    })
}

fn place_vertical(
    members: &[Vec<usize>],
    widths: &[usize],
    label_width: usize,
) -> (Vec<NodeBox>, usize, usize) {
    let row_width = |rank: &[usize]| -> usize {
        rank.iter().map(|&i| widths[i]).sum::<usize>()
            + NODE_GAP_COLS * rank.len().saturating_sub(1)
    };
    let content_width = members.iter().map(|r| row_width(r)).max().unwrap_or(0);

    let mut boxes = vec![
        NodeBox {
            x: 0,
            y: 0,
            width: 0,
            band_end: 0,
        };
        widths.len()
    ];

    for (rank, nodes) in members.iter().enumerate() {
        let y = rank * (BOX_HEIGHT + RANK_GAP_ROWS);
        let mut x = (content_width - row_width(nodes)) / 2;
        for &idx in nodes {
            boxes[idx] = NodeBox {
                x,
                y,
                width: widths[idx],
                band_end: y + BOX_HEIGHT - 1,
            };
            x += widths[idx] + NODE_GAP_COLS;
        }
    }

    let height = members.len() * (BOX_HEIGHT + RANK_GAP_ROWS) - RANK_GAP_ROWS;
    // Room for link labels written beside the right-most arrows
    let width = content_width + label_width + 3;
    (boxes, width, height)
}

fn place_horizontal(
    members: &[Vec<usize>],
    widths: &[usize],
    label_width: usize,
) -> (Vec<NodeBox>, usize, usize) {
    let rank_gap = RANK_GAP_COLS + label_width;
    let column_height = |rank: &[usize]| -> usize {
        (rank.len() * (BOX_HEIGHT + NODE_GAP_ROWS)).saturating_sub(NODE_GAP_ROWS)
    };
    let content_height = members.iter().map(|r| column_height(r)).max().unwrap_or(0);

    let mut boxes = vec![
        NodeBox {
            x: 0,
            y: 0,
            width: 0,
            band_end: 0,
        };
        widths.len()
    ];

    let mut x = 0;
    for nodes in members {
        let column_width = nodes.iter().map(|&i| widths[i]).max().unwrap_or(0);
        let mut y = (content_height - column_height(nodes)) / 2;
        for &idx in nodes {
            boxes[idx] = NodeBox {
                x,
                y,
                width: widths[idx],
                band_end: x + column_width - 1,
            };
            y += BOX_HEIGHT + NODE_GAP_ROWS;
        }
        x += column_width + rank_gap;
    }

    let width = x - rank_gap + label_width;
    (boxes, width, content_height)
}

/// Longest-path ranks over the chart minus its DFS back edges
fn assign_ranks(chart: &Flowchart) -> Result<Vec<usize>, RenderError> {
    let mut graph: DiGraph<(), ()> = DiGraph::new();
    let indices: Vec<NodeIndex> = chart.nodes.iter().map(|_| graph.add_node(())).collect();

    let mut pairs = Vec::with_capacity(chart.links.len());
    for link in &chart.links {
        let (Some(from), Some(to)) = (chart.position(&link.from), chart.position(&link.to)) else {
            continue;
        };
        if from != to {
            graph.add_edge(indices[from], indices[to], ());
            pairs.push((indices[from], indices[to]));
        }
    }

    let mut back_edges = HashSet::new();
    depth_first_search(&graph, indices.iter().copied(), |event| {
        if let DfsEvent::BackEdge(u, v) = event {
            back_edges.insert((u, v));
        }
    });

    let mut dag: DiGraph<(), ()> = DiGraph::new();
    for _ in &indices {
        dag.add_node(());
    }
    for (u, v) in pairs {
        if !back_edges.contains(&(u, v)) {
            dag.add_edge(u, v, ());
        }
    }

    let order = toposort(&dag, None).map_err(|cycle| {
        RenderError::Layout(format!(
            "cycle through node {}",
            chart.nodes[cycle.node_id().index()].id
        ))
    })?;

    let mut ranks = vec![0usize; chart.nodes.len()];
    for node in order {
        for next in dag.neighbors(node) {
            ranks[next.index()] = ranks[next.index()].max(ranks[node.index()] + 1);
        }
    }
    Ok(ranks)
}
