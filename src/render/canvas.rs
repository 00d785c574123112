// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Character grid and flowchart drawing

use std::collections::HashMap;

use super::ast::{Flowchart, Link, NodeShape, Stroke};
use super::layout::{Layout, NodeBox};

/// Marks the second column of a double-width character
const WIDE_TAIL: char = '\0';

/// A fixed-size grid of characters
pub struct Canvas {
    cells: Vec<Vec<char>>,
    /// Zero-width characters riding on a cell, such as combining accents
    marks: HashMap<(usize, usize), String>,
    width: usize,
    height: usize,
}

impl Canvas {
    /// Blank canvas
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![vec![' '; width]; height],
            marks: HashMap::new(),
            width,
            height,
        }
    }

    /// Write one cell; out-of-bounds writes are dropped
    pub fn set(&mut self, row: usize, col: usize, ch: char) {
        if row < self.height && col < self.width {
            // Overwriting the tail of a wide char orphans its head
            if self.cells[row][col] == WIDE_TAIL && col > 0 {
                self.cells[row][col - 1] = ' ';
            }
            self.cells[row][col] = ch;
            self.marks.remove(&(row, col));
        }
    }

    /// Write text starting at `col`, reserving two cells for wide chars.
    /// Zero-width characters attach to the cell before them.
    pub fn write_str(&mut self, row: usize, col: usize, text: &str) {
        let mut offset = 0;
        let mut last = None;
        for ch in text.chars() {
            let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(1);
            if w == 0 {
                if let Some(cell) = last {
                    if row < self.height && cell < self.width {
                        self.marks.entry((row, cell)).or_default().push(ch);
                    }
                }
                continue;
            }
            self.set(row, col + offset, ch);
            last = Some(col + offset);
            for j in 1..w {
                self.set(row, col + offset + j, WIDE_TAIL);
            }
            offset += w;
        }
    }

    /// Write a line glyph, turning crossings into junctions
    pub fn merge(&mut self, row: usize, col: usize, ch: char) {
        if row < self.height && col < self.width {
            let existing = self.cells[row][col];
            let merged = if existing == ' ' || existing == ch {
                ch
            } else {
                '┼'
            };
            self.set(row, col, merged);
        }
    }

    /// Draw connected straight segments with corners at each bend
    pub fn polyline(&mut self, points: &[(usize, usize)], stroke: Stroke) {
        let (horizontal, vertical) = line_glyphs(stroke);
        for seg in points.windows(2) {
            let ((r0, c0), (r1, c1)) = (seg[0], seg[1]);
            if r0 == r1 {
                for col in c0.min(c1)..=c0.max(c1) {
                    self.merge(r0, col, horizontal);
                }
            } else {
                for row in r0.min(r1)..=r0.max(r1) {
                    self.merge(row, c0, vertical);
                }
            }
        }
        for i in 1..points.len().saturating_sub(1) {
            let (prev, cur, next) = (points[i - 1], points[i], points[i + 1]);
            self.set(cur.0, cur.1, corner(toward(cur, prev), toward(cur, next)));
        }
    }

    /// Draw a node outline with its label, blanking whatever was underneath
    pub fn draw_box(&mut self, b: &NodeBox, label: &str, shape: NodeShape) {
        let (tl, tr, bl, br, left, right) = match shape {
            NodeShape::Rect => ('┌', '┐', '└', '┘', '│', '│'),
            NodeShape::Round => ('╭', '╮', '╰', '╯', '│', '│'),
            NodeShape::Rhombus => ('/', '\\', '\\', '/', '<', '>'),
        };

        for row in b.y..=b.bottom() {
            for col in b.x..=b.right() {
                self.set(row, col, ' ');
            }
        }

        self.set(b.y, b.x, tl);
        self.set(b.y, b.right(), tr);
        self.set(b.bottom(), b.x, bl);
        self.set(b.bottom(), b.right(), br);
        for col in b.x + 1..b.right() {
            self.set(b.y, col, '─');
            self.set(b.bottom(), col, '─');
        }
        self.set(b.center_y(), b.x, left);
        self.set(b.center_y(), b.right(), right);
        self.write_str(b.center_y(), b.x + 2, label);
    }

    /// Rows joined by newlines, trailing blanks removed
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .cells
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let mut line = String::with_capacity(row.len());
                for (c, &ch) in row.iter().enumerate() {
                    if ch == WIDE_TAIL {
                        continue;
                    }
                    line.push(ch);
                    if let Some(marks) = self.marks.get(&(r, c)) {
                        line.push_str(marks);
                    }
                }
                line.trim_end().to_string()
            })
            .collect();
        while lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Up,
    Down,
    Left,
    Right,
}

fn toward(from: (usize, usize), to: (usize, usize)) -> Side {
    if to.0 < from.0 {
        Side::Up
    } else if to.0 > from.0 {
        Side::Down
    } else if to.1 < from.1 {
        Side::Left
    } else {
        Side::Right
    }
}

fn corner(a: Side, b: Side) -> char {
    match (a, b) {
        (Side::Up, Side::Right) | (Side::Right, Side::Up) => '└',
        (Side::Up, Side::Left) | (Side::Left, Side::Up) => '┘',
        (Side::Down, Side::Right) | (Side::Right, Side::Down) => '┌',
        (Side::Down, Side::Left) | (Side::Left, Side::Down) => '┐',
        (Side::Up | Side::Down, _) => '│',
        _ => '─',
    }
}

fn line_glyphs(stroke: Stroke) -> (char, char) {
    match stroke {
        Stroke::Solid => ('─', '│'),
        Stroke::Dotted => ('┄', '┆'),
        Stroke::Thick => ('━', '┃'),
    }
}

fn head_glyph(side: Side) -> char {
    match side {
        Side::Up => '▲',
        Side::Down => '▼',
        Side::Left => '◄',
        Side::Right => '►',
    }
}

/// Drop repeated points and the middle of straight runs
fn simplify(points: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    let mut out: Vec<(usize, usize)> = Vec::with_capacity(points.len());
    for p in points {
        if out.last() == Some(&p) {
            continue;
        }
        if out.len() >= 2 {
            let (a, b) = (out[out.len() - 2], out[out.len() - 1]);
            if (a.0 == b.0 && b.0 == p.0) || (a.1 == b.1 && b.1 == p.1) {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

struct Route<'a> {
    points: Vec<(usize, usize)>,
    stroke: Stroke,
    arrow: bool,
    label: Option<&'a str>,
    label_at: (usize, usize),
}

fn route<'a>(a: &NodeBox, b: &NodeBox, vertical: bool, link: &'a Link) -> Option<Route<'a>> {
    let (points, label_at) = if vertical {
        if b.y > a.y {
            let (ax, bx) = (a.center_x(), b.center_x());
            let m = a.band_end + 2;
            (
                vec![(a.bottom() + 1, ax), (m, ax), (m, bx), (b.y - 1, bx)],
                (b.y - 2, bx + 2),
            )
        } else if b.y < a.y {
            // Upward links run near the right edge so they don't hide downward ones
            let (ax, bx) = (a.right() - 1, b.right() - 1);
            let m = b.band_end + 2;
            (
                vec![(a.y - 1, ax), (m, ax), (m, bx), (b.bottom() + 1, bx)],
                (b.bottom() + 1, bx + 2),
            )
        } else {
            return None;
        }
    } else if b.x > a.x {
        let (ay, by) = (a.center_y(), b.center_y());
        let m = a.band_end + 2;
        (
            vec![(ay, a.right() + 1), (ay, m), (by, m), (by, b.x - 1)],
            (by - 1, m + 2),
        )
    } else if b.x < a.x {
        let (ay, by) = (a.center_y(), b.center_y());
        let m = b.band_end + 2;
        (
            vec![(ay, a.x - 1), (ay, m), (by, m), (by, b.right() + 1)],
            (by + 1, m + 2),
        )
    } else {
        return None;
    };

    Some(Route {
        points: simplify(points),
        stroke: link.stroke,
        arrow: link.arrow,
        label: link.label.as_deref(),
        label_at,
    })
}

/// Draw a laid-out chart to text
#[must_use]
pub fn draw(chart: &Flowchart, layout: &Layout) -> String {
    let mut canvas = Canvas::new(layout.width, layout.height);

    let routes: Vec<Route<'_>> = chart
        .links
        .iter()
        .filter_map(|link| {
            let from = chart.position(&link.from)?;
            let to = chart.position(&link.to)?;
            if from == to {
                return None;
            }
            route(&layout.boxes[from], &layout.boxes[to], layout.vertical, link)
        })
        .collect();

    for r in &routes {
        canvas.polyline(&r.points, r.stroke);
    }

    for (node, b) in chart.nodes.iter().zip(&layout.boxes) {
        canvas.draw_box(b, &node.label, node.shape);
    }

    for r in &routes {
        let n = r.points.len();
        if r.arrow && n >= 2 {
            let (end, before) = (r.points[n - 1], r.points[n - 2]);
            canvas.set(end.0, end.1, head_glyph(toward(before, end)));
        }
        if let Some(label) = r.label {
            canvas.write_str(r.label_at.0, r.label_at.1, label);
        }
    }

    canvas.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_renders_trimmed_rows() {
        let mut canvas = Canvas::new(6, 3);
        canvas.write_str(0, 1, "ab");
        assert_eq!(canvas.render(), " ab");
    }

    #[test]
    fn test_wide_chars_take_two_cells() {
        let mut canvas = Canvas::new(6, 1);
        canvas.write_str(0, 0, "日x");
        assert_eq!(canvas.render(), "日x");
    }

    #[test]
    fn test_crossing_lines_merge() {
        let mut canvas = Canvas::new(3, 3);
        canvas.polyline(&[(1, 0), (1, 2)], Stroke::Solid);
        canvas.polyline(&[(0, 1), (2, 1)], Stroke::Solid);
        assert_eq!(canvas.render(), " │\n─┼─\n │");
    }

    #[test]
    fn test_bends_get_corners() {
        let mut canvas = Canvas::new(3, 3);
        canvas.polyline(&[(0, 0), (2, 0), (2, 2)], Stroke::Solid);
        assert_eq!(canvas.render(), "│\n│\n└──");
    }

    #[test]
    fn test_simplify_drops_duplicates_and_straight_runs() {
        assert_eq!(
            simplify(vec![(3, 4), (4, 4), (4, 4), (6, 4)]),
            vec![(3, 4), (6, 4)]
        );
        assert_eq!(
            simplify(vec![(3, 2), (4, 2), (4, 8), (6, 8)]),
            vec![(3, 2), (4, 2), (4, 8), (6, 8)]
        );
    }

    #[test]
    fn test_boxes_by_shape() {
        let b = NodeBox {
            x: 0,
            y: 0,
            width: 5,
            band_end: 2,
        };
        let mut canvas = Canvas::new(5, 3);
        canvas.draw_box(&b, "A", NodeShape::Rect);
        assert_eq!(canvas.render(), "┌───┐\n│ A │\n└───┘");

        let mut canvas = Canvas::new(5, 3);
        canvas.draw_box(&b, "A", NodeShape::Rhombus);
        assert_eq!(canvas.render(), "/───\\\n< A >\n\\───/");
    }

    #[test]
    fn test_combining_marks_share_a_cell() {
        let mut canvas = Canvas::new(4, 1);
        canvas.write_str(0, 0, "e\u{301}x");
        assert_eq!(canvas.render(), "e\u{301}x");

        let b = NodeBox {
            x: 0,
            y: 0,
            width: 5,
            band_end: 2,
        };
        let mut canvas = Canvas::new(5, 3);
        canvas.draw_box(&b, "e\u{301}", NodeShape::Rect);
        assert_eq!(canvas.render(), "┌───┐\n│ e\u{301} │\n└───┘");
    }

    #[test]
    fn test_overwriting_a_cell_drops_its_marks() {
        let mut canvas = Canvas::new(2, 1);
        canvas.write_str(0, 0, "e\u{301}");
        canvas.set(0, 0, 'x');
        assert_eq!(canvas.render(), "x");
    }
}
