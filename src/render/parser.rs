// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Mermaid flowchart parser
//!
//! Input is split into statements on newlines and on `;` outside brackets
//! and quotes, then each statement is parsed on its own with winnow.

use winnow::ascii::{space0, space1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated};
use winnow::prelude::*;
use winnow::stream::Stream;
use winnow::token::{take_until, take_while};

use super::ast::{Direction, Flowchart, NodeShape, Stroke};
use super::{escape_inline, RenderError};

/// Statements that style or annotate a chart but draw nothing
const IGNORED: &[&str] = &["classDef", "class", "style", "linkStyle", "click", "direction"];

/// Parse a `graph` / `flowchart` description
pub fn parse_flowchart(input: &str) -> Result<Flowchart, RenderError> {
    let statements = split_statements(strip_fences(input));
    let mut statements = statements.into_iter();

    let Some((line, head)) = statements.next() else {
        return Err(RenderError::Empty);
    };
    let keyword = head.split_whitespace().next().unwrap_or_default();
    if keyword != "graph" && keyword != "flowchart" {
        return Err(RenderError::Unsupported {
            kind: keyword.to_string(),
        });
    }
    let direction = header.parse(head).map_err(|_| syntax(line, head))?;

    let mut chart = Flowchart::new(direction);
    let mut subgraph_depth = 0usize;

    for (line, text) in statements {
        let keyword = text.split_whitespace().next().unwrap_or_default();
        if IGNORED.contains(&keyword) {
            continue;
        }
        if keyword == "subgraph" {
            subgraph_depth += 1;
            continue;
        }
        if text == "end" && subgraph_depth > 0 {
            subgraph_depth -= 1;
            continue;
        }

        let parsed = chain.parse(text).map_err(|_| syntax(line, text))?;
        collect_chain(&mut chart, parsed);
    }

    Ok(chart)
}

fn syntax(line: usize, statement: &str) -> RenderError {
    RenderError::Syntax {
        line,
        statement: statement.to_string(),
    }
}

fn collect_chain(chart: &mut Flowchart, parsed: Chain) {
    for group in &parsed.groups {
        for node in group {
            chart.mention(&node.id, node.shape.clone());
        }
    }
    for (i, op) in parsed.links.iter().enumerate() {
        for from in &parsed.groups[i] {
            for to in &parsed.groups[i + 1] {
                chart.links.push(super::ast::Link {
                    from: from.id.clone(),
                    to: to.id.clone(),
                    stroke: op.stroke,
                    arrow: op.arrow,
                    label: op.label.clone(),
                });
            }
        }
    }
}

// =============================================================================
// Statement splitting
// =============================================================================

/// Drop a surrounding Markdown code fence
fn strip_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let body = rest.split_once('\n').map_or("", |(_, body)| body);
            let body = body.trim_end();
            body.strip_suffix("```").unwrap_or(body)
        }
        None => trimmed,
    }
}

/// Split into trimmed, non-empty statements tagged with 1-based line numbers
fn split_statements(input: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        if line.trim_start().starts_with("%%") {
            continue;
        }

        let mut depth = 0usize;
        let mut quoted = false;
        let mut start = 0;
        for (i, c) in line.char_indices() {
            match c {
                '"' => quoted = !quoted,
                '[' | '(' | '{' if !quoted => depth += 1,
                ']' | ')' | '}' if !quoted => depth = depth.saturating_sub(1),
                ';' if !quoted && depth == 0 => {
                    push(&mut out, idx + 1, &line[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        push(&mut out, idx + 1, &line[start..]);
    }

    out
}

fn push<'a>(out: &mut Vec<(usize, &'a str)>, line: usize, text: &'a str) {
    let text = text.trim();
    if !text.is_empty() {
        out.push((line, text));
    }
}

// =============================================================================
// Grammar
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct NodeRef {
    id: String,
    shape: Option<(NodeShape, String)>,
}

#[derive(Debug, Clone, PartialEq)]
struct LinkOp {
    stroke: Stroke,
    arrow: bool,
    label: Option<String>,
}

impl LinkOp {
    fn new(stroke: Stroke, arrow: bool) -> Self {
        Self {
            stroke,
            arrow,
            label: None,
        }
    }
}

/// `A --> B & C -.-> D`: node groups joined by links
#[derive(Debug)]
struct Chain {
    groups: Vec<Vec<NodeRef>>,
    links: Vec<LinkOp>,
}

fn header(input: &mut &str) -> winnow::Result<Direction> {
    alt(("flowchart", "graph")).parse_next(input)?;
    let direction = opt(preceded(space1, direction)).parse_next(input)?;
    space0.parse_next(input)?;
    Ok(direction.unwrap_or(Direction::TopDown))
}

fn direction(input: &mut &str) -> winnow::Result<Direction> {
    alt((
        "TD".value(Direction::TopDown),
        "TB".value(Direction::TopDown),
        "BT".value(Direction::BottomUp),
        "LR".value(Direction::LeftRight),
        "RL".value(Direction::RightLeft),
    ))
    .parse_next(input)
}

fn chain(input: &mut &str) -> winnow::Result<Chain> {
    let first = node_group.parse_next(input)?;
    let rest: Vec<(LinkOp, Vec<NodeRef>)> =
        repeat(0.., (delimited(space0, link, space0), node_group)).parse_next(input)?;

    let mut groups = vec![first];
    let mut links = Vec::with_capacity(rest.len());
    for (op, group) in rest {
        links.push(op);
        groups.push(group);
    }
    Ok(Chain { groups, links })
}

fn node_group(input: &mut &str) -> winnow::Result<Vec<NodeRef>> {
    separated(1.., node_ref, (space0, '&', space0)).parse_next(input)
}

/// Node id. A `-` is part of the id only when a word character follows it,
/// so `a-b-->c` reads as `a-b` linked to `c`.
fn identifier<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut end = 0;
    let text: &'s str = *input;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let next_is_word = chars.peek().is_some_and(|&(_, n)| is_word(n));
        if is_word(c) || (c == '-' && end > 0 && next_is_word) {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    if end == 0 {
        return Err(winnow::error::ParserError::from_input(input));
    }
    Ok(input.next_slice(end))
}

fn node_ref(input: &mut &str) -> winnow::Result<NodeRef> {
    let id = identifier.parse_next(input)?;
    let shape = opt(shape_label).parse_next(input)?;
    // `:::className` attaches a style class
    opt(preceded(":::", identifier)).parse_next(input)?;
    Ok(NodeRef {
        id: id.to_string(),
        shape,
    })
}

fn shape_label(input: &mut &str) -> winnow::Result<(NodeShape, String)> {
    alt((
        shaped("(((", ")))", NodeShape::Round),
        shaped("((", "))", NodeShape::Round),
        shaped("([", "])", NodeShape::Round),
        shaped("[[", "]]", NodeShape::Rect),
        shaped("[(", ")]", NodeShape::Rect),
        shaped("[", "]", NodeShape::Rect),
        shaped("(", ")", NodeShape::Round),
        shaped("{{", "}}", NodeShape::Rhombus),
        shaped("{", "}", NodeShape::Rhombus),
        shaped(">", "]", NodeShape::Rect),
    ))
    .parse_next(input)
}

fn shaped(
    mut open: &'static str,
    mut close: &'static str,
    shape: NodeShape,
) -> impl FnMut(&mut &str) -> winnow::Result<(NodeShape, String)> {
    move |input: &mut &str| {
        open.parse_next(input)?;
        let text = alt((
            delimited('"', take_while(0.., |c: char| c != '"'), '"'),
            take_until(0.., close),
        ))
        .parse_next(input)?;
        close.parse_next(input)?;
        Ok((shape, clean_label(text)))
    }
}

fn link(input: &mut &str) -> winnow::Result<LinkOp> {
    let mut op = alt((labeled_link, dotted_link, thick_link, solid_link)).parse_next(input)?;
    if let Some(text) = opt(pipe_label).parse_next(input)? {
        op.label = Some(text);
    }
    Ok(op)
}

/// `-- text -->`, `-. text .->`, `== text ==>`
fn labeled_link(input: &mut &str) -> winnow::Result<LinkOp> {
    let (stroke, text, arrow) = alt((
        ("--", space1, take_until(1.., "--"), take_while(2.., '-'), opt('>'))
            .map(|(_, _, text, _, head)| (Stroke::Solid, text, head.is_some())),
        ("-.", space1, take_until(1.., ".-"), ".-", opt('>'))
            .map(|(_, _, text, _, head)| (Stroke::Dotted, text, head.is_some())),
        ("==", space1, take_until(1.., "=="), take_while(2.., '='), opt('>'))
            .map(|(_, _, text, _, head)| (Stroke::Thick, text, head.is_some())),
    ))
    .parse_next(input)?;

    let mut op = LinkOp::new(stroke, arrow);
    op.label = Some(clean_label(text));
    Ok(op)
}

fn dotted_link(input: &mut &str) -> winnow::Result<LinkOp> {
    ("-.", take_while(1.., '-'), opt('>'))
        .map(|(_, _, head)| LinkOp::new(Stroke::Dotted, head.is_some()))
        .parse_next(input)
}

fn thick_link(input: &mut &str) -> winnow::Result<LinkOp> {
    let rules = take_while(2.., '=').parse_next(input)?;
    let head = opt('>').parse_next(input)?;
    if head.is_none() && rules.len() < 3 {
        return Err(winnow::error::ParserError::from_input(input));
    }
    Ok(LinkOp::new(Stroke::Thick, head.is_some()))
}

fn solid_link(input: &mut &str) -> winnow::Result<LinkOp> {
    let dashes = take_while(2.., '-').parse_next(input)?;
    let head = opt('>').parse_next(input)?;
    if head.is_none() && dashes.len() < 3 {
        return Err(winnow::error::ParserError::from_input(input));
    }
    Ok(LinkOp::new(Stroke::Solid, head.is_some()))
}

fn pipe_label(input: &mut &str) -> winnow::Result<String> {
    delimited('|', take_while(0.., |c: char| c != '|'), '|')
        .map(clean_label)
        .parse_next(input)
}

/// Trim, unquote, flatten `<br>` line breaks into spaces and escape
/// anything that could drive the terminal
fn clean_label(raw: &str) -> String {
    let text = raw.trim();
    let text = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    text.replace("<br/>", " ")
        .replace("<br />", " ")
        .replace("<br>", " ")
        .split_whitespace()
        .map(escape_inline)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_direction_variants() {
        for (text, expected) in [
            ("TD", Direction::TopDown),
            ("TB", Direction::TopDown),
            ("BT", Direction::BottomUp),
            ("LR", Direction::LeftRight),
            ("RL", Direction::RightLeft),
        ] {
            let mut input = text;
            assert_eq!(direction(&mut input).unwrap(), expected);
        }
    }

    #[test]
    fn test_parse_single_line_with_semicolons() {
        let chart = parse_flowchart("graph TD; A-->B;").unwrap();
        assert_eq!(chart.direction, Direction::TopDown);
        assert_eq!(chart.nodes.len(), 2);
        assert_eq!(chart.nodes[0].id, "A");
        assert_eq!(chart.nodes[1].id, "B");
        assert_eq!(chart.links.len(), 1);
        assert_eq!(chart.links[0].from, "A");
        assert_eq!(chart.links[0].to, "B");
        assert!(chart.links[0].arrow);
    }

    #[test]
    fn test_parse_header_without_direction() {
        let chart = parse_flowchart("flowchart\n  A --> B\n").unwrap();
        assert_eq!(chart.direction, Direction::TopDown);
    }

    #[test]
    fn test_parse_shapes_and_labels() {
        let chart = parse_flowchart(
            "graph LR\n  A[Start] --> B(Round)\n  B --> C{Decide?}\n  C --> D((\"Quoted [x]\"))\n",
        )
        .unwrap();
        assert_eq!(chart.nodes[0].label, "Start");
        assert_eq!(chart.nodes[0].shape, NodeShape::Rect);
        assert_eq!(chart.nodes[1].shape, NodeShape::Round);
        assert_eq!(chart.nodes[2].shape, NodeShape::Rhombus);
        assert_eq!(chart.nodes[2].label, "Decide?");
        assert_eq!(chart.nodes[3].label, "Quoted [x]");
    }

    #[test]
    fn test_later_declaration_relabels_node() {
        let chart = parse_flowchart("graph TD\n  A --> B\n  B[Backend]\n  B --> C\n").unwrap();
        assert_eq!(chart.nodes.len(), 3);
        assert_eq!(chart.nodes[1].label, "Backend");
    }

    #[test]
    fn test_parse_link_styles() {
        let chart =
            parse_flowchart("graph TD\n  A --- B\n  B -.-> C\n  C ==> D\n  D ---> E\n  E -.- F\n")
                .unwrap();
        let styles: Vec<(Stroke, bool)> = chart.links.iter().map(|l| (l.stroke, l.arrow)).collect();
        assert_eq!(
            styles,
            vec![
                (Stroke::Solid, false),
                (Stroke::Dotted, true),
                (Stroke::Thick, true),
                (Stroke::Solid, true),
                (Stroke::Dotted, false),
            ]
        );
    }

    #[test]
    fn test_parse_link_labels() {
        let chart = parse_flowchart(
            "graph TD\n  A -->|yes| B\n  A -- no --> C\n  B -. maybe .-> C\n  C == sure ==> D\n",
        )
        .unwrap();
        let labels: Vec<Option<&str>> = chart.links.iter().map(|l| l.label.as_deref()).collect();
        assert_eq!(labels, vec![Some("yes"), Some("no"), Some("maybe"), Some("sure")]);
        assert!(chart.links.iter().all(|l| l.arrow));
    }

    #[test]
    fn test_parse_chains_and_groups() {
        let chart = parse_flowchart("graph TD\n  A --> B --> C\n  A & B --> D\n").unwrap();
        let pairs: Vec<(&str, &str)> = chart
            .links
            .iter()
            .map(|l| (l.from.as_str(), l.to.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "B"), ("B", "C"), ("A", "D"), ("B", "D")]);
    }

    #[test]
    fn test_ignores_styling_comments_and_subgraphs() {
        let input = "%%{init: {'theme': 'dark'}}%%\ngraph TD\n  %% a comment; with semicolon\n  \
                     subgraph api [API layer]\n    A --> B\n  end\n  classDef hot fill:#f00\n  \
                     class A hot\n  style B stroke:#333\n  A:::hot --> C\n";
        let chart = parse_flowchart(input).unwrap();
        assert_eq!(chart.nodes.len(), 3);
        assert_eq!(chart.links.len(), 2);
    }

    #[test]
    fn test_strips_markdown_fences() {
        let chart = parse_flowchart("```mermaid\ngraph TD\n  A --> B\n```\n").unwrap();
        assert_eq!(chart.nodes.len(), 2);
    }

    #[test]
    fn test_br_tags_flatten_into_spaces() {
        let chart = parse_flowchart("graph TD\n  A[\"first<br/>second\"]\n").unwrap();
        assert_eq!(chart.nodes[0].label, "first second");
    }

    #[test]
    fn test_unknown_diagram_type_is_unsupported() {
        let err = parse_flowchart("sequenceDiagram\n  Alice->>Bob: Hi\n").unwrap_err();
        assert_eq!(
            err,
            RenderError::Unsupported {
                kind: "sequenceDiagram".into()
            }
        );
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse_flowchart("graph TD\n  A --> B\n  A -- B\n").unwrap_err();
        assert_eq!(
            err,
            RenderError::Syntax {
                line: 3,
                statement: "A -- B".into()
            }
        );
    }

    #[test]
    fn test_empty_input_is_empty() {
        assert_eq!(parse_flowchart("  \n %% nothing\n").unwrap_err(), RenderError::Empty);
    }

    #[test]
    fn test_hyphenated_ids() {
        let chart = parse_flowchart("graph TD\n  my-node-->other-node\n  my-node -.-> x-1\n").unwrap();
        let ids: Vec<&str> = chart.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["my-node", "other-node", "x-1"]);
        assert_eq!(chart.links[1].stroke, Stroke::Dotted);
    }

    #[test]
    fn test_labels_cannot_carry_control_chars() {
        let chart =
            parse_flowchart("graph TD\n  A[\"x\u{1b}[2Jy\"] -->|\u{202E}rtl| B\n").unwrap();
        assert_eq!(chart.nodes[0].label, "x\\u{1b}[2Jy");
        assert_eq!(chart.links[0].label.as_deref(), Some("\\u{202e}rtl"));
    }
}
