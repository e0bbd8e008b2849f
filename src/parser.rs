use crate::ir::{NodeShape, OutlineNode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*+•‣◦▪]|\d{1,3}[.)]|\(\d{1,3}\))\s+").unwrap());
static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s+").unwrap());
static EMPHASIS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*|__|`").unwrap());

const LABEL_KEYS: [&str; 5] = ["label", "text", "title", "name", "topic"];
const CHILDREN_KEYS: [&str; 4] = ["children", "subtopics", "items", "nodes"];

/// Parse a free-form generation response into an outline.
///
/// JSON (strict, then JSON5) is tried first; anything else is read as an
/// indented list. Nothing here fails: unusable input yields an empty
/// outline and the caller decides what to fall back to.
pub fn parse_response(input: &str) -> Vec<OutlineNode> {
    let body = strip_code_fences(input);
    let trimmed = body.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') || trimmed.starts_with('"') {
        let value = serde_json::from_str::<Value>(trimmed)
            .ok()
            .or_else(|| json5::from_str::<Value>(trimmed).ok());
        if let Some(value) = value {
            return outline_from_json(&value);
        }
    }
    parse_outline(&body)
}

/// Outline from a JSON value: an array of strings or `{label, children}`
/// objects, or a single object whose children are the answer.
pub fn outline_from_json(value: &Value) -> Vec<OutlineNode> {
    match value {
        Value::Array(items) => items.iter().filter_map(node_from_json).collect(),
        Value::Object(_) => match node_from_json(value) {
            Some(node) if !node.children.is_empty() => node.children,
            Some(node) => vec![node],
            None => children_from_json(value),
        },
        Value::String(_) => node_from_json(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn node_from_json(value: &Value) -> Option<OutlineNode> {
    match value {
        Value::String(text) => Some(OutlineNode::leaf(text.clone())),
        Value::Object(map) => {
            let label = LABEL_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))?;
            let shape = map
                .get("shape")
                .and_then(|shape| serde_json::from_value::<NodeShape>(shape.clone()).ok())
                .unwrap_or_default();
            Some(OutlineNode {
                label: label.to_string(),
                shape,
                children: children_from_json(value),
            })
        }
        _ => None,
    }
}

fn children_from_json(value: &Value) -> Vec<OutlineNode> {
    let Value::Object(map) = value else {
        return Vec::new();
    };
    CHILDREN_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array))
        .map(|items| items.iter().filter_map(node_from_json).collect())
        .unwrap_or_default()
}

/// Indented-list outline. Indentation decides nesting; list markers,
/// headings, emphasis and a leading `mindmap` keyword are dropped, and
/// mind-map shape brackets set the node shape.
pub fn parse_outline(input: &str) -> Vec<OutlineNode> {
    let lines: Vec<&str> = input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with("```") && !trimmed.starts_with("%%")
        })
        .collect();

    if lines.len() == 1 && lines[0].contains(',') {
        return lines[0]
            .split(',')
            .map(|part| clean_line(part).0)
            .filter(|label| !label.is_empty())
            .map(OutlineNode::leaf)
            .collect();
    }

    let has_bullets = lines
        .iter()
        .any(|line| BULLET_RE.is_match(line.trim_start()));

    let mut flat: Vec<(usize, OutlineNode)> = Vec::new();
    for (idx, raw_line) in lines.iter().enumerate() {
        let trimmed = raw_line.trim();
        if idx == 0 && trimmed.eq_ignore_ascii_case("mindmap") {
            continue;
        }
        let (text, bulleted) = clean_line(trimmed);
        if has_bullets && !bulleted && text.ends_with(':') {
            // chatter such as "Here are some ideas:" around a list
            continue;
        }
        let (label, shape) = parse_shape_token(&text);
        if label.trim().is_empty() {
            continue;
        }
        flat.push((
            count_indent(raw_line),
            OutlineNode::leaf(label).with_shape(shape),
        ));
    }
    nest(flat)
}

fn nest(flat: Vec<(usize, OutlineNode)>) -> Vec<OutlineNode> {
    let mut roots: Vec<OutlineNode> = Vec::new();
    let mut stack: Vec<(usize, OutlineNode)> = Vec::new();
    for (indent, node) in flat {
        while stack.last().is_some_and(|(top, _)| *top >= indent) {
            close_top(&mut stack, &mut roots);
        }
        stack.push((indent, node));
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }
    roots
}

fn close_top(stack: &mut Vec<(usize, OutlineNode)>, roots: &mut Vec<OutlineNode>) {
    let Some((_, done)) = stack.pop() else {
        return;
    };
    match stack.last_mut() {
        Some((_, parent)) => parent.children.push(done),
        None => roots.push(done),
    }
}

/// Strip list markers, headings and emphasis. The flag tells whether a
/// list marker was present.
fn clean_line(line: &str) -> (String, bool) {
    let trimmed = line.trim();
    let without_heading = HEADING_RE.replace(trimmed, "");
    let bulleted = BULLET_RE.is_match(&without_heading);
    let without_bullet = BULLET_RE.replace(&without_heading, "");
    let text = EMPHASIS_RE.replace_all(&without_bullet, "");
    (text.trim().to_string(), bulleted)
}

fn strip_code_fences(input: &str) -> String {
    input
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `id((label))`, `((label))`, `[label]`, `(label)`, `{{label}}`,
/// `)label(` and `))label((` as in mermaid mind maps.
fn parse_shape_token(token: &str) -> (String, NodeShape) {
    let trimmed = token.trim();
    let shape_start = trimmed.find(['[', '(', '{', ')']).unwrap_or(0);
    if shape_start > 0 && !trimmed[..shape_start].contains(' ') {
        if let Some(parsed) = parse_shape(&trimmed[shape_start..]) {
            return parsed;
        }
    } else if let Some(parsed) = parse_shape(trimmed) {
        return parsed;
    }
    (strip_quotes(trimmed), NodeShape::Default)
}

fn parse_shape(raw: &str) -> Option<(String, NodeShape)> {
    let trimmed = raw.trim();
    let wrapped = |open: &str, close: &str| {
        trimmed.len() >= open.len() + close.len()
            && trimmed.starts_with(open)
            && trimmed.ends_with(close)
    };
    let inner = |open: usize, close: usize| strip_quotes(&trimmed[open..trimmed.len() - close]);
    if wrapped("((", "))") {
        return Some((inner(2, 2), NodeShape::Circle));
    }
    if wrapped("))", "((") {
        return Some((inner(2, 2), NodeShape::Bang));
    }
    if wrapped("{{", "}}") {
        return Some((inner(2, 2), NodeShape::Hexagon));
    }
    if wrapped("[", "]") {
        return Some((inner(1, 1), NodeShape::Rectangle));
    }
    if wrapped("(", ")") {
        return Some((inner(1, 1), NodeShape::RoundRect));
    }
    if wrapped(")", "(") {
        return Some((inner(1, 1), NodeShape::Cloud));
    }
    None
}

pub(crate) fn strip_quotes(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

fn count_indent(line: &str) -> usize {
    let mut count = 0;
    for ch in line.chars() {
        match ch {
            ' ' => count += 1,
            '\t' => count += 2,
            _ => break,
        }
    }
    count
}
