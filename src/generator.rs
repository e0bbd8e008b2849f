use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::GenerationConfig;
use crate::ir::{NodeId, OutlineNode};
use crate::parser::{outline_from_json, parse_response, strip_quotes};

/// What the text-generation collaborator is asked for when a node is
/// expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub node_id: NodeId,
    pub label: String,
    /// Label of the map root.
    pub topic: String,
    /// Labels from the root down to the node, both ends included.
    pub path: Vec<String>,
    pub max_children: usize,
}

impl GenerationRequest {
    /// `Python > OOP > Classes`, handy as a prompt context line.
    pub fn context(&self) -> String {
        self.path.join(" > ")
    }
}

/// Collaborator answer before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedContent {
    Labels(Vec<String>),
    Outline(Vec<OutlineNode>),
    /// Free-form text, parsed tolerantly.
    Raw(String),
}

impl GeneratedContent {
    pub fn into_outline(self) -> Vec<OutlineNode> {
        match self {
            Self::Labels(labels) => labels.into_iter().map(OutlineNode::leaf).collect(),
            Self::Outline(outline) => outline,
            Self::Raw(text) => parse_response(&text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("no response available for `{0}`")]
    NoResponse(String),
}

/// External text-generation collaborator. The call may take a while; the
/// controller keeps the tree usable in the meantime through tickets.
pub trait TextGenerator {
    fn generate(
        &mut self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, GeneratorError>;
}

impl<G: TextGenerator + ?Sized> TextGenerator for &mut G {
    fn generate(
        &mut self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, GeneratorError> {
        (**self).generate(request)
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate(
        &mut self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, GeneratorError> {
        (**self).generate(request)
    }
}

/// Clean one label: control characters become spaces, invisible and
/// replacement characters go away, quotes and trailing punctuation are
/// stripped, whitespace collapses, and the result is capped at
/// `max_chars` characters.
pub fn sanitize_label(raw: &str, max_chars: usize) -> Option<String> {
    let visible: String = raw
        .chars()
        .filter_map(|ch| match ch {
            '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{FFFD}' | '\u{00AD}' => None,
            ch if ch.is_control() => Some(' '),
            ch => Some(ch),
        })
        .collect();
    let collapsed = visible.split_whitespace().collect::<Vec<_>>().join(" ");
    let unquoted = strip_quotes(&collapsed);
    let label = unquoted.trim_end_matches([':', ';', ',']).trim();
    if label.is_empty() {
        return None;
    }
    if max_chars > 0 && label.chars().count() > max_chars {
        let cut: String = label.chars().take(max_chars).collect();
        return Some(cut.trim_end().to_string());
    }
    Some(label.to_string())
}

/// Case and whitespace insensitive form of a label, used for sibling
/// deduplication and cache lookups.
pub fn label_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Turn a collaborator answer into an insertable outline: parse raw text,
/// unwrap a single entry that merely repeats `echo` (the expanded node's
/// label), sanitize labels, drop empties and duplicate siblings, and cap
/// width and depth.
pub fn normalize(
    content: GeneratedContent,
    config: &GenerationConfig,
    echo: Option<&str>,
) -> Vec<OutlineNode> {
    let mut outline = content.into_outline();
    if let Some(echo) = echo {
        let echo_key = label_key(echo);
        if outline.len() == 1 && label_key(&outline[0].label) == echo_key {
            outline = outline.remove(0).children;
        } else {
            outline.retain(|entry| label_key(&entry.label) != echo_key);
        }
    }
    tidy(outline, config, 1)
}

fn tidy(entries: Vec<OutlineNode>, config: &GenerationConfig, depth: usize) -> Vec<OutlineNode> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in entries {
        if out.len() >= config.max_children {
            break;
        }
        let Some(label) = sanitize_label(&entry.label, config.max_label_chars) else {
            continue;
        };
        if !seen.insert(label_key(&label)) {
            continue;
        }
        let children = if depth < config.max_outline_depth {
            tidy(entry.children, config, depth + 1)
        } else {
            Vec::new()
        };
        out.push(OutlineNode {
            label,
            shape: entry.shape,
            children,
        });
    }
    out
}

/// The configured default labels, cleaned the same way as a response.
pub fn fallback_outline(config: &GenerationConfig) -> Vec<OutlineNode> {
    tidy(
        config
            .fallback_labels
            .iter()
            .map(OutlineNode::leaf)
            .collect(),
        config,
        1,
    )
}

/// Normalized responses keyed by node label.
#[derive(Debug, Clone, Default)]
pub struct GenerationCache {
    entries: HashMap<String, Vec<OutlineNode>>,
}

impl GenerationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: &str) -> Option<&[OutlineNode]> {
        self.entries.get(&label_key(label)).map(Vec::as_slice)
    }

    pub fn insert(&mut self, label: &str, outline: Vec<OutlineNode>) {
        self.entries.insert(label_key(label), outline);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Content(GeneratedContent),
    Fail(String),
}

/// Canned collaborator: answers by node label, for tests and offline CLI
/// runs.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    replies: HashMap<String, Reply>,
    otherwise: Option<Reply>,
    calls: Vec<String>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load replies from a JSON object mapping labels to either raw text or
    /// a JSON outline. The `"*"` key answers every other label.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let table: BTreeMap<String, Value> = serde_json::from_str(contents)?;
        let mut generator = Self::new();
        for (label, value) in table {
            let content = match value {
                Value::String(text) => GeneratedContent::Raw(text),
                other => GeneratedContent::Outline(outline_from_json(&other)),
            };
            generator = if label == "*" {
                generator.otherwise(content)
            } else {
                generator.with_reply(&label, content)
            };
        }
        Ok(generator)
    }

    pub fn with_reply(mut self, label: &str, content: GeneratedContent) -> Self {
        self.replies.insert(label_key(label), Reply::Content(content));
        self
    }

    pub fn with_labels(self, label: &str, labels: &[&str]) -> Self {
        let labels = labels.iter().map(|label| label.to_string()).collect();
        self.with_reply(label, GeneratedContent::Labels(labels))
    }

    pub fn with_raw(self, label: &str, text: &str) -> Self {
        self.with_reply(label, GeneratedContent::Raw(text.to_string()))
    }

    pub fn failing(mut self, label: &str, message: &str) -> Self {
        self.replies
            .insert(label_key(label), Reply::Fail(message.to_string()));
        self
    }

    pub fn otherwise(mut self, content: GeneratedContent) -> Self {
        self.otherwise = Some(Reply::Content(content));
        self
    }

    /// Labels this generator was asked about, in call order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(
        &mut self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, GeneratorError> {
        self.calls.push(request.label.clone());
        let reply = self
            .replies
            .get(&label_key(&request.label))
            .or(self.otherwise.as_ref());
        match reply {
            Some(Reply::Content(content)) => Ok(content.clone()),
            Some(Reply::Fail(message)) => Err(GeneratorError::Request(message.clone())),
            None => Err(GeneratorError::NoResponse(request.label.clone())),
        }
    }
}
