use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::store::DEFAULT_MAX_DEPTH;

const DEFAULT_FALLBACK_LABELS: [&str; 5] = [
    "Overview",
    "Key Concepts",
    "Examples",
    "Applications",
    "Further Reading",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutAlgorithm {
    /// Centered layered tree, root on top.
    #[default]
    TopDown,
    /// Depth as radius, subtree width as angular share.
    Radial,
    /// Root in the middle, first-level branches alternating right and left.
    Balanced,
}

impl LayoutAlgorithm {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "top-down" | "topdown" | "td" | "tree" => Some(Self::TopDown),
            "radial" | "circle" => Some(Self::Radial),
            "balanced" | "lr" | "mindmap" => Some(Self::Balanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub algorithm: LayoutAlgorithm,
    pub node_width: f32,
    pub node_height: f32,
    pub half_gap: f32,
    pub level_height: f32,
    pub rank_gap: f32,
    /// Deepest level below the root. Inserts past it are refused.
    pub max_depth: usize,
}

impl LayoutConfig {
    /// Horizontal room a single collapsed or childless node takes.
    pub fn footprint(&self) -> f32 {
        self.node_width + self.half_gap
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            algorithm: LayoutAlgorithm::TopDown,
            node_width: 150.0,
            node_height: 44.0,
            half_gap: 20.0,
            level_height: 120.0,
            rank_gap: 60.0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub fallback_labels: Vec<String>,
    pub max_children: usize,
    pub max_label_chars: usize,
    pub max_outline_depth: usize,
    pub cache_responses: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            fallback_labels: DEFAULT_FALLBACK_LABELS
                .iter()
                .map(|value| value.to_string())
                .collect(),
            max_children: 8,
            max_label_chars: 60,
            max_outline_depth: 3,
            cache_responses: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    pub zoom_step: f32,
    pub fit_padding: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 5.0,
            zoom_step: 1.1,
            fit_padding: 40.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub layout: LayoutConfig,
    pub generation: GenerationConfig,
    pub viewport: ViewportConfig,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let layout = &self.layout;
        for (name, value) in [
            ("layout.nodeWidth", layout.node_width),
            ("layout.nodeHeight", layout.node_height),
            ("layout.levelHeight", layout.level_height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                anyhow::bail!("{name} must be a positive number, got {value}");
            }
        }
        for (name, value) in [
            ("layout.halfGap", layout.half_gap),
            ("layout.rankGap", layout.rank_gap),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                anyhow::bail!("{name} must not be negative, got {value}");
            }
        }
        if layout.max_depth == 0 {
            anyhow::bail!("layout.maxDepth must be at least 1");
        }
        let viewport = &self.viewport;
        if !(viewport.min_scale > 0.0 && viewport.min_scale <= viewport.max_scale) {
            anyhow::bail!(
                "viewport scale limits are invalid: min {} max {}",
                viewport.min_scale,
                viewport.max_scale
            );
        }
        if !(viewport.zoom_step.is_finite() && viewport.zoom_step > 1.0) {
            anyhow::bail!("viewport.zoomStep must be greater than 1, got {}", viewport.zoom_step);
        }
        if self.generation.max_children == 0 {
            anyhow::bail!("generation.maxChildren must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    algorithm: Option<String>,
    node_width: Option<f32>,
    node_height: Option<f32>,
    half_gap: Option<f32>,
    level_height: Option<f32>,
    rank_gap: Option<f32>,
    max_depth: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigFile {
    fallback_labels: Option<Vec<String>>,
    max_children: Option<usize>,
    max_label_chars: Option<usize>,
    max_outline_depth: Option<usize>,
    cache_responses: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ViewportConfigFile {
    min_scale: Option<f32>,
    max_scale: Option<f32>,
    zoom_step: Option<f32>,
    fit_padding: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfigFile>,
    generation: Option<GenerationConfigFile>,
    viewport: Option<ViewportConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse a JSON5 (or plain JSON) config document. Missing keys keep their
/// defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.algorithm {
            config.layout.algorithm = LayoutAlgorithm::from_token(&v)
                .ok_or_else(|| anyhow::anyhow!("unknown layout algorithm `{v}`"))?;
        }
        if let Some(v) = layout.node_width {
            config.layout.node_width = v;
        }
        if let Some(v) = layout.node_height {
            config.layout.node_height = v;
        }
        if let Some(v) = layout.half_gap {
            config.layout.half_gap = v;
        }
        if let Some(v) = layout.level_height {
            config.layout.level_height = v;
        }
        if let Some(v) = layout.rank_gap {
            config.layout.rank_gap = v;
        }
        if let Some(v) = layout.max_depth {
            config.layout.max_depth = v;
        }
    }

    if let Some(generation) = parsed.generation {
        if let Some(v) = generation.fallback_labels {
            config.generation.fallback_labels = v;
        }
        if let Some(v) = generation.max_children {
            config.generation.max_children = v;
        }
        if let Some(v) = generation.max_label_chars {
            config.generation.max_label_chars = v;
        }
        if let Some(v) = generation.max_outline_depth {
            config.generation.max_outline_depth = v;
        }
        if let Some(v) = generation.cache_responses {
            config.generation.cache_responses = v;
        }
    }

    if let Some(viewport) = parsed.viewport {
        if let Some(v) = viewport.min_scale {
            config.viewport.min_scale = v;
        }
        if let Some(v) = viewport.max_scale {
            config.viewport.max_scale = v;
        }
        if let Some(v) = viewport.zoom_step {
            config.viewport.zoom_step = v;
        }
        if let Some(v) = viewport.fit_padding {
            config.viewport.fit_padding = v;
        }
    }

    config.validate()?;
    Ok(config)
}
