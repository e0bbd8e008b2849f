use crate::config::{Config, LayoutAlgorithm, load_config};
use crate::controller::MindMapController;
use crate::generator::{GeneratedContent, ScriptedGenerator};
use crate::ir::{NodeId, OutlineNode};
use crate::parser::parse_response;
use crate::scene::{SceneDump, write_scene_dump};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "mindtree", version, about = "Lay out a mind map and dump its render scene")]
pub struct Args {
    /// Root topic. Optional when the outline has a single top-level entry.
    #[arg(short = 't', long = "topic")]
    pub topic: Option<String>,

    /// Outline file (indented list, mind-map text or JSON) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the JSON scene. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Layout algorithm, overrides the config file
    #[arg(short = 'a', long = "algorithm", value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Collapse the first node with this label (repeatable)
    #[arg(long = "collapse")]
    pub collapse: Vec<String>,

    /// Expand the first node with this label through the response table
    /// (repeatable)
    #[arg(long = "expand")]
    pub expand: Vec<String>,

    /// JSON object mapping labels to canned generation responses
    #[arg(short = 'r', long = "responses")]
    pub responses: Option<PathBuf>,

    /// Screen width used to fit the view
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Screen height used to fit the view
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmArg {
    TopDown,
    Radial,
    Balanced,
}

impl From<AlgorithmArg> for LayoutAlgorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::TopDown => LayoutAlgorithm::TopDown,
            AlgorithmArg::Radial => LayoutAlgorithm::Radial,
            AlgorithmArg::Balanced => LayoutAlgorithm::Balanced,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(algorithm) = args.algorithm {
        config.layout.algorithm = algorithm.into();
    }

    let outline = match args.input.as_deref() {
        Some(path) => parse_response(&read_input(path)?),
        None => Vec::new(),
    };
    let generator = match args.responses.as_deref() {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading responses from {}", path.display()))?;
            ScriptedGenerator::from_json(&contents)?
        }
        None => ScriptedGenerator::new(),
    };

    let mut map = build_map(&args, config, outline, generator)?;
    map.fit_view(args.width, args.height);
    let dump = SceneDump::new(map.scene(), map.viewport(), args.width, args.height);
    write_scene_dump(&dump, args.output.as_deref())
}

/// Seed, expand and collapse as requested. Layout runs once at the end.
fn build_map(
    args: &Args,
    config: Config,
    outline: Vec<OutlineNode>,
    generator: ScriptedGenerator,
) -> Result<MindMapController> {
    let (topic, outline) = resolve_topic(args.topic.as_deref(), outline)?;
    let mut map = MindMapController::new(&topic, config)?;
    map.begin_batch();
    if !outline.is_empty() {
        map.seed_outline(&outline)?;
    }

    // an unlisted label gets the fallback labels
    let mut generator = generator.otherwise(GeneratedContent::Labels(Vec::new()));
    for label in &args.expand {
        let id = node_by_label(&map, label)?;
        match map.expand_with(id.as_str(), &mut generator) {
            Ok(_) => {}
            Err(err) if !err.is_fatal() => warn!(label = %label, error = %err, "expand failed"),
            Err(err) => return Err(err.into()),
        }
    }
    for label in &args.collapse {
        let id = node_by_label(&map, label)?;
        map.set_collapsed(id.as_str(), true)?;
    }
    map.commit()?;
    Ok(map)
}

/// Pick the root label. Without `--topic` the outline must have exactly one
/// top-level entry, which becomes the root. With it, an outline whose only
/// entry repeats the topic is unwrapped.
fn resolve_topic(
    topic: Option<&str>,
    mut outline: Vec<OutlineNode>,
) -> Result<(String, Vec<OutlineNode>)> {
    let single_entry = outline.len() == 1;
    match topic {
        Some(topic) => {
            if single_entry && outline[0].label.trim() == topic.trim() {
                let entry = outline.remove(0);
                return Ok((topic.to_string(), entry.children));
            }
            Ok((topic.to_string(), outline))
        }
        None if single_entry => {
            let entry = outline.remove(0);
            Ok((entry.label, entry.children))
        }
        None if outline.is_empty() => Err(anyhow::anyhow!(
            "Nothing to lay out: pass --topic or an outline with --input"
        )),
        None => Err(anyhow::anyhow!(
            "Outline has {} top-level entries; pass --topic to name the root",
            outline.len()
        )),
    }
}

fn node_by_label(map: &MindMapController, label: &str) -> Result<NodeId> {
    map.find_by_label(label)
        .map(|node| node.id.clone())
        .ok_or_else(|| anyhow::anyhow!("No node labeled `{}`", label))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading outline {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_outline;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["mindtree"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parses_flags() {
        let args = args(&[
            "--topic", "Python", "-a", "radial", "--collapse", "OOP", "--collapse", "Basics",
        ]);
        assert_eq!(args.topic.as_deref(), Some("Python"));
        assert_eq!(args.algorithm, Some(AlgorithmArg::Radial));
        assert_eq!(args.collapse, vec!["OOP", "Basics"]);
        assert_eq!(args.width, 1200.0);
    }

    #[test]
    fn single_outline_entry_becomes_root() {
        let outline = parse_outline("Python\n  Basics\n  OOP\n");
        let (topic, rest) = resolve_topic(None, outline).unwrap();
        assert_eq!(topic, "Python");
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn topic_matching_the_outline_root_is_unwrapped() {
        let outline = parse_outline("Python\n  Basics\n");
        let (_, rest) = resolve_topic(Some("Python"), outline).unwrap();
        assert_eq!(rest[0].label, "Basics");
    }

    #[test]
    fn several_roots_need_a_topic() {
        let outline = parse_outline("- Basics\n- OOP\n");
        assert!(resolve_topic(None, outline.clone()).is_err());
        let (topic, rest) = resolve_topic(Some("Python"), outline).unwrap();
        assert_eq!(topic, "Python");
        assert_eq!(rest.len(), 2);
        assert!(resolve_topic(None, Vec::new()).is_err());
    }

    #[test]
    fn build_map_expands_and_collapses() {
        let args = args(&["--topic", "Python", "--expand", "OOP", "--collapse", "Basics"]);
        let outline = parse_outline("- Basics\n  - Syntax\n- OOP\n");
        let generator = ScriptedGenerator::new().with_labels("OOP", &["Classes", "Mixins"]);
        let map = build_map(&args, Config::default(), outline, generator).unwrap();
        let oop = map.find_by_label("OOP").unwrap();
        assert_eq!(oop.children.len(), 2);
        let basics = map.find_by_label("Basics").unwrap();
        assert!(basics.collapsed);
        assert!(map.scene().node(basics.children[0].id.as_str()).is_none());
        assert!(map.scene().node(oop.children[0].id.as_str()).is_some());
    }

    #[test]
    fn unknown_expand_label_is_an_error() {
        let args = args(&["--topic", "Python", "--expand", "Nope"]);
        let result = build_map(&args, Config::default(), Vec::new(), ScriptedGenerator::new());
        assert!(result.is_err());
    }

    #[test]
    fn expand_without_response_uses_fallback() {
        let args = args(&["--topic", "Python", "--expand", "Python"]);
        let map =
            build_map(&args, Config::default(), Vec::new(), ScriptedGenerator::new()).unwrap();
        assert_eq!(
            map.root().children.len(),
            Config::default().generation.fallback_labels.len()
        );
    }
}
