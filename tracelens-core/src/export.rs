//! Export of a derived view-model set as JSON, Mermaid or Graphviz DOT.
//!
//! Mermaid and DOT render the decision tree with the selected path drawn
//! heavier; JSON carries all four views verbatim.

use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::span::{SpanKind, TraceId};
use crate::views::{ConfidenceBand, DecisionTreeViewModel, ViewModelSet};

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Mermaid,
    Dot,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Mermaid => "mmd",
            Self::Dot => "dot",
        }
    }
}

/// Options for [`export_views`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Also write the artifact here (parent directories are created).
    pub output: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            output: None,
        }
    }
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            output: None,
        }
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub format: ExportFormat,
    pub artifact: String,
    pub output_path: Option<PathBuf>,
}

/// Render a view-model set and optionally write it to disk.
pub fn export_views(views: &ViewModelSet, options: &ExportOptions) -> Result<ExportResult> {
    let artifact = match options.format {
        ExportFormat::Json => serde_json::to_string_pretty(views)?,
        ExportFormat::Mermaid => to_mermaid(&views.decision_tree),
        ExportFormat::Dot => to_dot(views.trace_id.as_ref(), &views.decision_tree),
    };

    let output_path = if let Some(path) = &options.output {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                Error::export(format!(
                    "failed to create output directory '{}': {}",
                    parent.display(),
                    error
                ))
            })?;
        }

        fs::write(path, &artifact).map_err(|error| {
            Error::export(format!(
                "failed to write export to '{}': {}",
                path.display(),
                error
            ))
        })?;
        Some(path.clone())
    } else {
        None
    };

    Ok(ExportResult {
        format: options.format,
        artifact,
        output_path,
    })
}

/// Suggest a default output path for a trace and format.
pub fn suggested_output_path(trace_id: &TraceId, format: ExportFormat) -> PathBuf {
    PathBuf::from(format!("trace-{}.{}", trace_id, format.extension()))
}

/// Decision tree as a Mermaid flowchart.
pub fn to_mermaid(tree: &DecisionTreeViewModel) -> String {
    let mut mermaid = String::from("graph LR\n");

    // Span ids are arbitrary strings; use positional node names.
    let name = |id: &crate::span::SpanId| {
        tree.nodes
            .iter()
            .position(|n| &n.id == id)
            .map(|i| format!("n{}", i))
    };

    for (i, node) in tree.nodes.iter().enumerate() {
        let (open, close) = mermaid_shape(node.kind);
        let label = node.label.replace('"', "'");
        mermaid.push_str(&format!("    n{}{}\"{}\"{}\n", i, open, label, close));
    }

    mermaid.push('\n');

    for edge in &tree.edges {
        let (Some(from), Some(to)) = (name(&edge.from), name(&edge.to)) else {
            continue;
        };
        let arrow = if edge.is_selected { "==>" } else { "-->" };
        mermaid.push_str(&format!("    {} {} {}\n", from, arrow, to));
    }

    let selected: Vec<String> = tree
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_selected)
        .map(|(i, _)| format!("n{}", i))
        .collect();
    if !selected.is_empty() {
        mermaid.push_str("\n    classDef selected fill:#10B981,stroke:#059669,color:#fff\n");
        mermaid.push_str(&format!("    class {} selected\n", selected.join(",")));
    }

    mermaid
}

/// Decision tree as a Graphviz digraph.
pub fn to_dot(trace_id: Option<&TraceId>, tree: &DecisionTreeViewModel) -> String {
    let mut dot = String::new();

    dot.push_str("digraph Trace {\n");
    dot.push_str("    rankdir=LR;\n");
    dot.push_str("    node [fontname=\"Helvetica\", fontsize=12, style=filled];\n");
    dot.push_str("    edge [fontname=\"Helvetica\", fontsize=10];\n");
    if let Some(id) = trace_id {
        dot.push_str(&format!("    // Trace ID: {}\n", id));
    }
    dot.push('\n');

    for (i, node) in tree.nodes.iter().enumerate() {
        let extra = if node.is_selected { ", penwidth=3" } else { "" };
        dot.push_str(&format!(
            "    n{} [label=\"{}\", shape={}, fillcolor=\"{}\"{}];\n",
            i,
            escape_dot_string(&node.label),
            dot_shape(node.kind),
            band_color(node.band),
            extra
        ));
    }

    dot.push('\n');

    for edge in &tree.edges {
        let from = tree.nodes.iter().position(|n| n.id == edge.from);
        let to = tree.nodes.iter().position(|n| n.id == edge.to);
        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };
        let style = if edge.is_selected {
            "color=\"#10B981\", penwidth=3"
        } else {
            "color=\"#D1D5DB\""
        };
        dot.push_str(&format!("    n{} -> n{} [{}];\n", from, to, style));
    }

    dot.push_str("}\n");
    dot
}

fn mermaid_shape(kind: SpanKind) -> (&'static str, &'static str) {
    match kind {
        SpanKind::Thought => ("(", ")"),
        SpanKind::Decision => ("{", "}"),
        SpanKind::Action => ("[", "]"),
        SpanKind::Tool => ("[[", "]]"),
        SpanKind::Memory => ("[(", ")]"),
        SpanKind::Synthesize => ("([", "])"),
        SpanKind::Observation => (">", "]"),
    }
}

fn dot_shape(kind: SpanKind) -> &'static str {
    match kind {
        SpanKind::Thought => "ellipse",
        SpanKind::Decision => "diamond",
        SpanKind::Action => "box",
        SpanKind::Tool => "component",
        SpanKind::Memory => "cylinder",
        SpanKind::Synthesize => "hexagon",
        SpanKind::Observation => "note",
    }
}

fn band_color(band: ConfidenceBand) -> &'static str {
    match band {
        ConfidenceBand::High => "#D1FAE5",
        ConfidenceBand::Medium => "#FEF3C7",
        ConfidenceBand::Low => "#FEE2E2",
    }
}

fn escape_dot_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::pipeline::derive;
    use crate::span::{Span, SpanStatus, Trace};
    use tempfile::tempdir;

    fn views() -> ViewModelSet {
        let trace = Trace::new("tr-7", "agent")
            .with_duration(100)
            .with_span(
                Span::new("root", SpanKind::Decision, "Pick \"best\" plan")
                    .with_timing(0, 100)
                    .with_status(SpanStatus::Completed)
                    .with_confidence(0.9),
            )
            .with_span(
                Span::new("t", SpanKind::Tool, "search")
                    .with_parent("root")
                    .with_timing(10, 20)
                    .with_status(SpanStatus::Completed)
                    .with_confidence(0.5),
            )
            .with_span(
                Span::new("x", SpanKind::Action, "abandoned")
                    .with_parent("root")
                    .with_timing(40, 20)
                    .with_status(SpanStatus::Failed),
            );
        derive(&trace, false, &ViewConfig::default()).views
    }

    #[test]
    fn test_mermaid_marks_selected_path() {
        let result = export_views(&views(), &ExportOptions::new(ExportFormat::Mermaid)).unwrap();
        let mermaid = result.artifact;
        assert!(mermaid.starts_with("graph LR\n"));
        assert!(mermaid.contains("n0{\"Pick 'best' plan\"}"));
        assert!(mermaid.contains("n1[[\"search\"]]"));
        assert!(mermaid.contains("n0 ==> n1"));
        assert!(mermaid.contains("n0 --> n2"));
        assert!(mermaid.contains("class n0,n1 selected"));
        assert!(result.output_path.is_none());
    }

    #[test]
    fn test_dot_escapes_labels() {
        let result = export_views(&views(), &ExportOptions::new(ExportFormat::Dot)).unwrap();
        let dot = result.artifact;
        assert!(dot.starts_with("digraph Trace {"));
        assert!(dot.contains("// Trace ID: tr-7"));
        assert!(dot.contains("label=\"Pick \\\"best\\\" plan\""));
        assert!(dot.contains("n0 -> n1 [color=\"#10B981\", penwidth=3];"));
        assert!(dot.contains("n0 -> n2 [color=\"#D1D5DB\"];"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_json_export_writes_file() {
        let dir = tempdir().expect("tempdir should be created");
        let output = dir.path().join("nested").join("trace.json");
        let options = ExportOptions::new(ExportFormat::Json).with_output(&output);

        let result = export_views(&views(), &options).expect("export should succeed");
        assert_eq!(result.output_path, Some(output.clone()));

        let written = fs::read_to_string(&output).expect("json output should be readable");
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["traceId"], "tr-7");
        assert_eq!(value["decisionTree"]["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(value["waterfall"]["rows"][1]["leftPct"], 10.0);
        assert_eq!(value["treeOfThought"]["levels"][1]["label"], "strategy");
    }

    #[test]
    fn test_empty_set_still_exports() {
        let dot = export_views(&ViewModelSet::empty(), &ExportOptions::new(ExportFormat::Dot))
            .unwrap()
            .artifact;
        assert!(!dot.contains("->"));
        let mermaid = to_mermaid(&DecisionTreeViewModel::default());
        assert_eq!(mermaid, "graph LR\n\n");
    }

    #[test]
    fn test_suggested_output_path_uses_expected_extension() {
        let id = TraceId::from("tr-7");
        assert_eq!(
            suggested_output_path(&id, ExportFormat::Mermaid),
            PathBuf::from("trace-tr-7.mmd")
        );
        assert!(suggested_output_path(&id, ExportFormat::Dot)
            .to_string_lossy()
            .ends_with(".dot"));
    }
}
