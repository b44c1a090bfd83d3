//! Character-relationship extraction from stored analysis text.
//!
//! The analysis prompt instructs the model to append a relationship JSON
//! object at the very end of its answer. Recovery is positional: the decodable
//! span runs from the first `{` to the last `}` in the blob, and the text
//! before the first `{` is the readable summary. A `{` inside ordinary prose
//! therefore truncates the readable summary at that point — a known fragility
//! of the stored format, kept so existing records keep rendering the same way.
//!
//! Extraction is pure and recomputed on every read; nothing here touches the
//! store or caches results.

use serde::{Deserialize, Serialize};

/// One directed relationship between two characters.
///
/// No referential integrity with [`RelationshipGraph::nodes`] — an edge may
/// name a character the model forgot to list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Transient graph decoded from a stored summary. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<RelationshipEdge>,
}

/// Whether a graph could be recovered from the blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphStatus {
    Present(RelationshipGraph),
    /// No decodable payload span in the text — an informational state, not an
    /// error.
    Absent,
    /// A span was found but failed structural decode; surfaced as a warning.
    Malformed(String),
}

impl GraphStatus {
    pub fn is_present(&self) -> bool {
        matches!(self, GraphStatus::Present(_))
    }
}

/// Result of splitting a stored summary into prose and graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Text preceding the first `{` (the whole blob when no span exists).
    pub readable_summary: String,
    pub graph: GraphStatus,
}

/// Wire shape of the embedded payload. Missing fields default to empty;
/// edges must be exactly 3-element string arrays.
#[derive(Deserialize)]
struct RawGraph {
    #[serde(default)]
    nodes: Vec<String>,
    #[serde(default)]
    edges: Vec<(String, String, String)>,
}

/// Recover a relationship graph from an arbitrary text blob.
///
/// Never fails: a missing brace yields [`GraphStatus::Absent`] and a decode
/// failure yields [`GraphStatus::Malformed`]. The readable summary is always
/// the prose before the first `{` — even when no graph can be recovered —
/// so a truncated payload never leaks JSON junk into the plain-text view.
pub fn extract_relationships(summary: &str) -> Extraction {
    let start = summary.find('{');
    let end = summary.rfind('}');

    // Prose split is purely positional: everything before the first '{',
    // or the whole blob when there is no '{' at all
    let readable_summary = match start {
        Some(s) => summary[..s].to_string(),
        None => summary.to_string(),
    };

    let graph = match (start, end) {
        (Some(s), Some(e)) if e > s => {
            match serde_json::from_str::<RawGraph>(&summary[s..=e]) {
                Ok(raw) => GraphStatus::Present(RelationshipGraph {
                    nodes: raw.nodes,
                    edges: raw
                        .edges
                        .into_iter()
                        .map(|(source, target, label)| RelationshipEdge { source, target, label })
                        .collect(),
                }),
                Err(e) => GraphStatus::Malformed(e.to_string()),
            }
        }
        // Both braces present but the last '}' precedes the first '{':
        // the decodable span is empty, which is a malformed payload, not
        // a missing one
        (Some(_), Some(_)) => {
            GraphStatus::Malformed("relationship payload span is empty".to_string())
        }
        _ => GraphStatus::Absent,
    };

    Extraction {
        readable_summary,
        graph,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trailing_payload_with_prose_prefix() {
        let summary = r#"Intro text. {"nodes":["A","B"],"edges":[["A","B","friend"]]}"#;
        let extraction = extract_relationships(summary);

        assert_eq!(extraction.readable_summary, "Intro text. ");
        let GraphStatus::Present(graph) = extraction.graph else {
            panic!("expected a graph");
        };
        assert_eq!(graph.nodes, vec!["A", "B"]);
        assert_eq!(
            graph.edges,
            vec![RelationshipEdge {
                source: "A".into(),
                target: "B".into(),
                label: "friend".into(),
            }]
        );
    }

    #[test]
    fn no_braces_returns_absent_with_full_prose() {
        let extraction = extract_relationships("Just a plain summary, nothing else.");
        assert_eq!(extraction.graph, GraphStatus::Absent);
        assert_eq!(
            extraction.readable_summary,
            "Just a plain summary, nothing else."
        );
    }

    #[test]
    fn unbalanced_open_brace_returns_absent() {
        let extraction = extract_relationships(r#"Text then {"nodes": ["A""#);
        assert_eq!(extraction.graph, GraphStatus::Absent);
        // The prose split stays positional even when no graph is recoverable
        assert_eq!(extraction.readable_summary, "Text then ");
    }

    #[test]
    fn truncated_payload_keeps_json_out_of_readable_summary() {
        let extraction = extract_relationships(r#"Intro prose. {"nodes": ["A""#);
        assert_eq!(extraction.graph, GraphStatus::Absent);
        assert_eq!(extraction.readable_summary, "Intro prose. ");
    }

    #[test]
    fn closing_brace_before_opening_is_malformed() {
        // Both braces exist, so a payload was attempted — it just decodes
        // to an empty span
        let extraction = extract_relationships("} stray brace, then { nothing after");
        assert!(matches!(extraction.graph, GraphStatus::Malformed(_)));
        assert_eq!(extraction.readable_summary, "} stray brace, then ");
    }

    #[test]
    fn malformed_json_returns_malformed_not_panic() {
        let extraction = extract_relationships("Summary. {not json at all}");
        assert!(matches!(extraction.graph, GraphStatus::Malformed(_)));
        assert_eq!(extraction.readable_summary, "Summary. ");
    }

    #[test]
    fn wrong_edge_arity_is_malformed() {
        let extraction =
            extract_relationships(r#"{"nodes":["A","B"],"edges":[["A","B"]]}"#);
        assert!(matches!(extraction.graph, GraphStatus::Malformed(_)));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let extraction = extract_relationships(r#"Done. {"nodes":["Hero"]}"#);
        let GraphStatus::Present(graph) = extraction.graph else {
            panic!("expected a graph");
        };
        assert_eq!(graph.nodes, vec!["Hero"]);
        assert!(graph.edges.is_empty());

        let extraction = extract_relationships("{}");
        let GraphStatus::Present(graph) = extraction.graph else {
            panic!("expected a graph");
        };
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn edge_may_reference_unlisted_node() {
        let extraction = extract_relationships(
            r#"{"nodes":["A"],"edges":[["A","Ghost","haunts"]]}"#,
        );
        let GraphStatus::Present(graph) = extraction.graph else {
            panic!("expected a graph");
        };
        assert_eq!(graph.edges[0].target, "Ghost");
        assert!(!graph.nodes.contains(&"Ghost".to_string()));
    }

    #[test]
    fn brace_in_prose_truncates_readable_summary() {
        // Positional split: a '{' inside prose wins over the real payload.
        let summary = r#"The {cursed} manor. {"nodes":["A"],"edges":[]}"#;
        let extraction = extract_relationships(summary);
        assert_eq!(extraction.readable_summary, "The ");
        // The widened span is no longer valid JSON
        assert!(matches!(extraction.graph, GraphStatus::Malformed(_)));
    }

    #[test]
    fn extraction_is_idempotent() {
        let summary = r#"Prose. {"nodes":["A","B"],"edges":[["B","A","rival"]]}"#;
        let first = extract_relationships(summary);
        let second = extract_relationships(summary);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_returns_absent() {
        let extraction = extract_relationships("");
        assert_eq!(extraction.graph, GraphStatus::Absent);
        assert!(extraction.readable_summary.is_empty());
    }

    #[test]
    fn unicode_names_round_trip() {
        let extraction = extract_relationships(
            r#"摘要。 {"nodes":["贾宝玉","林黛玉"],"edges":[["贾宝玉","林黛玉","表兄妹"]]}"#,
        );
        let GraphStatus::Present(graph) = extraction.graph else {
            panic!("expected a graph");
        };
        assert_eq!(graph.nodes[0], "贾宝玉");
        assert_eq!(graph.edges[0].label, "表兄妹");
    }
}
