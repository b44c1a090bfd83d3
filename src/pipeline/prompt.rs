/// Fixed instruction template for the literary analysis request.
///
/// The trailing relationship JSON must be the very last thing in the answer —
/// the extractor locates it positionally (first `{` to last `}`), so prose
/// after the payload would corrupt the span.
pub const ANALYSIS_INSTRUCTIONS: &str = r#"As a literary analysis expert, read the text below and produce:
1. A summary of the overall meaning of the text.
2. The main plot of the story.
3. A character relationship JSON object, placed strictly at the very end of the answer.

Relationship format template:
{ "nodes": ["Character A"], "edges": [["Character A", "Character B", "relation"]] }
"#;

/// Build the full prompt for one file's content.
pub fn build_analysis_prompt(content: &str) -> String {
    format!("{ANALYSIS_INSTRUCTIONS}\nText:\n{content}")
}
