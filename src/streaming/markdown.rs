//! Markdown rendering of (possibly partial) research reports
//!
//! Rendering is a pure function of the snapshot and emits blocks in a fixed
//! order: title, executive summary, sections (with their subsections), key
//! takeaways. Absent or empty fields contribute nothing. Because the order is
//! fixed, a snapshot that only adds fields renders to an extension of the
//! previous rendering, which is what lets [`MarkdownStreamer`] send deltas.
//!
//! [`MarkdownStreamer`]: crate::streaming::MarkdownStreamer

use serde_json::{Map, Value};

use crate::research::ResearchReport;

/// Heading level used for top-level sections
const SECTION_LEVEL: usize = 2;

/// One point-in-time value of an output still being produced
#[derive(Debug, Clone, PartialEq)]
pub enum PartialReport {
    /// A complete, validated report
    Full(ResearchReport),
    /// Fields of a report recovered from incomplete output
    RawDict(Map<String, Value>),
    /// Free text (chat mode), rendered verbatim
    RawText(String),
}

impl PartialReport {
    pub fn render(&self) -> String {
        render_markdown(self)
    }
}

/// Render a snapshot as markdown
pub fn render_markdown(snapshot: &PartialReport) -> String {
    match snapshot {
        PartialReport::Full(report) => match serde_json::to_value(report) {
            Ok(Value::Object(map)) => render_dict(&map),
            _ => String::new(),
        },
        PartialReport::RawDict(map) => render_dict(map),
        PartialReport::RawText(text) => text.clone(),
    }
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn non_empty_array<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    map.get(key)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
}

fn render_dict(report: &Map<String, Value>) -> String {
    let mut md = String::new();

    if let Some(title) = non_empty_str(report, "title") {
        md.push_str(&format!("# {}\n\n", title));
    }

    if let Some(summary) = non_empty_str(report, "executive_summary") {
        md.push_str(&format!("## Executive Summary\n\n{}\n\n", summary));
    }

    if let Some(sections) = non_empty_array(report, "sections") {
        for section in sections.iter().filter_map(Value::as_object) {
            render_section(section, SECTION_LEVEL, &mut md);
        }
    }

    if let Some(takeaways) = non_empty_array(report, "key_takeaways") {
        md.push_str("## Key Takeaways\n\n");
        for (i, takeaway) in takeaways.iter().enumerate() {
            md.push_str(&format!("{}. {}\n", i + 1, display_item(takeaway)));
        }
    }

    md
}

fn render_section(section: &Map<String, Value>, level: usize, md: &mut String) {
    if let Some(title) = non_empty_str(section, "title") {
        md.push_str(&format!("{} {}\n\n", "#".repeat(level), title));
    }

    if let Some(content) = non_empty_str(section, "content") {
        md.push_str(&format!("{}\n\n", content));
    }

    if let Some(subsections) = non_empty_array(section, "subsections") {
        for subsection in subsections.iter().filter_map(Value::as_object) {
            render_section(subsection, (level + 1).min(6), md);
        }
    }
}

fn display_item(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::Section;
    use rstest::rstest;
    use serde_json::json;

    fn dict(value: Value) -> PartialReport {
        match value {
            Value::Object(map) => PartialReport::RawDict(map),
            _ => panic!("expected object"),
        }
    }

    fn sample_report() -> ResearchReport {
        ResearchReport {
            title: "Battery Outlook".to_string(),
            executive_summary: "Costs keep falling.".to_string(),
            sections: vec![Section {
                title: "Chemistry".to_string(),
                content: "LFP dominates.".to_string(),
                subsections: vec![Section {
                    title: "Sodium".to_string(),
                    content: "Early but promising.".to_string(),
                    subsections: Vec::new(),
                }],
            }],
            key_takeaways: vec!["Cheaper".to_string(), "Safer".to_string()],
        }
    }

    #[test]
    fn test_full_report_rendering() {
        let md = render_markdown(&PartialReport::Full(sample_report()));
        assert_eq!(
            md,
            "# Battery Outlook\n\n\
             ## Executive Summary\n\nCosts keep falling.\n\n\
             ## Chemistry\n\nLFP dominates.\n\n\
             ### Sodium\n\nEarly but promising.\n\n\
             ## Key Takeaways\n\n1. Cheaper\n2. Safer\n"
        );
    }

    #[test]
    fn test_full_and_dict_render_identically() {
        let report = sample_report();
        let as_dict = dict(serde_json::to_value(&report).unwrap());
        assert_eq!(
            render_markdown(&PartialReport::Full(report)),
            render_markdown(&as_dict)
        );
    }

    #[rstest]
    #[case(json!({}), "")]
    #[case(json!({"title": ""}), "")]
    #[case(json!({"title": "T"}), "# T\n\n")]
    #[case(json!({"executive_summary": "E"}), "## Executive Summary\n\nE\n\n")]
    #[case(json!({"sections": []}), "")]
    #[case(json!({"sections": [{"title": "S"}]}), "## S\n\n")]
    #[case(json!({"sections": [{"content": "body"}]}), "body\n\n")]
    #[case(json!({"sections": ["not a dict", {"title": "S"}]}), "## S\n\n")]
    #[case(json!({"key_takeaways": []}), "")]
    #[case(json!({"key_takeaways": ["a"]}), "## Key Takeaways\n\n1. a\n")]
    fn test_partial_fields(#[case] snapshot: Value, #[case] expected: &str) {
        assert_eq!(render_markdown(&dict(snapshot)), expected);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let snapshot = dict(json!({"title": "T", "sections": [{"title": "A", "content": "x"}]}));
        assert_eq!(render_markdown(&snapshot), render_markdown(&snapshot));
    }

    #[test]
    fn test_growth_preserves_prefix() {
        let stages = [
            json!({"title": "T"}),
            json!({"title": "T", "executive_summary": "E"}),
            json!({"title": "T", "executive_summary": "E", "sections": [{"title": "A"}]}),
            json!({"title": "T", "executive_summary": "E", "sections": [{"title": "A", "content": "a"}]}),
            json!({"title": "T", "executive_summary": "E", "sections": [{"title": "A", "content": "a", "subsections": [{"title": "A1"}]}]}),
            json!({"title": "T", "executive_summary": "E", "sections": [{"title": "A", "content": "a", "subsections": [{"title": "A1"}]}, {"title": "B"}]}),
            json!({"title": "T", "executive_summary": "E", "sections": [{"title": "A", "content": "a", "subsections": [{"title": "A1"}]}, {"title": "B"}], "key_takeaways": ["k1"]}),
            json!({"title": "T", "executive_summary": "E", "sections": [{"title": "A", "content": "a", "subsections": [{"title": "A1"}]}, {"title": "B"}], "key_takeaways": ["k1", "k2"]}),
        ];

        let renderings: Vec<String> = stages
            .iter()
            .cloned()
            .map(|s| render_markdown(&dict(s)))
            .collect();

        for pair in renderings.windows(2) {
            assert!(
                pair[1].starts_with(&pair[0]),
                "{:?} is not a prefix of {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_raw_text_is_verbatim() {
        let text = "2 + 2 = **4**";
        assert_eq!(render_markdown(&PartialReport::RawText(text.to_string())), text);
    }
}
