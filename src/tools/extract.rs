//! HTML to readable text.

use scraper::{ElementRef, Html, Node};

/// Elements whose text never counts as page content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "header", "footer", "aside", "menu"];

/// Extract the readable text of an HTML document.
///
/// Text nodes are trimmed and joined with single spaces; chrome such as
/// navigation, headers, footers and scripts is dropped.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut pieces = Vec::new();
    collect_text(document.root_element(), &mut pieces);
    pieces.join(" ")
}

fn collect_text<'a>(element: ElementRef<'a>, pieces: &mut Vec<&'a str>) {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pieces.push(trimmed);
                }
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, pieces);
                }
            }
            _ => {}
        }
    }
}
