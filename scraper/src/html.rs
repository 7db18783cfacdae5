use select::{document::Document, node::Node, predicate::Name};

/// Convert catalog HTML fragments to plain text.
///
/// List items become `• ` bullets, block-level closing tags end the line and
/// every other tag is dropped. Entities are decoded by the parser.
pub fn html_to_text(html: &str) -> String {
    let document = Document::from(html);
    let mut out = String::new();

    if let Some(body) = document.find(Name("body")).next() {
        for child in body.children() {
            render(&child, &mut out);
        }
    }

    collapse_blank_lines(&out)
}

fn render(node: &Node, out: &mut String) {
    if let Some(text) = node.as_text() {
        out.push_str(text);
        return;
    }

    match node.name() {
        Some("br") => out.push('\n'),
        Some("li") => {
            start_line(out);
            out.push_str("• ");
            render_children(node, out);
            out.push('\n');
        }
        Some("p" | "div" | "ul" | "ol" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
            render_children(node, out);
            out.push('\n');
        }
        _ => render_children(node, out),
    }
}

fn render_children(node: &Node, out: &mut String) {
    for child in node.children() {
        render(&child, out);
    }
}

fn start_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() && lines.last().map_or(true, |last: &&str| last.is_empty()) {
            continue;
        }
        lines.push(if line.trim().is_empty() { "" } else { line });
    }
    lines.join("\n").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_end_lines() {
        assert_eq!(
            html_to_text("<p>Introduction to programming.</p><p>Second paragraph.</p>"),
            "Introduction to programming.\nSecond paragraph."
        );
    }

    #[test]
    fn list_items_become_bullets() {
        let html = "<p>Complete all of:</p><ul><li>CSC110</li><li>MATH100</li></ul>";
        assert_eq!(html_to_text(html), "Complete all of:\n• CSC110\n• MATH100");
    }

    #[test]
    fn inline_tags_and_entities() {
        assert_eq!(
            html_to_text("Take <a href=\"/csc110\"><b>CSC110</b></a> &amp; MATH100"),
            "Take CSC110 & MATH100"
        );
    }

    #[test]
    fn blank_lines_collapse() {
        assert_eq!(
            html_to_text("<div><p>One</p></div><br><br><p>Two</p>"),
            "One\n\nTwo"
        );
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(html_to_text("  no markup here "), "no markup here");
        assert_eq!(html_to_text(""), "");
    }
}
