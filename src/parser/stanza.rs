use super::normalize::EOL_MARKER;

/// Replaces each run of marker-only lines in serialized output.
pub const STANZA_TAG: &str = "<stanza>";

fn is_marker_only(line: &str) -> bool {
    line.trim() == EOL_MARKER
}

/// Collapse every run of marker-only lines into a single stanza tag line.
///
/// Works on rendered text, so it applies equally to one page or to pages
/// already joined with newlines.
pub fn collapse_stanza_markers(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_run = false;
    for line in text.lines() {
        if is_marker_only(line) {
            if !in_run {
                out.push(STANZA_TAG);
                in_run = true;
            }
        } else {
            out.push(line);
            in_run = false;
        }
    }
    out.join("\n")
}
