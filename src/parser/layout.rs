use scraper::ElementRef;
use tracing::debug;

use super::lines::{extract_line, visit_child, visit_children, LineBuffer, NodeKind};
use super::normalize::{TaggedLine, EOL_MARKER};
use super::page::{children, has_breaks, has_paragraphs, paragraphs, text_content, Child};

/// Markup convention a poem container follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One `<p>` per line, no `<br>`.
    Paragraphs,
    /// One continuous run split by `<br>`. Also covers containers with
    /// neither paragraphs nor breaks.
    Breaks,
    /// `<p>` per stanza, `<br>` between the lines inside it.
    Mixed,
}

impl Layout {
    pub fn detect(container: ElementRef<'_>) -> Self {
        match (has_paragraphs(container), has_breaks(container)) {
            (true, false) => Layout::Paragraphs,
            (true, true) => Layout::Mixed,
            (false, _) => Layout::Breaks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoemLine {
    Verse(TaggedLine),
    StanzaBreak,
}

impl PoemLine {
    /// Stanza breaks render as a marker-only line.
    pub fn render(&self) -> &str {
        match self {
            PoemLine::Verse(line) => line.as_str(),
            PoemLine::StanzaBreak => EOL_MARKER,
        }
    }
}

/// Turn a poem container into its ordered lines.
pub fn reconcile(container: ElementRef<'_>) -> Vec<PoemLine> {
    let layout = Layout::detect(container);
    debug!(?layout, "reconciling poem container");
    match layout {
        Layout::Paragraphs => paragraph_lines(container),
        Layout::Breaks => break_lines(container),
        Layout::Mixed => mixed_lines(container),
    }
}

/// Newline-joined rendering of `lines`.
pub fn render(lines: &[PoemLine]) -> String {
    lines
        .iter()
        .map(PoemLine::render)
        .collect::<Vec<_>>()
        .join("\n")
}

fn paragraph_lines(container: ElementRef<'_>) -> Vec<PoemLine> {
    paragraphs(container)
        .map(|p| match extract_line(p) {
            Some(line) => PoemLine::Verse(line),
            None => PoemLine::StanzaBreak,
        })
        .collect()
}

fn break_lines(container: ElementRef<'_>) -> Vec<PoemLine> {
    verses(scan_breaks(container))
}

fn mixed_lines(container: ElementRef<'_>) -> Vec<PoemLine> {
    let mut out = Vec::new();
    let mut pending = LineBuffer::default();
    walk_mixed(container, &mut pending, &mut out);
    flush_into(&mut pending, &mut out);
    out
}

fn walk_mixed(el: ElementRef<'_>, pending: &mut LineBuffer, out: &mut Vec<PoemLine>) {
    for child in children(el) {
        match child {
            Child::Element(p) if NodeKind::of(p) == NodeKind::Paragraph => {
                flush_into(pending, out);
                if is_blank_paragraph(p) {
                    out.push(PoemLine::StanzaBreak);
                } else {
                    out.extend(verses(scan_breaks(p)));
                }
            }
            // any wrapper holding paragraphs, <font face=..> included
            Child::Element(nested) if has_paragraphs(nested) => {
                walk_mixed(nested, pending, out);
            }
            _ => {
                let mut lines = Vec::new();
                visit_child(child, &mut |fragment| pending.accept(fragment, &mut lines));
                out.extend(verses(lines));
            }
        }
    }
}

/// Break-only scan of one subtree, including its trailing remainder.
fn scan_breaks(el: ElementRef<'_>) -> Vec<TaggedLine> {
    let mut lines = Vec::new();
    let mut buffer = LineBuffer::default();
    visit_children(el, &mut |fragment| buffer.accept(fragment, &mut lines));
    buffer.flush(&mut lines);
    lines
}

fn flush_into(pending: &mut LineBuffer, out: &mut Vec<PoemLine>) {
    let mut lines = Vec::new();
    pending.flush(&mut lines);
    out.extend(verses(lines));
}

fn verses(lines: Vec<TaggedLine>) -> Vec<PoemLine> {
    lines.into_iter().map(PoemLine::Verse).collect()
}

fn is_blank_paragraph(p: ElementRef<'_>) -> bool {
    text_content(p)
        .replace('\u{a0}', "")
        .replace("&nbsp;", "")
        .trim()
        .is_empty()
}
