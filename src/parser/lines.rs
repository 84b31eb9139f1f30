use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

use super::normalize::{tag_line, TaggedLine, EOL_MARKER};
use super::page::{children, has_breaks, tag_name, text_content, Child};

static SOURCE_NEWLINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+[ \t]*").unwrap());
static NEWLINE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").unwrap());

const NBSP: char = '\u{a0}';
const NBSP_ENTITY: &str = "&nbsp;";

/// One resolved contribution to the line being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Spaces(usize),
    /// Newline in the markup source, with the indentation after it.
    /// Reads as one space inside a line and as nothing at its start.
    SourceNewline,
    Break,
}

/// Element kinds the extractor distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `<font>` wrapping non-breaking spaces for indentation.
    SpaceCarrier,
    Break,
    Paragraph,
    Other,
}

impl NodeKind {
    pub fn of(el: ElementRef<'_>) -> Self {
        match tag_name(el) {
            "font" => NodeKind::SpaceCarrier,
            "br" => NodeKind::Break,
            "p" => NodeKind::Paragraph,
            _ => NodeKind::Other,
        }
    }
}

fn clean_text(raw: &str) -> String {
    raw.replace(NBSP, " ").replace(NBSP_ENTITY, " ")
}

/// Text between source newlines, with each newline run as its own fragment.
fn visit_text(text: &str, sink: &mut impl FnMut(Fragment)) {
    let mut last = 0;
    for m in SOURCE_NEWLINES_RE.find_iter(text) {
        if m.start() > last {
            sink(Fragment::Text(clean_text(&text[last..m.start()])));
        }
        sink(Fragment::SourceNewline);
        last = m.end();
    }
    if last < text.len() {
        sink(Fragment::Text(clean_text(&text[last..])));
    }
}

/// True when nothing has been written to the current line yet.
fn at_line_start(raw: &str) -> bool {
    raw.is_empty() || raw.ends_with('\n')
}

fn count_nbsp(text: &str) -> usize {
    text.matches(NBSP).count() + text.matches(NBSP_ENTITY).count()
}

/// Resolve one child into fragments, recursing into nested markup.
pub fn visit_child(child: Child<'_>, sink: &mut impl FnMut(Fragment)) {
    match child {
        Child::Text(text) => visit_text(text, sink),
        Child::Element(el) => match NodeKind::of(el) {
            NodeKind::Break => sink(Fragment::Break),
            NodeKind::SpaceCarrier => visit_carrier(el, sink),
            NodeKind::Paragraph | NodeKind::Other => visit_children(el, sink),
        },
    }
}

pub fn visit_children(el: ElementRef<'_>, sink: &mut impl FnMut(Fragment)) {
    for child in children(el) {
        visit_child(child, sink);
    }
}

fn visit_carrier(el: ElementRef<'_>, sink: &mut impl FnMut(Fragment)) {
    // a wrapped <br> must still split the line
    if has_breaks(el) {
        return visit_children(el, sink);
    }
    let text = text_content(el);
    let leftover = text.replace(NBSP, "").replace(NBSP_ENTITY, "");
    if leftover.trim().is_empty() {
        let n = count_nbsp(&text);
        if n > 0 {
            sink(Fragment::Spaces(n));
        }
    } else {
        // plain emphasis, not spacing
        visit_children(el, sink);
    }
}

/// Collapse newline runs, strip trailing whitespace, normalize and tag.
pub fn finalize_line(raw: &str) -> Option<TaggedLine> {
    let collapsed = NEWLINE_RUN_RE.replace_all(raw, "\n");
    let mut trimmed = collapsed.trim_end();
    while let Some(rest) = trimmed.strip_suffix(EOL_MARKER) {
        trimmed = rest.trim_end();
    }
    tag_line(trimmed)
}

/// Extract a whole node as one line. Breaks inside the node are kept as
/// an inline marker followed by a newline.
pub fn extract_line(el: ElementRef<'_>) -> Option<TaggedLine> {
    let mut raw = String::new();
    visit_children(el, &mut |fragment| match fragment {
        Fragment::Text(text) => raw.push_str(&text),
        Fragment::Spaces(n) => raw.extend(std::iter::repeat(' ').take(n)),
        Fragment::SourceNewline => {
            if !at_line_start(&raw) {
                raw.push(' ');
            }
        }
        Fragment::Break => {
            raw.push_str(EOL_MARKER);
            raw.push('\n');
        }
    });
    finalize_line(&raw)
}

/// Accumulates fragments until a break finalizes them into a line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    raw: String,
}

impl LineBuffer {
    /// Feed a fragment; a break finalizes the pending line into `out`.
    pub fn accept(&mut self, fragment: Fragment, out: &mut Vec<TaggedLine>) {
        match fragment {
            Fragment::Text(text) => self.raw.push_str(&text),
            Fragment::Spaces(n) => self.raw.extend(std::iter::repeat(' ').take(n)),
            Fragment::SourceNewline => {
                if !at_line_start(&self.raw) {
                    self.raw.push(' ');
                }
            }
            Fragment::Break => self.flush(out),
        }
    }

    /// Finalize whatever is pending. Blank lines are dropped.
    pub fn flush(&mut self, out: &mut Vec<TaggedLine>) {
        let raw = std::mem::take(&mut self.raw);
        if let Some(line) = finalize_line(&raw) {
            out.push(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::page::Page;

    fn fragments(markup: &str) -> Vec<Fragment> {
        let page = Page::parse(&format!(r#"<div id="kobita">{markup}</div>"#));
        let el = page.content_container().unwrap();
        let mut out = Vec::new();
        visit_children(el, &mut |f| out.push(f));
        out
    }

    fn line(markup: &str) -> Option<String> {
        let page = Page::parse(&format!(r#"<div id="kobita">{markup}</div>"#));
        extract_line(page.content_container().unwrap()).map(|l| l.as_str().to_string())
    }

    #[test]
    fn source_newlines_are_their_own_fragment() {
        assert_eq!(
            fragments("আজি\n\n   বসন্ত"),
            vec![
                Fragment::Text("আজি".into()),
                Fragment::SourceNewline,
                Fragment::Text("বসন্ত".into()),
            ]
        );
    }

    #[test]
    fn source_newline_inside_line_reads_as_space() {
        assert_eq!(line("আজি\nবসন্ত").as_deref(), Some("আজি বসন্ত<eol>"));
        assert_eq!(line("\n  আজি").as_deref(), Some("আজি<eol>"));
    }

    #[test]
    fn source_newline_after_break_adds_no_indent() {
        let mut buf = LineBuffer::default();
        let mut out = Vec::new();
        for f in fragments("এক<br>\nদুই<br>\n<font>&nbsp;</font>তিন") {
            buf.accept(f, &mut out);
        }
        buf.flush(&mut out);
        let got: Vec<&str> = out.iter().map(|l| l.as_str()).collect();
        assert_eq!(got, vec!["এক<eol>", "দুই<eol>", " তিন<eol>"]);
    }

    #[test]
    fn nbsp_in_text_becomes_space() {
        assert_eq!(fragments("ক&nbsp;খ"), vec![Fragment::Text("ক খ".into())]);
    }

    #[test]
    fn carrier_counts_nbsp() {
        assert_eq!(
            fragments("<font>&nbsp;&nbsp;&nbsp;</font>"),
            vec![Fragment::Spaces(3)]
        );
    }

    #[test]
    fn carrier_ignores_surrounding_whitespace() {
        assert_eq!(
            fragments("<font>\n &nbsp;&nbsp; \n</font>"),
            vec![Fragment::Spaces(2)]
        );
    }

    #[test]
    fn carrier_with_text_is_verbatim() {
        assert_eq!(
            fragments("<font color=red>গান</font>"),
            vec![Fragment::Text("গান".into())]
        );
    }

    #[test]
    fn empty_carrier_contributes_nothing() {
        assert!(fragments("<font></font>").is_empty());
    }

    #[test]
    fn carrier_wrapping_break_keeps_break() {
        assert_eq!(
            fragments("<font>&nbsp;<br></font>"),
            vec![Fragment::Text(" ".into()), Fragment::Break]
        );
    }

    #[test]
    fn nested_markup_recurses_in_order() {
        assert_eq!(
            fragments("ক<span>খ<b>গ</b></span><br>ঘ"),
            vec![
                Fragment::Text("ক".into()),
                Fragment::Text("খ".into()),
                Fragment::Text("গ".into()),
                Fragment::Break,
                Fragment::Text("ঘ".into()),
            ]
        );
    }

    #[test]
    fn unknown_leaf_contributes_nothing() {
        assert_eq!(fragments("ক<img src=x>খ").len(), 2);
    }

    #[test]
    fn extract_line_keeps_indentation() {
        assert_eq!(
            line("<font>&nbsp;&nbsp;</font>আমার   ").as_deref(),
            Some("  আমার<eol>")
        );
    }

    #[test]
    fn extract_line_marks_inner_breaks() {
        assert_eq!(line("রাত্রি<br>নামে").as_deref(), Some("রাত্রি<eol>\nনামে<eol>"));
    }

    #[test]
    fn extract_line_trailing_break_is_not_doubled() {
        assert_eq!(line("রাত্রি<br><br>").as_deref(), Some("রাত্রি<eol>"));
    }

    #[test]
    fn extract_line_signals_no_content() {
        assert_eq!(line(""), None);
        assert_eq!(line("&nbsp;&nbsp;"), None);
        assert_eq!(line("<font>&nbsp;</font>১২"), None);
    }

    #[test]
    fn buffer_splits_at_breaks_and_drops_blank() {
        let mut buf = LineBuffer::default();
        let mut out = Vec::new();
        for f in fragments("ক<br><font>&nbsp;&nbsp;&nbsp;</font><br>খ") {
            buf.accept(f, &mut out);
        }
        buf.flush(&mut out);
        let got: Vec<&str> = out.iter().map(|l| l.as_str()).collect();
        assert_eq!(got, vec!["ক<eol>", "খ<eol>"]);
    }

    #[test]
    fn node_kinds() {
        let page = Page::parse(r#"<div id="kobita"><font></font><br><p></p><i></i></div>"#);
        let kinds: Vec<NodeKind> = children(page.content_container().unwrap())
            .filter_map(|c| match c {
                Child::Element(e) => Some(NodeKind::of(e)),
                Child::Text(_) => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![NodeKind::SpaceCarrier, NodeKind::Break, NodeKind::Paragraph, NodeKind::Other]
        );
    }
}
