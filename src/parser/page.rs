use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

/// Substring of the `id` that marks the poem container.
pub const CONTAINER_MARKER: &str = "kobita";
/// Link label of the "next page" anchor.
pub const NEXT_PAGE_LABEL: &str = "পরবর্তী";

static CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(&format!(r#"div[id*="{}"]"#, CONTAINER_MARKER)).unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static P_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static BR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("br").unwrap());

/// One parsed HTML document. Read-only after parsing.
pub struct Page {
    html: Html,
}

impl Page {
    pub fn parse(markup: &str) -> Self {
        Page {
            html: Html::parse_document(markup),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// First `div` whose id contains the container marker.
    pub fn content_container(&self) -> Option<ElementRef<'_>> {
        self.html.select(&CONTAINER_SEL).next()
    }

    /// Raw `href` of the first anchor whose text mentions the next-page label.
    pub fn next_page_href(&self) -> Option<String> {
        self.html
            .select(&ANCHOR_SEL)
            .find(|a| text_content(*a).contains(NEXT_PAGE_LABEL))
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
    }
}

/// A direct child as the extractor sees it.
#[derive(Clone, Copy)]
pub enum Child<'a> {
    Text(&'a str),
    Element(ElementRef<'a>),
}

/// Direct children in document order, text nodes included. Comments,
/// doctypes and processing instructions are skipped.
pub fn children<'a>(el: ElementRef<'a>) -> impl Iterator<Item = Child<'a>> + 'a {
    el.children().filter_map(|node| match node.value() {
        Node::Text(text) => Some(Child::Text(&**text)),
        Node::Element(_) => ElementRef::wrap(node).map(Child::Element),
        _ => None,
    })
}

/// Lowercase local tag name.
pub fn tag_name<'a>(el: ElementRef<'a>) -> &'a str {
    el.value().name()
}

/// Concatenated text of the whole subtree.
pub fn text_content(el: ElementRef<'_>) -> String {
    el.text().collect()
}

pub fn has_paragraphs(el: ElementRef<'_>) -> bool {
    el.select(&P_SEL).next().is_some()
}

pub fn has_breaks(el: ElementRef<'_>) -> bool {
    el.select(&BR_SEL).next().is_some()
}

/// All descendant paragraphs in document order.
pub fn paragraphs<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.select(&P_SEL)
}
