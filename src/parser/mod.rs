pub mod layout;
pub mod lines;
pub mod normalize;
pub mod page;
pub mod stanza;

use tracing::debug;

use layout::PoemLine;
use page::Page;

/// Page tree → poem container → ordered lines. No container, no lines.
pub fn extract_lines(page: &Page) -> Vec<PoemLine> {
    match page.content_container() {
        Some(container) => layout::reconcile(container),
        None => {
            debug!("no poem container on page");
            Vec::new()
        }
    }
}

/// Rendered tagged block for one page; empty when nothing was found.
pub fn process_page(page: &Page) -> String {
    layout::render(&extract_lines(page))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::layout::Layout;

    fn load(fixture: &str) -> Page {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", fixture)).unwrap();
        Page::parse(&html)
    }

    #[test]
    fn paragraph_page() {
        let page = load("paragraphs");
        assert_eq!(Layout::detect(page.content_container().unwrap()), Layout::Paragraphs);
        assert_eq!(
            process_page(&page),
            "আমার এ ঘর বহু যতন করে<eol>\n\
             ধুতে হবে মুছতে হবে মোরে<eol>\n\
             <eol>\n  \
             আমারে যে জাগতে হবে , <eol>\n\
             কী জানি সে আসবে কবে<eol>"
        );
    }

    #[test]
    fn break_page() {
        let page = load("breaks");
        assert_eq!(Layout::detect(page.content_container().unwrap()), Layout::Breaks);
        assert_eq!(
            process_page(&page),
            "তুমি কেমন করে গান করো হে গুণী<eol>\n  \
             অবাক হয়ে শুনি কেবল শুনি । <eol>\n\
             সুরের আলো ভুবন ফেলে ছেয়ে<eol>"
        );
    }

    #[test]
    fn mixed_page() {
        let page = load("mixed");
        assert_eq!(Layout::detect(page.content_container().unwrap()), Layout::Mixed);
        let lines = extract_lines(&page);
        assert_eq!(
            lines.iter().filter(|l| matches!(l, PoemLine::StanzaBreak)).count(),
            1
        );
        assert_eq!(
            process_page(&page),
            "রাত্রি এসে যেথায় মেশে<eol>\n\
             দিনের পারাবারে<eol>\n\
             <eol>\n\
             তোমায় আমায় দেখা হল<eol>\n\
             সেই মোহানার ধারে<eol>"
        );
    }

    #[test]
    fn page_without_container_is_empty() {
        let page = load("no_container");
        assert!(extract_lines(&page).is_empty());
        assert_eq!(process_page(&page), "");
        assert_eq!(page.next_page_href(), None);
    }

    #[test]
    fn next_page_is_found_on_fixture() {
        let page = load("breaks");
        assert_eq!(page.next_page_href().as_deref(), Some("/node/1234?page=1"));
    }
}
