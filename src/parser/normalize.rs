use std::fmt;

use unicode_normalization::UnicodeNormalization;

/// Appended to every emitted line.
pub const EOL_MARKER: &str = "<eol>";

const BENGALI_DIGITS: &[char] = &['০', '১', '২', '৩', '৪', '৫', '৬', '৭', '৮', '৯'];
const PUNCTUATION: &[char] = &['।', '?', '!', ',', '—'];

/// A normalized line with its trailing end-of-line marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine(String);

impl TaggedLine {
    /// Tag already-normalized text.
    pub(crate) fn from_normalized(text: String) -> Self {
        let mut tagged = text;
        tagged.push_str(EOL_MARKER);
        TaggedLine(tagged)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaggedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || BENGALI_DIGITS.contains(&c)
}

/// Digit stripping, NFC composition and punctuation spacing.
/// Returns `None` when nothing but whitespace survives.
pub fn normalize_line(raw: &str) -> Option<String> {
    let stripped: String = raw.chars().filter(|&c| !is_digit(c)).collect();
    if stripped.trim().is_empty() {
        return None;
    }

    let composed: Vec<char> = stripped.nfc().collect();
    let mut out = String::with_capacity(composed.len() + 8);
    for (i, &c) in composed.iter().enumerate() {
        if PUNCTUATION.contains(&c) {
            if !out.is_empty() && !out.ends_with(char::is_whitespace) {
                out.push(' ');
            }
            out.push(c);
            match composed.get(i + 1) {
                Some(next) if next.is_whitespace() => {}
                _ => out.push(' '),
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Normalize and tag in one step.
pub fn tag_line(raw: &str) -> Option<TaggedLine> {
    normalize_line(raw).map(TaggedLine::from_normalized)
}
