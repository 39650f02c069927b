//! Escaped directives.
//!
//! `\{{name}}` renders as the literal text `{{name}}`. Escaped spans are
//! swapped for placeholders before any directive is interpreted and swapped
//! back once rendering is done. Placeholder characters already present in the
//! input are hidden the same way, so they come back untouched.

use super::lexer::closing_offset;

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

pub const DEFAULT_ESCAPE_MARKER: &str = "\\";

/// Hides escaped `{{…}}` spans behind numbered placeholders.
///
/// One escaper can hide several texts; placeholders stay unique across calls
/// so a single `restore` handles all of them.
#[derive(Debug, Clone)]
pub struct Escaper {
    marker: String,
    originals: Vec<String>,
}

impl Default for Escaper {
    fn default() -> Self {
        Self::new(DEFAULT_ESCAPE_MARKER)
    }
}

impl Escaper {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            originals: Vec::new(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Number of spans hidden so far.
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Replace every `<marker>{{…}}` span (no nested braces) with a placeholder.
    pub fn hide(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        if self.marker.is_empty() {
            self.push_protected(&mut out, text);
            return out;
        }

        let opener = format!("{}{{{{", self.marker);
        let mut rest = text;

        while let Some(pos) = rest.find(&opener) {
            let body_start = pos + opener.len();
            match closing_offset(&rest[body_start..]) {
                Some(inner_len) => {
                    let end = body_start + inner_len + 2;
                    self.push_protected(&mut out, &rest[..pos]);
                    self.push_original(&mut out, &rest[pos..end]);
                    rest = &rest[end..];
                }
                None => {
                    let skip = pos + self.marker.len();
                    self.push_protected(&mut out, &rest[..skip]);
                    rest = &rest[skip..];
                }
            }
        }

        self.push_protected(&mut out, rest);
        out
    }

    /// Hide only the placeholder characters in `text`, e.g. in a substituted
    /// value, so [`Escaper::restore`] leaves them as written.
    pub fn protect(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        self.push_protected(&mut out, text);
        out
    }

    fn push_protected(&mut self, out: &mut String, text: &str) {
        let mut pieces = text.split(PLACEHOLDER_OPEN);
        if let Some(first) = pieces.next() {
            out.push_str(first);
        }
        for piece in pieces {
            self.push_original(out, PLACEHOLDER_OPEN.encode_utf8(&mut [0; 4]));
            out.push_str(piece);
        }
    }

    fn push_original(&mut self, out: &mut String, original: &str) {
        push_placeholder(out, self.originals.len());
        self.originals.push(original.to_string());
    }

    /// Put hidden spans back with the escape marker stripped.
    pub fn restore(&self, text: &str) -> String {
        self.replace_placeholders(text, |original| {
            original.strip_prefix(self.marker.as_str()).unwrap_or(original)
        })
    }

    /// Put hidden spans back exactly as they were written, marker included.
    pub fn reveal(&self, text: &str) -> String {
        self.replace_placeholders(text, |original| original)
    }

    fn replace_placeholders<'a>(&'a self, text: &str, pick: impl Fn(&'a str) -> &'a str) -> String {
        if self.originals.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
            out.push_str(&rest[..start]);
            let after = &rest[start + PLACEHOLDER_OPEN.len_utf8()..];

            let original = after.find(PLACEHOLDER_CLOSE).and_then(|close| {
                let index: usize = after[..close].parse().ok()?;
                let original = self.originals.get(index)?;
                Some((original, close))
            });

            match original {
                Some((original, close)) => {
                    out.push_str(pick(original.as_str()));
                    rest = &after[close + PLACEHOLDER_CLOSE.len_utf8()..];
                }
                None => {
                    out.push(PLACEHOLDER_OPEN);
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

fn push_placeholder(out: &mut String, index: usize) {
    out.push(PLACEHOLDER_OPEN);
    out.push_str(&index.to_string());
    out.push(PLACEHOLDER_CLOSE);
}
