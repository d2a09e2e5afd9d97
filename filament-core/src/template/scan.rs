//! Marker Scanner
//!
//! Assembles a template's static fragments into one markup string, deciding
//! for every interpolation position what context it sits in and writing the
//! matching marker:
//!
//! - text context: a placeholder comment, `<!--fl:N-->`
//! - attribute value: an inline token, `__fl_N__` (comments are illegal there)
//!
//! While doing so it rewrites attribute sigils into plain names the parser
//! keeps intact: `@name` becomes `fl-on-name`, `.name` becomes
//! `fl-prop-name`, `?name` becomes `fl-bool-name`. The parser lowercases
//! attribute names, so event and property names carry their case as `^x`
//! for each uppercase `X` (`.textContent` becomes `fl-prop-text^content`);
//! see [`restore_case`].
//!
//! # Context Detection
//!
//! Context is decided by an incremental tokenizer whose state carries across
//! fragments, rather than by counting quotes in the text so far. A `>` inside
//! a quoted attribute value or tag-like text inside a comment therefore does
//! not confuse it. Interpolations inside comments, raw-text elements, or in
//! bare tag positions (`<div ${x}>`) are unsupported: they get no marker and
//! the value is dropped with a warning.

use std::ops::Range;

use crate::dom::is_raw_text_element;

pub(crate) const TEXT_MARKER_PREFIX: &str = "fl:";
pub(crate) const END_MARKER: &str = "/fl";
pub(crate) const EVENT_PREFIX: &str = "fl-on-";
pub(crate) const PROPERTY_PREFIX: &str = "fl-prop-";
pub(crate) const BOOLEAN_PREFIX: &str = "fl-bool-";

const UPPER_ESCAPE: char = '^';

const TOKEN_OPEN: &str = "__fl_";
const TOKEN_CLOSE: &str = "__";

pub(crate) fn attribute_token(index: usize) -> String {
    format!("{TOKEN_OPEN}{index}{TOKEN_CLOSE}")
}

/// Undo the scanner's case escape in a bound event or property name.
pub(crate) fn restore_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(ch) = chars.next() {
        match (ch, chars.clone().next()) {
            (UPPER_ESCAPE, Some(next)) if next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Slot index of a placeholder comment's data, e.g. `"fl:3"` -> `3`.
pub(crate) fn parse_text_marker(data: &str) -> Option<usize> {
    data.strip_prefix(TEXT_MARKER_PREFIX)?.parse().ok()
}

/// Every `__fl_N__` token in an attribute value, in order.
pub(crate) fn find_tokens(value: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find(TOKEN_OPEN) {
        let after = &rest[start + TOKEN_OPEN.len()..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && after[digits..].starts_with(TOKEN_CLOSE) {
            if let Ok(index) = after[..digits].parse() {
                found.push(index);
            }
            rest = &after[digits + TOKEN_CLOSE.len()..];
        } else {
            rest = after;
        }
    }
    found
}

/// Where an interpolation landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SlotContext {
    /// Text content; `marker` is the byte range of the placeholder comment.
    Text { marker: Range<usize> },
    /// Inside the value of attribute `name` (already sigil-rewritten);
    /// `attribute` spans the whole `name="value"` text.
    Attribute {
        name: String,
        attribute: Range<usize>,
    },
    /// A position the engine cannot bind; the value is ignored.
    Unsupported(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedSlot {
    pub(crate) index: usize,
    pub(crate) context: SlotContext,
}

/// Output of [`scan`].
#[derive(Debug, Clone)]
pub(crate) struct Scan {
    pub(crate) markup: String,
    pub(crate) slots: Vec<ScannedSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Double,
    Single,
    Unquoted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Data,
    TagOpen,
    TagName,
    EndTag,
    BeforeAttrName,
    AttrName,
    AfterAttrName,
    BeforeAttrValue,
    AttrValue(Quote),
    Comment,
    Bogus,
    RawText(String),
}

struct Scanner {
    out: String,
    state: State,
    tag: String,
    attr_name: String,
    /// The current attribute is an event or property binding.
    keep_case: bool,
    attr_start: usize,
    /// Slots waiting for the current attribute's end offset.
    pending: Vec<usize>,
    comment_start: usize,
    slots: Vec<ScannedSlot>,
}

/// Assemble `statics` into marker-annotated markup.
pub(crate) fn scan(statics: &[&str]) -> Scan {
    let mut scanner = Scanner {
        out: String::with_capacity(statics.iter().map(|s| s.len() + 16).sum()),
        state: State::Data,
        tag: String::new(),
        attr_name: String::new(),
        keep_case: false,
        attr_start: 0,
        pending: Vec::new(),
        comment_start: 0,
        slots: Vec::new(),
    };

    for (index, fragment) in statics.iter().enumerate() {
        for ch in fragment.chars() {
            scanner.feed(ch);
        }
        if index + 1 < statics.len() {
            scanner.interpolate(index);
        }
    }
    // An attribute left open at the end of input still needs its range.
    scanner.finish_attribute();

    Scan {
        markup: scanner.out,
        slots: scanner.slots,
    }
}

impl Scanner {
    fn feed(&mut self, ch: char) {
        match self.state.clone() {
            State::Data => {
                self.out.push(ch);
                if ch == '<' {
                    self.state = State::TagOpen;
                }
            }
            State::TagOpen => match ch {
                c if c.is_ascii_alphabetic() => {
                    self.out.push(c);
                    self.tag.clear();
                    self.tag.push(c.to_ascii_lowercase());
                    self.state = State::TagName;
                }
                '/' => {
                    self.out.push(ch);
                    self.state = State::EndTag;
                }
                '!' => {
                    self.out.push(ch);
                    self.comment_start = self.out.len();
                    self.state = State::Bogus;
                }
                '?' => {
                    self.out.push(ch);
                    self.comment_start = 0;
                    self.state = State::Bogus;
                }
                _ => {
                    self.state = State::Data;
                    self.feed(ch);
                }
            },
            State::TagName => match ch {
                '>' => {
                    self.out.push(ch);
                    self.close_tag();
                }
                c if c.is_whitespace() || c == '/' => {
                    self.out.push(c);
                    self.state = State::BeforeAttrName;
                }
                c => {
                    self.out.push(c);
                    self.tag.push(c.to_ascii_lowercase());
                }
            },
            State::EndTag => {
                self.out.push(ch);
                if ch == '>' {
                    self.state = State::Data;
                }
            }
            State::Bogus => {
                self.out.push(ch);
                // `<!--` turns a bogus declaration into a comment.
                if self.out.len() == self.comment_start + 2 && self.out.ends_with("--") {
                    self.comment_start = self.out.len();
                    self.state = State::Comment;
                } else if ch == '>' {
                    self.state = State::Data;
                }
            }
            State::Comment => {
                self.out.push(ch);
                if ch == '>' && self.out.len() >= self.comment_start + 2 && self.out.ends_with("-->")
                {
                    self.state = State::Data;
                }
            }
            State::RawText(tag) => {
                self.out.push(ch);
                let closing = format!("</{tag}");
                let tail_start = self.out.len().saturating_sub(closing.len());
                if self.out.is_char_boundary(tail_start)
                    && self.out[tail_start..].eq_ignore_ascii_case(&closing)
                {
                    self.state = State::EndTag;
                }
            }
            State::BeforeAttrName => match ch {
                '>' => {
                    self.out.push(ch);
                    self.close_tag();
                }
                c if c.is_whitespace() || c == '/' => self.out.push(c),
                c => self.start_attribute(c),
            },
            State::AttrName => match ch {
                '=' => {
                    self.out.push(ch);
                    self.state = State::BeforeAttrValue;
                }
                '>' => {
                    self.finish_attribute();
                    self.out.push(ch);
                    self.close_tag();
                }
                '/' => {
                    self.finish_attribute();
                    self.out.push(ch);
                    self.state = State::BeforeAttrName;
                }
                c if c.is_whitespace() => {
                    self.out.push(c);
                    self.state = State::AfterAttrName;
                }
                c => self.push_name_char(c),
            },
            State::AfterAttrName => match ch {
                '=' => {
                    self.out.push(ch);
                    self.state = State::BeforeAttrValue;
                }
                '>' => {
                    self.finish_attribute();
                    self.out.push(ch);
                    self.close_tag();
                }
                c if c.is_whitespace() => self.out.push(c),
                c => {
                    self.finish_attribute();
                    self.start_attribute(c);
                }
            },
            State::BeforeAttrValue => match ch {
                '"' => {
                    self.out.push(ch);
                    self.state = State::AttrValue(Quote::Double);
                }
                '\'' => {
                    self.out.push(ch);
                    self.state = State::AttrValue(Quote::Single);
                }
                '>' => {
                    self.finish_attribute();
                    self.out.push(ch);
                    self.close_tag();
                }
                c if c.is_whitespace() => self.out.push(c),
                c => {
                    self.out.push(c);
                    self.state = State::AttrValue(Quote::Unquoted);
                }
            },
            State::AttrValue(quote) => match (quote, ch) {
                (Quote::Double, '"') | (Quote::Single, '\'') => {
                    self.out.push(ch);
                    self.finish_attribute();
                    self.state = State::BeforeAttrName;
                }
                (Quote::Unquoted, '>') => {
                    self.finish_attribute();
                    self.out.push(ch);
                    self.close_tag();
                }
                (Quote::Unquoted, c) if c.is_whitespace() => {
                    self.finish_attribute();
                    self.out.push(c);
                    self.state = State::BeforeAttrName;
                }
                (_, c) => self.out.push(c),
            },
        }
    }

    fn start_attribute(&mut self, first: char) {
        self.attr_start = self.out.len();
        self.attr_name.clear();
        let prefix = match first {
            '@' => Some(EVENT_PREFIX),
            '.' => Some(PROPERTY_PREFIX),
            '?' => Some(BOOLEAN_PREFIX),
            _ => None,
        };
        self.keep_case = prefix == Some(EVENT_PREFIX) || prefix == Some(PROPERTY_PREFIX);
        match prefix {
            Some(prefix) => {
                self.out.push_str(prefix);
                self.attr_name.push_str(prefix);
            }
            None => self.push_name_char(first),
        }
        self.state = State::AttrName;
    }

    fn push_name_char(&mut self, c: char) {
        if self.keep_case && c.is_ascii_uppercase() {
            for escaped in [UPPER_ESCAPE, c.to_ascii_lowercase()] {
                self.out.push(escaped);
                self.attr_name.push(escaped);
            }
        } else {
            self.out.push(c);
            self.attr_name.push(c);
        }
    }

    /// Close the current attribute, giving pending slots their range.
    fn finish_attribute(&mut self) {
        let end = self.out.len();
        for slot_pos in self.pending.drain(..) {
            if let SlotContext::Attribute { attribute, .. } = &mut self.slots[slot_pos].context {
                attribute.end = end;
            }
        }
    }

    fn close_tag(&mut self) {
        let tag = std::mem::take(&mut self.tag);
        self.state = if is_raw_text_element(&tag) {
            State::RawText(tag)
        } else {
            State::Data
        };
    }

    fn interpolate(&mut self, index: usize) {
        let context = match self.state {
            State::Data => {
                let start = self.out.len();
                self.out.push_str("<!--");
                self.out.push_str(TEXT_MARKER_PREFIX);
                self.out.push_str(&index.to_string());
                self.out.push_str("-->");
                SlotContext::Text {
                    marker: start..self.out.len(),
                }
            }
            State::BeforeAttrValue | State::AttrValue(_) => {
                if self.state == State::BeforeAttrValue {
                    self.state = State::AttrValue(Quote::Unquoted);
                }
                self.out.push_str(&attribute_token(index));
                self.pending.push(self.slots.len());
                SlotContext::Attribute {
                    name: self.attr_name.clone(),
                    attribute: self.attr_start..self.out.len(),
                }
            }
            State::Comment => SlotContext::Unsupported("comment"),
            State::RawText(_) => SlotContext::Unsupported("raw text element"),
            _ => SlotContext::Unsupported("tag"),
        };

        if let SlotContext::Unsupported(position) = context {
            tracing::warn!(slot = index, position, "interpolation in unsupported position is ignored");
        }
        self.slots.push(ScannedSlot { index, context });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contexts(statics: &[&str]) -> Vec<SlotContext> {
        scan(statics).slots.into_iter().map(|s| s.context).collect()
    }

    #[test]
    fn text_slot_gets_placeholder_comment() {
        let scan = scan(&["<p>", "</p>"]);

        assert_eq!(scan.markup, "<p><!--fl:0--></p>");
        assert_eq!(
            scan.slots[0].context,
            SlotContext::Text { marker: 3..14 }
        );
    }

    #[test]
    fn quoted_attribute_slot_gets_inline_token() {
        let scan = scan(&["<a href=\"", "\">x</a>"]);

        assert_eq!(scan.markup, "<a href=\"__fl_0__\">x</a>");
        assert_eq!(
            scan.slots[0].context,
            SlotContext::Attribute {
                name: "href".into(),
                attribute: 3..18
            }
        );
    }

    #[test]
    fn unquoted_attribute_slot() {
        let scan = scan(&["<input value=", " disabled>"]);

        assert_eq!(scan.markup, "<input value=__fl_0__ disabled>");
        assert!(matches!(
            &scan.slots[0].context,
            SlotContext::Attribute { name, attribute } if name == "value" && attribute.clone() == (7..21)
        ));
    }

    #[test]
    fn sigils_are_rewritten() {
        let scan = scan(&["<button @click=", " .textContent=", " ?disabled=", ">go</button>"]);

        assert_eq!(
            scan.markup,
            "<button fl-on-click=__fl_0__ fl-prop-text^content=__fl_1__ fl-bool-disabled=__fl_2__>go</button>"
        );
        let names: Vec<_> = scan
            .slots
            .iter()
            .map(|s| match &s.context {
                SlotContext::Attribute { name, .. } => name.clone(),
                other => panic!("unexpected context {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["fl-on-click", "fl-prop-text^content", "fl-bool-disabled"]);
    }

    #[test]
    fn escaped_case_is_restored() {
        assert_eq!(restore_case("text^content"), "textContent");
        assert_eq!(restore_case("my^custom^event"), "myCustomEvent");
        assert_eq!(restore_case("odd^"), "odd^");
        assert_eq!(restore_case("plain"), "plain");
    }

    #[test]
    fn closing_quote_inside_value_returns_to_text() {
        // The `>` inside the quoted title must not end the tag.
        let found = contexts(&["<div title=\"a > b\">", "</div>"]);

        assert!(matches!(found[0], SlotContext::Text { .. }));
    }

    #[test]
    fn tag_like_text_in_comment_is_not_a_tag() {
        let found = contexts(&["<!-- <div class=\" -->", "<p>", "</p>"]);

        assert!(matches!(found[0], SlotContext::Text { .. }));
        assert!(matches!(found[1], SlotContext::Text { .. }));
    }

    #[test]
    fn unsupported_positions() {
        let found = contexts(&["<!-- ", " --><div ", "></div><script>", "</script>"]);

        assert_eq!(
            found,
            vec![
                SlotContext::Unsupported("comment"),
                SlotContext::Unsupported("tag"),
                SlotContext::Unsupported("raw text element"),
            ]
        );
    }

    #[test]
    fn finds_tokens_and_markers() {
        assert_eq!(find_tokens("a __fl_3__ b __fl_12__ __fl_x__"), vec![3, 12]);
        assert_eq!(parse_text_marker("fl:7"), Some(7));
        assert_eq!(parse_text_marker("other"), None);
    }
}
