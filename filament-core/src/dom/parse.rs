//! Fragment Parser
//!
//! Turns a template (or raw-HTML value) into a fragment by driving
//! html5ever's tokenizer with a small [`TokenSink`] that builds [`Node`]s.
//! The tokenizer handles character references, attribute quoting and error
//! recovery; the sink only decides nesting:
//!
//! - void elements and `/>` self-closing tags never take children
//! - raw-text elements (`script`, `style`, `textarea`, `title`) switch the
//!   tokenizer into the matching raw state, so their content is not parsed
//! - an end tag closes the nearest open element with that name; unmatched
//!   end tags are ignored, and anything left open is closed at end of input
//!
//! There is no tree construction beyond that: no implied `<html>`/`<body>`,
//! no foster parenting. A fragment holds exactly what the markup says.
//!
//! Tag and attribute names come out lowercased. Bound event and property
//! names keep their case through the scanner's escape, see
//! [`crate::template`].

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use super::node::Node;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub(crate) fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Tokenizer state for the content of raw-text element `tag`.
fn raw_kind(tag: &str) -> Option<RawKind> {
    match tag {
        "script" => Some(RawKind::ScriptData),
        "style" => Some(RawKind::Rawtext),
        "textarea" | "title" => Some(RawKind::Rcdata),
        _ => None,
    }
}

/// Parse `markup` into a new fragment node.
pub(crate) fn parse_fragment(markup: &str) -> Node {
    let root = Node::fragment();
    let builder = FragmentBuilder {
        open: vec![root.clone()],
        text: String::new(),
    };

    let mut tokenizer = Tokenizer::new(builder, TokenizerOpts::default());
    let mut input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(markup));
    // The sink never hands back a script, so feeding always runs to the end.
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();
    root
}

/// Stack of open elements; index 0 is the fragment and is never popped.
struct FragmentBuilder {
    open: Vec<Node>,
    text: String,
}

impl FragmentBuilder {
    fn top(&self) -> &Node {
        &self.open[self.open.len() - 1]
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = Node::text(std::mem::take(&mut self.text));
        self.top().append_child(&text);
    }

    fn start_tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        let name: &str = &tag.name;
        let element = Node::element(name);
        for attribute in &tag.attrs {
            element.set_attribute(&*attribute.name.local, &*attribute.value);
        }
        self.top().append_child(&element);

        if tag.self_closing || is_void_element(name) {
            return TokenSinkResult::Continue;
        }
        self.open.push(element);
        match raw_kind(name) {
            Some(kind) => TokenSinkResult::RawData(kind),
            None => TokenSinkResult::Continue,
        }
    }

    fn end_tag(&mut self, tag: Tag) {
        let name: &str = &tag.name;
        match self.open.iter().rposition(|node| node.tag_name() == Some(name)) {
            // Index 0 is the fragment and has no tag name, so `pos >= 1`.
            Some(pos) => self.open.truncate(pos),
            None => tracing::trace!(tag = name, "ignoring unmatched end tag"),
        }
    }
}

impl TokenSink for FragmentBuilder {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(text) => self.text.push_str(&text),
            Token::CommentToken(data) => {
                self.flush_text();
                self.top().append_child(&Node::comment(&*data));
            }
            Token::TagToken(tag) => {
                self.flush_text();
                return match tag.kind {
                    TagKind::StartTag => self.start_tag(tag),
                    TagKind::EndTag => {
                        self.end_tag(tag);
                        TokenSinkResult::Continue
                    }
                };
            }
            Token::ParseError(error) => tracing::trace!(%error, "recovered from markup error"),
            // Doctypes carry nothing for a fragment; NUL is dropped as in body text.
            Token::DoctypeToken(_) | Token::NullCharacterToken => {}
            Token::EOFToken => self.flush_text(),
        }
        TokenSinkResult::Continue
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_text() {
        let fragment = parse_fragment("<div class=\"a\"><p>Hello <b>you</b></p>tail</div>");

        assert_eq!(fragment.child_count(), 1);
        let div = fragment.first_child().unwrap();
        assert_eq!(div.tag_name(), Some("div"));
        assert_eq!(div.get_attribute("class"), Some("a".into()));
        assert_eq!(div.text_content(), "Hello youtail");
    }

    #[test]
    fn keeps_comments_as_nodes() {
        let fragment = parse_fragment("<p>a<!--fl:0-->b</p>");
        let p = fragment.first_child().unwrap();

        assert_eq!(p.child_count(), 3);
        assert!(p.child(1).unwrap().is_comment());
        assert_eq!(p.child(1).unwrap().data(), "fl:0");
    }

    #[test]
    fn void_and_self_closing_elements_do_not_nest() {
        let fragment = parse_fragment("<input value=x><br/><span>s</span>");
        let tags: Vec<_> = fragment
            .children()
            .iter()
            .map(|n| n.tag_name().unwrap_or_default().to_string())
            .collect();

        assert_eq!(tags, vec!["input", "br", "span"]);
        assert_eq!(fragment.first_child().unwrap().get_attribute("value"), Some("x".into()));
    }

    #[test]
    fn names_are_lowercased_and_valueless_attributes_are_empty() {
        let fragment = parse_fragment("<INPUT Type='text' fl-prop-text^content='__fl_0__' disabled>");
        let input = fragment.first_child().unwrap();

        assert_eq!(input.tag_name(), Some("input"));
        assert_eq!(input.get_attribute("type"), Some("text".into()));
        assert_eq!(input.get_attribute("fl-prop-text^content"), Some("__fl_0__".into()));
        assert_eq!(input.get_attribute("disabled"), Some(String::new()));
    }

    #[test]
    fn raw_text_elements_are_not_parsed() {
        let fragment = parse_fragment("<script>if (a < b) { x = '<p>'; }</script><i>after</i>");
        let script = fragment.first_child().unwrap();

        assert_eq!(script.child_count(), 1);
        assert_eq!(script.text_content(), "if (a < b) { x = '<p>'; }");
        assert_eq!(fragment.child(1).unwrap().tag_name(), Some("i"));
    }

    #[test]
    fn textarea_decodes_references_but_not_tags() {
        let fragment = parse_fragment("<textarea><b>&lt;x&gt;</b></textarea>");

        assert_eq!(fragment.first_child().unwrap().text_content(), "<b><x></b>");
    }

    #[test]
    fn lenient_on_broken_input() {
        let fragment = parse_fragment("</nope>a < b<div><span>unclosed");

        assert_eq!(fragment.text_content(), "a < bunclosed");
    }

    #[test]
    fn decodes_named_and_numeric_references() {
        let fragment = parse_fragment("<p>a &amp; b &lt;&gt; &#65;&#x42; &copy;&nbsp;&hellip;</p>");

        assert_eq!(fragment.text_content(), "a & b <> AB \u{a9}\u{a0}\u{2026}");
    }
}
