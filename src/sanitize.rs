use regex::Regex;
use scraper::{Html, Node};
use std::sync::OnceLock;

/// Elements whose whole subtree is dropped before text extraction.
/// `span` is included on purpose: in posting bodies it mostly wraps noise.
pub const NON_VISIBLE_TAGS: &[&str] = &[
    "script", "style", "head", "meta", "noscript", "iframe", "span",
];

/// Reduce a (possibly HTML) description to plain printable-ASCII text.
pub fn clean(raw: Option<&str>) -> String {
    let raw = match raw {
        Some(s) if !s.is_empty() => s,
        _ => return String::new(),
    };

    if !tag_re().is_match(raw) {
        return raw.to_string();
    }

    let text = match extract_text(raw) {
        Some(text) => text,
        None => return raw.to_string(),
    };

    let decoded = html_escape::decode_html_entities(&text);
    let collapsed = whitespace_re().replace_all(&decoded, " ");
    non_printable_re()
        .replace_all(collapsed.trim(), " ")
        .into_owned()
}

/// Parse `raw`, drop non-visible subtrees and join the remaining text nodes
/// with single spaces. Only text nodes are read, so attributes never leak.
fn extract_text(raw: &str) -> Option<String> {
    // A fragment parse ignores <head>, which would hoist its children into
    // the body. Only an explicit head gets a full document parse.
    let parsed = std::panic::catch_unwind(|| {
        if head_re().is_match(raw) {
            Html::parse_document(raw)
        } else {
            Html::parse_fragment(raw)
        }
    });
    let mut doc = match parsed {
        Ok(doc) => doc,
        Err(_) => {
            tracing::trace!(len = raw.len(), "markup parser failed; keeping raw text");
            return None;
        }
    };

    let dropped: Vec<_> = doc
        .tree
        .root()
        .descendants()
        .filter(|node| match node.value() {
            Node::Element(el) => NON_VISIBLE_TAGS.contains(&el.name()),
            _ => false,
        })
        .map(|node| node.id())
        .collect();

    for id in dropped {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }

    let pieces: Vec<&str> = doc
        .tree
        .root()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        })
        .collect();

    Some(pieces.join(" "))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<.*?>").unwrap())
}

fn head_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<head[\s/>]").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn non_printable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\x20-\x7E]+").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_empty() {
        assert_eq!(clean(None), "");
        assert_eq!(clean(Some("")), "");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(clean(Some("plain text")), "plain text");
        // No tag-like token, so whitespace is left alone.
        assert_eq!(clean(Some("Line1\n\n\tLine2")), "Line1\n\n\tLine2");
        assert_eq!(clean(Some("salary < 50k")), "salary < 50k");
    }

    #[test]
    fn nested_tags() {
        assert_eq!(clean(Some("<p>Hello <b>World</b></p>")), "Hello World");
    }

    #[test]
    fn script_removed() {
        assert_eq!(clean(Some("<script>bad()</script>Visible")), "Visible");
        assert_eq!(
            clean(Some("<style>p { color: red }</style><p>Body</p>")),
            "Body"
        );
    }

    #[test]
    fn head_removed_from_full_document() {
        let doc = "<html><head><title>Job Ad</title></head><body><p>Hi</p></body></html>";
        assert_eq!(clean(Some(doc)), "Hi");
        let loose = r#"<HEAD><title>T</title><meta charset="utf-8"></HEAD><p>Hi</p>"#;
        assert_eq!(clean(Some(loose)), "Hi");
    }

    #[test]
    fn header_is_not_head() {
        assert_eq!(clean(Some("<header>Top</header><p>Body</p>")), "Top Body");
    }

    #[test]
    fn meta_noscript_iframe_removed() {
        assert_eq!(clean(Some(r#"<meta name="k" content="v"><p>Body</p>"#)), "Body");
        assert_eq!(clean(Some("<noscript>enable js</noscript>x")), "x");
        assert_eq!(clean(Some("<p>a<iframe>inner</iframe> b</p>")), "a b");
    }

    #[test]
    fn span_removed() {
        assert_eq!(
            clean(Some("<p>Keep <span>drop me</span>this</p>")),
            "Keep this"
        );
    }

    #[test]
    fn whitespace_collapsed_in_markup() {
        assert_eq!(clean(Some("<p>Line1\n\n\tLine2</p>")), "Line1 Line2");
        assert_eq!(clean(Some("<ul><li>a</li><li>b</li></ul>")), "a b");
    }

    #[test]
    fn attributes_do_not_leak() {
        let out = clean(Some(r#"<a href="https://x.test" title="secret">Apply</a>"#));
        assert_eq!(out, "Apply");
    }

    #[test]
    fn entities_decoded() {
        assert_eq!(clean(Some("<p>R&amp;D &amp; ops&nbsp;</p>")), "R&D & ops");
        assert_eq!(clean(Some("<p>AT&amp;amp;T</p>")), "AT&T");
    }

    #[test]
    fn escaped_tags_survive_one_pass() {
        // Entities decode after extraction, so escaped markup becomes literal
        // markup; a second pass then strips it.
        let once = clean(Some("<p>a &lt;b&gt; c</p>"));
        assert_eq!(once, "a <b> c");
        assert_eq!(clean(Some(once.as_str())), "a c");
    }

    #[test]
    fn non_ascii_replaced() {
        assert_eq!(clean(Some("<p>caf\u{e9} bar</p>")), "caf  bar");
        assert_eq!(clean(Some("<p>a\u{2014}\u{2014}b</p>")), "a b");
    }

    #[test]
    fn malformed_markup_recovers() {
        assert_eq!(clean(Some("<div><p>Unclosed <b>bold")), "Unclosed bold");
    }

    #[test]
    fn idempotent_on_clean_text() {
        let once = clean(Some("<p>Hello <b>World</b></p>"));
        assert_eq!(clean(Some(once.as_str())), once);
        let plain = clean(Some("plain text"));
        assert_eq!(clean(Some(plain.as_str())), "plain text");
    }
}
