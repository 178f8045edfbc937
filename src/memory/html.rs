//! Serialization helpers, following the HTML fragment serialization algorithm.

/// Elements that never have content and so are written without an end tag.
pub(super) const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input", "keygen", "link", "meta",
	"param", "source", "track", "wbr",
];

/// Elements whose text content is written as-is.
pub(super) const RAW_TEXT_ELEMENTS: &[&str] = &["iframe", "noembed", "noframes", "plaintext", "script", "style", "xmp"];

pub(super) fn escape_text(text: &str, out: &mut String) {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			c => out.push(c),
		}
	}
}

pub(super) fn escape_attribute(value: &str, out: &mut String) {
	for c in value.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			c => out.push(c),
		}
	}
}
