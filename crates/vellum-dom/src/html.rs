//! HTML fragment parsing and serialization.
//!
//! The parser is deliberately forgiving, like the browser paste path it
//! stands in for: unknown end tags are ignored and unclosed elements are
//! closed at the end of input. Only an unterminated tag is an error.

use crate::document::{Document, NodeId, NodeKind, VOID_TAGS};
use crate::{DomError, DomResult};

/// Parses `html` and appends the resulting nodes to `parent`.
pub fn parse_into(doc: &mut Document, parent: NodeId, html: &str) -> DomResult<()> {
    let mut stack = vec![parent];
    let mut rest = html;

    while !rest.is_empty() {
        let current = *stack.last().unwrap_or(&parent);

        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after
                .find("-->")
                .ok_or_else(|| DomError::Parse("unterminated comment".to_string()))?;
            rest = &after[end + 3..];
        } else if let Some(after) = rest.strip_prefix("</") {
            let end = after
                .find('>')
                .ok_or_else(|| DomError::Parse("unterminated end tag".to_string()))?;
            let name = after[..end].trim().to_ascii_lowercase();
            // Pop up to the matching open element; stray end tags are dropped
            if let Some(pos) = stack.iter().rposition(|&n| doc.tag(n) == Some(name.as_str())) {
                if pos > 0 {
                    stack.truncate(pos);
                }
            }
            rest = &after[end + 1..];
        } else if rest.starts_with('<')
            && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
        {
            let (tag, consumed) = parse_start_tag(&rest[1..])?;
            rest = &rest[1 + consumed..];
            let element = doc.create_element(&tag.name);
            for (name, value) in &tag.attributes {
                doc.set_attribute(element, name, Some(value))?;
            }
            doc.append_child(current, element)?;
            if !tag.self_closing && !VOID_TAGS.contains(&tag.name.as_str()) {
                stack.push(element);
            }
        } else {
            let first = rest.chars().next().map(char::len_utf8).unwrap_or(1);
            let end = rest[first..]
                .find('<')
                .map(|i| i + first)
                .unwrap_or(rest.len());
            let text = decode_entities(&rest[..end]);
            rest = &rest[end..];
            if !text.is_empty() {
                let node = doc.create_text(&text);
                doc.append_child(current, node)?;
            }
        }
    }
    Ok(())
}

struct StartTag {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

/// Parses the inside of a start tag; returns the tag and the bytes consumed
/// (including the closing `>`).
fn parse_start_tag(input: &str) -> DomResult<(StartTag, usize)> {
    let unterminated = || DomError::Parse(format!("unterminated tag near {:?}", truncate(input)));
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/'
    {
        i += 1;
    }
    let name = input[..i].to_ascii_lowercase();
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return Err(unterminated()),
            Some(b'>') => return Ok((StartTag { name, attributes, self_closing }, i + 1)),
            Some(b'/') => {
                self_closing = true;
                i += 1;
                continue;
            }
            Some(_) => {}
        }

        let start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let attr_name = input[start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let end = input[i + 1..]
                        .find(quote as char)
                        .ok_or_else(unterminated)?;
                    value = decode_entities(&input[i + 1..i + 1 + end]);
                    i += end + 2;
                }
                Some(_) => {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = decode_entities(&input[start..i]);
                }
                None => return Err(unterminated()),
            }
        }
        if !attr_name.is_empty() {
            self_closing = false;
            attributes.push((attr_name, value));
        }
    }
}

fn truncate(input: &str) -> &str {
    match input.char_indices().nth(20) {
        Some((i, _)) => &input[..i],
        None => input,
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => {
                    entity[1..].parse().ok().and_then(char::from_u32)
                }
                _ => None,
            };
            c.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Serializes a node and its subtree.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Serializes the children of a node.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for &child in doc.children(id) {
        write_node(doc, child, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        Ok(NodeKind::Text(text)) => escape_into(text, false, out),
        Ok(NodeKind::Element { tag, attributes }) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_TAGS.contains(&tag.as_str()) {
                return;
            }
            for &child in doc.children(id) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        Err(_) => {}
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

impl Document {
    /// Serializes the children of the editable root.
    pub fn inner_html(&self) -> String {
        inner_html(self, self.root())
    }
}
