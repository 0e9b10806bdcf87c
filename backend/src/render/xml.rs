//! Minimal XML tree used by the Atom and geo-metadata renderers.

use std::fmt::Write;

/// Entity for a character that may not appear literally. Quotes only need
/// escaping inside attribute values.
fn entity(ch: char, in_attribute: bool) -> Option<&'static str> {
    match ch {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' if in_attribute => Some("&quot;"),
        '\'' if in_attribute => Some("&#39;"),
        _ => None,
    }
}

fn escape(text: &str, in_attribute: bool) -> String {
    text.chars().fold(String::with_capacity(text.len()), |mut out, ch| {
        match entity(ch, in_attribute) {
            Some(entity) => out.push_str(entity),
            None => out.push(ch),
        }
        out
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with a qualified name, e.g. `eop:shortName`.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Shorthand for an element holding only text.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).text(text)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set an attribute, replacing an earlier value of the same name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    #[cfg(test)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    #[cfg(test)]
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    #[cfg(test)]
    /// First descendant with the given name, searched depth first.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children()
            .find_map(|child| if child.name == name { Some(child) } else { child.find(name) })
    }

    /// Serialize as a standalone document with one element per line.
    pub fn to_document(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{}<{}", indent, self.name);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape(value, true));
        }

        let only_text = self.children.iter().all(|node| matches!(node, Node::Text(_)));
        if self.children.is_empty() {
            out.push_str("/>\n");
        } else if only_text {
            out.push('>');
            for node in &self.children {
                if let Node::Text(text) = node {
                    out.push_str(&escape(text, false));
                }
            }
            let _ = writeln!(out, "</{}>", self.name);
        } else {
            out.push_str(">\n");
            for node in &self.children {
                match node {
                    Node::Element(child) => child.write_pretty(out, depth + 1),
                    Node::Text(text) => {
                        let _ = writeln!(out, "{}  {}", indent, escape(text, false));
                    }
                }
            }
            let _ = writeln!(out, "{}</{}>", indent, self.name);
        }
    }
}
