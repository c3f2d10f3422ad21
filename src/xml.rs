//! Forward-only XML node cursor.
//!
//! Wraps a `quick_xml::Reader` and reports element starts and ends, text and
//! whitespace, while tracking nesting depth, the path of open elements and
//! `xml:space` scoping. A cursor cannot be rewound; reading a part again
//! means opening a new cursor over a fresh stream.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use std::io::BufRead;

/// An element start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    qualified_name: String,
    local_name: String,
    attributes: Vec<(String, String)>,
    depth: usize,
    empty: bool,
}

impl Element {
    /// The name as written, including any namespace prefix.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// The name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Number of enclosing elements; the root element has depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the element was self-closing (`<c/>`).
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Get an attribute value by qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Get an attribute value by local name, ignoring any prefix.
    pub fn attribute_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.rsplit(':').next() == Some(local))
            .map(|(_, value)| value.as_str())
    }

    /// Check if an attribute is present.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

/// A node reported by the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Start(Element),
    /// End of a non-empty element.
    End {
        local_name: String,
        depth: usize,
    },
    Text(String),
    /// Whitespace-only text inside an `xml:space="preserve"` scope.
    SignificantWhitespace(String),
    /// Whitespace-only text that carries no content.
    Whitespace,
    /// Declarations, comments, processing instructions, doctypes.
    Other,
}

impl Node {
    /// Text carried by text and significant whitespace nodes.
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Text(t) | Node::SignificantWhitespace(t) => Some(t),
            _ => None,
        }
    }
}

/// Forward-only cursor over an XML stream.
pub struct XmlCursor<R: BufRead> {
    reader: quick_xml::Reader<R>,
    buf: Vec<u8>,
    path: Vec<String>,
    preserve: Vec<bool>,
    pop_pending: bool,
    finished: bool,
}

impl<R: BufRead> XmlCursor<R> {
    /// Create a cursor positioned before the first node.
    pub fn new(stream: R) -> Self {
        let mut reader = quick_xml::Reader::from_reader(stream);
        reader.config_mut().trim_text(false);

        Self {
            reader,
            buf: Vec::new(),
            path: Vec::new(),
            preserve: Vec::new(),
            pop_pending: false,
            finished: false,
        }
    }

    /// Path of local names from the root to the most recent element start,
    /// e.g. `/worksheet/sheetData/row/c`.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for name in &self.path {
            path.push('/');
            path.push_str(name);
        }
        path
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    fn preserving(&self) -> bool {
        self.preserve.last().copied().unwrap_or(false)
    }

    /// Advance to the next node. Returns `None` at end of stream, and keeps
    /// returning `None` afterwards.
    pub fn next_node(&mut self) -> Result<Option<Node>> {
        if self.finished {
            return Ok(None);
        }

        if self.pop_pending {
            self.pop_pending = false;
            self.path.pop();
            self.preserve.pop();
        }

        let depth = self.path.len();
        let preserving = self.preserving();

        self.buf.clear();
        let event = match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => event,
            Err(e) => {
                self.finished = true;
                return Err(Error::XmlParse(e.to_string()));
            }
        };

        let (node, entered) = match event {
            Event::Start(e) => {
                let (element, preserve) = read_element(&e, depth, false, preserving)?;
                (Node::Start(element), Some(preserve))
            }
            Event::Empty(e) => {
                let (element, preserve) = read_element(&e, depth, true, preserving)?;
                self.pop_pending = true;
                (Node::Start(element), Some(preserve))
            }
            Event::End(e) => {
                let local_name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                self.path.pop();
                self.preserve.pop();
                (
                    Node::End {
                        local_name,
                        depth: depth.saturating_sub(1),
                    },
                    None,
                )
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| Error::XmlParse(err.to_string()))?
                    .into_owned();
                (classify_text(text, preserving), None)
            }
            Event::CData(e) => (Node::Text(String::from_utf8_lossy(&e).into_owned()), None),
            Event::Eof => {
                self.finished = true;
                return Ok(None);
            }
            _ => (Node::Other, None),
        };

        if let (Node::Start(element), Some(preserve)) = (&node, entered) {
            self.path.push(element.local_name.clone());
            self.preserve.push(preserve);
        }

        Ok(Some(node))
    }

    /// Scan forward until `stop` accepts an element start, returning it.
    pub fn advance_to<F>(&mut self, mut stop: F) -> Result<Option<Element>>
    where
        F: FnMut(&Element, &str) -> bool,
    {
        while let Some(node) = self.next_node()? {
            if let Node::Start(element) = node {
                if stop(&element, &self.path()) {
                    return Ok(Some(element));
                }
            }
        }
        Ok(None)
    }

    /// Visit every node inside `start`, stopping after its end tag.
    ///
    /// `start` must be the element most recently returned by the cursor.
    /// The handler receives the node and the path of open elements relative
    /// to `start`.
    pub fn for_each_child<F>(&mut self, start: &Element, mut handler: F) -> Result<()>
    where
        F: FnMut(&Node, &[String]),
    {
        if start.is_empty() {
            return Ok(());
        }

        let base = start.depth() + 1;
        while let Some(node) = self.next_node()? {
            if let Node::End { depth, .. } = &node {
                if *depth == start.depth() {
                    return Ok(());
                }
            }
            let inner = self.path.get(base..).unwrap_or(&[]);
            handler(&node, inner);
        }

        Err(Error::XmlParse(format!(
            "unexpected end of stream inside <{}>",
            start.qualified_name()
        )))
    }

    /// Concatenate all text and significant whitespace inside `start`.
    /// Returns `None` when there is none.
    pub fn read_text_content(&mut self, start: &Element) -> Result<Option<String>> {
        let mut value = String::new();
        self.for_each_child(start, |node, _| {
            if let Some(text) = node.text() {
                value.push_str(text);
            }
        })?;
        Ok(if value.is_empty() { None } else { Some(value) })
    }

    /// Skip the rest of `start`, including its end tag.
    pub fn skip(&mut self, start: &Element) -> Result<()> {
        self.for_each_child(start, |_, _| {})
    }
}

fn classify_text(text: String, preserving: bool) -> Node {
    if text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')) {
        if preserving && !text.is_empty() {
            Node::SignificantWhitespace(text)
        } else {
            Node::Whitespace
        }
    } else {
        Node::Text(text)
    }
}

/// Build an [`Element`] and its `xml:space` preservation flag.
fn read_element(
    e: &BytesStart<'_>,
    depth: usize,
    empty: bool,
    inherited_preserve: bool,
) -> Result<(Element, bool)> {
    let mut attributes = Vec::new();
    let mut preserve = inherited_preserve;

    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::XmlParse(err.to_string()))?
            .into_owned();
        if key == "xml:space" {
            preserve = value == "preserve";
        }
        attributes.push((key, value));
    }

    let element = Element {
        qualified_name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        local_name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        attributes,
        depth,
        empty,
    };

    Ok((element, preserve))
}
