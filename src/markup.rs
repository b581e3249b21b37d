//! Minimal shape-list view of SVG markup.
//!
//! The document is split into shape elements and the raw text around them. Everything
//! that is not a shape is written back byte for byte, so rewriting fills never touches
//! geometry, ids or unrelated text. Attribute values are kept in their escaped source
//! form.

use std::fmt;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::{VectorizeError, VectorizeResult};

/// Element names treated as shapes.
pub const SHAPE_ELEMENTS: &[&str] = &[
    "path", "rect", "circle", "ellipse", "polygon", "polyline", "line",
];

/// Containers whose children are never painted directly.
const NON_RENDERING_CONTAINERS: &[&str] = &[
    "defs", "clipPath", "mask", "pattern", "marker", "symbol",
];

pub const FILL: &str = "fill";
pub const FILL_OPACITY: &str = "fill-opacity";

/// A single shape element with its attributes in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    tag: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

impl Shape {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn fill(&self) -> Option<&str> {
        self.attribute(FILL)
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Replace `old` with `new = value` at the same position, dropping any other `new`.
    pub fn replace_attribute(&mut self, old: &str, new: &str, value: impl Into<String>) {
        let Some(pos) = self.attributes.iter().position(|(key, _)| key == old) else {
            self.set_attribute(new, value);
            return;
        };
        self.attributes.retain(|(key, _)| key != new || key == old);
        let pos = self
            .attributes
            .iter()
            .position(|(key, _)| key == old)
            .unwrap_or(pos);
        self.attributes[pos] = (new.to_string(), value.into());
    }

    fn from_start(start: &BytesStart<'_>, self_closing: bool) -> VectorizeResult<Self> {
        let tag = utf8(start.name().as_ref())?.to_string();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| VectorizeError::Markup(e.to_string()))?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let value = utf8(&attr.value)?.to_string();
            attributes.push((key, value));
        }
        Ok(Self {
            tag,
            attributes,
            self_closing,
        })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (key, value) in &self.attributes {
            if value.contains('"') {
                write!(f, " {key}='{value}'")?;
            } else {
                write!(f, " {key}=\"{value}\"")?;
            }
        }
        f.write_str(if self.self_closing { "/>" } else { ">" })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Raw(String),
    Shape(usize),
}

/// Parsed markup: shapes in document order plus the untouched text between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgDocument {
    nodes: Vec<Node>,
    shapes: Vec<Shape>,
}

impl SvgDocument {
    pub fn parse(text: &str) -> VectorizeResult<Self> {
        let mut reader = Reader::from_str(text);
        let mut nodes = Vec::new();
        let mut shapes = Vec::new();
        let mut raw_start = 0usize;
        // open non-rendering containers around the current position
        let mut hidden_depth = 0usize;

        loop {
            let event_start = reader.buffer_position() as usize;
            let event = reader
                .read_event()
                .map_err(|e| VectorizeError::Markup(format!("{e} (near byte {event_start})")))?;
            let (start, self_closing) = match &event {
                Event::Empty(start) => (start, true),
                Event::Start(start) => (start, false),
                Event::End(end) => {
                    if NON_RENDERING_CONTAINERS.contains(&utf8(end.local_name().as_ref())?) {
                        hidden_depth = hidden_depth.saturating_sub(1);
                    }
                    continue;
                }
                Event::Eof => break,
                _ => continue,
            };
            let name = utf8(start.local_name().into_inner())?;
            if !self_closing && NON_RENDERING_CONTAINERS.contains(&name) {
                hidden_depth += 1;
                continue;
            }
            if hidden_depth > 0 || !SHAPE_ELEMENTS.contains(&name) {
                continue;
            }

            let shape = Shape::from_start(start, self_closing)?;
            if raw_start < event_start {
                nodes.push(Node::Raw(text[raw_start..event_start].to_string()));
            }
            nodes.push(Node::Shape(shapes.len()));
            shapes.push(shape);
            raw_start = reader.buffer_position() as usize;
        }

        if raw_start < text.len() {
            nodes.push(Node::Raw(text[raw_start..].to_string()));
        }

        Ok(Self { nodes, shapes })
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shapes_mut(&mut self) -> &mut [Shape] {
        &mut self.shapes
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }
}

impl fmt::Display for SvgDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            match node {
                Node::Raw(text) => f.write_str(text)?,
                Node::Shape(index) => write!(f, "{}", self.shapes[*index])?,
            }
        }
        Ok(())
    }
}

fn utf8(bytes: &[u8]) -> VectorizeResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| VectorizeError::Markup(e.to_string()))
}
