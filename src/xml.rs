//! A small owned XML document tree.
//!
//! The service's XML answers are tiny and flat, so the tree is built eagerly from
//! `quick-xml` events and then navigated by element name.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("{0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("invalid attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("closing tag </{0}> has no matching opening tag")]
    UnexpectedEnd(String),

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element (second is <{0}>)")]
    MultipleRoots(String),

    #[error("text outside the root element: '{0}'")]
    TextOutsideRoot(String),

    #[error("element or attribute name is not valid UTF-8")]
    NonUtf8Name,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: XmlElement,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlDocument {
    /// Parse a complete, well-formed document.
    pub fn parse(input: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(input);
        reader.trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let element = element_from_start(&e)?;
                    if stack.is_empty() {
                        ensure_single_root(&root, &element)?;
                    }
                    stack.push(element);
                }
                Event::Empty(e) => {
                    let element = element_from_start(&e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => {
                            ensure_single_root(&root, &element)?;
                            root = Some(element);
                        }
                    }
                }
                Event::End(e) => {
                    let name = std::str::from_utf8(e.name().as_ref())
                        .map_err(|_| XmlError::NonUtf8Name)?
                        .to_string();
                    let element = stack.pop().ok_or(XmlError::UnexpectedEnd(name))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    match stack.last_mut() {
                        Some(current) => current.text.push_str(&text),
                        None => return Err(XmlError::TextOutsideRoot(text.into_owned())),
                    }
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    match stack.last_mut() {
                        Some(current) => current.text.push_str(&text),
                        None => return Err(XmlError::TextOutsideRoot(text)),
                    }
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and doctypes carry no data.
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::Unclosed(open.name));
        }

        root.map(|root| Self { root }).ok_or(XmlError::NoRoot)
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn into_root(self) -> XmlElement {
        self.root
    }
}

impl XmlElement {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text content directly inside this element, whitespace-trimmed.
    ///
    /// In mixed content each text fragment is trimmed and the fragments are joined
    /// without a separator: `<a>x <b/> y</a>` yields `"xy"`.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(XmlElement::text)
    }

    /// Follow a `/`-separated path of child names, e.g. `"result/zone"`.
    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |el, name| el.child(name))
    }
}

fn ensure_single_root(root: &Option<XmlElement>, next: &XmlElement) -> Result<(), XmlError> {
    if root.is_some() {
        return Err(XmlError::MultipleRoots(next.name.clone()));
    }
    Ok(())
}

fn element_from_start(e: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|_| XmlError::NonUtf8Name)?
        .to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|_| XmlError::NonUtf8Name)?
            .to_string();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement { name, attributes, text: String::new(), children: Vec::new() })
}
