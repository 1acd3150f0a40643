//! A small owned XML element tree built on top of `quick_xml`'s pull reader.
//!
//! URDF documents are small and the deserializer needs random access (top-level materials are
//! referenced by links that may precede them), so the whole document is read into memory first.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use crate::utils::utils_errors::UrdfSceneError;

#[derive(Clone, Debug, PartialEq)]
pub struct XmlElement {
    name: String,
    attributes: IndexMap<String, String>,
    children: Vec<XmlElement>
}
impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: IndexMap::new(),
            children: vec![]
        }
    }
    /// Reads a complete document and returns its root element.  Comments, processing
    /// instructions, text and the XML declaration are dropped.
    pub fn parse_document(xml: &str) -> Result<XmlElement, UrdfSceneError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = vec![];
        let mut root: Option<XmlElement> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    stack.push(Self::from_bytes_start(e));
                }
                Ok(Event::Empty(ref e)) => {
                    let element = Self::from_bytes_start(e);
                    match stack.last_mut() {
                        Some(parent) => { parent.children.push(element); }
                        None => { if root.is_none() { root = Some(element); } }
                    }
                }
                Ok(Event::End(_)) => {
                    let finished = match stack.pop() {
                        Some(f) => { f }
                        None => { return Err(UrdfSceneError::new_malformed_urdf_error("Unbalanced closing tag.", file!(), line!())) }
                    };
                    match stack.last_mut() {
                        Some(parent) => { parent.children.push(finished); }
                        None => { if root.is_none() { root = Some(finished); } }
                    }
                }
                Ok(Event::Eof) => { break; }
                Ok(_) => {}
                Err(e) => {
                    return Err(UrdfSceneError::new_malformed_urdf_error(&format!("XML parse error at position {}: {}", reader.buffer_position(), e), file!(), line!()));
                }
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(UrdfSceneError::new_malformed_urdf_error(&format!("Unclosed element <{}>.", stack[stack.len() - 1].name), file!(), line!()));
        }

        root.ok_or_else(|| UrdfSceneError::new_malformed_urdf_error("Document has no root element.", file!(), line!()))
    }
    /// Attribute values have their entities decoded; a value with a broken entity is kept
    /// as written.
    fn from_bytes_start(e: &BytesStart) -> Self {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let mut out = Self::new(&name);
        for attr in e.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = match attr.unescape_value() {
                Ok(v) => { v.into_owned() }
                Err(_) => { String::from_utf8_lossy(&attr.value).to_string() }
            };
            out.attributes.insert(key, value);
        }
        out
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }
    pub fn children(&self) -> &Vec<XmlElement> {
        &self.children
    }
    /// Direct children with the given tag, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item=&'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
    pub fn first_child_named(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }
    pub fn add_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }
    pub fn set_attribute(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_tree_with_attributes() {
        let xml = r#"<?xml version="1.0"?>
            <!-- comment -->
            <robot name="r">
                <link name="a"><visual><geometry><box size="1 2 3"/></geometry></visual></link>
                <link name="b"/>
            </robot>"#;
        let root = XmlElement::parse_document(xml).unwrap();
        assert_eq!(root.name(), "robot");
        assert_eq!(root.attribute("name"), Some("r"));
        let links: Vec<_> = root.children_named("link").collect();
        assert_eq!(links.len(), 2);
        let b = links[0].first_child_named("visual").unwrap()
            .first_child_named("geometry").unwrap()
            .first_child_named("box").unwrap();
        assert_eq!(b.attribute("size"), Some("1 2 3"));
        assert_eq!(links[1].attribute("name"), Some("b"));
    }

    #[test]
    fn attribute_entities_are_decoded() {
        let xml = r#"<robot name="r&amp;d"><link name="a &lt;1&gt;"/><mesh filename="x&amp;y.stl" scale="&bogus;"/></robot>"#;
        let root = XmlElement::parse_document(xml).unwrap();
        assert_eq!(root.attribute("name"), Some("r&d"));
        assert_eq!(root.first_child_named("link").unwrap().attribute("name"), Some("a <1>"));
        let mesh = root.first_child_named("mesh").unwrap();
        assert_eq!(mesh.attribute("filename"), Some("x&y.stl"));
        assert_eq!(mesh.attribute("scale"), Some("&bogus;"));
    }

    #[test]
    fn garbage_and_empty_documents_fail() {
        assert!(XmlElement::parse_document("").unwrap_err().is_malformed_urdf_error());
        assert!(XmlElement::parse_document("<robot><link></robot>").is_err());
        assert!(XmlElement::parse_document("<robot>").is_err());
    }
}
