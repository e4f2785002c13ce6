//! HTML fragment tree for post-processing rendered output
//!
//! Sanitized preview HTML is parsed with html5ever into an rcdom tree so
//! image nodes can be decorated or replaced and embedded frames dropped,
//! then serialized back out.

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// A parsed HTML fragment
pub struct Fragment {
    /// Owning document; rcdom empties subtrees when their document drops
    _document: Handle,
    /// Element whose children are the fragment's top-level nodes
    root: Handle,
}

impl Fragment {
    /// Parse an HTML fragment
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        let root = find_first(&dom.document, "body").unwrap_or_else(|| dom.document.clone());
        Self {
            _document: dom.document,
            root,
        }
    }

    /// Container of the top-level nodes
    pub fn root(&self) -> &Handle {
        &self.root
    }

    /// All elements with tag `tag`, in document order
    pub fn elements(&self, tag: &str) -> Vec<Handle> {
        let mut found = Vec::new();
        collect_elements(&self.root, &|name| name == tag, &mut found);
        found
    }

    /// All elements whose tag is in `tags`, in document order
    pub fn elements_in(&self, tags: &[&str]) -> Vec<Handle> {
        let mut found = Vec::new();
        collect_elements(&self.root, &|name| tags.contains(&name), &mut found);
        found
    }

    /// Serialize the fragment back to HTML
    pub fn to_html(&self) -> io::Result<String> {
        let mut out = Vec::new();
        let handle: SerializableHandle = self.root.clone().into();
        serialize(
            &mut out,
            &handle,
            SerializeOpts {
                traversal_scope: TraversalScope::ChildrenOnly(None),
                ..Default::default()
            },
        )?;
        String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn collect_elements(node: &Handle, matches: &dyn Fn(&str) -> bool, out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if let Some(name) = tag_name(child) {
            if matches(&name) {
                out.push(child.clone());
            }
        }
        collect_elements(child, matches, out);
    }
}

fn find_first(node: &Handle, tag: &str) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if tag_name(child).as_deref() == Some(tag) {
            return Some(child.clone());
        }
        if let Some(found) = find_first(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Local tag name of an element node
pub fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

/// Value of attribute `name` on an element node
pub fn attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref() == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Append `class` to an element's class list
pub fn add_class(node: &Handle, class: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| a.name.local.as_ref() == "class") {
            Some(existing) => {
                let joined = format!("{} {}", existing.value, class);
                existing.value = StrTendril::from(joined);
            }
            None => attrs.push(Attribute {
                name: QualName::new(None, Namespace::from(""), LocalName::from("class")),
                value: StrTendril::from(class),
            }),
        }
    }
}

/// Text content of a node and its descendants
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    push_text(node, &mut out);
    out
}

fn push_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                push_text(child, out);
            }
        }
    }
}

/// Build a detached element with attributes and a single text child
pub fn new_element(tag: &str, attrs: &[(&str, &str)], text: &str) -> Handle {
    let element = Node::new(NodeData::Element {
        name: QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag)),
        attrs: RefCell::new(
            attrs
                .iter()
                .map(|(k, v)| Attribute {
                    name: QualName::new(None, Namespace::from(""), LocalName::from(*k)),
                    value: StrTendril::from(*v),
                })
                .collect(),
        ),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });
    if !text.is_empty() {
        let text_node = Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from(text)),
        });
        text_node.parent.set(Some(Rc::downgrade(&element)));
        element.children.borrow_mut().push(text_node);
    }
    element
}

fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

/// Put `replacement` where `node` is; false if `node` is detached
pub fn replace(node: &Handle, replacement: Handle) -> bool {
    let Some(parent) = parent_of(node) else {
        return false;
    };
    let mut children = parent.children.borrow_mut();
    match children.iter().position(|c| Rc::ptr_eq(c, node)) {
        Some(index) => {
            replacement.parent.set(Some(Rc::downgrade(&parent)));
            node.parent.set(None);
            children[index] = replacement;
            true
        }
        None => false,
    }
}

/// Detach `node` from the tree; false if already detached
pub fn remove(node: &Handle) -> bool {
    let Some(parent) = parent_of(node) else {
        return false;
    };
    let mut children = parent.children.borrow_mut();
    let before = children.len();
    children.retain(|c| !Rc::ptr_eq(c, node));
    node.parent.set(None);
    children.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_fragment() {
        let fragment = Fragment::parse("<p>Hello <strong>world</strong></p>");
        assert_eq!(fragment.to_html().unwrap(), "<p>Hello <strong>world</strong></p>");
    }

    #[test]
    fn test_elements_in_document_order() {
        let fragment = Fragment::parse(r#"<p><img src="a.png"></p><div><img src="b.png"></div>"#);
        let srcs: Vec<_> = fragment
            .elements("img")
            .iter()
            .filter_map(|n| attr(n, "src"))
            .collect();
        assert_eq!(srcs, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_replace_and_remove() {
        let fragment = Fragment::parse(r#"<p>x<img src="a.png">y</p><iframe src="v"></iframe>"#);
        let img = fragment.elements("img").remove(0);
        assert!(replace(&img, new_element("span", &[("class", "ph")], "[a.png]")));
        for frame in fragment.elements_in(&["iframe"]) {
            assert!(remove(&frame));
        }

        let html = fragment.to_html().unwrap();
        assert_eq!(html, r#"<p>x<span class="ph">[a.png]</span>y</p>"#);
        assert!(!replace(&img, new_element("b", &[], "")));
    }

    #[test]
    fn test_add_class() {
        let fragment = Fragment::parse(r#"<img src="a.png"><img class="big" src="b.png">"#);
        for img in fragment.elements("img") {
            add_class(&img, "image-pending");
        }
        let html = fragment.to_html().unwrap();
        assert!(html.contains(r#"<img src="a.png" class="image-pending">"#));
        assert!(html.contains(r#"class="big image-pending""#));
    }

    #[test]
    fn test_text_content() {
        let fragment = Fragment::parse("<p>a <em>b</em> c</p>");
        assert_eq!(text_content(fragment.root()), "a b c");
    }
}
