//! XML rendering of document trees with quick-xml.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::instrument;

use crate::domain::{DocumentTree, Element, NamespaceBindings, NodeId};
use crate::infrastructure::{InfraError, InfraResult};

/// Serializes a [`DocumentTree`].
///
/// The default namespace of `bindings` is declared on the root as `xmlns`
/// and its elements are written unprefixed; other bindings are declared as
/// `xmlns:prefix` and used as element prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlWriter {
    /// Spaces per nesting level, 0 for compact output
    pub indent: usize,
    pub declaration: bool,
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self {
            indent: 2,
            declaration: true,
        }
    }
}

impl XmlWriter {
    pub fn new(indent: usize, declaration: bool) -> Self {
        Self {
            indent,
            declaration,
        }
    }

    #[instrument(level = "debug", skip_all, fields(nodes = tree.len()))]
    pub fn render(&self, tree: &DocumentTree, bindings: &NamespaceBindings) -> InfraResult<String> {
        let Some(root) = tree.root() else {
            return Err(InfraError::Xml {
                message: "document has no root element".to_string(),
            });
        };
        let mut writer = if self.indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', self.indent)
        } else {
            Writer::new(Vec::new())
        };
        if self.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(write_err)?;
        }
        write_node(&mut writer, tree, bindings, root, true)?;

        let mut output = String::from_utf8(writer.into_inner()).map_err(|e| InfraError::Xml {
            message: format!("output is not UTF-8: {e}"),
        })?;
        output.push('\n');
        Ok(output)
    }
}

fn write_err(e: impl std::fmt::Display) -> InfraError {
    InfraError::Xml {
        message: format!("write error: {e}"),
    }
}

/// Tag name of `element` under `bindings`, plus an `xmlns` declaration when
/// its namespace has no prefix.
fn tag_name(element: &Element, bindings: &NamespaceBindings) -> (String, Option<String>) {
    match element.name.namespace.as_deref() {
        None => (element.name.local.clone(), None),
        Some(ns) if ns == bindings.default_namespace() => (element.name.local.clone(), None),
        Some(ns) => match bindings.prefix_of(ns) {
            Some(prefix) => (format!("{}:{}", prefix, element.name.local), None),
            None => (element.name.local.clone(), Some(ns.to_string())),
        },
    }
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    tree: &DocumentTree,
    bindings: &NamespaceBindings,
    node: NodeId,
    is_root: bool,
) -> InfraResult<()> {
    let Some(element) = tree.element(node) else {
        return Ok(());
    };
    let (name, own_namespace) = tag_name(element, bindings);
    let mut start = BytesStart::new(name.as_str());
    if is_root {
        start.push_attribute(("xmlns", bindings.default_namespace()));
        for (prefix, uri) in bindings.iter() {
            if uri != bindings.default_namespace() {
                start.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
            }
        }
    }
    if let Some(ns) = &own_namespace {
        start.push_attribute(("xmlns", ns.as_str()));
    }
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let children = tree.children(node);
    if children.is_empty() && element.text.is_none() {
        return writer.write_event(Event::Empty(start)).map_err(write_err);
    }

    writer.write_event(Event::Start(start)).map_err(write_err)?;
    if let Some(text) = &element.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_err)?;
    }
    for &child in children {
        write_node(writer, tree, bindings, child, false)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name.as_str())))
        .map_err(write_err)
}
