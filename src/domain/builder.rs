//! Ordered wrapper/property insertion engine.
//!
//! Callers add wrappers and properties in any order; the builder places each
//! new element before the first sibling ranked after it by the parent's
//! schema sequence, so sibling order always matches the schema.

use std::cell::Cell;
use std::collections::BTreeMap;

use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use crate::domain::arena::{DocumentTree, Element, NodeId, QName};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::outcome::Outcome;
use crate::domain::property::{language_tag, Property, PropertyValue};
use crate::domain::schema::{Cardinality, Schema, Variant, CATALOG_REF};
use crate::domain::selector::{NamespaceBindings, NodeMatch, Resolver, Selector};

/// Value of the root `standard` attribute.
pub const STANDARD: &str = "NewsML-G2";
pub const DEFAULT_STANDARD_VERSION: &str = "2.29";
pub const DEFAULT_CONFORMANCE: &str = "power";

/// Construction parameters of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentConfig {
    pub variant: Variant,
    pub guid: String,
    pub version: u32,
    pub standard_version: String,
    pub conformance: String,
    /// Catalog references added to the skeleton, in document order
    pub catalogs: Vec<String>,
}

impl DocumentConfig {
    /// Config with a generated `urn:uuid:` guid and version 1.
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            guid: format!("urn:uuid:{}", Uuid::new_v4()),
            version: 1,
            standard_version: DEFAULT_STANDARD_VERSION.to_string(),
            conformance: DEFAULT_CONFORMANCE.to_string(),
            catalogs: Vec::new(),
        }
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = guid.into();
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_catalog(mut self, href: impl Into<String>) -> Self {
        self.catalogs.push(href.into());
        self
    }
}

/// Wrapper handle returned by [`DocumentBuilder::ensure_wrapper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ensured {
    pub node: NodeId,
    /// False when an existing wrapper was reused
    pub created: bool,
}

/// Builds one document of one variant.
///
/// Every public operation either completes its insertion or leaves the tree
/// untouched, and records its classification in [`DocumentBuilder::outcome`].
#[derive(Debug)]
pub struct DocumentBuilder {
    schema: &'static Schema,
    bindings: NamespaceBindings,
    tree: DocumentTree,
    root: NodeId,
    outcome: Cell<Outcome>,
}

impl DocumentBuilder {
    #[instrument(level = "debug", skip(config), fields(variant = %config.variant))]
    pub fn new(config: &DocumentConfig) -> Self {
        let schema = Schema::for_variant(config.variant);
        let mut root_element =
            Element::new(QName::new(Some(schema.namespace), schema.root_name()));
        if !config.guid.trim().is_empty() {
            root_element.attributes.insert("guid".to_string(), config.guid.clone());
        }
        if config.version > 0 {
            root_element
                .attributes
                .insert("version".to_string(), config.version.to_string());
        }
        let root_element = root_element
            .with_attribute("standard", STANDARD)
            .with_attribute("standardversion", config.standard_version.clone())
            .with_attribute("conformance", config.conformance.clone());
        let mut tree = DocumentTree::new();
        let root = tree.insert_root(root_element);

        let mut builder = Self {
            schema,
            bindings: NamespaceBindings::new(schema.prefix, schema.namespace),
            tree,
            root,
            outcome: Cell::new(Outcome::Ok),
        };
        // Each catalog reference is prepended, so add them last to first.
        for href in config.catalogs.iter().rev() {
            if let Err(e) = builder.prepend_catalog_ref(href) {
                warn!("skipping configured catalog: {}", e);
            }
        }
        builder
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn bindings(&self) -> &NamespaceBindings {
        &self.bindings
    }

    /// Bind an extra prefix for selectors and rendering.
    #[instrument(level = "debug", skip_all)]
    pub fn bind_namespace(
        &mut self,
        prefix: impl Into<String>,
        uri: impl Into<String>,
    ) -> DomainResult<()> {
        self.outcome.set(Outcome::Ok);
        let result = self.bindings.bind(prefix, uri);
        self.track(result)
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn into_tree(self) -> DocumentTree {
        self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Classification of the most recent public operation.
    pub fn outcome(&self) -> Outcome {
        self.outcome.get()
    }

    /// Find or create the wrapper `name` under the single node matched by
    /// `parent`. Repeatable wrappers are addressed by `key`.
    #[instrument(level = "debug", skip(self, parent), fields(parent = %parent))]
    pub fn ensure_wrapper(
        &mut self,
        parent: &Selector,
        name: &str,
        key: Option<&str>,
    ) -> DomainResult<Ensured> {
        self.outcome.set(Outcome::Ok);
        let result = self
            .resolve_one(parent)
            .and_then(|parent_id| self.ensure_in(parent_id, name, key));
        self.track(result)
    }

    /// Append `property` to the wrapper `wrapper` directly under the root,
    /// creating the wrapper when absent.
    pub fn add_property<P: Property + ?Sized>(
        &mut self,
        wrapper: &str,
        key: Option<&str>,
        property: &P,
    ) -> DomainResult<NodeId> {
        self.add_property_in(&Selector::root(), wrapper, key, property)
    }

    /// Like [`add_property`](Self::add_property), with the wrapper's parent
    /// given by `parent`.
    #[instrument(level = "debug", skip(self, parent, property), fields(parent = %parent, property = property.element_name()))]
    pub fn add_property_in<P: Property + ?Sized>(
        &mut self,
        parent: &Selector,
        wrapper: &str,
        key: Option<&str>,
        property: &P,
    ) -> DomainResult<NodeId> {
        self.outcome.set(Outcome::Ok);
        let result = self
            .resolve_one(parent)
            .and_then(|parent_id| self.ensure_in(parent_id, wrapper, key))
            .and_then(|ensured| self.insert_property(ensured.node, property));
        self.track(result)
    }

    /// Insert `property` directly under the existing node matched by `target`.
    #[instrument(level = "debug", skip(self, target, property), fields(target = %target, property = property.element_name()))]
    pub fn add_property_under<P: Property + ?Sized>(
        &mut self,
        target: &Selector,
        property: &P,
    ) -> DomainResult<NodeId> {
        self.outcome.set(Outcome::Ok);
        let result = self
            .resolve_one(target)
            .and_then(|target_id| self.insert_property(target_id, property));
        self.track(result)
    }

    /// Add a catalog reference as the first child of the root. A reference
    /// with the same `href` is reused.
    #[instrument(level = "debug", skip(self))]
    pub fn add_catalog_ref(&mut self, href: &str) -> DomainResult<Ensured> {
        self.outcome.set(Outcome::Ok);
        let result = self.prepend_catalog_ref(href);
        self.track(result)
    }

    /// Set `xml:lang` on the root element.
    #[instrument(level = "debug", skip(self))]
    pub fn set_root_lang(&mut self, tag: &str) -> DomainResult<()> {
        self.outcome.set(Outcome::Ok);
        let result = language_tag("xml:lang", tag).and_then(|tag| {
            let root = self
                .tree
                .get_node_mut(self.root)
                .ok_or_else(|| DomainError::NotFound(self.schema.root_name().to_string()))?;
            root.data
                .attributes
                .insert("xml:lang".to_string(), tag.to_string());
            Ok(())
        });
        self.track(result)
    }

    /// Ensure the wrapper `name` under `parent`, then set `attributes` on it.
    ///
    /// The identity attribute of a keyed wrapper cannot be changed here.
    /// Fails with [`DomainError::NotFound`] when the wrapper cannot be read
    /// back after ensuring it.
    #[instrument(level = "debug", skip(self, parent, attributes), fields(parent = %parent))]
    pub fn set_wrapper_attributes(
        &mut self,
        parent: &Selector,
        name: &str,
        key: Option<&str>,
        attributes: &BTreeMap<String, String>,
    ) -> DomainResult<Ensured> {
        self.outcome.set(Outcome::Ok);
        let result = self.resolve_one(parent).and_then(|parent_id| {
            let identity = self.identity_for(parent_id, name, key)?;
            check_wrapper_attributes(name, identity, attributes)?;
            let ensured = self.ensure_in(parent_id, name, key)?;
            let node = self
                .tree
                .get_node_mut(ensured.node)
                .ok_or_else(|| DomainError::NotFound(describe(parent, name, identity)))?;
            node.data
                .attributes
                .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(ensured)
        });
        self.track(result)
    }

    /// Ensure the `partMeta` wrapper `part_id` under the root and set its
    /// `seq` and `contentrefs` attributes.
    pub fn add_part_meta(
        &mut self,
        part_id: &str,
        seq: Option<u32>,
        contentrefs: Option<&str>,
    ) -> DomainResult<Ensured> {
        let mut attributes = BTreeMap::new();
        if let Some(seq) = seq {
            attributes.insert("seq".to_string(), seq.to_string());
        }
        if let Some(refs) = contentrefs {
            attributes.insert("contentrefs".to_string(), refs.to_string());
        }
        self.set_wrapper_attributes(&Selector::root(), "partMeta", Some(part_id), &attributes)
    }

    /// Look up `selector` without classifying the result.
    pub fn lookup(&self, selector: &Selector) -> DomainResult<NodeMatch> {
        Resolver::new(&self.tree, &self.bindings).lookup(selector)
    }

    /// Read back the single node matched by `selector`.
    pub fn find(&self, selector: &Selector) -> DomainResult<NodeId> {
        self.outcome.set(Outcome::Ok);
        let result = self.lookup(selector).and_then(|m| match m {
            NodeMatch::One(node) => Ok(node),
            NodeMatch::None => Err(DomainError::NotFound(selector.to_string())),
            NodeMatch::Many(nodes) => Err(DomainError::AmbiguousOrMissingParent {
                selector: selector.to_string(),
                matches: nodes.len(),
            }),
        });
        self.track(result)
    }

    /// Read back an existing wrapper without creating it.
    pub fn wrapper(&self, parent: &Selector, name: &str, key: Option<&str>) -> DomainResult<NodeId> {
        self.outcome.set(Outcome::Ok);
        let result = self.resolve_one(parent).and_then(|parent_id| {
            let identity = self.identity_for(parent_id, name, key)?;
            let found = Resolver::new(&self.tree, &self.bindings).children_named(
                parent_id,
                Some(self.schema.namespace),
                name,
                identity,
            );
            match found.as_slice() {
                [node] => Ok(*node),
                [] => Err(DomainError::NotFound(describe(parent, name, identity))),
                many => Err(DomainError::AmbiguousOrMissingParent {
                    selector: describe(parent, name, identity),
                    matches: many.len(),
                }),
            }
        });
        self.track(result)
    }

    fn track<T>(&self, result: DomainResult<T>) -> DomainResult<T> {
        match &result {
            Ok(_) => self.outcome.set(Outcome::Ok),
            Err(e) => {
                debug!("operation failed: {}", e);
                self.outcome.set(e.outcome());
            }
        }
        result
    }

    fn resolve_one(&self, selector: &Selector) -> DomainResult<NodeId> {
        Resolver::new(&self.tree, &self.bindings).lookup_one(selector)
    }

    fn local_name(&self, node: NodeId) -> Option<&str> {
        self.tree
            .element(node)
            .filter(|e| e.name.namespace.as_deref() == Some(self.schema.namespace))
            .map(|e| e.name.local.as_str())
    }

    /// Identity predicate for `name` under `parent`, validating the key of
    /// repeatable wrappers.
    fn identity_for<'k>(
        &self,
        parent: NodeId,
        name: &str,
        key: Option<&'k str>,
    ) -> DomainResult<Option<(&'static str, &'k str)>> {
        let cardinality = match self.local_name(parent) {
            Some(parent_name) => self.schema.cardinality(parent_name, name),
            None => Cardinality::Singleton,
        };
        match cardinality.identity_attribute() {
            Some(attribute) => key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(|k| Some((attribute, k)))
                .ok_or_else(|| DomainError::MissingIdentityKey {
                    wrapper: name.to_string(),
                    attribute: attribute.to_string(),
                }),
            None => {
                if let Some(key) = key {
                    trace!("ignoring key '{}' for singleton wrapper {}", key, name);
                }
                Ok(None)
            }
        }
    }

    fn ensure_in(&mut self, parent: NodeId, name: &str, key: Option<&str>) -> DomainResult<Ensured> {
        let identity = self.identity_for(parent, name, key)?;
        let existing = Resolver::new(&self.tree, &self.bindings).children_named(
            parent,
            Some(self.schema.namespace),
            name,
            identity,
        );
        match existing.as_slice() {
            [node] => {
                trace!("reusing wrapper {}", name);
                return Ok(Ensured {
                    node: *node,
                    created: false,
                });
            }
            [] => {}
            many => {
                return Err(DomainError::AmbiguousOrMissingParent {
                    selector: describe(&self.path_of(parent), name, identity),
                    matches: many.len(),
                })
            }
        }

        let mut element = Element::new(QName::new(Some(self.schema.namespace), name));
        if let Some((attribute, key)) = identity {
            element.attributes.insert(attribute.to_string(), key.to_string());
        }
        let node = self.insert_ordered(parent, element)?;
        debug!("created wrapper {}", name);
        Ok(Ensured {
            node,
            created: true,
        })
    }

    /// Position for a new child `name`: before the first sibling ranked after
    /// it, else at the end. Unranked names always go to the end.
    fn insertion_index(&self, parent: NodeId, name: &str) -> usize {
        let children = self.tree.children(parent);
        let sequence = self
            .local_name(parent)
            .and_then(|parent_name| self.schema.sequence_for(parent_name));
        let Some(sequence) = sequence else {
            return children.len();
        };
        let Some(rank) = sequence.position_of(name) else {
            return children.len();
        };
        children
            .iter()
            .position(|&c| {
                self.local_name(c)
                    .and_then(|sibling| sequence.position_of(sibling))
                    .is_some_and(|sibling_rank| sibling_rank > rank)
            })
            .unwrap_or(children.len())
    }

    fn insert_ordered(&mut self, parent: NodeId, element: Element) -> DomainResult<NodeId> {
        let index = if element.name.namespace.as_deref() == Some(self.schema.namespace) {
            self.insertion_index(parent, &element.name.local)
        } else {
            self.tree.children(parent).len()
        };
        trace!("inserting {} at {}", element.name.local, index);
        let name = element.name.local.clone();
        self.tree
            .insert_child(parent, index, element)
            .ok_or(DomainError::NotFound(name))
    }

    fn insert_property<P: Property + ?Sized>(
        &mut self,
        parent: NodeId,
        property: &P,
    ) -> DomainResult<NodeId> {
        let node = self.insert_value(
            parent,
            property.element_name(),
            property.attributes(),
            property.text().map(str::to_string),
        )?;
        for child in property.children() {
            self.insert_child_value(node, &child)?;
        }
        Ok(node)
    }

    fn insert_child_value(&mut self, parent: NodeId, value: &PropertyValue) -> DomainResult<()> {
        let node = self.insert_value(
            parent,
            value.element_name(),
            value.attributes(),
            value.text().map(str::to_string),
        )?;
        for child in value.children() {
            self.insert_child_value(node, &child)?;
        }
        Ok(())
    }

    fn insert_value(
        &mut self,
        parent: NodeId,
        name: &str,
        attributes: BTreeMap<String, String>,
        text: Option<String>,
    ) -> DomainResult<NodeId> {
        let mut element = Element::new(QName::new(Some(self.schema.namespace), name));
        element.attributes = attributes;
        element.text = text;
        self.insert_ordered(parent, element)
    }

    fn prepend_catalog_ref(&mut self, href: &str) -> DomainResult<Ensured> {
        if href.trim().is_empty() {
            return Err(DomainError::InvalidValue {
                property: CATALOG_REF.to_string(),
                message: "href must not be empty".to_string(),
            });
        }
        let existing = Resolver::new(&self.tree, &self.bindings).children_named(
            self.root,
            Some(self.schema.namespace),
            CATALOG_REF,
            Some(("href", href)),
        );
        if let Some(&node) = existing.first() {
            return Ok(Ensured {
                node,
                created: false,
            });
        }
        let element = Element::new(QName::new(Some(self.schema.namespace), CATALOG_REF))
            .with_attribute("href", href);
        let node = self
            .tree
            .insert_child(self.root, 0, element)
            .ok_or_else(|| DomainError::NotFound(CATALOG_REF.to_string()))?;
        Ok(Ensured {
            node,
            created: true,
        })
    }

    /// Absolute selector addressing `node`, keyed where its parent declares
    /// an identity attribute.
    pub fn path_of(&self, node: NodeId) -> Selector {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(idx) = current {
            let Some(tree_node) = self.tree.get_node(idx) else {
                break;
            };
            chain.push(idx);
            current = tree_node.parent;
        }
        chain.reverse();

        let mut selector = Selector::root();
        let mut parent_name: Option<&str> = None;
        for (depth, &idx) in chain.iter().enumerate() {
            let Some(element) = self.tree.element(idx) else {
                break;
            };
            let local = element.name.local.as_str();
            if depth == 0 {
                selector = Selector::absolute(local);
            } else {
                let identity = parent_name
                    .map(|p| self.schema.cardinality(p, local))
                    .and_then(|c| c.identity_attribute())
                    .and_then(|attr| element.attribute(attr).map(|v| (attr, v)));
                selector = match identity {
                    Some((attr, value)) => selector.keyed(local, attr, value),
                    None => selector.child(local),
                };
            }
            parent_name = Some(local);
        }
        selector
    }
}

/// Attributes settable on a wrapper: no namespace declarations, and the
/// identity attribute keeps its key.
fn check_wrapper_attributes(
    wrapper: &str,
    identity: Option<(&str, &str)>,
    attributes: &BTreeMap<String, String>,
) -> DomainResult<()> {
    for (name, value) in attributes {
        let invalid = |message: String| DomainError::InvalidValue {
            property: format!("{}@{}", wrapper, name),
            message,
        };
        if name.trim().is_empty() || name == "xmlns" || name.starts_with("xmlns:") {
            return Err(invalid("not a settable attribute name".to_string()));
        }
        if let Some((attribute, key)) = identity {
            if name == attribute && value != key {
                return Err(invalid(format!("identity attribute is fixed to '{}'", key)));
            }
        }
    }
    Ok(())
}

fn describe(parent: &Selector, name: &str, identity: Option<(&str, &str)>) -> String {
    match identity {
        Some((attribute, key)) => parent.clone().keyed(name, attribute, key).to_string(),
        None => parent.clone().child(name).to_string(),
    }
}
