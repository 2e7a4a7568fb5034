//! Path selectors over the document arena.
//!
//! A selector is a short XPath-like location path, e.g.
//! `/newsItem/partMeta[@partid='p1']` or `contentSet/remoteContent`.
//! Only child steps with an optional single attribute-equality predicate are
//! supported.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;
use tracing::{instrument, trace};

use crate::domain::arena::{DocumentTree, NodeId};
use crate::domain::error::{DomainError, DomainResult};

/// `prefix:name` with an optional `[@attr='value']` predicate.
const STEP_PATTERN: &str =
    r#"^(?:([A-Za-z_][\w.-]*):)?([A-Za-z_][\w.-]*)(?:\[\s*@([A-Za-z_][\w.:-]*)\s*=\s*(?:'([^']*)'|"([^"]*)")\s*\])?$"#;

/// Prefixes reserved by the XML namespaces recommendation.
const RESERVED_PREFIXES: [&str; 2] = ["xml", "xmlns"];

fn step_regex() -> &'static Result<Regex, regex::Error> {
    static STEP_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    STEP_REGEX.get_or_init(|| Regex::new(STEP_PATTERN))
}

/// Attribute-equality predicate of a step, `[@attribute='value']`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub attribute: String,
    pub value: String,
}

/// One child step of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub prefix: Option<String>,
    pub name: String,
    pub predicate: Option<Predicate>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            name: name.into(),
            predicate: None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{}:", prefix)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(p) = &self.predicate {
            write!(f, "[@{}='{}']", p.attribute, p.value)?;
        }
        Ok(())
    }
}

/// Location path from the document root.
///
/// Absolute selectors name the root element in their first step; relative
/// selectors start at the root's children. A selector without steps denotes
/// the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    absolute: bool,
    steps: Vec<Step>,
}

impl Selector {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Absolute selector whose first step names the root element.
    pub fn absolute(root: impl Into<String>) -> Self {
        Self {
            absolute: true,
            steps: vec![Step::new(root)],
        }
    }

    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.steps.push(Step::new(name));
        self
    }

    /// Child step selecting the instance whose `attribute` equals `value`.
    pub fn keyed(
        mut self,
        name: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut step = Step::new(name);
        step.predicate = Some(Predicate {
            attribute: attribute.into(),
            value: value.into(),
        });
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Parse a location path.
    pub fn parse(expr: &str) -> DomainResult<Self> {
        let trimmed = expr.trim();
        let absolute = trimmed.starts_with('/');
        let body = trimmed.trim_start_matches('/');
        if body.is_empty() {
            return Ok(Self::root());
        }

        let pattern = step_regex().as_ref().map_err(|e| DomainError::InvalidSelector {
            selector: expr.to_string(),
            message: format!("compile step pattern: {e}"),
        })?;
        let mut steps = Vec::new();
        for raw in split_steps(body) {
            let caps = pattern
                .captures(raw.trim())
                .ok_or_else(|| DomainError::InvalidSelector {
                    selector: expr.to_string(),
                    message: format!("malformed step '{}'", raw),
                })?;
            let predicate = caps.get(3).map(|attr| Predicate {
                attribute: attr.as_str().to_string(),
                value: caps
                    .get(4)
                    .or_else(|| caps.get(5))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            });
            steps.push(Step {
                prefix: caps.get(1).map(|m| m.as_str().to_string()),
                name: caps[2].to_string(),
                predicate,
            });
        }
        Ok(Self { absolute, steps })
    }
}

impl FromStr for Selector {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("/");
        }
        if self.absolute {
            f.write_str("/")?;
        }
        write!(f, "{}", self.steps.iter().join("/"))
    }
}

/// Split on `/` outside of predicates; predicate values may contain slashes.
fn split_steps(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match (c, quote) {
            ('\'' | '"', None) if depth > 0 => quote = Some(c),
            (q, Some(open)) if q == open => quote = None,
            ('[', None) => depth += 1,
            (']', None) => depth = depth.saturating_sub(1),
            ('/', None) if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

/// Prefix to namespace URI bindings used to expand selector steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBindings {
    default_prefix: String,
    prefixes: BTreeMap<String, String>,
}

impl NamespaceBindings {
    /// Bindings whose default (unprefixed) namespace is `uri`, bound to `prefix`.
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let mut prefixes = BTreeMap::new();
        prefixes.insert(prefix.clone(), uri.into());
        Self {
            default_prefix: prefix,
            prefixes,
        }
    }

    /// Bind `prefix` to `uri`. The default prefix keeps its namespace and
    /// the reserved `xml`/`xmlns` prefixes cannot be bound.
    pub fn bind(&mut self, prefix: impl Into<String>, uri: impl Into<String>) -> DomainResult<()> {
        let (prefix, uri) = (prefix.into(), uri.into());
        let reject = |message: &str| DomainError::InvalidBinding {
            prefix: prefix.clone(),
            message: message.to_string(),
        };
        if prefix.trim().is_empty() || prefix.contains(':') {
            return Err(reject("not a valid prefix"));
        }
        if RESERVED_PREFIXES.contains(&prefix.to_ascii_lowercase().as_str()) {
            return Err(reject("prefix is reserved"));
        }
        if uri.trim().is_empty() {
            return Err(reject("namespace URI must not be empty"));
        }
        if prefix == self.default_prefix && uri != self.default_namespace() {
            return Err(reject("the schema prefix cannot be rebound"));
        }
        self.prefixes.insert(prefix, uri);
        Ok(())
    }

    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    pub fn default_namespace(&self) -> &str {
        self.prefixes
            .get(&self.default_prefix)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn namespace_of(&self, prefix: Option<&str>) -> Option<&str> {
        let prefix = prefix.unwrap_or(&self.default_prefix);
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Prefix bound to `uri`, if any.
    pub fn prefix_of(&self, uri: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

/// Result of a selector lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeMatch {
    None,
    One(NodeId),
    Many(Vec<NodeId>),
}

impl NodeMatch {
    fn from_nodes(mut nodes: Vec<NodeId>) -> Self {
        match nodes.len() {
            0 => NodeMatch::None,
            1 => NodeMatch::One(nodes.remove(0)),
            _ => NodeMatch::Many(nodes),
        }
    }

    pub fn count(&self) -> usize {
        match self {
            NodeMatch::None => 0,
            NodeMatch::One(_) => 1,
            NodeMatch::Many(nodes) => nodes.len(),
        }
    }
}

/// Evaluates selectors against one tree under one set of namespace bindings.
pub struct Resolver<'a> {
    tree: &'a DocumentTree,
    bindings: &'a NamespaceBindings,
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a DocumentTree, bindings: &'a NamespaceBindings) -> Self {
        Self { tree, bindings }
    }

    #[instrument(level = "trace", skip(self, selector), fields(selector = %selector))]
    pub fn lookup(&self, selector: &Selector) -> DomainResult<NodeMatch> {
        for step in selector.steps() {
            self.namespace_for(step, selector)?;
        }
        let Some(root) = self.tree.root() else {
            return Ok(NodeMatch::None);
        };
        let mut steps = selector.steps();
        let mut current = vec![root];

        if selector.is_absolute() {
            if let Some((first, rest)) = steps.split_first() {
                if !self.step_matches(root, first, selector)? {
                    return Ok(NodeMatch::None);
                }
                steps = rest;
            }
        }

        for step in steps {
            let mut next = Vec::new();
            for &node in &current {
                for &child in self.tree.children(node) {
                    if self.step_matches(child, step, selector)? {
                        next.push(child);
                    }
                }
            }
            trace!("step {} matched {} nodes", step, next.len());
            if next.is_empty() {
                return Ok(NodeMatch::None);
            }
            current = next;
        }
        Ok(NodeMatch::from_nodes(current))
    }

    /// Resolve to exactly one node.
    pub fn lookup_one(&self, selector: &Selector) -> DomainResult<NodeId> {
        match self.lookup(selector)? {
            NodeMatch::One(node) => Ok(node),
            other => Err(DomainError::AmbiguousOrMissingParent {
                selector: selector.to_string(),
                matches: other.count(),
            }),
        }
    }

    /// Children of `parent` named `local` in `namespace`, optionally filtered
    /// by an attribute value.
    pub fn children_named(
        &self,
        parent: NodeId,
        namespace: Option<&str>,
        local: &str,
        identity: Option<(&str, &str)>,
    ) -> Vec<NodeId> {
        self.tree
            .children(parent)
            .iter()
            .copied()
            .filter(|&c| {
                self.tree.element(c).is_some_and(|e| {
                    e.name.matches(namespace, local)
                        && identity.map_or(true, |(attr, value)| e.attribute(attr) == Some(value))
                })
            })
            .collect()
    }

    fn namespace_for(&self, step: &Step, selector: &Selector) -> DomainResult<&'a str> {
        self.bindings
            .namespace_of(step.prefix.as_deref())
            .ok_or_else(|| DomainError::UnknownPrefix {
                selector: selector.to_string(),
                prefix: step.prefix.clone().unwrap_or_default(),
            })
    }

    fn step_matches(&self, node: NodeId, step: &Step, selector: &Selector) -> DomainResult<bool> {
        let namespace = self.namespace_for(step, selector)?;
        let Some(element) = self.tree.element(node) else {
            return Ok(false);
        };
        if !element.name.matches(Some(namespace), &step.name) {
            return Ok(false);
        }
        Ok(step
            .predicate
            .as_ref()
            .map_or(true, |p| element.attribute(&p.attribute) == Some(p.value.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_absolute_path_with_predicate_when_parsing_then_captures_steps() {
        let sel = Selector::parse("/newsItem/nar:partMeta[@partid='p1']").unwrap();

        assert!(sel.is_absolute());
        assert_eq!(sel.steps().len(), 2);
        assert_eq!(sel.steps()[1].prefix.as_deref(), Some("nar"));
        assert_eq!(
            sel.steps()[1].predicate,
            Some(Predicate {
                attribute: "partid".into(),
                value: "p1".into()
            })
        );
        assert_eq!(sel.to_string(), "/newsItem/nar:partMeta[@partid='p1']");
    }

    #[test]
    fn given_slash_inside_predicate_when_parsing_then_not_split() {
        let sel = Selector::parse(r#"contentSet/remoteContent[@residref="http://a/b"]"#).unwrap();

        assert_eq!(sel.steps().len(), 2);
        assert_eq!(sel.steps()[1].predicate.as_ref().unwrap().value, "http://a/b");
    }

    #[test]
    fn given_root_forms_when_parsing_then_no_steps() {
        assert_eq!(Selector::parse("/").unwrap(), Selector::root());
        assert_eq!(Selector::parse("").unwrap(), Selector::root());
        assert_eq!(Selector::root().to_string(), "/");
    }

    #[test]
    fn given_malformed_step_when_parsing_then_invalid_selector() {
        let err = Selector::parse("itemMeta/[bad").unwrap_err();
        assert!(matches!(err, DomainError::InvalidSelector { .. }));
    }

    #[test]
    fn given_fluent_selector_when_displaying_then_matches_parsed_form() {
        let sel = Selector::root()
            .child("contentSet")
            .keyed("remoteContent", "residref", "r1");

        assert_eq!(sel.to_string(), "contentSet/remoteContent[@residref='r1']");
        assert_eq!(Selector::parse(&sel.to_string()).unwrap(), sel);
    }
}
