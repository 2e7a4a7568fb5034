/*
Outline rendering for trees defined elsewhere in the crate.
termtree::Tree is foreign, so conversions go through a local trait.
 */
use termtree::Tree;
use tracing::instrument;

use crate::domain::schema::{Cardinality, Schema, Sequence};
use crate::domain::{DocumentTree, NodeId};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

// Implementation of to_tree_string for DocumentTree
impl TreeNodeConvert for DocumentTree {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(doc: &DocumentTree, node_idx: NodeId, parent_tree: &mut Tree<String>) {
            for &child_idx in doc.children(node_idx) {
                if let Some(child) = doc.element(child_idx) {
                    let mut child_tree = Tree::new(child.to_string());
                    build_tree(doc, child_idx, &mut child_tree);
                    parent_tree.push(child_tree);
                }
            }
        }

        match self.root().and_then(|idx| Some((idx, self.element(idx)?))) {
            Some((root_idx, root)) => {
                let mut tree = Tree::new(root.name.local.clone());
                build_tree(self, root_idx, &mut tree);
                tree
            }
            None => Tree::new("Empty tree".to_string()),
        }
    }
}

// Sequence tables of a variant, nested where a child has its own content model
impl TreeNodeConvert for Schema {
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(schema: &Schema, sequence: &Sequence) -> Vec<Tree<String>> {
            sequence
                .slots()
                .iter()
                .map(|slot| {
                    let mut label = match slot.cardinality {
                        Cardinality::Singleton => slot.name.to_string(),
                        Cardinality::Keyed { attribute } => format!("{} [@{}]", slot.name, attribute),
                    };
                    let nested = schema.sequence_for(slot.name);
                    if nested.is_some_and(|s| !s.is_ordered()) {
                        label.push_str(" (any order)");
                    }
                    let leaves = nested
                        .map(|s| build_tree(schema, s))
                        .unwrap_or_default();
                    Tree::new(label).with_leaves(leaves)
                })
                .collect()
        }

        Tree::new(self.root_name().to_string())
            .with_leaves(build_tree(self, self.root_sequence()))
    }
}
