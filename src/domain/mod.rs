//! Domain layer: document tree, schema tables and the insertion engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod error;
pub mod outcome;
pub mod property;
pub mod schema;
pub mod selector;

pub use arena::{DocumentTree, Element, NodeId, QName, TreeNode};
pub use builder::{DocumentBuilder, DocumentConfig, Ensured};
pub use error::{DomainError, DomainResult};
pub use outcome::Outcome;
pub use property::{
    DateTimeProperty, Headline, Language, Property, PropertyValue, QCodeProperty, Slugline,
    Title, Urgency,
};
pub use schema::{Cardinality, Schema, Sequence, Slot, Variant, CATALOG_REF, NAR_NAMESPACE};
pub use selector::{NamespaceBindings, NodeMatch, Resolver, Selector};
