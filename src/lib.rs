//! g2tree: schema-ordered builder for NewsML-G2 style item documents
//!
//! Architecture:
//! - `domain`: document tree, schema sequence tables, selector resolver and
//!   the ordered wrapper/property insertion engine
//! - `application`: recipes and the document service
//! - `infrastructure`: filesystem boundary and XML rendering
//! - `cli`: argument parsing and command dispatch
//! - `config`: layered settings

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use domain::{DocumentBuilder, DocumentConfig, DomainError, Outcome, Selector, Variant};
