//! Application layer: recipes and document services
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod recipe;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use recipe::{Recipe, RecipeDocument, RecipeStep, RecipeValue};
