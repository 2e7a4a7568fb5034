//! Infrastructure layer: I/O implementations, XML rendering and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod di;
pub mod error;
pub mod traits;
pub mod xml;

pub use error::{InfraError, InfraResult};
pub use xml::XmlWriter;
