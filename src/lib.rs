//! # class-bytes
//!
//! Looks up compiled class files on a classpath of jars and directories by
//! their source-level name, and enumerates every class the classpath holds.
//!
//! ## Architecture
//!
//! - **naming**: Source name to class file path candidates, and back
//! - **scan**: Directory walking and path separator normalization
//! - **probe**: Memory-mapped jar handles and the lazily filled handle table
//! - **catalog**: Lazy listing of `.class` entries inside a jar
//! - **location**: Per-location classification, lookup and byte suppliers
//! - **repository**: Classpath-wide lookup, enumeration and handle release
//! - **parse**: Normalization of user-supplied class names and content hashing
//! - **cli** / **config** / **logging**: Inspection binary plumbing

pub mod catalog;
pub mod cli;
pub mod config;
pub mod location;
pub mod logging;
pub mod naming;
pub mod parse;
pub mod probe;
pub mod repository;
pub mod scan;

pub use location::{ByteSupplier, Location, LocationId, LocationKind};
pub use repository::{ClassBytesRepository, RepositoryStats};
