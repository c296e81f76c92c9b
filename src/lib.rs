pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod metadata;
pub mod model;
pub mod report;
pub mod resolver;

// Re-export commonly used items
pub use error::{MetadataFetchError, ResolutionError};
pub use model::{Conflict, Dependency, DependencyKind, PackageVersion, Plan, Report, Selection, Source};
