//! Archivist - browse ZIP archives as document trees
//!
//! Keeps a bounded cache of opened archives and routes document requests
//! (listings, metadata, contents) to them. Archives open in the background;
//! listings report a loading state until the archive is ready.

pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod id;
pub mod loader;
pub mod local;
pub mod ui;

#[cfg(test)]
mod testing;

pub use coordinator::{ArchivesCoordinator, CoordinatorOptions, Listing, LoadState};
pub use error::{ArchiveError, ArchiveResult};
pub use handle::{ArchiveHandle, ArchiveOpener, ContainerResolver, DocumentRow};
pub use id::{AccessMode, ArchiveId};
