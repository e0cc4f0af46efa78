//! Drivers for the outside world
//!
//! - StoreClient / IsqlClient: statement execution through the store's CLI client
//! - VersionSource / GitVersionSource: ontology versions from git tags
//! - RemoteTransfer / ScpTransfer: file upload to a remote store host
//! - RunAfter / RunAfterCommand: hook run after every operation

mod git;
mod hook;
mod isql;
mod transfer;
pub mod version;

pub use git::GitVersionSource;
pub use hook::{RunAfter, RunAfterCommand};
pub use isql::{buffer_size, parse_server_root, ClientOutput, IsqlClient, StoreClient};
pub use transfer::{RemoteTransfer, ScpTransfer};
pub use version::{ontology_from_file, VersionSource};
