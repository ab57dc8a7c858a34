//! Module file loading
//!
//! Reads module files from disk, unpacks LHA archives and hands the bytes to
//! [`crate::mod_parser`].

pub mod loader;

pub use loader::ModFileLoader;

use std::path::Path;

use crate::song::Song;
use crate::Result;

/// Convenience function to load and decode a module from disk
pub fn load_file(path: impl AsRef<Path>) -> Result<Song> {
    ModFileLoader::load(path)
}
