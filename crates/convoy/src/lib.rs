pub use config::*;
pub use copier::*;
pub use descriptor::*;
pub use expand::expand;
pub use packager::*;
pub use pipeline::*;
pub use source_asset_cache::SourceAssetCache;
pub use watch::*;
pub use write::DirectoryCreator;

pub use convoy_core as core;
pub use convoy_filesystem as file_system;
pub use convoy_resolver as resolver;

pub mod presets;
pub mod source_asset_cache;

mod config;
mod copier;
mod descriptor;
mod expand;
mod packager;
mod pipeline;
mod watch;
mod write;

#[cfg(test)]
mod test_utils;
