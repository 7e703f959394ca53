use std::fmt::Debug;

use async_trait::async_trait;

pub use context::*;

use crate::types::GeneratedAsset;
use crate::types::SourceAsset;

mod context;

/// Turns the file behind a source asset into text, e.g. by transpiling a dialect
///
/// Compilers are selected by the extension of the file and fill `asset.body`.
///
#[async_trait]
pub trait Compiler: Debug + Send + Sync {
  async fn compile(&self, asset: &mut SourceAsset, ctx: &PackagerContext) -> anyhow::Result<()>;
}

/// Rewrites the body of a compiled source asset before it is analyzed
#[async_trait]
pub trait Preprocessor: Debug + Send + Sync {
  async fn preprocess(&self, asset: &mut SourceAsset, ctx: &PackagerContext)
    -> anyhow::Result<()>;
}

/// Discovers the dependencies of a compiled source asset
///
/// Analyzers fill `asset.dependencies` with absolute paths and may replace `asset.id`.
///
#[async_trait]
pub trait Analyzer: Debug + Send + Sync {
  async fn analyze(&self, asset: &mut SourceAsset, ctx: &PackagerContext) -> anyhow::Result<()>;
}

/// Merges the expanded assets of a packager into one body
///
/// Linkers that track freshness also set `asset.mtime` to the newest source modification time.
///
#[async_trait]
pub trait Linker: Debug + Send + Sync {
  async fn link(&self, asset: &mut GeneratedAsset, ctx: &PackagerContext) -> anyhow::Result<()>;
}

/// Shrinks a generated body. Options given with the `minify` setting are in `ctx.minify()`.
#[async_trait]
pub trait Minifier: Debug + Send + Sync {
  async fn minify(&self, asset: &mut GeneratedAsset, ctx: &PackagerContext) -> anyhow::Result<()>;
}

/// Post-processes a generated asset; used for both postprocessors and finalizers
#[async_trait]
pub trait Processor: Debug + Send + Sync {
  async fn process(&self, asset: &mut GeneratedAsset, ctx: &PackagerContext)
    -> anyhow::Result<()>;
}
