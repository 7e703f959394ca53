pub use commonjs_analyzer::CommonJsAnalyzer;
pub use commonjs_linker::wrap;
pub use commonjs_linker::CommonJsLinker;
pub use loader::GLOBAL_NAME;
pub use loader::LOADER;
pub use registry::*;

mod commonjs_analyzer;
mod commonjs_linker;
mod loader;
mod registry;
mod require_collector;
