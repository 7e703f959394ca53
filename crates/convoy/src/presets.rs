//! Packager configurations for the common bundle kinds.
//!
//! Each preset returns a builder, so settings can be added or replaced before building:
//!
//! ```
//! let config = convoy::presets::javascript()
//!   .path("app.js")
//!   .main_module("app/main")
//!   .build();
//! assert_eq!(config.content_type, "application/javascript");
//! ```
use std::sync::Arc;

use convoy_core::types::CSS;
use convoy_core::types::JAVASCRIPT;
use convoy_plugin_command::CommandCompiler;
use convoy_plugin_command::CommandMinifier;
use convoy_plugin_commonjs::CommonJsAnalyzer;
use convoy_plugin_commonjs::CommonJsLinker;
use convoy_plugin_generic::CssLinker;
use convoy_plugin_generic::GenericAnalyzer;
use convoy_plugin_generic::GenericCompiler;
use convoy_plugin_generic::SimpleMergeLinker;

use crate::PackagerConfigBuilder;

/// CommonJS modules wrapped for the client runtime, minified with `uglifyjs`
pub fn javascript() -> PackagerConfigBuilder {
  PackagerConfigBuilder::default()
    .content_type(JAVASCRIPT)
    .compiler(".js", Arc::new(GenericCompiler::default()))
    .compiler(".coffee", Arc::new(CommandCompiler::coffee()))
    .analyzer(Arc::new(CommonJsAnalyzer::default()))
    .linker(Arc::new(CommonJsLinker::default()))
    .minifier(Arc::new(CommandMinifier::uglifyjs()))
}

/// Scripts concatenated in `//= require` order
pub fn legacy_javascript() -> PackagerConfigBuilder {
  javascript()
    .analyzer(Arc::new(GenericAnalyzer::default()))
    .linker(Arc::new(SimpleMergeLinker::default()))
}

/// Stylesheets concatenated in `/*= require */` order
pub fn css() -> PackagerConfigBuilder {
  PackagerConfigBuilder::default()
    .content_type(CSS)
    .compiler(".css", Arc::new(GenericCompiler::default()))
    .analyzer(Arc::new(GenericAnalyzer::default()))
    .linker(Arc::new(CssLinker::default()))
}

/// Preset by the name used in pipeline configuration files
pub fn by_name(name: &str) -> Option<PackagerConfigBuilder> {
  match name {
    "javascript" | "js" | "commonjs" => Some(javascript()),
    "legacy_javascript" | "legacy" => Some(legacy_javascript()),
    "css" => Some(css()),
    _ => None,
  }
}
