pub use css_linker::CssLinker;
pub use generic_analyzer::GenericAnalyzer;
pub use generic_compiler::GenericCompiler;
pub use simple_merge_linker::SimpleMergeLinker;

mod css_linker;
mod generic_analyzer;
mod generic_compiler;
mod simple_merge_linker;

#[cfg(test)]
pub(crate) mod test_utils;
