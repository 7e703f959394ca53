pub use command_compiler::CommandCompiler;
pub use command_minifier::CommandMinifier;
pub use command_minifier::MINIFY_OPTIONS_VAR;

mod command;
mod command_compiler;
mod command_minifier;
