use async_trait::async_trait;
use convoy_core::plugin::Compiler;
use convoy_core::plugin::PackagerContext;
use convoy_core::types::SourceAsset;
use tokio::process::Command;

use crate::command;

/// Compiles a file by running `program args... <path>` and taking its output as the body,
/// e.g. `coffee -p` for CoffeeScript
#[derive(Clone, Debug)]
pub struct CommandCompiler {
  program: String,
  args: Vec<String>,
}

impl CommandCompiler {
  pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
    Self {
      program: program.into(),
      args: args.iter().map(|arg| arg.to_string()).collect(),
    }
  }

  /// `coffee -p`, printing the compiled JavaScript
  pub fn coffee() -> Self {
    Self::new("coffee", &["-p"])
  }
}

#[async_trait]
impl Compiler for CommandCompiler {
  async fn compile(&self, asset: &mut SourceAsset, _ctx: &PackagerContext) -> anyhow::Result<()> {
    tracing::debug!("compiling {} with {}", asset.path.display(), self.program);

    let mut cmd = Command::new(&self.program);
    cmd.args(&self.args).arg(&asset.path);

    asset.body = command::run(cmd, &self.program, None).await?;
    Ok(())
  }
}
