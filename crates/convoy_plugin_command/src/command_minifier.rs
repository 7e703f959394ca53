use async_trait::async_trait;
use convoy_core::plugin::Minifier;
use convoy_core::plugin::PackagerContext;
use convoy_core::types::GeneratedAsset;
use tokio::process::Command;

use crate::command;

/// Environment variable holding the minify options as JSON
pub const MINIFY_OPTIONS_VAR: &str = "CONVOY_MINIFY_OPTIONS";

/// Pipes the generated body through `program args...`, e.g. `uglifyjs`
#[derive(Clone, Debug)]
pub struct CommandMinifier {
  program: String,
  args: Vec<String>,
}

impl CommandMinifier {
  pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
    Self {
      program: program.into(),
      args: args.iter().map(|arg| arg.to_string()).collect(),
    }
  }

  pub fn uglifyjs() -> Self {
    Self::new("uglifyjs", &["--compress", "--mangle"])
  }
}

#[async_trait]
impl Minifier for CommandMinifier {
  async fn minify(&self, asset: &mut GeneratedAsset, ctx: &PackagerContext) -> anyhow::Result<()> {
    let options = serde_json::Value::Object(ctx.minify().options().cloned().unwrap_or_default());

    let mut cmd = Command::new(&self.program);
    cmd
      .args(&self.args)
      .env(MINIFY_OPTIONS_VAR, options.to_string());

    asset.body = command::run(cmd, &self.program, Some(&asset.body)).await?;
    Ok(())
  }
}
