use std::process::Stdio;

use anyhow::anyhow;
use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Run `command`, optionally feeding `input` through stdin, and return its stdout.
///
/// A non zero exit status is an error carrying whatever the program wrote to stderr.
pub async fn run(mut command: Command, program: &str, input: Option<&str>) -> anyhow::Result<String> {
  command
    .stdin(if input.is_some() {
      Stdio::piped()
    } else {
      Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  let mut child = command
    .spawn()
    .with_context(|| format!("failed to start {program}"))?;

  if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
    let input = input.to_string();
    // Fed concurrently with reading stdout
    tokio::spawn(async move {
      if let Err(error) = stdin.write_all(input.as_bytes()).await {
        tracing::debug!("failed to write to child stdin: {error}");
      }
    });
  }

  let output = child
    .wait_with_output()
    .await
    .with_context(|| format!("failed to run {program}"))?;

  if !output.status.success() {
    return Err(anyhow!(
      "{program} exited with {}: {}",
      output.status,
      String::from_utf8_lossy(&output.stderr).trim()
    ));
  }

  String::from_utf8(output.stdout).with_context(|| format!("{program} produced invalid UTF-8"))
}
