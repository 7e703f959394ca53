use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use convoy::core::events::Event;
use convoy::file_system::os_file_system::OsFileSystem;
use convoy::file_system::FileSystemRef;
use convoy::load_pipeline_config;
use convoy::NotifyWatcher;
use convoy::Pipeline;
use convoy_monitoring::MonitoringOptions;
use convoy_monitoring::TracerMode;
use tokio::sync::mpsc;
use tracing::error;
use tracing::info;

#[derive(Parser)]
struct Args {
  #[arg(short, long, default_value = "convoy.json")]
  config: PathBuf,

  #[arg(short, long, default_value = "dist")]
  out: PathBuf,

  /// Rebuild when a source file changes
  #[arg(short, long)]
  watch: bool,

  /// Output paths to write. Everything when empty.
  #[arg(trailing_var_arg = true)]
  targets: Vec<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
  initialize_tracing();

  info!("This is a testing binary for the pipeline and writes every target to disk.");

  let args = Args::parse();
  let result = run(args).await;
  convoy_monitoring::close_monitoring();

  if let Err(e) = result {
    error!("Failed to run convoy: {e}");
    std::process::exit(1);
  }
}

async fn run(args: Args) -> anyhow::Result<()> {
  let fs: FileSystemRef = Arc::new(OsFileSystem);
  let pipeline = Pipeline::new(fs.clone(), Arc::new(NotifyWatcher::default()));

  for (path, target) in load_pipeline_config(&fs, &args.config)? {
    let target = if args.watch {
      target.with_watch(true)
    } else {
      target
    };
    pipeline.add(path, target)?;
  }

  let (changes, mut changed) = mpsc::unbounded_channel();
  pipeline.subscribe(move |event| {
    if *event == Event::Invalidate {
      let _ = changes.send(());
    }
  });

  write(&pipeline, &args.targets, &args.out).await?;

  if !args.watch {
    return Ok(());
  }

  info!("Watching for changes");
  while changed.recv().await.is_some() {
    // Editors tend to save in bursts
    tokio::time::sleep(Duration::from_millis(100)).await;
    while changed.try_recv().is_ok() {}

    if let Err(e) = write(&pipeline, &args.targets, &args.out).await {
      error!("Rebuild failed: {e}");
    }
  }

  Ok(())
}

async fn write(pipeline: &Pipeline, targets: &[String], out: &Path) -> anyhow::Result<()> {
  let written = if targets.is_empty() {
    pipeline.write_all(out).await?
  } else {
    let writes = targets.iter().map(|path| pipeline.write_file(path, out));
    futures::future::try_join_all(writes).await?
  };

  info!("Wrote {} files to {}", written.len(), out.display());
  Ok(())
}

fn initialize_tracing() {
  if std::env::var("RUST_LOG").is_err() {
    std::env::set_var("RUST_LOG", "info");
  }

  let mut options = MonitoringOptions::from_env().unwrap_or_else(|e| {
    eprintln!("Ignoring tracing configuration: {e}");
    MonitoringOptions {
      tracing_options: Vec::new(),
    }
  });

  if options.tracing_options.is_empty() {
    options.tracing_options.push(TracerMode::Stdout);
  }

  if let Err(e) = convoy_monitoring::initialize_monitoring(options) {
    eprintln!("Failed to initialize tracing: {e}");
  }
}
