use std::fs;
use std::sync::Arc;
use std::time::Duration;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use convoy::core::events::Event;
use convoy::file_system::os_file_system::OsFileSystem;
use convoy::presets;
use convoy::CopyConfig;
use convoy::NotifyWatcher;
use convoy::Pipeline;
use tokio::sync::mpsc;

fn project() -> TempDir {
  let temp = TempDir::new().unwrap();
  temp
    .child("app/package.json")
    .write_str(r#"{ "name": "app" }"#)
    .unwrap();
  temp
    .child("app/main.js")
    .write_str("var util = require('./util');\nutil();")
    .unwrap();
  temp
    .child("app/util.js")
    .write_str("module.exports = function() {};")
    .unwrap();
  temp
    .child("styles/app.css")
    .write_str("/*= require ./reset */\nbody { color: red; }")
    .unwrap();
  temp
    .child("styles/reset.css")
    .write_str("* { margin: 0; }")
    .unwrap();
  temp.child("public/robots.txt").write_str("User-agent: *").unwrap();
  temp.child("public/draft.psd").write_str("psd").unwrap();
  temp
}

fn pipeline(temp: &TempDir, watch: bool) -> Pipeline {
  let pipeline = Pipeline::new(Arc::new(OsFileSystem), Arc::new(NotifyWatcher::default()));

  pipeline
    .add(
      "app.js",
      presets::javascript()
        .basedir(temp.path().join("app"))
        .main_module("main")
        .watch(watch),
    )
    .unwrap();
  pipeline
    .add(
      "app.css",
      presets::css()
        .basedir(temp.path().join("styles"))
        .main_module("app.css"),
    )
    .unwrap();
  pipeline
    .add(
      "static",
      CopyConfig {
        exclude: vec![String::from("*.psd")],
        ..CopyConfig::new(temp.path().join("public"))
      },
    )
    .unwrap();

  pipeline
}

#[tokio::test]
async fn writes_bundles_and_copied_files() {
  let temp = project();
  let out = temp.child("dist");
  let pipeline = pipeline(&temp, false);

  let mut written = pipeline.write_all(out.path()).await.unwrap();
  written.sort();

  assert_eq!(
    written,
    vec![
      out.path().join("app.css"),
      out.path().join("app.js"),
      out.path().join("static/robots.txt"),
    ]
  );

  let script = fs::read_to_string(out.path().join("app.js")).unwrap();
  assert!(script.starts_with(convoy_plugin_commonjs::LOADER));
  let util = script.find("\"app/util\"").unwrap();
  let main = script.find("\"app/main\"").unwrap();
  assert!(util < main);

  assert_eq!(
    fs::read_to_string(out.path().join("app.css")).unwrap(),
    "* { margin: 0; }\n/*= require ./reset */\nbody { color: red; }"
  );
  out
    .child("static/robots.txt")
    .assert("User-agent: *");
  assert!(!out.path().join("static/draft.psd").exists());
}

#[tokio::test]
async fn rebuilds_reflect_changes_after_invalidate() {
  let temp = project();
  let pipeline = pipeline(&temp, false);

  let before = pipeline.build("app.css").await.unwrap();
  temp
    .child("styles/reset.css")
    .write_str("* { padding: 0; }")
    .unwrap();
  pipeline.invalidate();
  let after = pipeline.build("app.css").await.unwrap();

  assert_ne!(before, after);
}

#[tokio::test(flavor = "multi_thread")]
async fn watched_sources_invalidate_the_pipeline() {
  let temp = project();
  let pipeline = pipeline(&temp, true);

  let (changes, mut changed) = mpsc::unbounded_channel();
  pipeline.subscribe(move |event| {
    if *event == Event::Invalidate {
      let _ = changes.send(());
    }
  });

  pipeline.build("app.js").await.unwrap();

  // Let the OS watch settle before changing the file
  tokio::time::sleep(Duration::from_millis(200)).await;
  temp
    .child("app/util.js")
    .write_str("module.exports = function() { return 1; };")
    .unwrap();

  tokio::time::timeout(Duration::from_secs(10), changed.recv())
    .await
    .expect("no invalidation within 10s")
    .unwrap();

  let rebuilt = pipeline.build("app.js").await.unwrap();
  let convoy::core::types::AssetBody::Inline(body) = &rebuilt.body else {
    panic!("expected an inline body");
  };
  assert!(body.contains("return 1;"));
}
