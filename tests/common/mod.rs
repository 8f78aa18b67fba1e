//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use hotdev::config::DevConfig;
use hotdev::reload::{OverlapPolicy, ReloadNotice};
use hotdev::routing::ResourceDescriptor;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::broadcast;

pub const POST_SERVICE: &str = r#"
import { Post } from '../Model';

export interface PostService {
  get(id: number): Promise<Post>;
  list(): Promise<Post[]>;
}
"#;

/// A project on disk: sources under `features/`, compiled modules under
/// `dist/`.
pub struct Fixture {
    dir: TempDir,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["features", "dist/features", "stylesheets", "public"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.root().join(relative)).unwrap()
    }

    /// Compiled controller action exporting `value`.
    pub fn controller(&self, feature: &str, action: &str, value: Value) {
        let mut exports = serde_json::Map::new();
        exports.insert(action.to_string(), value);
        self.write(
            &format!("dist/features/{feature}/Controller/{action}.js"),
            &Value::Object(exports).to_string(),
        );
    }

    pub fn service_interface(&self, feature: &str, source: &str) {
        self.write(&format!("features/{feature}/Service/index.ts"), source);
    }

    /// Compiled service whose default export maps methods to results.
    pub fn service_impl(&self, feature: &str, methods: Value) {
        self.write(
            &format!("dist/features/{feature}/Service/index.js"),
            &json!({ "default": methods }).to_string(),
        );
    }

    /// Config rooted at the fixture, bound to an ephemeral port, with no
    /// external compiler.
    pub fn config(&self, policy: OverlapPolicy) -> DevConfig {
        let mut config = DevConfig::default();
        config.project.root = self.root().to_path_buf();
        config.server.bind_address = "127.0.0.1:0".to_string();
        config.server.shutdown_timeout_secs = 5;
        config.compiler.command = String::new();
        config.reload.overlap_policy = policy;
        config.resources = vec![ResourceDescriptor::new("Post")];
        config
    }

    /// Write `hotdev.toml` with the given `[[resources]]` features.
    pub fn write_config(&self, features: &[&str]) -> PathBuf {
        let mut text = String::from("[server]\nbind_address = \"127.0.0.1:0\"\n\n[compiler]\ncommand = \"\"\n");
        for feature in features {
            text.push_str(&format!("\n[[resources]]\nfeature = \"{feature}\"\n"));
        }
        self.write("hotdev.toml", &text)
    }
}

/// Find an unused local port.
#[allow(dead_code)]
pub fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Everything broadcast so far, by kind.
#[allow(dead_code)]
pub fn drain_kinds(rx: &mut broadcast::Receiver<ReloadNotice>) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        kinds.push(notice.kind());
    }
    kinds
}

#[allow(dead_code)]
pub async fn get_text(addr: SocketAddr, path: &str) -> (u16, String) {
    let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

#[allow(dead_code)]
pub async fn get_json(addr: SocketAddr, path: &str) -> Value {
    reqwest::get(format!("http://{addr}{path}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}
