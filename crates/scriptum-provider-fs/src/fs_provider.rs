use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use scriptum_config::MethodDescriptor;
use scriptum_runtime::{ScriptProvider, ScriptSource};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, trace};

/// Configuration for [`FsScriptProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsProviderConfig {
  /// Directory holding one sub-directory per interface.
  pub root: PathBuf,
  /// Script file extension, without the leading dot.
  #[serde(default = "default_extension")]
  pub extension: String,
}

fn default_extension() -> String {
  "lua".to_string()
}

impl FsProviderConfig {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      extension: default_extension(),
    }
  }

  pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
    self.extension = extension.into();
    self
  }
}

/// Filesystem-based script provider.
///
/// Scripts are stored one file per method:
/// ```text
/// {root}/
/// └── CustomerRepository/
///     ├── renameCustomer.lua
///     └── createCustomer.lua
/// ```
///
/// A missing or unreadable file is reported as not found, so a default
/// method body can take over. Any other I/O error is a failure.
pub struct FsScriptProvider {
  config: FsProviderConfig,
}

impl FsScriptProvider {
  pub fn new(config: FsProviderConfig) -> Self {
    Self { config }
  }

  /// Path of the script file for a method.
  ///
  /// Returns `None` if the interface or method name cannot be used as a
  /// single path segment.
  pub fn script_path(&self, method: &MethodDescriptor) -> Option<PathBuf> {
    if !is_plain_segment(&method.interface) || !is_plain_segment(&method.name) {
      return None;
    }

    let file_name = if self.config.extension.is_empty() {
      method.name.clone()
    } else {
      format!("{}.{}", method.name, self.config.extension)
    };

    Some(self.config.root.join(&method.interface).join(file_name))
  }
}

/// A name usable as one path component: no separators, no `.`/`..`.
fn is_plain_segment(name: &str) -> bool {
  !name.is_empty()
    && name != "."
    && name != ".."
    && !name.contains(['/', '\\'])
    && !name.contains('\0')
}

#[async_trait]
impl ScriptProvider for FsScriptProvider {
  async fn get_script(&self, method: &MethodDescriptor) -> ScriptSource {
    let Some(path) = self.script_path(method) else {
      return ScriptSource::failure(format!(
        "method {} cannot be mapped to a script file",
        method
      ));
    };

    debug!(method = %method, path = %path.display(), "reading script file");

    match fs::read_to_string(&path).await {
      Ok(text) => {
        trace!(path = %path.display(), text = %text, "script found");
        ScriptSource::found(text)
      }
      Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
        ScriptSource::not_found_because(format!("{}: {}", path.display(), e))
      }
      Err(e) => ScriptSource::failure(format!("failed to read {}: {}", path.display(), e)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use scriptum_runtime::SourceStatus;

  fn descriptor(interface: &str, name: &str) -> MethodDescriptor {
    MethodDescriptor::new(interface, name, vec!["string".to_string()])
  }

  #[test]
  fn test_script_path() {
    let provider = FsScriptProvider::new(FsProviderConfig::new("/scripts"));
    assert_eq!(
      provider.script_path(&descriptor("CustomerRepository", "rename")),
      Some(PathBuf::from("/scripts/CustomerRepository/rename.lua"))
    );
  }

  #[test]
  fn test_script_path_custom_extension() {
    let provider =
      FsScriptProvider::new(FsProviderConfig::new("/scripts").with_extension("groovy"));
    assert_eq!(
      provider.script_path(&descriptor("Repo", "run")),
      Some(PathBuf::from("/scripts/Repo/run.groovy"))
    );
  }

  #[test]
  fn test_script_path_rejects_traversal() {
    let provider = FsScriptProvider::new(FsProviderConfig::new("/scripts"));
    assert_eq!(provider.script_path(&descriptor("..", "run")), None);
    assert_eq!(provider.script_path(&descriptor("Repo", "a/b")), None);
    assert_eq!(provider.script_path(&descriptor("", "run")), None);
  }

  #[test]
  fn test_config_default_extension_from_json() {
    let config: FsProviderConfig = serde_json::from_str(r#"{"root": "/srv/scripts"}"#).unwrap();
    assert_eq!(config, FsProviderConfig::new("/srv/scripts"));
  }

  #[tokio::test]
  async fn test_get_script_found() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Calculator")).unwrap();
    std::fs::write(dir.path().join("Calculator/add.lua"), "return x + y").unwrap();

    let provider = FsScriptProvider::new(FsProviderConfig::new(dir.path()));
    let source = provider.get_script(&descriptor("Calculator", "add")).await;

    assert_eq!(source.status(), SourceStatus::Found);
    assert_eq!(source.text(), Some("return x + y"));
  }

  #[tokio::test]
  async fn test_get_script_not_found() {
    let dir = tempfile::tempdir().unwrap();

    let provider = FsScriptProvider::new(FsProviderConfig::new(dir.path()));
    let source = provider.get_script(&descriptor("Calculator", "add")).await;

    assert_eq!(source.status(), SourceStatus::NotFound);
    assert!(source.error().unwrap().contains("add.lua"));
  }

  #[tokio::test]
  async fn test_get_script_failure_on_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Calculator/add.lua")).unwrap();

    let provider = FsScriptProvider::new(FsProviderConfig::new(dir.path()));
    let source = provider.get_script(&descriptor("Calculator", "add")).await;

    assert_eq!(source.status(), SourceStatus::Failure);
  }

  #[tokio::test]
  async fn test_get_script_failure_on_unmappable_name() {
    let dir = tempfile::tempdir().unwrap();

    let provider = FsScriptProvider::new(FsProviderConfig::new(dir.path()));
    let source = provider.get_script(&descriptor("Calculator", "../add")).await;

    assert_eq!(source.status(), SourceStatus::Failure);
  }

  #[tokio::test]
  async fn test_get_script_reads_current_contents() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Calculator")).unwrap();
    let path = dir.path().join("Calculator/add.lua");
    std::fs::write(&path, "return 1").unwrap();

    let provider = FsScriptProvider::new(FsProviderConfig::new(dir.path()));
    let method = descriptor("Calculator", "add");
    assert_eq!(provider.get_script(&method).await.text(), Some("return 1"));

    std::fs::write(&path, "return 2").unwrap();
    assert_eq!(provider.get_script(&method).await.text(), Some("return 2"));
  }
}
