//! Where a [`crate::FileStore`] keeps its data.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File name of the snapshot inside the data directory.
pub const SNAPSHOT_FILE: &str = "db.json";

/// Directory holding document files, inside the data directory.
pub const UPLOADS_DIR: &str = "uploads";

/// Store location, usually deserialised from the CLI's layered config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
  pub data_dir: PathBuf,
}

impl StoreConfig {
  pub fn new(data_dir: impl Into<PathBuf>) -> Self {
    Self { data_dir: data_dir.into() }
  }

  pub fn snapshot_path(&self) -> PathBuf { self.data_dir.join(SNAPSHOT_FILE) }

  pub fn uploads_dir(&self) -> PathBuf { self.data_dir.join(UPLOADS_DIR) }

  /// A copy with a leading `~` component of `data_dir` replaced by `$HOME`.
  pub fn expand_home(&self) -> Self {
    let data_dir = match (self.data_dir.strip_prefix("~"), std::env::var_os("HOME")) {
      (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
      _ => self.data_dir.clone(),
    };
    Self { data_dir }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn layout_is_derived_from_data_dir() {
    let cfg = StoreConfig::new("/srv/abode");
    assert_eq!(cfg.snapshot_path(), PathBuf::from("/srv/abode/db.json"));
    assert_eq!(cfg.uploads_dir(), PathBuf::from("/srv/abode/uploads"));
  }

  #[test]
  fn absolute_paths_are_left_alone() {
    let cfg = StoreConfig::new("/srv/abode").expand_home();
    assert_eq!(cfg.data_dir, PathBuf::from("/srv/abode"));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Some(home) = std::env::var_os("HOME") else {
      return;
    };
    let cfg = StoreConfig::new("~/.local/share/abode").expand_home();
    assert_eq!(cfg.data_dir, PathBuf::from(home).join(".local/share/abode"));
  }

  #[test]
  fn tilde_user_prefix_is_not_expanded() {
    let cfg = StoreConfig::new("~alice/abode").expand_home();
    assert_eq!(cfg.data_dir, PathBuf::from("~alice/abode"));
  }
}
