//! Snapshot and upload file I/O.
//!
//! Snapshots are replaced atomically: the new content is written and synced
//! to a uniquely named temp file in the same directory, then renamed over the
//! old snapshot, and the directory is synced so the rename itself is durable.
//! Concurrent writers each use their own temp file, so the last rename wins
//! and no reader observes a torn file.

use std::{
  io,
  path::{Path, PathBuf},
};

use abode_core::store::Snapshot;
use tokio::{fs, io::AsyncWriteExt as _};
use uuid::Uuid;

use crate::{Error, Result};

/// Read the snapshot at `path`; `None` if it does not exist yet.
pub async fn load(path: &Path) -> Result<Option<Snapshot>> {
  match fs::read(path).await {
    Ok(bytes) => Snapshot::decode(&bytes)
      .map(Some)
      .map_err(|source| Error::Corrupt { path: path.to_path_buf(), source }),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(source) => Err(Error::Snapshot { path: path.to_path_buf(), source }),
  }
}

/// Atomically replace the snapshot at `path` with `snapshot`.
pub async fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
  let bytes = snapshot.encode()?;
  let tmp = temp_path(path);

  if let Err(source) = write_synced(&tmp, &bytes).await {
    let _ = fs::remove_file(&tmp).await;
    return Err(Error::Snapshot { path: tmp, source });
  }

  if let Err(source) = fs::rename(&tmp, path).await {
    let _ = fs::remove_file(&tmp).await;
    return Err(Error::Snapshot { path: path.to_path_buf(), source });
  }

  let dir = parent_dir(path);
  sync_dir(dir)
    .await
    .map_err(|source| Error::Snapshot { path: dir.to_path_buf(), source })?;

  tracing::debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");
  Ok(())
}

/// Write `bytes` to `path` and flush them to disk before returning.
pub async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
  let mut file = fs::File::create(path).await?;
  file.write_all(bytes).await?;
  file.sync_all().await?;
  Ok(())
}

/// Remove `path`, treating an already-absent file as success.
pub async fn remove_if_present(path: &Path) -> io::Result<()> {
  match fs::remove_file(path).await {
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    other => other,
  }
}

/// Flush a directory entry change (such as a rename) to disk.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> io::Result<()> {
  fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> io::Result<()> { Ok(()) }

/// The directory containing `path`; `.` for a bare file name.
fn parent_dir(path: &Path) -> &Path {
  path
    .parent()
    .filter(|p| !p.as_os_str().is_empty())
    .unwrap_or_else(|| Path::new("."))
}

/// `<dir>/.<name>.<uuid>.tmp` next to `path`.
fn temp_path(path: &Path) -> PathBuf {
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "snapshot".to_owned());
  path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  #[tokio::test]
  async fn load_missing_is_none() {
    let dir = TempDir::new().unwrap();
    assert!(load(&dir.path().join("db.json")).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn save_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.json");
    save(&path, &Snapshot::default()).await.unwrap();
    save(&path, &Snapshot::default()).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
      .unwrap()
      .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    assert_eq!(names, vec!["db.json".to_owned()]);
  }

  #[tokio::test]
  async fn saved_snapshot_reads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.json");
    save(&path, &Snapshot::default()).await.unwrap();
    assert_eq!(load(&path).await.unwrap(), Some(Snapshot::default()));
  }

  #[test]
  fn parent_of_bare_name_is_current_dir() {
    assert_eq!(parent_dir(Path::new("db.json")), Path::new("."));
    assert_eq!(parent_dir(Path::new("/srv/abode/db.json")), Path::new("/srv/abode"));
  }

  #[tokio::test]
  async fn corrupt_snapshot_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, b"{ not json").unwrap();
    assert!(matches!(load(&path).await, Err(Error::Corrupt { .. })));
  }

  #[tokio::test]
  async fn remove_tolerates_absent_file() {
    let dir = TempDir::new().unwrap();
    remove_if_present(&dir.path().join("nope.pdf")).await.unwrap();
  }

  #[tokio::test]
  async fn remove_reports_other_failures() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("a-directory");
    std::fs::create_dir(&sub).unwrap();
    assert!(remove_if_present(&sub).await.is_err());
  }
}
