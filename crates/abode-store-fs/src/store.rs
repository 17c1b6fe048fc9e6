//! [`FileStore`] — the filesystem implementation of [`RecordStore`].

use std::{
  io,
  path::{Path, PathBuf},
};

use abode_core::{
  address::{Address, AddressPatch, NewAddress},
  document::{Document, DocumentContent, NewDocument, stored_name},
  store::{AddressRemoval, DocumentRemoval, FileRemovalFailure, RecordStore, Snapshot},
};
use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::{Error, Result, StoreConfig, persist};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Abode record store backed by one JSON snapshot and an uploads
/// directory.
///
/// Cloning is cheap; clones address the same files. Each mutation is an
/// independent read-modify-write of the snapshot.
#[derive(Debug, Clone)]
pub struct FileStore {
  snapshot_path: PathBuf,
  uploads_dir:   PathBuf,
}

impl FileStore {
  /// Open (or create) a store in the configured data directory.
  ///
  /// The snapshot itself is created lazily by the first read.
  pub async fn open(config: &StoreConfig) -> Result<Self> {
    let uploads_dir = config.uploads_dir();
    fs::create_dir_all(&uploads_dir)
      .await
      .map_err(|source| Error::Directory { path: uploads_dir.clone(), source })?;

    Ok(Self { snapshot_path: config.snapshot_path(), uploads_dir })
  }

  /// Open a store rooted at `data_dir`.
  pub async fn open_at(data_dir: impl AsRef<Path>) -> Result<Self> {
    Self::open(&StoreConfig::new(data_dir.as_ref())).await
  }

  pub fn snapshot_path(&self) -> &Path { &self.snapshot_path }

  pub fn uploads_dir(&self) -> &Path { &self.uploads_dir }

  /// Load the snapshot, persisting an empty one if none exists yet.
  async fn load(&self) -> Result<Snapshot> {
    if let Some(snapshot) = persist::load(&self.snapshot_path).await? {
      return Ok(snapshot);
    }
    let snapshot = Snapshot::default();
    persist::save(&self.snapshot_path, &snapshot).await?;
    tracing::debug!(path = %self.snapshot_path.display(), "initialised empty snapshot");
    Ok(snapshot)
  }

  async fn save(&self, snapshot: &Snapshot) -> Result<()> {
    persist::save(&self.snapshot_path, snapshot).await
  }

  fn path_for(&self, document: &Document) -> PathBuf {
    self.uploads_dir.join(&document.stored_name)
  }

  /// Delete a document's file, treating an absent file as already removed.
  async fn remove_file(&self, document: &Document) -> Option<FileRemovalFailure> {
    let path = self.path_for(document);
    let source = persist::remove_if_present(&path).await.err()?;
    tracing::warn!(
      document_id = %document.id,
      path = %path.display(),
      error = %source,
      "failed to remove document file"
    );
    Some(FileRemovalFailure { document_id: document.id, path, source })
  }

  /// Delete each document's file, collecting failures instead of stopping.
  async fn remove_files(&self, documents: &[Document]) -> Vec<FileRemovalFailure> {
    let mut failures = Vec::new();
    for document in documents {
      failures.extend(self.remove_file(document).await);
    }
    failures
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for FileStore {
  type Error = Error;

  async fn read_snapshot(&self) -> Result<Snapshot> { self.load().await }

  // ── Addresses ─────────────────────────────────────────────────────────────

  async fn list_addresses(&self) -> Result<Vec<Address>> {
    Ok(self.load().await?.sorted_addresses())
  }

  async fn get_address(&self, id: Uuid) -> Result<Option<Address>> {
    Ok(self.load().await?.address(id).cloned())
  }

  async fn create_address(&self, input: NewAddress) -> Result<Address> {
    let mut snapshot = self.load().await?;

    let mut id = Uuid::new_v4();
    while snapshot.address(id).is_some() {
      id = Uuid::new_v4();
    }
    let address = input.into_address(id, Utc::now());

    snapshot.addresses.push(address.clone());
    self.save(&snapshot).await?;

    tracing::info!(address_id = %address.id, "created address");
    Ok(address)
  }

  async fn update_address(
    &self,
    id:    Uuid,
    patch: AddressPatch,
  ) -> Result<Option<Address>> {
    let mut snapshot = self.load().await?;

    let Some(address) = snapshot.addresses.iter_mut().find(|a| a.id == id) else {
      return Ok(None);
    };
    patch.apply(address, Utc::now());
    let updated = address.clone();

    self.save(&snapshot).await?;

    tracing::info!(address_id = %id, "updated address");
    Ok(Some(updated))
  }

  async fn delete_address(&self, id: Uuid) -> Result<AddressRemoval> {
    let mut snapshot = self.load().await?;

    // Phase one: work out everything that goes.
    let address = snapshot
      .addresses
      .iter()
      .position(|a| a.id == id)
      .map(|idx| snapshot.addresses.remove(idx));
    let (documents, kept): (Vec<Document>, Vec<Document>) = snapshot
      .documents
      .drain(..)
      .partition(|d| d.address_id == id);
    snapshot.documents = kept;

    if address.is_none() && documents.is_empty() {
      return Ok(AddressRemoval::default());
    }

    // Phase two: drop the records. Files go afterwards, so an interruption
    // leaves orphaned files rather than records pointing at nothing.
    self.save(&snapshot).await?;

    // Phase three: the files, best effort.
    let file_failures = self.remove_files(&documents).await;

    tracing::info!(
      address_id = %id,
      documents = documents.len(),
      file_failures = file_failures.len(),
      "deleted address"
    );
    Ok(AddressRemoval { address, documents, file_failures })
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn create_document(&self, input: NewDocument) -> Result<Document> {
    let id = Uuid::new_v4();
    let document = Document {
      id,
      address_id: input.address_id,
      stored_name: stored_name(id, &input.original_name, &input.mime_type),
      original_name: input.original_name,
      mime_type: input.mime_type,
      size: input.size,
      uploaded_at: Utc::now(),
    };

    // The file must exist before any record refers to it.
    let path = self.path_for(&document);
    persist::write_synced(&path, &input.bytes)
      .await
      .map_err(|source| Error::Upload { path: path.clone(), source })?;

    let mut snapshot = self.load().await?;
    snapshot.documents.push(document.clone());
    self.save(&snapshot).await?;

    tracing::info!(
      document_id = %document.id,
      address_id = %document.address_id,
      size = document.size,
      "stored document"
    );
    Ok(document)
  }

  async fn delete_document(&self, id: Uuid) -> Result<Option<DocumentRemoval>> {
    let mut snapshot = self.load().await?;

    let Some(idx) = snapshot.documents.iter().position(|d| d.id == id) else {
      return Ok(None);
    };
    let document = snapshot.documents.remove(idx);
    self.save(&snapshot).await?;

    let file_failure = self.remove_file(&document).await;

    tracing::info!(document_id = %id, orphaned = file_failure.is_some(), "deleted document");
    Ok(Some(DocumentRemoval { document, file_failure }))
  }

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
    Ok(self.load().await?.document(id).cloned())
  }

  async fn documents_for(&self, address_id: Uuid) -> Result<Vec<Document>> {
    Ok(self.load().await?.documents_for(address_id))
  }

  async fn read_document(&self, id: Uuid) -> Result<Option<DocumentContent>> {
    let Some(document) = self.get_document(id).await? else {
      return Ok(None);
    };

    let path = self.path_for(&document);
    match fs::read(&path).await {
      Ok(bytes) => Ok(Some(DocumentContent::Available { document, bytes })),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        tracing::warn!(document_id = %id, path = %path.display(), "document file is missing");
        Ok(Some(DocumentContent::FileMissing { document }))
      }
      Err(source) => Err(Error::Upload { path, source }),
    }
  }

  fn upload_path(&self, document: &Document) -> PathBuf { self.path_for(document) }
}
