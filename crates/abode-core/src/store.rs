//! The `RecordStore` trait and the aggregate it persists.
//!
//! The trait is implemented by storage backends (e.g. `abode-store-fs`).
//! Callers such as the `abode` CLI depend on this abstraction, not on any
//! concrete backend.

use std::{future::Future, path::PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  address::{Address, AddressPatch, NewAddress, sort_canonical},
  document::{Document, DocumentContent, NewDocument},
};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The aggregate root: both collections, always persisted together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  #[serde(default)]
  pub addresses: Vec<Address>,
  #[serde(default)]
  pub documents: Vec<Document>,
}

impl Snapshot {
  pub fn decode(bytes: &[u8]) -> Result<Self> { Ok(serde_json::from_slice(bytes)?) }

  pub fn encode(&self) -> Result<Vec<u8>> { Ok(serde_json::to_vec_pretty(self)?) }

  pub fn address(&self, id: Uuid) -> Option<&Address> {
    self.addresses.iter().find(|a| a.id == id)
  }

  pub fn document(&self, id: Uuid) -> Option<&Document> {
    self.documents.iter().find(|d| d.id == id)
  }

  /// Addresses in canonical order (start date, then creation time).
  pub fn sorted_addresses(&self) -> Vec<Address> {
    let mut addresses = self.addresses.clone();
    sort_canonical(&mut addresses);
    addresses
  }

  /// Documents attached to `address_id`, oldest upload first.
  pub fn documents_for(&self, address_id: Uuid) -> Vec<Document> {
    let mut docs: Vec<Document> = self
      .documents
      .iter()
      .filter(|d| d.address_id == address_id)
      .cloned()
      .collect();
    docs.sort_by_key(|d| d.uploaded_at);
    docs
  }
}

// ─── Cascade report ──────────────────────────────────────────────────────────

/// A backing file that could not be removed while deleting an address.
///
/// The document record is gone regardless; the file is left behind as an
/// orphan.
#[derive(Debug)]
pub struct FileRemovalFailure {
  pub document_id: Uuid,
  pub path:        PathBuf,
  pub source:      std::io::Error,
}

/// What [`RecordStore::delete_address`] removed.
#[derive(Debug, Default)]
pub struct AddressRemoval {
  /// The deleted address, or `None` if there was nothing to delete.
  pub address:       Option<Address>,
  /// Every document that was attached to it.
  pub documents:     Vec<Document>,
  /// Backing files that failed to delete for a reason other than already
  /// being absent.
  pub file_failures: Vec<FileRemovalFailure>,
}

impl AddressRemoval {
  pub fn is_clean(&self) -> bool { self.file_failures.is_empty() }
}

/// What [`RecordStore::delete_document`] removed.
#[derive(Debug)]
pub struct DocumentRemoval {
  pub document:     Document,
  /// Set when the record is gone but its file could not be removed.
  pub file_failure: Option<FileRemovalFailure>,
}

impl DocumentRemoval {
  pub fn is_clean(&self) -> bool { self.file_failure.is_none() }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Abode record store backend.
///
/// Every mutation rewrites the whole [`Snapshot`]; readers never see a
/// partial write. Concurrent mutations are not serialised against each other
/// and can lose updates; callers that need that guarantee must funnel writes
/// through a single writer.
///
/// "Not found" is reported as `Ok(None)`, never as an error.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the current snapshot, creating and persisting an empty one on
  /// first use.
  fn read_snapshot(
    &self,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + '_;

  // ── Addresses ─────────────────────────────────────────────────────────

  /// All addresses in canonical order.
  fn list_addresses(
    &self,
  ) -> impl Future<Output = Result<Vec<Address>, Self::Error>> + Send + '_;

  fn get_address(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Address>, Self::Error>> + Send + '_;

  /// Persist a new address with a fresh id and `created_at == updated_at`.
  fn create_address(
    &self,
    input: NewAddress,
  ) -> impl Future<Output = Result<Address, Self::Error>> + Send + '_;

  /// Merge `patch` into the address and re-stamp `updated_at`.
  /// Returns `None`, without writing anything, if the id is unknown.
  fn update_address(
    &self,
    id: Uuid,
    patch: AddressPatch,
  ) -> impl Future<Output = Result<Option<Address>, Self::Error>> + Send + '_;

  /// Delete an address together with all of its documents and their files.
  ///
  /// Idempotent. A file that fails to delete is reported in
  /// [`AddressRemoval::file_failures`] and does not stop the cascade.
  fn delete_address(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<AddressRemoval, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Write the payload to the uploads directory, then record its metadata.
  ///
  /// The caller must already have checked that `input.address_id` exists.
  fn create_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  /// Delete a document and its file, returning the removed record.
  ///
  /// Once the record is gone the deletion counts as done: a file that fails
  /// to delete is reported in [`DocumentRemoval::file_failure`], not as an
  /// error.
  fn delete_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DocumentRemoval>, Self::Error>> + Send + '_;

  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// Documents attached to one address, oldest upload first.
  fn documents_for(
    &self,
    address_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  /// Look up a document and read its bytes. `None` means there is no such
  /// record; [`DocumentContent::FileMissing`] means the record exists but
  /// its file does not.
  fn read_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DocumentContent>, Self::Error>> + Send + '_;

  /// Where the bytes of `document` live.
  fn upload_path(&self, document: &Document) -> PathBuf;
}
