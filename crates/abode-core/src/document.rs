//! Documents — proof files attached to an address.
//!
//! Only metadata lives in the snapshot. The bytes live in a file named
//! [`Document::stored_name`] inside the store's uploads directory, and the
//! record owns that file: they are created and removed together.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for one uploaded proof document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
  pub id:            Uuid,
  /// The address this document belongs to.
  pub address_id:    Uuid,
  /// File name as supplied by the uploader.
  pub original_name: String,
  /// File name in the uploads directory: the id plus an extension.
  pub stored_name:   String,
  pub mime_type:     String,
  /// Payload length in bytes.
  pub size:          u64,
  pub uploaded_at:   DateTime<Utc>,
}

/// Input to [`crate::store::RecordStore::create_document`].
///
/// The store does not check that `address_id` refers to an existing address;
/// callers look the address up first.
#[derive(Debug, Clone)]
pub struct NewDocument {
  pub address_id:    Uuid,
  pub original_name: String,
  pub mime_type:     String,
  pub size:          u64,
  pub bytes:         Vec<u8>,
}

impl NewDocument {
  /// Convenience constructor taking `size` from the payload length.
  pub fn new(
    address_id: Uuid,
    original_name: impl Into<String>,
    mime_type: impl Into<String>,
    bytes: Vec<u8>,
  ) -> Self {
    Self {
      address_id,
      original_name: original_name.into(),
      mime_type: mime_type.into(),
      size: bytes.len() as u64,
      bytes,
    }
  }
}

/// Result of reading a document together with its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentContent {
  Available { document: Document, bytes: Vec<u8> },
  /// The record exists but its backing file is gone.
  FileMissing { document: Document },
}

// ─── File naming ─────────────────────────────────────────────────────────────

/// Extension (with leading dot) for a stored file: taken from
/// `original_name` when it has one, otherwise inferred from `mime_type`, or
/// empty when neither helps.
pub fn file_extension(original_name: &str, mime_type: &str) -> String {
  let from_name = Path::new(original_name)
    .extension()
    .and_then(|ext| ext.to_str())
    .filter(|ext| !ext.is_empty());

  match from_name {
    Some(ext) => format!(".{ext}"),
    None => extension_for_mime(mime_type).to_owned(),
  }
}

/// The fixed MIME → extension mapping used when the original name has none.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
  match mime_type {
    "application/pdf" => ".pdf",
    "image/png" => ".png",
    "image/jpeg" => ".jpg",
    _ => "",
  }
}

/// The file name under which a document's bytes are stored.
pub fn stored_name(id: Uuid, original_name: &str, mime_type: &str) -> String {
  format!("{}{}", id.hyphenated(), file_extension(original_name, mime_type))
}
