//! Subcommands and their handlers.
//!
//! Handlers are written against [`RecordStore`] rather than a concrete
//! backend. This module plays the part of the validation layer: it checks
//! dates on input and confirms an address exists before attaching documents
//! to it. The store does neither.

use std::path::{Path, PathBuf};

use abode_core::{
  address::{Address, AddressPatch, NewAddress, filter_for_range},
  date::{DateRange, format_date, parse_date, today_utc, years_before},
  document::{Document, DocumentContent, NewDocument},
  gaps::{Gap, Interval, coverage_gaps, merge_intervals, total_gap_days},
  store::{FileRemovalFailure, RecordStore},
};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

// ─── Command tree ─────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Create, list, edit and remove addresses.
  #[command(subcommand)]
  Address(AddressCommand),

  /// Attach, fetch and remove proof documents.
  #[command(subcommand)]
  Doc(DocCommand),

  /// Report periods in a date range not covered by any address.
  Gaps(GapsArgs),

  /// Print the whole stored snapshot as JSON.
  Snapshot,
}

#[derive(Subcommand, Debug)]
pub enum AddressCommand {
  /// List addresses by start date; with a range, only those lived at in it.
  List(RangeArgs),
  /// Record a new address.
  Add(AddArgs),
  /// Change some fields of an address.
  Update(UpdateArgs),
  /// Delete an address with all of its documents.
  Remove { id: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum DocCommand {
  /// Upload a file as proof for an address.
  Attach {
    address_id: Uuid,
    file:       PathBuf,
    /// MIME type; guessed from the file extension when omitted.
    #[arg(long)]
    mime:       Option<String>,
  },
  /// List the documents attached to an address.
  List { address_id: Uuid },
  /// Fetch a document's bytes.
  Get {
    id:  Uuid,
    /// Write the bytes here instead of printing the stored file's path.
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
  },
  /// Delete a document and its file.
  Remove { id: Uuid },
}

#[derive(Args, Debug)]
pub struct RangeArgs {
  #[arg(long, value_parser = parse_day)]
  from: Option<NaiveDate>,
  #[arg(long, value_parser = parse_day)]
  to:   Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct GapsArgs {
  /// First day of the range (default: three years before the last day).
  #[arg(long, value_parser = parse_day)]
  from:  Option<NaiveDate>,
  /// Last day of the range (default: `--today`).
  #[arg(long, value_parser = parse_day)]
  to:    Option<NaiveDate>,
  /// Pretend today is this date.
  #[arg(long, value_parser = parse_day)]
  today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct AddArgs {
  #[arg(long)]
  line1:    String,
  #[arg(long)]
  line2:    Option<String>,
  #[arg(long)]
  town:     String,
  #[arg(long)]
  county:   Option<String>,
  #[arg(long)]
  postcode: String,
  #[arg(long)]
  country:  String,
  #[arg(long, value_parser = parse_day)]
  start:    NaiveDate,
  /// Leave out for the current address.
  #[arg(long, value_parser = parse_day)]
  end:      Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
  id:       Uuid,
  #[arg(long)]
  line1:    Option<String>,
  #[arg(long)]
  line2:    Option<String>,
  #[arg(long)]
  town:     Option<String>,
  #[arg(long)]
  county:   Option<String>,
  #[arg(long)]
  postcode: Option<String>,
  #[arg(long)]
  country:  Option<String>,
  #[arg(long, value_parser = parse_day)]
  start:    Option<NaiveDate>,
  #[arg(long, value_parser = parse_day, conflicts_with = "ongoing")]
  end:      Option<NaiveDate>,
  /// Clear the end date: the person still lives here.
  #[arg(long)]
  ongoing:  bool,
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
  parse_date(s).map_err(|e| e.to_string())
}

fn day_text(date: NaiveDate) -> String { format_date(date) }

// ─── Dispatch ─────────────────────────────────────────────────────────────────

pub async fn run<S>(store: &S, command: Command) -> Result<()>
where
  S: RecordStore,
{
  match command {
    Command::Address(cmd) => address(store, cmd).await,
    Command::Doc(cmd) => doc(store, cmd).await,
    Command::Gaps(args) => gaps(store, args).await,
    Command::Snapshot => {
      let snapshot = store.read_snapshot().await.context("failed to read snapshot")?;
      print_json(&snapshot)
    }
  }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

// ── Addresses ─────────────────────────────────────────────────────────────────

async fn address<S: RecordStore>(store: &S, cmd: AddressCommand) -> Result<()> {
  match cmd {
    AddressCommand::List(range) => {
      let addresses = store.list_addresses().await.context("failed to list addresses")?;
      let addresses = match optional_range(range.from, range.to)? {
        Some(range) => filter_for_range(&addresses, range),
        None => addresses,
      };
      print_json(&addresses)
    }

    AddressCommand::Add(args) => {
      if let Some(end) = args.end
        && end < args.start
      {
        bail!("end date {end} is before start date {}", args.start);
      }
      let input = NewAddress {
        line1:      args.line1,
        line2:      args.line2,
        town:       args.town,
        county:     args.county,
        postcode:   args.postcode,
        country:    args.country,
        start_date: day_text(args.start),
        end_date:   args.end.map(day_text),
      };
      let address = store.create_address(input).await.context("failed to create address")?;
      print_json(&address)
    }

    AddressCommand::Update(args) => {
      let id = args.id;
      let Some(current) = store.get_address(id).await.context("failed to read address")? else {
        bail!("no address with id {id}");
      };

      let patch = update_patch(args);
      if patch.is_empty() {
        bail!("nothing to update; pass at least one field");
      }
      check_dates_after_patch(&current, &patch)?;

      match store.update_address(id, patch).await.context("failed to update address")? {
        Some(address) => print_json(&address),
        None => bail!("no address with id {id}"),
      }
    }

    AddressCommand::Remove { id } => {
      let removal = store.delete_address(id).await.context("failed to delete address")?;
      if removal.address.is_none() {
        tracing::info!(address_id = %id, "no such address; nothing removed");
      }
      let report = RemovalReport {
        address:        removal.address.as_ref().map(|a| a.id),
        summary:        removal.address.as_ref().map(Address::summary),
        documents:      removal.documents.iter().map(|d| d.id).collect(),
        orphaned_files: removal
          .file_failures
          .iter()
          .map(OrphanedFile::from)
          .collect(),
      };
      print_json(&report)?;
      if !removal.is_clean() {
        bail!("{} document file(s) could not be removed", removal.file_failures.len());
      }
      Ok(())
    }
  }
}

fn update_patch(args: UpdateArgs) -> AddressPatch {
  AddressPatch {
    line1:      args.line1,
    line2:      args.line2.map(Some),
    town:       args.town,
    county:     args.county.map(Some),
    postcode:   args.postcode,
    country:    args.country,
    start_date: args.start.map(day_text),
    end_date:   if args.ongoing {
      Some(None)
    } else {
      args.end.map(|d| Some(day_text(d)))
    },
  }
}

/// Reject a patch that would leave the address ending before it starts.
fn check_dates_after_patch(current: &Address, patch: &AddressPatch) -> Result<()> {
  let start = patch
    .start_date
    .as_deref()
    .unwrap_or(current.start_date.as_str());
  let end = match &patch.end_date {
    Some(end) => end.as_deref(),
    None => current.end_date_text(),
  };
  if let Some(end) = end
    && let (Ok(start), Ok(end)) = (parse_date(start), parse_date(end))
    && end < start
  {
    bail!("end date {end} would be before start date {start}");
  }
  Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemovalReport {
  address:        Option<Uuid>,
  summary:        Option<String>,
  documents:      Vec<Uuid>,
  orphaned_files: Vec<OrphanedFile>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrphanedFile {
  document_id: Uuid,
  path:        PathBuf,
  error:       String,
}

impl From<&FileRemovalFailure> for OrphanedFile {
  fn from(f: &FileRemovalFailure) -> Self {
    Self {
      document_id: f.document_id,
      path:        f.path.clone(),
      error:       f.source.to_string(),
    }
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRemovalReport<'a> {
  document:      &'a Document,
  orphaned_file: Option<OrphanedFile>,
}

// ── Documents ─────────────────────────────────────────────────────────────────

async fn doc<S: RecordStore>(store: &S, cmd: DocCommand) -> Result<()> {
  match cmd {
    DocCommand::Attach { address_id, file, mime } => {
      if store.get_address(address_id).await.context("failed to read address")?.is_none() {
        bail!("no address with id {address_id}");
      }

      let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
      let original_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", file.display()))?;
      let mime_type = mime.unwrap_or_else(|| guess_mime(&file).to_owned());

      let document = store
        .create_document(NewDocument::new(address_id, original_name, mime_type, bytes))
        .await
        .context("failed to store document")?;
      print_json(&document)
    }

    DocCommand::List { address_id } => {
      let documents: Vec<Document> =
        store.documents_for(address_id).await.context("failed to list documents")?;
      print_json(&documents)
    }

    DocCommand::Get { id, out } => {
      match store.read_document(id).await.context("failed to read document")? {
        None => bail!("no document with id {id}"),
        Some(DocumentContent::FileMissing { document }) => bail!(
          "document {id} ({}) exists but its file {} is missing",
          document.original_name,
          store.upload_path(&document).display()
        ),
        Some(DocumentContent::Available { document, bytes }) => match out {
          Some(out) => {
            tokio::fs::write(&out, &bytes)
              .await
              .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(
              document_id = %id,
              bytes = bytes.len(),
              "wrote {} to {}",
              document.original_name,
              out.display()
            );
            Ok(())
          }
          None => {
            println!("{}", store.upload_path(&document).display());
            Ok(())
          }
        },
      }
    }

    DocCommand::Remove { id } => {
      let Some(removal) = store.delete_document(id).await.context("failed to delete document")?
      else {
        bail!("no document with id {id}");
      };
      print_json(&DocumentRemovalReport {
        document:      &removal.document,
        orphaned_file: removal.file_failure.as_ref().map(OrphanedFile::from),
      })?;
      if let Some(failure) = &removal.file_failure {
        bail!("document {id} deleted but its file {} could not be removed", failure.path.display());
      }
      Ok(())
    }
  }
}

/// MIME type for an upload, from its extension.
fn guess_mime(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase);
  match ext.as_deref() {
    Some("pdf") => "application/pdf",
    Some("png") => "image/png",
    Some("jpg" | "jpeg") => "image/jpeg",
    _ => "application/octet-stream",
  }
}

// ── Gaps ──────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GapReport {
  range:          DateRange,
  covered:        Vec<Interval>,
  gaps:           Vec<Gap>,
  uncovered_days: i64,
}

async fn gaps<S: RecordStore>(store: &S, args: GapsArgs) -> Result<()> {
  let range = gap_range(args.from, args.to, args.today.unwrap_or_else(today_utc))?;

  let addresses = store.list_addresses().await.context("failed to list addresses")?;
  for address in &addresses {
    if address.interval(NaiveDate::MAX).is_none() {
      tracing::debug!(address_id = %address.id, "address has unusable dates; ignored");
    }
  }

  let covered = merge_intervals(
    addresses.iter().filter_map(|a| a.interval(range.end())),
    range,
  );
  let gaps = coverage_gaps(&addresses, range);
  let report = GapReport {
    range,
    uncovered_days: total_gap_days(&gaps),
    covered,
    gaps,
  };
  print_json(&report)
}

/// The gap report window. Without bounds it is the three years up to
/// `today`; with only `to` it is the three years up to `to`.
fn gap_range(
  from: Option<NaiveDate>,
  to: Option<NaiveDate>,
  today: NaiveDate,
) -> Result<DateRange> {
  let end = to.unwrap_or(today);
  let start = from.unwrap_or_else(|| years_before(end, 3));
  Ok(DateRange::new(start, end)?)
}

/// A range from optional bounds: `None` when neither is given, otherwise the
/// missing bound is open-ended.
fn optional_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Option<DateRange>> {
  if from.is_none() && to.is_none() {
    return Ok(None);
  }
  let range = DateRange::new(from.unwrap_or(NaiveDate::MIN), to.unwrap_or(NaiveDate::MAX))?;
  Ok(Some(range))
}
