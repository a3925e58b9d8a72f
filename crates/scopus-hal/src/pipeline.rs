//! Per-record submission pipeline.
//!
//! Records are processed one at a time, in source order:
//!
//! ```text
//! received -> invalid-record | unsupported-type | duplicate
//! received -> normalized -> linked -> built -> upload-success | upload-failed
//! ```
//!
//! `built` is terminal in dry-run mode; a remote or I/O failure before the
//! upload ends in `failed`. Whatever happens, each record leaves exactly one
//! row in the persisted log and the batch moves on.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::alias::AliasTable;
use crate::config::PipelineSettings;
use crate::dedup::DuplicateChecker;
use crate::error::{PipelineResult, SourceResult};
use crate::linker::IdentityLinker;
use crate::models::{BibliographicRecord, DocType, LogRow, RecordState};
use crate::normalize::{LanguageTable, Normalized, Normalizer};
use crate::report::ReportSink;
use crate::repository::{Depositor, Repository};
use crate::tei;

/// What happened to one record.
#[derive(Debug, Clone)]
pub struct ProcessedRecord {
    /// Final state.
    pub state: RecordState,

    /// Every state visited, starting with `received`.
    pub trail: Vec<RecordState>,

    /// Generated notice, when the record got that far.
    pub tei: Option<String>,

    /// Where the notice was written.
    pub tei_path: Option<PathBuf>,

    /// Row appended to the log.
    pub log: LogRow,
}

/// Counts of final states over a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Final state label to number of records.
    pub by_state: BTreeMap<&'static str, usize>,
}

impl BatchSummary {
    /// Records that ended in `state`.
    #[must_use]
    pub fn count(&self, state: RecordState) -> usize {
        self.by_state.get(state.label()).copied().unwrap_or(0)
    }

    /// Records seen.
    #[must_use]
    pub fn total(&self) -> usize {
        self.by_state.values().sum()
    }

    fn record(&mut self, state: RecordState) {
        *self.by_state.entry(state.label()).or_default() += 1;
    }
}

/// Progress of one record through the state machine.
struct Progress {
    eid: String,
    doi: String,
    doctype: String,
    trail: Vec<RecordState>,
    info: String,
    hal_matches: Vec<String>,
    emails: Vec<String>,
    tei: Option<String>,
    tei_path: Option<PathBuf>,
}

impl Progress {
    fn new(record: &BibliographicRecord) -> Self {
        let mut progress = Self {
            eid: record.eid.trim().to_string(),
            doi: record.doi().unwrap_or_default().to_string(),
            doctype: record.document_type.trim().to_string(),
            trail: Vec::new(),
            info: String::new(),
            hal_matches: Vec::new(),
            emails: record.corresponding_emails().into_iter().map(ToString::to_string).collect(),
            tei: None,
            tei_path: None,
        };
        progress.advance(RecordState::Received);
        progress
    }

    fn state(&self) -> RecordState {
        self.trail.last().copied().unwrap_or(RecordState::Received)
    }

    fn advance(&mut self, state: RecordState) {
        self.trail.push(state);
        tracing::info!(eid = %self.eid, doi = %self.doi, state = %state, "Record transition");
    }

    fn finish(&mut self, state: RecordState, info: impl Into<String>) {
        self.info = info.into();
        self.trail.push(state);
        match state {
            RecordState::UploadSuccess | RecordState::Duplicate | RecordState::Built => {
                tracing::info!(eid = %self.eid, doi = %self.doi, state = %state, info = %self.info, "Record done");
            }
            _ => {
                tracing::warn!(eid = %self.eid, doi = %self.doi, state = %state, info = %self.info, "Record done");
            }
        }
    }

    fn into_processed(self) -> ProcessedRecord {
        let state = self.state();
        let log = LogRow {
            eid: self.eid,
            doi: self.doi,
            doctype: self.doctype,
            state: state.label().to_string(),
            info: self.info,
            hal_matches: self.hal_matches.join(";"),
            corresponding_emails: self.emails.join(";"),
        };
        ProcessedRecord { state, trail: self.trail, tei: self.tei, tei_path: self.tei_path, log }
    }
}

/// Drives records from source to repository.
pub struct Pipeline<R, W>
where
    R: Repository + Depositor + ?Sized,
    W: Write,
{
    repo: Arc<R>,
    normalizer: Normalizer,
    linker: IdentityLinker,
    checker: DuplicateChecker,
    settings: PipelineSettings,
    report: ReportSink<W>,
}

impl<R, W> Pipeline<R, W>
where
    R: Repository + Depositor + ?Sized,
    W: Write,
{
    /// Assemble a pipeline for one run.
    pub fn new(
        repo: Arc<R>,
        settings: PipelineSettings,
        aliases: AliasTable,
        languages: LanguageTable,
        report: ReportSink<W>,
    ) -> Self {
        Self {
            repo,
            normalizer: Normalizer::new(&settings, aliases, languages),
            linker: IdentityLinker::new(settings.create_local_structures),
            checker: DuplicateChecker::new(settings.title_phrase_cutoff),
            settings,
            report,
        }
    }

    /// Process every record, in order.
    ///
    /// An unreadable source row is logged as `invalid-record`.
    ///
    /// # Errors
    ///
    /// Returns error only if the log cannot be written.
    pub async fn run<I>(&mut self, records: I) -> PipelineResult<BatchSummary>
    where
        I: IntoIterator<Item = SourceResult<BibliographicRecord>>,
    {
        let mut summary = BatchSummary::default();

        for (index, item) in records.into_iter().enumerate() {
            let processed = match item {
                Ok(record) => self.process(&record).await?,
                Err(e) => {
                    tracing::warn!(row = index + 1, error = %e, "Unreadable source row");
                    let mut progress = Progress::new(&BibliographicRecord::default());
                    progress.finish(RecordState::InvalidRecord, format!("row {}: {e}", index + 1));
                    self.log(progress)?
                }
            };
            summary.record(processed.state);
        }

        tracing::info!(total = summary.total(), states = ?summary.by_state, "Batch finished");
        Ok(summary)
    }

    /// Process one record and append its log row.
    ///
    /// # Errors
    ///
    /// Returns error only if the log cannot be written; every other failure
    /// is reported through the returned record's state.
    pub async fn process(&mut self, record: &BibliographicRecord) -> PipelineResult<ProcessedRecord> {
        let mut progress = Progress::new(record);

        if let Err(e) = self.drive(record, &mut progress).await {
            progress.finish(RecordState::Failed, e.to_string());
        }

        self.log(progress)
    }

    /// Recover the log sink.
    pub fn into_report(self) -> ReportSink<W> {
        self.report
    }

    fn log(&mut self, progress: Progress) -> PipelineResult<ProcessedRecord> {
        let processed = progress.into_processed();
        self.report.append(&processed.log)?;
        Ok(processed)
    }

    async fn drive(&self, record: &BibliographicRecord, progress: &mut Progress) -> PipelineResult<()> {
        if let Some(field) = record.missing_required_field() {
            progress.finish(RecordState::InvalidRecord, format!("missing {field}"));
            return Ok(());
        }

        let Some(doc_type) = DocType::from_source(&record.document_type) else {
            progress.finish(
                RecordState::UnsupportedType,
                format!("unsupported document type '{}'", record.document_type),
            );
            return Ok(());
        };
        progress.doctype = doc_type.code().to_string();

        if self.settings.check_duplicates {
            let duplicates = self.checker.check(record, &*self.repo).await?;
            if duplicates.is_duplicate() {
                progress.hal_matches = duplicates.uris;
                let info = duplicates.matched_by.map(|m| m.to_string()).unwrap_or_default();
                progress.finish(RecordState::Duplicate, info);
                return Ok(());
            }
        }

        let Normalized { canonical, authors } =
            self.normalizer.normalize(record, doc_type, &*self.repo).await?;
        progress.emails = authors
            .iter()
            .filter(|a| a.corresponding)
            .filter_map(|a| a.email.as_deref())
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(ToString::to_string)
            .collect();
        progress.advance(RecordState::Normalized);

        let linked = self.linker.link(authors, &*self.repo).await?;
        progress.advance(RecordState::Linked);

        let notice = tei::build(record, &canonical, &linked)?;
        if let Some(dir) = &self.settings.output_dir {
            progress.tei_path = Some(write_notice(dir, &progress.eid, &notice)?);
        }
        progress.tei = Some(notice);

        if !self.settings.upload {
            progress.finish(RecordState::Built, "dry run");
            return Ok(());
        }
        progress.advance(RecordState::Built);

        let notice = progress.tei.as_deref().unwrap_or_default();
        match self.repo.deposit(notice).await {
            Ok(receipt) => {
                let info = receipt.hal_id.unwrap_or_else(|| format!("accepted ({})", receipt.status));
                progress.finish(RecordState::UploadSuccess, info);
            }
            Err(e) => progress.finish(RecordState::UploadFailed, e.to_string()),
        }
        Ok(())
    }
}

impl<R, W> std::fmt::Debug for Pipeline<R, W>
where
    R: Repository + Depositor + ?Sized,
    W: Write,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("settings", &self.settings).finish()
    }
}

/// Write `TEI/<eid>.xml` under `dir`.
fn write_notice(dir: &Path, eid: &str, notice: &str) -> std::io::Result<PathBuf> {
    let file_name: String = eid
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();

    let tei_dir = dir.join("TEI");
    std::fs::create_dir_all(&tei_dir)?;
    let path = tei_dir.join(format!("{file_name}.xml"));
    std::fs::write(&path, notice)?;
    Ok(path)
}
