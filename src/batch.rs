//! Batch scoring: drive a record source through a scorer into an ordered result table

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::client::Scorer;
use crate::model::{CustomerRecord, PredictionResult};
use crate::source::{sheet_row, RecordSource};

/// Shared flag checked before each record is scored.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One input record and its prediction, absent when scoring failed or was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub record: CustomerRecord,
    pub result: Option<PredictionResult>,
}

/// Scored records in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredTable {
    rows: Vec<ScoredRow>,
}

impl ScoredTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: CustomerRecord, result: Option<PredictionResult>) {
        self.rows.push(ScoredRow { record, result });
    }

    pub fn rows(&self) -> &[ScoredRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows without a prediction
    pub fn absent_count(&self) -> usize {
        self.rows.iter().filter(|row| row.result.is_none()).count()
    }
}

/// A record whose scoring call failed
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    /// Zero-based position in the table
    pub index: usize,
    pub message: String,
}

/// Everything a batch run produced
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub table: ScoredTable,
    pub failures: Vec<RowFailure>,
    /// Rows left unscored because the run was cancelled
    pub cancelled: usize,
}

impl BatchReport {
    pub fn scored(&self) -> usize {
        self.table.len() - self.table.absent_count()
    }
}

enum Outcome {
    Scored(PredictionResult),
    Failed(String),
    Skipped,
}

/// Scores every record of a source, one call per record, keeping going past failures.
#[derive(Debug, Clone)]
pub struct BatchScorer {
    workers: usize,
    cancel: CancelToken,
}

impl Default for BatchScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchScorer {
    /// Sequential scorer
    pub fn new() -> Self {
        Self {
            workers: 1,
            cancel: CancelToken::new(),
        }
    }

    /// Score up to `workers` records concurrently. Output order is unaffected.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Token that stops the run before the next record is started.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run<S: Scorer>(&self, source: RecordSource, client: &S) -> crate::Result<BatchReport> {
        let total = source.len();
        let start = Instant::now();
        tracing::info!(records = total, workers = self.workers, "starting batch scoring");

        let report = if self.workers == 1 {
            let outcomes = source.into_iter().enumerate().map(|(idx, record)| {
                let outcome = self.score_one(idx, &record, client);
                (record, outcome)
            });
            assemble(outcomes, total)
        } else {
            let records: Vec<CustomerRecord> = source.into_iter().collect();
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()?;
            let outcomes: Vec<Outcome> = pool.install(|| {
                records
                    .par_iter()
                    .enumerate()
                    .map(|(idx, record)| self.score_one(idx, record, client))
                    .collect()
            });
            assemble(records.into_iter().zip(outcomes), total)
        };

        tracing::info!(
            scored = report.scored(),
            failed = report.failures.len(),
            cancelled = report.cancelled,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch scoring finished"
        );
        Ok(report)
    }

    fn score_one<S: Scorer>(&self, idx: usize, record: &CustomerRecord, client: &S) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Skipped;
        }

        match client.score(record) {
            Ok(prediction) => Outcome::Scored(prediction),
            Err(e) => {
                tracing::warn!(row = sheet_row(idx), error = %e, "scoring failed, leaving result empty");
                Outcome::Failed(e.to_string())
            }
        }
    }
}

fn assemble(outcomes: impl Iterator<Item = (CustomerRecord, Outcome)>, total: usize) -> BatchReport {
    let mut report = BatchReport {
        table: ScoredTable {
            rows: Vec::with_capacity(total),
        },
        ..BatchReport::default()
    };

    for (index, (record, outcome)) in outcomes.enumerate() {
        let result = match outcome {
            Outcome::Scored(prediction) => Some(prediction),
            Outcome::Failed(message) => {
                report.failures.push(RowFailure { index, message });
                None
            }
            Outcome::Skipped => {
                report.cancelled += 1;
                None
            }
        };
        report.table.push(record, result);
    }

    report
}
