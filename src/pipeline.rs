//! Batch orchestration of record classification.
//!
//! The pipeline eagerly filters and parses every input line, then works
//! through the parsed records in consecutive batches. Each record becomes one
//! classification task; a counting semaphore owned by the pipeline instance
//! caps how many run at once, across batch boundaries. Two deadlines bound
//! the work: the per-record budget turns an overrunning check into the
//! `Timeout` outcome, and the per-batch budget abandons whatever a slow batch
//! has not finished so the rest of the file keeps moving. Abandoned records
//! are dropped (no retry) and surface only in the report's `skipped` count.
//!
//! Completed records fan in through the tasks' join handles; no shared
//! mutable collection, no lock. Ordering is imposed once at the end by
//! [`sort_records`].

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::classifier::StatusClassifier;
use crate::config::PipelineConfig;
use crate::errors::{IoResultExt, Result};
use crate::record::{self, DomainStatus, LifecycleStatus, Record};

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Classified records, sorted (STARTED first, then by name).
    pub records: Vec<Record>,
    /// Candidate lines that parsed into records.
    pub parsed: usize,
    /// Candidate lines dropped as unparseable.
    pub unparseable: usize,
    /// Records abandoned by a batch deadline. `records.len() + skipped`
    /// always equals `parsed`.
    pub skipped: usize,
}

/// Drives parsing, admission-limited fan-out, deadlines, and collection.
pub struct Pipeline {
    classifier: StatusClassifier,
    settings: PipelineConfig,
    limiter: Arc<Semaphore>,
}

impl Pipeline {
    /// The admission limiter is owned per instance, so concurrent runs (and
    /// tests) never share permits.
    pub fn new(classifier: StatusClassifier, settings: PipelineConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(settings.concurrency));
        Self {
            classifier,
            settings,
            limiter,
        }
    }

    /// Classify every parseable record of a line-oriented input stream.
    ///
    /// The only hard failure is being unable to read the stream itself;
    /// everything per-record degrades into a status or a skip count.
    pub async fn run<R>(&self, reader: R) -> Result<PipelineReport>
    where
        R: AsyncBufRead + Unpin,
    {
        let (records, unparseable) = parse_stream(reader).await?;
        Ok(self.classify_all(records, unparseable).await)
    }

    /// Classify already-parsed records. Exposed for callers that do their own
    /// line handling.
    pub async fn classify_all(&self, records: Vec<Record>, unparseable: usize) -> PipelineReport {
        let parsed = records.len();
        let batch_size = self.settings.batch_size;
        info!(
            records = parsed,
            batch_size,
            concurrency = self.settings.concurrency,
            "starting classification"
        );

        let mut collected: Vec<Record> = Vec::with_capacity(parsed);
        let mut skipped = 0usize;

        let mut batches: Vec<Vec<Record>> = Vec::new();
        let mut records = records;
        while !records.is_empty() {
            let rest = records.split_off(records.len().min(batch_size));
            batches.push(std::mem::replace(&mut records, rest));
        }

        for (index, batch) in batches.into_iter().enumerate() {
            let dispatched = batch.len();
            let deadline = Instant::now() + self.settings.batch_timeout;
            let mut tasks = JoinSet::new();

            for mut record in batch {
                let limiter = Arc::clone(&self.limiter);
                let classifier = self.classifier.clone();
                let item_budget = self.settings.item_timeout;
                tasks.spawn(async move {
                    // Permit scope covers the whole check, including its
                    // timeout wait; dropping it on task abort releases the
                    // slot immediately.
                    let _permit = limiter.acquire_owned().await;
                    let status = if record.is_checkable() {
                        match timeout(item_budget, classifier.classify(&record)).await {
                            Ok(status) => status,
                            Err(_) => DomainStatus::Timeout,
                        }
                    } else {
                        DomainStatus::NotApplicable
                    };
                    record.domain_status = Some(status);
                    record
                });
            }

            let mut finished = 0usize;
            loop {
                match timeout_at(deadline, tasks.join_next()).await {
                    Ok(Some(Ok(record))) => {
                        debug!(
                            name = %record.name,
                            status = %record.domain_status.as_ref().unwrap_or(&DomainStatus::NotApplicable),
                            "record classified"
                        );
                        collected.push(record);
                        finished += 1;
                    }
                    Ok(Some(Err(join_err))) => {
                        // A panicked task loses its record; count it with the
                        // batch-deadline drops.
                        warn!(batch = index, error = %join_err, "classification task failed");
                        skipped += 1;
                        finished += 1;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        let abandoned = dispatched - finished;
                        warn!(
                            batch = index,
                            abandoned, "batch deadline expired; dropping unfinished records"
                        );
                        tasks.abort_all();
                        // Drain aborted handles so their permits are returned
                        // before the next batch starts.
                        while tasks.join_next().await.is_some() {}
                        skipped += abandoned;
                        break;
                    }
                }
            }
            debug!(batch = index, completed = finished, "batch done");
        }

        info!(
            classified = collected.len(),
            skipped, "classification finished"
        );
        sort_records(&mut collected);
        PipelineReport {
            records: collected,
            parsed,
            unparseable,
            skipped,
        }
    }
}

/// Read, filter, and parse all candidate lines eagerly, keeping input order.
/// Returns the parsed records and the count of dropped unparseable lines.
async fn parse_stream<R>(reader: R) -> Result<(Vec<Record>, usize)>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut records = Vec::new();
    let mut unparseable = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .with_path("<input stream>", "read line")?
    {
        if !record::is_candidate_line(&line) {
            continue;
        }
        match record::parse_line(&line) {
            Some(record) => records.push(record),
            None => {
                warn!(line = %line.trim(), "dropping unparseable line");
                unparseable += 1;
            }
        }
    }
    Ok((records, unparseable))
}

/// Stable total ordering of the final collection: every STARTED record before
/// every STOPPED record, then ordinal name order within each group. Records
/// with equal keys keep their relative (collection) order.
///
/// The boolean key assumes exactly the two lifecycle values that exist today.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(|a, b| {
        let a_stopped = a.lifecycle == LifecycleStatus::Stopped;
        let b_stopped = b.lifecycle == LifecycleStatus::Stopped;
        a_stopped
            .cmp(&b_stopped)
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, lifecycle: LifecycleStatus) -> Record {
        Record {
            name: name.to_string(),
            lifecycle,
            ip: None,
            port: None,
            host: None,
            domain_status: None,
            nameservers: Vec::new(),
        }
    }

    #[test]
    fn started_precedes_stopped_then_name_order() {
        let mut records = vec![
            rec("zeta", LifecycleStatus::Stopped),
            rec("beta", LifecycleStatus::Started),
            rec("alpha", LifecycleStatus::Stopped),
            rec("alpha", LifecycleStatus::Started),
        ];
        sort_records(&mut records);
        let keys: Vec<(String, LifecycleStatus)> = records
            .iter()
            .map(|r| (r.name.clone(), r.lifecycle))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("alpha".to_string(), LifecycleStatus::Started),
                ("beta".to_string(), LifecycleStatus::Started),
                ("alpha".to_string(), LifecycleStatus::Stopped),
                ("zeta".to_string(), LifecycleStatus::Stopped),
            ]
        );
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut a = rec("same", LifecycleStatus::Started);
        a.ip = Some("10.0.0.1".to_string());
        let mut b = rec("same", LifecycleStatus::Started);
        b.ip = Some("10.0.0.2".to_string());
        let mut records = vec![a.clone(), b.clone()];
        sort_records(&mut records);
        assert_eq!(records[0].ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(records[1].ip.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn ordinal_name_comparison_is_case_sensitive() {
        // Ordinal ordering: uppercase letters sort before lowercase.
        let mut records = vec![
            rec("apple", LifecycleStatus::Started),
            rec("Banana", LifecycleStatus::Started),
        ];
        sort_records(&mut records);
        assert_eq!(records[0].name, "Banana");
    }

    #[tokio::test]
    async fn parse_stream_filters_and_counts() {
        let input = b"Site Name    Status    IP\n\
                      ==========================\n\
                      \n\
                      Alpha STARTED 10.0.0.1 80 alpha.example.com\n\
                      garbage line without status tokens\n\
                      Beta STOPPED 10.0.0.2\n" as &[u8];
        let (records, unparseable) = parse_stream(input).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(unparseable, 1);
        assert_eq!(records[0].name, "Alpha");
        assert_eq!(records[1].name, "Beta");
    }
}
