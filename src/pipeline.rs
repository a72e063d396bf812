//! Runs the workers over a shared region and reduces their tables.

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, warn};

use crate::config::{Config, MalformedPolicy, ParserMode, Strategy};
use crate::error::{Error, Result};
use crate::parse::{BestEffort, DecimalParser, Strict};
use crate::planner::{plan_chunks, ByteRange};
use crate::reduce::merge_outputs;
use crate::stats::AggregateTable;
use crate::worker::{scan_range, scan_records, ScanOutput};

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub bytes: usize,
    pub chunks: usize,
    pub records: u64,
    pub skipped: u64,
    pub keys: usize,
    pub plan_time: Duration,
    pub aggregate_time: Duration,
    pub report_time: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            bytes = self.bytes,
            chunks = self.chunks,
            records = self.records,
            keys = self.keys,
            plan_ms = self.plan_time.as_millis() as u64,
            aggregate_ms = self.aggregate_time.as_millis() as u64,
            report_ms = self.report_time.as_millis() as u64,
            "run complete"
        );
        if self.skipped > 0 {
            warn!(skipped = self.skipped, "skipped malformed lines");
        }
    }
}

/// The global table and how it was produced.
#[derive(Debug)]
pub struct Aggregation {
    pub table: AggregateTable,
    pub summary: RunSummary,
}

/// Aggregates the whole region with the configured parser and strategy.
pub fn aggregate(data: &[u8], config: &Config) -> Result<Aggregation> {
    config.validate()?;
    match config.parser {
        ParserMode::BestEffort => aggregate_with(data, config, &BestEffort),
        ParserMode::Strict => aggregate_with(data, config, &Strict),
    }
}

fn aggregate_with<P: DecimalParser>(data: &[u8], config: &Config, parser: &P) -> Result<Aggregation> {
    let started = Instant::now();
    let ranges = plan_chunks(data, config.workers);
    let plan_time = started.elapsed();
    debug!(bytes = data.len(), workers = config.workers, chunks = ranges.len(), "planned chunks");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("brc-worker-{i}"))
        .build()?;

    let started = Instant::now();
    let output = match config.strategy {
        Strategy::Ranges => by_ranges(&pool, data, &ranges, parser, config.on_malformed)?,
        Strategy::Batched => batched(&pool, data, &ranges, parser, config)?,
    };
    let aggregate_time = started.elapsed();

    let summary = RunSummary {
        bytes: data.len(),
        chunks: ranges.len(),
        records: output.records,
        skipped: output.skipped,
        keys: output.table.len(),
        plan_time,
        aggregate_time,
        report_time: Duration::ZERO,
    };
    Ok(Aggregation {
        table: output.table,
        summary,
    })
}

/// One task per range; the partial tables meet in a parallel reduction that
/// completes only once every range has been folded in.
fn by_ranges<P: DecimalParser>(
    pool: &ThreadPool,
    data: &[u8],
    ranges: &[ByteRange],
    parser: &P,
    policy: MalformedPolicy,
) -> Result<ScanOutput> {
    pool.install(|| {
        ranges
            .par_iter()
            .cloned()
            .map(|range| -> Result<ScanOutput> {
                let (start, end) = (range.start, range.end);
                let output = scan_range(data, range, parser, policy)?;
                debug!(start, end, records = output.records, keys = output.table.len(), "scanned chunk");
                Ok(output)
            })
            .try_reduce(ScanOutput::default, |a, b| Ok(merge_outputs(a, b)))
    })
}

struct Measurement<'a> {
    key: &'a [u8],
    value: f64,
}

enum Message<'a> {
    Batch(Vec<Measurement<'a>>),
    Done { skipped: u64 },
    Failed(Error),
}

/// Workers parse their range into batches of borrowed records and push them
/// through a bounded channel to one aggregator on the calling thread.
fn batched<P: DecimalParser>(
    pool: &ThreadPool,
    data: &[u8],
    ranges: &[ByteRange],
    parser: &P,
    config: &Config,
) -> Result<ScanOutput> {
    let (tx, rx) = bounded::<Message<'_>>(config.channel_capacity);
    let policy = config.on_malformed;
    let batch_size = config.batch_size;

    pool.in_place_scope(|scope| {
        for range in ranges.iter().cloned() {
            let tx = tx.clone();
            scope.spawn(move |_| produce_batches(data, range, parser, policy, batch_size, &tx));
        }
        drop(tx);

        let mut output = ScanOutput::default();
        let mut finished = 0usize;
        let mut failure = None;
        for message in rx.iter() {
            match message {
                Message::Batch(batch) => {
                    output.records += batch.len() as u64;
                    for Measurement { key, value } in batch {
                        output.table.record(key, value);
                    }
                }
                Message::Done { skipped } => {
                    output.skipped += skipped;
                    finished += 1;
                }
                Message::Failed(err) => {
                    finished += 1;
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }
        if finished != ranges.len() {
            return Err(Error::WorkerLost);
        }
        Ok(output)
    })
}

fn produce_batches<'a, P: DecimalParser>(
    data: &'a [u8],
    range: ByteRange,
    parser: &P,
    policy: MalformedPolicy,
    batch_size: usize,
    tx: &Sender<Message<'a>>,
) {
    // Send errors mean the aggregator is gone; the aggregator reports that.
    let mut batch = Vec::with_capacity(batch_size);
    let scanned = scan_records(data, range, parser, policy, |key, value| {
        batch.push(Measurement { key, value });
        if batch.len() == batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            let _ = tx.send(Message::Batch(full));
        }
    });
    match scanned {
        Ok(skipped) => {
            if !batch.is_empty() {
                let _ = tx.send(Message::Batch(batch));
            }
            let _ = tx.send(Message::Done { skipped });
        }
        Err(err) => {
            let _ = tx.send(Message::Failed(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(workers: usize, strategy: Strategy) -> Config {
        Config::new().with_workers(workers).with_strategy(strategy).with_batch_size(3)
    }

    fn sample() -> Vec<u8> {
        let stations = ["Hamburg", "Bulawayo", "Palembang", "St. John's", "Cracow", "Bridgetown"];
        let mut text = String::new();
        for i in 0..2_000u32 {
            let station = stations[(i as usize * 7 + i as usize / 5) % stations.len()];
            let tenths = (i * 37 % 1_999) as i32 - 999;
            text.push_str(&format!("{station};{:.1}\n", f64::from(tenths) / 10.0));
        }
        text.into_bytes()
    }

    #[test]
    fn results_do_not_depend_on_worker_count_or_strategy() {
        let data = sample();
        let reference = aggregate(&data, &config(1, Strategy::Ranges)).unwrap();
        assert_eq!(reference.summary.records, 2_000);

        for strategy in [Strategy::Ranges, Strategy::Batched] {
            for workers in 1..=8 {
                let run = aggregate(&data, &config(workers, strategy)).unwrap();
                assert_eq!(run.summary.records, 2_000, "{strategy:?} x{workers}");
                assert_eq!(run.table.len(), reference.table.len());
                for (key, expected) in reference.table.iter() {
                    let actual = run.table.get(key).unwrap();
                    assert_eq!(actual.min, expected.min);
                    assert_eq!(actual.max, expected.max);
                    assert_eq!(actual.count, expected.count);
                    assert!((actual.sum - expected.sum).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn empty_region_aggregates_to_empty_table() {
        for strategy in [Strategy::Ranges, Strategy::Batched] {
            let run = aggregate(b"", &config(4, strategy)).unwrap();
            assert!(run.table.is_empty());
            assert_eq!(run.summary.chunks, 0);
        }
    }

    #[test]
    fn malformed_line_aborts_both_strategies() {
        let data = b"a;1\nb;2\nno delimiter here\nc;3\n";
        for strategy in [Strategy::Ranges, Strategy::Batched] {
            let err = aggregate(data, &config(2, strategy)).unwrap_err();
            assert!(matches!(err, Error::Malformed { offset: 8, .. }), "{strategy:?}: {err}");
        }
    }

    #[test]
    fn skip_policy_reports_skipped_lines() {
        let data = b"a;1\nb;2\nno delimiter here\nc;3\n";
        for strategy in [Strategy::Ranges, Strategy::Batched] {
            let cfg = config(2, strategy).with_malformed_policy(MalformedPolicy::Skip);
            let run = aggregate(data, &cfg).unwrap();
            assert_eq!(run.summary.records, 3);
            assert_eq!(run.summary.skipped, 1);
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = aggregate(b"a;1\n", &Config::new().with_workers(0)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
