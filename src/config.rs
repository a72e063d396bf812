use std::num::NonZeroUsize;

use clap::ValueEnum;

use crate::error::{Error, Result};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 50;

/// Shape of the concurrent part of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Strategy {
    /// Each worker owns a line-aligned range and builds its own table.
    #[default]
    Ranges,
    /// Workers ship batches of parsed records to a single aggregator.
    Batched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ParserMode {
    #[default]
    BestEffort,
    Strict,
}

/// What to do with a line that is not a valid record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MalformedPolicy {
    #[default]
    Abort,
    Skip,
}

/// Rounding rule for the one-decimal mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Rounding {
    #[default]
    HalfAwayFromZero,
    HalfEven,
}

impl Rounding {
    pub fn round_tenths(self, value: f64) -> f64 {
        let scaled = value * 10.0;
        let rounded = match self {
            Rounding::HalfAwayFromZero => scaled.round(),
            Rounding::HalfEven => scaled.round_ties_even(),
        };
        rounded / 10.0
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub workers: usize,
    pub strategy: Strategy,
    pub parser: ParserMode,
    pub on_malformed: MalformedPolicy,
    pub rounding: Rounding,
    pub batch_size: usize,
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            strategy: Strategy::default(),
            parser: ParserMode::default(),
            on_malformed: MalformedPolicy::default(),
            rounding: Rounding::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_parser(mut self, parser: ParserMode) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("worker count must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be at least 1".into()));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Hardware parallelism, or 1 when it cannot be queried.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
