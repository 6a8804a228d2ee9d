//! Bounded-concurrency execution of independent jobs.
//!
//! A [`JobPool`] runs a round of named jobs on a fixed number of worker
//! threads and reports how each one went. Jobs are isolated: a failing job
//! never stops the others, and nothing already done by a job is undone when
//! another fails.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt::Display;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

/// Errors kept in a [`PoolReport`]; further failures are only counted.
pub const DEFAULT_MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),

    #[error("Concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("{failed} job(s) errored during the last round")]
    JobsFailed { failed: usize },
}

type JobFn<'a, T, E> = Box<dyn FnOnce() -> Result<T, E> + Send + 'a>;

pub struct Job<'a, T, E> {
    name: String,
    work: JobFn<'a, T, E>,
}

impl<'a, T, E> Job<'a, T, E> {
    pub fn new(name: impl Into<String>, work: impl FnOnce() -> Result<T, E> + Send + 'a) -> Self {
        Self {
            name: name.into(),
            work: Box::new(work),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
pub struct JobFailure<E> {
    pub job: String,
    pub error: E,
}

#[derive(Debug, Clone)]
pub struct JobTiming {
    pub job: String,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct PoolReport<T, E> {
    /// Outputs of the successful jobs, in submission order.
    pub outputs: Vec<T>,
    pub succeeded: usize,
    pub failed: usize,
    /// The first failures, capped at the pool's error limit.
    pub errors: Vec<JobFailure<E>>,
    pub timings: Vec<JobTiming>,
}

impl<T, E: Display> PoolReport<T, E> {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn log_errors(&self) {
        for failure in &self.errors {
            error!("Job '{}' failed: {}", failure.job, failure.error);
        }
        if self.failed > self.errors.len() {
            error!(
                "... and {} more failed job(s)",
                self.failed - self.errors.len()
            );
        }
    }

    pub fn slowest(&self, n: usize) -> Vec<&JobTiming> {
        let mut timings: Vec<&JobTiming> = self.timings.iter().collect();
        timings.sort_by(|a, b| b.duration.cmp(&a.duration));
        timings.truncate(n);
        timings
    }

    pub fn log_slowest(&self, n: usize) {
        for timing in self.slowest(n) {
            info!("Slow job '{}' took {:?}", timing.job, timing.duration);
        }
    }

    /// Successful outputs, or [`PoolError::JobsFailed`] if any job failed.
    pub fn into_result(self) -> Result<Vec<T>, PoolError> {
        if self.is_success() {
            Ok(self.outputs)
        } else {
            Err(PoolError::JobsFailed {
                failed: self.failed,
            })
        }
    }
}

pub struct JobPool {
    pool: ThreadPool,
    concurrency: usize,
    max_reported_errors: usize,
}

impl JobPool {
    pub fn new(concurrency: usize) -> Result<Self, PoolError> {
        if concurrency == 0 {
            return Err(PoolError::ZeroConcurrency);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|i| format!("job-pool-{}", i))
            .build()?;
        Ok(Self {
            pool,
            concurrency,
            max_reported_errors: DEFAULT_MAX_REPORTED_ERRORS,
        })
    }

    pub fn with_max_reported_errors(mut self, max_reported_errors: usize) -> Self {
        self.max_reported_errors = max_reported_errors;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs every job, at most `concurrency` at a time, and waits for all of
    /// them to finish.
    pub fn run<'a, T, E>(&self, jobs: Vec<Job<'a, T, E>>) -> PoolReport<T, E>
    where
        T: Send,
        E: Send,
    {
        let results: Vec<(String, Duration, Result<T, E>)> = self.pool.install(|| {
            jobs.into_par_iter()
                // One job per task so a slow job never holds back queued ones
                .with_max_len(1)
                .map(|job| {
                    let started = Instant::now();
                    let result = (job.work)();
                    (job.name, started.elapsed(), result)
                })
                .collect()
        });

        let mut report = PoolReport {
            outputs: Vec::with_capacity(results.len()),
            succeeded: 0,
            failed: 0,
            errors: Vec::new(),
            timings: Vec::with_capacity(results.len()),
        };
        for (name, duration, result) in results {
            report.timings.push(JobTiming {
                job: name.clone(),
                duration,
            });
            match result {
                Ok(output) => {
                    report.succeeded += 1;
                    report.outputs.push(output);
                }
                Err(error) => {
                    report.failed += 1;
                    if report.errors.len() < self.max_reported_errors {
                        report.errors.push(JobFailure { job: name, error });
                    }
                }
            }
        }
        report
    }
}
