//! Bounded parallel fan-out for analysis jobs.
//!
//! The pool is sized from the context (`-j`), results come back in input
//! order, and the first failing job aborts the whole collection with an
//! error naming the job.

use std::fmt;

use anyhow::anyhow;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::log;

/// Run `f` over every item on a pool of `jobs` workers.
///
/// `desc` labels the batch; the failing item is appended to it in the error.
pub fn for_each<T, R, F>(jobs: usize, items: Vec<T>, desc: &str, f: F) -> Result<Vec<R>>
where
    T: Send + Sync + fmt::Display,
    R: Send,
    F: Fn(&T) -> Result<R> + Send + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| Error::Other(anyhow!("failed to build worker pool: {e}")))?;

    pool.install(|| {
        items
            .par_iter()
            .map(|item| {
                f(item).map_err(|source| {
                    let job_desc = format!("{desc}: {item}");
                    log::error_line(&format!("Job \"{job_desc}\" failed!"));
                    Error::Job {
                        desc: job_desc,
                        source: Box::new(source),
                    }
                })
            })
            .collect()
    })
}
