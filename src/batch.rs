//! Concurrent analysis of many archives
//!
//! A [`BatchAnalyzer`] owns a dedicated rayon pool sized from the worker
//! config. Runs are independent; each one materializes into its own temp
//! file and produces its own outcome.

use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AnalysisError, AnalysisResult};
use crate::pipeline::{analyze_archive, AnalysisOutcome, CancelToken};
use crate::sync::Clock;

pub struct BatchAnalyzer {
    pool: rayon::ThreadPool,
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
}

impl BatchAnalyzer {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> AnalysisResult<Self> {
        let workers = config.workers.max_workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("bakcheck-worker-{i}"))
            .build()
            .map_err(|e| AnalysisError::Config(format!("worker pool: {e}")))?;
        debug!(workers, "Worker pool ready");

        Ok(Self {
            pool,
            config: Arc::new(config),
            clock,
            cancel: CancelToken::new(),
        })
    }

    /// Token that cancels every pending and running analysis of this batch
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze all paths; outcomes are returned in input order
    pub fn analyze_all(&self, paths: &[PathBuf]) -> Vec<AnalysisOutcome> {
        info!(archives = paths.len(), workers = self.pool.current_num_threads(), "Batch started");
        let config = self.config.as_ref();
        let clock = self.clock.as_ref();
        let cancel = &self.cancel;

        let outcomes: Vec<AnalysisOutcome> = self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| analyze_archive(path, config, clock, cancel))
                .collect()
        });

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(archives = outcomes.len(), failed, "Batch finished");
        outcomes
    }

    /// Queue one archive; the receiver resolves once the run is finalized
    pub fn spawn(&self, path: PathBuf) -> oneshot::Receiver<AnalysisOutcome> {
        let (tx, rx) = oneshot::channel();
        let config = Arc::clone(&self.config);
        let clock = Arc::clone(&self.clock);
        let cancel = self.cancel.clone();

        self.pool.spawn(move || {
            let outcome = analyze_archive(&path, &config, clock.as_ref(), &cancel);
            if tx.send(outcome).is_err() {
                debug!(path = %path.display(), "Outcome receiver dropped");
            }
        });
        rx
    }
}
