//! Application state: problem loader, test runner, optional hint client.
//!
//! Everything here is read-only after startup and shared by all HTTP
//! requests and WebSocket sessions. Per-viewer state (loaded problem, hint
//! toggle, last hint) lives in `session::ViewSession`, not here.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;
use crate::hint::HintClient;
use crate::runner::TestRunner;
use crate::sandbox::{Executor, NodeSandbox};
use crate::seeds::{problem_from_cfg, seed_problems};
use crate::store::{DirStore, DocumentStore, MemoryStore, ProblemLoader};

pub struct AppState {
    pub loader: ProblemLoader,
    pub runner: TestRunner,
    pub hints: Option<HintClient>,
    pub config: AppConfig,
}

impl AppState {
    /// Build state from config: bank + seeds + optional problems dir, the
    /// node sandbox, and the hint client if a base URL is configured.
    #[instrument(level = "info", skip_all)]
    pub fn new(config: AppConfig) -> Self {
        let executor: Arc<dyn Executor> = Arc::new(NodeSandbox::new(config.runner.clone()));
        Self::with_executor(config, executor)
    }

    /// Same as `new` but with a caller-supplied executor.
    pub fn with_executor(config: AppConfig, executor: Arc<dyn Executor>) -> Self {
        // Config bank first so it can shadow built-in seeds with the same id.
        let bank = config.problems.iter().map(problem_from_cfg);
        let memory = MemoryStore::new(bank.chain(seed_problems()));
        info!(target: "problems", bank = config.problems.len(), in_memory = memory.len(), "Startup problem inventory");
        if memory.is_empty() {
            warn!(target: "problems", "No in-memory problems; only the document directory can serve loads");
        }

        let mut stores: Vec<Box<dyn DocumentStore>> = vec![Box::new(memory)];
        if let Some(dir) = &config.storage.problems_dir {
            info!(target: "problems", dir = %dir.display(), "Serving problem documents from directory");
            stores.push(Box::new(DirStore::new(dir.clone())));
        }

        info!(
            target: "runner",
            node = %config.runner.node_binary,
            timeout_ms = config.runner.timeout_ms,
            memory_mb = config.runner.memory_limit_mb,
            parallel = config.runner.max_parallel_runs,
            "Sandbox configured"
        );

        let hints = match HintClient::from_config(&config.hints) {
            Ok(Some(c)) => {
                info!(target: "hints", url = %c.url, "Hints enabled.");
                Some(c)
            }
            Ok(None) => {
                info!(target: "hints", "Hints disabled (no HINT_API_URL / [hints].base_url).");
                None
            }
            Err(e) => {
                error!(target: "hints", error = %e, "Failed to build hint client; hints disabled.");
                None
            }
        };

        Self {
            loader: ProblemLoader::new(stores),
            runner: TestRunner::new(executor),
            hints,
            config,
        }
    }
}
