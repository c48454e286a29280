//! JSON replay scripts: drive a [`RenderControlDispatcher`] from recorded
//! per-thread request streams against the in-memory backend.

use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::Arc,
};

use tracing::{debug, info};

use crate::{
    backend::{
        graphics::GraphicsBackend,
        software::{SoftwareBackend, SoftwareBackendOpts},
    },
    control::{
        decoder::{Request, Response, execute},
        dispatcher::{RenderControl, RenderControlDispatcher},
    },
    foundation::{
        config::FeatureFlags,
        error::{RenderControlError, RcResult},
    },
    thread::info::RenderThreadInfo,
};

/// Requests issued by one guest rendering thread, in order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorkerScript {
    /// Unique worker name.
    pub name: String,
    /// Requests in issue order.
    #[serde(default)]
    pub requests: Vec<Request>,
}

/// A complete replay: feature flags, backend options and one request stream
/// per worker. Workers run concurrently, one host thread each.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReplayScript {
    /// Dispatcher feature flags.
    #[serde(default)]
    pub features: FeatureFlags,
    /// Options for the in-memory backend.
    #[serde(default)]
    pub backend: SoftwareBackendOpts,
    /// One entry per guest thread.
    pub workers: Vec<WorkerScript>,
}

/// One executed request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReplyRecord {
    /// Wire name of the operation.
    pub op: String,
    /// Wire opcode.
    pub opcode: u32,
    /// Decoded reply.
    pub response: Response,
}

/// Replies of one worker, in request order.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WorkerTranscript {
    /// Worker name from the script.
    pub name: String,
    /// One record per request.
    pub replies: Vec<ReplyRecord>,
    /// Checksum protocol version selected by the end of the stream.
    pub checksum_version: u32,
}

/// Outcome of [`ReplayScript::run`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReplayReport {
    /// Transcripts in script order.
    pub workers: Vec<WorkerTranscript>,
    /// Backend resources still alive after every worker finished.
    pub live_handles: usize,
    /// Ordering gate tickets handed out during the run.
    pub gate_tickets: u64,
}

impl ReplayScript {
    /// Load and validate a script from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> RcResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RenderControlError::replay(format!("open replay script '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Parse and validate a script from JSON.
    pub fn from_reader(r: impl Read) -> RcResult<Self> {
        let script: Self = serde_json::from_reader(r)
            .map_err(|e| RenderControlError::serde(format!("parse replay script: {e}")))?;
        script.validate()?;
        Ok(script)
    }

    /// Reject scripts without workers or with empty or duplicate names.
    pub fn validate(&self) -> RcResult<()> {
        if self.workers.is_empty() {
            return Err(RenderControlError::replay(
                "replay script needs at least one worker",
            ));
        }
        let mut seen = HashSet::new();
        for w in &self.workers {
            if w.name.trim().is_empty() {
                return Err(RenderControlError::replay("worker name must be non-empty"));
            }
            if !seen.insert(w.name.as_str()) {
                return Err(RenderControlError::replay(format!(
                    "duplicate worker name '{}'",
                    w.name
                )));
            }
        }
        Ok(())
    }

    /// Run every worker to completion and collect their replies.
    #[tracing::instrument(skip_all, fields(workers = self.workers.len()))]
    pub fn run(&self) -> RcResult<ReplayReport> {
        self.validate()?;
        let fb = Arc::new(SoftwareBackend::new(self.backend.clone())?);
        let backend: Arc<dyn GraphicsBackend> = fb.clone();
        let rc = RenderControlDispatcher::with_features(Some(backend), self.features);

        let workers = std::thread::scope(|scope| -> RcResult<Vec<WorkerTranscript>> {
            let handles: Vec<_> = self
                .workers
                .iter()
                .map(|w| {
                    let rc = &rc;
                    scope.spawn(move || run_worker(rc, w))
                })
                .collect();

            handles
                .into_iter()
                .zip(&self.workers)
                .map(|(h, w)| {
                    h.join().map_err(|_| {
                        RenderControlError::replay(format!("worker '{}' panicked", w.name))
                    })
                })
                .collect()
        })?;

        let report = ReplayReport {
            workers,
            live_handles: fb.live_handles(),
            gate_tickets: rc.gate().tickets_issued(),
        };
        info!(
            live_handles = report.live_handles,
            gate_tickets = report.gate_tickets,
            "replay finished"
        );
        Ok(report)
    }
}

fn run_worker(rc: &RenderControlDispatcher, script: &WorkerScript) -> WorkerTranscript {
    let mut thread = RenderThreadInfo::new();
    debug!(worker = %script.name, id = thread.worker().0, "replay worker started");

    let replies = script
        .requests
        .iter()
        .map(|req| {
            let op = req.op();
            ReplyRecord {
                op: op.name().to_owned(),
                opcode: op.opcode(),
                response: execute(rc, &mut thread, req),
            }
        })
        .collect();

    let checksum_version = thread.checksum().version();
    rc.release_thread(&mut thread);
    WorkerTranscript {
        name: script.name.clone(),
        replies,
        checksum_version,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/replay/script.rs"]
mod tests;
