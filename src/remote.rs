use std::{future::Future, path::PathBuf, pin::Pin};

use anyhow::{Context, Result};

use crate::models::{parse_reports, Report};

pub type RemoteFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Report>>> + Send + 'a>>;

/// Authoritative source the periodic sync reconciles the local slot with.
pub trait RemoteSource: Send + Sync {
    fn fetch_reports(&self) -> RemoteFuture<'_>;
}

/// Reads the authoritative report list from a JSON snapshot on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFileSource {
    path: PathBuf,
}

impl SnapshotFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RemoteSource for SnapshotFileSource {
    fn fetch_reports(&self) -> RemoteFuture<'_> {
        Box::pin(async move {
            let raw = tokio::fs::read_to_string(&self.path)
                .await
                .with_context(|| format!("reading snapshot {}", self.path.display()))?;
            let reports = parse_reports(&raw)
                .with_context(|| format!("parsing snapshot {}", self.path.display()))?;
            Ok(reports)
        })
    }
}
