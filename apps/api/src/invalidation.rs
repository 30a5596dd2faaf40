//! Stale-view signalling. Mutations announce which rendered paths are out of
//! date; whatever renders them (a frontend revalidator, an SSR cache) listens
//! on the broadcast channel.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The path and everything rendered beneath it.
    Layout,
    /// Only the path itself.
    Page,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalePath {
    pub path: String,
    pub scope: Scope,
}

impl StalePath {
    pub fn layout(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scope: Scope::Layout,
        }
    }

    pub fn page(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scope: Scope::Page,
        }
    }
}

pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, paths: Vec<StalePath>);
}

/// Fans invalidations out to every subscriber. Sending with no subscribers is
/// not an error.
pub struct BroadcastInvalidator {
    tx: broadcast::Sender<Vec<StalePath>>,
}

impl BroadcastInvalidator {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<StalePath>> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastInvalidator {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheInvalidator for BroadcastInvalidator {
    fn invalidate(&self, paths: Vec<StalePath>) {
        tracing::debug!(?paths, "Invalidating cached views");
        let _ = self.tx.send(paths);
    }
}

// Path sets per mutation.

pub fn profile_views() -> Vec<StalePath> {
    ["/", "/profile/edit", "/resumes", "/profile"]
        .into_iter()
        .map(StalePath::layout)
        .collect()
}

pub fn base_resume_created() -> Vec<StalePath> {
    vec![StalePath::layout("/")]
}

pub fn tailored_resume_created() -> Vec<StalePath> {
    vec![StalePath::layout("/"), StalePath::layout("/resumes")]
}

pub fn resume_page(resume_id: Uuid) -> Vec<StalePath> {
    vec![StalePath::page(format!("/resumes/{resume_id}"))]
}

pub fn resume_copied() -> Vec<StalePath> {
    [
        "/",
        "/resumes",
        "/dashboard",
        "/resumes/base",
        "/resumes/tailored",
    ]
    .into_iter()
    .map(StalePath::layout)
    .collect()
}

pub fn resume_deleted() -> Vec<StalePath> {
    let mut paths = resume_copied();
    paths.push(StalePath::layout("/jobs"));
    paths
}

pub fn job_deleted(referencing_resumes: &[Uuid]) -> Vec<StalePath> {
    let mut paths: Vec<StalePath> = referencing_resumes
        .iter()
        .flat_map(|id| resume_page(*id))
        .collect();
    paths.push(StalePath::layout("/"));
    paths.push(StalePath::layout("/resumes"));
    paths
}

pub fn jobs_changed() -> Vec<StalePath> {
    vec![StalePath::layout("/")]
}

pub fn settings() -> Vec<StalePath> {
    vec![StalePath::layout("/settings")]
}
