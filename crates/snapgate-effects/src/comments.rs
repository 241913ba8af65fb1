//! In-memory comment threads
//!
//! Each snapshot id owns one thread behind its own lock, so appends to one
//! thread are serialised while unrelated threads proceed independently.

use async_trait::async_trait;
use snapgate_core::effects::{Comment, CommentThreadEffects, NewComment};
use snapgate_core::{Result, SnapshotId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type Thread = Arc<Mutex<Vec<Comment>>>;

/// Single-writer-per-thread comment store
#[derive(Clone, Default)]
pub struct MemoryCommentThreads {
    threads: Arc<RwLock<HashMap<SnapshotId, Thread>>>,
}

impl MemoryCommentThreads {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    async fn thread(&self, snapshot: &SnapshotId) -> Thread {
        if let Some(thread) = self.threads.read().await.get(snapshot) {
            return Arc::clone(thread);
        }
        let mut threads = self.threads.write().await;
        Arc::clone(threads.entry(snapshot.clone()).or_default())
    }
}

#[async_trait]
impl CommentThreadEffects for MemoryCommentThreads {
    async fn list(&self, snapshot: &SnapshotId) -> Result<Vec<Comment>> {
        let threads = self.threads.read().await;
        match threads.get(snapshot) {
            Some(thread) => Ok(thread.lock().await.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn append(
        &self,
        snapshot: &SnapshotId,
        comment: NewComment,
        now_ms: u64,
    ) -> Result<Comment> {
        let thread = self.thread(snapshot).await;
        let mut comments = thread.lock().await;
        let stored = Comment {
            seq: comments.len() as u64 + 1,
            author: comment.author,
            body: comment.body,
            created_at: now_ms,
        };
        comments.push(stored.clone());
        Ok(stored)
    }
}
