//! Comment thread collaborator
//!
//! One logical writer per snapshot id serialises appends; the core only
//! routes create/list calls by id.

use crate::types::SnapshotId;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A stored comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Position in the thread, starting at 1
    pub seq: u64,
    /// Display name of the author
    pub author: String,
    /// Comment text
    pub body: String,
    /// Append time, ms since epoch
    pub created_at: u64,
}

/// A comment to append
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    /// Display name of the author
    pub author: String,
    /// Comment text
    pub body: String,
}

/// Per-snapshot ordered comment log
#[async_trait]
pub trait CommentThreadEffects: Send + Sync {
    /// All comments of a thread in append order
    async fn list(&self, snapshot: &SnapshotId) -> Result<Vec<Comment>>;

    /// Append to a thread, returning the stored comment
    async fn append(
        &self,
        snapshot: &SnapshotId,
        comment: NewComment,
        now_ms: u64,
    ) -> Result<Comment>;
}

#[async_trait]
impl<T: CommentThreadEffects + ?Sized> CommentThreadEffects for Arc<T> {
    async fn list(&self, snapshot: &SnapshotId) -> Result<Vec<Comment>> {
        (**self).list(snapshot).await
    }

    async fn append(
        &self,
        snapshot: &SnapshotId,
        comment: NewComment,
        now_ms: u64,
    ) -> Result<Comment> {
        (**self).append(snapshot, comment, now_ms).await
    }
}
