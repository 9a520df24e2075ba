use anyhow::{Error, anyhow};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use vdom::NodeHandle;

/// Generic mirror replaying the update batches a [`Document`](super::Document) publishes.
pub struct DomMirror<T: DomSubscriber> {
    in_updater: broadcast::Receiver<Vec<DomUpdate>>,
    mirror: T,
}

impl<T: DomSubscriber> DomMirror<T> {
    pub const fn new(in_updater: broadcast::Receiver<Vec<DomUpdate>>, mirror: T) -> Self {
        Self { in_updater, mirror }
    }

    /// Wait for the next batch and apply it.
    ///
    /// Returns `false` once the document side has gone away.
    ///
    /// # Errors
    /// Fails when the subscriber rejects an update.
    pub async fn update(&mut self) -> Result<bool, Error> {
        match self.in_updater.recv().await {
            Ok(batch) => {
                self.apply_batch(batch)?;
                Ok(true)
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                Err(anyhow!("Mirror lagged behind by {skipped} batches"))
            }
            Err(broadcast::error::RecvError::Closed) => Ok(false),
        }
    }

    /// Apply every batch already queued without waiting.
    ///
    /// # Errors
    /// Fails when the subscriber rejects an update or batches were lost.
    pub fn try_update_sync(&mut self) -> Result<usize, Error> {
        let mut applied = 0;
        loop {
            match self.in_updater.try_recv() {
                Ok(batch) => {
                    self.apply_batch(batch)?;
                    applied += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    return Err(anyhow!("Mirror lagged behind by {skipped} batches"));
                }
            }
        }
        Ok(applied)
    }

    fn apply_batch(&mut self, batch: Vec<DomUpdate>) -> Result<(), Error> {
        for update in batch {
            self.mirror.apply_update(update)?;
        }
        Ok(())
    }

    pub const fn mirror(&self) -> &T {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut T {
        &mut self.mirror
    }

    pub fn into_inner(self) -> T {
        self.mirror
    }
}

/// One change to the document tree.
///
/// `pos` is the index of the node among its parent's children right after
/// the insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DomUpdate {
    InsertElement {
        #[serde(with = "handle")]
        parent: NodeHandle,
        #[serde(with = "handle")]
        node: NodeHandle,
        tag: String,
        pos: usize,
    },
    InsertText {
        #[serde(with = "handle")]
        parent: NodeHandle,
        #[serde(with = "handle")]
        node: NodeHandle,
        text: String,
        pos: usize,
    },
    InsertComment {
        #[serde(with = "handle")]
        parent: NodeHandle,
        #[serde(with = "handle")]
        node: NodeHandle,
        text: String,
        pos: usize,
    },
    /// A node that was attached before is placed again.
    MoveNode {
        #[serde(with = "handle")]
        parent: NodeHandle,
        #[serde(with = "handle")]
        node: NodeHandle,
        pos: usize,
    },
    RemoveNode {
        #[serde(with = "handle")]
        node: NodeHandle,
    },
    SetAttr {
        #[serde(with = "handle")]
        node: NodeHandle,
        name: String,
        value: String,
    },
    RemoveAttr {
        #[serde(with = "handle")]
        node: NodeHandle,
        name: String,
    },
    SetText {
        #[serde(with = "handle")]
        node: NodeHandle,
        text: String,
    },
    SetStyleScope {
        #[serde(with = "handle")]
        node: NodeHandle,
        scope: String,
    },
}

pub trait DomSubscriber {
    /// # Errors
    /// Implementations reject updates they cannot apply.
    fn apply_update(&mut self, update: DomUpdate) -> Result<(), Error>;
}

/// Handles travel as bare numbers.
mod handle {
    use serde::{Deserialize, Deserializer, Serializer};
    use vdom::NodeHandle;

    #[allow(clippy::trivially_copy_pass_by_ref, reason = "Signature required by serde's `with` attribute")]
    pub fn serialize<S: Serializer>(node: &NodeHandle, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(node.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NodeHandle, D::Error> {
        u64::deserialize(deserializer).map(NodeHandle)
    }
}
