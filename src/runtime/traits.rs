//! Trait abstractions for runtime I/O
//!
//! The rendering surface sits behind `PreviewSink` so the conversation can be
//! tested without a live event stream.

use super::WorkspaceEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Receives the annotated document whenever it changes
pub trait PreviewSink: Send + Sync {
    fn publish(&self, markup: &str);
}

impl<T: PreviewSink + ?Sized> PreviewSink for Arc<T> {
    fn publish(&self, markup: &str) {
        (**self).publish(markup);
    }
}

// ============================================================================
// Production implementation
// ============================================================================

/// Publishes previews onto the workspace event channel
pub struct BroadcastPreview {
    tx: broadcast::Sender<WorkspaceEvent>,
}

impl BroadcastPreview {
    pub fn new(tx: broadcast::Sender<WorkspaceEvent>) -> Self {
        Self { tx }
    }
}

impl PreviewSink for BroadcastPreview {
    fn publish(&self, markup: &str) {
        // No subscribers is fine; the latest markup is also served on demand
        let _ = self.tx.send(WorkspaceEvent::Preview {
            html: markup.to_string(),
        });
    }
}
