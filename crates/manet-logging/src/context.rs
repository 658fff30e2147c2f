//! Node context injection
//!
//! Thread-local storage for the node whose callback is running. Entering a
//! node also enters a `node` span carrying `node` and `run_id` fields, so
//! every event logged inside the callback is tagged with both in pretty and
//! JSONL output.

use std::cell::RefCell;

use manet_core::NodeId;
use tracing::span::EnteredSpan;
use uuid::Uuid;

/// Node context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContextData {
    /// The node's id, as displayed
    pub node_id: String,
    /// Identifies one simulation run
    pub run_id: Uuid,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// Sets the node context for the current thread and restores the previous
/// one when dropped. The `node` span is exited after the context is restored.
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
    _span: EnteredSpan,
}

impl NodeContextGuard {
    /// Enter the context of `node` within run `run_id`
    pub fn new(node: NodeId, run_id: Uuid) -> Self {
        let previous = NODE_CONTEXT.with(|ctx| ctx.borrow().clone());

        let new_ctx = NodeContextData {
            node_id: node.short_id(),
            run_id,
        };
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = Some(new_ctx));

        let span = tracing::info_span!("node", node = %node, run_id = %run_id).entered();
        Self {
            previous,
            _span: span,
        }
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current node id (if set)
    pub fn current_node_id() -> Option<String> {
        Self::current().map(|ctx| ctx.node_id)
    }

    /// Get the current run id (if set)
    pub fn current_run_id() -> Option<Uuid> {
        Self::current().map(|ctx| ctx.run_id)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}
