//! Bridge to the embedded third-party chat widget
//!
//! The widget renders itself inside an isolated (shadow) subtree and exposes
//! no API. [`WidgetBridge`] locates that subtree, hides the widget's own
//! floating button, and then drives the widget through its existing controls:
//! it opens it, types into its input, presses its send control, and watches
//! its message list for new assistant messages.
//!
//! Everything the bridge knows about the widget's markup lives in
//! [`WidgetSelectors`]; all page access goes through [`WidgetDom`], so the
//! bridge runs the same against a real browser page ([`CdpDom`]) and against
//! an in-memory subtree in tests.

mod bridge;
mod cdp;
mod discovery;
mod selectors;

#[cfg(test)]
pub(crate) mod fake;

pub use bridge::{classify, Author, BridgeTiming, MessageCursor, WidgetBridge, WidgetHandle};
pub use cdp::{BrowserError, CdpDom, PageSession};
pub use discovery::{discover, DiscoveryConfig, DiscoveryOutcome};
pub use selectors::{OpenStrategy, SuppressStyle, UserMarkers, WidgetSelectors};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Opaque reference to a node inside the page, minted by the [`WidgetDom`]
/// implementation. The bridge never constructs or owns widget nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef(pub String);

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the bridge can see of one message-list child
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub text: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

impl ElementSnapshot {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// One child-list mutation notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationBatch {
    /// Number of children the observed node has after the mutation
    pub child_count: usize,
}

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node is no longer attached: {0}")]
    Detached(NodeRef),

    #[error("Page script failed: {0}")]
    Script(String),
}

/// The page operations the bridge is built on
#[async_trait]
pub trait WidgetDom: Send + Sync {
    /// Direct children of the document body that host an isolated subtree
    async fn shadow_hosts(&self) -> Result<Vec<NodeRef>, DomError>;

    /// First match for `selector` inside `root`'s isolated subtree
    async fn query(&self, root: &NodeRef, selector: &str) -> Result<Option<NodeRef>, DomError>;

    /// Set inline style declarations on `node`
    async fn apply_style(&self, node: &NodeRef, declarations: &[(&str, &str)])
        -> Result<(), DomError>;

    /// Dispatch a synthetic click
    async fn click(&self, node: &NodeRef) -> Result<(), DomError>;

    /// Assign `value` through the element prototype's own `value` setter so
    /// that wrappers installed by the widget still observe the change
    async fn set_native_value(&self, node: &NodeRef, value: &str) -> Result<(), DomError>;

    /// Dispatch a bubbling, composed `input` event
    async fn dispatch_input(&self, node: &NodeRef) -> Result<(), DomError>;

    async fn child_count(&self, node: &NodeRef) -> Result<usize, DomError>;

    /// Snapshots of `node`'s children starting at index `from`
    async fn children(&self, node: &NodeRef, from: usize)
        -> Result<Vec<ElementSnapshot>, DomError>;

    /// Stream of child-list mutations on `node`. The stream ends when the
    /// node goes away or the page closes.
    async fn observe_children(&self, node: &NodeRef)
        -> Result<mpsc::Receiver<MutationBatch>, DomError>;
}
