//! Capability traits over the host page.
//!
//! The runtime never touches a page directly. Everything it needs from the
//! document (selector queries, fragment insertion, script tags, child frame
//! measurement, mutation notifications) goes through [`PageDocument`], so the
//! same orchestration code runs against a browser binding or the in-memory
//! document used in tests.

mod fragment;
mod mutation;

use std::fmt;

pub use fragment::ElementSpec;
pub use mutation::{MutationBatch, MutationStream, debounce};
use url::Url;

use crate::Result;

/// Opaque handle to a page element.
///
/// Handles stay valid after the element is detached; operations on a
/// detached element fail with [`ErrorKind::NodeDetached`].
///
/// [`ErrorKind::NodeDetached`]: crate::ErrorKind::NodeDetached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw handle value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// What a single look into a child frame found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameProbe {
    /// The frame has no content document yet.
    NoDocument,
    /// The document exists but the widget container has not rendered.
    NoContainer,
    /// Rendered width of the widget container, in pixels.
    Width(f64),
}

/// Why a child frame's content could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameAccessError {
    /// The frame belongs to another origin; this never changes.
    #[error("cross-origin frame content is not accessible")]
    CrossOrigin,
    /// Any other failure, worth retrying.
    #[error("frame content not readable: {0}")]
    Transient(String),
}

impl FrameAccessError {
    /// Returns whether retrying can never succeed.
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::CrossOrigin)
    }
}

/// Access to the host page's document.
///
/// Implementations are shared across slot tasks and must be cheap to call
/// repeatedly; the runtime polls several of these methods on timers.
#[async_trait::async_trait]
pub trait PageDocument: Send + Sync {
    /// Returns the first connected element matching `selector`.
    fn query_selector(&self, selector: &str) -> Option<NodeId>;

    /// Returns whether the element is still attached to the document.
    fn is_connected(&self, node: NodeId) -> bool;

    /// Returns the element's parent, if attached.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Returns the element's text content.
    fn text_content(&self, node: NodeId) -> Option<String>;

    /// Replaces the element's text content.
    fn set_text_content(&self, node: NodeId, text: &str) -> Result<()>;

    /// Dispatches a bubbling `change` event at the element.
    fn dispatch_change(&self, node: NodeId) -> Result<()>;

    /// Sets one inline style property of the element.
    fn set_style_property(&self, node: NodeId, name: &str, value: &str) -> Result<()>;

    /// Inserts `fragment` as the next sibling of `anchor`; returns its root.
    fn insert_after(&self, anchor: NodeId, fragment: &ElementSpec) -> Result<NodeId>;

    /// Appends `fragment` as the last child of `parent`; returns its root.
    fn append_child(&self, parent: NodeId, fragment: &ElementSpec) -> Result<NodeId>;

    /// Appends `fragment` as the last child of the body; returns its root.
    fn append_to_body(&self, fragment: &ElementSpec) -> Result<NodeId>;

    /// Returns whether a script element with exactly this `src` exists.
    fn has_script(&self, src: &Url) -> bool;

    /// Inserts an async script element before the first script of the page
    /// and resolves once it has loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ScriptLoad`] when the script fails to load.
    ///
    /// [`ErrorKind::ScriptLoad`]: crate::ErrorKind::ScriptLoad
    async fn insert_script(&self, src: &Url) -> Result<()>;

    /// Returns whether the frame element has finished loading.
    fn frame_is_complete(&self, frame: NodeId) -> bool;

    /// Resolves once the frame element fires its load event.
    async fn frame_loaded(&self, frame: NodeId);

    /// Looks into the frame and measures the widget container.
    fn probe_frame(&self, frame: NodeId) -> Result<FrameProbe, FrameAccessError>;

    /// Subscribes to subtree mutations of the whole document.
    ///
    /// The returned stream yields one batch per mutation delivery and never
    /// ends while the document is alive.
    fn observe_mutations(&self) -> MutationStream;
}
