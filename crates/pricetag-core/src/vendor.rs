//! Handle on the vendor widget runtime.

use std::fmt;
use std::sync::Arc;

/// Tracing target for vendor runtime calls.
const TRACING_TARGET: &str = "pricetag_core::vendor";

/// The vendor script's global surface, once loaded.
pub trait VendorRuntime: Send + Sync {
    /// Returns whether the vendor runtime has finished loading.
    fn is_ready(&self) -> bool;

    /// Asks the vendor runtime to re-scan the document for new markers.
    ///
    /// Has no effect while the runtime is not ready.
    fn rescan(&self);
}

/// Cloneable handle on a [`VendorRuntime`].
///
/// The readiness flag is shared process-wide: another page script may load
/// the vendor runtime, so readiness can flip at any time.
#[derive(Clone)]
pub struct VendorRuntimeHandle {
    inner: Arc<dyn VendorRuntime>,
}

impl fmt::Debug for VendorRuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorRuntimeHandle")
            .field("ready", &self.inner.is_ready())
            .finish_non_exhaustive()
    }
}

impl VendorRuntimeHandle {
    /// Wraps a vendor runtime implementation.
    pub fn new<V>(runtime: V) -> Self
    where
        V: VendorRuntime + 'static,
    {
        Self {
            inner: Arc::new(runtime),
        }
    }

    /// Wraps an already shared vendor runtime.
    pub fn from_arc(runtime: Arc<dyn VendorRuntime>) -> Self {
        Self { inner: runtime }
    }

    /// Returns whether the vendor runtime has finished loading.
    pub fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    /// Asks a ready vendor runtime to pick up newly inserted markers.
    ///
    /// Returns whether the request was delivered.
    pub fn rescan(&self) -> bool {
        if !self.inner.is_ready() {
            tracing::debug!(target: TRACING_TARGET, "Vendor runtime not ready, skipping rescan");
            return false;
        }

        tracing::trace!(target: TRACING_TARGET, "Requesting vendor rescan");
        self.inner.rescan();
        true
    }
}
