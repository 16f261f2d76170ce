//! Vendor script loading with a grace period.
//!
//! Other integrations on the same page may load the vendor script too. The
//! loader only takes ownership of loading after a grace period in which the
//! shared readiness signal stayed unset, and never inserts a second script
//! tag for the same URL.

use std::convert::Infallible;
use std::future;
use std::sync::Arc;

use pricetag_core::{
    Attempt, Error, PageDocument, PollPolicy, Result, RuntimeConfig, VendorRuntimeHandle,
};

use crate::TRACING_TARGET_LOADER;

/// How the vendor runtime came to be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Ready before `load` was called; nothing was done.
    AlreadyReady,
    /// Became ready during the grace period; another actor loaded it.
    LoadedByPeer,
    /// A script tag with the same URL existed; waited for readiness.
    AwaitedExistingScript,
    /// This loader inserted the script tag and it loaded.
    Injected,
}

/// Ensures exactly one load of the vendor script.
#[derive(Clone)]
pub struct AssetLoader {
    document: Arc<dyn PageDocument>,
    vendor: VendorRuntimeHandle,
    config: RuntimeConfig,
}

impl AssetLoader {
    /// Creates a loader over the page and vendor runtime.
    pub fn new(
        document: Arc<dyn PageDocument>,
        vendor: VendorRuntimeHandle,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            document,
            vendor,
            config,
        }
    }

    /// Loads the vendor script for the merchant `code`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `code` is empty, or a script load
    /// error if the inserted script fails to load.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_LOADER, name = "load_vendor_script")]
    pub async fn load(&self, code: &str) -> Result<LoadOutcome> {
        let src = self.config.script_url(code)?;

        if self.vendor.is_ready() {
            tracing::debug!(target: TRACING_TARGET_LOADER, "Vendor runtime already ready");
            return Ok(LoadOutcome::AlreadyReady);
        }

        let grace = PollPolicy::bounded(self.config.poll_interval(), self.config.grace_polls());
        if grace.poll(|| self.readiness()).await.is_ok() {
            tracing::debug!(
                target: TRACING_TARGET_LOADER,
                "Vendor runtime became ready during the grace period"
            );
            return Ok(LoadOutcome::LoadedByPeer);
        }

        if self.document.has_script(&src) {
            tracing::debug!(
                target: TRACING_TARGET_LOADER,
                src = %src,
                "Vendor script tag already present, waiting for readiness"
            );
            PollPolicy::unbounded(self.config.poll_interval())
                .poll(|| self.readiness())
                .await
                .map_err(|_| {
                    Error::internal().with_message("unbounded readiness poll ended without value")
                })?;
            return Ok(LoadOutcome::AwaitedExistingScript);
        }

        tracing::info!(target: TRACING_TARGET_LOADER, src = %src, "Inserting vendor script");
        self.document.insert_script(&src).await.inspect_err(|error| {
            tracing::error!(
                target: TRACING_TARGET_LOADER,
                src = %src,
                error = %error,
                "Vendor script failed to load"
            );
        })?;

        Ok(LoadOutcome::Injected)
    }

    fn readiness(&self) -> future::Ready<Attempt<(), Infallible>> {
        future::ready(if self.vendor.is_ready() {
            Attempt::Done(())
        } else {
            Attempt::Pending
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pricetag_core::ErrorKind;
    use pricetag_test::{MemoryDocument, MockVendor, ScriptBehavior};
    use tokio::time::Instant;

    use super::*;

    const SRC: &str = "https://pricetag.viabill.com/script/abc123";

    fn loader(doc: &MemoryDocument, vendor: &MockVendor) -> AssetLoader {
        AssetLoader::new(
            Arc::new(doc.clone()),
            vendor.handle(),
            RuntimeConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_ready_resolves_without_timers() {
        let doc = MemoryDocument::new();
        let vendor = MockVendor::ready();
        let started = Instant::now();

        let outcome = loader(&doc, &vendor).load("abc123").await.unwrap();

        assert_eq!(outcome, LoadOutcome::AlreadyReady);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(doc.count("script"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_load_during_grace_period_skips_injection() {
        let doc = MemoryDocument::new();
        let vendor = MockVendor::new();
        let peer = vendor.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            peer.set_ready(true);
        });

        let outcome = loader(&doc, &vendor).load("abc123").await.unwrap();

        assert_eq!(outcome, LoadOutcome::LoadedByPeer);
        assert_eq!(doc.scripts_inserted(), 0);
        assert_eq!(doc.count("script"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_script_is_awaited_not_duplicated() {
        let doc = MemoryDocument::new();
        doc.add_foreign_script(SRC).unwrap();
        let vendor = MockVendor::new();
        let peer = vendor.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            peer.set_ready(true);
        });

        let started = Instant::now();
        let outcome = loader(&doc, &vendor).load("abc123").await.unwrap();

        assert_eq!(outcome, LoadOutcome::AwaitedExistingScript);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(doc.scripts_inserted(), 0);
        assert_eq!(doc.count("script"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_injects_after_grace_period() {
        let doc = MemoryDocument::new();
        let vendor = MockVendor::new();
        let loaded = vendor.clone();
        doc.on_script_load(move || loaded.set_ready(true));

        let started = Instant::now();
        let outcome = loader(&doc, &vendor).load("abc123").await.unwrap();

        assert_eq!(outcome, LoadOutcome::Injected);
        // 200 ms grace period plus the mock's 100 ms load delay.
        assert_eq!(started.elapsed(), Duration::from_millis(300));
        assert_eq!(doc.scripts_inserted(), 1);
        assert_eq!(doc.count(&format!(r#"script[src="{SRC}"]"#)), 1);
        assert!(vendor.handle().is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_error_is_reported() {
        let doc = MemoryDocument::new();
        doc.set_script_behavior(ScriptBehavior::Fail {
            delay: Duration::from_millis(10),
        });
        let vendor = MockVendor::new();

        let error = loader(&doc, &vendor).load("abc123").await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::ScriptLoad);
        assert!(error.is_recoverable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_code_fails_fast() {
        let doc = MemoryDocument::new();
        let vendor = MockVendor::ready();

        let error = loader(&doc, &vendor).load("").await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Configuration);
    }
}
