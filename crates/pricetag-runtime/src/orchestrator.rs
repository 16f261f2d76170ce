//! The helper facade and the per-slot supervision it starts.

use std::fmt;
use std::sync::Arc;

use pricetag_core::{
    ConsentSink, CookiesEnabled, Error, GlobalConfig, PageDocument, Result, RuntimeConfig,
    VendorRuntimeHandle,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::TRACING_TARGET_ORCHESTRATOR;
use crate::loader::{AssetLoader, LoadOutcome};
use crate::slot::{
    FragmentInjector, PipelineOutcome, PriceMirror, SelfHealingWatcher, SlotPhase, SlotPipeline,
    SlotRuntimeState,
};
use crate::wait::wait_for_element;

/// Entry point a merchant page talks to.
///
/// Holds the page, the vendor runtime and the consent queue it was created
/// with; `init` starts one supervised pipeline per configured slot.
#[derive(Clone)]
pub struct PricetagHelper {
    document: Arc<dyn PageDocument>,
    vendor: VendorRuntimeHandle,
    consent: Arc<dyn ConsentSink>,
    runtime: RuntimeConfig,
}

impl fmt::Debug for PricetagHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PricetagHelper")
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl PricetagHelper {
    /// Creates a helper with default runtime timings.
    pub fn new(
        document: Arc<dyn PageDocument>,
        vendor: VendorRuntimeHandle,
        consent: Arc<dyn ConsentSink>,
    ) -> Self {
        Self {
            document,
            vendor,
            consent,
            runtime: RuntimeConfig::default(),
        }
    }

    /// Replaces the runtime timings.
    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Returns the runtime timings.
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime
    }

    /// Appends a consent value to the queue read by the vendor script.
    pub fn set_cookies_enabled(&self, value: impl Into<CookiesEnabled>) {
        self.consent.push_consent(value.into());
    }

    /// Loads the vendor script and starts every configured slot.
    ///
    /// Consent carried by `config` is queued before loading starts. Slots
    /// run independently on their own tasks; use [`Session::settle`] to
    /// collect their first pipeline outcomes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid `config`, or a script
    /// load error if the vendor script fails to load. No slot is started in
    /// either case.
    #[tracing::instrument(
        skip_all,
        fields(code = %config.code, slots = config.pricetag_configs.len()),
        target = TRACING_TARGET_ORCHESTRATOR,
        name = "init"
    )]
    pub async fn init(&self, config: GlobalConfig) -> Result<Session> {
        if let Err(error) = config.check() {
            tracing::error!(
                target: TRACING_TARGET_ORCHESTRATOR,
                error = %error,
                "Rejected helper configuration"
            );
            return Err(error);
        }

        if let Some(value) = config.cookies_enabled.clone() {
            self.set_cookies_enabled(value);
        }

        let loader = AssetLoader::new(
            Arc::clone(&self.document),
            self.vendor.clone(),
            self.runtime.clone(),
        );
        let load = loader.load(&config.code).await?;

        FragmentInjector::new(Arc::clone(&self.document), self.vendor.clone())
            .ensure_hidden_prices(&config.pricetag_configs)?;

        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();
        let mut slots = Vec::with_capacity(config.pricetag_configs.len());

        for slot in &config.pricetag_configs {
            let pipeline = SlotPipeline::new(
                Arc::clone(&self.document),
                self.vendor.clone(),
                &self.runtime,
                slot.clone(),
                config.locale_for(slot),
                config.extra_width,
            );
            let state = Arc::clone(pipeline.state());
            let handle = tasks.spawn(run_slot(
                pipeline,
                self.vendor.clone(),
                self.runtime.clone(),
                cancel.clone(),
                tasks.clone(),
            ));

            slots.push(SlotTask {
                state,
                handle: Some(handle),
            });
        }

        tracing::info!(
            target: TRACING_TARGET_ORCHESTRATOR,
            load = ?load,
            "Helper initialized"
        );

        Ok(Session {
            load,
            cancel,
            tasks,
            slots,
        })
    }
}

impl ConsentSink for PricetagHelper {
    fn push_consent(&self, value: CookiesEnabled) {
        self.set_cookies_enabled(value);
    }
}

/// Supervises one slot: mirrors, first pipeline run, then the watcher.
async fn run_slot(
    pipeline: SlotPipeline,
    vendor: VendorRuntimeHandle,
    runtime: RuntimeConfig,
    cancel: CancellationToken,
    tasks: TaskTracker,
) -> Result<PipelineOutcome> {
    let slot = pipeline.slot();
    let document = pipeline.document();

    for source in slot.price_selectors() {
        let mirror = PriceMirror::new(
            Arc::clone(document),
            Arc::clone(pipeline.state()),
            source,
            slot.mirror_selector(),
            runtime.price_poll(),
        );
        tasks.spawn(mirror.run(cancel.clone()));
    }

    pipeline.state().set_phase(SlotPhase::Pending);

    tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(PipelineOutcome::Cancelled),
        _ = wait_for_element(document.as_ref(), slot.anchor_selector()) => {}
    }

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(PipelineOutcome::Cancelled),
        outcome = pipeline.run() => outcome?,
    };

    let watcher = SelfHealingWatcher::new(pipeline.clone(), vendor, runtime.heal_debounce());
    tasks.spawn(watcher.run(cancel, tasks.clone()));

    Ok(outcome)
}

struct SlotTask {
    state: Arc<SlotRuntimeState>,
    handle: Option<JoinHandle<Result<PipelineOutcome>>>,
}

/// Outcome of one slot's first pipeline run.
#[derive(Debug)]
pub struct SlotReport {
    pub slot_type: String,
    pub outcome: Result<PipelineOutcome>,
}

impl SlotReport {
    /// Returns whether the slot's pipeline completed.
    pub fn is_completed(&self) -> bool {
        self.outcome
            .as_ref()
            .is_ok_and(PipelineOutcome::is_completed)
    }
}

/// Running helper started by [`PricetagHelper::init`].
///
/// Dropping the session leaves its tasks running for the page's lifetime;
/// [`Session::shutdown`] models page teardown.
pub struct Session {
    load: LoadOutcome,
    cancel: CancellationToken,
    tasks: TaskTracker,
    slots: Vec<SlotTask>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("load", &self.load)
            .field("slots", &self.slots.len())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Returns how the vendor script was loaded.
    pub fn load_outcome(&self) -> LoadOutcome {
        self.load
    }

    /// Returns the runtime state of the slot with the given type.
    pub fn slot_state(&self, slot_type: &str) -> Option<&Arc<SlotRuntimeState>> {
        self.slots
            .iter()
            .map(|slot| &slot.state)
            .find(|state| state.slot_type() == slot_type)
    }

    /// Waits for every slot's first pipeline run to settle.
    ///
    /// Each slot is reported once, in configuration order; a slot failing
    /// does not affect the others. Waits indefinitely for slots whose anchor
    /// never appears.
    pub async fn settle(&mut self) -> Vec<SlotReport> {
        let mut reports = Vec::with_capacity(self.slots.len());

        for slot in &mut self.slots {
            let Some(handle) = slot.handle.take() else {
                continue;
            };

            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(error) => Err(Error::internal()
                    .with_message("Slot task terminated abnormally")
                    .with_source(error)),
            };

            if let Err(error) = &outcome {
                tracing::warn!(
                    target: TRACING_TARGET_ORCHESTRATOR,
                    slot = %slot.state.slot_type(),
                    error = %error,
                    "Slot pipeline failed"
                );
            }

            reports.push(SlotReport {
                slot_type: slot.state.slot_type().to_owned(),
                outcome,
            });
        }

        reports
    }

    /// Stops watchers, synchronizers and pending pipelines, and waits for them.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;

        tracing::debug!(target: TRACING_TARGET_ORCHESTRATOR, "Helper shut down");
    }
}
