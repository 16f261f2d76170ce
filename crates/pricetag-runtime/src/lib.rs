#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for vendor script loading.
pub const TRACING_TARGET_LOADER: &str = "pricetag_runtime::loader";

/// Tracing target for fragment injection.
pub const TRACING_TARGET_INJECTOR: &str = "pricetag_runtime::injector";

/// Tracing target for price mirroring.
pub const TRACING_TARGET_MIRROR: &str = "pricetag_runtime::mirror";

/// Tracing target for width negotiation.
pub const TRACING_TARGET_WIDTH: &str = "pricetag_runtime::width";

/// Tracing target for the self-healing watcher.
pub const TRACING_TARGET_WATCHER: &str = "pricetag_runtime::watcher";

/// Tracing target for slot supervision.
pub const TRACING_TARGET_ORCHESTRATOR: &str = "pricetag_runtime::orchestrator";

mod loader;
mod orchestrator;
mod wait;

pub mod slot;

pub use loader::{AssetLoader, LoadOutcome};
pub use orchestrator::{PricetagHelper, Session, SlotReport};
pub use slot::{
    FragmentInjector, PipelineOutcome, SlotPhase, SlotPipeline, SlotRuntimeState, WidthOutcome,
    hidden_prices_fragment, wrapper_fragment,
};
pub use wait::{wait_for_element, wait_for_element_unless};
