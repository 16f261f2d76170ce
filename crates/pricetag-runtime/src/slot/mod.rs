//! Per-slot components.
//!
//! Each configured slot gets its own runtime state and pipeline:
//!
//! - **Injector**: wrapper, marker and hidden mirror fragments
//! - **Mirror**: visible price to hidden mirror node, on change only
//! - **Width**: container sizing from the vendor frame's content
//! - **Pipeline**: inject if missing, wait for the frame, size it
//! - **Watcher**: debounced rebuild when the wrapper disappears

mod injector;
mod mirror;
mod pipeline;
mod state;
mod watcher;
mod width;

pub use injector::{
    FragmentInjector, HIDDEN_PRICES_ID, HIDDEN_PRICES_STYLE, MARKER_CLASS, hidden_prices_fragment,
    wrapper_fragment,
};
pub use mirror::{MirrorUpdate, PriceMirror, extract_price};
pub use pipeline::{PipelineOutcome, SlotPipeline};
pub use state::{RebuildGuard, SlotPhase, SlotRuntimeState};
pub use watcher::{HealCheck, SelfHealingWatcher};
pub use width::{WidthNegotiator, WidthOutcome, WidthSettings};
