//! Receiver sessions
//!
//! Every accepted receiver gets its own session, built in a fixed order:
//!
//! ```text
//!  accept ──► factory.create_pipeline ──► binder.bind ──► factory.setup_rtp_sync
//!             (fresh pipeline)              (clock +       (RTP sync follows
//!                                            origin)        pipeline clock)
//! ```
//!
//! No packet is synchronized before the last step completes.

pub mod binder;
pub mod context;
pub mod factory;
pub mod lifecycle;
pub mod policy;
pub mod state;

pub use binder::{OriginPolicy, PipelineClockBinding, SessionPipelineBinder};
pub use context::SessionContext;
pub use factory::{LaunchFactory, PipelineFactory};
pub use lifecycle::Session;
pub use policy::SyncOverridePolicy;
pub use state::SyncState;
