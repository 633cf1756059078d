//! Pipeline factories
//!
//! A factory is the per-mount strategy the server uses while constructing a
//! session: it builds the session's pipeline and configures its RTP sync
//! sub-layer. Clock binding happens in between and is not up to the factory.

use crate::error::{ConfigurationError, Result};
use crate::pipeline::{MediaPipeline, PipelineDescription};

use super::context::SessionContext;
use super::policy::SyncOverridePolicy;

/// Session construction strategy
///
/// # Example
/// ```no_run
/// use netclock_rs::error::Result;
/// use netclock_rs::pipeline::{MediaPipeline, PipelineDescription};
/// use netclock_rs::session::{PipelineFactory, SessionContext};
///
/// struct PerMountFactory;
///
/// impl PipelineFactory for PerMountFactory {
///     fn create_pipeline(&self, ctx: &SessionContext) -> Result<Box<dyn MediaPipeline>> {
///         let description = PipelineDescription::new(format!("media-{}", ctx.session_id))
///             .element("videotestsrc")
///             .element("rtph264pay");
///         Ok(Box::new(description.build()))
///     }
/// }
/// ```
pub trait PipelineFactory: Send + Sync {
    /// Build a fresh pipeline for a session
    fn create_pipeline(&self, ctx: &SessionContext) -> Result<Box<dyn MediaPipeline>>;

    /// Configure RTP sync for a session.
    ///
    /// Called after the clock is bound and before any packet is processed.
    fn setup_rtp_sync(
        &self,
        _ctx: &SessionContext,
        pipeline: &mut dyn MediaPipeline,
    ) -> std::result::Result<(), ConfigurationError> {
        SyncOverridePolicy.apply(pipeline)
    }
}

/// Factory that builds every session pipeline from one description
#[derive(Debug, Clone)]
pub struct LaunchFactory {
    description: PipelineDescription,
}

impl LaunchFactory {
    pub fn new(description: PipelineDescription) -> Self {
        Self { description }
    }

    pub fn description(&self) -> &PipelineDescription {
        &self.description
    }
}

impl PipelineFactory for LaunchFactory {
    fn create_pipeline(&self, ctx: &SessionContext) -> Result<Box<dyn MediaPipeline>> {
        tracing::trace!(
            session_id = ctx.session_id,
            mount = %ctx.mount,
            pipeline = self.description.name(),
            "Building session pipeline"
        );
        Ok(Box::new(self.description.build()))
    }
}
