//! Media pipeline capabilities
//!
//! Session construction needs three things from a media pipeline, whatever
//! toolkit it comes from:
//!
//! - set the clock reference ([`MediaPipeline::use_clock`])
//! - set the running-time origin ([`MediaPipeline::set_running_time_origin`])
//! - reach the RTP synchronization sub-layer ([`MediaPipeline::rtp_sync`])
//!
//! ```text
//!   clock.now() ──► running time = clock time − base time ──► render
//!                                      ▲
//!                          origin fixed once per session
//! ```
//!
//! [`Pipeline`] is the in-crate implementation built from a
//! [`PipelineDescription`].

pub mod description;
pub mod rtp_sync;

use std::sync::Arc;

use crate::clock::{Clock, ClockTime};
use crate::error::ConfigurationError;

pub use description::{Pipeline, PipelineDescription};
pub use rtp_sync::{RtpBin, RtpSync, SyncSource};

/// Origin of a pipeline's running time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningTimeOrigin {
    /// Running time is clock time minus this base time
    Explicit(ClockTime),
    /// Base time is fixed from the clock when the first buffer arrives
    Deferred,
}

/// Operations a session needs from a media pipeline
pub trait MediaPipeline: Send {
    /// Pipeline name
    fn name(&self) -> &str;

    /// Whether the source is already live-synchronized upstream
    fn is_live(&self) -> bool;

    /// Set the clock reference. May succeed only once per pipeline.
    fn use_clock(&mut self, clock: Arc<dyn Clock>) -> Result<(), ConfigurationError>;

    /// The bound clock, if any
    fn clock(&self) -> Option<&Arc<dyn Clock>>;

    /// Fix the running-time origin. May succeed only once per pipeline.
    fn set_running_time_origin(
        &mut self,
        origin: RunningTimeOrigin,
    ) -> Result<(), ConfigurationError>;

    /// Current base time, `ClockTime::NONE` while undetermined
    fn base_time(&self) -> ClockTime;

    /// Resolve a deferred origin on first data. No-op otherwise.
    fn on_first_buffer(&mut self);

    /// RTP synchronization sub-layer, if the pipeline has one
    fn rtp_sync(&mut self) -> Option<&mut dyn RtpSync>;

    /// Running time at a given clock value
    fn running_time_at(&self, clock_time: ClockTime) -> ClockTime {
        let base = self.base_time();
        if base.is_none() || clock_time.is_none() || clock_time < base {
            return ClockTime::NONE;
        }
        clock_time - base
    }

    /// Running time now
    fn running_time(&self) -> ClockTime {
        match self.clock() {
            Some(clock) => self.running_time_at(clock.now()),
            None => ClockTime::NONE,
        }
    }
}
