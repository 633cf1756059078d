//! In-crate pipeline model
//!
//! A [`PipelineDescription`] is a reusable template; every session builds its
//! own [`Pipeline`] from it so no pipeline state is shared between sessions.

use std::sync::Arc;

use crate::clock::{Clock, ClockTime};
use crate::error::ConfigurationError;

use super::rtp_sync::{RtpBin, RtpSync};
use super::{MediaPipeline, RunningTimeOrigin};

/// Template for building session pipelines
#[derive(Debug, Clone)]
pub struct PipelineDescription {
    name: String,
    elements: Vec<String>,
    live: bool,
    rtp_session: bool,
}

impl PipelineDescription {
    /// Create an empty live description with an RTP session sub-layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
            live: true,
            rtp_session: true,
        }
    }

    /// Parse a launch line such as `( videotestsrc ! rtph264pay name=pay0 )`.
    ///
    /// Elements are separated by `!`; an enclosing pair of parentheses is
    /// optional. Empty segments are skipped.
    pub fn from_launch(name: impl Into<String>, launch: &str) -> Self {
        let trimmed = launch.trim();
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(trimmed);

        inner
            .split('!')
            .map(str::trim)
            .filter(|element| !element.is_empty())
            .fold(Self::new(name), |description, element| {
                description.element(element)
            })
    }

    /// Append an element
    pub fn element(mut self, name: impl Into<String>) -> Self {
        self.elements.push(name.into());
        self
    }

    /// Whether the source is live
    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    /// Build pipelines without an RTP session sub-layer
    pub fn without_rtp_session(mut self) -> Self {
        self.rtp_session = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Build a fresh pipeline
    pub fn build(&self) -> Pipeline {
        Pipeline {
            name: self.name.clone(),
            elements: self.elements.clone(),
            live: self.live,
            rtpbin: self.rtp_session.then(RtpBin::new),
            clock: None,
            origin: None,
            base_time: ClockTime::NONE,
        }
    }
}

/// A session's media pipeline
pub struct Pipeline {
    name: String,
    elements: Vec<String>,
    live: bool,
    rtpbin: Option<RtpBin>,
    clock: Option<Arc<dyn Clock>>,
    origin: Option<RunningTimeOrigin>,
    base_time: ClockTime,
}

impl Pipeline {
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Origin set at bind time, if any
    pub fn origin(&self) -> Option<RunningTimeOrigin> {
        self.origin
    }

    pub fn rtpbin(&self) -> Option<&RtpBin> {
        self.rtpbin.as_ref()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("elements", &self.elements)
            .field("live", &self.live)
            .field("clock", &self.clock.as_ref().map(|c| c.name().to_string()))
            .field("origin", &self.origin)
            .field("base_time", &self.base_time)
            .finish()
    }
}

impl MediaPipeline for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn use_clock(&mut self, clock: Arc<dyn Clock>) -> Result<(), ConfigurationError> {
        if self.clock.is_some() {
            return Err(ConfigurationError::ClockAlreadyBound);
        }
        self.clock = Some(clock);
        Ok(())
    }

    fn clock(&self) -> Option<&Arc<dyn Clock>> {
        self.clock.as_ref()
    }

    fn set_running_time_origin(
        &mut self,
        origin: RunningTimeOrigin,
    ) -> Result<(), ConfigurationError> {
        if self.origin.is_some() {
            return Err(ConfigurationError::OriginAlreadySet);
        }
        self.base_time = match origin {
            RunningTimeOrigin::Explicit(base) => base,
            RunningTimeOrigin::Deferred => ClockTime::NONE,
        };
        self.origin = Some(origin);
        Ok(())
    }

    fn base_time(&self) -> ClockTime {
        self.base_time
    }

    fn on_first_buffer(&mut self) {
        if self.origin != Some(RunningTimeOrigin::Deferred) || self.base_time.is_some() {
            return;
        }
        if let Some(clock) = &self.clock {
            self.base_time = clock.now();
            tracing::debug!(pipeline = %self.name, base_time = %self.base_time, "Deferred origin resolved");
        }
    }

    fn rtp_sync(&mut self) -> Option<&mut dyn RtpSync> {
        self.rtpbin.as_mut().map(|r| r as &mut dyn RtpSync)
    }
}
