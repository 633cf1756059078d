//! Session lifecycle
//!
//! A session owns exactly one pipeline. Its clock is bound once, the RTP
//! sync override is applied once, and only then may packets flow. Any
//! configuration error moves the session to [`SyncState::Failed`] and
//! releases its pipeline immediately.

use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;

use crate::clock::{Clock, ClockTime, SystemClock};
use crate::error::{ConfigurationError, Error, Result};
use crate::pipeline::MediaPipeline;
use crate::stats::SessionCounters;

use super::binder::{PipelineClockBinding, SessionPipelineBinder};
use super::context::SessionContext;
use super::state::SyncState;

/// Releases the session's slot in the server when dropped
pub(crate) struct SessionGuard {
    counters: Arc<SessionCounters>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl SessionGuard {
    pub(crate) fn new(counters: Arc<SessionCounters>, permit: Option<OwnedSemaphorePermit>) -> Self {
        counters.record_accepted();
        Self {
            counters,
            _permit: permit,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.counters.record_closed();
    }
}

/// One receiver session and its pipeline
pub struct Session {
    context: SessionContext,
    state: SyncState,
    pipeline: Option<Box<dyn MediaPipeline>>,
    binding: Option<PipelineClockBinding>,
    local_fallback: bool,
    guard: Option<SessionGuard>,
}

impl Session {
    /// Create an unbound session around a freshly built pipeline
    pub fn new(context: SessionContext, pipeline: Box<dyn MediaPipeline>) -> Self {
        Self {
            context,
            state: SyncState::Unbound,
            pipeline: Some(pipeline),
            binding: None,
            local_fallback: false,
            guard: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.context.session_id
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn binding(&self) -> Option<&PipelineClockBinding> {
        self.binding.as_ref()
    }

    /// Whether the session plays from a local clock after a failed binding
    pub fn is_local_fallback(&self) -> bool {
        self.local_fallback
    }

    /// The session pipeline; `None` once the session failed
    pub fn pipeline(&self) -> Option<&dyn MediaPipeline> {
        self.pipeline.as_deref()
    }

    /// Whether the session may synchronize packets and produce output
    pub fn can_output(&self) -> bool {
        self.state.can_output()
    }

    /// Bind the pipeline clock.
    ///
    /// The clock of a session is set once. Any further attempt fails the
    /// session with [`ConfigurationError::ClockAlreadyBound`].
    pub fn bind_clock(
        &mut self,
        binder: &SessionPipelineBinder,
        clock: Arc<dyn Clock>,
    ) -> Result<()> {
        match self.try_bind(binder, clock) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Bind the pipeline clock, falling back to a local clock if allowed.
    ///
    /// Fallback only applies while the pipeline has no clock yet.
    pub fn bind_clock_or_local(
        &mut self,
        binder: &SessionPipelineBinder,
        clock: Arc<dyn Clock>,
        allow_fallback: bool,
    ) -> Result<()> {
        let err = match self.try_bind(binder, clock) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        let unbound = self
            .pipeline
            .as_ref()
            .map(|p| p.clock().is_none())
            .unwrap_or(false);

        if !allow_fallback || !unbound || self.state != SyncState::Unbound {
            return Err(self.fail(err));
        }

        tracing::warn!(
            session_id = self.id(),
            error = %err,
            "Distributed clock binding failed, falling back to local clock"
        );
        self.local_fallback = true;
        let local: Arc<dyn Clock> = Arc::new(SystemClock::with_name("local-fallback"));
        self.bind_clock(binder, local)
    }

    fn try_bind(&mut self, binder: &SessionPipelineBinder, clock: Arc<dyn Clock>) -> Result<()> {
        if self.state != SyncState::Unbound {
            return Err(ConfigurationError::ClockAlreadyBound.into());
        }
        let pipeline = self
            .pipeline
            .as_deref_mut()
            .ok_or(ConfigurationError::ClockNotBound)?;

        let binding = binder.bind(pipeline, clock)?;
        self.binding = Some(binding);
        self.state.bind();

        tracing::debug!(session_id = self.id(), state = %self.state, "Session clock bound");
        Ok(())
    }

    /// Configure the RTP sync sub-layer and enter [`SyncState::Synchronized`].
    ///
    /// Must follow [`Session::bind_clock`].
    pub fn apply_sync_override<F>(&mut self, configure: F) -> Result<()>
    where
        F: FnOnce(&mut dyn MediaPipeline) -> std::result::Result<(), ConfigurationError>,
    {
        if self.state != SyncState::BoundToDistributedClock {
            return Err(self.fail(ConfigurationError::ClockNotBound.into()));
        }

        let result = match self.pipeline.as_deref_mut() {
            Some(pipeline) => configure(pipeline),
            None => Err(ConfigurationError::ClockNotBound),
        };

        if let Err(e) = result {
            return Err(self.fail(e.into()));
        }

        self.state.synchronize();
        tracing::debug!(session_id = self.id(), state = %self.state, "Session synchronized");
        Ok(())
    }

    /// Synchronize one incoming RTP packet.
    ///
    /// Returns the time reference the RTP sync sub-layer used for it.
    /// Rejected until the session is synchronized.
    pub fn process_rtp(&mut self, sender_report_time: Option<ClockTime>) -> Result<ClockTime> {
        if !self.state.can_output() {
            return Err(ConfigurationError::SessionNotSynchronized.into());
        }
        let pipeline = self
            .pipeline
            .as_deref_mut()
            .ok_or(ConfigurationError::SessionNotSynchronized)?;

        pipeline.on_first_buffer();
        let running_time = pipeline.running_time();
        let name = pipeline.name().to_string();
        let rtp_sync = pipeline
            .rtp_sync()
            .ok_or(ConfigurationError::MissingRtpSync(name))?;

        Ok(rtp_sync.process_packet(running_time, sender_report_time))
    }

    /// Running time at a given clock value, NONE unless synchronized
    pub fn running_time_at(&self, clock_time: ClockTime) -> ClockTime {
        match (&self.pipeline, self.state.can_output()) {
            (Some(pipeline), true) => pipeline.running_time_at(clock_time),
            _ => ClockTime::NONE,
        }
    }

    /// Current running time, NONE unless synchronized
    pub fn running_time(&self) -> ClockTime {
        match (&self.pipeline, self.state.can_output()) {
            (Some(pipeline), true) => pipeline.running_time(),
            _ => ClockTime::NONE,
        }
    }

    /// Move to the failed state and release the pipeline
    pub fn fail(&mut self, err: Error) -> Error {
        self.state.fail();
        self.pipeline = None;
        tracing::warn!(
            session_id = self.id(),
            mount = %self.context.mount,
            error = %err,
            "Session failed"
        );
        err
    }

    pub(crate) fn attach_guard(&mut self, guard: SessionGuard) {
        self.guard = Some(guard);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .field("state", &self.state)
            .field("binding", &self.binding)
            .field("local_fallback", &self.local_fallback)
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::debug!(session_id = self.id(), state = %self.state, "Session closed");
    }
}
