//! Pipeline clock binding
//!
//! Pins a session pipeline to the distributed clock and fixes its
//! running-time origin. With [`OriginPolicy::Zero`] the running time equals
//! the raw distributed clock value, so every session reports the same running
//! time for the same clock reading.

use std::sync::Arc;

use crate::clock::{Clock, ClockReading, ClockTime};
use crate::error::ConfigurationError;
use crate::pipeline::{MediaPipeline, RunningTimeOrigin};

/// How the running-time origin is chosen at bind time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OriginPolicy {
    /// Base time zero: running time is the raw clock value
    #[default]
    Zero,
    /// Base time is the clock value captured at bind
    AtBind,
    /// Base time is taken when the first buffer arrives.
    /// Rejected for sources that are live upstream.
    Deferred,
}

/// Result of binding a pipeline to a clock
#[derive(Debug, Clone)]
pub struct PipelineClockBinding {
    /// Name of the bound clock
    pub clock_name: String,
    /// Origin applied to the pipeline
    pub origin: RunningTimeOrigin,
    /// Clock reading captured while binding
    pub bound_at: ClockReading,
}

/// Binds session pipelines to a clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionPipelineBinder {
    origin: OriginPolicy,
}

impl SessionPipelineBinder {
    pub fn new(origin: OriginPolicy) -> Self {
        Self { origin }
    }

    pub fn origin_policy(&self) -> OriginPolicy {
        self.origin
    }

    /// Bind `pipeline` to `clock` and set its running-time origin.
    ///
    /// A pipeline that already has a clock is rejected, even when the same
    /// clock is supplied again.
    pub fn bind(
        &self,
        pipeline: &mut dyn MediaPipeline,
        clock: Arc<dyn Clock>,
    ) -> Result<PipelineClockBinding, ConfigurationError> {
        if pipeline.clock().is_some() {
            return Err(ConfigurationError::ClockAlreadyBound);
        }
        if !clock.is_synced() {
            return Err(ConfigurationError::ClockUnsynchronized(clock.name().to_string()));
        }
        if self.origin == OriginPolicy::Deferred && pipeline.is_live() {
            return Err(ConfigurationError::DeferredOriginOnLiveSource);
        }

        let bound_at = clock.read();
        let origin = match self.origin {
            OriginPolicy::Zero => RunningTimeOrigin::Explicit(ClockTime::ZERO),
            OriginPolicy::AtBind => RunningTimeOrigin::Explicit(bound_at.value),
            OriginPolicy::Deferred => RunningTimeOrigin::Deferred,
        };
        let clock_name = clock.name().to_string();

        pipeline.use_clock(clock)?;
        pipeline.set_running_time_origin(origin)?;

        tracing::debug!(
            pipeline = pipeline.name(),
            clock = %clock_name,
            origin = ?origin,
            clock_time = %bound_at.value,
            "Pipeline bound to clock"
        );

        Ok(PipelineClockBinding {
            clock_name,
            origin,
            bound_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::pipeline::PipelineDescription;

    #[test]
    fn test_zero_origin_reports_raw_clock() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let mut pipeline = PipelineDescription::new("p").build();

        let binding = SessionPipelineBinder::default()
            .bind(&mut pipeline, clock)
            .unwrap();

        assert_eq!(binding.origin, RunningTimeOrigin::Explicit(ClockTime::ZERO));
        assert_eq!(
            pipeline.running_time_at(ClockTime::from_millis(500)),
            ClockTime::from_millis(500)
        );
    }

    #[test]
    fn test_at_bind_origin() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let mut pipeline = PipelineDescription::new("p").build();

        let binding = SessionPipelineBinder::new(OriginPolicy::AtBind)
            .bind(&mut pipeline, clock)
            .unwrap();

        assert_eq!(pipeline.base_time(), binding.bound_at.value);
        assert_eq!(pipeline.running_time_at(binding.bound_at.value), ClockTime::ZERO);
    }

    #[test]
    fn test_rebind_same_clock_rejected() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let mut pipeline = PipelineDescription::new("p").build();
        let binder = SessionPipelineBinder::default();

        binder.bind(&mut pipeline, Arc::clone(&clock)).unwrap();
        let result = binder.bind(&mut pipeline, clock);

        assert!(matches!(result, Err(ConfigurationError::ClockAlreadyBound)));
        assert_eq!(pipeline.base_time(), ClockTime::ZERO);
    }

    #[test]
    fn test_deferred_origin_rejected_for_live_source() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let mut pipeline = PipelineDescription::new("p").live(true).build();

        let result = SessionPipelineBinder::new(OriginPolicy::Deferred).bind(&mut pipeline, clock);

        assert!(matches!(
            result,
            Err(ConfigurationError::DeferredOriginOnLiveSource)
        ));
        assert!(pipeline.clock().is_none());
    }

    struct UnsyncedClock;

    impl Clock for UnsyncedClock {
        fn now(&self) -> ClockTime {
            ClockTime::ZERO
        }

        fn name(&self) -> &str {
            "unsynced"
        }

        fn is_synced(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_unsynced_clock_rejected() {
        let mut pipeline = PipelineDescription::new("p").build();

        let result = SessionPipelineBinder::default().bind(&mut pipeline, Arc::new(UnsyncedClock));

        assert!(matches!(
            result,
            Err(ConfigurationError::ClockUnsynchronized(name)) if name == "unsynced"
        ));
        assert!(pipeline.clock().is_none());
    }

    #[test]
    fn test_deferred_origin_for_non_live_source() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let mut pipeline = PipelineDescription::new("p").live(false).build();

        let binding = SessionPipelineBinder::new(OriginPolicy::Deferred)
            .bind(&mut pipeline, clock)
            .unwrap();

        assert_eq!(binding.origin, RunningTimeOrigin::Deferred);
        assert!(pipeline.base_time().is_none());
    }
}
