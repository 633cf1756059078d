//! RTP sync override
//!
//! Sessions bound to the distributed clock must not also follow the clock
//! recovered from RTCP sender reports. The override is applied before the
//! sub-layer sees its first packet.

use crate::error::ConfigurationError;
use crate::pipeline::{MediaPipeline, SyncSource};

/// Makes a pipeline's RTP sync sub-layer follow the pipeline clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOverridePolicy;

impl SyncOverridePolicy {
    /// Apply the override.
    ///
    /// Fails if the pipeline has no RTP sync sub-layer or if the sub-layer
    /// already processed packets under another time reference.
    pub fn apply(&self, pipeline: &mut dyn MediaPipeline) -> Result<(), ConfigurationError> {
        let name = pipeline.name().to_string();
        let rtp_sync = pipeline
            .rtp_sync()
            .ok_or_else(|| ConfigurationError::MissingRtpSync(name.clone()))?;

        if rtp_sync.packets_processed() > 0 && rtp_sync.sync_source() != SyncSource::PipelineClock {
            return Err(ConfigurationError::RtpSyncActive);
        }
        rtp_sync.set_use_pipeline_clock(true)?;

        tracing::debug!(pipeline = %name, "RTP sync follows pipeline clock");
        Ok(())
    }
}
