//! RTP synchronization sub-layer
//!
//! By default the sub-layer maps RTP timestamps to running time using the
//! NTP/RTP pairs carried in RTCP sender reports. Sessions bound to the
//! distributed clock switch it to the pipeline clock so that only one
//! synchronization source is in play.

use crate::clock::ClockTime;
use crate::error::ConfigurationError;

/// Where the sub-layer takes its time reference from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSource {
    /// Clock recovered from RTCP sender reports
    SenderReports,
    /// The pipeline's bound clock
    PipelineClock,
}

/// RTP synchronization sub-layer capability
pub trait RtpSync: Send {
    /// Current time reference
    fn sync_source(&self) -> SyncSource;

    /// Prefer the pipeline clock over sender reports.
    ///
    /// Fails with [`ConfigurationError::RtpSyncActive`] once packets have
    /// been processed.
    fn set_use_pipeline_clock(&mut self, enabled: bool) -> Result<(), ConfigurationError>;

    /// Synchronize one packet, returning the reference time used for it
    fn process_packet(
        &mut self,
        pipeline_time: ClockTime,
        sender_report_time: Option<ClockTime>,
    ) -> ClockTime;

    /// Packets synchronized so far
    fn packets_processed(&self) -> u64;
}

/// Default RTP session sub-layer
#[derive(Debug, Clone, Default)]
pub struct RtpBin {
    use_pipeline_clock: bool,
    packets: u64,
    sender_report_packets: u64,
}

impl RtpBin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets synchronized against sender reports
    pub fn sender_report_packets(&self) -> u64 {
        self.sender_report_packets
    }
}

impl RtpSync for RtpBin {
    fn sync_source(&self) -> SyncSource {
        if self.use_pipeline_clock {
            SyncSource::PipelineClock
        } else {
            SyncSource::SenderReports
        }
    }

    fn set_use_pipeline_clock(&mut self, enabled: bool) -> Result<(), ConfigurationError> {
        if self.packets > 0 && enabled != self.use_pipeline_clock {
            return Err(ConfigurationError::RtpSyncActive);
        }
        self.use_pipeline_clock = enabled;
        Ok(())
    }

    fn process_packet(
        &mut self,
        pipeline_time: ClockTime,
        sender_report_time: Option<ClockTime>,
    ) -> ClockTime {
        self.packets += 1;

        match (self.sync_source(), sender_report_time) {
            (SyncSource::SenderReports, Some(sr)) => {
                self.sender_report_packets += 1;
                sr
            }
            _ => pipeline_time,
        }
    }

    fn packets_processed(&self) -> u64 {
        self.packets
    }
}
