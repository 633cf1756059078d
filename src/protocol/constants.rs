//! Clock protocol constants

use std::time::Duration;

/// Size of every clock packet, request or reply
pub const PACKET_SIZE: usize = 16;

/// Default UDP port of the clock provider
pub const DEFAULT_CLOCK_PORT: u16 = 8555;

/// Default RTSP port for session accept
pub const DEFAULT_RTSP_PORT: u16 = 8554;

/// Wire value of an absent clock reading (requests carry it)
pub const CLOCK_NONE: u64 = u64::MAX;

/// Default receiver-side timeout for a single clock-read request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Exchanges with a longer round trip are discarded as outliers
pub const DEFAULT_ROUND_TRIP_LIMIT: Duration = Duration::from_secs(1);
