//! Clock-read wire protocol
//!
//! A receiver-initiated request/reply exchange over UDP. See [`packet`] for
//! the datagram layout.

pub mod constants;
pub mod packet;

pub use packet::ClockPacket;
