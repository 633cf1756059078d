//! Clock packet codec
//!
//! Requests and replies share one fixed-size layout, so a reply is never
//! larger than the request that triggered it:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                  correlation token (u64, BE)                  |
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |             server clock, ns since epoch (u64, BE)            |
//! |                  all ones in a request                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! ```text
//! Receiver                                  Server
//!   |  t0                                     |
//!   |------- request(token) ----------------->|
//!   |                                         | v = clock.now()
//!   |<------ reply(token, v) -----------------|
//!   |  t1                                     |
//! ```
//!
//! Receivers use their local send time `t0` as the token, so a reply is
//! self-describing for round-trip accounting.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::clock::ClockTime;
use crate::error::ProtocolError;
use crate::protocol::constants::{CLOCK_NONE, PACKET_SIZE};

/// A clock-read request or reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockPacket {
    /// Correlation token, echoed unchanged by the server
    pub token: u64,
    /// Server clock value; `ClockTime::NONE` in requests
    pub clock: ClockTime,
}

impl ClockPacket {
    /// Build a request carrying only a token
    pub fn request(token: u64) -> Self {
        Self {
            token,
            clock: ClockTime::NONE,
        }
    }

    /// Turn a request into its reply, keeping the token
    pub fn reply(self, clock: ClockTime) -> Self {
        Self {
            token: self.token,
            clock,
        }
    }

    /// Whether this packet carries a clock value
    pub fn is_reply(&self) -> bool {
        self.clock.is_some()
    }

    /// Encode into a fresh buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(PACKET_SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Append the encoded packet to `buf`
    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_u64(self.token);
        buf.put_u64(if self.clock.is_none() {
            CLOCK_NONE
        } else {
            self.clock.nanos()
        });
    }

    /// Decode a packet. Trailing bytes beyond [`PACKET_SIZE`] are ignored.
    pub fn decode(mut data: &[u8]) -> Result<Self, ProtocolError> {
        if data.remaining() < PACKET_SIZE {
            return Err(ProtocolError::PacketTooShort {
                expected: PACKET_SIZE,
                actual: data.remaining(),
            });
        }

        let token = data.get_u64();
        let clock = ClockTime::from_nanos(data.get_u64());

        Ok(Self { token, clock })
    }

    /// Decode a reply and check it answers the request carrying `token`
    pub fn decode_reply(data: &[u8], token: u64) -> Result<Self, ProtocolError> {
        let packet = Self::decode(data)?;

        if packet.token != token {
            return Err(ProtocolError::TokenMismatch {
                expected: token,
                actual: packet.token,
            });
        }
        if !packet.is_reply() {
            return Err(ProtocolError::MissingClockValue);
        }

        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_layout() {
        let encoded = ClockPacket::request(0x0102_0304_0506_0708).encode();

        assert_eq!(encoded.len(), PACKET_SIZE);
        assert_eq!(&encoded[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&encoded[8..], &[0xFF; 8]);
    }

    #[test]
    fn test_reply_echoes_token() {
        let request = ClockPacket::request(42);
        let reply = request.reply(ClockTime::from_millis(500));

        let decoded = ClockPacket::decode_reply(&reply.encode(), 42).unwrap();
        assert_eq!(decoded.token, 42);
        assert_eq!(decoded.clock, ClockTime::from_millis(500));
    }

    #[test]
    fn test_short_packet_rejected() {
        let result = ClockPacket::decode(&[0u8; 10]);
        assert_eq!(
            result,
            Err(ProtocolError::PacketTooShort {
                expected: PACKET_SIZE,
                actual: 10
            })
        );
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut data = ClockPacket::request(7).reply(ClockTime::from_secs(1)).encode().to_vec();
        data.extend_from_slice(&[0xAA; 4]);

        let decoded = ClockPacket::decode(&data).unwrap();
        assert_eq!(decoded.token, 7);
        assert_eq!(decoded.clock, ClockTime::from_secs(1));
    }

    #[test]
    fn test_stale_reply_rejected() {
        let reply = ClockPacket::request(1).reply(ClockTime::from_secs(1)).encode();
        let result = ClockPacket::decode_reply(&reply, 2);
        assert_eq!(
            result,
            Err(ProtocolError::TokenMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_request_is_not_a_reply() {
        let request = ClockPacket::request(9).encode();
        assert_eq!(
            ClockPacket::decode_reply(&request, 9),
            Err(ProtocolError::MissingClockValue)
        );
    }
}
