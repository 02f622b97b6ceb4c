//! Collaborators the RTCP engine talks to.

use bytes::Bytes;
use rtcp::cast_feedback::CastMessage;
use shared::error::Result;
use std::time::Instant;

/// Hands serialized compound RTCP packets to the network.
pub trait RtcpTransport {
    fn send_rtcp_packet(&mut self, packet: Bytes) -> Result<()>;
}

/// Counters describing what the local media sender has sent so far.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SenderInfo {
    /// RTP timestamp corresponding to the instant the report is built.
    pub rtp_timestamp: u32,
    pub packet_count: u32,
    pub octet_count: u32,
}

/// Provides [`SenderInfo`] for outgoing sender reports.
pub trait SenderStatistics {
    fn sender_info(&self, now: Instant) -> SenderInfo;
}

/// Reception quality of the remote media stream.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ReceptionStatistics {
    pub fraction_lost: u8,
    pub cumulative_lost: u32,
    pub extended_high_sequence_number: u32,
    pub jitter: u32,
}

/// Provides [`ReceptionStatistics`] for outgoing reception reports.
pub trait ReceiverStatistics {
    fn reception_statistics(&self) -> ReceptionStatistics;
}

/// Receives cast feedback addressed to the local media sender.
pub trait RtcpFeedback {
    fn on_received_cast_feedback(&mut self, message: &CastMessage);
}
