#![allow(dead_code)]

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //RTCP errors
    /// Header could not be encoded.
    #[error("Invalid header")]
    InvalidHeader,
    /// Total lost does not fit in 24 bits.
    #[error("Invalid total lost count")]
    InvalidTotalLost,
    /// Packet received is too short.
    #[error("Packet too short to be read")]
    PacketTooShort,
    /// Buffer is too short.
    #[error("Buffer too short to be written")]
    BufferTooShort,
    /// Wrong packet type.
    #[error("Wrong packet type")]
    WrongType,
    /// Invalid packet version.
    #[error("Invalid packet version")]
    BadVersion,
    /// Invalid padding value.
    #[error("Invalid padding value")]
    WrongPadding,
    /// Wrong feedback message type.
    #[error("Wrong feedback message type")]
    WrongFeedbackType,
    /// Too many reports.
    #[error("Too many reports")]
    TooManyReports,
    /// Too many chunks.
    #[error("Too many chunks")]
    TooManyChunks,
    /// SDES received is too long.
    #[error("SDES must be < 255 octets long")]
    SdesTextTooLong,
    /// SDES type is missing.
    #[error("SDES item missing type")]
    SdesMissingType,
    /// Invalid XR block size.
    #[error("Invalid block size")]
    InvalidBlockSize,
    /// Application layer feedback does not carry the CAST identifier.
    #[error("Missing CAST identifier")]
    MissingCastIdentifier,
    /// More lost frames than a single cast feedback block can carry.
    #[error("Too many lost frames in cast feedback")]
    TooManyLostFrames,
    /// More lost packets in one frame than a single group can carry.
    #[error("Too many lost packets in cast feedback frame")]
    TooManyLostPackets,

    //Session errors
    /// A query was made before enough reports were exchanged.
    #[error("no sample available")]
    NoSampleAvailable,
    /// RTP clock frequency must be non-zero.
    #[error("invalid rtp clock frequency")]
    InvalidFrequency,
    /// A single block of a compound packet could not be parsed.
    #[error("malformed block: {0}")]
    MalformedBlock(String),
    /// The transport refused an outgoing RTCP packet.
    #[error("transport send failed: {0}")]
    TransportSendFailed(String),

    #[error("{0}")]
    Other(String),
}
