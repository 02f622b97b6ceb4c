use std::ops::RangeInclusive;

/// First octet of an RTP/RTCP datagram, see RFC 7983.
const RTP_FIRST_OCTET: RangeInclusive<u8> = 128..=191;

/// Second octet of an RTCP datagram: packet types 192..=223 (RFC 5761).
const RTCP_PACKET_TYPES: RangeInclusive<u8> = 192..=223;

/// Whether `buf` looks like an RTCP datagram (version bits plus an RTCP
/// packet type). Anything shorter than a header is rejected.
pub fn match_rtcp(buf: &[u8]) -> bool {
    match buf {
        [first, packet_type, _, _, ..] => {
            RTP_FIRST_OCTET.contains(first) && RTCP_PACKET_TYPES.contains(packet_type)
        }
        _ => false,
    }
}
