use crate::header::{FORMAT_ALFB, HEADER_LENGTH, Header, PacketType, SSRC_LENGTH};
use crate::packet::{Packet, get_padding_size, get_trailing_padding};
use bytes::{Buf, BufMut};
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Unique identifier of the cast application layer feedback message.
pub const CAST_IDENTIFIER: [u8; 4] = *b"CAST";

const CAST_FIXED_LENGTH: usize = 4 + 4;
const LOSS_GROUP_HEADER_LENGTH: usize = 4;
const PACKET_ID_LENGTH: usize = 2;

/// Returns true when `frame_id` was sent after `prev_frame_id`, modulo 256.
pub fn is_newer_frame_id(frame_id: u8, prev_frame_id: u8) -> bool {
    frame_id != prev_frame_id && frame_id.wrapping_sub(prev_frame_id) < 0x80
}

/// CastMessage reports which frames a receiver has completed and which
/// frames or packets it is still missing.
///
/// An empty packet set for a frame means the whole frame is lost.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct CastMessage {
    /// SSRC of the media stream the feedback is about.
    pub media_ssrc: u32,
    /// Last frame received completely and in order.
    pub ack_frame_id: u8,
    pub missing_frames_and_packets: BTreeMap<u8, BTreeSet<u16>>,
}

impl CastMessage {
    pub fn new(media_ssrc: u32, ack_frame_id: u8) -> Self {
        CastMessage {
            media_ssrc,
            ack_frame_id,
            missing_frames_and_packets: BTreeMap::new(),
        }
    }

    /// Marks `frame_id` as lost entirely.
    pub fn add_lost_frame(&mut self, frame_id: u8) {
        self.missing_frames_and_packets
            .insert(frame_id, BTreeSet::new());
    }

    /// Marks a single packet of `frame_id` as lost.
    pub fn add_lost_packet(&mut self, frame_id: u8, packet_id: u16) {
        self.missing_frames_and_packets
            .entry(frame_id)
            .or_default()
            .insert(packet_id);
    }

    /// Missing frames in the order they were sent, starting right after
    /// `ack_frame_id` and following the 8-bit wrap.
    pub fn missing_in_send_order(&self) -> Vec<(u8, &BTreeSet<u16>)> {
        let base = self.ack_frame_id.wrapping_add(1);
        let mut frames: Vec<(u8, &BTreeSet<u16>)> = self
            .missing_frames_and_packets
            .iter()
            .map(|(id, packets)| (*id, packets))
            .collect();
        frames.sort_by_key(|(id, _)| id.wrapping_sub(base));
        frames
    }
}

/// CastFeedback is the payload-specific application layer feedback
/// (PT=206, FMT=15) carrying a [`CastMessage`].
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct CastFeedback {
    /// SSRC of the receiver sending this feedback.
    pub sender_ssrc: u32,
    pub message: CastMessage,
}

impl fmt::Display for CastFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = format!(
            "CastFeedback {:x} -> {:x} ack={}\n",
            self.sender_ssrc, self.message.media_ssrc, self.message.ack_frame_id
        );
        for (frame_id, packets) in self.message.missing_in_send_order() {
            if packets.is_empty() {
                out += format!("\tframe {frame_id}: all\n").as_str();
            } else {
                out += format!("\tframe {frame_id}: {packets:?}\n").as_str();
            }
        }
        write!(f, "{out}")
    }
}

impl CastFeedback {
    fn body_size(&self) -> usize {
        let groups: usize = self
            .message
            .missing_frames_and_packets
            .values()
            .map(|p| LOSS_GROUP_HEADER_LENGTH + p.len() * PACKET_ID_LENGTH)
            .sum();
        SSRC_LENGTH * 2 + CAST_FIXED_LENGTH + groups
    }
}

impl Packet for CastFeedback {
    fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_ALFB,
            packet_type: PacketType::PayloadSpecificFeedback,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.message.media_ssrc]
    }

    fn raw_size(&self) -> usize {
        HEADER_LENGTH + self.body_size()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equal(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<CastFeedback>() == Some(self)
    }

    fn cloned(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }
}

impl MarshalSize for CastFeedback {
    fn marshal_size(&self) -> usize {
        let l = self.raw_size();
        l + get_padding_size(l)
    }
}

impl Marshal for CastFeedback {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |V=2|P| FMT=15  |   PT=206      |             length            |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                  SSRC of packet sender                        |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                  SSRC of media source                         |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |  'C'          |  'A'          |  'S'          |  'T'          |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * | ack frame id  | lost frames   |           reserved            |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |   frame id    |   reserved    |        packet id count        |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |          packet id            |          packet id ...        |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let missing = &self.message.missing_frames_and_packets;
        if missing.len() > u8::MAX as usize {
            return Err(Error::TooManyLostFrames);
        }
        if missing.values().any(|p| p.len() > u16::MAX as usize) {
            return Err(Error::TooManyLostPackets);
        }
        if self.marshal_size() / 4 - 1 > u16::MAX as usize {
            return Err(Error::InvalidBlockSize);
        }
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        let h = self.header();
        let n = h.marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.message.media_ssrc);
        buf.put_slice(&CAST_IDENTIFIER);
        buf.put_u8(self.message.ack_frame_id);
        buf.put_u8(missing.len() as u8);
        buf.put_u16(0);

        for (frame_id, packets) in self.message.missing_in_send_order() {
            buf.put_u8(frame_id);
            buf.put_u8(0);
            buf.put_u16(packets.len() as u16);
            for packet_id in packets {
                buf.put_u16(*packet_id);
            }
        }

        for _ in 0..get_padding_size(self.raw_size()) {
            buf.put_u8(0);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for CastFeedback {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let header = Header::unmarshal(raw_packet)?;
        if header.packet_type != PacketType::PayloadSpecificFeedback {
            return Err(Error::WrongType);
        }
        if header.count != FORMAT_ALFB {
            return Err(Error::WrongFeedbackType);
        }

        let body_len = header.block_size() - HEADER_LENGTH;
        if raw_packet.remaining() < body_len {
            return Err(Error::PacketTooShort);
        }
        let mut body = raw_packet.copy_to_bytes(body_len);
        let padding = get_trailing_padding(&header, &body)?;
        body.truncate(body_len - padding);
        if body.len() < SSRC_LENGTH * 2 + CAST_FIXED_LENGTH {
            return Err(Error::PacketTooShort);
        }

        let sender_ssrc = body.get_u32();
        let media_ssrc = body.get_u32();

        let mut identifier = [0u8; 4];
        body.copy_to_slice(&mut identifier);
        if identifier != CAST_IDENTIFIER {
            return Err(Error::MissingCastIdentifier);
        }

        let ack_frame_id = body.get_u8();
        let lost_frames = body.get_u8();
        body.advance(2);

        let mut message = CastMessage::new(media_ssrc, ack_frame_id);
        for _ in 0..lost_frames {
            if body.remaining() < LOSS_GROUP_HEADER_LENGTH {
                return Err(Error::PacketTooShort);
            }
            let frame_id = body.get_u8();
            body.advance(1);
            let count = body.get_u16() as usize;
            if body.remaining() < count * PACKET_ID_LENGTH {
                return Err(Error::PacketTooShort);
            }

            let packets = message
                .missing_frames_and_packets
                .entry(frame_id)
                .or_default();
            for _ in 0..count {
                packets.insert(body.get_u16());
            }
        }

        Ok(CastFeedback {
            sender_ssrc,
            message,
        })
    }
}
