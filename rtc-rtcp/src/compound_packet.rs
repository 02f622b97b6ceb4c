use crate::cast_feedback::CastFeedback;
use crate::extended_report::ExtendedReport;
use crate::header::{FORMAT_ALFB, HEADER_LENGTH, Header, PacketType};
use crate::packet::{Packet, get_trailing_padding};
use crate::receiver_report::ReceiverReport;
use crate::sender_report::SenderReport;
use crate::source_description::SourceDescription;
use bytes::{Bytes, BytesMut};
use log::{trace, warn};
use shared::error::{Error, Result};
use shared::marshal::Unmarshal;

/// Serializes a list of packets into one compound RTCP datagram.
pub fn marshal(packets: &[Box<dyn Packet>]) -> Result<Bytes> {
    let size: usize = packets.iter().map(|p| p.marshal_size()).sum();
    let mut out = BytesMut::with_capacity(size);
    for p in packets {
        let data = p.marshal()?;
        out.extend_from_slice(&data);
    }
    Ok(out.freeze())
}

/// Decodes every block of a compound RTCP datagram that this stack understands.
///
/// Decoding never fails as a whole. Unsupported block types are skipped by
/// their declared length, a malformed block is dropped, and a header that
/// cannot be read or that claims more bytes than are left ends decoding
/// while keeping the blocks decoded so far.
pub fn unmarshal(raw_data: &Bytes) -> Vec<Box<dyn Packet>> {
    let mut packets: Vec<Box<dyn Packet>> = vec![];
    let mut offset = 0;

    while raw_data.len() - offset >= HEADER_LENGTH {
        let header = match Header::unmarshal(&mut raw_data.slice(offset..offset + HEADER_LENGTH)) {
            Ok(h) => h,
            Err(err) => {
                warn!("rtcp: stop decoding at offset {offset}: {err}");
                break;
            }
        };

        let block_size = header.block_size();
        if offset + block_size > raw_data.len() {
            warn!(
                "rtcp: {} block at offset {offset} claims {block_size} bytes, only {} left",
                header.packet_type,
                raw_data.len() - offset
            );
            break;
        }

        let block = raw_data.slice(offset..offset + block_size);
        offset += block_size;

        match unmarshal_block(&header, block) {
            Ok(Some(p)) => {
                trace!("rtcp: decoded {} block", header.packet_type);
                packets.push(p);
            }
            Ok(None) => {
                trace!(
                    "rtcp: skipped {} block (fmt {})",
                    header.packet_type, header.count
                );
            }
            Err(err) => warn!("rtcp: dropped {err}"),
        }
    }

    if offset < raw_data.len() {
        trace!("rtcp: {} trailing bytes ignored", raw_data.len() - offset);
    }

    packets
}

/// Decodes one block whose header has already been read. `Ok(None)` means
/// the block is well formed but not one this stack handles.
fn unmarshal_block(header: &Header, block: Bytes) -> Result<Option<Box<dyn Packet>>> {
    decode_block(header, block)
        .map_err(|err| Error::MalformedBlock(format!("{} block: {err}", header.packet_type)))
}

fn decode_block(header: &Header, mut block: Bytes) -> Result<Option<Box<dyn Packet>>> {
    get_trailing_padding(header, &block[HEADER_LENGTH..])?;

    let packet: Box<dyn Packet> = match header.packet_type {
        PacketType::SenderReport => Box::new(SenderReport::unmarshal(&mut block)?),
        PacketType::ReceiverReport => Box::new(ReceiverReport::unmarshal(&mut block)?),
        PacketType::SourceDescription => Box::new(SourceDescription::unmarshal(&mut block)?),
        PacketType::ExtendedReport => Box::new(ExtendedReport::unmarshal(&mut block)?),
        PacketType::PayloadSpecificFeedback if header.count == FORMAT_ALFB => {
            match CastFeedback::unmarshal(&mut block) {
                Ok(fb) => Box::new(fb),
                // application feedback for some other application
                Err(Error::MissingCastIdentifier) => return Ok(None),
                Err(err) => return Err(err),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(packet))
}
