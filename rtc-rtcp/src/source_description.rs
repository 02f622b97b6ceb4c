use crate::header::{COUNT_MAX, HEADER_LENGTH, Header, PacketType};
use crate::packet::{Packet, get_padding_size, get_trailing_padding};
use bytes::{Buf, BufMut, Bytes};
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};
use std::any::Any;
use std::fmt;

const SDES_SOURCE_LEN: usize = 4;
const SDES_TYPE_LEN: usize = 1;
const SDES_OCTET_COUNT_LEN: usize = 1;
const SDES_MAX_OCTET_COUNT: usize = (1 << 8) - 1;
const SDES_TEXT_OFFSET: usize = 2;

/// SDESType is the item type used in the RTCP SDES control packet.
/// RTP SDES item types registered with IANA. See: https://www.iana.org/assignments/rtp-parameters/rtp-parameters.xhtml#rtp-parameters-5
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum SdesType {
    #[default]
    SdesEnd = 0, // end of SDES list                RFC 3550, 6.5
    SdesCname = 1,    // canonical name                  RFC 3550, 6.5.1
    SdesName = 2,     // user name                       RFC 3550, 6.5.2
    SdesEmail = 3,    // user's electronic mail address  RFC 3550, 6.5.3
    SdesPhone = 4,    // user's phone number             RFC 3550, 6.5.4
    SdesLocation = 5, // geographic user location        RFC 3550, 6.5.5
    SdesTool = 6,     // name of application or tool     RFC 3550, 6.5.6
    SdesNote = 7,     // notice about the source         RFC 3550, 6.5.7
    SdesPrivate = 8,  // private extensions              RFC 3550, 6.5.8  (not implemented)
}

impl fmt::Display for SdesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SdesType::SdesEnd => "END",
            SdesType::SdesCname => "CNAME",
            SdesType::SdesName => "NAME",
            SdesType::SdesEmail => "EMAIL",
            SdesType::SdesPhone => "PHONE",
            SdesType::SdesLocation => "LOC",
            SdesType::SdesTool => "TOOL",
            SdesType::SdesNote => "NOTE",
            SdesType::SdesPrivate => "PRIV",
        };
        write!(f, "{s}")
    }
}

impl From<u8> for SdesType {
    fn from(b: u8) -> Self {
        match b {
            1 => SdesType::SdesCname,
            2 => SdesType::SdesName,
            3 => SdesType::SdesEmail,
            4 => SdesType::SdesPhone,
            5 => SdesType::SdesLocation,
            6 => SdesType::SdesTool,
            7 => SdesType::SdesNote,
            8 => SdesType::SdesPrivate,
            _ => SdesType::SdesEnd,
        }
    }
}

/// A SourceDescriptionItem is a part of a SourceDescription that describes a stream.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct SourceDescriptionItem {
    /// The type identifier for this item. eg, SDESCNAME for canonical name description.
    ///
    /// Type zero or SDESEnd is interpreted as the end of an item list and cannot be used.
    pub sdes_type: SdesType,
    /// Text is a unicode text blob associated with the item. Its meaning varies based on the item's Type.
    pub text: Bytes,
}

impl MarshalSize for SourceDescriptionItem {
    fn marshal_size(&self) -> usize {
        SDES_TYPE_LEN + SDES_OCTET_COUNT_LEN + self.text.len()
    }
}

impl Marshal for SourceDescriptionItem {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if self.sdes_type == SdesType::SdesEnd {
            return Err(Error::SdesMissingType);
        }
        if self.text.len() > SDES_MAX_OCTET_COUNT {
            return Err(Error::SdesTextTooLong);
        }
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        buf.put_u8(self.sdes_type as u8);
        buf.put_u8(self.text.len() as u8);
        buf.put(self.text.clone());

        Ok(self.marshal_size())
    }
}

impl Unmarshal for SourceDescriptionItem {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if raw_packet.remaining() < SDES_TEXT_OFFSET {
            return Err(Error::PacketTooShort);
        }

        let sdes_type = SdesType::from(raw_packet.get_u8());
        let octet_count = raw_packet.get_u8() as usize;
        if octet_count > raw_packet.remaining() {
            return Err(Error::PacketTooShort);
        }

        let text = raw_packet.copy_to_bytes(octet_count);

        Ok(SourceDescriptionItem { sdes_type, text })
    }
}

/// A SourceDescriptionChunk contains items describing a single RTP source
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct SourceDescriptionChunk {
    /// The source (ssrc or csrc) identifier this packet describes
    pub source: u32,
    pub items: Vec<SourceDescriptionItem>,
}

impl SourceDescriptionChunk {
    fn raw_size(&self) -> usize {
        let mut len = SDES_SOURCE_LEN;
        for it in &self.items {
            len += it.marshal_size();
        }
        len += SDES_TYPE_LEN; // for terminating null octet
        len
    }
}

impl MarshalSize for SourceDescriptionChunk {
    fn marshal_size(&self) -> usize {
        let l = self.raw_size();
        // align to 32-bit boundary
        l + get_padding_size(l)
    }
}

impl Marshal for SourceDescriptionChunk {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        /*
         *  +--------+--------+--------+--------+
         *  |          SSRC/CSRC_1              |
         *  +--------+--------+--------+--------+
         *  |           SDES items              |
         *  |              ...                  |
         *  +--------+--------+--------+--------+
         */
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        buf.put_u32(self.source);

        for it in &self.items {
            let n = it.marshal_to(buf)?;
            buf = &mut buf[n..];
        }

        // The list of items in each chunk MUST be terminated by one or more null octets
        buf.put_u8(SdesType::SdesEnd as u8);

        // additional null octets MUST be included if needed to pad until the next 32-bit boundary
        let padding_size = get_padding_size(self.raw_size());
        for _ in 0..padding_size {
            buf.put_u8(0);
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for SourceDescriptionChunk {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        /* chunk layout:
         *  +--------+--------+--------+--------+
         *  |          SSRC/CSRC_1              |
         *  +--------+--------+--------+--------+
         *  |           SDES items              |
         *  |              ...                  |
         *  +--------+--------+--------+--------+
         */
        let raw_packet_len = raw_packet.remaining();
        if raw_packet_len < (SDES_SOURCE_LEN + SDES_TYPE_LEN) {
            return Err(Error::PacketTooShort);
        }

        let source = raw_packet.get_u32();
        let mut offset = SDES_SOURCE_LEN;
        let mut items = vec![];

        while offset < raw_packet_len {
            if !raw_packet.has_remaining() {
                return Err(Error::PacketTooShort);
            }

            if raw_packet.chunk()[0] == SdesType::SdesEnd as u8 {
                // the list of items is terminated by null octets up to the next 32-bit boundary
                raw_packet.advance(1);
                offset += 1;
                let padding = get_padding_size(offset);
                if raw_packet.remaining() < padding {
                    return Err(Error::PacketTooShort);
                }
                raw_packet.advance(padding);
                return Ok(SourceDescriptionChunk { source, items });
            }

            let item = SourceDescriptionItem::unmarshal(raw_packet)?;
            offset += item.marshal_size();
            items.push(item);
        }

        Err(Error::PacketTooShort)
    }
}

/// A SourceDescription (SDES) packet describes the sources in an RTP stream.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct SourceDescription {
    pub chunks: Vec<SourceDescriptionChunk>,
}

impl SourceDescription {
    /// A description carrying a single CNAME item for `source`.
    pub fn with_cname(source: u32, cname: &str) -> Self {
        SourceDescription {
            chunks: vec![SourceDescriptionChunk {
                source,
                items: vec![SourceDescriptionItem {
                    sdes_type: SdesType::SdesCname,
                    text: Bytes::copy_from_slice(cname.as_bytes()),
                }],
            }],
        }
    }

    /// CNAME announced for `source`, if any.
    pub fn cname(&self, source: u32) -> Option<&Bytes> {
        self.chunks
            .iter()
            .filter(|c| c.source == source)
            .flat_map(|c| c.items.iter())
            .find(|it| it.sdes_type == SdesType::SdesCname)
            .map(|it| &it.text)
    }
}

impl fmt::Display for SourceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = "Source Description:\n".to_string();
        for c in &self.chunks {
            out += format!("\t{:x}\n", c.source).as_str();
            for it in &c.items {
                out += format!("\t\t{}: {:?}\n", it.sdes_type, it.text).as_str();
            }
        }
        write!(f, "{out}")
    }
}

impl Packet for SourceDescription {
    fn header(&self) -> Header {
        Header {
            padding: false,
            count: self.chunks.len() as u8,
            packet_type: PacketType::SourceDescription,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    /// destination_ssrc returns an array of SSRC values that this packet refers to.
    fn destination_ssrc(&self) -> Vec<u32> {
        self.chunks.iter().map(|x| x.source).collect()
    }

    fn raw_size(&self) -> usize {
        let mut chunks_length = 0;
        for c in &self.chunks {
            chunks_length += c.marshal_size();
        }
        HEADER_LENGTH + chunks_length
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equal(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<SourceDescription>() == Some(self)
    }

    fn cloned(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }
}

impl MarshalSize for SourceDescription {
    fn marshal_size(&self) -> usize {
        self.raw_size()
    }
}

impl Marshal for SourceDescription {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        /*
         *         0                   1                   2                   3
         *         0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * header |V=2|P|    SC   |  PT=SDES=202  |             length            |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * chunk  |                          SSRC/CSRC_1                          |
         *   1    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                           SDES items                          |
         *        |                              ...                              |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         */
        if self.chunks.len() > COUNT_MAX {
            return Err(Error::TooManyChunks);
        }
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        let h = self.header();
        let n = h.marshal_to(buf)?;
        buf = &mut buf[n..];

        for c in &self.chunks {
            let n = c.marshal_to(buf)?;
            buf = &mut buf[n..];
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for SourceDescription {
    /// Unmarshal decodes the SourceDescription from binary
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let header = Header::unmarshal(raw_packet)?;
        if header.packet_type != PacketType::SourceDescription {
            return Err(Error::WrongType);
        }

        let body_len = header.block_size() - HEADER_LENGTH;
        if raw_packet.remaining() < body_len {
            return Err(Error::PacketTooShort);
        }
        let mut body = raw_packet.copy_to_bytes(body_len);
        let padding = get_trailing_padding(&header, &body)?;
        body.truncate(body_len - padding);

        let mut chunks = vec![];
        for _ in 0..header.count {
            let chunk = SourceDescriptionChunk::unmarshal(&mut body)?;
            chunks.push(chunk);
        }

        Ok(SourceDescription { chunks })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_source_description_unmarshal() {
        let tests = vec![
            (
                "bad cname length",
                Bytes::from_static(&[
                    // v=2, p=0, count=1, SDES, len=2
                    0x81, 0xca, 0x00, 0x02, // ssrc=0x00000000
                    0x00, 0x00, 0x00, 0x00, // CNAME, len = 1
                    0x01, 0x01,
                ]),
                SourceDescription::default(),
                Some(Error::PacketTooShort),
            ),
            (
                "no end",
                Bytes::from_static(&[
                    // v=2, p=0, count=1, SDES, len=2
                    0x81, 0xca, 0x00, 0x02, // ssrc=0x00000000
                    0x00, 0x00, 0x00, 0x00, // CNAME, len=2, content=AA
                    0x01, 0x02, 0x41, 0x41,
                ]),
                SourceDescription::default(),
                Some(Error::PacketTooShort),
            ),
            (
                "cname",
                Bytes::from_static(&[
                    // v=2, p=0, count=1, SDES, len=3
                    0x81, 0xca, 0x00, 0x03, // ssrc=0x01020304
                    0x01, 0x02, 0x03, 0x04, // CNAME, len=1, content=A
                    0x01, 0x01, 0x41, // END
                    0x00,
                ]),
                SourceDescription {
                    chunks: vec![SourceDescriptionChunk {
                        source: 0x01020304,
                        items: vec![SourceDescriptionItem {
                            sdes_type: SdesType::SdesCname,
                            text: Bytes::from_static(b"A"),
                        }],
                    }],
                },
                None,
            ),
            (
                "cname with packet padding",
                Bytes::from_static(&[
                    // v=2, p=1, count=1, SDES, len=3
                    0xa1, 0xca, 0x00, 0x03, // ssrc=0x01020304
                    0x01, 0x02, 0x03, 0x04, // CNAME, len=1, content=A
                    0x01, 0x01, 0x41, // END
                    0x00, // 4 octets of padding
                    0x00, 0x00, 0x00, 0x04,
                ]),
                SourceDescription {
                    chunks: vec![SourceDescriptionChunk {
                        source: 0x01020304,
                        items: vec![SourceDescriptionItem {
                            sdes_type: SdesType::SdesCname,
                            text: Bytes::from_static(b"A"),
                        }],
                    }],
                },
                None,
            ),
            (
                "bad packet padding",
                Bytes::from_static(&[
                    // v=2, p=1, count=1, SDES, len=3
                    0xa1, 0xca, 0x00, 0x03, // ssrc=0x01020304
                    0x01, 0x02, 0x03, 0x04, // CNAME, len=1, content=A
                    0x01, 0x01, 0x41, // END
                    0x00, // padding count larger than the body
                    0x00, 0x00, 0x00, 0x10,
                ]),
                SourceDescription::default(),
                Some(Error::WrongPadding),
            ),
            (
                "two items",
                Bytes::from_static(&[
                    // v=2, p=0, count=1, SDES, len=3
                    0x81, 0xca, 0x00, 0x03, // ssrc=0x01020304
                    0x01, 0x02, 0x03, 0x04, // CNAME, len=1, content=A
                    0x01, 0x01, 0x41, // PHONE, len=1, content=B
                    0x04, 0x01, 0x42, // END + padding
                    0x00, 0x00,
                ]),
                SourceDescription {
                    chunks: vec![SourceDescriptionChunk {
                        source: 0x01020304,
                        items: vec![
                            SourceDescriptionItem {
                                sdes_type: SdesType::SdesCname,
                                text: Bytes::from_static(b"A"),
                            },
                            SourceDescriptionItem {
                                sdes_type: SdesType::SdesPhone,
                                text: Bytes::from_static(b"B"),
                            },
                        ],
                    }],
                },
                None,
            ),
        ];

        for (name, data, want, want_error) in tests {
            let buf = &mut data.clone();
            let got = SourceDescription::unmarshal(buf);

            assert_eq!(
                got.is_err(),
                want_error.is_some(),
                "Unmarshal {name}: err = {got:?}, want {want_error:?}"
            );

            if let Some(err) = want_error {
                let got_err = got.err().unwrap();
                assert_eq!(
                    err, got_err,
                    "Unmarshal {name}: err = {got_err:?}, want {err:?}",
                );
            } else {
                let actual = got.unwrap();
                assert_eq!(
                    actual, want,
                    "Unmarshal {name}: got {actual:?}, want {want:?}"
                );
            }
        }
    }

    #[test]
    fn test_source_description_with_cname() {
        let sdes = SourceDescription::with_cname(0x10203, "test@10.1.1.1");
        let data = sdes.marshal().unwrap();
        // header + ssrc + (type, len, 13 octets) + END, padded to 24
        assert_eq!(data.len(), 24);
        assert_eq!(data.len() % 4, 0);

        let decoded = SourceDescription::unmarshal(&mut data.clone()).unwrap();
        assert_eq!(decoded, sdes);
        assert_eq!(
            decoded.cname(0x10203),
            Some(&Bytes::from_static(b"test@10.1.1.1"))
        );
        assert_eq!(decoded.cname(0xdead), None);
    }

    #[test]
    fn test_source_description_text_too_long() {
        let sdes = SourceDescription::with_cname(1, &"x".repeat(256));
        assert_eq!(sdes.marshal().unwrap_err(), Error::SdesTextTooLong);
    }

    #[test]
    fn test_source_description_missing_type() {
        let sdes = SourceDescription {
            chunks: vec![SourceDescriptionChunk {
                source: 1,
                items: vec![SourceDescriptionItem {
                    sdes_type: SdesType::SdesEnd,
                    text: Bytes::from_static(b"x"),
                }],
            }],
        };
        assert_eq!(sdes.marshal().unwrap_err(), Error::SdesMissingType);
    }
}
