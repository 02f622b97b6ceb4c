use crate::header::{HEADER_LENGTH, Header, PacketType, SSRC_LENGTH};
use crate::packet::{Packet, get_trailing_padding};
use bytes::{Buf, BufMut};
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};
use std::any::Any;
use std::fmt;

const XR_BLOCK_HEADER_LENGTH: usize = 4;
const DLRR_SUB_BLOCK_LENGTH: usize = 12;

/// Block type of an extended report block, RFC 3611 section 4.
pub const BLOCK_TYPE_RECEIVER_REFERENCE_TIME: u8 = 4;
pub const BLOCK_TYPE_DLRR: u8 = 5;

/// One DLRR sub-block: the echo of a receiver reference time report.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct DlrrReport {
    /// SSRC of the receiver whose RRTR is being echoed.
    pub ssrc: u32,
    /// Middle 32 bits of the NTP timestamp carried in that RRTR.
    pub last_rr: u32,
    /// Delay since receiving that RRTR, in units of 1/65536 seconds.
    pub dlrr: u32,
}

/// A report block carried inside an [`ExtendedReport`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ReportBlock {
    /// Receiver Reference Time report block (BT=4), a full 64-bit NTP timestamp.
    ReceiverReferenceTime(u64),
    /// DLRR report block (BT=5).
    Dlrr(Vec<DlrrReport>),
}

impl ReportBlock {
    fn block_type(&self) -> u8 {
        match self {
            ReportBlock::ReceiverReferenceTime(_) => BLOCK_TYPE_RECEIVER_REFERENCE_TIME,
            ReportBlock::Dlrr(_) => BLOCK_TYPE_DLRR,
        }
    }

    fn body_length(&self) -> usize {
        match self {
            ReportBlock::ReceiverReferenceTime(_) => 8,
            ReportBlock::Dlrr(reports) => reports.len() * DLRR_SUB_BLOCK_LENGTH,
        }
    }
}

impl MarshalSize for ReportBlock {
    fn marshal_size(&self) -> usize {
        XR_BLOCK_HEADER_LENGTH + self.body_length()
    }
}

impl Marshal for ReportBlock {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |      BT       | type-specific |         block length          |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * :             type-specific block contents                      :
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let body_words = self.body_length() / 4;
        if body_words > u16::MAX as usize {
            return Err(Error::InvalidBlockSize);
        }
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        buf.put_u8(self.block_type());
        buf.put_u8(0);
        buf.put_u16(body_words as u16);

        match self {
            ReportBlock::ReceiverReferenceTime(ntp) => buf.put_u64(*ntp),
            ReportBlock::Dlrr(reports) => {
                for r in reports {
                    buf.put_u32(r.ssrc);
                    buf.put_u32(r.last_rr);
                    buf.put_u32(r.dlrr);
                }
            }
        }

        Ok(self.marshal_size())
    }
}

/// The ExtendedReport packet (RFC 3611) carries the reference time exchange
/// that lets a pure receiver measure its round trip time.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct ExtendedReport {
    pub sender_ssrc: u32,
    pub reports: Vec<ReportBlock>,
}

impl ExtendedReport {
    pub fn receiver_reference_time(&self) -> Option<u64> {
        self.reports.iter().find_map(|r| match r {
            ReportBlock::ReceiverReferenceTime(ntp) => Some(*ntp),
            _ => None,
        })
    }

    pub fn dlrr_for(&self, ssrc: u32) -> Option<DlrrReport> {
        self.reports
            .iter()
            .filter_map(|r| match r {
                ReportBlock::Dlrr(subs) => Some(subs),
                _ => None,
            })
            .flatten()
            .find(|d| d.ssrc == ssrc)
            .copied()
    }
}

impl fmt::Display for ExtendedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = format!("ExtendedReport from {:x}\n", self.sender_ssrc);
        for r in &self.reports {
            match r {
                ReportBlock::ReceiverReferenceTime(ntp) => {
                    out += format!("\tRRTR ntp={ntp:x}\n").as_str();
                }
                ReportBlock::Dlrr(subs) => {
                    for d in subs {
                        out += format!(
                            "\tDLRR {:x} lrr={:x} dlrr={}\n",
                            d.ssrc, d.last_rr, d.dlrr
                        )
                        .as_str();
                    }
                }
            }
        }
        write!(f, "{out}")
    }
}

impl Packet for ExtendedReport {
    fn header(&self) -> Header {
        Header {
            padding: false,
            count: 0,
            packet_type: PacketType::ExtendedReport,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    fn destination_ssrc(&self) -> Vec<u32> {
        let mut out = vec![self.sender_ssrc];
        for r in &self.reports {
            if let ReportBlock::Dlrr(subs) = r {
                out.extend(subs.iter().map(|d| d.ssrc));
            }
        }
        out
    }

    fn raw_size(&self) -> usize {
        HEADER_LENGTH
            + SSRC_LENGTH
            + self.reports.iter().map(|r| r.marshal_size()).sum::<usize>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equal(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<ExtendedReport>() == Some(self)
    }

    fn cloned(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }
}

impl MarshalSize for ExtendedReport {
    fn marshal_size(&self) -> usize {
        self.raw_size()
    }
}

impl Marshal for ExtendedReport {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }
        if self.marshal_size() / 4 - 1 > u16::MAX as usize {
            return Err(Error::InvalidBlockSize);
        }

        let h = self.header();
        let n = h.marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);

        for r in &self.reports {
            let n = r.marshal_to(buf)?;
            buf = &mut buf[n..];
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for ExtendedReport {
    /// Unmarshal decodes the ExtendedReport from binary. Block types other
    /// than RRTR and DLRR are skipped by their declared length.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if raw_packet.remaining() < HEADER_LENGTH + SSRC_LENGTH {
            return Err(Error::PacketTooShort);
        }

        let header = Header::unmarshal(raw_packet)?;
        if header.packet_type != PacketType::ExtendedReport {
            return Err(Error::WrongType);
        }

        let body_len = header.block_size() - HEADER_LENGTH;
        if raw_packet.remaining() < body_len {
            return Err(Error::PacketTooShort);
        }
        let mut body = raw_packet.copy_to_bytes(body_len);
        let padding = get_trailing_padding(&header, &body)?;
        body.truncate(body_len - padding);
        if body.len() < SSRC_LENGTH {
            return Err(Error::PacketTooShort);
        }

        let sender_ssrc = body.get_u32();
        let mut reports = vec![];

        while body.has_remaining() {
            if body.remaining() < XR_BLOCK_HEADER_LENGTH {
                return Err(Error::PacketTooShort);
            }
            let block_type = body.get_u8();
            let _type_specific = body.get_u8();
            let block_len = body.get_u16() as usize * 4;
            if body.remaining() < block_len {
                return Err(Error::PacketTooShort);
            }

            match block_type {
                BLOCK_TYPE_RECEIVER_REFERENCE_TIME => {
                    if block_len != 8 {
                        return Err(Error::InvalidBlockSize);
                    }
                    reports.push(ReportBlock::ReceiverReferenceTime(body.get_u64()));
                }
                BLOCK_TYPE_DLRR => {
                    if block_len % DLRR_SUB_BLOCK_LENGTH != 0 {
                        return Err(Error::InvalidBlockSize);
                    }
                    let mut subs = Vec::with_capacity(block_len / DLRR_SUB_BLOCK_LENGTH);
                    for _ in 0..block_len / DLRR_SUB_BLOCK_LENGTH {
                        subs.push(DlrrReport {
                            ssrc: body.get_u32(),
                            last_rr: body.get_u32(),
                            dlrr: body.get_u32(),
                        });
                    }
                    reports.push(ReportBlock::Dlrr(subs));
                }
                _ => body.advance(block_len),
            }
        }

        Ok(ExtendedReport {
            sender_ssrc,
            reports,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_extended_report_marshal_layout() {
        let xr = ExtendedReport {
            sender_ssrc: 0x01020304,
            reports: vec![
                ReportBlock::ReceiverReferenceTime(0xda8bd1fcdddda05a),
                ReportBlock::Dlrr(vec![DlrrReport {
                    ssrc: 0x05060708,
                    last_rr: 0xd1fcdddd,
                    dlrr: 0x10,
                }]),
            ],
        };

        let data = xr.marshal().unwrap();
        assert_eq!(
            &data[..],
            &[
                0x80, 0xcf, 0x00, 0x08, // v=2, XR, len=8
                0x01, 0x02, 0x03, 0x04, // sender ssrc
                0x04, 0x00, 0x00, 0x02, // RRTR, len=2
                0xda, 0x8b, 0xd1, 0xfc, // ntp msw
                0xdd, 0xdd, 0xa0, 0x5a, // ntp lsw
                0x05, 0x00, 0x00, 0x03, // DLRR, len=3
                0x05, 0x06, 0x07, 0x08, // ssrc
                0xd1, 0xfc, 0xdd, 0xdd, // last rr
                0x00, 0x00, 0x00, 0x10, // dlrr
            ][..]
        );

        let decoded = ExtendedReport::unmarshal(&mut data.clone()).unwrap();
        assert_eq!(decoded, xr);
        assert_eq!(decoded.receiver_reference_time(), Some(0xda8bd1fcdddda05a));
        assert_eq!(decoded.dlrr_for(0x05060708).map(|d| d.dlrr), Some(0x10));
        assert_eq!(decoded.dlrr_for(0x1), None);
    }

    #[test]
    fn test_extended_report_skips_unknown_block() {
        let mut data = Bytes::from_static(&[
            0x80, 0xcf, 0x00, 0x06, // v=2, XR, len=6
            0x01, 0x02, 0x03, 0x04, // sender ssrc
            0x07, 0x00, 0x00, 0x01, // BT=7, len=1
            0xff, 0xff, 0xff, 0xff, // ignored
            0x04, 0x00, 0x00, 0x02, // RRTR, len=2
            0x00, 0x00, 0x00, 0x01, //
            0x00, 0x00, 0x00, 0x02, //
        ]);

        let xr = ExtendedReport::unmarshal(&mut data).unwrap();
        assert_eq!(
            xr.reports,
            vec![ReportBlock::ReceiverReferenceTime(0x0000_0001_0000_0002)]
        );
    }

    #[test]
    fn test_extended_report_with_padding() {
        let mut data = Bytes::from_static(&[
            0xa0, 0xcf, 0x00, 0x05, // v=2, p=1, XR, len=5
            0x01, 0x02, 0x03, 0x04, // sender ssrc
            0x04, 0x00, 0x00, 0x02, // RRTR, len=2
            0x00, 0x00, 0x00, 0x01, //
            0x00, 0x00, 0x00, 0x02, //
            0x00, 0x00, 0x00, 0x04, // 4 octets of padding
        ]);

        let xr = ExtendedReport::unmarshal(&mut data).unwrap();
        assert_eq!(xr.sender_ssrc, 0x01020304);
        assert_eq!(xr.receiver_reference_time(), Some(0x0000_0001_0000_0002));
        assert!(!data.has_remaining());
    }

    #[test]
    fn test_extended_report_truncated_block() {
        let mut data = Bytes::from_static(&[
            0x80, 0xcf, 0x00, 0x03, // v=2, XR, len=3
            0x01, 0x02, 0x03, 0x04, // sender ssrc
            0x04, 0x00, 0x00, 0x02, // RRTR claims 8 bytes
            0x00, 0x00, 0x00, 0x01, // only 4 present
        ]);
        assert_eq!(
            ExtendedReport::unmarshal(&mut data).unwrap_err(),
            Error::PacketTooShort
        );
    }

    #[test]
    fn test_extended_report_bad_rrtr_length() {
        let mut data = Bytes::from_static(&[
            0x80, 0xcf, 0x00, 0x03, // v=2, XR, len=3
            0x01, 0x02, 0x03, 0x04, // sender ssrc
            0x04, 0x00, 0x00, 0x01, // RRTR, len=1
            0x00, 0x00, 0x00, 0x01,
        ]);
        assert_eq!(
            ExtendedReport::unmarshal(&mut data).unwrap_err(),
            Error::InvalidBlockSize
        );
    }
}
