use crate::header::{COUNT_MAX, HEADER_LENGTH, Header, PacketType, SSRC_LENGTH};
use crate::packet::Packet;
use crate::reception_report::{RECEPTION_REPORT_LENGTH, ReceptionReport};
use bytes::{Buf, BufMut};
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};
use std::any::Any;
use std::fmt;

/// A ReceiverReport (RR) packet provides reception quality feedback for an RTP stream
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct ReceiverReport {
    /// The synchronization source identifier for the originator of this RR packet.
    pub ssrc: u32,
    /// Zero or more reception report blocks depending on the number of other
    /// sources heard by this sender since the last report. Each reception report
    /// block conveys statistics on the reception of RTP packets from a
    /// single synchronization source.
    pub reports: Vec<ReceptionReport>,
}

impl fmt::Display for ReceiverReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = format!("ReceiverReport from {:x}\n", self.ssrc);
        out += "\tSSRC    \tLost\tLastSequence\n";
        for rep in &self.reports {
            out += format!(
                "\t{:x}\t{}/{}\t{}\n",
                rep.ssrc, rep.fraction_lost, rep.total_lost, rep.last_sequence_number
            )
            .as_str();
        }
        write!(f, "{out}")
    }
}

impl Packet for ReceiverReport {
    /// Header returns the Header associated with this packet.
    fn header(&self) -> Header {
        Header {
            padding: false,
            count: self.reports.len() as u8,
            packet_type: PacketType::ReceiverReport,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    /// destination_ssrc returns an array of SSRC values that this packet refers to.
    fn destination_ssrc(&self) -> Vec<u32> {
        self.reports.iter().map(|x| x.ssrc).collect()
    }

    fn raw_size(&self) -> usize {
        HEADER_LENGTH + SSRC_LENGTH + self.reports.len() * RECEPTION_REPORT_LENGTH
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equal(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<ReceiverReport>() == Some(self)
    }

    fn cloned(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }
}

impl MarshalSize for ReceiverReport {
    fn marshal_size(&self) -> usize {
        self.raw_size()
    }
}

impl Marshal for ReceiverReport {
    /// marshal_to encodes the packet in binary.
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        /*
         *         0                   1                   2                   3
         *         0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * header |V=2|P|    RC   |   PT=RR=201   |             length            |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                     SSRC of packet sender                     |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * report |                 SSRC_1 (SSRC of first source)                 |
         * block  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *   1    |                              ...                              |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         */
        if self.reports.len() > COUNT_MAX {
            return Err(Error::TooManyReports);
        }
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort);
        }

        let h = self.header();
        let n = h.marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.ssrc);

        for report in &self.reports {
            let n = report.marshal_to(buf)?;
            buf = &mut buf[n..];
        }

        Ok(self.marshal_size())
    }
}

impl Unmarshal for ReceiverReport {
    /// Unmarshal decodes the ReceiverReport from binary
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let raw_packet_len = raw_packet.remaining();
        if raw_packet_len < HEADER_LENGTH + SSRC_LENGTH {
            return Err(Error::PacketTooShort);
        }

        let header = Header::unmarshal(raw_packet)?;
        if header.packet_type != PacketType::ReceiverReport {
            return Err(Error::WrongType);
        }

        let ssrc = raw_packet.get_u32();

        let mut reports = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            let reception_report = ReceptionReport::unmarshal(raw_packet)?;
            reports.push(reception_report);
        }

        if raw_packet.has_remaining() {
            raw_packet.advance(raw_packet.remaining());
        }

        Ok(ReceiverReport { ssrc, reports })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_receiver_report_unmarshal() {
        let tests = vec![
            (
                "valid",
                Bytes::from_static(&[
                    0x81u8, 0xc9, 0x0, 0x7, // v=2, p=0, count=1, RR, len=7
                    0x90, 0x2f, 0x9e, 0x2e, // ssrc=0x902f9e2e
                    0xbc, 0x5e, 0x9a, 0x40, // ssrc=0xbc5e9a40
                    0x0, 0x0, 0x0, 0x0, // fracLost=0, totalLost=0
                    0x0, 0x0, 0x46, 0xe1, // lastSeq=0x46e1
                    0x0, 0x0, 0x1, 0x11, // jitter=273
                    0x9, 0xf3, 0x64, 0x32, // lsr=0x9f36432
                    0x0, 0x2, 0x4a, 0x79, // delay=150137
                ]),
                ReceiverReport {
                    ssrc: 0x902f9e2e,
                    reports: vec![ReceptionReport {
                        ssrc: 0xbc5e9a40,
                        fraction_lost: 0,
                        total_lost: 0,
                        last_sequence_number: 0x46e1,
                        jitter: 273,
                        last_sender_report: 0x9f36432,
                        delay: 150137,
                    }],
                },
                None,
            ),
            (
                "wrong type",
                Bytes::from_static(&[
                    0x81, 0xc8, 0x0, 0x7, // v=2, p=0, count=1, SR, len=7
                    0x90, 0x2f, 0x9e, 0x2e, // ssrc=0x902f9e2e
                    0xbc, 0x5e, 0x9a, 0x40, // ssrc=0xbc5e9a40
                    0x0, 0x0, 0x0, 0x0, // fracLost=0, totalLost=0
                    0x0, 0x0, 0x46, 0xe1, // lastSeq=0x46e1
                    0x0, 0x0, 0x1, 0x11, // jitter=273
                    0x9, 0xf3, 0x64, 0x32, // lsr=0x9f36432
                    0x0, 0x2, 0x4a, 0x79, // delay=150137
                ]),
                ReceiverReport::default(),
                Some(Error::WrongType),
            ),
            (
                "bad count in header",
                Bytes::from_static(&[
                    0x82, 0xc9, 0x0, 0x7, // v=2, p=0, count=2, RR, len=7
                    0x90, 0x2f, 0x9e, 0x2e, // ssrc=0x902f9e2e
                    0xbc, 0x5e, 0x9a, 0x40, // ssrc=0xbc5e9a40
                    0x0, 0x0, 0x0, 0x0, // fracLost=0, totalLost=0
                    0x0, 0x0, 0x46, 0xe1, // lastSeq=0x46e1
                    0x0, 0x0, 0x1, 0x11, // jitter=273
                    0x9, 0xf3, 0x64, 0x32, // lsr=0x9f36432
                    0x0, 0x2, 0x4a, 0x79, // delay=150137
                ]),
                ReceiverReport::default(),
                Some(Error::PacketTooShort),
            ),
            (
                "nil",
                Bytes::from_static(&[]),
                ReceiverReport::default(),
                Some(Error::PacketTooShort),
            ),
        ];

        for (name, data, want, want_error) in tests {
            let buf = &mut data.clone();
            let got = ReceiverReport::unmarshal(buf);

            assert_eq!(
                got.is_err(),
                want_error.is_some(),
                "Unmarshal {name} rr: err = {got:?}, want {want_error:?}"
            );

            if let Some(err) = want_error {
                let got_err = got.err().unwrap();
                assert_eq!(
                    err, got_err,
                    "Unmarshal {name} rr: err = {got_err:?}, want {err:?}",
                );
            } else {
                let actual = got.unwrap();
                assert_eq!(
                    actual, want,
                    "Unmarshal {name} rr: got {actual:?}, want {want:?}"
                );
            }
        }
    }

    #[test]
    fn test_receiver_report_marshal_unmarshal() {
        let rr = ReceiverReport {
            ssrc: 0x902f9e2e,
            reports: vec![ReceptionReport {
                ssrc: 0xbc5e9a40,
                last_sender_report: 0x9f36432,
                delay: 150137,
                ..Default::default()
            }],
        };

        let data = rr.marshal().unwrap();
        assert_eq!(data.len(), 32);
        assert_eq!(rr.header().length, 7);

        let decoded = ReceiverReport::unmarshal(&mut data.clone()).unwrap();
        assert_eq!(decoded, rr);
        assert_eq!(rr.destination_ssrc(), vec![0xbc5e9a40]);
    }

    #[test]
    fn test_receiver_report_buffer_too_short() {
        let rr = ReceiverReport {
            ssrc: 1,
            reports: vec![],
        };
        let mut buf = [0u8; 4];
        assert_eq!(rr.marshal_to(&mut buf).unwrap_err(), Error::BufferTooShort);
    }
}
