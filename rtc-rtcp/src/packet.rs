use crate::header::Header;
use shared::error::{Error, Result};
use shared::marshal::Marshal;

use std::any::Any;
use std::fmt;

/// Packet represents an RTCP packet, a protocol used for out-of-band statistics
/// and control information for an RTP session
pub trait Packet: Marshal + fmt::Display + fmt::Debug {
    fn header(&self) -> Header;
    fn destination_ssrc(&self) -> Vec<u32>;
    fn raw_size(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn equal(&self, other: &dyn Packet) -> bool;
    fn cloned(&self) -> Box<dyn Packet>;
}

impl PartialEq for dyn Packet {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl Clone for Box<dyn Packet> {
    fn clone(&self) -> Box<dyn Packet> {
        self.cloned()
    }
}

/// Number of zero bytes needed to align `len` to a 32-bit boundary.
pub(crate) fn get_padding_size(len: usize) -> usize {
    if len % 4 == 0 { 0 } else { 4 - (len % 4) }
}

/// Number of padding octets at the end of `body` (the packet without its
/// header). Zero unless the header's padding bit is set; the last octet then
/// counts the padding, itself included.
pub(crate) fn get_trailing_padding(header: &Header, body: &[u8]) -> Result<usize> {
    if !header.padding {
        return Ok(0);
    }
    match body.last() {
        Some(&n) if n != 0 && n as usize <= body.len() => Ok(n as usize),
        _ => Err(Error::WrongPadding),
    }
}
