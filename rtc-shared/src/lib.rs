#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Pieces shared by the RTCP codec and the cast session engine: the error
//! type, wire (un)marshalling traits, NTP time conversion and demux helpers.

#[cfg(feature = "marshal")]
pub mod marshal;

pub mod error;
pub mod time;
pub mod util;
