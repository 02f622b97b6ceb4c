#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod cast_feedback;
pub mod compound_packet;
pub mod extended_report;
pub mod header;
pub mod packet;
pub mod receiver_report;
pub mod reception_report;
pub mod sender_report;
pub mod source_description;
