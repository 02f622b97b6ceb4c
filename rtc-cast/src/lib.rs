#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Sans-IO RTCP session engine for cast streaming.
//!
//! - [`Rtcp`]: schedules and builds compound reports, ingests incoming
//!   RTCP and dispatches cast feedback.
//! - [`RttEstimator`]: round trip time from LSR/DLSR and DLRR echoes.
//! - [`LipSyncTracker`]: maps a sender's RTP timestamps onto the local clock.
//!
//! # Example
//!
//! ```ignore
//! use rtc_cast::{RtcpBuilder, SystemClock};
//!
//! let mut rtcp = RtcpBuilder::new(local_ssrc, "receiver@example.com")
//!     .with_remote_ssrc(sender_ssrc)
//!     .build(SystemClock, transport, feedback);
//!
//! if Instant::now() >= rtcp.time_to_send_next_rtcp_report() {
//!     rtcp.send_rtcp_report(sender_ssrc)?;
//! }
//! ```

pub mod clock;
pub mod config;
pub mod handler;
pub mod lip_sync;
pub mod rtcp;
pub mod rtt;

pub use clock::{Clock, SystemClock};
pub use config::{RtcpBuilder, RtcpMode};
pub use handler::{
    ReceiverStatistics, ReceptionStatistics, RtcpFeedback, RtcpTransport, SenderInfo,
    SenderStatistics,
};
pub use lip_sync::{LipSyncSample, LipSyncTracker};
pub use crate::rtcp::{Rtcp, ScheduleState};
pub use rtt::{RttEstimator, RttStatistics};
pub use ::rtcp::cast_feedback::CastMessage;
