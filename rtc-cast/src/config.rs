use crate::clock::Clock;
use crate::handler::{ReceiverStatistics, RtcpFeedback, RtcpTransport, SenderStatistics};
use crate::rtcp::Rtcp;
use shared::time::SystemInstant;
use std::time::Duration;

/// Which optional blocks go into an outgoing report. Incoming packets are
/// accepted in either form.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum RtcpMode {
    /// Every report carries an SDES block with the CNAME.
    #[default]
    Compound,
    /// Reports leave out the SDES block.
    ReducedSize,
}

/// Session parameters fixed at construction.
#[derive(Debug, Clone)]
pub(crate) struct RtcpConfig {
    pub(crate) local_ssrc: u32,
    pub(crate) cname: String,
    pub(crate) interval: Duration,
    pub(crate) mode: RtcpMode,
    pub(crate) sending_media: bool,
    pub(crate) remote_ssrc: Option<u32>,
    pub(crate) baseline: Option<SystemInstant>,
}

/// Builder for the [`Rtcp`] engine.
///
/// # Example
///
/// ```ignore
/// use rtc_cast::{RtcpBuilder, RtcpMode, SystemClock};
/// use std::time::Duration;
///
/// let rtcp = RtcpBuilder::new(0x10203, "sender@example.com")
///     .with_interval(Duration::from_millis(500))
///     .with_mode(RtcpMode::ReducedSize)
///     .with_sending_media(true)
///     .build(SystemClock, transport, feedback);
/// ```
pub struct RtcpBuilder {
    config: RtcpConfig,
    sender_statistics: Option<Box<dyn SenderStatistics>>,
    receiver_statistics: Option<Box<dyn ReceiverStatistics>>,
}

impl RtcpBuilder {
    /// Create a new builder with default settings.
    ///
    /// Default interval is 1 second, mode is [`RtcpMode::Compound`] and the
    /// engine acts as a media receiver.
    pub fn new(local_ssrc: u32, cname: impl Into<String>) -> Self {
        Self {
            config: RtcpConfig {
                local_ssrc,
                cname: cname.into(),
                interval: Duration::from_secs(1),
                mode: RtcpMode::Compound,
                sending_media: false,
                remote_ssrc: None,
                baseline: None,
            },
            sender_statistics: None,
            receiver_statistics: None,
        }
    }

    /// Set the nominal interval between reports.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn with_mode(mut self, mode: RtcpMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// A sending engine emits sender reports, a receiving one emits receiver
    /// reports plus a reference time block for its round trip measurement.
    pub fn with_sending_media(mut self, sending_media: bool) -> Self {
        self.config.sending_media = sending_media;
        self
    }

    /// Set the remote SSRC up front instead of learning it from the first report.
    pub fn with_remote_ssrc(mut self, remote_ssrc: u32) -> Self {
        self.config.remote_ssrc = Some(remote_ssrc);
        self
    }

    /// Anchor used to express clock instants as NTP time. By default the
    /// engine pairs `clock.now()` with the wall clock at construction.
    pub fn with_baseline(mut self, baseline: SystemInstant) -> Self {
        self.config.baseline = Some(baseline);
        self
    }

    pub fn with_sender_statistics(mut self, statistics: Box<dyn SenderStatistics>) -> Self {
        self.sender_statistics = Some(statistics);
        self
    }

    pub fn with_receiver_statistics(mut self, statistics: Box<dyn ReceiverStatistics>) -> Self {
        self.receiver_statistics = Some(statistics);
        self
    }

    /// Create the engine. The first report is scheduled relative to
    /// `clock.now()`.
    pub fn build<C, T, F>(self, clock: C, transport: T, feedback: F) -> Rtcp<C, T, F>
    where
        C: Clock,
        T: RtcpTransport,
        F: RtcpFeedback,
    {
        Rtcp::new(
            self.config,
            clock,
            transport,
            feedback,
            self.sender_statistics,
            self.receiver_statistics,
        )
    }
}
