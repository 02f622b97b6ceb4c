use crate::clock::Clock;
use crate::config::{RtcpConfig, RtcpMode};
use crate::handler::{
    ReceiverStatistics, ReceptionStatistics, RtcpFeedback, RtcpTransport, SenderInfo,
    SenderStatistics,
};
use crate::lip_sync::LipSyncTracker;
use crate::rtt::{RttEstimator, RttStatistics};
use bytes::Bytes;
use log::{debug, trace, warn};
use rand::Rng;
use rtcp::cast_feedback::{CastFeedback, CastMessage};
use rtcp::compound_packet;
use rtcp::extended_report::{DlrrReport, ExtendedReport, ReportBlock};
use rtcp::packet::Packet;
use rtcp::receiver_report::ReceiverReport;
use rtcp::reception_report::ReceptionReport;
use rtcp::sender_report::SenderReport;
use rtcp::source_description::SourceDescription;
use shared::error::{Error, Result};
use shared::time::{NtpTime, SystemInstant, duration_to_compact, ntp_to_compact};
use shared::util::match_rtcp;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Everything the engine knows about one remote source.
struct RemoteState {
    rtt: RttEstimator,
    lip_sync: LipSyncTracker,

    /// Middle 32 bits of the last sender report's NTP time and when it arrived.
    last_sr: u32,
    last_sr_time: Option<Instant>,

    /// Middle 32 bits of the last receiver reference time and when it arrived.
    last_rrtr: u32,
    last_rrtr_time: Option<Instant>,
}

impl RemoteState {
    fn new(baseline: SystemInstant) -> Self {
        Self {
            rtt: RttEstimator::new(),
            lip_sync: LipSyncTracker::new(baseline),
            last_sr: 0,
            last_sr_time: None,
            last_rrtr: 0,
            last_rrtr_time: None,
        }
    }
}

/// Where the engine is in its report cycle.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ScheduleState {
    /// No report scheduled yet.
    #[default]
    Idle,
    /// A report is due at [`Rtcp::time_to_send_next_rtcp_report`].
    Scheduled,
    /// The due report is being handed to the transport.
    Sent,
}

/// Sans-IO RTCP session engine.
///
/// The engine never arms a timer: the caller polls
/// [`Rtcp::time_to_send_next_rtcp_report`] and calls
/// [`Rtcp::send_rtcp_report`] once that instant has passed. Incoming
/// datagrams are handed to [`Rtcp::incoming_rtcp_packet`].
pub struct Rtcp<C, T, F> {
    clock: C,
    transport: T,
    feedback: F,
    sender_statistics: Option<Box<dyn SenderStatistics>>,
    receiver_statistics: Option<Box<dyn ReceiverStatistics>>,

    config: RtcpConfig,
    remote_ssrc: Option<u32>,
    baseline: SystemInstant,

    state: ScheduleState,
    next_time_to_send: Instant,
    last_report_time: Option<Instant>,
    pending_cast: Option<CastMessage>,

    remotes: HashMap<u32, RemoteState>,
}

impl<C, T, F> Rtcp<C, T, F>
where
    C: Clock,
    T: RtcpTransport,
    F: RtcpFeedback,
{
    pub(crate) fn new(
        config: RtcpConfig,
        clock: C,
        transport: T,
        feedback: F,
        sender_statistics: Option<Box<dyn SenderStatistics>>,
        receiver_statistics: Option<Box<dyn ReceiverStatistics>>,
    ) -> Self {
        let now = clock.now();
        let remote_ssrc = config.remote_ssrc;
        let baseline = config.baseline.unwrap_or_else(|| {
            SystemInstant::new(now, SystemInstant::now().duration_since_unix_epoch())
        });
        let mut rtcp = Self {
            clock,
            transport,
            feedback,
            sender_statistics,
            receiver_statistics,

            config,
            remote_ssrc,
            baseline,

            state: ScheduleState::Idle,
            next_time_to_send: now,
            last_report_time: None,
            pending_cast: None,

            remotes: HashMap::new(),
        };
        rtcp.schedule_next_rtcp_report(now);
        rtcp
    }

    pub fn local_ssrc(&self) -> u32 {
        self.config.local_ssrc
    }

    pub fn remote_ssrc(&self) -> Option<u32> {
        self.remote_ssrc
    }

    pub fn mode(&self) -> RtcpMode {
        self.config.mode
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn schedule_state(&self) -> ScheduleState {
        self.state
    }

    /// When the next report is due. Does not change the schedule.
    pub fn time_to_send_next_rtcp_report(&self) -> Instant {
        self.next_time_to_send
    }

    /// When the last report was handed to the transport successfully.
    pub fn last_report_time(&self) -> Option<Instant> {
        self.last_report_time
    }

    pub fn set_remote_ssrc(&mut self, ssrc: u32) {
        self.remote_ssrc = Some(ssrc);
    }

    /// Forget everything learned about `ssrc`.
    pub fn reset_remote_ssrc(&mut self, ssrc: u32) {
        self.remotes.remove(&ssrc);
        if self.remote_ssrc == Some(ssrc) {
            self.remote_ssrc = None;
        }
    }

    /// Queue cast feedback for the next report. A message that has not been
    /// sent yet is replaced.
    pub fn send_rtcp_cast(&mut self, message: CastMessage) {
        if self.pending_cast.is_some() {
            debug!("ssrc {:x}: replacing queued cast feedback", self.config.local_ssrc);
        }
        self.pending_cast = Some(message);
    }

    /// Build a compound report and hand it to the transport.
    ///
    /// The next report is scheduled whether or not the send succeeds, so a
    /// failed send does not make the caller retry in a tight loop. Queued
    /// cast feedback is only dropped once the transport accepted the packet.
    pub fn send_rtcp_report(&mut self, media_ssrc: u32) -> Result<()> {
        let now = self.clock.now();
        self.state = ScheduleState::Sent;

        let packets = self.build_report(now, media_ssrc);
        let sent = self.transmit(&packets);
        self.schedule_next_rtcp_report(now);
        sent?;

        self.pending_cast = None;
        self.last_report_time = Some(now);
        Ok(())
    }

    fn transmit(&mut self, packets: &[Box<dyn Packet>]) -> Result<()> {
        let raw = compound_packet::marshal(packets)?;
        trace!(
            "ssrc {:x}: sending {} rtcp blocks, {} bytes",
            self.config.local_ssrc,
            packets.len(),
            raw.len()
        );

        self.transport.send_rtcp_packet(raw).map_err(|err| {
            warn!("ssrc {:x}: failed to send rtcp report: {err}", self.config.local_ssrc);
            match err {
                Error::TransportSendFailed(_) => err,
                other => Error::TransportSendFailed(other.to_string()),
            }
        })
    }

    /// Handle one datagram received on the RTCP channel.
    ///
    /// Non-RTCP data is ignored and malformed blocks are dropped inside the
    /// decoder, so this never fails.
    pub fn incoming_rtcp_packet(&mut self, data: &[u8]) {
        if !match_rtcp(data) {
            trace!("ssrc {:x}: ignoring non-rtcp datagram", self.config.local_ssrc);
            return;
        }

        let now = self.clock.now();
        let packets = compound_packet::unmarshal(&Bytes::copy_from_slice(data));
        for packet in &packets {
            let any = packet.as_any();
            if let Some(sr) = any.downcast_ref::<SenderReport>() {
                self.handle_sender_report(now, sr);
            } else if let Some(rr) = any.downcast_ref::<ReceiverReport>() {
                self.handle_receiver_report(now, rr);
            } else if let Some(xr) = any.downcast_ref::<ExtendedReport>() {
                self.handle_extended_report(now, xr);
            } else if let Some(fb) = any.downcast_ref::<CastFeedback>() {
                self.handle_cast_feedback(fb);
            } else if let Some(sdes) = any.downcast_ref::<SourceDescription>() {
                for chunk in &sdes.chunks {
                    if let Some(cname) = sdes.cname(chunk.source) {
                        trace!("ssrc {:x}: cname {:?}", chunk.source, cname);
                    }
                }
            }
        }
    }

    /// RTT statistics for the current remote SSRC.
    pub fn rtt(&self) -> Result<RttStatistics> {
        let ssrc = self.remote_ssrc.ok_or(Error::NoSampleAvailable)?;
        self.rtt_for(ssrc)
    }

    pub fn rtt_for(&self, ssrc: u32) -> Result<RttStatistics> {
        self.remotes
            .get(&ssrc)
            .ok_or(Error::NoSampleAvailable)?
            .rtt
            .rtt()
    }

    /// Local instant at which the remote sender captured `rtp_timestamp`.
    pub fn rtp_timestamp_in_sender_time(
        &self,
        frequency_hz: u32,
        rtp_timestamp: u32,
    ) -> Result<Instant> {
        let ssrc = self.remote_ssrc.ok_or(Error::NoSampleAvailable)?;
        self.remotes
            .get(&ssrc)
            .ok_or(Error::NoSampleAvailable)?
            .lip_sync
            .rtp_timestamp_in_sender_time(frequency_hz, rtp_timestamp)
    }

    pub fn on_received_lip_sync_info(
        &mut self,
        ssrc: u32,
        rtp_timestamp: u32,
        ntp_seconds: u32,
        ntp_fraction: u32,
    ) {
        debug!("ssrc {ssrc:x}: lip sync rtp={rtp_timestamp} ntp={ntp_seconds}.{ntp_fraction:08x}");
        self.remote_state(ssrc)
            .lip_sync
            .on_received_lip_sync_info(rtp_timestamp, ntp_seconds, ntp_fraction);
    }

    fn schedule_next_rtcp_report(&mut self, now: Instant) {
        let max_jitter = u64::try_from(self.config.interval.as_nanos() / 2).unwrap_or(u64::MAX);
        let jitter = Duration::from_nanos(rand::rng().random_range(0..=max_jitter));
        self.next_time_to_send = now + self.config.interval + jitter;
        debug!(
            "ssrc {:x}: {:?} -> Scheduled, next rtcp report in {:?}",
            self.config.local_ssrc,
            self.state,
            self.next_time_to_send - now
        );
        self.state = ScheduleState::Scheduled;
    }

    fn remote_state(&mut self, ssrc: u32) -> &mut RemoteState {
        let baseline = self.baseline;
        self.remotes
            .entry(ssrc)
            .or_insert_with(|| RemoteState::new(baseline))
    }

    fn now_compact(&self, now: Instant) -> u32 {
        ntp_to_compact(self.baseline.ntp(now))
    }

    /// Whether a block sent by `ssrc` concerns this session. The first
    /// foreign SSRC is adopted as remote when none is configured.
    fn accept_from(&mut self, ssrc: u32) -> bool {
        if ssrc == self.config.local_ssrc {
            trace!("ssrc {ssrc:x}: ignoring own rtcp block");
            return false;
        }
        match self.remote_ssrc {
            Some(remote) if remote != ssrc => {
                trace!("ssrc {:x}: ignoring rtcp block from {ssrc:x}", self.config.local_ssrc);
                false
            }
            Some(_) => true,
            None => {
                debug!("ssrc {:x}: learned remote ssrc {ssrc:x}", self.config.local_ssrc);
                self.remote_ssrc = Some(ssrc);
                true
            }
        }
    }

    fn handle_sender_report(&mut self, now: Instant, sr: &SenderReport) {
        if !self.accept_from(sr.ssrc) {
            return;
        }

        let ntp = NtpTime::from(sr.ntp_time);
        let state = self.remote_state(sr.ssrc);
        state.last_sr = ntp.compact();
        state.last_sr_time = Some(now);

        // only the receiving side maps the sender's media timestamps
        if !self.config.sending_media {
            self.on_received_lip_sync_info(sr.ssrc, sr.rtp_time, ntp.seconds, ntp.fraction);
        }
        self.handle_reception_reports(now, sr.ssrc, &sr.reports);
    }

    fn handle_receiver_report(&mut self, now: Instant, rr: &ReceiverReport) {
        if !self.accept_from(rr.ssrc) {
            return;
        }
        self.handle_reception_reports(now, rr.ssrc, &rr.reports);
    }

    fn handle_reception_reports(&mut self, now: Instant, from: u32, reports: &[ReceptionReport]) {
        let local_ssrc = self.config.local_ssrc;
        let now_compact = self.now_compact(now);
        for report in reports.iter().filter(|r| r.ssrc == local_ssrc) {
            let state = self.remote_state(from);
            match state
                .rtt
                .on_report_and_reply(report.last_sender_report, report.delay, now_compact)
            {
                Ok(stats) => debug!("ssrc {from:x}: rtt {:?}", stats.last),
                Err(err) => debug!("ssrc {from:x}: no rtt from reception report: {err}"),
            }
        }
    }

    fn handle_extended_report(&mut self, now: Instant, xr: &ExtendedReport) {
        if !self.accept_from(xr.sender_ssrc) {
            return;
        }

        let local_ssrc = self.config.local_ssrc;
        let now_compact = self.now_compact(now);
        let state = self.remote_state(xr.sender_ssrc);

        if let Some(ntp) = xr.receiver_reference_time() {
            state.last_rrtr = ntp_to_compact(ntp);
            state.last_rrtr_time = Some(now);
        }

        if let Some(dlrr) = xr.dlrr_for(local_ssrc) {
            match state
                .rtt
                .on_report_and_reply(dlrr.last_rr, dlrr.dlrr, now_compact)
            {
                Ok(stats) => debug!("ssrc {:x}: rtt {:?}", xr.sender_ssrc, stats.last),
                Err(err) => debug!("ssrc {:x}: no rtt from dlrr: {err}", xr.sender_ssrc),
            }
        }
    }

    fn handle_cast_feedback(&mut self, fb: &CastFeedback) {
        if !self.accept_from(fb.sender_ssrc) {
            return;
        }
        if fb.message.media_ssrc != self.config.local_ssrc {
            trace!(
                "ssrc {:x}: cast feedback for {:x} ignored",
                self.config.local_ssrc, fb.message.media_ssrc
            );
            return;
        }
        self.feedback.on_received_cast_feedback(&fb.message);
    }

    /// Reception report about `ssrc`, echoing its last sender report.
    fn reception_report(&self, now: Instant, ssrc: u32) -> ReceptionReport {
        let stats = self
            .receiver_statistics
            .as_ref()
            .map(|s| s.reception_statistics())
            .unwrap_or_else(ReceptionStatistics::default);

        let (last_sender_report, delay) = match self.remotes.get(&ssrc) {
            Some(RemoteState {
                last_sr,
                last_sr_time: Some(at),
                ..
            }) => (*last_sr, duration_to_compact(now.duration_since(*at))),
            _ => (0, 0),
        };

        ReceptionReport {
            ssrc,
            fraction_lost: stats.fraction_lost,
            total_lost: stats.cumulative_lost.min((1 << 24) - 1),
            last_sequence_number: stats.extended_high_sequence_number,
            jitter: stats.jitter,
            last_sender_report,
            delay,
        }
    }

    fn build_report(&self, now: Instant, media_ssrc: u32) -> Vec<Box<dyn Packet>> {
        let local_ssrc = self.config.local_ssrc;
        let ntp = self.baseline.ntp(now);
        let mut packets: Vec<Box<dyn Packet>> = vec![];

        if self.config.sending_media {
            let info = self
                .sender_statistics
                .as_ref()
                .map(|s| s.sender_info(now))
                .unwrap_or_else(SenderInfo::default);

            let reports = self
                .remote_ssrc
                .filter(|ssrc| {
                    self.remotes
                        .get(ssrc)
                        .is_some_and(|s| s.last_sr_time.is_some())
                })
                .map(|ssrc| self.reception_report(now, ssrc))
                .into_iter()
                .collect();

            packets.push(Box::new(SenderReport {
                ssrc: local_ssrc,
                ntp_time: ntp,
                rtp_time: info.rtp_timestamp,
                packet_count: info.packet_count,
                octet_count: info.octet_count,
                reports,
            }));
        } else {
            packets.push(Box::new(ReceiverReport {
                ssrc: local_ssrc,
                reports: vec![self.reception_report(now, media_ssrc)],
            }));
        }

        if self.config.mode == RtcpMode::Compound {
            packets.push(Box::new(SourceDescription::with_cname(
                local_ssrc,
                &self.config.cname,
            )));
        }

        let mut blocks = vec![];
        if !self.config.sending_media {
            blocks.push(ReportBlock::ReceiverReferenceTime(ntp));
        }

        let mut dlrr: Vec<DlrrReport> = self
            .remotes
            .iter()
            .filter_map(|(ssrc, state)| {
                state.last_rrtr_time.map(|at| DlrrReport {
                    ssrc: *ssrc,
                    last_rr: state.last_rrtr,
                    dlrr: duration_to_compact(now.duration_since(at)),
                })
            })
            .collect();
        if !dlrr.is_empty() {
            dlrr.sort_by_key(|d| d.ssrc);
            blocks.push(ReportBlock::Dlrr(dlrr));
        }

        if !blocks.is_empty() {
            packets.push(Box::new(ExtendedReport {
                sender_ssrc: local_ssrc,
                reports: blocks,
            }));
        }

        if let Some(message) = &self.pending_cast {
            packets.push(Box::new(CastFeedback {
                sender_ssrc: local_ssrc,
                message: message.clone(),
            }));
        }

        packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RtcpBuilder;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const LOCAL_SSRC: u32 = 0x10203;
    const REMOTE_SSRC: u32 = 0x40506;

    #[derive(Clone)]
    struct TestClock(Rc<Cell<Instant>>);

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.0.get()
        }
    }

    #[derive(Default, Clone)]
    struct CaptureTransport {
        sent: Rc<RefCell<Vec<Bytes>>>,
        fail: bool,
    }

    impl RtcpTransport for CaptureTransport {
        fn send_rtcp_packet(&mut self, packet: Bytes) -> Result<()> {
            if self.fail {
                return Err(Error::Other("socket closed".to_owned()));
            }
            self.sent.borrow_mut().push(packet);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingFeedback {
        messages: Vec<CastMessage>,
    }

    impl RtcpFeedback for CountingFeedback {
        fn on_received_cast_feedback(&mut self, message: &CastMessage) {
            self.messages.push(message.clone());
        }
    }

    fn engine(
        sending_media: bool,
        fail: bool,
    ) -> Rtcp<TestClock, CaptureTransport, CountingFeedback> {
        let clock = TestClock(Rc::new(Cell::new(Instant::now())));
        RtcpBuilder::new(LOCAL_SSRC, "test@10.1.1.1")
            .with_interval(Duration::from_millis(500))
            .with_sending_media(sending_media)
            .build(
                clock,
                CaptureTransport {
                    fail,
                    ..Default::default()
                },
                CountingFeedback::default(),
            )
    }

    #[test]
    fn test_schedule_is_pure_query() {
        let rtcp = engine(true, false);
        let first = rtcp.time_to_send_next_rtcp_report();
        assert_eq!(first, rtcp.time_to_send_next_rtcp_report());
    }

    #[test]
    fn test_schedule_state_transitions() {
        let mut rtcp = engine(false, false);
        assert_eq!(rtcp.schedule_state(), ScheduleState::Scheduled);

        let due = rtcp.time_to_send_next_rtcp_report();
        rtcp.clock.0.set(due);
        rtcp.send_rtcp_report(REMOTE_SSRC).unwrap();

        assert_eq!(rtcp.schedule_state(), ScheduleState::Scheduled);
        let next = rtcp.time_to_send_next_rtcp_report();
        assert!(next >= due + Duration::from_millis(500));
        assert!(next <= due + Duration::from_millis(750));
        assert_eq!(rtcp.last_report_time(), Some(due));
    }

    #[test]
    fn test_send_failure_keeps_schedule_and_cast() {
        let mut rtcp = engine(false, true);
        let before = rtcp.time_to_send_next_rtcp_report();
        rtcp.clock.0.set(before);

        rtcp.send_rtcp_cast(CastMessage::new(REMOTE_SSRC, 1));
        let err = rtcp.send_rtcp_report(REMOTE_SSRC).unwrap_err();
        assert!(matches!(err, Error::TransportSendFailed(_)));
        assert_eq!(rtcp.schedule_state(), ScheduleState::Scheduled);
        assert!(rtcp.time_to_send_next_rtcp_report() > before);
        assert!(rtcp.pending_cast.is_some());
        assert_eq!(rtcp.last_report_time(), None);
        assert!(rtcp.rtt().is_err());
    }

    #[test]
    fn test_cast_is_sent_once() {
        let mut rtcp = engine(false, false);
        rtcp.send_rtcp_cast(CastMessage::new(REMOTE_SSRC, 1));
        rtcp.send_rtcp_cast(CastMessage::new(REMOTE_SSRC, 2));
        rtcp.send_rtcp_report(REMOTE_SSRC).unwrap();
        rtcp.send_rtcp_report(REMOTE_SSRC).unwrap();

        let sent = rtcp.transport().sent.borrow();
        let first = compound_packet::unmarshal(&sent[0]);
        let casts: Vec<&CastFeedback> = first
            .iter()
            .filter_map(|p| p.as_any().downcast_ref::<CastFeedback>())
            .collect();
        assert_eq!(casts.len(), 1);
        assert_eq!(casts[0].message.ack_frame_id, 2);

        let second = compound_packet::unmarshal(&sent[1]);
        assert!(
            second
                .iter()
                .all(|p| p.as_any().downcast_ref::<CastFeedback>().is_none())
        );
    }

    #[test]
    fn test_own_packets_are_ignored() {
        let mut rtcp = engine(false, false);
        rtcp.send_rtcp_report(REMOTE_SSRC).unwrap();
        let raw = rtcp.transport().sent.borrow()[0].clone();

        rtcp.incoming_rtcp_packet(&raw);
        assert_eq!(rtcp.remote_ssrc(), None);
        assert!(rtcp.remotes.is_empty());
    }

    #[test]
    fn test_remote_ssrc_is_learned_and_filters() {
        let mut rtcp = engine(true, false);
        let rr = |ssrc: u32| {
            compound_packet::marshal(&[Box::new(ReceiverReport {
                ssrc,
                reports: vec![],
            }) as Box<dyn Packet>])
            .unwrap()
        };

        rtcp.incoming_rtcp_packet(&rr(REMOTE_SSRC));
        assert_eq!(rtcp.remote_ssrc(), Some(REMOTE_SSRC));

        rtcp.incoming_rtcp_packet(&rr(0xdead));
        assert_eq!(rtcp.remote_ssrc(), Some(REMOTE_SSRC));
        assert!(!rtcp.remotes.contains_key(&0xdead));
    }

    #[test]
    fn test_only_receiver_tracks_lip_sync() {
        let mut sender = engine(true, false);
        let mut receiver = engine(false, false);
        let ntp = receiver.baseline.ntp(receiver.clock.now());
        let sr = compound_packet::marshal(&[Box::new(SenderReport {
            ssrc: REMOTE_SSRC,
            ntp_time: ntp,
            rtp_time: 90000,
            ..Default::default()
        }) as Box<dyn Packet>])
        .unwrap();

        sender.incoming_rtcp_packet(&sr);
        assert!(sender.remotes[&REMOTE_SSRC].last_sr_time.is_some());
        assert_eq!(
            sender.rtp_timestamp_in_sender_time(90000, 90000).unwrap_err(),
            Error::NoSampleAvailable
        );

        receiver.incoming_rtcp_packet(&sr);
        assert!(receiver.rtp_timestamp_in_sender_time(90000, 90000).is_ok());
    }

    #[test]
    fn test_baseline_anchors_ntp_time() {
        let now = Instant::now();
        let wall = Duration::from_secs(1_700_000_000);
        let mut rtcp = RtcpBuilder::new(LOCAL_SSRC, "test@10.1.1.1")
            .with_baseline(SystemInstant::new(now, wall))
            .build(
                TestClock(Rc::new(Cell::new(now))),
                CaptureTransport::default(),
                CountingFeedback::default(),
            );
        rtcp.send_rtcp_report(REMOTE_SSRC).unwrap();

        let sent = rtcp.transport().sent.borrow();
        let packets = compound_packet::unmarshal(&sent[0]);
        let rrtr = packets
            .iter()
            .filter_map(|p| p.as_any().downcast_ref::<ExtendedReport>())
            .find_map(|xr| xr.receiver_reference_time())
            .unwrap();
        assert_eq!(rrtr, SystemInstant::unix2ntp(wall));
    }

    #[test]
    fn test_reset_remote_ssrc_drops_state() {
        let mut rtcp = engine(false, false);
        rtcp.set_remote_ssrc(REMOTE_SSRC);
        let ntp = rtcp.baseline.ntp_time(rtcp.clock.now());
        rtcp.on_received_lip_sync_info(REMOTE_SSRC, 64000, ntp.seconds, ntp.fraction);
        assert!(rtcp.rtp_timestamp_in_sender_time(32000, 64000).is_ok());

        rtcp.reset_remote_ssrc(REMOTE_SSRC);
        assert_eq!(rtcp.remote_ssrc(), None);
        assert_eq!(
            rtcp.rtp_timestamp_in_sender_time(32000, 64000).unwrap_err(),
            Error::NoSampleAvailable
        );
    }

    #[test]
    fn test_non_rtcp_is_ignored() {
        let mut rtcp = engine(false, false);
        // rtp with payload type 96
        rtcp.incoming_rtcp_packet(&[0x80, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01]);
        rtcp.incoming_rtcp_packet(&[]);
        assert!(rtcp.remotes.is_empty());
    }
}
