use log::{debug, warn};
use shared::error::{Error, Result};
use shared::time::compact_to_duration;
use std::time::Duration;

/// Round trip time statistics for one remote source.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RttStatistics {
    /// Most recent sample.
    pub last: Duration,
    /// Cumulative mean over every sample seen.
    pub avg: Duration,
    pub min: Duration,
    pub max: Duration,
}

/// Computes round trip time from the echo carried in reception reports
/// (LSR/DLSR) or DLRR sub-blocks.
#[derive(Debug, Default, Clone)]
pub struct RttEstimator {
    stats: Option<RttStatistics>,
    samples: u64,
}

impl RttEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one echo into the estimator.
    ///
    /// `send_ntp_mid32` is the echoed middle 32 bits of our own report's NTP
    /// time, `delay_since_last_report` is the time the peer held it (1/65536 s)
    /// and `now_mid32` is the arrival time in the same units. All three wrap,
    /// so the difference is taken modulo 2^32.
    pub fn on_report_and_reply(
        &mut self,
        send_ntp_mid32: u32,
        delay_since_last_report: u32,
        now_mid32: u32,
    ) -> Result<RttStatistics> {
        if send_ntp_mid32 == 0 {
            // peer has not seen a report from us yet
            return Err(Error::NoSampleAvailable);
        }

        let rtt_units = now_mid32
            .wrapping_sub(send_ntp_mid32)
            .wrapping_sub(delay_since_last_report);
        if (rtt_units as i32) < 0 {
            warn!(
                "negative rtt: now={now_mid32:#x} lsr={send_ntp_mid32:#x} dlsr={delay_since_last_report:#x}"
            );
            return Err(Error::NoSampleAvailable);
        }

        let rtt = compact_to_duration(rtt_units);
        let stats = match self.stats {
            None => RttStatistics {
                last: rtt,
                avg: rtt,
                min: rtt,
                max: rtt,
            },
            Some(prev) => RttStatistics {
                last: rtt,
                avg: cumulative_mean(prev.avg, self.samples, rtt),
                min: prev.min.min(rtt),
                max: prev.max.max(rtt),
            },
        };

        self.stats = Some(stats);
        self.samples = self.samples.saturating_add(1);
        debug!("rtt sample {:?}, avg {:?}", stats.last, stats.avg);

        Ok(stats)
    }

    pub fn rtt(&self) -> Result<RttStatistics> {
        self.stats.ok_or(Error::NoSampleAvailable)
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

/// Mean of `samples` values averaging `avg`, plus `next`.
fn cumulative_mean(avg: Duration, samples: u64, next: Duration) -> Duration {
    let samples = samples as u128;
    let nanos = (avg.as_nanos() * samples + next.as_nanos()) / (samples + 1);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
