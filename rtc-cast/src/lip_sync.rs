use shared::error::{Error, Result};
use shared::time::{NtpTime, SystemInstant, wrap_aware_delta};
use std::time::{Duration, Instant};

/// RTP/NTP timestamp pair taken from a sender report.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LipSyncSample {
    pub rtp_timestamp: u32,
    pub ntp_seconds: u32,
    pub ntp_fraction: u32,
}

/// Maps a sender's RTP timestamps onto the local clock using the latest
/// RTP/NTP pair it reported.
#[derive(Debug, Clone)]
pub struct LipSyncTracker {
    baseline: SystemInstant,
    sample: Option<LipSyncSample>,
}

impl LipSyncTracker {
    pub fn new(baseline: SystemInstant) -> Self {
        Self {
            baseline,
            sample: None,
        }
    }

    pub fn on_received_lip_sync_info(
        &mut self,
        rtp_timestamp: u32,
        ntp_seconds: u32,
        ntp_fraction: u32,
    ) {
        self.sample = Some(LipSyncSample {
            rtp_timestamp,
            ntp_seconds,
            ntp_fraction,
        });
    }

    pub fn sample(&self) -> Option<LipSyncSample> {
        self.sample
    }

    /// Local instant at which the sender captured `rtp_timestamp`, given the
    /// stream's RTP clock rate.
    pub fn rtp_timestamp_in_sender_time(
        &self,
        frequency_hz: u32,
        rtp_timestamp: u32,
    ) -> Result<Instant> {
        let sample = self.sample.ok_or(Error::NoSampleAvailable)?;
        if frequency_hz == 0 {
            return Err(Error::InvalidFrequency);
        }

        let reference = self
            .baseline
            .instant_from_ntp(NtpTime::new(sample.ntp_seconds, sample.ntp_fraction));

        let ticks = wrap_aware_delta(rtp_timestamp, sample.rtp_timestamp);
        let nanos = (ticks.unsigned_abs() as u128 * 1_000_000_000) / frequency_hz as u128;
        let offset = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX));

        if ticks >= 0 {
            reference
                .checked_add(offset)
                .ok_or_else(|| Error::Other(format!("rtp timestamp {rtp_timestamp} out of range")))
        } else {
            reference
                .checked_sub(offset)
                .ok_or_else(|| Error::Other(format!("rtp timestamp {rtp_timestamp} out of range")))
        }
    }
}
