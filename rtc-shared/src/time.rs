use std::cmp::Ordering;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Offset in seconds between the NTP epoch (1900) and the unix epoch (1970).
pub const NTP_UNIX_OFFSET_SECS: u64 = 0x83AA7E80;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// 64-bit NTP timestamp split into its 32.32 fixed point halves.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NtpTime {
    pub seconds: u32,
    pub fraction: u32,
}

impl NtpTime {
    pub fn new(seconds: u32, fraction: u32) -> Self {
        Self { seconds, fraction }
    }

    pub fn as_u64(&self) -> u64 {
        ((self.seconds as u64) << 32) | self.fraction as u64
    }

    /// Middle 32 bits of the timestamp (16.16 fixed point), as carried by
    /// the LSR, DLSR and LRR fields of RTCP reports.
    pub fn compact(&self) -> u32 {
        ntp_to_compact(self.as_u64())
    }

    /// Elapsed time from `earlier` to `self`, zero if `earlier` is later.
    pub fn duration_since(&self, earlier: NtpTime) -> Duration {
        if *self <= earlier {
            return Duration::ZERO;
        }
        SystemInstant::ntp2unix(self.as_u64()) - SystemInstant::ntp2unix(earlier.as_u64())
    }
}

impl From<u64> for NtpTime {
    fn from(ntp: u64) -> Self {
        Self {
            seconds: (ntp >> 32) as u32,
            fraction: (ntp & 0xFFFF_FFFF) as u32,
        }
    }
}

impl From<NtpTime> for u64 {
    fn from(ntp: NtpTime) -> Self {
        ntp.as_u64()
    }
}

/// Anchors the monotonic clock to the wall clock so that `Instant`s can be
/// expressed as NTP timestamps and back.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemInstant {
    instant: Instant,
    duration_since_unix_epoch: Duration,
}

impl SystemInstant {
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            duration_since_unix_epoch: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_else(|_| Duration::from_secs(0)),
        }
    }

    /// Anchor `instant` at an explicit wall clock position.
    pub fn new(instant: Instant, duration_since_unix_epoch: Duration) -> Self {
        Self {
            instant,
            duration_since_unix_epoch,
        }
    }

    /// Monotonic instant matching `duration_since_unix_epoch` on the wall clock.
    pub fn instant(&self, duration_since_unix_epoch: Duration) -> Instant {
        if duration_since_unix_epoch >= self.duration_since_unix_epoch {
            self.instant + (duration_since_unix_epoch - self.duration_since_unix_epoch)
        } else {
            let behind = self.duration_since_unix_epoch - duration_since_unix_epoch;
            self.instant.checked_sub(behind).unwrap_or(self.instant)
        }
    }

    pub fn duration_since_unix_epoch(&self) -> Duration {
        self.duration_since_unix_epoch
    }

    /// Wall clock position of `now`, as a duration since the unix epoch.
    pub fn unix(&self, now: Instant) -> Duration {
        if now >= self.instant {
            self.duration_since_unix_epoch + now.duration_since(self.instant)
        } else {
            self.duration_since_unix_epoch
                .saturating_sub(self.instant.duration_since(now))
        }
    }

    pub fn ntp(&self, now: Instant) -> u64 {
        SystemInstant::unix2ntp(self.unix(now))
    }

    pub fn ntp_time(&self, now: Instant) -> NtpTime {
        NtpTime::from(self.ntp(now))
    }

    /// Inverse of [`SystemInstant::ntp_time`].
    pub fn instant_from_ntp(&self, ntp: NtpTime) -> Instant {
        self.instant(SystemInstant::ntp2unix(ntp.as_u64()))
    }

    pub fn unix2ntp(duration_since_unix_epoch: Duration) -> u64 {
        let s = duration_since_unix_epoch.as_secs() + NTP_UNIX_OFFSET_SECS;
        let f = ((duration_since_unix_epoch.subsec_nanos() as u64) << 32) / NANOS_PER_SEC;

        (s << 32) | f
    }

    pub fn ntp2unix(ntp: u64) -> Duration {
        let s = (ntp >> 32).saturating_sub(NTP_UNIX_OFFSET_SECS);
        let f = ntp & 0xFFFF_FFFF;
        // round to nearest so that unix2ntp -> ntp2unix is lossless
        let nanos = (f * NANOS_PER_SEC + (1 << 31)) >> 32;

        Duration::new(s, 0) + Duration::from_nanos(nanos)
    }
}

/// Middle 32 bits of a 64-bit NTP timestamp.
pub fn ntp_to_compact(ntp: u64) -> u32 {
    ((ntp >> 16) & 0xFFFF_FFFF) as u32
}

/// Converts a 16.16 compact NTP value (units of 1/65536 s) into a duration.
pub fn compact_to_duration(compact: u32) -> Duration {
    Duration::from_nanos(((compact as u64) * NANOS_PER_SEC) >> 16)
}

/// Converts a duration into 16.16 compact NTP units, saturating at `u32::MAX`.
pub fn duration_to_compact(d: Duration) -> u32 {
    let units = (d.as_nanos() << 16) / NANOS_PER_SEC as u128;
    u32::try_from(units).unwrap_or(u32::MAX)
}

/// Detects a wrap of a 32-bit wire timestamp between `old_timestamp` and
/// `new_timestamp`.
///
/// Returns `1` when `new_timestamp` is numerically smaller but lies after
/// `old_timestamp` (forward wrap), `-1` when it is numerically larger but
/// lies before it (backward wrap) and `0` otherwise.
pub fn compare_wrap_around(new_timestamp: u32, old_timestamp: u32) -> i32 {
    match new_timestamp.cmp(&old_timestamp) {
        Ordering::Less if (new_timestamp.wrapping_sub(old_timestamp) as i32) > 0 => 1,
        Ordering::Greater if (old_timestamp.wrapping_sub(new_timestamp) as i32) > 0 => -1,
        _ => 0,
    }
}

/// Signed distance from `old_timestamp` to `new_timestamp`, unwrapping a
/// single wrap of the 32-bit space in either direction.
pub fn wrap_aware_delta(new_timestamp: u32, old_timestamp: u32) -> i64 {
    let mut new_ts = new_timestamp as i64;
    let mut old_ts = old_timestamp as i64;
    match compare_wrap_around(new_timestamp, old_timestamp) {
        1 => new_ts += 1 << 32,
        -1 => old_ts += 1 << 32,
        _ => {}
    }
    new_ts - old_ts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECONDS_BETWEEN_1900_AND_2010: u32 = 40176 * 24 * 60 * 60;
    const SECONDS_BETWEEN_1900_AND_2030: u32 = 47481 * 24 * 60 * 60;

    #[test]
    fn test_ntp_absolute_value() {
        let baseline = SystemInstant::now();
        let ntp = baseline.ntp_time(Instant::now());

        assert!(ntp.seconds > SECONDS_BETWEEN_1900_AND_2010);
        assert!(ntp.seconds < SECONDS_BETWEEN_1900_AND_2030);
    }

    #[test]
    fn test_ntp_round_trip() {
        let baseline = SystemInstant::now();
        let start = Instant::now();

        for offset_ns in [0u64, 1, 7, 999, 123_456_789, 1_100_000_000, 86_400_000_000_017] {
            let t = start + Duration::from_nanos(offset_ns);
            let ntp = baseline.ntp_time(t);
            assert_eq!(baseline.instant_from_ntp(ntp), t, "offset {offset_ns}ns");
        }
    }

    #[test]
    fn test_ntp_round_trip_before_baseline() {
        let now = Instant::now();
        let baseline = SystemInstant::new(now + Duration::from_secs(10), Duration::from_secs(1_700_000_000));

        let ntp = baseline.ntp_time(now);
        assert_eq!(baseline.instant_from_ntp(ntp), now);
        assert_eq!(
            baseline.ntp_time(now + Duration::from_secs(10)).duration_since(ntp),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_ntp_delta() {
        let start = Instant::now();
        let baseline = SystemInstant::new(start, Duration::from_secs(1_600_000_000));
        let delta = Duration::from_millis(1100);

        let ntp_1 = baseline.ntp_time(start);
        let ntp_2 = baseline.ntp_time(start + delta);

        assert_eq!(baseline.instant_from_ntp(ntp_2) - baseline.instant_from_ntp(ntp_1), delta);
        assert_eq!(ntp_2.seconds - ntp_1.seconds, 1);
        let fraction_delta = ntp_2.fraction.wrapping_sub(ntp_1.fraction);
        assert!(fraction_delta.abs_diff(0xFFFF_FFFF / 10) <= 1);
        assert_eq!(ntp_2.duration_since(ntp_1), delta);
    }

    #[test]
    fn test_ntp_delta_linearity() {
        let baseline = SystemInstant::now();
        let t = Instant::now();

        for d in [
            Duration::from_micros(1),
            Duration::from_millis(123),
            Duration::from_secs(3600),
        ] {
            let delta = baseline.ntp_time(t + d).duration_since(baseline.ntp_time(t));
            let diff = if delta > d { delta - d } else { d - delta };
            assert!(diff < Duration::from_micros(1), "{d:?} -> {delta:?}");
        }
    }

    #[test]
    fn test_unix2ntp_ntp2unix() {
        let unix = Duration::new(1_700_000_000, 500_000_000);
        let ntp = SystemInstant::unix2ntp(unix);
        assert_eq!(ntp >> 32, 1_700_000_000 + NTP_UNIX_OFFSET_SECS);
        assert_eq!(ntp & 0xFFFF_FFFF, 0x8000_0000);
        assert_eq!(SystemInstant::ntp2unix(ntp), unix);
    }

    #[test]
    fn test_ntp_time_u64_conversion() {
        let ntp = NtpTime::new(0xda8bd1fc, 0xdddda05a);
        assert_eq!(ntp.as_u64(), 0xda8bd1fcdddda05a);
        assert_eq!(NtpTime::from(0xda8bd1fcdddda05a), ntp);
        assert_eq!(ntp.compact(), 0xd1fcdddd);
    }

    #[test]
    fn test_compact_conversion() {
        assert_eq!(compact_to_duration(0x0001_0000), Duration::from_secs(1));
        assert_eq!(compact_to_duration(0x0000_8000), Duration::from_millis(500));
        assert_eq!(duration_to_compact(Duration::from_secs(1)), 0x0001_0000);
        assert_eq!(duration_to_compact(Duration::from_secs(u64::MAX / 2)), u32::MAX);
    }

    #[test]
    fn test_compare_wrap_around() {
        assert_eq!(compare_wrap_around(0, 0), 0);
        assert_eq!(compare_wrap_around(1234567890, 1234567000), 0);
        assert_eq!(compare_wrap_around(1234567000, 1234567890), 0);
        assert_eq!(compare_wrap_around(123, 4234567890), 1);
        assert_eq!(compare_wrap_around(4234567890, 123), -1);
        assert_eq!(compare_wrap_around(123, 4294567890), 1);
        assert_eq!(compare_wrap_around(4294567890, 123), -1);
    }

    #[test]
    fn test_wrap_aware_delta() {
        assert_eq!(wrap_aware_delta(128000, 64000), 64000);
        assert_eq!(wrap_aware_delta(32000, 64000), -32000);
        assert_eq!(wrap_aware_delta(4294903296, 64000), -128000);
        assert_eq!(wrap_aware_delta(64000, 4294903296), 128000);
        assert_eq!(wrap_aware_delta(7, 7), 0);
    }
}
