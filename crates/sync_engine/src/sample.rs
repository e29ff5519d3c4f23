//! Round-trip probe samples and best-sample selection.

/// One completed probe round-trip
///
/// `t0` client send, `t1` server receive, `t2` client receive (epoch ms).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetSample {
    pub t0: i64,
    pub t1: i64,
    pub t2: i64,
    /// `t2 - t0`, never negative
    pub rtt: i64,
    /// `t1 - (t0 + t2) / 2`
    pub offset: f64,
}

impl OffsetSample {
    /// Build a sample from the three probe timestamps.
    ///
    /// Returns `None` if the local clock went backwards between send and
    /// receive (`t2 < t0`), since the RTT would be meaningless.
    pub fn new(t0: i64, t1: i64, t2: i64) -> Option<Self> {
        let rtt = t2.checked_sub(t0)?;
        if rtt < 0 {
            return None;
        }
        Some(Self {
            t0,
            t1,
            t2,
            rtt,
            offset: estimate_offset(t0, t1, t2),
        })
    }
}

/// Server-minus-local offset under the symmetric-path assumption
#[inline]
pub fn estimate_offset(t0: i64, t1: i64, t2: i64) -> f64 {
    t1 as f64 - (t0 as f64 + t2 as f64) / 2.0
}

/// Pick the minimum-RTT sample; the earliest one wins ties.
pub fn select_best(samples: &[OffsetSample]) -> Option<&OffsetSample> {
    samples.iter().min_by_key(|sample| sample.rtt)
}
