use jiff::Timestamp;

/// Truncates a timestamp to the whole minute (seconds and subseconds zeroed).
///
/// Every timestamp the engine persists goes through this, so two writes
/// within the same minute compare equal and cache keys built from
/// timestamps do not churn on sub-minute jitter.
pub fn minute_floor(ts: Timestamp) -> Timestamp {
    let seconds = ts.as_second();
    let floored = seconds - seconds.rem_euclid(60);
    // A floored valid timestamp is itself valid; fall back to the input
    // rather than panic if it somehow is not.
    Timestamp::from_second(floored).unwrap_or(ts)
}
