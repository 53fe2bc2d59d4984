/// Milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Seconds elapsed since `earlier` (unix millis); zero if the clock went backwards.
pub fn age_secs(earlier: u64) -> u64 {
    unix_millis().saturating_sub(earlier) / 1000
}
