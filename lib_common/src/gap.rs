//! Gap labels shared by the sources and the transformer.

/// Seconds between consecutive positions when no real interval is known.
pub const GAP_STEP_SECS: f64 = 1.234;

/// Placeholder gap for `position`: `LEAD` for P1, else `+x.xxx`.
pub fn synthetic_gap(position: i64) -> String {
    if position <= 1 {
        "LEAD".to_string()
    } else {
        format!("+{:.3}", (position - 1) as f64 * GAP_STEP_SECS)
    }
}
