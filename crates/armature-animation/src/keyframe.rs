//! Keyframe interval lookup

/// Find the keyframe interval bracketing `time`.
///
/// Returns the largest `i` with `times[i] <= time < times[i + 1]`.
/// Times before the first keyframe clamp to `0`; times at or after the last
/// keyframe clamp to `times.len() - 2`. Fewer than two keyframes have no
/// interval, so the result is `None`.
pub fn find_bracketing_keyframe(times: &[f32], time: f32) -> Option<usize> {
    if times.len() < 2 {
        return None;
    }
    let last_interval = times.len() - 2;

    // First index whose time is strictly greater than `time`
    let upper = times.partition_point(|&t| t <= time);
    Some(match upper {
        0 => 0,
        n if n >= times.len() => last_interval,
        n => n - 1,
    })
}
