//! Pass scheduling for multi-pass captures.
//!
//! Every logical output frame is rendered once per pass, all at the same
//! timeline tick. The captured frame count drives both which pass renders
//! next and when the timeline may advance.

/// Pass that the next captured frame belongs to, or `None` without passes.
pub fn pass_index(captured_frames: u64, pass_count: usize) -> Option<usize> {
    if pass_count == 0 {
        return None;
    }
    Some((captured_frames % pass_count as u64) as usize)
}

/// Milliseconds the timeline should advance before the next render.
///
/// Without passes the timeline always advances `frame_interval_ms`. With
/// passes it advances only when a new cycle starts, so every pass of a cycle
/// sees the same tick.
pub fn hold_millis(captured_frames: u64, pass_count: usize, frame_interval_ms: i32) -> i32 {
    match pass_index(captured_frames, pass_count) {
        None | Some(0) => frame_interval_ms,
        Some(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_index_cycles() {
        let indices: Vec<_> = (0..7).map(|n| pass_index(n, 3)).collect();
        assert_eq!(
            indices,
            vec![Some(0), Some(1), Some(2), Some(0), Some(1), Some(2), Some(0)]
        );
        assert_eq!(pass_index(5, 0), None);
    }

    #[test]
    fn test_hold_advances_once_per_cycle() {
        let holds: Vec<_> = (1..=6).map(|n| hold_millis(n, 3, 33)).collect();
        assert_eq!(holds, vec![0, 0, 33, 0, 0, 33]);
        assert_eq!(hold_millis(0, 3, 33), 33);
    }

    #[test]
    fn test_hold_without_passes() {
        for n in 0..5 {
            assert_eq!(hold_millis(n, 0, 40), 40);
        }
    }
}
