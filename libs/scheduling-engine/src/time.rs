//! Minute arithmetic and 15-minute slot indexing over the operating window.

use shared_config::EngineConfig;

/// Converts an absolute minute-since-midnight into a slot index relative to
/// `config.op_start`. Callers are expected to have already bounded `minute`
/// to the operating window; this never panics, it saturates at 0 or
/// `num_slots`.
pub fn slot_of(config: &EngineConfig, minute: u32) -> u32 {
    if minute <= config.op_start {
        return 0;
    }
    let offset = (minute - config.op_start) / config.slot_minutes;
    offset.min(config.num_slots())
}

/// Converts a slot index back to an absolute minute-since-midnight.
pub fn minute_of(config: &EngineConfig, slot: u32) -> u32 {
    config.op_start + slot * config.slot_minutes
}

/// True when `minute` lies on the 15-minute grid relative to `op_start`.
pub fn on_grid(config: &EngineConfig, minute: u32) -> bool {
    minute >= config.op_start && (minute - config.op_start) % config.slot_minutes == 0
}

/// True when `[start, end)` lies within `[op_start, op_end]` (lunches may
/// sit inside but a non-lunch entry may never spill outside).
pub fn within_operating_hours(config: &EngineConfig, start: u32, end: u32) -> bool {
    start >= config.op_start && end <= config.op_end
}

/// `true` when two half-open ranges `[a_start, a_end)` and `[b_start,
/// b_end)` overlap. This is the one overlap primitive every conflict
/// predicate in the kernel is built from.
pub fn ranges_overlap(a_start: u32, a_end: u32, b_start: u32, b_end: u32) -> bool {
    a_start < b_end && b_start < a_end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn slot_and_minute_round_trip_on_the_grid() {
        let config = cfg();
        for slot in 0..config.num_slots() {
            let minute = minute_of(&config, slot);
            assert_eq!(slot_of(&config, minute), slot);
            assert!(on_grid(&config, minute));
        }
    }

    #[test]
    fn ranges_overlap_is_exclusive_at_the_boundary() {
        assert!(!ranges_overlap(540, 600, 600, 660));
        assert!(ranges_overlap(540, 601, 600, 660));
        assert!(ranges_overlap(540, 660, 550, 560));
    }

    #[test]
    fn within_operating_hours_rejects_spillover() {
        let config = cfg();
        assert!(within_operating_hours(&config, config.op_start, config.op_end));
        assert!(!within_operating_hours(&config, config.op_start - 15, config.op_end));
        assert!(!within_operating_hours(&config, config.op_start, config.op_end + 15));
    }
}
