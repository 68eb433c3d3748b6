use std::env;
use tracing::warn;

/// Operational constants and genetic-algorithm tuning knobs for the
/// scheduling engine, settable by the host process before invocation.
///
/// Every field defaults to the value the engine's design assumes; the host
/// may override any of them from the environment, the same way the rest of
/// this repository's configuration is read.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minutes since midnight the operating window opens (inclusive).
    pub op_start: u32,
    /// Minutes since midnight the operating window closes (exclusive).
    pub op_end: u32,
    /// Earliest minute a lunch may begin.
    pub lunch_start: u32,
    /// Latest minute a lunch may begin (`lunch_end - lunch_duration`).
    pub lunch_end: u32,
    /// Staff availability window, wider than the operating window.
    pub staff_window_start: u32,
    pub staff_window_end: u32,
    pub min_aba_duration: u32,
    pub max_aba_duration: u32,
    pub lunch_duration: u32,
    pub slot_minutes: u32,

    pub population_size: usize,
    pub max_generations: usize,
    pub elitism_fraction: f64,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub plateau_generations: usize,
    pub local_search_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            op_start: 8 * 60,
            op_end: 17 * 60,
            lunch_start: 11 * 60 + 30,
            lunch_end: 13 * 60 + 30,
            staff_window_start: 7 * 60 + 30,
            staff_window_end: 18 * 60,
            min_aba_duration: 60,
            max_aba_duration: 180,
            lunch_duration: 30,
            slot_minutes: 15,

            population_size: 50,
            max_generations: 150,
            elitism_fraction: 0.10,
            crossover_rate: 0.7,
            mutation_rate: 0.95,
            plateau_generations: 30,
            local_search_iterations: 30,
        }
    }
}

impl EngineConfig {
    /// Number of 15-minute slots spanning the operating window.
    pub fn num_slots(&self) -> u32 {
        (self.op_end - self.op_start) / self.slot_minutes
    }

    pub fn from_env() -> Self {
        let default = Self::default();
        let config = Self {
            op_start: read_minutes("OP_START", default.op_start),
            op_end: read_minutes("OP_END", default.op_end),
            lunch_start: read_minutes("LUNCH_START", default.lunch_start),
            lunch_end: read_minutes("LUNCH_END", default.lunch_end),
            staff_window_start: read_minutes("STAFF_WINDOW_START", default.staff_window_start),
            staff_window_end: read_minutes("STAFF_WINDOW_END", default.staff_window_end),
            min_aba_duration: read_u32("MIN_ABA_DURATION", default.min_aba_duration),
            max_aba_duration: read_u32("MAX_ABA_DURATION", default.max_aba_duration),
            lunch_duration: read_u32("LUNCH_DURATION", default.lunch_duration),
            slot_minutes: read_u32("SLOT_MINUTES", default.slot_minutes),

            population_size: read_usize("GA_POPULATION_SIZE", default.population_size),
            max_generations: read_usize("GA_MAX_GENERATIONS", default.max_generations),
            elitism_fraction: read_f64("GA_ELITISM_FRACTION", default.elitism_fraction),
            crossover_rate: read_f64("GA_CROSSOVER_RATE", default.crossover_rate),
            mutation_rate: read_f64("GA_MUTATION_RATE", default.mutation_rate),
            plateau_generations: read_usize("GA_PLATEAU_GENERATIONS", default.plateau_generations),
            local_search_iterations: read_usize(
                "GA_LOCAL_SEARCH_ITERATIONS",
                default.local_search_iterations,
            ),
        };

        if !config.is_sane() {
            warn!("EngineConfig loaded from environment failed sanity checks, falling back to defaults");
            return default;
        }

        config
    }

    /// Coarse sanity check so a malformed environment never silently
    /// produces an engine that can't place a single entry.
    pub fn is_sane(&self) -> bool {
        self.op_start < self.op_end
            && self.lunch_start < self.lunch_end
            && self.lunch_end <= self.op_end
            && self.min_aba_duration <= self.max_aba_duration
            && self.slot_minutes > 0
            && (self.op_end - self.op_start) % self.slot_minutes == 0
            && self.num_slots() <= 64
    }
}

fn read_minutes(var: &str, default: u32) -> u32 {
    match env::var(var) {
        Ok(raw) => match parse_hhmm(&raw) {
            Some(minutes) => minutes,
            None => {
                warn!(var, raw, "could not parse HH:MM, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn read_u32(var: &str, default: u32) -> u32 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| {
            default
        })
}

fn read_usize(var: &str, default: usize) -> usize {
    env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn read_f64(var: &str, default: f64) -> f64 {
    env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Parses a bijective "HH:MM" string into minutes since midnight.
pub fn parse_hhmm(raw: &str) -> Option<u32> {
    let (h, m) = raw.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        assert!(EngineConfig::default().is_sane());
    }

    #[test]
    fn parse_hhmm_round_trips_on_the_grid() {
        assert_eq!(parse_hhmm("08:00"), Some(480));
        assert_eq!(parse_hhmm("17:00"), Some(1020));
        assert_eq!(parse_hhmm("11:30"), Some(690));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("not-a-time"), None);
    }

    #[test]
    fn num_slots_matches_default_nine_hour_window() {
        assert_eq!(EngineConfig::default().num_slots(), 36);
    }
}
