//! Evolutionary loop (§4.11) and local search (§4.11 tail), wired together
//! behind the single [`run`] entrypoint (§6).
//!
//! Population init, generational replacement, and the post-loop polish all
//! live here; every operator they call (seeding, crossover, mutation,
//! repair, fitness) is implemented in its own module and used here exactly
//! as the spec's component table lays it out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_config::EngineConfig;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::crossover::crossover;
use crate::errors::{RuleId, Violation};
use crate::fitness::fitness;
use crate::models::{BaseSchedule, Callout, Client, EntityKind, ScheduleEntry, Therapist};
use crate::mutation::mutate;
use crate::repair::{cleanup_merge, repair};
use crate::seeder::{graft_base_schedule, seed};
use crate::validator::validate;

/// Fitness below which the lightest hard-violation weight could not have
/// fired (§4.12): the threshold for `success`.
const SUCCESS_THRESHOLD: f64 = 500.0;

/// Bundled inputs to one `run` call (§6). Every field is a borrowed
/// snapshot — the engine never mutates or re-reads a caller's collection,
/// matching the snapshot-at-entry contract in §5.
pub struct EngineInputs<'a> {
    pub clients: &'a [Client],
    pub therapists: &'a [Therapist],
    pub date: NaiveDate,
    pub callouts: &'a [Callout],
    /// A caller-provided schedule to seed the population with (e.g. a
    /// prior `run`'s output, for the "seed = previous_output" monotone
    /// improvement property in §8).
    pub seed: Option<&'a [ScheduleEntry]>,
    /// A named per-weekday preset (§3) for today's weekday, if the host
    /// found one.
    pub base_schedule: Option<&'a BaseSchedule>,
    /// Up to K prior schedules for today's weekday, mined by the learning
    /// service (§6); an empty slice behaves identically to having no
    /// learning service at all, apart from seed quality.
    pub prior_schedules: &'a [Vec<ScheduleEntry>],
    /// Therapist-id → preferred (start, end) lunch window, from the
    /// learning service; entries not present fall back to the earliest
    /// free slot in [lunch_start, lunch_end - lunch_duration].
    pub lunch_preferences: &'a std::collections::HashMap<Uuid, (u32, u32)>,
}

/// Knobs that affect one run but aren't part of the domain snapshot.
#[derive(Default)]
pub struct RunOptions {
    /// Seeds the engine's RNG for reproducible output. `None` draws from
    /// the system entropy source.
    pub rng_seed: Option<u64>,
    /// Checked at each generation boundary (§5); flipping it causes the
    /// loop to return the best individual found so far with
    /// `success = false` and a "cancelled" status.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// What `run` returns: the best schedule found, its residual violations,
/// and the bookkeeping a caller needs to judge or retry (§6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunOutcome {
    pub schedule: Vec<ScheduleEntry>,
    pub violations: Vec<Violation>,
    pub generations: usize,
    pub best_fitness: f64,
    pub success: bool,
    pub status: String,
}

impl RunOutcome {
    fn empty(status: impl Into<String>, success: bool, violations: Vec<Violation>) -> Self {
        Self {
            schedule: Vec::new(),
            violations,
            generations: 0,
            best_fitness: 0.0,
            success,
            status: status.into(),
        }
    }
}

/// One candidate schedule, carrying its own evaluation so the generation
/// loop doesn't re-validate an individual it hasn't touched.
#[derive(Clone)]
struct Individual {
    entries: Vec<ScheduleEntry>,
    violations: Vec<Violation>,
    fitness: f64,
}

fn evaluate(
    config: &EngineConfig,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    entries: Vec<ScheduleEntry>,
) -> Individual {
    let violations = validate(config, clients, therapists, &entries, callouts, date);
    let score = fitness(config, clients, therapists, &entries, callouts, date, &violations);
    Individual {
        entries,
        violations,
        fitness: score,
    }
}

/// §7 input errors: a callout referencing a therapist or client id absent
/// from the snapshot. Checked once before the loop starts; anything else
/// (missing date, an entirely absent collection) is either untypeable in
/// this signature (date is a required `NaiveDate`) or handled as the
/// boundary behavior in the next function (an explicitly empty slice is a
/// valid, trivial input, not a missing one — see `DESIGN.md`).
fn unknown_entity_violations(clients: &[Client], therapists: &[Therapist], callouts: &[Callout]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for callout in callouts {
        let known = match callout.entity_kind {
            EntityKind::Client => clients.iter().any(|c| c.id == callout.entity_id),
            EntityKind::Therapist => therapists.iter().any(|t| t.id == callout.entity_id),
        };
        if !known {
            violations.push(
                Violation::new(
                    RuleId::UnknownEntity,
                    format!("callout references an unknown {:?}", callout.entity_kind),
                )
                .with_detail(callout.id.to_string()),
            );
        }
    }
    violations
}

/// Repairs and mutates one pre-existing schedule (a caller seed, a base
/// schedule, or a mined prior schedule) into a population slot (§4.11(a),
/// (b), (c)).
#[allow(clippy::too_many_arguments)]
fn repair_mutate_seed(
    config: &EngineConfig,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    entries: &[ScheduleEntry],
    rng: &mut StdRng,
) -> Vec<ScheduleEntry> {
    let mut entries = entries.to_vec();
    for entry in &mut entries {
        entry.id = Uuid::new_v4();
    }
    mutate(config, &mut entries, clients, therapists, callouts, date, rng);
    repair(config, &mut entries, clients, therapists, callouts, date, rng);
    entries
}

/// Builds the initial population per §4.11: the caller's seed, the base
/// schedule, up to 20% mined from prior schedules, and fresh constructive
/// seeds filling the remainder.
#[allow(clippy::too_many_arguments)]
fn init_population(
    config: &EngineConfig,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    weekday: chrono::Weekday,
    inputs: &EngineInputs,
    rng: &mut StdRng,
) -> Vec<Individual> {
    let pop_size = config.population_size.max(1);
    let mut raw_schedules: Vec<Vec<ScheduleEntry>> = Vec::with_capacity(pop_size);

    if let Some(seed_entries) = inputs.seed {
        raw_schedules.push(repair_mutate_seed(config, clients, therapists, callouts, date, seed_entries, rng));
    }

    if let Some(base) = inputs.base_schedule {
        let grafted = graft_base_schedule(config, base, callouts, date, weekday);
        if !grafted.is_empty() {
            raw_schedules.push(repair_mutate_seed(config, clients, therapists, callouts, date, &grafted, rng));
        }
    }

    let mined_budget = ((pop_size as f64) * 0.20).floor() as usize;
    for prior in inputs.prior_schedules.iter().take(mined_budget) {
        if raw_schedules.len() >= pop_size {
            break;
        }
        raw_schedules.push(repair_mutate_seed(config, clients, therapists, callouts, date, prior, rng));
    }

    while raw_schedules.len() < pop_size {
        let mut fresh = seed(config, clients, therapists, callouts, date, inputs.base_schedule, inputs.lunch_preferences, rng);
        repair(config, &mut fresh, clients, therapists, callouts, date, rng);
        raw_schedules.push(fresh);
    }
    raw_schedules.truncate(pop_size);

    raw_schedules
        .into_iter()
        .map(|entries| evaluate(config, clients, therapists, callouts, date, entries))
        .collect()
}

/// Diversity-preserving selection (§4.11): 30% of the time, a uniformly
/// random individual; otherwise the best of a 5-way tournament. Always
/// with replacement.
fn select<'a>(population: &'a [Individual], rng: &mut StdRng) -> &'a Individual {
    if rng.gen_bool(0.30) {
        &population[rng.gen_range(0..population.len())]
    } else {
        let mut best: Option<&Individual> = None;
        for _ in 0..5 {
            let candidate = &population[rng.gen_range(0..population.len())];
            best = Some(match best {
                Some(current) if current.fitness <= candidate.fitness => current,
                _ => candidate,
            });
        }
        best.expect("tournament always draws at least one candidate")
    }
}

/// Swaps the therapist on two client-bearing entries if both resulting
/// placements pass the kernel against the rest of the schedule.
fn try_swap(
    config: &EngineConfig,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    entries: &[ScheduleEntry],
    i: usize,
    j: usize,
) -> Option<Vec<ScheduleEntry>> {
    let mut candidate = entries.to_vec();
    let (ti, tj) = (candidate[i].therapist_id, candidate[j].therapist_id);
    candidate[i].therapist_id = tj;
    candidate[j].therapist_id = ti;

    let client_by_id: std::collections::HashMap<Uuid, &Client> = clients.iter().map(|c| (c.id, c)).collect();
    let therapist_by_id: std::collections::HashMap<Uuid, &Therapist> = therapists.iter().map(|t| (t.id, t)).collect();

    for &idx in &[i, j] {
        let entry = &candidate[idx];
        let Some(therapist) = therapist_by_id.get(&entry.therapist_id).copied() else {
            return None;
        };
        let client = entry.client_id.and_then(|id| client_by_id.get(&id).copied());
        let rest: Vec<ScheduleEntry> = candidate
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != idx)
            .map(|(_, e)| e.clone())
            .collect();
        if !crate::constraints::is_valid_addition(config, entry, &rest, callouts, date, client, therapist, None) {
            return None;
        }
    }

    Some(candidate)
}

/// Therapist-swap 2-opt polish (§4.11 tail): each iteration scans every
/// pair of client-bearing entries on distinct therapists for the first
/// swap that strictly lowers fitness, applies it, and moves to the next
/// iteration; stops at the first iteration with no improving swap.
#[allow(clippy::too_many_arguments)]
fn local_search(
    config: &EngineConfig,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    mut best: Individual,
) -> Individual {
    for _ in 0..config.local_search_iterations {
        let mut improved = None;
        'pairs: for i in 0..best.entries.len() {
            if best.entries[i].client_id.is_none() {
                continue;
            }
            for j in (i + 1)..best.entries.len() {
                if best.entries[j].client_id.is_none() || best.entries[i].therapist_id == best.entries[j].therapist_id {
                    continue;
                }
                let Some(candidate) = try_swap(config, clients, therapists, callouts, date, &best.entries, i, j) else {
                    continue;
                };
                let candidate = evaluate(config, clients, therapists, callouts, date, candidate);
                if candidate.fitness < best.fitness {
                    improved = Some(candidate);
                    break 'pairs;
                }
            }
        }
        match improved {
            Some(next) => best = next,
            None => break,
        }
    }
    best
}

/// The engine's single entrypoint (§6): snapshots its inputs, runs the
/// evolutionary loop, polishes the best individual, and returns the
/// outcome. Never panics — every internal error taxonomy (§7) surfaces as
/// a `Violation` in the returned list instead.
#[instrument(skip(config, inputs, options), fields(clients = inputs.clients.len(), therapists = inputs.therapists.len(), date = %inputs.date))]
pub fn run(config: &EngineConfig, inputs: EngineInputs, options: RunOptions) -> RunOutcome {
    if inputs.clients.is_empty() || inputs.therapists.is_empty() {
        return RunOutcome {
            schedule: Vec::new(),
            violations: Vec::new(),
            generations: 0,
            best_fitness: 0.0,
            success: true,
            status: "no clients or therapists to schedule".to_string(),
        };
    }

    let unknowns = unknown_entity_violations(inputs.clients, inputs.therapists, inputs.callouts);
    if !unknowns.is_empty() {
        return RunOutcome::empty("a callout references an entity outside the provided snapshot", false, unknowns);
    }

    let weekday = inputs.date.weekday();
    let mut rng = match options.rng_seed {
        Some(seed_value) => StdRng::seed_from_u64(seed_value),
        None => StdRng::from_entropy(),
    };

    let mut population = init_population(
        config,
        inputs.clients,
        inputs.therapists,
        inputs.callouts,
        inputs.date,
        weekday,
        &inputs,
        &mut rng,
    );

    let elite_count = ((population.len() as f64) * config.elitism_fraction).round().max(1.0) as usize;
    let elite_count = elite_count.min(population.len());

    let mut best: Option<Individual> = None;
    let mut generations_without_improvement = 0usize;
    let mut generations_run = 0usize;
    let mut status = "exhausted max generations".to_string();

    for generation in 0..config.max_generations {
        generations_run = generation + 1;

        if let Some(cancel) = &options.cancel {
            if cancel.load(Ordering::Relaxed) {
                status = "cancelled".to_string();
                break;
            }
        }

        population.sort_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(std::cmp::Ordering::Equal));

        let generation_best = population[0].fitness;
        let improved = best.as_ref().map(|b| generation_best < b.fitness).unwrap_or(true);
        if improved {
            best = Some(population[0].clone());
            generations_without_improvement = 0;
        } else {
            generations_without_improvement += 1;
        }
        debug!(generation, best_fitness = generation_best, "evaluated generation");

        if best.as_ref().map(|b| b.fitness <= 0.0).unwrap_or(false) {
            status = "reached zero-violation fitness".to_string();
            break;
        }
        if generations_without_improvement >= config.plateau_generations {
            status = format!("plateaued after {} generations without improvement", generations_without_improvement);
            break;
        }

        let mut next_generation: Vec<Individual> = population[..elite_count].to_vec();
        while next_generation.len() < population.len() {
            let parent_a = select(&population, &mut rng);
            let parent_b = select(&population, &mut rng);
            let mut offspring = crossover(
                config,
                &parent_a.entries,
                &parent_b.entries,
                inputs.therapists,
                inputs.callouts,
                inputs.date,
                &mut rng,
            );
            repair(config, &mut offspring, inputs.clients, inputs.therapists, inputs.callouts, inputs.date, &mut rng);

            if rng.gen_bool(config.mutation_rate) {
                mutate(config, &mut offspring, inputs.clients, inputs.therapists, inputs.callouts, inputs.date, &mut rng);
                repair(config, &mut offspring, inputs.clients, inputs.therapists, inputs.callouts, inputs.date, &mut rng);
            }

            next_generation.push(evaluate(config, inputs.clients, inputs.therapists, inputs.callouts, inputs.date, offspring));
        }

        population = next_generation;
    }

    let mut best = best.unwrap_or_else(|| {
        population.sort_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(std::cmp::Ordering::Equal));
        population[0].clone()
    });

    best = local_search(config, inputs.clients, inputs.therapists, inputs.callouts, inputs.date, best);

    cleanup_merge(config, &mut best.entries);
    let final_violations = validate(config, inputs.clients, inputs.therapists, &best.entries, inputs.callouts, inputs.date);
    let final_fitness = fitness(config, inputs.clients, inputs.therapists, &best.entries, inputs.callouts, inputs.date, &final_violations);
    let success = status != "cancelled" && final_fitness < SUCCESS_THRESHOLD;

    let status = if status == "cancelled" {
        format!("cancelled after {generations_run} generations, best fitness {final_fitness:.2}")
    } else {
        format!("{status} after {generations_run} generations, best fitness {final_fitness:.2}")
    };

    info!(generations = generations_run, best_fitness = final_fitness, success, "run complete");

    RunOutcome {
        schedule: best.entries,
        violations: final_violations,
        generations: generations_run,
        best_fitness: final_fitness,
        success,
        status,
    }
}
