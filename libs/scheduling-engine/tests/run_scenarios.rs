//! Black-box coverage of the §8 scenarios against the `run()` entrypoint
//! directly, rather than any single operator in isolation.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Weekday};
use shared_config::EngineConfig;
use uuid::Uuid;

use scheduling_engine::{
    run, Callout, Client, EngineInputs, EntityKind, Role, RunOptions, SessionKind, Therapist,
};

/// Small, fast-converging config so these tests don't spend the full
/// production generation budget to reach a stable answer.
fn test_config() -> EngineConfig {
    EngineConfig {
        population_size: 16,
        max_generations: 40,
        plateau_generations: 8,
        local_search_iterations: 5,
        ..EngineConfig::default()
    }
}

fn a_monday() -> NaiveDate {
    let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
    debug_assert_eq!(date.weekday(), Weekday::Mon);
    date
}

fn a_saturday() -> NaiveDate {
    let date = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
    debug_assert_eq!(date.weekday(), Weekday::Sat);
    date
}

fn client(name: &str, requirements: &[&str]) -> Client {
    Client {
        id: Uuid::new_v4(),
        name: name.to_string(),
        team_id: None,
        insurance_requirements: requirements.iter().map(|s| s.to_string()).collect(),
        allied_health_needs: Vec::new(),
    }
}

fn therapist(name: &str, role: Role, qualifications: &[&str]) -> Therapist {
    Therapist {
        id: Uuid::new_v4(),
        name: name.to_string(),
        team_id: None,
        role,
        qualifications: qualifications.iter().map(|s| s.to_string()).collect(),
        allied_health_capable: BTreeSet::new(),
    }
}

#[test]
fn empty_clients_and_therapists_is_a_trivial_success() {
    let config = test_config();
    let clients: Vec<Client> = Vec::new();
    let therapists: Vec<Therapist> = Vec::new();
    let callouts: Vec<Callout> = Vec::new();
    let prior_schedules = Vec::new();
    let lunch_preferences = std::collections::HashMap::new();

    let inputs = EngineInputs {
        clients: &clients,
        therapists: &therapists,
        date: a_monday(),
        callouts: &callouts,
        seed: None,
        base_schedule: None,
        prior_schedules: &prior_schedules,
        lunch_preferences: &lunch_preferences,
    };

    let outcome = run(&config, inputs, RunOptions::default());

    assert!(outcome.success);
    assert!(outcome.schedule.is_empty());
    assert!(outcome.violations.is_empty());
    assert_eq!(outcome.generations, 0);
}

#[test]
fn callout_referencing_unknown_client_is_rejected_before_scheduling() {
    let config = test_config();
    let clients = vec![client("Ada", &[])];
    let therapists = vec![therapist("Bea", Role::Rbt, &[])];
    let date = a_monday();
    let callouts = vec![Callout {
        id: Uuid::new_v4(),
        entity_kind: EntityKind::Client,
        entity_id: Uuid::new_v4(),
        date_start: date,
        date_end: date,
        window_start: 0,
        window_end: 24 * 60,
        reason: None,
    }];
    let prior_schedules = Vec::new();
    let lunch_preferences = std::collections::HashMap::new();

    let inputs = EngineInputs {
        clients: &clients,
        therapists: &therapists,
        date,
        callouts: &callouts,
        seed: None,
        base_schedule: None,
        prior_schedules: &prior_schedules,
        lunch_preferences: &lunch_preferences,
    };

    let outcome = run(&config, inputs, RunOptions::default());

    assert!(!outcome.success);
    assert!(outcome.schedule.is_empty());
    assert!(outcome
        .violations
        .iter()
        .any(|v| v.rule_id == scheduling_engine::RuleId::UnknownEntity));
}

#[test]
fn single_client_single_therapist_on_a_weekday_produces_a_deliverable_schedule() {
    let config = test_config();
    let clients = vec![client("Ada", &[])];
    let therapists = vec![therapist("Bea", Role::Rbt, &[])];
    let callouts: Vec<Callout> = Vec::new();
    let prior_schedules = Vec::new();
    let lunch_preferences = std::collections::HashMap::new();

    let inputs = EngineInputs {
        clients: &clients,
        therapists: &therapists,
        date: a_monday(),
        callouts: &callouts,
        seed: None,
        base_schedule: None,
        prior_schedules: &prior_schedules,
        lunch_preferences: &lunch_preferences,
    };

    let outcome = run(&config, inputs, RunOptions { rng_seed: Some(7), cancel: None });

    let aba_entries: Vec<_> = outcome
        .schedule
        .iter()
        .filter(|e| e.kind == SessionKind::Aba && e.client_id == Some(clients[0].id))
        .collect();
    assert!(!aba_entries.is_empty(), "client should receive at least one ABA session");

    // The kernel's per-therapist overlap rule is structural, not a matter of
    // GA convergence quality — it must hold no matter how many generations ran.
    for (i, a) in outcome.schedule.iter().enumerate() {
        for b in &outcome.schedule[i + 1..] {
            if a.weekday == b.weekday && a.therapist_id == b.therapist_id {
                assert!(
                    !a.overlaps(b.start, b.end),
                    "therapist double-booked: {a:?} vs {b:?}"
                );
            }
        }
    }
}

#[test]
fn no_aba_sessions_are_placed_on_a_weekend() {
    let config = test_config();
    let clients = vec![client("Ada", &[])];
    let therapists = vec![therapist("Bea", Role::Rbt, &[])];
    let callouts: Vec<Callout> = Vec::new();
    let prior_schedules = Vec::new();
    let lunch_preferences = std::collections::HashMap::new();

    let inputs = EngineInputs {
        clients: &clients,
        therapists: &therapists,
        date: a_saturday(),
        callouts: &callouts,
        seed: None,
        base_schedule: None,
        prior_schedules: &prior_schedules,
        lunch_preferences: &lunch_preferences,
    };

    let outcome = run(&config, inputs, RunOptions { rng_seed: Some(7), cancel: None });

    assert!(outcome.schedule.iter().all(|e| e.kind != SessionKind::Aba));
}

#[test]
fn a_full_day_callout_removes_the_therapist_from_the_schedule() {
    let config = test_config();
    let clients = vec![client("Ada", &[])];
    let therapist_on_callout = therapist("Bea", Role::Rbt, &[]);
    let date = a_monday();
    let callouts = vec![Callout {
        id: Uuid::new_v4(),
        entity_kind: EntityKind::Therapist,
        entity_id: therapist_on_callout.id,
        date_start: date,
        date_end: date,
        window_start: 0,
        window_end: 24 * 60,
        reason: Some("sick".to_string()),
    }];
    let therapists = vec![therapist_on_callout];
    let prior_schedules = Vec::new();
    let lunch_preferences = std::collections::HashMap::new();

    let inputs = EngineInputs {
        clients: &clients,
        therapists: &therapists,
        date,
        callouts: &callouts,
        seed: None,
        base_schedule: None,
        prior_schedules: &prior_schedules,
        lunch_preferences: &lunch_preferences,
    };

    let outcome = run(&config, inputs, RunOptions { rng_seed: Some(7), cancel: None });

    assert!(
        outcome.schedule.is_empty(),
        "the only therapist is out all day, nothing should be placed"
    );
    assert!(outcome
        .violations
        .iter()
        .any(|v| v.rule_id == scheduling_engine::RuleId::CoverageGap));
}

#[test]
fn credential_mismatch_keeps_an_unqualified_therapist_off_a_medicaid_client() {
    let config = test_config();
    let clients = vec![client("Ada", &[scheduling_engine::MD_MEDICAID])];
    let therapists = vec![therapist("Bea", Role::Rbt, &[])];
    let callouts: Vec<Callout> = Vec::new();
    let prior_schedules = Vec::new();
    let lunch_preferences = std::collections::HashMap::new();

    let inputs = EngineInputs {
        clients: &clients,
        therapists: &therapists,
        date: a_monday(),
        callouts: &callouts,
        seed: None,
        base_schedule: None,
        prior_schedules: &prior_schedules,
        lunch_preferences: &lunch_preferences,
    };

    let outcome = run(&config, inputs, RunOptions { rng_seed: Some(7), cancel: None });

    let aba_for_ada: Vec<_> = outcome
        .schedule
        .iter()
        .filter(|e| e.client_id == Some(clients[0].id) && e.kind == SessionKind::Aba)
        .collect();
    assert!(
        aba_for_ada.is_empty(),
        "a therapist missing the MD_MEDICAID qualification should never be assigned"
    );
}

#[test]
fn a_prior_outcome_can_be_fed_back_in_as_a_seed() {
    let config = test_config();
    let clients = vec![client("Ada", &[]), client("Cleo", &[])];
    let therapists = vec![
        therapist("Bea", Role::Rbt, &[]),
        therapist("Dot", Role::Bcba, &[]),
    ];
    let callouts: Vec<Callout> = Vec::new();
    let prior_schedules = Vec::new();
    let lunch_preferences = std::collections::HashMap::new();
    let date = a_monday();

    let first = run(
        &config,
        EngineInputs {
            clients: &clients,
            therapists: &therapists,
            date,
            callouts: &callouts,
            seed: None,
            base_schedule: None,
            prior_schedules: &prior_schedules,
            lunch_preferences: &lunch_preferences,
        },
        RunOptions { rng_seed: Some(42), cancel: None },
    );

    let known_therapists: std::collections::HashSet<Uuid> = therapists.iter().map(|t| t.id).collect();
    let known_clients: std::collections::HashSet<Uuid> = clients.iter().map(|c| c.id).collect();

    let second = run(
        &config,
        EngineInputs {
            clients: &clients,
            therapists: &therapists,
            date,
            callouts: &callouts,
            seed: Some(&first.schedule),
            base_schedule: None,
            prior_schedules: &prior_schedules,
            lunch_preferences: &lunch_preferences,
        },
        RunOptions { rng_seed: Some(43), cancel: None },
    );

    // Feeding a prior outcome back in as a seed must never surface an entry
    // referencing an entity outside the snapshot, regardless of how the GA's
    // mutate/repair pass on that seed plays out.
    for entry in &second.schedule {
        assert!(known_therapists.contains(&entry.therapist_id));
        if let Some(client_id) = entry.client_id {
            assert!(known_clients.contains(&client_id));
        }
    }
    assert!(second.generations >= 1);
}

#[test]
fn cancel_flag_halts_the_loop_and_reports_failure() {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    let config = test_config();
    let clients = vec![client("Ada", &[])];
    let therapists = vec![therapist("Bea", Role::Rbt, &[])];
    let callouts: Vec<Callout> = Vec::new();
    let prior_schedules = Vec::new();
    let lunch_preferences = std::collections::HashMap::new();

    let cancel = Arc::new(AtomicBool::new(true));
    let outcome = run(
        &config,
        EngineInputs {
            clients: &clients,
            therapists: &therapists,
            date: a_monday(),
            callouts: &callouts,
            seed: None,
            base_schedule: None,
            prior_schedules: &prior_schedules,
            lunch_preferences: &lunch_preferences,
        },
        RunOptions { rng_seed: Some(1), cancel: Some(cancel.clone()) },
    );

    // The cancel flag is already set before the first generation even runs, so
    // the loop should stop immediately with `success = false`.
    assert!(!outcome.success);
    assert!(outcome.status.contains("cancelled"));
}
