/// Weighted pool integration tests: distribution, veto, history, reload.

use rand::rngs::StdRng;
use rand::SeedableRng;
use roll_call::core::pool::{build_pool, Pick, WeightedPool};
use roll_call::schema::roster::{Roster, RosterEntry, Tier};
use std::collections::HashMap;

fn roster(entries: &[(&str, i64)]) -> Roster {
    Roster::new(
        entries
            .iter()
            .map(|(name, tier)| RosterEntry::new(*name, Tier::clamped(*tier)))
            .collect(),
    )
}

#[test]
fn draws_converge_to_tier_weights() {
    let r = roster(&[("rare", 2), ("normal", 3), ("often", 4), ("never", 1)]);
    let mut rng = StdRng::seed_from_u64(2024);
    let mut pool = WeightedPool::new(r, 10, &mut rng);

    // 100 slots per generation; a whole number of generations gives exact
    // counts, a ragged tail only perturbs them slightly.
    let draws = 10_050;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..draws {
        let pick = pool.draw_next(&mut rng);
        *counts.entry(pick.name().unwrap().to_string()).or_insert(0) += 1;
    }

    let expected = [("rare", 0.10), ("normal", 0.30), ("often", 0.60)];
    for (name, share) in expected {
        let observed = counts[name] as f64 / draws as f64;
        assert!(
            (observed - share).abs() < 0.01,
            "{} drawn {:.3}, expected {:.2}",
            name,
            observed,
            share
        );
    }
    assert!(!counts.contains_key("never"));
}

#[test]
fn absolute_tier_vetoes_everyone_else() {
    let r = roster(&[("a", 4), ("b", 5), ("c", 3), ("d", 2)]);
    let mut rng = StdRng::seed_from_u64(7);
    let mut pool = WeightedPool::new(r, 10, &mut rng);
    for _ in 0..1_000 {
        assert_eq!(pool.draw_next(&mut rng), Pick::Name("b".to_string()));
    }
}

#[test]
fn non_empty_roster_never_builds_empty_pool() {
    let mut rng = StdRng::seed_from_u64(11);
    let cases: Vec<Vec<(&str, i64)>> = vec![
        vec![("a", 1)],
        vec![("a", 1), ("b", 1), ("a", 1)],
        vec![("a", 1), ("b", 2)],
        vec![("a", 5)],
        vec![("a", 1), ("b", 5)],
    ];
    for case in cases {
        assert!(!build_pool(&roster(&case), &mut rng).is_empty(), "{:?}", case);
    }
}

#[test]
fn roster_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("names.txt");
    let original = roster(&[("Ann", 1), ("Bo", 2), ("Cy", 3), ("Di", 4), ("Ed", 5), ("Bo", 3)]);
    original.save(&path).unwrap();
    assert_eq!(Roster::load_or_default(&path), original);
}

#[test]
fn history_holds_last_ten_draws() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut pool = WeightedPool::new(roster(&[("a", 2), ("b", 3), ("c", 4)]), 10, &mut rng);
    let mut drawn = Vec::new();
    for _ in 0..37 {
        drawn.push(pool.draw_next(&mut rng).name().unwrap().to_string());
    }
    let history: Vec<String> = pool.history().map(str::to_string).collect();
    assert_eq!(history, drawn[27..].to_vec());
}

#[test]
fn reload_mid_session_starts_fresh_pool() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut pool = WeightedPool::new(roster(&[("x", 3), ("y", 4)]), 10, &mut rng);
    for _ in 0..17 {
        pool.draw_next(&mut rng);
    }
    assert_eq!(pool.cursor(), 17);

    pool.reload(roster(&[("z", 2), ("w", 1)]), &mut rng);
    assert_eq!(pool.cursor(), 0);
    assert_eq!(pool.pool().len(), 10);
    for _ in 0..25 {
        assert_eq!(pool.draw_next(&mut rng), Pick::Name("z".to_string()));
    }
}

#[test]
fn seeded_pools_are_reproducible() {
    let r = roster(&[("a", 3), ("b", 4), ("c", 2)]);
    let mut rng1 = StdRng::seed_from_u64(99);
    let mut rng2 = StdRng::seed_from_u64(99);
    assert_eq!(build_pool(&r, &mut rng1), build_pool(&r, &mut rng2));
}
