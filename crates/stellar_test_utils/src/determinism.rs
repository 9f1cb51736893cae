//! Reproducibility harness for turn generation.
//!
//! Every client and the host must agree on the universe after each year,
//! so generation has to be a pure function of the saved game. The usual
//! ways that breaks:
//!
//! - floats in positions or ratios (all geometry here is [`stellar_core::math::Fixed`]),
//! - iterating a `HashMap` (entities are kept in ordered storage and visited by id),
//! - randomness from outside the game (the generator lives in the rules and is saved).
//!
//! The helpers below run the same game several times, on several threads, or
//! through a save and load, and compare [`Game::state_hash`] afterwards.

use std::thread;

use stellar_core::game::Game;
use stellar_core::generator::TurnGenerator;

/// Final hashes of repeated runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Every run ended on the same hash.
    pub is_deterministic: bool,
    /// One hash per run, in run order.
    pub hashes: Vec<u64>,
    /// Years generated per run.
    pub years: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic generation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that generation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Turn generation is non-deterministic!\n\
                 Runs: {}\n\
                 Years: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.years,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `years` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one year
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    years: u32,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..years {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        years,
    }
}

/// Advance a game one year with default collaborators.
///
/// # Panics
///
/// Panics if the game's rules are invalid.
pub fn advance(game: &mut Game) {
    if let Err(err) = TurnGenerator::new().generate(game) {
        panic!("turn generation failed in year {}: {err}", game.year);
    }
}

/// Generate `years` twice from the same setup and compare final hashes.
///
/// # Example
///
/// ```
/// use stellar_test_utils::determinism::verify_game_determinism;
/// use stellar_test_utils::fixtures::two_empire_game;
///
/// assert!(verify_game_determinism(|| two_empire_game(11), 5));
/// ```
pub fn verify_game_determinism<F>(setup_fn: F, years: u32) -> bool
where
    F: Fn() -> Game,
{
    verify_determinism(2, years, &setup_fn, advance, Game::state_hash).is_deterministic
}

/// Generate N games on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
pub fn run_parallel_games<F>(setup_fn: F, num_games: usize, years: u32) -> DeterminismResult
where
    F: Fn() -> Game + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_games)
            .map(|_| {
                s.spawn(|| {
                    let mut game = setup_fn();
                    for _ in 0..years {
                        advance(&mut game);
                    }
                    game.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| panic!("game thread panicked")))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        years,
    }
}

/// Compare two games year by year, finding the first divergence.
///
/// # Returns
///
/// `None` if the games stay identical, `Some(year)` for the first number of
/// generated years after which they differ (0 if they start apart).
pub fn find_first_divergence<F>(setup_fn: F, years: u32) -> Option<u32>
where
    F: Fn() -> Game,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for year in 1..=years {
        advance(&mut a);
        advance(&mut b);

        if a.state_hash() != b.state_hash() {
            tracing::debug!(year, left = a.state_hash(), right = b.state_hash(), "Games diverged");
            return Some(year);
        }
    }

    None
}

/// Verify that saving and loading mid-game does not change the outcome.
///
/// Generates `years`, round-trips the game through bincode and RON, then
/// generates one more year on each copy and compares all three.
pub fn verify_serialization_determinism<F>(setup_fn: F, years: u32) -> bool
where
    F: Fn() -> Game,
{
    let mut game = setup_fn();
    for _ in 0..years {
        advance(&mut game);
    }
    let hash_before = game.state_hash();

    let Ok(bytes) = game.serialize() else {
        return false;
    };
    let Ok(mut from_bytes) = Game::deserialize(&bytes) else {
        return false;
    };
    let Ok(text) = game.to_ron() else {
        return false;
    };
    let Ok(mut from_ron) = Game::from_ron(&text) else {
        return false;
    };
    if from_bytes.state_hash() != hash_before || from_ron.state_hash() != hash_before {
        return false;
    }

    advance(&mut game);
    advance(&mut from_bytes);
    advance(&mut from_ron);
    game.state_hash() == from_bytes.state_hash() && game.state_hash() == from_ron.state_hash()
}

/// Proptest strategies for turn generation inputs.
pub mod strategies {
    use proptest::prelude::*;
    use stellar_core::cargo::Cost;
    use stellar_core::math::{Fixed, Vec2Fixed};
    use stellar_core::planet::Hab;

    /// A fixed-point coordinate inside a 1000 ly galaxy.
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (0i32..1000i32).prop_map(Fixed::from_num)
    }

    /// A map position.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// A warp speed a fleet can be ordered to fly at.
    pub fn arb_warp() -> impl Strategy<Value = u8> {
        1u8..=10u8
    }

    /// Habitability values on the 0..=100 scale.
    pub fn arb_hab() -> impl Strategy<Value = Hab> {
        (0i32..=100, 0i32..=100, 0i32..=100).prop_map(|(g, t, r)| Hab::new(g, t, r))
    }

    /// A build cost with every component below `max`.
    pub fn arb_cost(max: i64) -> impl Strategy<Value = Cost> {
        (0..max, 0..max, 0..max, 0..max).prop_map(|(i, b, g, r)| Cost::new(i, b, g, r))
    }

    /// A population in whole hundreds.
    pub fn arb_population() -> impl Strategy<Value = i64> {
        (0i64..10_000).prop_map(|p| p * 100)
    }

    /// A mine count as stored on a field.
    pub fn arb_mine_count() -> impl Strategy<Value = u64> {
        0u64..100_000
    }
}
