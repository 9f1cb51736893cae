//! Yearly score and the victory check.

use tracing::info;

use crate::game::Game;
use crate::ids::PlayerId;
use crate::message::MessageKind;
use crate::player::ScoreRecord;
use crate::step::{Step, StepContext};

/// Score of `player` for the current year.
///
/// Planets count once, starbases three times, every 10,000 colonists and
/// every 30 yearly resources one point. Armed ships count fully, unarmed
/// ships half. Every tech level adds a point.
#[must_use]
pub fn score_for(game: &Game, player: PlayerId) -> ScoreRecord {
    let mut record = ScoreRecord {
        year: game.year,
        ..ScoreRecord::default()
    };
    for planet in game.planets.values().filter(|p| p.owner == Some(player)) {
        record.planets += 1;
        record.population += planet.population;
        record.resources += planet.spec.resources_per_year;
    }
    for fleet in game.fleets.values().filter(|f| f.owner == player) {
        if fleet.is_starbase() {
            record.starbases += 1;
        } else {
            record.unarmed_ships += fleet.spec.unarmed_ships;
            record.armed_ships += fleet.spec.total_ships - fleet.spec.unarmed_ships;
        }
    }
    record.tech_levels = game
        .player(player)
        .map_or(0, |p| i64::from(p.tech.sum()));

    record.score = record.planets
        + record.starbases * 3
        + record.population / 10_000
        + record.resources / 30
        + record.armed_ships
        + record.unarmed_ships / 2
        + record.tech_levels;
    record
}

/// Appends this year's score to every player's history.
#[derive(Debug, Default)]
pub struct ScoreStep;

impl ScoreStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for ScoreStep {
    fn name(&self) -> &'static str {
        "score"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let game = &*ctx.game;
        let records: Vec<(PlayerId, ScoreRecord)> = game
            .players
            .keys()
            .map(|id| (*id, score_for(game, *id)))
            .collect();
        for (id, record) in records {
            if let Some(player) = ctx.game.player_mut(id) {
                player.score_history.push(record);
            }
        }
    }
}

/// Declares winners once the minimum game length has passed.
#[derive(Debug, Default)]
pub struct VictoryCheckStep;

impl VictoryCheckStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn criteria_met(game: &Game, player: PlayerId) -> u32 {
    let conditions = &game.rules.victory;
    let Some(p) = game.player(player) else {
        return 0;
    };
    let mut met = 0;
    if let Some(percent) = conditions.owned_planets_percent {
        let total = game.planets.len() as i64;
        let owned = game
            .planets
            .values()
            .filter(|planet| planet.owner == Some(player))
            .count() as i64;
        if total > 0 && owned * 100 >= total * i64::from(percent) {
            met += 1;
        }
    }
    if let Some(sum) = conditions.tech_levels_sum {
        if p.tech.sum() >= sum {
            met += 1;
        }
    }
    if let Some(score) = conditions.score {
        if p.score().is_some_and(|r| r.score >= score) {
            met += 1;
        }
    }
    met
}

impl Step for VictoryCheckStep {
    fn name(&self) -> &'static str {
        "victory_check"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let game = &mut *ctx.game;
        let conditions = &game.rules.victory;
        if game.years_elapsed() < conditions.min_years || conditions.required_count == 0 {
            return;
        }
        let required = conditions.required_count;
        let winners: Vec<PlayerId> = game
            .players
            .values()
            .filter(|p| !p.victor)
            .map(|p| p.id)
            .filter(|id| criteria_met(game, *id) >= required)
            .collect();

        for winner in winners {
            let name = match game.player_mut(winner) {
                Some(player) => {
                    player.victor = true;
                    player.name.clone()
                }
                None => continue,
            };
            info!(player = %winner, year = game.year, "Victory");
            for player in game.players.values_mut() {
                player.message(MessageKind::Victory, format!("{name} has won the game"), None);
            }
        }
    }
}
