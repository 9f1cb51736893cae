//! Planet mining and population growth.

use tracing::{debug, info};

use crate::game::OwnedPlanets;
use crate::ids::{MapObjectRef, PlanetId};
use crate::message::MessageKind;
use crate::rules::GrowthRules;
use crate::step::{Step, StepContext};

/// One year's population change, in whole hundreds of colonists.
///
/// Hostile planets lose `pop * |hab| / 1000`. Above capacity a share of the
/// excess dies. Otherwise growth is `pop * rate * hab / 10000`, slowed by
/// `16/9 * (1 - fill)^2` once the planet is past the crowding threshold.
#[must_use]
pub fn growth_for(population: i64, max_population: i64, habitability: i64, growth_rate: i64, rules: &GrowthRules) -> i64 {
    if population <= 0 {
        return 0;
    }
    let pop = i128::from(population);
    let delta = if habitability < 0 {
        -(pop * i128::from(habitability.unsigned_abs()) / 1000)
    } else if population > max_population {
        -((pop - i128::from(max_population)) * i128::from(rules.overcrowding_death_percent) / 100)
    } else {
        let max = i128::from(max_population);
        let base = pop * i128::from(growth_rate) * i128::from(habitability) / 10_000;
        if pop * 100 > max * i128::from(rules.crowding_threshold_percent) {
            let room = max - pop;
            base * 16 * room * room / (9 * max * max)
        } else {
            base
        }
    };
    (delta.div_euclid(100) * 100) as i64
}

fn owned_sorted(owned: &OwnedPlanets) -> Vec<PlanetId> {
    let mut planets: Vec<PlanetId> = owned.values().flatten().copied().collect();
    planets.sort_unstable();
    planets
}

/// Owned planets dig up minerals with their operable mines.
#[derive(Debug, Default)]
pub struct PlanetMineStep {
    planets: Vec<PlanetId>,
}

impl PlanetMineStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Step for PlanetMineStep {
    fn name(&self) -> &'static str {
        "planet_mine"
    }

    fn pre_process(&mut self, _ctx: &mut StepContext<'_>, owned_planets: &OwnedPlanets) {
        self.planets = owned_sorted(owned_planets);
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let depletion = ctx.game.rules.growth.mining_depletion_kt;
        for id in std::mem::take(&mut self.planets) {
            let Some(planet) = ctx.game.planets.get_mut(id) else {
                continue;
            };
            if planet.owner.is_none() {
                continue;
            }
            let output = planet.spec.mining_output;
            planet.apply_mining(output, depletion);
            debug!(planet = %id, ?output, "Mined");
            ctx.game.recompute_planet_spec(id);
        }
    }
}

/// Population growth and die-off.
#[derive(Debug, Default)]
pub struct PlanetGrowthStep {
    planets: Vec<PlanetId>,
}

impl PlanetGrowthStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Step for PlanetGrowthStep {
    fn name(&self) -> &'static str {
        "planet_growth"
    }

    fn pre_process(&mut self, _ctx: &mut StepContext<'_>, owned_planets: &OwnedPlanets) {
        self.planets = owned_sorted(owned_planets);
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        for id in std::mem::take(&mut self.planets) {
            let Some(planet) = ctx.game.planets.get(id) else {
                continue;
            };
            let Some(owner) = planet.owner else {
                continue;
            };
            let Some(growth_rate) = ctx.game.player(owner).map(|p| p.race.growth_rate) else {
                continue;
            };
            let delta = growth_for(
                planet.population,
                planet.spec.max_population,
                planet.spec.habitability,
                growth_rate,
                &ctx.game.rules.growth,
            );
            let Some(planet) = ctx.game.planets.get_mut(id) else {
                continue;
            };
            planet.population = (planet.population + delta).max(0);
            if planet.population > 0 {
                continue;
            }
            planet.depopulate();
            info!(planet = %id, player = %owner, "Planet died out");
            ctx.game.message(
                owner,
                MessageKind::PlanetDepopulated,
                format!("{id} lost its entire population"),
                Some(MapObjectRef::Planet(id)),
            );
        }
    }

    fn recompute_specs_after(&self) -> bool {
        true
    }
}
