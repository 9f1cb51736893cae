//! Research.

use tracing::info;

use crate::message::MessageKind;
use crate::player::{TechField, TechLevels};
use crate::rules::{ResearchRules, MAX_TECH_LEVEL};
use crate::step::{Step, StepContext};

/// Cost of the next level in `field`, or `None` once the field is maxed.
#[must_use]
pub fn research_cost(tech: &TechLevels, field: TechField, rules: &ResearchRules) -> Option<i64> {
    let level = tech.get(field);
    if level >= MAX_TECH_LEVEL {
        return None;
    }
    let base = rules.base_costs.get(level as usize + 1)?;
    Some(base + rules.cost_per_known_level * i64::from(tech.sum()))
}

/// Spends each player's research pool on the current field.
#[derive(Debug, Default)]
pub struct ResearchStep;

impl ResearchStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for ResearchStep {
    fn name(&self) -> &'static str {
        "research"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let game = &mut *ctx.game;
        let rules = &game.rules.research;
        for player in game.players.values_mut() {
            player.research_spent += std::mem::take(&mut player.leftover_resources);
            loop {
                let field = player.research_field;
                let Some(cost) = research_cost(&player.tech, field, rules) else {
                    match player.tech.lowest_open_field() {
                        Some(next) if next != field => {
                            player.research_field = next;
                            continue;
                        }
                        _ => break,
                    }
                };
                if player.research_spent < cost {
                    break;
                }
                player.research_spent -= cost;
                let level = player.tech.get_mut(field);
                *level += 1;
                let level = *level;
                info!(player = %player.id, ?field, level, "Tech level gained");
                player.message(
                    MessageKind::TechGained,
                    format!("{field:?} research reached level {level}"),
                    None,
                );
                if level >= MAX_TECH_LEVEL {
                    if let Some(next) = player.tech.lowest_open_field() {
                        player.research_field = next;
                    }
                }
            }
        }
    }
}
