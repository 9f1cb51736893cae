//! The step abstraction every turn phase implements.
//!
//! A step reads and writes shared game state and the turn context, nothing
//! else. Steps never call each other; the [`TurnGenerator`] runs them in a
//! fixed order.
//!
//! [`TurnGenerator`]: crate::generator::TurnGenerator

use crate::collaborators::Collaborators;
use crate::context::TurnContext;
use crate::game::{Game, OwnedPlanets};

/// Everything a step may touch.
pub struct StepContext<'a> {
    /// Shared game state.
    pub game: &'a mut Game,
    /// Per-turn signals.
    pub turn: &'a mut TurnContext,
    /// External collaborators.
    pub collaborators: &'a mut Collaborators,
}

impl<'a> StepContext<'a> {
    /// Bundle the pieces for one step.
    pub fn new(
        game: &'a mut Game,
        turn: &'a mut TurnContext,
        collaborators: &'a mut Collaborators,
    ) -> Self {
        Self {
            game,
            turn,
            collaborators,
        }
    }
}

/// One phase of turn generation.
pub trait Step {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Gather the work for this step.
    fn pre_process(&mut self, _ctx: &mut StepContext<'_>, _owned_planets: &OwnedPlanets) {}

    /// Do the work.
    fn process(&mut self, ctx: &mut StepContext<'_>);

    /// Record what was done.
    fn post_process(&mut self, _ctx: &mut StepContext<'_>) {}

    /// Whether the generator should recompute every spec after this step.
    fn recompute_specs_after(&self) -> bool {
        false
    }

    /// Run the whole lifecycle once.
    fn execute(&mut self, ctx: &mut StepContext<'_>, owned_planets: &OwnedPlanets) {
        self.pre_process(ctx, owned_planets);
        self.process(ctx);
        self.post_process(ctx);
    }
}
