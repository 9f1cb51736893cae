//! Salvage decay.

use tracing::debug;

use crate::ids::MapObjectRef;
use crate::step::{Step, StepContext};

/// Salvage loses minerals every year and disappears once empty.
#[derive(Debug, Default)]
pub struct SalvageDecayStep;

impl SalvageDecayStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for SalvageDecayStep {
    fn name(&self) -> &'static str {
        "salvage_decay"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let (percent, min_decay) = (ctx.game.rules.salvage.decay_percent, ctx.game.rules.salvage.min_decay);
        for salvage in ctx.game.salvage.values_mut() {
            salvage.decay(percent, min_decay);
            if salvage.cargo.total() <= 0 {
                debug!(salvage = %salvage.id, "Salvage decayed away");
                ctx.turn.queue_deletion(MapObjectRef::Salvage(salvage.id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cargo::Cargo;
    use crate::map_object::Salvage;
    use crate::math::Vec2Fixed;
    use crate::steps::test_support::TestUniverse;

    #[test]
    fn test_salvage_decays_by_percent_with_minimum() {
        let mut u = TestUniverse::new();
        let id = u.game.add_salvage(Salvage::new(
            Some(u.ann),
            Vec2Fixed::from_ints(400, 400),
            Cargo::minerals(500, 50, 0),
        ));

        u.run(&mut SalvageDecayStep::new());

        assert_eq!(u.game.salvage.get(id).unwrap().cargo, Cargo::minerals(450, 40, 0));
    }

    #[test]
    fn test_empty_salvage_is_removed() {
        let mut u = TestUniverse::new();
        u.game.add_salvage(Salvage::new(None, Vec2Fixed::from_ints(400, 400), Cargo::minerals(5, 8, 10)));

        u.run(&mut SalvageDecayStep::new());

        assert!(u.game.salvage.is_empty());
    }
}
