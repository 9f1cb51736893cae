//! Terraforming: choosing the next environment step for a planet.
//!
//! Each step moves one axis one point toward the center of the race's
//! range. The axis furthest from its center goes first, so every step
//! improves habitability or leaves it equal. How far a planet can be moved
//! from its original environment depends on biotechnology.

use crate::planet::{Hab, HabAxis};
use crate::player::{Race, TechLevels};

/// Largest offset from the original environment, at any tech level.
pub const MAX_TERRAFORM_OFFSET: i32 = 30;

/// How far this tech can move an axis from its original value.
#[must_use]
pub fn terraform_limit(tech: &TechLevels) -> i32 {
    let biotech = i32::try_from(tech.biotechnology).unwrap_or(i32::MAX);
    biotech.saturating_mul(2).min(MAX_TERRAFORM_OFFSET)
}

fn axis_room(current: &Hab, original: &Hab, race: &Race, limit: i32, axis: HabAxis) -> i32 {
    let range = race.range(axis);
    if range.immune {
        return 0;
    }
    let value = current.get(axis);
    let center = range.center();
    let distance = (center - value).abs();
    if distance == 0 {
        return 0;
    }
    let direction = (center - value).signum();
    let used = (value - original.get(axis)) * direction;
    distance.min(limit - used).max(0)
}

/// The axis and direction (+1 or -1) of the best next step, if any.
#[must_use]
pub fn best_terraform_step(
    current: &Hab,
    original: &Hab,
    race: &Race,
    tech: &TechLevels,
) -> Option<(HabAxis, i32)> {
    let limit = terraform_limit(tech);
    HabAxis::ALL
        .iter()
        .copied()
        .filter(|axis| axis_room(current, original, race, limit, *axis) > 0)
        .max_by(|a, b| {
            let da = (race.range(*a).center() - current.get(*a)).abs();
            let db = (race.range(*b).center() - current.get(*b)).abs();
            // Ties go to the earlier axis.
            da.cmp(&db).then_with(|| b.cmp(a))
        })
        .map(|axis| (axis, (race.range(axis).center() - current.get(axis)).signum()))
}

/// Total steps left before every axis is centered or at its limit.
#[must_use]
pub fn terraform_steps_available(current: &Hab, original: &Hab, race: &Race, tech: &TechLevels) -> i64 {
    let limit = terraform_limit(tech);
    HabAxis::ALL
        .iter()
        .map(|axis| i64::from(axis_room(current, original, race, limit, *axis)))
        .sum()
}

/// Apply the best step to `hab`. Returns the axis changed.
pub fn terraform_once(hab: &mut Hab, original: &Hab, race: &Race, tech: &TechLevels) -> Option<HabAxis> {
    let (axis, direction) = best_terraform_step(hab, original, race, tech)?;
    hab.set(axis, hab.get(axis) + direction);
    Some(axis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::HabRange;

    fn tech(biotechnology: u32) -> TechLevels {
        TechLevels {
            biotechnology,
            ..TechLevels::default()
        }
    }

    #[test]
    fn test_no_biotech_no_terraforming() {
        let hab = Hab::new(20, 50, 50);
        assert!(best_terraform_step(&hab, &hab, &Race::default(), &tech(0)).is_none());
    }

    #[test]
    fn test_furthest_axis_moves_toward_center() {
        let hab = Hab::new(40, 70, 50);
        let step = best_terraform_step(&hab, &hab, &Race::default(), &tech(5));
        assert_eq!(step, Some((HabAxis::Temperature, -1)));
    }

    #[test]
    fn test_limit_and_available_steps() {
        let original = Hab::new(40, 50, 50);
        let race = Race::default();
        // Limit 4 with biotech 2; gravity is 10 from center.
        assert_eq!(terraform_steps_available(&original, &original, &race, &tech(2)), 4);

        let mut hab = original;
        for _ in 0..4 {
            assert_eq!(terraform_once(&mut hab, &original, &race, &tech(2)), Some(HabAxis::Gravity));
        }
        assert_eq!(hab.gravity, 44);
        assert!(terraform_once(&mut hab, &original, &race, &tech(2)).is_none());
    }

    #[test]
    fn test_immune_axis_is_never_terraformed() {
        let race = Race {
            gravity: HabRange::immune(),
            ..Race::default()
        };
        let hab = Hab::new(0, 50, 50);
        assert_eq!(terraform_steps_available(&hab, &hab, &race, &tech(10)), 0);
    }

    #[test]
    fn test_terraforming_never_lowers_habitability() {
        let race = Race::default();
        let original = Hab::new(20, 75, 60);
        let mut hab = original;
        let mut last = race.habitability(&hab, -45);
        while terraform_once(&mut hab, &original, &race, &tech(26)).is_some() {
            let now = race.habitability(&hab, -45);
            assert!(now >= last, "habitability dropped from {last} to {now}");
            last = now;
        }
    }
}
