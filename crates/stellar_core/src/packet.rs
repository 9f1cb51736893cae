//! Mineral packets in flight.

use serde::{Deserialize, Serialize};

use crate::cargo::{Cargo, Mineral};
use crate::ids::{PacketId, PlanetId, PlayerId};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// A mineral packet thrown by a mass driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MineralPacket {
    /// Identifier, assigned on insertion.
    pub id: PacketId,
    /// Owning player.
    pub owner: PlayerId,
    /// Position.
    pub position: Vec2Fixed,
    /// Minerals carried.
    pub cargo: Cargo,
    /// Travel speed.
    pub warp: u8,
    /// Speed the launching mass driver is rated for.
    pub safe_warp: u8,
    /// Destination.
    pub target: PlanetId,
    /// Light-years travelled so far.
    #[serde(with = "fixed_serde")]
    pub distance_travelled: Fixed,
}

impl MineralPacket {
    /// A packet launched from `position`.
    #[must_use]
    pub fn new(
        owner: PlayerId,
        position: Vec2Fixed,
        cargo: Cargo,
        warp: u8,
        safe_warp: u8,
        target: PlanetId,
    ) -> Self {
        Self {
            id: PacketId::default(),
            owner,
            position,
            cargo,
            warp,
            safe_warp,
            target,
            distance_travelled: Fixed::ZERO,
        }
    }

    /// Light-years moved per year.
    #[must_use]
    pub fn speed(&self) -> Fixed {
        let warp = i32::from(self.warp);
        Fixed::from_num(warp * warp)
    }

    /// Yearly decay percentage for travelling over the safe speed.
    #[must_use]
    pub fn decay_percent(&self) -> i64 {
        match self.warp.saturating_sub(self.safe_warp) {
            0 => 0,
            1 => 10,
            2 => 25,
            _ => 50,
        }
    }

    /// Apply one year of decay, flooring the loss per mineral.
    pub fn decay(&mut self) {
        let percent = self.decay_percent();
        if percent == 0 {
            return;
        }
        for mineral in Mineral::ALL {
            let loss = self.cargo.mineral(mineral) * percent / 100;
            self.cargo.add(mineral.cargo_type(), -loss);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(warp: u8, safe_warp: u8) -> MineralPacket {
        MineralPacket::new(
            PlayerId(0),
            Vec2Fixed::ZERO,
            Cargo::minerals(100, 40, 0),
            warp,
            safe_warp,
            PlanetId(1),
        )
    }

    #[test]
    fn test_decay_by_overspeed() {
        assert_eq!(packet(6, 6).decay_percent(), 0);
        assert_eq!(packet(7, 6).decay_percent(), 10);
        assert_eq!(packet(8, 6).decay_percent(), 25);
        assert_eq!(packet(10, 6).decay_percent(), 50);
    }

    #[test]
    fn test_decay_floors_loss() {
        let mut p = packet(8, 6);
        p.decay();
        assert_eq!(p.cargo, Cargo::minerals(75, 30, 0));
        assert_eq!(p.speed(), Fixed::from_num(64));
    }
}
