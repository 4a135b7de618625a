//! Boolean circuit from the six comparison bits to the 2-bit pose code.
//!
//! Code layout: `msb * 2 + lsb`, 0 standing, 1 sitting, 2 bending down,
//! 3 lying down.

use contracts::{PoseLabel, PosePredicates};

/// Low bit of the pose code
pub fn lsb(p: &PosePredicates) -> bool {
    let (a, b, c, d, f) = (
        p.torso_ge_30,
        p.thigh_ge_40,
        p.torso_ge_80,
        p.thigh_calf_ge_07,
        p.thigh_ge_60,
    );
    (!a && !b && !d) || (!a && b) || (a && (c || f))
}

/// High bit of the pose code
pub fn msb(p: &PosePredicates) -> bool {
    let (a, b, d, e) = (
        p.torso_ge_30,
        p.thigh_ge_40,
        p.thigh_calf_ge_07,
        p.torso_leg_ge_05,
    );
    (!a && !b && d && !e) || a
}

pub fn pose_code(p: &PosePredicates) -> u8 {
    ((msb(p) as u8) << 1) | lsb(p) as u8
}

pub fn evaluate(p: &PosePredicates) -> PoseLabel {
    PoseLabel::from_code(pose_code(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        // upright, thigh down, long thigh, long torso
        let standing = PosePredicates::from_bits(0b011000);
        assert_eq!(evaluate(&standing), PoseLabel::Standing);

        // flat torso, raised thigh
        let lying = PosePredicates::from_bits(0b100101);
        assert_eq!(pose_code(&lying), 3);

        // leaning torso, thigh still down
        let bending = PosePredicates::from_bits(0b000001);
        assert_eq!(evaluate(&bending), PoseLabel::BendingDown);

        // upright, raised thigh
        let sitting = PosePredicates::from_bits(0b000010);
        assert_eq!(evaluate(&sitting), PoseLabel::Sitting);
    }

    #[test]
    fn test_codes_stay_in_range() {
        for bits in 0u8..64 {
            assert!(pose_code(&PosePredicates::from_bits(bits)) < 4);
        }
    }
}
