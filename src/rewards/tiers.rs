use serde::Serialize;

/// A point threshold unlocking one coupon description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub points: i64,
    pub description: &'static str,
    pub discount: &'static str,
    #[serde(skip)]
    pub code_prefix: &'static str,
}

/// Ascending by `points`.
pub const TIERS: [Tier; 7] = [
    Tier { points: 20, description: "5% off Recycled Stationery", discount: "5% OFF", code_prefix: "STAT5" },
    Tier { points: 40, description: "10% off Eco Toiletries", discount: "10% OFF", code_prefix: "TOIL10" },
    Tier { points: 70, description: "15% off Recycled T-shirt", discount: "15% OFF", code_prefix: "TSHIRT15" },
    Tier { points: 100, description: "Free Eco Tote Bag", discount: "FREE", code_prefix: "TOTE" },
    Tier { points: 150, description: "20% off LED Bulb", discount: "20% OFF", code_prefix: "LED20" },
    Tier { points: 250, description: "Plant a Tree Certificate", discount: "Certificate", code_prefix: "TREE" },
    Tier { points: 400, description: "30% off on eco products", discount: "30% OFF", code_prefix: "ECO30" },
];

pub const FIRST_TIER_POINTS: i64 = TIERS[0].points;

/// Highest tier whose threshold is `<= points`.
pub fn tier_for_points(points: i64) -> Option<&'static Tier> {
    TIERS.iter().rev().find(|t| points >= t.points)
}

/// Smallest tier strictly above `points`.
pub fn next_tier(points: i64) -> Option<&'static Tier> {
    TIERS.iter().find(|t| t.points > points)
}

#[cfg(test)]
pub fn tier_by_threshold(points: i64) -> Option<&'static Tier> {
    TIERS.iter().find(|t| t.points == points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_strictly_ascending() {
        assert!(TIERS.windows(2).all(|w| w[0].points < w[1].points));
    }

    #[test]
    fn selection_is_highest_tier_not_above_points() {
        assert_eq!(tier_for_points(0), None);
        assert_eq!(tier_for_points(19), None);
        assert_eq!(tier_for_points(20).unwrap().points, 20);
        assert_eq!(tier_for_points(39).unwrap().points, 20);
        assert_eq!(tier_for_points(40).unwrap().points, 40);
        assert_eq!(tier_for_points(249).unwrap().points, 150);
        assert_eq!(tier_for_points(400).unwrap().points, 400);
        assert_eq!(tier_for_points(10_000).unwrap().points, 400);
    }

    #[test]
    fn next_tier_is_strictly_above() {
        assert_eq!(next_tier(0).unwrap().points, 20);
        assert_eq!(next_tier(20).unwrap().points, 40);
        assert_eq!(next_tier(399).unwrap().points, 400);
        assert_eq!(next_tier(400), None);
    }

    #[test]
    fn lookup_by_exact_threshold() {
        assert_eq!(tier_by_threshold(100).unwrap().description, "Free Eco Tote Bag");
        assert_eq!(tier_by_threshold(101), None);
    }
}
