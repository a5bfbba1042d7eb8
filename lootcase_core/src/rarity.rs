use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Weight used for any tier the weight table has no entry for.
pub const FALLBACK_WEIGHT: f64 = 0.1;

/// Color used for any tier the color table has no entry for.
pub const FALLBACK_COLOR: &str = "#c7d5e0";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RarityTier {
    #[serde(rename = "Consumer Grade")]
    ConsumerGrade,
    #[serde(rename = "Industrial Grade")]
    IndustrialGrade,
    #[serde(rename = "Mil-Spec")]
    MilSpec,
    Restricted,
    Classified,
    Covert,
    #[serde(rename = "Rare Special")]
    RareSpecial,
    /// Any rarity name outside the known set.
    #[serde(other)]
    Unrecognized,
}

impl RarityTier {
    pub const KNOWN: [RarityTier; 7] = [
        RarityTier::ConsumerGrade,
        RarityTier::IndustrialGrade,
        RarityTier::MilSpec,
        RarityTier::Restricted,
        RarityTier::Classified,
        RarityTier::Covert,
        RarityTier::RareSpecial,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            RarityTier::ConsumerGrade => "Consumer Grade",
            RarityTier::IndustrialGrade => "Industrial Grade",
            RarityTier::MilSpec => "Mil-Spec",
            RarityTier::Restricted => "Restricted",
            RarityTier::Classified => "Classified",
            RarityTier::Covert => "Covert",
            RarityTier::RareSpecial => "Rare Special",
            RarityTier::Unrecognized => "Unknown",
        }
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.display_name())
    }
}

/// Tier to selection weight. Weights are relative, they need not sum to anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RarityWeights(pub BTreeMap<RarityTier, f64>);

impl RarityWeights {
    pub fn resolve(&self, tier: RarityTier) -> f64 {
        self.0.get(&tier).copied().unwrap_or(FALLBACK_WEIGHT)
    }

    pub fn is_configured(&self, tier: RarityTier) -> bool {
        self.0.contains_key(&tier)
    }
}

impl Default for RarityWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (RarityTier::ConsumerGrade, 100.0),
            (RarityTier::IndustrialGrade, 90.0),
            (RarityTier::MilSpec, 79.92),
            (RarityTier::Restricted, 15.98),
            (RarityTier::Classified, 3.2),
            (RarityTier::Covert, 0.64),
            (RarityTier::RareSpecial, 0.26),
        ]))
    }
}

/// Tier to display color (`#rrggbb`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RarityColors(pub BTreeMap<RarityTier, String>);

impl RarityColors {
    pub fn resolve(&self, tier: RarityTier) -> &str {
        self.0.get(&tier).map(String::as_str).unwrap_or(FALLBACK_COLOR)
    }
}

impl Default for RarityColors {
    fn default() -> Self {
        let colors = [
            (RarityTier::ConsumerGrade, "#b0c3d9"),
            (RarityTier::IndustrialGrade, "#5e98d9"),
            (RarityTier::MilSpec, "#4b69ff"),
            (RarityTier::Restricted, "#8847ff"),
            (RarityTier::Classified, "#d32ce6"),
            (RarityTier::Covert, "#eb4b4b"),
            (RarityTier::RareSpecial, "#ffd700"),
        ];
        Self(
            colors
                .into_iter()
                .map(|(tier, color)| (tier, color.to_string()))
                .collect(),
        )
    }
}
