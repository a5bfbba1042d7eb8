use crate::error::CatalogError;
use crate::money::Money;
use crate::rarity::{RarityColors, RarityTier, RarityWeights};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// `"Weapon | Skin"`
    pub name: String,
    pub rarity: RarityTier,
    pub price: Money,
}

impl Item {
    pub fn new(name: impl Into<String>, rarity: RarityTier, price: Money) -> Self {
        Self {
            name: name.into(),
            rarity,
            price,
        }
    }

    pub fn weapon(&self) -> &str {
        self.name.split('|').next().unwrap_or_default().trim()
    }

    pub fn skin(&self) -> &str {
        self.name.split('|').nth(1).map(str::trim).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub image: String,
    pub items: Vec<Item>,
}

/// Static configuration: the cases on offer plus the rarity tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub cases: Vec<Arc<Case>>,
    #[serde(default)]
    pub rarity_weights: RarityWeights,
    #[serde(default)]
    pub rarity_colors: RarityColors,
}

impl Catalog {
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn case(&self, id: &str) -> Option<Arc<Case>> {
        self.cases.iter().find(|c| c.id == id).cloned()
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.cases.is_empty() {
            return Err(CatalogError::Invalid("catalog has no cases".into()));
        }
        for (tier, weight) in &self.rarity_weights.0 {
            if !weight.is_finite() || *weight <= 0.0 {
                return Err(CatalogError::Invalid(format!(
                    "weight for {tier} must be positive, got {weight}"
                )));
            }
        }
        let mut ids = HashSet::new();
        for case in &self.cases {
            if !ids.insert(case.id.as_str()) {
                return Err(CatalogError::Invalid(format!("duplicate case id {}", case.id)));
            }
            if case.items.is_empty() {
                return Err(CatalogError::Invalid(format!("case {} has no items", case.id)));
            }
            if !price_in_range(case.price) {
                return Err(CatalogError::Invalid(format!(
                    "case {} price {} is outside 0..={}",
                    case.id,
                    case.price,
                    Money::MAX
                )));
            }
            for item in &case.items {
                if !price_in_range(item.price) {
                    return Err(CatalogError::Invalid(format!(
                        "item {} in case {} price {} is outside 0..={}",
                        item.name,
                        case.id,
                        item.price,
                        Money::MAX
                    )));
                }
                if !self.rarity_weights.is_configured(item.rarity) {
                    warn!(
                        case = %case.id,
                        item = %item.name,
                        rarity = %item.rarity,
                        "no weight configured for rarity, fallback weight applies"
                    );
                }
            }
        }
        Ok(())
    }

    /// Catalog compiled into the crate, used when no file is supplied.
    pub fn builtin() -> Self {
        use RarityTier::*;

        let item = |name: &str, rarity, cents| Item::new(name, rarity, Money::from_cents(cents));
        let cases = vec![
            Case {
                id: "recoil".into(),
                name: "Recoil Case".into(),
                price: Money::from_cents(250),
                image: "images/recoil-case.png".into(),
                items: vec![
                    item("Glock-18 | Winterized", MilSpec, 12),
                    item("UMP-45 | Roadblock", MilSpec, 9),
                    item("FAMAS | Meow 36", MilSpec, 14),
                    item("Galil AR | Destroyer", MilSpec, 11),
                    item("M4A4 | Poly Mag", Restricted, 95),
                    item("MAC-10 | Monkeyflage", Restricted, 88),
                    item("Dual Berettas | Flora Carnivora", Restricted, 102),
                    item("AK-47 | Ice Coaled", Classified, 420),
                    item("P250 | Visions", Classified, 390),
                    item("USP-S | Printstream", Covert, 4_875),
                    item("AWP | Chromatic Aberration", Covert, 2_950),
                    item("Sport Gloves | Slingshot", RareSpecial, 31_500),
                ],
            },
            Case {
                id: "fracture".into(),
                name: "Fracture Case".into(),
                price: Money::from_cents(60),
                image: "images/fracture-case.png".into(),
                items: vec![
                    item("Negev | Ultralight", MilSpec, 5),
                    item("P2000 | Gnarled", MilSpec, 6),
                    item("SG 553 | Ol' Rusty", MilSpec, 4),
                    item("P90 | Freight", MilSpec, 7),
                    item("MAC-10 | Allure", Restricted, 48),
                    item("Galil AR | Connexion", Restricted, 52),
                    item("MP5-SD | Kitbash", Restricted, 45),
                    item("XM1014 | Entombed", Classified, 310),
                    item("Glock-18 | Vogue", Classified, 285),
                    item("AK-47 | Legion of Anubis", Covert, 1_240),
                    item("Desert Eagle | Printstream", Covert, 3_860),
                    item("Karambit | Gamma Doppler", RareSpecial, 98_000),
                ],
            },
            Case {
                id: "budget".into(),
                name: "Budget Collection".into(),
                price: Money::from_cents(25),
                image: "images/budget-collection.png".into(),
                items: vec![
                    item("Nova | Sand Dune", ConsumerGrade, 3),
                    item("P90 | Storm", ConsumerGrade, 2),
                    item("MP9 | Sand Dashed", IndustrialGrade, 6),
                    item("Sawed-Off | Snake Camo", IndustrialGrade, 8),
                    item("AUG | Storm", MilSpec, 21),
                    item("Tec-9 | VariCamo", Restricted, 74),
                    item("M4A1-S | VariCamo", Classified, 260),
                ],
            },
        ];

        Self {
            cases: cases.into_iter().map(Arc::new).collect(),
            rarity_weights: RarityWeights::default(),
            rarity_colors: RarityColors::default(),
        }
    }
}

fn price_in_range(price: Money) -> bool {
    (Money::ZERO..=Money::MAX).contains(&price)
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
