// One weighted draw per open; unknown rarities get FALLBACK_WEIGHT.

use crate::catalog::Item;
use crate::rarity::RarityWeights;
use rand::Rng;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub struct OutcomeSelector<'w> {
    weights: &'w RarityWeights,
}

impl<'w> OutcomeSelector<'w> {
    pub fn new(weights: &'w RarityWeights) -> Self {
        Self { weights }
    }

    pub fn weight_of(&self, item: &Item) -> f64 {
        self.weights.resolve(item.rarity)
    }

    /// Selection probability of each item, in list order.
    pub fn probabilities(&self, items: &[Item]) -> Vec<f64> {
        let total: f64 = items.iter().map(|i| self.weight_of(i)).sum();
        items.iter().map(|i| self.weight_of(i) / total).collect()
    }

    /// Expected catalog value of a single draw.
    pub fn expected_value(&self, items: &[Item]) -> f64 {
        self.probabilities(items)
            .iter()
            .zip(items)
            .map(|(p, item)| p * item.price.as_f64())
            .sum()
    }

    /// Draws one item. `None` only for an empty list.
    pub fn draw<'a, R: Rng + ?Sized>(&self, rng: &mut R, items: &'a [Item]) -> Option<&'a Item> {
        if items.is_empty() {
            return None;
        }
        let r: f64 = rng.gen();
        match self.walk(items, r) {
            Some(item) => Some(item),
            None => {
                // cumulative sum fell short of r through rounding
                trace!(r, "weighted walk missed, drawing uniformly");
                items.get(rng.gen_range(0..items.len()))
            }
        }
    }

    fn walk<'a>(&self, items: &'a [Item], r: f64) -> Option<&'a Item> {
        let total: f64 = items.iter().map(|i| self.weight_of(i)).sum();
        let mut cumulative = 0.0;
        for item in items {
            cumulative += self.weight_of(item) / total;
            if r <= cumulative {
                return Some(item);
            }
        }
        None
    }
}
