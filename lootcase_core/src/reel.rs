use crate::catalog::Item;
use crate::selector::OutcomeSelector;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Positions shown in one spin.
pub const REEL_LENGTH: usize = 50;

/// Where the winner sits, so every spin decelerates to the same offset.
pub const WINNING_INDEX: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reel {
    pub items: Vec<Item>,
    pub winning_index: usize,
}

impl Reel {
    pub fn winner(&self) -> &Item {
        &self.items[self.winning_index]
    }
}

/// One winning draw followed by independent filler draws for every other
/// position, in order. `None` only for an empty item list.
pub fn build_reel<R: Rng + ?Sized>(
    selector: &OutcomeSelector<'_>,
    rng: &mut R,
    items: &[Item],
) -> Option<Reel> {
    let winner = selector.draw(rng, items)?.clone();
    let mut reel_items = Vec::with_capacity(REEL_LENGTH);
    for position in 0..REEL_LENGTH {
        if position == WINNING_INDEX {
            reel_items.push(winner.clone());
        } else {
            reel_items.push(selector.draw(rng, items)?.clone());
        }
    }
    Some(Reel {
        items: reel_items,
        winning_index: WINNING_INDEX,
    })
}
