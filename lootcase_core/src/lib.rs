pub mod catalog;
pub mod driver;
pub mod error;
pub mod money;
pub mod rarity;
pub mod reel;
pub mod rng;
pub mod selector;
pub mod session;

pub use crate::catalog::{Case, Catalog, Item};
pub use crate::driver::{OpenRecord, Opened, PendingReveal, SessionHandle, SessionSnapshot, HISTORY_LIMIT};
pub use crate::error::{CatalogError, SessionError, SessionResult};
pub use crate::money::Money;
pub use crate::rarity::{RarityColors, RarityTier, RarityWeights, FALLBACK_COLOR, FALLBACK_WEIGHT};
pub use crate::reel::{build_reel, Reel, REEL_LENGTH, WINNING_INDEX};
pub use crate::rng::{derive_hash_hex, rng_from_phrase, session_rng};
pub use crate::selector::OutcomeSelector;
pub use crate::session::{
    OpenOutcome, Phase, PhaseKind, Revelation, Session, SessionConfig, SpinTicket,
    DEFAULT_REVEAL_DELAY, DEFAULT_STARTING_BALANCE,
};
