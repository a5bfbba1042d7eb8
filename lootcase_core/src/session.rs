// Idle -> CaseSelected -> Opening -> ResultShown, back via open_again / change_case.
// Debit at open, credit at reveal; opens while Opening are no-ops.

use crate::catalog::{Case, Item};
use crate::error::{SessionError, SessionResult};
use crate::money::Money;
use crate::rarity::RarityWeights;
use crate::reel::{build_reel, Reel};
use crate::selector::OutcomeSelector;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_STARTING_BALANCE: Money = Money::from_cents(1_000_000);
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(5_500);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub starting_balance: Money,
    /// Visual settle time between the debit and the reveal.
    pub reveal_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            reveal_delay: DEFAULT_REVEAL_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Idle,
    CaseSelected,
    Opening,
    ResultShown,
}

impl PhaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKind::Idle => "idle",
            PhaseKind::CaseSelected => "case_selected",
            PhaseKind::Opening => "opening",
            PhaseKind::ResultShown => "result_shown",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PhaseKind::Idle => "idle",
            PhaseKind::CaseSelected => "a case is selected",
            PhaseKind::Opening => "opening",
            PhaseKind::ResultShown => "a result is shown",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    CaseSelected,
    Opening { reel: Reel },
    ResultShown { reel: Reel, won: Item },
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Idle => PhaseKind::Idle,
            Phase::CaseSelected => PhaseKind::CaseSelected,
            Phase::Opening { .. } => PhaseKind::Opening,
            Phase::ResultShown { .. } => PhaseKind::ResultShown,
        }
    }
}

/// Everything the rendering side needs to animate one spin.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinTicket {
    pub case_id: String,
    pub price: Money,
    pub reel: Reel,
    pub balance: Money,
    pub reveal_after: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    Started(SpinTicket),
    /// A spin is already in flight; nothing happened.
    AlreadyOpening,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Revelation {
    pub case_id: String,
    pub price: Money,
    pub item: Item,
    pub balance: Money,
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    weights: RarityWeights,
    balance: Money,
    selected: Option<Arc<Case>>,
    phase: Phase,
}

impl Session {
    pub fn new(config: SessionConfig, weights: RarityWeights) -> Self {
        Self {
            balance: config.starting_balance,
            config,
            weights,
            selected: None,
            phase: Phase::Idle,
        }
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn selected_case(&self) -> Option<&Arc<Case>> {
        self.selected.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.phase, Phase::Opening { .. })
    }

    pub fn reel(&self) -> Option<&Reel> {
        match &self.phase {
            Phase::Opening { reel } | Phase::ResultShown { reel, .. } => Some(reel),
            Phase::Idle | Phase::CaseSelected => None,
        }
    }

    pub fn last_result(&self) -> Option<&Item> {
        match &self.phase {
            Phase::ResultShown { won, .. } => Some(won),
            _ => None,
        }
    }

    /// Selecting again replaces the case and clears any reel or result.
    pub fn select_case(&mut self, case: Arc<Case>) -> SessionResult<()> {
        if self.is_locked() {
            return Err(self.rejected("select a case"));
        }
        debug!(case = %case.id, "case selected");
        self.selected = Some(case);
        self.phase = Phase::CaseSelected;
        Ok(())
    }

    /// Debits the case price and lays out the reel. The credit waits for [`Session::reveal`].
    pub fn open_case<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SessionResult<OpenOutcome> {
        if self.is_locked() {
            debug!("open ignored, spin already in flight");
            return Ok(OpenOutcome::AlreadyOpening);
        }
        let case = match (&self.phase, &self.selected) {
            (Phase::CaseSelected, Some(case)) => Arc::clone(case),
            _ => return Err(self.rejected("open a case")),
        };
        if self.balance < case.price {
            warn!(case = %case.id, balance = %self.balance, price = %case.price, "insufficient funds");
            return Err(SessionError::InsufficientFunds {
                balance: self.balance,
                price: case.price,
            });
        }

        // the reveal credit must fit whatever the reel lands on
        let top_prize = case.items.iter().map(|i| i.price).max().unwrap_or(Money::ZERO);
        let debited = self
            .balance
            .checked_sub(case.price)
            .filter(|b| b.checked_add(top_prize).is_some())
            .ok_or(SessionError::BalanceOverflow {
                balance: self.balance,
                amount: top_prize,
            })?;

        let selector = OutcomeSelector::new(&self.weights);
        let reel = build_reel(&selector, rng, &case.items)
            .ok_or_else(|| SessionError::EmptyCase(case.id.clone()))?;

        self.balance = debited;
        self.phase = Phase::Opening { reel: reel.clone() };
        info!(case = %case.id, price = %case.price, balance = %self.balance, "case opening");

        Ok(OpenOutcome::Started(SpinTicket {
            case_id: case.id.clone(),
            price: case.price,
            reel,
            balance: self.balance,
            reveal_after: self.config.reveal_delay,
        }))
    }

    /// Fired by the scheduler once the reveal delay elapses.
    pub fn reveal(&mut self) -> SessionResult<Revelation> {
        let reel = match &self.phase {
            Phase::Opening { reel } => reel.clone(),
            _ => return Err(self.rejected("reveal")),
        };
        let case = match &self.selected {
            Some(case) => Arc::clone(case),
            None => return Err(self.rejected("reveal")),
        };
        let won = reel.winner().clone();

        let Some(balance) = self.balance.checked_add(won.price) else {
            // never leave the lock held
            self.phase = Phase::CaseSelected;
            error!(
                case = %case.id,
                balance = %self.balance,
                price = %won.price,
                "credit out of range, spin dropped"
            );
            return Err(SessionError::BalanceOverflow {
                balance: self.balance,
                amount: won.price,
            });
        };
        self.balance = balance;
        info!(
            case = %case.id,
            item = %won.name,
            rarity = %won.rarity,
            price = %won.price,
            balance = %self.balance,
            "item revealed"
        );
        self.phase = Phase::ResultShown {
            reel,
            won: won.clone(),
        };

        Ok(Revelation {
            case_id: case.id.clone(),
            price: case.price,
            item: won,
            balance: self.balance,
        })
    }

    pub fn open_again(&mut self) -> SessionResult<()> {
        if !matches!(self.phase, Phase::ResultShown { .. }) {
            return Err(self.rejected("open again"));
        }
        debug!("back to selected case");
        self.phase = Phase::CaseSelected;
        Ok(())
    }

    pub fn change_case(&mut self) -> SessionResult<()> {
        if !matches!(self.phase, Phase::CaseSelected | Phase::ResultShown { .. }) {
            return Err(self.rejected("change case"));
        }
        debug!("selection cleared");
        self.selected = None;
        self.phase = Phase::Idle;
        Ok(())
    }

    fn rejected(&self, operation: &'static str) -> SessionError {
        let phase = self.phase.kind();
        warn!(operation, %phase, "invalid state transition");
        SessionError::InvalidStateTransition { operation, phase }
    }
}
