// Timed driver around Session: debit under the mutex, reveal from a spawned task.

use crate::catalog::{Case, Catalog, Item};
use crate::error::{SessionError, SessionResult};
use crate::money::Money;
use crate::reel::Reel;
use crate::session::{OpenOutcome, PhaseKind, Revelation, Session, SessionConfig, SpinTicket};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error};

/// Completed opens kept in memory per session.
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenRecord {
    pub sequence: u64,
    pub revealed_at: DateTime<Utc>,
    pub case_id: String,
    pub price: Money,
    pub item: Item,
    pub balance: Money,
}

/// Read-only view for the rendering side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub balance: Money,
    pub phase: PhaseKind,
    pub selected_case: Option<Arc<Case>>,
    pub reel: Option<Reel>,
    pub result: Option<Item>,
}

/// Resolves once the scheduled reveal has fired.
#[derive(Debug)]
pub struct PendingReveal {
    rx: oneshot::Receiver<SessionResult<Revelation>>,
}

impl PendingReveal {
    pub async fn revealed(self) -> SessionResult<Revelation> {
        self.rx.await.unwrap_or(Err(SessionError::RevealLost))
    }
}

#[derive(Debug)]
pub enum Opened {
    Started {
        ticket: SpinTicket,
        reveal: PendingReveal,
    },
    AlreadyOpening,
}

struct Shared {
    session: Session,
    rng: StdRng,
    history: VecDeque<OpenRecord>,
    opens: u64,
}

impl Shared {
    fn record(&mut self, revelation: &Revelation) {
        self.opens += 1;
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(OpenRecord {
            sequence: self.opens,
            revealed_at: Utc::now(),
            case_id: revelation.case_id.clone(),
            price: revelation.price,
            item: revelation.item.clone(),
            balance: revelation.balance,
        });
    }
}

#[derive(Clone)]
pub struct SessionHandle {
    catalog: Arc<Catalog>,
    shared: Arc<Mutex<Shared>>,
}

impl SessionHandle {
    pub fn new(catalog: Arc<Catalog>, config: SessionConfig, rng: StdRng) -> Self {
        let session = Session::new(config, catalog.rarity_weights.clone());
        Self {
            catalog,
            shared: Arc::new(Mutex::new(Shared {
                session,
                rng,
                history: VecDeque::new(),
                opens: 0,
            })),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub async fn select_case(&self, case_id: &str) -> SessionResult<Arc<Case>> {
        let case = self
            .catalog
            .case(case_id)
            .ok_or_else(|| SessionError::UnknownCase(case_id.to_string()))?;
        self.shared.lock().await.session.select_case(Arc::clone(&case))?;
        Ok(case)
    }

    /// Starts a spin and schedules its reveal. Must be called inside a tokio runtime.
    pub async fn open_case(&self) -> SessionResult<Opened> {
        let ticket = {
            let mut guard = self.shared.lock().await;
            let Shared { session, rng, .. } = &mut *guard;
            match session.open_case(rng)? {
                OpenOutcome::Started(ticket) => ticket,
                OpenOutcome::AlreadyOpening => return Ok(Opened::AlreadyOpening),
            }
        };

        let (tx, rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let delay = ticket.reveal_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut guard = shared.lock().await;
            let result = guard.session.reveal();
            match &result {
                Ok(revelation) => guard.record(revelation),
                Err(e) => error!(error = %e, "scheduled reveal failed"),
            }
            drop(guard);
            if tx.send(result).is_err() {
                debug!("reveal receiver dropped");
            }
        });

        Ok(Opened::Started {
            ticket,
            reveal: PendingReveal { rx },
        })
    }

    pub async fn open_again(&self) -> SessionResult<()> {
        self.shared.lock().await.session.open_again()
    }

    pub async fn change_case(&self) -> SessionResult<()> {
        self.shared.lock().await.session.change_case()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.shared.lock().await;
        let session = &guard.session;
        SessionSnapshot {
            balance: session.balance(),
            phase: session.phase().kind(),
            selected_case: session.selected_case().cloned(),
            reel: session.reel().cloned(),
            result: session.last_result().cloned(),
        }
    }

    /// Oldest first.
    pub async fn history(&self) -> Vec<OpenRecord> {
        self.shared.lock().await.history.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::rng_from_phrase;
    use std::time::Duration;

    fn handle() -> SessionHandle {
        SessionHandle::new(
            Arc::new(Catalog::builtin()),
            SessionConfig::default(),
            rng_from_phrase("driver-tests"),
        )
    }

    fn started(opened: Opened) -> (SpinTicket, PendingReveal) {
        match opened {
            Opened::Started { ticket, reveal } => (ticket, reveal),
            Opened::AlreadyOpening => panic!("expected a spin to start"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_waits_for_the_delay() {
        let handle = handle();
        let case = handle.select_case("recoil").await.unwrap();
        let before = handle.snapshot().await.balance;

        let (ticket, reveal) = started(handle.open_case().await.unwrap());
        assert_eq!(ticket.balance, before - case.price);
        // let the reveal task register its timer
        tokio::task::yield_now().await;

        tokio::time::advance(ticket.reveal_after - Duration::from_millis(1)).await;
        let mid = handle.snapshot().await;
        assert_eq!(mid.phase, PhaseKind::Opening);
        assert_eq!(mid.balance, before - case.price);
        assert!(mid.result.is_none());

        let revelation = reveal.revealed().await.unwrap();
        assert_eq!(revelation.item, *ticket.reel.winner());
        let after = handle.snapshot().await;
        assert_eq!(after.phase, PhaseKind::ResultShown);
        assert_eq!(after.balance, before - case.price + revelation.item.price);
        assert_eq!(after.result, Some(revelation.item));
    }

    fn big_prize_handle(case_price: Money, prize: Money, balance: Money) -> SessionHandle {
        let case = Case {
            id: "vault".into(),
            name: "Vault Case".into(),
            price: case_price,
            image: String::new(),
            items: vec![Item::new("Gold | Bar", crate::rarity::RarityTier::Covert, prize)],
        };
        let catalog = Catalog {
            cases: vec![Arc::new(case)],
            ..Catalog::default()
        };
        let config = SessionConfig {
            starting_balance: balance,
            ..SessionConfig::default()
        };
        SessionHandle::new(Arc::new(catalog), config, rng_from_phrase("vault"))
    }

    #[test]
    fn out_of_range_price_never_loads() {
        let json = r#"{"cases":[{"id":"vault","name":"Vault","price":1,
            "items":[{"name":"Gold | Bar","rarity":"Covert","price":1e17}]}]}"#;
        assert!(Catalog::from_json_str(json).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn prize_too_large_for_balance_is_refused_up_front() {
        let handle = big_prize_handle(Money::ZERO, Money::MAX, Money::MAX);
        handle.select_case("vault").await.unwrap();

        let err = handle.open_case().await.unwrap_err();
        assert!(matches!(err, SessionError::BalanceOverflow { .. }));
        let snap = handle.snapshot().await;
        assert_eq!(snap.phase, PhaseKind::CaseSelected);
        assert_eq!(snap.balance, Money::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn largest_prize_reveals_and_unlocks() {
        let handle = big_prize_handle(Money::MAX, Money::MAX, Money::MAX);
        handle.select_case("vault").await.unwrap();

        let (_, reveal) = started(handle.open_case().await.unwrap());
        let revelation = reveal.revealed().await.unwrap();
        assert_eq!(revelation.balance, Money::MAX);
        assert_eq!(handle.snapshot().await.phase, PhaseKind::ResultShown);

        handle.open_again().await.unwrap();
        let (_, reveal) = started(handle.open_case().await.unwrap());
        assert_eq!(reveal.revealed().await.unwrap().balance, Money::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_double_open_spins_once() {
        let handle = handle();
        let case = handle.select_case("fracture").await.unwrap();
        let before = handle.snapshot().await.balance;

        let (_, reveal) = started(handle.open_case().await.unwrap());
        assert!(matches!(
            handle.open_case().await.unwrap(),
            Opened::AlreadyOpening
        ));

        let revelation = reveal.revealed().await.unwrap();
        let history = handle.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sequence, 1);
        assert_eq!(
            handle.snapshot().await.balance,
            before - case.price + revelation.item.price
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_opens_start_one_spin() {
        let handle = handle();
        handle.select_case("budget").await.unwrap();

        let a = tokio::spawn({
            let handle = handle.clone();
            async move { handle.open_case().await }
        });
        let b = tokio::spawn({
            let handle = handle.clone();
            async move { handle.open_case().await }
        });
        let results = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        let started_count = results
            .iter()
            .filter(|r| matches!(r, Opened::Started { .. }))
            .count();
        assert_eq!(started_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_case_is_reported() {
        let handle = handle();
        assert_eq!(
            handle.select_case("missing").await.unwrap_err(),
            SessionError::UnknownCase("missing".into())
        );
        assert_eq!(handle.snapshot().await.phase, PhaseKind::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn insufficient_funds_through_the_handle() {
        let handle = SessionHandle::new(
            Arc::new(Catalog::builtin()),
            SessionConfig {
                starting_balance: Money::from_cents(10),
                ..SessionConfig::default()
            },
            rng_from_phrase("poor"),
        );
        handle.select_case("recoil").await.unwrap();
        assert!(matches!(
            handle.open_case().await,
            Err(SessionError::InsufficientFunds { .. })
        ));
        assert_eq!(handle.snapshot().await.balance, Money::from_cents(10));
    }

    #[tokio::test(start_paused = true)]
    async fn history_is_capped() {
        let handle = SessionHandle::new(
            Arc::new(Catalog::builtin()),
            SessionConfig {
                reveal_delay: Duration::from_millis(10),
                ..SessionConfig::default()
            },
            rng_from_phrase("history"),
        );
        handle.select_case("budget").await.unwrap();
        for _ in 0..(HISTORY_LIMIT + 5) {
            let (_, reveal) = started(handle.open_case().await.unwrap());
            reveal.revealed().await.unwrap();
            handle.open_again().await.unwrap();
        }
        let history = handle.history().await;
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].sequence, 6);
        assert_eq!(
            history.last().map(|r| r.sequence),
            Some((HISTORY_LIMIT + 5) as u64)
        );
    }
}
