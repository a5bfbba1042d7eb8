use crate::money::Money;
use crate::session::PhaseKind;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("insufficient balance: have {balance}, case costs {price}")]
    InsufficientFunds { balance: Money, price: Money },
    #[error("cannot {operation} while {phase}")]
    InvalidStateTransition {
        operation: &'static str,
        phase: PhaseKind,
    },
    #[error("balance {balance} cannot absorb {amount}")]
    BalanceOverflow { balance: Money, amount: Money },
    #[error("unknown case: {0}")]
    UnknownCase(String),
    #[error("case {0} has no items")]
    EmptyCase(String),
    #[error("reveal task ended before reporting a result")]
    RevealLost,
}

pub type SessionResult<T> = Result<T, SessionError>;
