use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ItemView {
    pub name: String,
    pub rarity: String,
    pub color: String,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CaseSummary {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub image: String,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CatalogResponse {
    pub cases: Vec<CaseSummary>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SelectCaseRequest {
    pub case_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionView {
    pub balance: f64,
    pub phase: String,
    pub selected_case: Option<String>,
    pub reel: Option<Vec<ItemView>>,
    pub winning_index: Option<usize>,
    pub result: Option<ItemView>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OpenStatus {
    Started,
    AlreadyOpening,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OpenResponse {
    pub status: OpenStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reel: Vec<ItemView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_after_ms: Option<u64>,
}

impl OpenResponse {
    pub fn already_opening() -> Self {
        Self {
            status: OpenStatus::AlreadyOpening,
            reel: Vec::new(),
            winning_index: None,
            balance: None,
            reveal_after_ms: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OpenLogEntry {
    pub sequence: u64,
    pub ts: DateTime<Utc>,
    pub case_id: String,
    pub case_price: f64,
    pub item_name: String,
    pub item_rarity: String,
    pub item_price: f64,
    pub balance: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InsufficientFunds(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal server error")]
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_opening_serializes_compactly() {
        let json = serde_json::to_string(&OpenResponse::already_opening()).unwrap();
        assert_eq!(json, r#"{"status":"already_opening"}"#);
    }

    #[test]
    fn open_response_reads_back() {
        let json = r#"{"status":"started","reel":[],"winning_index":25,"balance":9997.5,"reveal_after_ms":5500}"#;
        let resp: OpenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, OpenStatus::Started);
        assert_eq!(resp.winning_index, Some(25));
        assert_eq!(resp.reveal_after_ms, Some(5500));
    }
}
