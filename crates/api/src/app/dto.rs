use axum::http::StatusCode;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use tinybank_core::Entity;
use tinybank_ledger::{Account, Transaction, User};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddBalanceRequest {
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    #[serde(default)]
    pub from_account: String,
    #[serde(default)]
    pub to_account: String,
    pub amount: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    #[serde(rename = "return-deleted")]
    pub return_deleted: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "from-date")]
    pub from_date: Option<String>,
    #[serde(rename = "to-date")]
    pub to_date: Option<String>,
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_bool_param(name: &'static str, raw: Option<&str>) -> Result<bool, axum::response::Response> {
    match raw.map(str::trim) {
        None | Some("") => Ok(false),
        Some("true" | "1" | "t" | "TRUE" | "True") => Ok(true),
        Some("false" | "0" | "f" | "FALSE" | "False") => Ok(false),
        Some(other) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_query",
            format!("invalid {name} parameter `{other}`"),
        )),
    }
}

impl HistoryQuery {
    /// Inclusive UTC window: `from-date` 00:00:00 through the last nanosecond
    /// of `to-date`. Either bound defaults to `today`.
    ///
    /// An explicit `to-date` covers that whole day; the reference server cut it
    /// off at midnight, which dropped the day's own transactions.
    pub fn window(
        &self,
        today: NaiveDate,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), axum::response::Response> {
        let from = parse_date("from-date", self.from_date.as_deref())?.unwrap_or(today);
        let to = parse_date("to-date", self.to_date.as_deref())?.unwrap_or(today);

        let start = from.and_time(NaiveTime::MIN).and_utc();
        let end = to
            .and_time(NaiveTime::MIN)
            .and_utc()
            .checked_add_signed(Duration::days(1) - Duration::nanoseconds(1))
            .ok_or_else(|| {
                errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", "to-date out of range")
            })?;
        Ok((start, end))
    }
}

fn parse_date(
    name: &'static str,
    raw: Option<&str>,
) -> Result<Option<NaiveDate>, axum::response::Response> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT).map(Some).map_err(|e| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_query",
                format!("invalid {name} parameter `{s}`: {e}"),
            )
        }),
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn user_to_json(user: &User) -> Value {
    json!({
        "id": user.id().as_str(),
        "name": user.name(),
        "deleted_at": user.deleted_at(),
    })
}

pub fn account_to_json(account: &Account) -> Value {
    json!({
        "id": account.id().as_str(),
        "user_id": account.user_id().as_str(),
        "balance": account.balance(),
        "deleted_at": account.deleted_at(),
    })
}

/// Absent account references are omitted rather than serialised as null.
pub fn transaction_to_json(tx: &Transaction) -> Value {
    let mut body = Map::new();
    body.insert("id".into(), json!(tx.id().as_str()));
    body.insert("type".into(), json!(tx.tx_type().as_str()));
    if let Some(from) = tx.from_account_id() {
        body.insert("from_account".into(), json!(from.as_str()));
    }
    if let Some(to) = tx.to_account_id() {
        body.insert("to_account".into(), json!(to.as_str()));
    }
    body.insert("amount".into(), json!(tx.amount()));
    body.insert("created_at".into(), json!(tx.created_at()));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use tinybank_core::AccountId;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, DATE_FORMAT).unwrap()
    }

    #[test]
    fn window_defaults_to_whole_of_today() {
        let (from, to) = HistoryQuery::default().window(day("2024-05-01")).unwrap();
        assert_eq!(from.to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert_eq!(to.date_naive(), day("2024-05-01"));
        assert_eq!((to.hour(), to.minute(), to.second()), (23, 59, 59));
        assert_eq!(to.nanosecond(), 999_999_999);
    }

    #[test]
    fn to_date_covers_the_whole_day() {
        let query = HistoryQuery {
            from_date: Some("2024-04-01".into()),
            to_date: Some("2024-04-02".into()),
        };
        let (from, to) = query.window(day("2024-05-01")).unwrap();
        assert_eq!(from.date_naive(), day("2024-04-01"));
        assert_eq!(to.date_naive(), day("2024-04-02"));
        assert_eq!(to.hour(), 23);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let query = HistoryQuery {
            from_date: Some("01/04/2024".into()),
            to_date: None,
        };
        let response = query.window(day("2024-05-01")).unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn bool_params() {
        assert!(!parse_bool_param("x", None).unwrap());
        assert!(parse_bool_param("x", Some("true")).unwrap());
        assert!(!parse_bool_param("x", Some("0")).unwrap());
        assert!(parse_bool_param("x", Some("maybe")).is_err());
    }

    #[test]
    fn deposit_json_omits_sender() {
        let tx = Transaction::new_deposit(AccountId::parse("a").unwrap(), 10).unwrap();
        let body = transaction_to_json(&tx);
        assert_eq!(body["type"], "deposit");
        assert_eq!(body["to_account"], "a");
        assert!(body.get("from_account").is_none());
        assert_eq!(body["amount"], 10);
    }
}
