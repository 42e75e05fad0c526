//! Request parameters shared by several services

use crate::error::HandlerError;
use chrono::{DateTime, NaiveDate};
use finuchet_repo::transaction_repo::TransactionKind;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
pub struct KindQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl KindQuery {
    pub fn kind(self) -> Result<Option<TransactionKind>, HandlerError> {
        parse_kind(self.kind.as_deref())
    }
}

#[derive(Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<String>,
    pub until: Option<String>,
}

impl DateRangeQuery {
    pub fn range(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), HandlerError> {
        let from = parse_date(self.from.as_deref(), "from")?;
        let until = parse_date(self.until.as_deref(), "until")?;
        if let (Some(from), Some(until)) = (from, until) {
            if from > until {
                return Err(HandlerError::bad_request("from must not be after until"));
            }
        }
        Ok((from, until))
    }
}

pub fn parse_kind(kind: Option<&str>) -> Result<Option<TransactionKind>, HandlerError> {
    match kind.filter(|k| !k.is_empty()) {
        None => Ok(None),
        Some(kind) => kind
            .parse()
            .map(Some)
            .map_err(|_| HandlerError::bad_request(format!("Unknown type {}", kind))),
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, whose date part is kept. Empty values count as
/// absent.
pub fn parse_date(date: Option<&str>, field: &str) -> Result<Option<NaiveDate>, HandlerError> {
    let Some(date) = date.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(date).map(|d| d.date_naive()))
        .map(Some)
        .map_err(|_| HandlerError::bad_request(format!("{} must be a YYYY-MM-DD date", field)))
}

/// Tells a missing field (`None`) apart from an explicit `null` (`Some(None)`). Use together with
/// `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn kinds() {
        assert_eq!(parse_kind(None).unwrap(), None);
        assert_eq!(parse_kind(Some("")).unwrap(), None);
        assert_eq!(
            parse_kind(Some("income")).unwrap(),
            Some(TransactionKind::Income)
        );
        assert_eq!(
            parse_kind(Some("EXPENSE")).unwrap(),
            Some(TransactionKind::Expense)
        );
        assert!(parse_kind(Some("transfer")).is_err());
    }

    #[actix_rt::test]
    async fn date_range() {
        let query = DateRangeQuery {
            from: Some("2024-01-01".to_owned()),
            until: Some("2024-01-31".to_owned()),
        };
        let (from, until) = query.range().unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(until, NaiveDate::from_ymd_opt(2024, 1, 31));

        let reversed = DateRangeQuery {
            from: Some("2024-02-01".to_owned()),
            until: Some("2024-01-31".to_owned()),
        };
        assert!(reversed.range().is_err());

        let timestamp = DateRangeQuery {
            from: Some("2024-03-05T10:00:00.000Z".to_owned()),
            until: None,
        };
        assert_eq!(
            timestamp.range().unwrap(),
            (NaiveDate::from_ymd_opt(2024, 3, 5), None)
        );

        let invalid = DateRangeQuery {
            from: Some("01/02/2024".to_owned()),
            until: None,
        };
        assert!(invalid.range().is_err());
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        description: Option<Option<String>>,
    }

    #[actix_rt::test]
    async fn missing_and_null_differ() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.description, None);
        let null: Patch = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(null.description, Some(None));
        let set: Patch = serde_json::from_str(r#"{"description":"x"}"#).unwrap();
        assert_eq!(set.description, Some(Some("x".to_owned())));
    }
}
