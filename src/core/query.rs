use std::str::FromStr;

use chrono::NaiveDate;

use super::{DATE_FORMAT, Movement, MovementType};

/// A parsed movement filter, built from `item:`/`type:`/`start:`/`end:`
/// tokens as typed on the CLI `list` command.
#[derive(Debug, Default, Clone)]
pub struct Query {
    pub items: Vec<String>,
    pub types: Vec<MovementType>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidToken(String),
    InvalidDate(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidToken(t) => write!(f, "invalid token: {t}"),
            ParseError::InvalidDate(d) => write!(f, "invalid date: {d}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl FromStr for Query {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut q = Query::default();
        for token in s.split_whitespace() {
            if let Some(rest) = token.strip_prefix("item:") {
                q.items.push(rest.to_string());
            } else if let Some(rest) = token.strip_prefix("type:") {
                let t = rest
                    .parse()
                    .map_err(|_| ParseError::InvalidToken(token.into()))?;
                q.types.push(t);
            } else if let Some(rest) = token.strip_prefix("start:") {
                q.start = Some(parse_date(rest)?);
            } else if let Some(rest) = token.strip_prefix("end:") {
                q.end = Some(parse_date(rest)?);
            } else if let Some(rest) = token.strip_prefix("date:") {
                let parts: Vec<&str> = rest.split("..").collect();
                if parts.len() != 2 {
                    return Err(ParseError::InvalidToken(token.into()));
                }
                if !parts[0].is_empty() {
                    q.start = Some(parse_date(parts[0])?);
                }
                if !parts[1].is_empty() {
                    q.end = Some(parse_date(parts[1])?);
                }
            } else {
                return Err(ParseError::InvalidToken(token.into()));
            }
        }
        Ok(q)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| ParseError::InvalidDate(s.into()))
}

impl Query {
    /// Whether the movement passes every clause. Date clauses match on the
    /// business date, not the row timestamp.
    pub fn matches(&self, movement: &Movement) -> bool {
        if let Some(start) = self.start
            && movement.date < start
        {
            return false;
        }
        if let Some(end) = self.end
            && movement.date > end
        {
            return false;
        }
        if !self.items.is_empty() && !self.items.iter().any(|i| i == &movement.item) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&movement.movement_type) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn movement(item: &str, movement_type: MovementType, day: u32) -> Movement {
        Movement {
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            item: item.into(),
            movement_type,
            qty: 1.0,
            rate: 0.0,
            value: 0.0,
            supplier: String::new(),
            ref_no: String::new(),
            remarks: String::new(),
            user: "system".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, day, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn parse_simple_tokens() {
        let q = Query::from_str("item:A001 type:issue start:2025-06-01 end:2025-06-30").unwrap();
        assert_eq!(q.items, vec!["A001"]);
        assert_eq!(q.types, vec![MovementType::Issue]);
        assert_eq!(q.start, Some(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
        assert_eq!(q.end, Some(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()));
    }

    #[test]
    fn parse_date_range_token() {
        let q = Query::from_str("date:2025-06-01..2025-06-07").unwrap();
        assert_eq!(q.start, Some(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
        assert_eq!(q.end, Some(NaiveDate::from_ymd_opt(2025, 6, 7).unwrap()));
        let q = Query::from_str("date:..2025-06-07").unwrap();
        assert_eq!(q.start, None);
        assert_eq!(q.end, Some(NaiveDate::from_ymd_opt(2025, 6, 7).unwrap()));
    }

    #[test]
    fn unknown_token_is_rejected() {
        assert_eq!(
            Query::from_str("bucket:RM").unwrap_err(),
            ParseError::InvalidToken("bucket:RM".into())
        );
        assert!(matches!(
            Query::from_str("start:junk").unwrap_err(),
            ParseError::InvalidDate(_)
        ));
    }

    #[test]
    fn filter_by_item_type_and_window() {
        let movements = vec![
            movement("A001", MovementType::Issue, 5),
            movement("A001", MovementType::Inward, 5),
            movement("B002", MovementType::Issue, 5),
            movement("A001", MovementType::Issue, 20),
        ];
        let q = Query::from_str("item:A001 type:issue date:2025-06-01..2025-06-07").unwrap();
        let hits: Vec<_> = movements.iter().filter(|m| q.matches(m)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].date, NaiveDate::from_ymd_opt(2025, 6, 5).unwrap());
    }
}
