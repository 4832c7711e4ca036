//! Typed query parameter reader.
//!
//! Reads named query parameters as dates, integers and booleans. Every
//! accessor is total: a missing parameter and a malformed one both come back
//! as `None`. Malformed values are logged at debug level so they can still be
//! diagnosed.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, Uri, request::Parts},
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::context::RequestParts;

/// Query parameter that selects the summary view of a resource.
pub const SUMMARY_PARAM: &str = "_summary";

/// Decoded query parameters of a request, in declared order.
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    params: Vec<(String, String)>,
}

impl QueryParams {
    /// Decodes the query string of a URI.
    pub fn from_uri(uri: &Uri) -> Self {
        Self::parse(uri.query().unwrap_or(""))
    }

    /// Decodes an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Self {
        Self {
            params: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// Returns the first value of a parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns all values of a parameter.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns a parameter as a date/time.
    pub fn get_date(&self, name: &str) -> Option<DateTime<FixedOffset>> {
        let value = self.get(name)?;
        let parsed = parse_date(value);
        if parsed.is_none() {
            debug!(parameter = %name, value = %value, "Ignoring malformed date parameter");
        }
        parsed
    }

    /// Returns a parameter as a 32-bit integer.
    pub fn get_int(&self, name: &str) -> Option<i32> {
        let value = self.get(name)?;
        let parsed = parse_int(value);
        if parsed.is_none() {
            debug!(parameter = %name, value = %value, "Ignoring malformed integer parameter");
        }
        parsed
    }

    /// Returns a parameter as a boolean.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        let value = self.get(name)?;
        let parsed = parse_bool(value);
        if parsed.is_none() {
            debug!(parameter = %name, value = %value, "Ignoring malformed boolean parameter");
        }
        parsed
    }

    /// Returns true when `_summary` is exactly `true`.
    pub fn summary(&self) -> bool {
        self.get(SUMMARY_PARAM) == Some("true")
    }

    /// Returns true when no parameters are present.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over all parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parses a FHIR `dateTime` or an RFC 3339 timestamp.
///
/// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, date-times with or without an
/// offset (offset-less values are UTC) and HTTP dates.
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Some(dt) = parse_date_strict(value) {
        return Some(dt);
    }
    // An unescaped '+' in a query string decodes to a space.
    if value.contains(' ') {
        return parse_date_strict(&value.replace(' ', "+"));
    }
    None
}

fn parse_date_strict(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    let padded = match value.len() {
        4 if value.bytes().all(|b| b.is_ascii_digit()) => format!("{value}-01-01"),
        7 => format!("{value}-01"),
        _ => value.to_string(),
    };
    if let Ok(date) = NaiveDate::parse_from_str(&padded, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().fixed_offset());
    }
    DateTime::parse_from_rfc2822(value).ok()
}

/// Parses a signed 32-bit integer, ignoring surrounding whitespace.
pub fn parse_int(value: &str) -> Option<i32> {
    value.trim().parse().ok()
}

/// Parses a boolean, ignoring surrounding whitespace.
///
/// Only the lowercase literals `true` and `false` are accepted. Numeric
/// forms and other casings are `None`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Typed query parameter accessors for a request.
///
/// Each call decodes the query string afresh; use [`QueryParams`] directly
/// when reading many parameters.
pub trait QueryParamsExt: RequestParts {
    /// Returns the decoded query parameters.
    fn query_params(&self) -> QueryParams {
        QueryParams::from_uri(self.uri())
    }

    /// Returns a parameter as a date/time.
    fn get_date(&self, name: &str) -> Option<DateTime<FixedOffset>> {
        self.query_params().get_date(name)
    }

    /// Returns a parameter as a 32-bit integer.
    fn get_int(&self, name: &str) -> Option<i32> {
        self.query_params().get_int(name)
    }

    /// Returns a parameter as a boolean.
    fn get_bool(&self, name: &str) -> Option<bool> {
        self.query_params().get_bool(name)
    }

    /// Returns true when `_summary` is exactly `true`.
    fn request_summary(&self) -> bool {
        self.query_params().summary()
    }
}

impl<T: RequestParts + ?Sized> QueryParamsExt for T {}

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(QueryParams::from_uri(&parts.uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_get_int() {
        let req = request("/Patient?_count=25");
        assert_eq!(req.get_int("_count"), Some(25));
    }

    #[test]
    fn test_get_int_malformed_is_absent() {
        let req = request("/Patient?count=abc");
        assert_eq!(req.get_int("count"), None);
        assert_eq!(req.get_int("missing"), None);
    }

    #[test]
    fn test_get_int_overflow_is_absent() {
        let req = request("/Patient?count=99999999999");
        assert_eq!(req.get_int("count"), None);
    }

    #[test]
    fn test_get_date_rfc3339() {
        let req = request("/Patient?_since=2024-05-01T10:15:30%2B02:00");
        let date = req.get_date("_since").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-05-01T10:15:30+02:00");
    }

    #[test]
    fn test_get_date_unescaped_plus() {
        let req = request("/Patient?_since=2024-05-01T10:15:30+02:00");
        let date = req.get_date("_since").unwrap();
        assert_eq!(date.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_get_date_partial_forms() {
        assert_eq!(
            parse_date("2024").unwrap().to_rfc3339(),
            "2024-01-01T00:00:00+00:00"
        );
        assert_eq!(
            parse_date("2024-05").unwrap().to_rfc3339(),
            "2024-05-01T00:00:00+00:00"
        );
        assert_eq!(
            parse_date("2024-05-17").unwrap().to_rfc3339(),
            "2024-05-17T00:00:00+00:00"
        );
        assert_eq!(
            parse_date("2024-05-17T08:30:00").unwrap().to_rfc3339(),
            "2024-05-17T08:30:00+00:00"
        );
    }

    #[test]
    fn test_get_date_malformed_is_absent() {
        let req = request("/Patient?_since=not-a-date");
        assert!(req.get_date("_since").is_none());
        assert!(parse_date("2024-13").is_none());
    }

    #[test]
    fn test_get_bool() {
        assert_eq!(request("/x?flag=true").get_bool("flag"), Some(true));
        assert_eq!(request("/x?flag=false").get_bool("flag"), Some(false));
        assert_eq!(request("/x?flag=%20true%20").get_bool("flag"), Some(true));
        assert_eq!(request("/x?flag=1").get_bool("flag"), None);
        assert_eq!(request("/x?flag=0").get_bool("flag"), None);
        assert_eq!(request("/x?flag=TRUE").get_bool("flag"), None);
        assert_eq!(request("/x?flag=False").get_bool("flag"), None);
        assert_eq!(request("/x?flag=yes").get_bool("flag"), None);
        assert_eq!(request("/x?flag=").get_bool("flag"), None);
        assert_eq!(request("/x").get_bool("flag"), None);
    }

    #[test]
    fn test_request_summary_exact_match() {
        assert!(request("/Patient?_summary=true").request_summary());
        assert!(!request("/Patient?_summary=TRUE").request_summary());
        assert!(!request("/Patient?_summary=count").request_summary());
        assert!(!request("/Patient").request_summary());
    }

    #[test]
    fn test_first_value_wins() {
        let params = QueryParams::parse("a=1&a=2&b=x");
        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get_all("a").collect::<Vec<_>>(), vec!["1", "2"]);
    }
}
