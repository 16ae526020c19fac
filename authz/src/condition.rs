//! Request-scoped condition values and IAM condition blocks.
//!
//! A condition block maps an operator (optionally qualified with
//! `ForAnyValue:` or `ForAllValues:`) to a set of keys, each with one or more
//! expected values:
//!
//! ```json
//! { "StringEquals": { "s3:prefix": ["docs/"] }, "Bool": { "aws:SecureTransport": "true" } }
//! ```
//!
//! Every operator in a block must hold for the block to hold. Keys are looked
//! up in [`ConditionValues`] by their name without namespace, so `aws:username`
//! reads the `username` entry.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AuthzError, Result};
use crate::wildcard;

/// Key namespaces stripped when looking a condition key up in [`ConditionValues`].
const KEY_NAMESPACES: &[&str] = &["aws", "s3", "jwt", "ldap", "sts", "svc"];

/// Named, request-scoped values that conditional policy clauses are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionValues(BTreeMap<String, Vec<String>>);

impl ConditionValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, replacing any previous values for `key`.
    pub fn with<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.insert(key, values);
        self
    }

    pub fn insert<I, V>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.0
            .insert(key.into(), values.into_iter().map(Into::into).collect());
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// First value stored under `key`, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

/// Strips a known namespace from a condition key: `aws:username` -> `username`.
pub fn key_name(key: &str) -> &str {
    match key.split_once(':') {
        Some((namespace, name)) if KEY_NAMESPACES.contains(&namespace) => name,
        _ => key,
    }
}

/// Set qualifier applied to multi-valued condition keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Qualifier {
    /// Unqualified operator, equivalent to `ForAnyValue` for string operators.
    None,
    ForAnyValue,
    ForAllValues,
}

impl Qualifier {
    fn prefix(self) -> &'static str {
        match self {
            Qualifier::None => "",
            Qualifier::ForAnyValue => "ForAnyValue:",
            Qualifier::ForAllValues => "ForAllValues:",
        }
    }
}

/// Condition operators understood by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operator {
    StringEquals,
    StringNotEquals,
    StringEqualsIgnoreCase,
    StringNotEqualsIgnoreCase,
    StringLike,
    StringNotLike,
    Bool,
    Null,
    NumericEquals,
    NumericNotEquals,
    NumericLessThan,
    NumericLessThanEquals,
    NumericGreaterThan,
    NumericGreaterThanEquals,
    DateEquals,
    DateNotEquals,
    DateLessThan,
    DateLessThanEquals,
    DateGreaterThan,
    DateGreaterThanEquals,
    IpAddress,
    NotIpAddress,
}

impl Operator {
    const ALL: [Operator; 22] = [
        Operator::StringEquals,
        Operator::StringNotEquals,
        Operator::StringEqualsIgnoreCase,
        Operator::StringNotEqualsIgnoreCase,
        Operator::StringLike,
        Operator::StringNotLike,
        Operator::Bool,
        Operator::Null,
        Operator::NumericEquals,
        Operator::NumericNotEquals,
        Operator::NumericLessThan,
        Operator::NumericLessThanEquals,
        Operator::NumericGreaterThan,
        Operator::NumericGreaterThanEquals,
        Operator::DateEquals,
        Operator::DateNotEquals,
        Operator::DateLessThan,
        Operator::DateLessThanEquals,
        Operator::DateGreaterThan,
        Operator::DateGreaterThanEquals,
        Operator::IpAddress,
        Operator::NotIpAddress,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operator::StringEquals => "StringEquals",
            Operator::StringNotEquals => "StringNotEquals",
            Operator::StringEqualsIgnoreCase => "StringEqualsIgnoreCase",
            Operator::StringNotEqualsIgnoreCase => "StringNotEqualsIgnoreCase",
            Operator::StringLike => "StringLike",
            Operator::StringNotLike => "StringNotLike",
            Operator::Bool => "Bool",
            Operator::Null => "Null",
            Operator::NumericEquals => "NumericEquals",
            Operator::NumericNotEquals => "NumericNotEquals",
            Operator::NumericLessThan => "NumericLessThan",
            Operator::NumericLessThanEquals => "NumericLessThanEquals",
            Operator::NumericGreaterThan => "NumericGreaterThan",
            Operator::NumericGreaterThanEquals => "NumericGreaterThanEquals",
            Operator::DateEquals => "DateEquals",
            Operator::DateNotEquals => "DateNotEquals",
            Operator::DateLessThan => "DateLessThan",
            Operator::DateLessThanEquals => "DateLessThanEquals",
            Operator::DateGreaterThan => "DateGreaterThan",
            Operator::DateGreaterThanEquals => "DateGreaterThanEquals",
            Operator::IpAddress => "IpAddress",
            Operator::NotIpAddress => "NotIpAddress",
        }
    }
}

impl FromStr for Operator {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        Operator::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| AuthzError::InvalidCondition(format!("unknown operator `{s}`")))
    }
}

/// One `operator -> key -> values` clause of a condition block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionFunction {
    pub qualifier: Qualifier,
    pub operator: Operator,
    pub key: String,
    pub values: Vec<String>,
}

impl ConditionFunction {
    pub fn new(
        qualifier: Qualifier,
        operator: Operator,
        key: impl Into<String>,
        values: Vec<String>,
    ) -> Result<Self> {
        let function = Self {
            qualifier,
            operator,
            key: key.into(),
            values,
        };
        function.validate()?;
        Ok(function)
    }

    /// The operator name as written in the policy, qualifier included.
    pub fn operator_name(&self) -> String {
        format!("{}{}", self.qualifier.prefix(), self.operator.name())
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(AuthzError::InvalidCondition(format!(
                "{} on `{}`: {reason}",
                self.operator_name(),
                self.key
            )))
        };

        if self.key.is_empty() {
            return invalid("empty key");
        }
        if self.values.is_empty() {
            return invalid("no values");
        }

        match self.operator {
            Operator::Bool | Operator::Null => {
                if self.values.len() != 1 || parse_bool(&self.values[0]).is_none() {
                    return invalid("expected a single boolean");
                }
            }
            Operator::NumericEquals
            | Operator::NumericNotEquals
            | Operator::NumericLessThan
            | Operator::NumericLessThanEquals
            | Operator::NumericGreaterThan
            | Operator::NumericGreaterThanEquals => {
                if self.values.len() != 1 || self.values[0].parse::<i64>().is_err() {
                    return invalid("expected a single integer");
                }
            }
            Operator::DateEquals
            | Operator::DateNotEquals
            | Operator::DateLessThan
            | Operator::DateLessThanEquals
            | Operator::DateGreaterThan
            | Operator::DateGreaterThanEquals => {
                if self.values.len() != 1 || parse_date(&self.values[0]).is_none() {
                    return invalid("expected a single RFC 3339 date");
                }
            }
            Operator::IpAddress | Operator::NotIpAddress => {
                if self.values.iter().any(|v| v.parse::<IpNetwork>().is_err()) {
                    return invalid("expected IP addresses or CIDR blocks");
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Evaluates this clause against request values.
    pub fn evaluate(&self, values: &ConditionValues) -> bool {
        let requested = values.get(key_name(&self.key)).unwrap_or(&[]);

        match self.operator {
            Operator::StringEquals => self.any_string(requested, values, |p, r| p == r),
            Operator::StringNotEquals => !self.any_string(requested, values, |p, r| p == r),
            Operator::StringEqualsIgnoreCase => {
                self.any_string(requested, values, |p, r| p.eq_ignore_ascii_case(r))
            }
            Operator::StringNotEqualsIgnoreCase => {
                !self.any_string(requested, values, |p, r| p.eq_ignore_ascii_case(r))
            }
            Operator::StringLike => self.any_string(requested, values, wildcard::matches),
            Operator::StringNotLike => !self.any_string(requested, values, wildcard::matches),
            Operator::Bool => match (requested.first(), parse_bool(&self.values[0])) {
                (Some(actual), Some(expected)) => parse_bool(actual) == Some(expected),
                _ => false,
            },
            Operator::Null => {
                let absent = requested.iter().all(String::is_empty);
                parse_bool(&self.values[0]) == Some(absent)
            }
            Operator::NumericEquals
            | Operator::NumericNotEquals
            | Operator::NumericLessThan
            | Operator::NumericLessThanEquals
            | Operator::NumericGreaterThan
            | Operator::NumericGreaterThanEquals => {
                let expected = self.values[0].parse::<i64>().ok();
                let actual = requested.first().and_then(|v| v.parse::<i64>().ok());
                match (actual, expected) {
                    (Some(actual), Some(expected)) => self.compare(actual.cmp(&expected)),
                    _ => false,
                }
            }
            Operator::DateEquals
            | Operator::DateNotEquals
            | Operator::DateLessThan
            | Operator::DateLessThanEquals
            | Operator::DateGreaterThan
            | Operator::DateGreaterThanEquals => {
                let expected = parse_date(&self.values[0]);
                let actual = requested.first().and_then(|v| parse_date(v));
                match (actual, expected) {
                    (Some(actual), Some(expected)) => self.compare(actual.cmp(&expected)),
                    _ => false,
                }
            }
            Operator::IpAddress => self.any_ip(requested),
            Operator::NotIpAddress => !self.any_ip(requested),
        }
    }

    /// Positive string match honouring the set qualifier. Policy values have
    /// `${ns:key}` variables expanded first.
    fn any_string(
        &self,
        requested: &[String],
        values: &ConditionValues,
        matcher: impl Fn(&str, &str) -> bool,
    ) -> bool {
        let expected: Vec<String> = self
            .values
            .iter()
            .map(|v| wildcard::substitute(v, values))
            .collect();
        let matches_one =
            |actual: &String| expected.iter().any(|e| matcher(e.as_str(), actual.as_str()));

        match self.qualifier {
            Qualifier::ForAllValues => requested.iter().all(matches_one),
            Qualifier::None | Qualifier::ForAnyValue => requested.iter().any(matches_one),
        }
    }

    fn any_ip(&self, requested: &[String]) -> bool {
        let networks: Vec<IpNetwork> = self.values.iter().filter_map(|v| v.parse().ok()).collect();
        requested
            .iter()
            .filter_map(|v| v.parse::<IpAddr>().ok())
            .any(|ip| networks.iter().any(|net| net.contains(ip)))
    }

    fn compare(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self.operator {
            Operator::NumericEquals | Operator::DateEquals => ordering == Equal,
            Operator::NumericNotEquals | Operator::DateNotEquals => ordering != Equal,
            Operator::NumericLessThan | Operator::DateLessThan => ordering == Less,
            Operator::NumericLessThanEquals | Operator::DateLessThanEquals => ordering != Greater,
            Operator::NumericGreaterThan | Operator::DateGreaterThan => ordering == Greater,
            Operator::NumericGreaterThanEquals | Operator::DateGreaterThanEquals => {
                ordering != Less
            }
            _ => false,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

fn parse_operator(name: &str) -> Result<(Qualifier, Operator)> {
    let (qualifier, rest) = if let Some(rest) = name.strip_prefix("ForAnyValue:") {
        (Qualifier::ForAnyValue, rest)
    } else if let Some(rest) = name.strip_prefix("ForAllValues:") {
        (Qualifier::ForAllValues, rest)
    } else {
        (Qualifier::None, name)
    };
    Ok((qualifier, rest.parse()?))
}

/// A statement's condition block: all clauses must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions(Vec<ConditionFunction>);

impl Conditions {
    pub fn new(functions: Vec<ConditionFunction>) -> Self {
        Self(functions)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn evaluate(&self, values: &ConditionValues) -> bool {
        self.0.iter().all(|function| function.evaluate(values))
    }

    /// Groups the clauses back into `operator -> key -> values` form.
    fn grouped(&self) -> BTreeMap<String, BTreeMap<&str, &[String]>> {
        let mut grouped: BTreeMap<String, BTreeMap<&str, &[String]>> = BTreeMap::new();
        for function in &self.0 {
            grouped
                .entry(function.operator_name())
                .or_default()
                .insert(function.key.as_str(), function.values.as_slice());
        }
        grouped
    }
}

impl Serialize for Conditions {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.grouped().serialize(serializer)
    }
}

/// A single string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Bool(bool),
    Number(serde_json::Number),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Bool(b) => vec![b.to_string()],
            OneOrMany::Number(n) => vec![n.to_string()],
            OneOrMany::Many(list) => list,
        }
    }
}

impl<'de> Deserialize<'de> for Conditions {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, BTreeMap<String, OneOrMany>>::deserialize(deserializer)?;

        let mut functions = Vec::new();
        for (operator, keys) in raw {
            let (qualifier, op) = parse_operator(&operator).map_err(serde::de::Error::custom)?;
            for (key, values) in keys {
                let function = ConditionFunction::new(qualifier, op, key, values.into())
                    .map_err(serde::de::Error::custom)?;
                functions.push(function);
            }
        }
        Ok(Conditions(functions))
    }
}

impl fmt::Display for ConditionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({} => [{}])",
            self.operator_name(),
            self.key,
            self.values.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn conditions(json: &str) -> Conditions {
        serde_json::from_str(json).unwrap()
    }

    fn session_values() -> ConditionValues {
        ConditionValues::new()
            .with("username", ["alice"])
            .with("SecureTransport", ["true"])
            .with("CurrentTime", ["2024-03-01T12:00:00Z"])
            .with("EpochTime", ["1709294400"])
            .with("groups", ["admins"])
    }

    #[test]
    fn test_key_name_strips_known_namespaces() {
        assert_eq!(key_name("aws:username"), "username");
        assert_eq!(key_name("s3:prefix"), "prefix");
        assert_eq!(key_name("jwt:groups"), "groups");
        assert_eq!(key_name("custom:thing"), "custom:thing");
        assert_eq!(key_name("plain"), "plain");
    }

    #[rstest]
    #[case(r#"{"StringEquals": {"aws:username": "alice"}}"#, true)]
    #[case(r#"{"StringEquals": {"aws:username": ["bob", "alice"]}}"#, true)]
    #[case(r#"{"StringEquals": {"aws:username": "bob"}}"#, false)]
    #[case(r#"{"StringNotEquals": {"aws:username": "bob"}}"#, true)]
    #[case(r#"{"StringEqualsIgnoreCase": {"aws:username": "ALICE"}}"#, true)]
    #[case(r#"{"StringLike": {"aws:username": "al*"}}"#, true)]
    #[case(r#"{"StringNotLike": {"aws:username": "al*"}}"#, false)]
    #[case(r#"{"StringEquals": {"s3:prefix": "docs/"}}"#, false)]
    #[case(r#"{"StringNotEquals": {"s3:prefix": "docs/"}}"#, true)]
    #[case(r#"{"Bool": {"aws:SecureTransport": "true"}}"#, true)]
    #[case(r#"{"Bool": {"aws:SecureTransport": false}}"#, false)]
    #[case(r#"{"Null": {"s3:prefix": "true"}}"#, true)]
    #[case(r#"{"Null": {"aws:username": "true"}}"#, false)]
    #[case(r#"{"NumericGreaterThan": {"aws:EpochTime": "1000"}}"#, true)]
    #[case(r#"{"NumericLessThan": {"aws:EpochTime": 1000}}"#, false)]
    #[case(r#"{"DateLessThan": {"aws:CurrentTime": "2030-01-01T00:00:00Z"}}"#, true)]
    #[case(r#"{"DateGreaterThanEquals": {"aws:CurrentTime": "2030-01-01T00:00:00Z"}}"#, false)]
    #[case(r#"{"StringEquals": {"jwt:groups": "${aws:username}"}}"#, false)]
    #[case(r#"{"StringEquals": {"aws:username": "${aws:username}"}}"#, true)]
    fn test_condition_evaluation(#[case] json: &str, #[case] expected: bool) {
        assert_eq!(conditions(json).evaluate(&session_values()), expected, "{json}");
    }

    #[test]
    fn test_all_operators_must_hold() {
        let block = conditions(
            r#"{
                "StringEquals": {"aws:username": "alice"},
                "Bool": {"aws:SecureTransport": "false"}
            }"#,
        );
        assert!(!block.evaluate(&session_values()));
    }

    #[test]
    fn test_ip_address_conditions() {
        let values = ConditionValues::new().with("SourceIp", ["10.1.2.3"]);

        assert!(conditions(r#"{"IpAddress": {"aws:SourceIp": "10.0.0.0/8"}}"#).evaluate(&values));
        assert!(!conditions(r#"{"IpAddress": {"aws:SourceIp": ["192.168.0.0/16"]}}"#)
            .evaluate(&values));
        assert!(conditions(r#"{"NotIpAddress": {"aws:SourceIp": "192.168.0.0/16"}}"#)
            .evaluate(&values));
    }

    #[test]
    fn test_set_qualifiers() {
        let values = ConditionValues::new().with("groups", ["dev", "ops"]);

        assert!(conditions(r#"{"ForAnyValue:StringEquals": {"jwt:groups": "ops"}}"#)
            .evaluate(&values));
        assert!(!conditions(r#"{"ForAllValues:StringEquals": {"jwt:groups": "ops"}}"#)
            .evaluate(&values));
        assert!(conditions(r#"{"ForAllValues:StringEquals": {"jwt:groups": ["ops", "dev"]}}"#)
            .evaluate(&values));
    }

    #[test]
    fn test_empty_block_always_holds() {
        assert!(Conditions::default().evaluate(&ConditionValues::new()));
    }

    #[rstest]
    #[case(r#"{"StringSortOf": {"aws:username": "x"}}"#)]
    #[case(r#"{"Bool": {"aws:SecureTransport": "maybe"}}"#)]
    #[case(r#"{"NumericEquals": {"aws:EpochTime": "soon"}}"#)]
    #[case(r#"{"DateEquals": {"aws:CurrentTime": "yesterday"}}"#)]
    #[case(r#"{"IpAddress": {"aws:SourceIp": "not-an-ip"}}"#)]
    #[case(r#"{"StringEquals": {"aws:username": []}}"#)]
    fn test_invalid_conditions_are_rejected(#[case] json: &str) {
        assert!(serde_json::from_str::<Conditions>(json).is_err(), "{json}");
    }

    #[test]
    fn test_serialization_groups_by_operator() {
        let block = conditions(
            r#"{
                "StringEquals": {"s3:prefix": ["docs/"], "aws:username": "alice"},
                "ForAnyValue:StringLike": {"jwt:groups": "dev*"}
            }"#,
        );

        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "StringEquals": {"s3:prefix": ["docs/"], "aws:username": ["alice"]},
                "ForAnyValue:StringLike": {"jwt:groups": ["dev*"]}
            })
        );
    }
}
