//! Object storage resources (`arn:aws:s3:::bucket/prefix*`) and resource sets.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::condition::ConditionValues;
use crate::error::{AuthzError, Result};
use crate::wildcard;

/// ARN prefix every object storage resource carries.
pub const RESOURCE_ARN_PREFIX: &str = "arn:aws:s3:::";

/// A resource pattern, stored without its ARN prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Resource {
    pattern: String,
}

impl Resource {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// The pattern without the ARN prefix, e.g. `bucket/*`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Matches a `bucket/object` path. `${ns:key}` variables in the pattern
    /// are expanded from `values` first.
    pub fn matches(&self, resource: &str, values: &ConditionValues) -> bool {
        let pattern = wildcard::substitute(&self.pattern, values);

        let cleaned = wildcard::clean_path(resource);
        if cleaned != "." && cleaned == pattern {
            return true;
        }
        wildcard::matches(&pattern, resource)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{RESOURCE_ARN_PREFIX}{}", self.pattern)
    }
}

impl FromStr for Resource {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        let pattern = s.strip_prefix(RESOURCE_ARN_PREFIX).ok_or_else(|| {
            AuthzError::InvalidStatement(format!("resource `{s}` is not an object storage ARN"))
        })?;
        if pattern.is_empty() {
            return Err(AuthzError::InvalidStatement(format!(
                "resource `{s}` has an empty pattern"
            )));
        }
        if pattern.starts_with('/') {
            return Err(AuthzError::InvalidStatement(format!(
                "resource `{s}` has no bucket name"
            )));
        }
        Ok(Resource::new(pattern))
    }
}

impl Serialize for Resource {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The resources a statement applies to, ordered by their ARN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet(BTreeSet<Resource>);

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: Resource) -> bool {
        self.0.insert(resource)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.0.iter()
    }

    /// Whether any resource in the set matches `resource`.
    pub fn matches(&self, resource: &str, values: &ConditionValues) -> bool {
        self.0.iter().any(|r| r.matches(resource, values))
    }
}

impl FromIterator<Resource> for ResourceSet {
    fn from_iter<T: IntoIterator<Item = Resource>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a Resource;
    type IntoIter = std::collections::btree_set::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for ResourceSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResourceSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        let raw = match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(resource) => vec![resource],
            OneOrMany::Many(resources) => resources,
        };
        raw.iter()
            .map(|r| r.parse::<Resource>())
            .collect::<Result<ResourceSet>>()
            .map_err(serde::de::Error::custom)
    }
}
