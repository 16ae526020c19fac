//! Policy actions, action sets and the catalogue of known actions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::wildcard;

/// Action namespaces accepted in policy documents.
const NAMESPACES: &[&str] = &["s3:", "admin:", "kms:", "sts:"];

/// Object storage actions.
pub const S3_ACTIONS: &[&str] = &[
    "s3:*",
    "s3:AbortMultipartUpload",
    "s3:BypassGovernanceRetention",
    "s3:CreateBucket",
    "s3:DeleteBucket",
    "s3:DeleteBucketCors",
    "s3:DeleteBucketPolicy",
    "s3:DeleteObject",
    "s3:DeleteObjectTagging",
    "s3:DeleteObjectVersion",
    "s3:DeleteObjectVersionTagging",
    "s3:ForceDeleteBucket",
    "s3:GetBucketCors",
    "s3:GetBucketEncryption",
    "s3:GetBucketLocation",
    "s3:GetBucketNotification",
    "s3:GetBucketObjectLockConfiguration",
    "s3:GetBucketPolicy",
    "s3:GetBucketPolicyStatus",
    "s3:GetBucketTagging",
    "s3:GetBucketVersioning",
    "s3:GetLifecycleConfiguration",
    "s3:GetObject",
    "s3:GetObjectAttributes",
    "s3:GetObjectLegalHold",
    "s3:GetObjectRetention",
    "s3:GetObjectTagging",
    "s3:GetObjectVersion",
    "s3:GetObjectVersionAttributes",
    "s3:GetObjectVersionForReplication",
    "s3:GetObjectVersionTagging",
    "s3:GetReplicationConfiguration",
    "s3:HeadBucket",
    "s3:ListAllMyBuckets",
    "s3:ListBucket",
    "s3:ListBucketMultipartUploads",
    "s3:ListBucketVersions",
    "s3:ListMultipartUploadParts",
    "s3:ListenBucketNotification",
    "s3:ListenNotification",
    "s3:PutBucketCors",
    "s3:PutBucketEncryption",
    "s3:PutBucketNotification",
    "s3:PutBucketObjectLockConfiguration",
    "s3:PutBucketPolicy",
    "s3:PutBucketTagging",
    "s3:PutBucketVersioning",
    "s3:PutLifecycleConfiguration",
    "s3:PutObject",
    "s3:PutObjectFanOut",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:PutReplicationConfiguration",
    "s3:ReplicateDelete",
    "s3:ReplicateObject",
    "s3:ReplicateTags",
    "s3:ResetBucketReplicationState",
    "s3:RestoreObject",
];

/// Cluster administration actions.
pub const ADMIN_ACTIONS: &[&str] = &[
    "admin:*",
    "admin:AddUserToGroup",
    "admin:AttachUserOrGroupPolicy",
    "admin:BandwidthMonitor",
    "admin:CancelBatchJob",
    "admin:ConfigUpdate",
    "admin:ConsoleLog",
    "admin:CreatePolicy",
    "admin:CreateServiceAccount",
    "admin:CreateUser",
    "admin:DataUsageInfo",
    "admin:Decommission",
    "admin:DeletePolicy",
    "admin:DeleteUser",
    "admin:DescribeBatchJob",
    "admin:DisableGroup",
    "admin:DisableUser",
    "admin:EnableGroup",
    "admin:EnableUser",
    "admin:ExportBucketMetadata",
    "admin:ExportIAM",
    "admin:GetBucketQuota",
    "admin:GetBucketTarget",
    "admin:GetGroup",
    "admin:GetPolicy",
    "admin:GetUser",
    "admin:Heal",
    "admin:ImportBucketMetadata",
    "admin:ImportIAM",
    "admin:KMSCreateKey",
    "admin:KMSKeyStatus",
    "admin:ListBatchJobs",
    "admin:ListGroups",
    "admin:ListServiceAccounts",
    "admin:ListTier",
    "admin:ListUserPolicies",
    "admin:ListUsers",
    "admin:OBDInfo",
    "admin:Profiling",
    "admin:Prometheus",
    "admin:Rebalance",
    "admin:RemoveServiceAccount",
    "admin:RemoveUserFromGroup",
    "admin:ServerInfo",
    "admin:ServerTrace",
    "admin:ServerUpdate",
    "admin:ServiceRestart",
    "admin:ServiceStop",
    "admin:SetBucketQuota",
    "admin:SetBucketTarget",
    "admin:SetTier",
    "admin:SiteReplicationAdd",
    "admin:SiteReplicationInfo",
    "admin:SiteReplicationOperation",
    "admin:SiteReplicationRemove",
    "admin:SiteReplicationResync",
    "admin:StartBatchJob",
    "admin:StorageInfo",
    "admin:TopLocksInfo",
    "admin:UpdateServiceAccount",
];

/// Key management actions.
pub const KMS_ACTIONS: &[&str] = &[
    "kms:*",
    "kms:API",
    "kms:CreateKey",
    "kms:DeleteKey",
    "kms:ImportKey",
    "kms:KeyStatus",
    "kms:ListKeys",
    "kms:Metrics",
    "kms:Status",
    "kms:Version",
];

/// Security token service actions.
pub const STS_ACTIONS: &[&str] = &["sts:*", "sts:AssumeRole"];

/// Every action a policy can be asked about, in catalogue order.
pub fn supported_actions() -> impl Iterator<Item = Action> {
    S3_ACTIONS
        .iter()
        .chain(ADMIN_ACTIONS)
        .chain(KMS_ACTIONS)
        .chain(STS_ACTIONS)
        .map(|name| Action::new(*name))
}

/// A single policy action such as `s3:GetObject` or a wildcard such as `s3:Get*`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this action, read as a wildcard pattern, covers `other`.
    pub fn matches(&self, other: &Action) -> bool {
        wildcard::matches(&self.0, &other.0)
    }

    pub fn is_admin(&self) -> bool {
        self.0.starts_with("admin:")
    }

    pub fn is_kms(&self) -> bool {
        self.0.starts_with("kms:")
    }

    pub fn is_sts(&self) -> bool {
        self.0.starts_with("sts:")
    }

    /// `*` or a non-empty name in one of the known namespaces.
    pub fn is_valid(&self) -> bool {
        self.0 == "*"
            || NAMESPACES
                .iter()
                .any(|ns| self.0.len() > ns.len() && self.0.starts_with(ns))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// An ordered set of actions; duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet(BTreeSet<Action>);

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, action: Action) -> bool {
        self.0.insert(action)
    }

    pub fn contains(&self, action: &Action) -> bool {
        self.0.contains(action)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.0.iter()
    }

    /// Whether any action in the set, read as a pattern, covers `action`.
    pub fn matches(&self, action: &Action) -> bool {
        self.0.iter().any(|pattern| pattern.matches(action))
    }

    pub fn union(&self, other: &ActionSet) -> ActionSet {
        ActionSet(self.0.union(&other.0).cloned().collect())
    }

    /// Actions of `self` that are not literally present in `other`.
    pub fn difference(&self, other: &ActionSet) -> ActionSet {
        ActionSet(self.0.difference(&other.0).cloned().collect())
    }

    pub fn is_disjoint(&self, other: &ActionSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    /// Action names in set order.
    pub fn to_names(&self) -> Vec<String> {
        self.0.iter().map(|action| action.0.clone()).collect()
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<T: IntoIterator<Item = Action>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[&str; N]> for ActionSet {
    fn from(names: [&str; N]) -> Self {
        names.into_iter().map(Action::from).collect()
    }
}

impl<'a> IntoIterator for &'a ActionSet {
    type Item = &'a Action;
    type IntoIter = std::collections::btree_set::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for ActionSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ActionSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(Action),
            Many(Vec<Action>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(action) => std::iter::once(action).collect(),
            OneOrMany::Many(actions) => actions.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_namespaces() {
        assert!(Action::new("admin:ServerInfo").is_admin());
        assert!(Action::new("kms:Status").is_kms());
        assert!(Action::new("sts:AssumeRole").is_sts());
        assert!(!Action::new("s3:GetObject").is_admin());
    }

    #[test]
    fn test_action_validity() {
        assert!(Action::new("*").is_valid());
        assert!(Action::new("s3:GetObject").is_valid());
        assert!(Action::new("admin:*").is_valid());
        assert!(!Action::new("s3:").is_valid());
        assert!(!Action::new("ec2:RunInstances").is_valid());
        assert!(!Action::new("GetObject").is_valid());
    }

    #[test]
    fn test_wildcard_action_matching() {
        let set = ActionSet::from(["s3:Get*", "admin:ServerInfo"]);
        assert!(set.matches(&Action::new("s3:GetObject")));
        assert!(set.matches(&Action::new("admin:ServerInfo")));
        assert!(!set.matches(&Action::new("s3:PutObject")));
    }

    #[test]
    fn test_set_operations_are_literal() {
        let allowed = ActionSet::from(["s3:GetObject", "s3:PutObject"]);
        let denied = ActionSet::from(["s3:*", "s3:PutObject"]);

        assert_eq!(allowed.difference(&denied), ActionSet::from(["s3:GetObject"]));
        assert!(!allowed.is_disjoint(&denied));
        assert_eq!(allowed.union(&denied).len(), 3);
    }

    #[test]
    fn test_deserialize_one_or_many() {
        let one: ActionSet = serde_json::from_str(r#""s3:GetObject""#).unwrap();
        assert_eq!(one, ActionSet::from(["s3:GetObject"]));

        let many: ActionSet =
            serde_json::from_str(r#"["s3:PutObject", "s3:GetObject", "s3:PutObject"]"#).unwrap();
        assert_eq!(many.to_names(), vec!["s3:GetObject", "s3:PutObject"]);
    }

    #[test]
    fn test_catalogue_has_no_duplicates() {
        let all: Vec<Action> = supported_actions().collect();
        let unique: ActionSet = all.iter().cloned().collect();
        assert_eq!(all.len(), unique.len());
    }
}
