//! Field reconciliation: raw multi-value metadata into typed contact fields.
//!
//! Each metadata key is run through [`FIELD_RULES`] in order; the first rule
//! whose matcher accepts the key extracts its values. Keys no rule claims are
//! ignored.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::users::UserLookup;

pub const SEEKER_PATH_NONE: &str = "none";
const UNKNOWN_USER_NAME: &str = "Nobody";
const UNKNOWN_USER_LOGIN: &str = "nobody";
const USER_KIND: &str = "user";

/// Insertion-ordered mapping from metadata key to its list of values.
///
/// The first value of a key is its primary value for single-valued fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetadata {
    entries: Vec<(String, Vec<String>)>,
}

impl RawMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value to `key`, creating the key if needed.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Replace every value of `key`, keeping its original position.
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = values,
            None => self.entries.push((key, values)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Primary value of `key`, if the key exists and has at least one value.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K, V> FromIterator<(K, Vec<V>)> for RawMetadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Vec<V>)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (key, values) in iter {
            metadata.insert(key, values.into_iter().map(Into::into).collect());
        }
        metadata
    }
}

/// Classification of a stored yes/no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
    Unrecognized,
}

impl YesNo {
    #[must_use]
    pub fn classify(value: &str) -> Self {
        match value {
            "yes" => Self::Yes,
            "no" => Self::No,
            _ => Self::Unrecognized,
        }
    }
}

/// `"yes"` → true, `"no"` → false, anything else → false.
///
/// Legacy data holds values other than yes/no; they read as false rather
/// than failing the whole batch.
#[must_use]
pub fn yes_no_to_bool(value: &str) -> bool {
    match YesNo::classify(value) {
        YesNo::Yes => true,
        YesNo::No => false,
        YesNo::Unrecognized => {
            tracing::debug!(value, "unrecognized yes/no value; reading as false");
            false
        }
    }
}

/// Parse the leading base-10 integer of `value`; no digits reads as 0 and
/// values past the `i64` range saturate.
///
/// `"1700000000"` → 1700000000, `"42abc"` → 42, `" -7"` → -7, `"soon"` → 0.
#[must_use]
pub fn parse_leading_int(value: &str) -> i64 {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        if !value.is_empty() {
            tracing::debug!(value, "non-numeric integer field; reading as 0");
        }
        return 0;
    }
    let signed = if negative {
        format!("-{digits}").parse::<i64>()
    } else {
        digits.parse::<i64>()
    };
    signed.unwrap_or(if negative { i64::MIN } else { i64::MAX })
}

/// A `"<kind>-<id>"` reference split on its first `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssigneeRef<'a> {
    pub kind: &'a str,
    pub id: Option<&'a str>,
}

#[must_use]
pub fn parse_assignee_ref(value: &str) -> AssigneeRef<'_> {
    match value.split_once('-') {
        Some((kind, id)) => AssigneeRef {
            kind,
            id: Some(id).filter(|id| !id.is_empty()),
        },
        None => AssigneeRef {
            kind: value,
            id: None,
        },
    }
}

/// User id referenced by an `assigned_to` value, when it names a user.
///
/// The id reads like [`parse_leading_int`]: `"user-42abc"` is 42 and
/// `"user-abc"` is 0, which no user has.
#[must_use]
pub fn assigned_user_id(value: &str) -> Option<i64> {
    let reference = parse_assignee_ref(value);
    if reference.kind != USER_KIND {
        return None;
    }
    reference.id.map(parse_leading_int)
}

/// The user a contact is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignee {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "user_login")]
    pub login_name: String,
}

/// Typed fields extracted from one contact's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledFields {
    pub phone_numbers: Vec<String>,
    pub milestones: BTreeMap<String, bool>,
    pub seeker_path: String,
    pub assigned_to: Option<Assignee>,
    pub requires_update: bool,
    pub last_modified: i64,
}

impl Default for ReconciledFields {
    fn default() -> Self {
        Self {
            phone_numbers: Vec::new(),
            milestones: BTreeMap::new(),
            seeker_path: SEEKER_PATH_NONE.to_string(),
            assigned_to: None,
            requires_update: false,
            last_modified: 0,
        }
    }
}

/// One entry of the reconciliation table.
pub struct FieldRule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub apply: fn(&mut ReconciledFields, &str, &[String], &dyn UserLookup),
}

impl std::fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRule").field("name", &self.name).finish()
    }
}

/// Ordered rule table; the first matching rule claims a key.
pub static FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        name: "phone_numbers",
        matches: |key| key.starts_with("contact_phone") && !key.contains("details"),
        apply: |fields, _, values, _| fields.phone_numbers.extend(values.iter().cloned()),
    },
    FieldRule {
        name: "milestone",
        matches: |key| key.starts_with("milestone_"),
        apply: |fields, key, values, _| {
            fields
                .milestones
                .insert(key.to_string(), yes_no_to_bool(primary(values)));
        },
    },
    FieldRule {
        name: "seeker_path",
        matches: |key| key == "seeker_path",
        apply: |fields, _, values, _| {
            let value = primary(values);
            fields.seeker_path = if value.is_empty() {
                SEEKER_PATH_NONE.to_string()
            } else {
                value.to_string()
            };
        },
    },
    FieldRule {
        name: "assigned_to",
        matches: |key| key == "assigned_to",
        apply: |fields, _, values, users| {
            fields.assigned_to = resolve_assignee(primary(values), users);
        },
    },
    FieldRule {
        name: "requires_update",
        matches: |key| key == "requires_update",
        apply: |fields, _, values, _| {
            fields.requires_update = yes_no_to_bool(primary(values));
        },
    },
    FieldRule {
        name: "last_modified",
        matches: |key| key == "last_modified",
        apply: |fields, _, values, _| {
            fields.last_modified = parse_leading_int(primary(values));
        },
    },
];

fn primary(values: &[String]) -> &str {
    values.first().map_or("", String::as_str)
}

fn resolve_assignee(value: &str, users: &dyn UserLookup) -> Option<Assignee> {
    let id = assigned_user_id(value)?;

    let (display_name, login_name) = match users.lookup_user(id) {
        Some(user) => (user.display_name, user.user_login),
        None => (
            UNKNOWN_USER_NAME.to_string(),
            UNKNOWN_USER_LOGIN.to_string(),
        ),
    };

    Some(Assignee {
        id,
        kind: USER_KIND.to_string(),
        display_name,
        login_name,
    })
}

/// Run every metadata key through [`FIELD_RULES`].
#[must_use]
pub fn reconcile_fields(metadata: &RawMetadata, users: &dyn UserLookup) -> ReconciledFields {
    let mut fields = ReconciledFields::default();
    for (key, values) in metadata.iter() {
        if let Some(rule) = FIELD_RULES.iter().find(|rule| (rule.matches)(key)) {
            (rule.apply)(&mut fields, key, values, users);
        }
    }
    fields
}
