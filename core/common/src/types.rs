//! Entity model shared across the Gasp sync modules.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to a record by the remote service.
///
/// Ids are assigned monotonically and never reused. `0` is reserved as
/// the "no id" sentinel and never names a stored record.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    /// The "no id provided" sentinel.
    pub const NONE: EntityId = EntityId(0);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Check if this is the sentinel value.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of records synchronized from the Gasp server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Review,
    User,
    Restaurant,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Review, EntityKind::User, EntityKind::Restaurant];

    /// Name of the local table holding this kind.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Review => "reviews",
            EntityKind::User => "users",
            EntityKind::Restaurant => "restaurants",
        }
    }

    /// Singular label used in status text.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Review => "review",
            EntityKind::User => "user",
            EntityKind::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.table())
    }
}

/// A record synchronized from the remote service.
///
/// Records are immutable once ingested; the only identity is [`Entity::id`].
pub trait Entity:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    const KIND: EntityKind;

    fn id(&self) -> EntityId;
}

/// A restaurant review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: EntityId,
    #[serde(default)]
    pub url: String,
    pub star: i32,
    #[serde(default)]
    pub comment: String,
    /// Reference to the reviewed restaurant (e.g. `/restaurants/3`).
    #[serde(default)]
    pub restaurant: String,
    /// Reference to the author (e.g. `/users/1`).
    #[serde(default)]
    pub user: String,
}

impl Entity for Review {
    const KIND: EntityKind = EntityKind::Review;

    fn id(&self) -> EntityId {
        self.id
    }
}

/// A Gasp user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    #[serde(default)]
    pub url: String,
    pub name: String,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> EntityId {
        self.id
    }
}

/// A restaurant known to the Gasp server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: EntityId,
    #[serde(default)]
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub website: String,
    /// Google Places reference, if the restaurant was added from a search.
    #[serde(default)]
    pub places_id: Option<String>,
}

impl Entity for Restaurant {
    const KIND: EntityKind = EntityKind::Restaurant;

    fn id(&self) -> EntityId {
        self.id
    }
}

/// A fully resolved location of a remote collection.
///
/// The sync core never builds these from parts; they are supplied by
/// the configuration layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri(String);

impl ResourceUri {
    /// Create a new ResourceUri.
    ///
    /// # Errors
    /// - Returns error if `uri` is empty or contains whitespace
    pub fn new(uri: impl Into<String>) -> crate::Result<Self> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(crate::Error::InvalidArgument(
                "Resource URI cannot be empty".to_string(),
            ));
        }
        if uri.chars().any(char::is_whitespace) {
            return Err(crate::Error::InvalidArgument(format!(
                "Resource URI cannot contain whitespace: {:?}",
                uri
            )));
        }
        Ok(Self(uri))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Location of a single record within this collection (`<uri>/<id>`).
    pub fn record(&self, id: EntityId) -> ResourceUri {
        Self(format!("{}/{}", self.0.trim_end_matches('/'), id))
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
