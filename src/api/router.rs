//! Entity router: one generic update over every editable entity kind.
//!
//! The set of kinds is closed. [`EntityKind::resource`] is an exhaustive
//! match, so a new kind without an endpoint does not compile.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::client::ApiClient;
use super::endpoints::{self, Resource};
use super::error::ApiError;
use super::types::identifier_of;

/// Entity kinds that can be updated through [`ApiClient::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Unit,
    Category,
    User,
    Supplier,
    Customer,
    Product,
    Admin,
    Subscription,
    Employee,
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Unit,
        EntityKind::Category,
        EntityKind::User,
        EntityKind::Supplier,
        EntityKind::Customer,
        EntityKind::Product,
        EntityKind::Admin,
        EntityKind::Subscription,
        EntityKind::Employee,
    ];

    /// Short tag used by callers (`"unit"`, `"product"`, ...).
    pub fn tag(self) -> &'static str {
        self.resource().name
    }

    /// The collection this kind belongs to.
    pub fn resource(self) -> &'static Resource {
        match self {
            EntityKind::Unit => &endpoints::UNITS,
            EntityKind::Category => &endpoints::CATEGORIES,
            EntityKind::User => &endpoints::USERS,
            EntityKind::Supplier => &endpoints::SUPPLIERS,
            EntityKind::Customer => &endpoints::CUSTOMERS,
            EntityKind::Product => &endpoints::PRODUCTS,
            EntityKind::Admin => &endpoints::ADMINS,
            EntityKind::Subscription => &endpoints::SUBSCRIPTIONS,
            EntityKind::Employee => &endpoints::EMPLOYEES,
        }
    }

    /// PATCH template for this kind, with an `:id` placeholder.
    pub fn update_template(self) -> &'static str {
        self.resource().update
    }
}

impl FromStr for EntityKind {
    type Err = ApiError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| ApiError::UnsupportedEntity(tag.to_string()))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl ApiClient {
    /// Update an entity given its tag.
    ///
    /// Checks run before any request: the payload must carry an identifier
    /// (`MissingIdentifier`), then the tag must be known (`UnsupportedEntity`).
    pub async fn update<B, T>(&self, entity_type: &str, entity: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_value(entity)
            .map_err(|e| ApiError::InvalidRequest(format!("payload is not serializable: {}", e)))?;
        if identifier_of(&payload).is_none() {
            return Err(ApiError::MissingIdentifier {
                entity: entity_type.to_string(),
            });
        }

        let kind: EntityKind = entity_type.parse()?;
        self.update_entity(kind, &payload).await
    }

    /// Update an entity of a known kind.
    pub async fn update_entity<B, T>(&self, kind: EntityKind, entity: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!("Routing {} update to {}", kind, kind.update_template());
        self.patch(kind.update_template(), entity).await
    }
}
