use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// Contact record, always owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// One field of a partial update: either left alone or replaced.
///
/// Deserialising a present key always yields `Value`, so `"phone": null`
/// becomes `Value(None)` for nullable fields while an absent key stays `Unset`
/// (pair with `#[serde(default)]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Unset,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Patch::Unset => None,
            Patch::Value(v) => Some(v),
        }
    }

    fn apply_to(&self, target: &mut T)
    where
        T: Clone,
    {
        if let Patch::Value(v) = self {
            *target = v.clone();
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Value)
    }
}

/// PATCH-style update payload. Only fields set to `Value` are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactPatch {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub email: Patch<String>,
    #[serde(default)]
    pub phone: Patch<Option<String>>,
    #[serde(default)]
    pub address: Patch<Option<String>>,
}

impl ContactPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_unset()
            && self.email.is_unset()
            && self.phone.is_unset()
            && self.address.is_unset()
    }

    pub fn apply(&self, contact: &mut Contact) {
        self.name.apply_to(&mut contact.name);
        self.email.apply_to(&mut contact.email);
        self.phone.apply_to(&mut contact.phone);
        self.address.apply_to(&mut contact.address);
    }
}
