//! Field identifiers for search, sort and editing

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stored entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityField {
    /// Immutable identifier
    Id,
    /// Display name
    Name,
    /// Unit price
    Price,
    /// Units in stock
    Quantity,
    /// Category label
    Category,
}

impl EntityField {
    /// All fields in column order
    pub const ALL: [EntityField; 5] = [
        EntityField::Id,
        EntityField::Name,
        EntityField::Price,
        EntityField::Quantity,
        EntityField::Category,
    ];

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityField::Id => "id",
            EntityField::Name => "name",
            EntityField::Price => "price",
            EntityField::Quantity => "quantity",
            EntityField::Category => "category",
        }
    }
}

impl FromStr for EntityField {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(EntityField::Id),
            "name" => Ok(EntityField::Name),
            "price" => Ok(EntityField::Price),
            "quantity" => Ok(EntityField::Quantity),
            "category" => Ok(EntityField::Category),
            other => Err(ParseError::UnknownField(other.to_string())),
        }
    }
}

impl fmt::Display for EntityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field writable through the mutation endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditableField {
    /// Unit price
    Price,
    /// Units in stock
    Quantity,
}

impl EditableField {
    /// Both editable fields
    pub const ALL: [EditableField; 2] = [EditableField::Price, EditableField::Quantity];

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EditableField::Price => "price",
            EditableField::Quantity => "quantity",
        }
    }
}

impl From<EditableField> for EntityField {
    fn from(field: EditableField) -> Self {
        match field {
            EditableField::Price => EntityField::Price,
            EditableField::Quantity => EntityField::Quantity,
        }
    }
}

impl FromStr for EditableField {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" => Ok(EditableField::Price),
            "quantity" => Ok(EditableField::Quantity),
            other => Err(ParseError::NotEditable(other.to_string())),
        }
    }
}

impl fmt::Display for EditableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort key: any stored field or the computed subtotal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Identifier
    #[default]
    Id,
    /// Display name
    Name,
    /// Unit price
    Price,
    /// Units in stock
    Quantity,
    /// Category label
    Category,
    /// `price × quantity`, never stored on the entity
    Subtotal,
}

impl SortField {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::Quantity => "quantity",
            SortField::Category => "category",
            SortField::Subtotal => "subtotal",
        }
    }
}

impl From<EntityField> for SortField {
    fn from(field: EntityField) -> Self {
        match field {
            EntityField::Id => SortField::Id,
            EntityField::Name => SortField::Name,
            EntityField::Price => SortField::Price,
            EntityField::Quantity => SortField::Quantity,
            EntityField::Category => SortField::Category,
        }
    }
}

impl FromStr for SortField {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subtotal" => Ok(SortField::Subtotal),
            other => other.parse::<EntityField>().map(SortField::from),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Asc,
    /// Largest first
    Desc,
}

impl SortDirection {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Opposite direction
    #[inline]
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ParseError::UnknownDirection(s.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
