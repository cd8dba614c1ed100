//! Attribute types (Color, Size, Material) and their options (Red, XL, Cotton).

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeType {
    #[serde(skip)]
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeOption {
    #[serde(skip)]
    pub id: i64,
    pub uuid: Uuid,
    #[serde(skip)]
    pub attribute_type_id: i64,
    pub name: String,
}
