//! Brand of a product, e.g. Nike, Samsung, Apple.

use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, SimpleObject)]
#[graphql(name = "BrandType", complex)]
pub struct Brand {
    #[serde(skip)]
    #[graphql(skip)]
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Display for Brand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Field values for inserting or overwriting a brand
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBrand {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NewBrand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
