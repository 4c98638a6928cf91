//! Product Models
//!
//! The catalog record, the raw request body it is built from, and the
//! validation between the two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Product ==
/// A catalog record as stored and as served.
///
/// The cache layer stores the JSON encoding of this struct verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// == Product Fields ==
/// Validated attributes for create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub name: String,
    pub price: f64,
    pub description: String,
}

impl ProductFields {
    pub fn new(name: impl Into<String>, price: f64, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price,
            description: description.into(),
        }
    }
}

// == Request Body ==
/// A price as clients send it: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    /// The price as a finite number, if it is one.
    fn coerce(&self) -> Option<f64> {
        let value = match self {
            PriceInput::Number(n) => *n,
            PriceInput::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Request body for create (POST) and update (PUT).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<PriceInput>,
    #[serde(default)]
    pub description: Option<String>,
}

pub const REQUIRED_FIELDS_MESSAGE: &str = "Name, price, and description are required";

impl ProductInput {
    /// Checks that every field is present and usable.
    ///
    /// Name and description must contain a non-whitespace character; price
    /// must coerce to a finite number above zero.
    pub fn validate(&self) -> Result<ProductFields, String> {
        let name = non_blank(self.name.as_deref());
        let description = non_blank(self.description.as_deref());
        let price = self.price.as_ref().and_then(PriceInput::coerce);

        match (name, price, description) {
            (Some(name), Some(price), Some(description)) if price > 0.0 => {
                Ok(ProductFields::new(name, price, description))
            }
            (Some(_), Some(_), Some(_)) => Err("Price must be greater than zero".to_string()),
            _ => Err(REQUIRED_FIELDS_MESSAGE.to_string()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<ProductFields> for ProductInput {
    fn from(fields: ProductFields) -> Self {
        Self {
            name: Some(fields.name),
            price: Some(PriceInput::Number(fields.price)),
            description: Some(fields.description),
        }
    }
}
