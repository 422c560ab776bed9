use crate::domain::money::Balance;
use crate::error::ValidationError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A good category together with the variant (region) the buyer picked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub category: String,
    pub variant: String,
}

impl Selection {
    pub fn new(category: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            variant: variant.into(),
        }
    }

    /// The item descriptor persisted on orders, e.g. `Shopify-USA`.
    pub fn descriptor(&self) -> String {
        format!("{}-{}", self.category, self.variant)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.category, self.variant)
    }
}

/// Price table as it appears in configuration.
type PriceTable = BTreeMap<String, BTreeMap<String, Decimal>>;

/// Price table keyed by category, then variant.
///
/// Only variants listed here are offered; there is no fallback price.
/// Loaded prices are rounded to cents and must be positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PriceTable", into = "PriceTable")]
pub struct Catalog {
    categories: BTreeMap<String, BTreeMap<String, Balance>>,
}

impl TryFrom<PriceTable> for Catalog {
    type Error = ValidationError;

    fn try_from(table: PriceTable) -> Result<Self, Self::Error> {
        let mut categories = BTreeMap::new();
        for (category, variants) in table {
            let mut priced = BTreeMap::new();
            for (variant, raw) in variants {
                let price = Balance::new(raw);
                if price.value() <= Decimal::ZERO {
                    let item = Selection::new(category.as_str(), variant.as_str());
                    return Err(ValidationError::NonPositivePrice(item.descriptor()));
                }
                priced.insert(variant, price);
            }
            categories.insert(category, priced);
        }
        Ok(Self { categories })
    }
}

impl From<Catalog> for PriceTable {
    fn from(catalog: Catalog) -> Self {
        catalog
            .categories
            .into_iter()
            .map(|(category, variants)| {
                let prices = variants.into_iter().map(|(v, p)| (v, p.value())).collect();
                (category, prices)
            })
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let shopify = [
            ("USA", dec!(10.00)),
            ("TURKEY", dec!(8.00)),
            ("NETHERLANDS", dec!(12.00)),
        ];
        let amazon = [("USA", dec!(15.00)), ("TURKEY", dec!(15.00))];

        Self::new()
            .with_category("Shopify", shopify.map(|(v, p)| (v, Balance::new(p))))
            .with_category("Amazon", amazon.map(|(v, p)| (v, Balance::new(p))))
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            categories: BTreeMap::new(),
        }
    }

    pub fn with_category<'a>(
        mut self,
        category: &str,
        variants: impl IntoIterator<Item = (&'a str, Balance)>,
    ) -> Self {
        let entry = self.categories.entry(category.to_string()).or_default();
        for (variant, price) in variants {
            entry.insert(variant.to_string(), price);
        }
        self
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// Variants offered for a category with their unit prices, in name order.
    pub fn variants(&self, category: &str) -> Result<Vec<(String, Balance)>, ValidationError> {
        self.categories
            .get(category)
            .map(|v| v.iter().map(|(name, price)| (name.clone(), *price)).collect())
            .ok_or_else(|| ValidationError::UnknownCategory(category.to_string()))
    }

    /// Validates that the variant is offered and returns the selection.
    pub fn select(&self, category: &str, variant: &str) -> Result<Selection, ValidationError> {
        let variants = self
            .categories
            .get(category)
            .ok_or_else(|| ValidationError::UnknownCategory(category.to_string()))?;
        if variants.contains_key(variant) {
            Ok(Selection::new(category, variant))
        } else {
            Err(ValidationError::UnknownVariant {
                category: category.to_string(),
                variant: variant.to_string(),
            })
        }
    }

    pub fn unit_price(&self, selection: &Selection) -> Result<Balance, ValidationError> {
        self.categories
            .get(&selection.category)
            .and_then(|v| v.get(&selection.variant))
            .copied()
            .ok_or_else(|| ValidationError::Unpriced(selection.descriptor()))
    }

    /// `unit_price * quantity`, rounded to two places.
    pub fn total(&self, selection: &Selection, quantity: u32) -> Result<Balance, ValidationError> {
        Ok(self.unit_price(selection)? * quantity)
    }
}
