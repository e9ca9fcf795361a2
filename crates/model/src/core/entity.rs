use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Tag of an id mapping row.
///
/// The numeric codes are persisted in the mapping table and must never be
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    /// Source product id -> target article detail id.
    Article,
    Category,
    Customer,
    Order,
    OrderDetail,
    /// Source product id -> fabricated order number.
    ValidNumber,
    /// Bare source category id -> target category used for article assignments.
    CategoryTarget,
    /// Source parent product id -> target article id, written once the first
    /// variant was attached to the parent.
    ArticleParent,
}

impl EntityType {
    pub const ALL: [EntityType; 8] = [
        EntityType::Article,
        EntityType::Category,
        EntityType::Customer,
        EntityType::Order,
        EntityType::OrderDetail,
        EntityType::ValidNumber,
        EntityType::CategoryTarget,
        EntityType::ArticleParent,
    ];

    pub fn code(&self) -> u16 {
        match self {
            EntityType::Article => 1,
            EntityType::Category => 2,
            EntityType::Customer => 3,
            EntityType::Order => 4,
            EntityType::OrderDetail => 5,
            EntityType::ValidNumber => 100,
            EntityType::CategoryTarget => 101,
            EntityType::ArticleParent => 102,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Article => "article",
            EntityType::Category => "category",
            EntityType::Customer => "customer",
            EntityType::Order => "order",
            EntityType::OrderDetail => "order_detail",
            EntityType::ValidNumber => "valid_number",
            EntityType::CategoryTarget => "category_target",
            EntityType::ArticleParent => "article_parent",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown entity type: {s}"))
    }
}

/// The kind of rows a source profile is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceEntity {
    Products,
    Categories,
    ArticleCategories,
    Customers,
    Prices,
    Images,
    Translations,
    Ratings,
    /// Variant rows carrying configurator group/option pairs.
    AttributedProducts,
    Orders,
    OrderDetails,
}

impl SourceEntity {
    pub const ALL: [SourceEntity; 11] = [
        SourceEntity::Products,
        SourceEntity::Categories,
        SourceEntity::ArticleCategories,
        SourceEntity::Customers,
        SourceEntity::Prices,
        SourceEntity::Images,
        SourceEntity::Translations,
        SourceEntity::Ratings,
        SourceEntity::AttributedProducts,
        SourceEntity::Orders,
        SourceEntity::OrderDetails,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceEntity::Products => "products",
            SourceEntity::Categories => "categories",
            SourceEntity::ArticleCategories => "article_categories",
            SourceEntity::Customers => "customers",
            SourceEntity::Prices => "prices",
            SourceEntity::Images => "images",
            SourceEntity::Translations => "translations",
            SourceEntity::Ratings => "ratings",
            SourceEntity::AttributedProducts => "attributed_products",
            SourceEntity::Orders => "orders",
            SourceEntity::OrderDetails => "order_details",
        }
    }
}

impl fmt::Display for SourceEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown source entity: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for t in EntityType::ALL {
            assert_eq!(EntityType::from_code(t.code()), Some(t));
        }
        assert_eq!(EntityType::from_code(7), None);
    }

    #[test]
    fn parses_names() {
        assert_eq!("ValidNumber".parse::<EntityType>(), Err("Unknown entity type: ValidNumber".into()));
        assert_eq!("valid_number".parse::<EntityType>(), Ok(EntityType::ValidNumber));
        assert_eq!("order_details".parse::<SourceEntity>(), Ok(SourceEntity::OrderDetails));
    }
}
