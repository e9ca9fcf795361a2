use crate::error::MigrationError;
use model::core::entity::SourceEntity;
use std::{fmt, str::FromStr};

/// One migration step. Steps run in [`StepName::ORDER`] so that every
/// referenced entity is imported before its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepName {
    Categories,
    Products,
    ArticleCategories,
    Prices,
    Images,
    Translations,
    Ratings,
    Configurators,
    Customers,
    Orders,
    OrderDetails,
}

impl StepName {
    pub const ORDER: [StepName; 11] = [
        StepName::Categories,
        StepName::Products,
        StepName::ArticleCategories,
        StepName::Prices,
        StepName::Images,
        StepName::Translations,
        StepName::Ratings,
        StepName::Configurators,
        StepName::Customers,
        StepName::Orders,
        StepName::OrderDetails,
    ];

    /// Source rows this step consumes.
    pub fn entity(&self) -> SourceEntity {
        match self {
            StepName::Categories => SourceEntity::Categories,
            StepName::Products => SourceEntity::Products,
            StepName::ArticleCategories => SourceEntity::ArticleCategories,
            StepName::Prices => SourceEntity::Prices,
            StepName::Images => SourceEntity::Images,
            StepName::Translations => SourceEntity::Translations,
            StepName::Ratings => SourceEntity::Ratings,
            StepName::Configurators => SourceEntity::AttributedProducts,
            StepName::Customers => SourceEntity::Customers,
            StepName::Orders => SourceEntity::Orders,
            StepName::OrderDetails => SourceEntity::OrderDetails,
        }
    }

    /// Step that follows in the full sequence.
    pub fn next(&self) -> Option<StepName> {
        let idx = Self::ORDER.iter().position(|s| s == self)?;
        Self::ORDER.get(idx + 1).copied()
    }

    /// Next step among `steps`, following [`StepName::ORDER`].
    pub fn next_in(&self, steps: &[StepName]) -> Option<StepName> {
        let idx = steps.iter().position(|s| s == self)?;
        steps.get(idx + 1).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Categories => "categories",
            StepName::Products => "products",
            StepName::ArticleCategories => "article_categories",
            StepName::Prices => "prices",
            StepName::Images => "images",
            StepName::Translations => "translations",
            StepName::Ratings => "ratings",
            StepName::Configurators => "configurators",
            StepName::Customers => "customers",
            StepName::Orders => "orders",
            StepName::OrderDetails => "order_details",
        }
    }

    /// Parses and orders a configured step list. Empty means every step.
    pub fn parse_list(names: &[String]) -> Result<Vec<StepName>, MigrationError> {
        if names.is_empty() {
            return Ok(Self::ORDER.to_vec());
        }
        let mut steps = names
            .iter()
            .map(|n| n.parse())
            .collect::<Result<Vec<StepName>, _>>()?;
        steps.sort_by_key(|s| Self::ORDER.iter().position(|o| o == s));
        steps.dedup();
        Ok(steps)
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepName {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Self::ORDER
            .into_iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| MigrationError::UnknownStep(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_follow_dependency_order() {
        assert_eq!(StepName::Categories.next(), Some(StepName::Products));
        assert_eq!(StepName::Orders.next(), Some(StepName::OrderDetails));
        assert_eq!(StepName::OrderDetails.next(), None);
        assert_eq!(StepName::Configurators.entity(), SourceEntity::AttributedProducts);
    }

    #[test]
    fn parses_and_orders_step_lists() {
        let names = vec!["orders".to_string(), "article-categories".to_string(), "orders".into()];
        let steps = StepName::parse_list(&names).unwrap();
        assert_eq!(steps, vec![StepName::ArticleCategories, StepName::Orders]);
        assert_eq!(StepName::ArticleCategories.next_in(&steps), Some(StepName::Orders));
        assert_eq!(StepName::Orders.next_in(&steps), None);
        assert!(matches!(
            "widgets".parse::<StepName>(),
            Err(MigrationError::UnknownStep(_))
        ));
        assert_eq!(StepName::parse_list(&[]).unwrap().len(), 11);
    }
}
