use crate::{
    error::RecordError,
    mapping::composite_key,
    records::record::SourceRecord,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub source_id: String,
    pub parent_source_id: Option<String>,
    pub language: Option<String>,
    pub name: String,
    pub position: Option<i64>,
    pub active: bool,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
    pub cms_headline: Option<String>,
    pub cms_text: Option<String>,
}

impl CategoryRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        Ok(CategoryRecord {
            source_id: record
                .string_any(&["categoryID", "category_id", "id"])
                .ok_or_else(|| RecordError::Missing("categoryID".into()))?,
            parent_source_id: record
                .string_any(&["parentID", "parent_id", "parent"])
                .filter(|p| p != "0"),
            language: record.string_any(&["languageID", "language"]),
            name: record
                .string_any(&["description", "name"])
                .ok_or_else(|| RecordError::Missing("description".into()))?,
            position: record.i64("position")?,
            active: record.bool("active")?.unwrap_or(true),
            meta_keywords: record.string("metakeywords"),
            meta_description: record.string("metadescription"),
            cms_headline: record.string("cmsheadline"),
            cms_text: record.string("cmstext"),
        })
    }

    /// Mapping key of this category, language-qualified when a language is set.
    pub fn source_key(&self) -> String {
        composite_key(&self.source_id, self.language.as_deref())
    }

    /// Mapping key of the parent in the same language.
    pub fn parent_key(&self) -> Option<String> {
        self.parent_source_id
            .as_deref()
            .map(|parent| composite_key(parent, self.language.as_deref()))
    }
}

/// One product -> category assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleCategoryRecord {
    pub product_source_id: String,
    pub category_source_id: String,
}

impl ArticleCategoryRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        Ok(ArticleCategoryRecord {
            product_source_id: record
                .string_any(&["productID", "product_id"])
                .ok_or_else(|| RecordError::Missing("productID".into()))?,
            category_source_id: record
                .string_any(&["categoryID", "category_id"])
                .ok_or_else(|| RecordError::Missing("categoryID".into()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_qualified_keys() {
        let record = SourceRecord::new()
            .with("categoryID", 5)
            .with("parentID", 1)
            .with("languageID", "de")
            .with("description", "Shoes");
        let category = CategoryRecord::from_record(&record).unwrap();
        assert_eq!(category.source_key(), "5#de");
        assert_eq!(category.parent_key().as_deref(), Some("1#de"));
        assert!(category.active);
    }

    #[test]
    fn root_categories_have_no_parent_key() {
        let record = SourceRecord::new()
            .with("categoryID", 1)
            .with("parentID", "0")
            .with("name", "Root");
        let category = CategoryRecord::from_record(&record).unwrap();
        assert_eq!(category.parent_key(), None);
        assert_eq!(category.source_key(), "1");
    }
}
