use crate::{error::RecordError, records::record::SourceRecord};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Translatable article fields: source column -> stored translation key.
const ARTICLE_FIELDS: &[(&str, &str)] = &[
    ("name", "txtArtikel"),
    ("description", "txtshortdescription"),
    ("description_long", "txtlangbeschreibung"),
    ("keywords", "txtkeywords"),
    ("additionaltext", "txtzusatztxt"),
    ("metatitle", "metaTitle"),
    ("packunit", "txtpackunit"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationObject {
    Article,
    Variant,
}

impl TranslationObject {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationObject::Article => "article",
            TranslationObject::Variant => "variant",
        }
    }
}

impl fmt::Display for TranslationObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranslationObject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "article" | "product" => Ok(TranslationObject::Article),
            "variant" | "detail" => Ok(TranslationObject::Variant),
            other => Err(format!("Unknown translation object: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub product_source_id: String,
    pub language: String,
    pub object: TranslationObject,
    pub data: BTreeMap<String, String>,
}

impl TranslationRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        let object = match record.string("objecttype") {
            Some(raw) => raw.parse().map_err(|_| RecordError::Invalid {
                field: "objecttype".into(),
                value: raw,
            })?,
            None => TranslationObject::Article,
        };

        let mut data: BTreeMap<String, String> = ARTICLE_FIELDS
            .iter()
            .filter_map(|(column, key)| record.string(column).map(|v| (key.to_string(), v)))
            .collect();
        for slot in 1..=20u8 {
            if let Some(v) = record.string(&format!("attr{slot}")) {
                data.insert(format!("attr{slot}"), v);
            }
        }

        Ok(TranslationRecord {
            product_source_id: record
                .string_any(&["productID", "product_id"])
                .ok_or_else(|| RecordError::Missing("productID".into()))?,
            language: record
                .string_any(&["languageID", "language"])
                .ok_or_else(|| RecordError::Missing("languageID".into()))?,
            object,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_columns_to_translation_keys() {
        let record = SourceRecord::new()
            .with("productID", 4)
            .with("languageID", "en")
            .with("name", "Shirt")
            .with("attr2", "cotton")
            .with("price", 10);
        let translation = TranslationRecord::from_record(&record).unwrap();
        assert_eq!(translation.object, TranslationObject::Article);
        assert_eq!(translation.data.get("txtArtikel").map(String::as_str), Some("Shirt"));
        assert_eq!(translation.data.get("attr2").map(String::as_str), Some("cotton"));
        assert_eq!(translation.data.len(), 2);
    }
}
