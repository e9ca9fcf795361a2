use crate::{
    context::{ImportContext, UnitOfWork, remap_id},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::malformed,
    outcome::{ImportOutcome, MergePolicy},
};
use async_trait::async_trait;
use connectors::target::rows::TranslationRow;
use model::{
    core::entity::SourceEntity,
    records::record::SourceRecord,
    shop::translation::{TranslationObject, TranslationRecord},
};

/// Article and variant translations. Fields are merged into whatever was
/// stored for the same object and language before.
pub struct TranslationImporter;

#[async_trait]
impl RecordImporter for TranslationImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::Translations
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let translation = match TranslationRecord::from_record(record) {
            Ok(translation) => translation,
            Err(e) => return Ok(malformed(e)),
        };
        let mut uow = ctx.begin().await?;
        let result = import_translation(ctx, &mut uow, &translation).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

async fn import_translation(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    translation: &TranslationRecord,
) -> Result<ImportOutcome, RecordFailure> {
    if translation.data.is_empty() {
        return Err(RecordFailure::skipped("no translatable fields"));
    }
    let language_id = remap_id(
        "languages",
        ctx.params.remap.language(&translation.language),
        &translation.language,
    )?;

    let Some(detail) = ctx
        .resolver()
        .detail_for(uow.tx(), Some(&translation.product_source_id), None)
        .await?
    else {
        return Err(RecordFailure::skipped(format!(
            "product {} is not imported",
            translation.product_source_id
        )));
    };
    let object_key = match translation.object {
        TranslationObject::Article => detail.article_id,
        TranslationObject::Variant => detail.id,
    };
    let object_type = translation.object.as_str();

    let existing = uow
        .tx()
        .translation(object_type, object_key, language_id)
        .await?;
    let merge = if existing.is_some() {
        MergePolicy::Update
    } else {
        MergePolicy::Insert
    };
    let mut data = existing.unwrap_or_default();
    data.extend(translation.data.clone());

    uow.tx()
        .write_translation(&TranslationRow {
            object_type: object_type.to_string(),
            object_key,
            language_id,
            data,
        })
        .await?;
    Ok(ImportOutcome::imported(object_key, merge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{importers::products::ProductImporter, test_support::fixture};

    fn translation(language: &str) -> SourceRecord {
        SourceRecord::new()
            .with("productID", 1)
            .with("languageID", language)
    }

    #[tokio::test]
    async fn fields_merge_into_stored_translation() {
        let f = fixture();
        ProductImporter
            .import(
                &f.ctx,
                &SourceRecord::new()
                    .with("productID", 1)
                    .with("ordernumber", "SW-1")
                    .with("supplier", "ACME"),
            )
            .await
            .unwrap();

        let first = TranslationImporter
            .import(&f.ctx, &translation("2").with("name", "Shirt"))
            .await
            .unwrap();
        let second = TranslationImporter
            .import(&f.ctx, &translation("2").with("keywords", "cotton"))
            .await
            .unwrap();
        assert_eq!(first, ImportOutcome::inserted(1));
        assert_eq!(second, ImportOutcome::updated(1));

        let state = f.target.snapshot().await;
        let stored = &state.translations[&("article".to_string(), 1, 2)];
        assert_eq!(stored.get("txtArtikel").map(String::as_str), Some("Shirt"));
        assert_eq!(stored.get("txtkeywords").map(String::as_str), Some("cotton"));
    }

    #[tokio::test]
    async fn unmapped_language_fails() {
        let f = fixture();
        let outcome = TranslationImporter
            .import(&f.ctx, &translation("en").with("name", "Shirt"))
            .await
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::Failed { .. }));
    }
}
