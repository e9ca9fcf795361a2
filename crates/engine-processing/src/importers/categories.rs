use crate::{
    context::{ImportContext, UnitOfWork},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::malformed,
    outcome::ImportOutcome,
};
use async_trait::async_trait;
use connectors::target::rows::CategoryRow;
use model::{
    core::entity::{EntityType, SourceEntity},
    records::record::SourceRecord,
    shop::category::CategoryRecord,
};
use tracing::debug;

/// Category tree. A child whose parent has not been imported yet is
/// deferred and retried after the rest of the step.
pub struct CategoryImporter;

#[async_trait]
impl RecordImporter for CategoryImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::Categories
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let category = match CategoryRecord::from_record(record) {
            Ok(category) => category,
            Err(e) => return Ok(malformed(e)),
        };

        let parent_id = match category.parent_key() {
            Some(key) => match ctx.resolver().category_parent(&key).await? {
                Some(id) => id,
                None => {
                    return Ok(ImportOutcome::Deferred {
                        reason: format!("parent category {key} is not imported"),
                    });
                }
            },
            None => ctx.params.default_category_parent,
        };

        let mut uow = ctx.begin().await?;
        let result = import_category(ctx, &mut uow, &category, parent_id).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

async fn import_category(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    category: &CategoryRecord,
    parent_id: i64,
) -> Result<ImportOutcome, RecordFailure> {
    let (resolved, existing) = ctx.resolver().category(uow.tx(), category, parent_id).await?;

    let mut row = existing.unwrap_or_default();
    row.parent_id = parent_id;
    row.name = category.name.clone();
    row.active = category.active;
    if let Some(position) = category.position {
        row.position = position;
    }
    overlay(&mut row.meta_keywords, &category.meta_keywords);
    overlay(&mut row.meta_description, &category.meta_description);
    overlay(&mut row.cms_headline, &category.cms_headline);
    overlay(&mut row.cms_text, &category.cms_text);

    let id = match resolved.target_id {
        Some(id) => {
            row.id = id;
            uow.tx().update_category(&row).await?;
            id
        }
        None => uow.tx().insert_category(&row).await?,
    };
    debug!(source_key = %category.source_key(), id, parent_id, via = ?resolved.via, "Wrote category");

    uow.map(EntityType::Category, &category.source_key(), id);
    // Article assignments refer to the bare id; the first language wins.
    uow.map_if_absent(EntityType::CategoryTarget, &category.source_id, id);
    Ok(ImportOutcome::imported(id, resolved.merge))
}

fn overlay(slot: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}
