use crate::{
    context::{ImportContext, UnitOfWork},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::malformed,
    outcome::{ImportOutcome, MergePolicy},
};
use async_trait::async_trait;
use connectors::target::rows::ImageRow;
use model::{core::entity::SourceEntity, records::record::SourceRecord, shop::image::ImageRecord};
use tracing::debug;

/// Product images. The file is copied through the context's asset fetcher
/// when one is configured; otherwise the source location is stored as is.
pub struct ImageImporter;

#[async_trait]
impl RecordImporter for ImageImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::Images
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let image = match ImageRecord::from_record(record) {
            Ok(image) => image,
            Err(e) => return Ok(malformed(e)),
        };
        let mut uow = ctx.begin().await?;
        let result = import_image(ctx, &mut uow, &image).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

/// `shirt.front.JPG` -> (`shirt.front`, `jpg`)
fn split_file_name(file_name: &str) -> (&str, String) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext.to_ascii_lowercase()),
        _ => (file_name, String::new()),
    }
}

async fn import_image(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    image: &ImageRecord,
) -> Result<ImportOutcome, RecordFailure> {
    let Some(detail) = ctx
        .resolver()
        .detail_for(
            uow.tx(),
            image.product_source_id.as_deref(),
            image.order_number.as_deref(),
        )
        .await?
    else {
        return Err(RecordFailure::skipped(format!(
            "product {} is not imported",
            image
                .product_source_id
                .as_deref()
                .or(image.order_number.as_deref())
                .unwrap_or_default()
        )));
    };
    let article_id = detail.article_id;

    let file_name = image.file_name();
    let (stem, extension) = split_file_name(file_name);
    if stem.is_empty() {
        return Err(RecordFailure::failed(format!("no file name in '{}'", image.image)));
    }

    let location = image.location(ctx.params.asset_base_path.as_deref());
    let path = match &ctx.assets {
        Some(fetcher) => fetcher.fetch(&location, file_name).await?,
        None => location,
    };

    let existing = uow.tx().image_by_name(article_id, stem).await?;
    let merge = if existing.is_some() {
        MergePolicy::Update
    } else {
        MergePolicy::Insert
    };
    let mut row = existing.unwrap_or_default();

    if image.main {
        uow.tx().clear_main_image(article_id).await?;
        row.main = true;
    } else if !row.main && !uow.tx().has_main_image(article_id).await? {
        // An article without a main image takes its first one.
        row.main = true;
    }

    row.article_id = article_id;
    row.name = stem.to_string();
    row.extension = extension;
    row.path = path;
    if image.description.is_some() {
        row.description.clone_from(&image.description);
    }
    if let Some(position) = image.position {
        row.position = position;
    }

    let id = match merge {
        MergePolicy::Update => {
            uow.tx().update_image(&row).await?;
            row.id
        }
        MergePolicy::Insert => uow.tx().insert_image(&row).await?,
    };
    debug!(article_id, id, name = %row.name, main = row.main, "Wrote image");
    Ok(ImportOutcome::imported(id, merge))
}
