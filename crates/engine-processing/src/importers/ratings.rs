use crate::{
    context::{ImportContext, UnitOfWork},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::malformed,
    outcome::{ImportOutcome, MergePolicy},
};
use async_trait::async_trait;
use connectors::target::rows::VoteRow;
use model::{core::entity::SourceEntity, records::record::SourceRecord, shop::rating::RatingRecord};

/// Product votes, matched on (article, author, headline).
pub struct RatingImporter;

#[async_trait]
impl RecordImporter for RatingImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::Ratings
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let rating = match RatingRecord::from_record(record) {
            Ok(rating) => rating,
            Err(e) => return Ok(malformed(e)),
        };
        let mut uow = ctx.begin().await?;
        let result = import_rating(ctx, &mut uow, &rating).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

async fn import_rating(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    rating: &RatingRecord,
) -> Result<ImportOutcome, RecordFailure> {
    let Some(detail) = ctx
        .resolver()
        .detail_for(uow.tx(), Some(&rating.product_source_id), None)
        .await?
    else {
        return Err(RecordFailure::skipped(format!(
            "product {} is not imported",
            rating.product_source_id
        )));
    };

    let mut row = VoteRow {
        id: 0,
        article_id: detail.article_id,
        author: rating.author.clone(),
        headline: rating.headline.clone(),
        comment: rating.comment.clone(),
        points: rating.points,
        active: rating.active,
        email: rating.email.clone(),
        created_at: rating.created_at,
    };

    match uow
        .tx()
        .vote_by_key(row.article_id, &row.author, &row.headline)
        .await?
    {
        Some(id) => {
            row.id = id;
            uow.tx().update_vote(&row).await?;
            Ok(ImportOutcome::imported(id, MergePolicy::Update))
        }
        None => {
            let id = uow.tx().insert_vote(&row).await?;
            Ok(ImportOutcome::imported(id, MergePolicy::Insert))
        }
    }
}
