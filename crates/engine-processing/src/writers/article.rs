use crate::{
    context::remap_id,
    error::{ImportError, RecordFailure},
};
use chrono::{NaiveDateTime, Utc};
use connectors::target::{
    TargetTx,
    rows::{ArticleRow, DetailRow},
};
use model::{
    params::RunParams,
    shop::article::{ArticleFields, AttributeSlots, DetailFields, DetailKind},
};
use tracing::debug;

/// Insert/update of the article -> detail -> attributes tree.
pub struct ArticleWriter;

impl ArticleWriter {
    /// Supplier by name, created when unknown. New articles need one.
    pub async fn supplier(
        tx: &mut dyn TargetTx,
        fields: &ArticleFields,
    ) -> Result<i64, RecordFailure> {
        let Some(name) = fields.supplier_name.as_deref() else {
            return Err(RecordFailure::failed("supplier is required for a new article"));
        };
        match tx.supplier_by_name(name).await? {
            Some(id) => Ok(id),
            None => {
                let id = tx.insert_supplier(name).await?;
                debug!(supplier = name, id, "Created supplier");
                Ok(id)
            }
        }
    }

    /// Remapped tax id, else the tax matching the rate, else the shop default.
    pub async fn tax(
        tx: &mut dyn TargetTx,
        params: &RunParams,
        fields: &ArticleFields,
    ) -> Result<i64, RecordFailure> {
        if let Some(source_tax) = fields.tax_id {
            let raw = source_tax.to_string();
            let id = remap_id("tax_rates", params.remap.tax_rate(&raw), &raw)?;
            if tx.tax_exists(id).await? {
                return Ok(id);
            }
            return Err(RecordFailure::failed(format!("tax #{id} does not exist")));
        }
        if let Some(rate) = fields.tax_rate {
            return tx
                .tax_by_rate(rate)
                .await?
                .ok_or_else(|| RecordFailure::failed(format!("no tax with rate {rate}")));
        }
        tx.default_tax()
            .await?
            .ok_or_else(|| ImportError::Config("target shop has no tax rates".into()).into())
    }

    /// Creates article and main detail. Returns `(article_id, detail_id)`.
    pub async fn insert_article(
        tx: &mut dyn TargetTx,
        params: &RunParams,
        article: &ArticleFields,
        order_number: &str,
        detail: &DetailFields,
    ) -> Result<(i64, i64), RecordFailure> {
        let supplier_id = Self::supplier(tx, article).await?;
        let tax_id = Self::tax(tx, params, article).await?;

        let mut row = ArticleRow::from_fields(article, supplier_id, tax_id);
        let now = Utc::now().naive_utc();
        row.added.get_or_insert(now);
        row.changed.get_or_insert(now);
        let article_id = tx.insert_article(&row).await?;

        let detail_id = tx
            .insert_detail(&DetailRow::new(
                article_id,
                DetailKind::Primary,
                order_number,
                detail,
            ))
            .await?;
        tx.set_main_detail(article_id, detail_id).await?;
        Ok((article_id, detail_id))
    }

    /// Adds a detail to an existing article.
    pub async fn insert_detail(
        tx: &mut dyn TargetTx,
        article_id: i64,
        kind: DetailKind,
        order_number: &str,
        detail: &DetailFields,
    ) -> Result<i64, RecordFailure> {
        Ok(tx
            .insert_detail(&DetailRow::new(article_id, kind, order_number, detail))
            .await?)
    }

    /// Updates an existing detail. The article itself only gets its change
    /// time refreshed.
    pub async fn update(
        tx: &mut dyn TargetTx,
        mut row: DetailRow,
        order_number: &str,
        detail: &DetailFields,
        changed: Option<NaiveDateTime>,
    ) -> Result<DetailRow, RecordFailure> {
        Self::touch(tx, row.article_id, changed).await?;
        if !order_number.is_empty() {
            row.order_number = order_number.to_string();
        }
        row.apply(detail);
        tx.update_detail(&row).await?;
        Ok(row)
    }

    /// Sets the article's change date, `now` when the record has none.
    pub async fn touch(
        tx: &mut dyn TargetTx,
        article_id: i64,
        changed: Option<NaiveDateTime>,
    ) -> Result<(), RecordFailure> {
        tx.touch_article(article_id, changed.unwrap_or_else(|| Utc::now().naive_utc()))
            .await?;
        Ok(())
    }

    /// Inserts the attribute row when the detail has none yet, otherwise
    /// writes only the supplied slots.
    pub async fn write_attributes(
        tx: &mut dyn TargetTx,
        article_id: i64,
        detail_id: i64,
        slots: &AttributeSlots,
    ) -> Result<(), RecordFailure> {
        match tx.attributes(detail_id).await? {
            None => tx.insert_attributes(article_id, detail_id, slots).await?,
            Some(_) if slots.is_empty() => {}
            Some(_) => tx.update_attributes(detail_id, slots).await?,
        }
        Ok(())
    }
}
