use crate::error::RecordFailure;
use connectors::target::{TargetTx, rows::ArticleRow};

/// One group/option pair a variant carries.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionAssignment {
    pub group: String,
    pub option: String,
    pub group_position: i64,
    pub option_position: i64,
}

impl OptionAssignment {
    pub fn new(group: impl Into<String>, option: impl Into<String>) -> Self {
        OptionAssignment {
            group: group.into(),
            option: option.into(),
            group_position: 0,
            option_position: 0,
        }
    }
}

/// Get-or-create writer for configurator sets, groups and options. Every
/// relation insert ignores duplicates, so re-running is harmless.
pub struct ConfiguratorWriter;

impl ConfiguratorWriter {
    /// Configurator set of the article, created on first use.
    pub async fn ensure_set(
        tx: &mut dyn TargetTx,
        article: &ArticleRow,
    ) -> Result<i64, RecordFailure> {
        if let Some(set_id) = article.configurator_set_id {
            return Ok(set_id);
        }
        let set_id = tx
            .insert_configurator_set(&format!("Set-{}", article.id))
            .await?;
        tx.set_configurator_set(article.id, set_id).await?;
        Ok(set_id)
    }

    /// Links `detail_id` to every option in `options`. Returns the option ids.
    pub async fn attach(
        tx: &mut dyn TargetTx,
        article_id: i64,
        detail_id: i64,
        options: &[OptionAssignment],
    ) -> Result<Vec<i64>, RecordFailure> {
        if options.is_empty() {
            return Ok(Vec::new());
        }
        let article = tx
            .article(article_id)
            .await?
            .ok_or_else(|| RecordFailure::failed(format!("article #{article_id} does not exist")))?;
        let set_id = Self::ensure_set(tx, &article).await?;

        let mut option_ids = Vec::with_capacity(options.len());
        for assignment in options {
            let group_id = match tx.configurator_group_by_name(&assignment.group).await? {
                Some(id) => id,
                None => {
                    tx.insert_configurator_group(&assignment.group, assignment.group_position)
                        .await?
                }
            };
            tx.link_set_group(set_id, group_id).await?;

            let option_id = match tx
                .configurator_option_by_name(group_id, &assignment.option)
                .await?
            {
                Some(id) => id,
                None => {
                    tx.insert_configurator_option(
                        group_id,
                        &assignment.option,
                        assignment.option_position,
                    )
                    .await?
                }
            };
            tx.link_set_option(set_id, option_id).await?;
            tx.link_option_detail(option_id, detail_id).await?;
            option_ids.push(option_id);
        }
        Ok(option_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::target::{TargetStore, memory::MemoryTarget};

    #[tokio::test]
    async fn options_are_shared_between_variants() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        let article_id = tx.insert_article(&ArticleRow::default()).await.unwrap();

        let red = [OptionAssignment::new("Color", "Red")];
        let first = ConfiguratorWriter::attach(tx.as_mut(), article_id, 10, &red)
            .await
            .unwrap();
        let second = ConfiguratorWriter::attach(tx.as_mut(), article_id, 11, &red)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert!(tx.detail_has_options(10).await.unwrap());
        tx.commit().await.unwrap();

        let state = target.snapshot().await;
        assert_eq!(state.configurator_sets.len(), 1);
        assert_eq!(state.configurator_groups.len(), 1);
        assert_eq!(state.configurator_options.len(), 1);
        assert_eq!(state.option_details.len(), 2);
        assert_eq!(state.articles[&article_id].configurator_set_id, Some(1));
    }

    #[tokio::test]
    async fn reattaching_a_variant_adds_no_rows() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        let article_id = tx.insert_article(&ArticleRow::default()).await.unwrap();

        let options = [
            OptionAssignment::new("Color", "Red"),
            OptionAssignment::new("Size", "XL"),
        ];
        let first = ConfiguratorWriter::attach(tx.as_mut(), article_id, 10, &options)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        let before = target.snapshot().await;

        let mut tx = target.begin().await.unwrap();
        let again = ConfiguratorWriter::attach(tx.as_mut(), article_id, 10, &options)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        let after = target.snapshot().await;

        assert_eq!(again, first);
        assert_eq!(before.option_details.len(), 2);
        assert_eq!(after.option_details, before.option_details);
        assert_eq!(after.set_options, before.set_options);
        assert_eq!(after.set_groups, before.set_groups);
        assert_eq!(after.configurator_options.len(), 2);
    }
}
