use crate::{
    context::ImportContext,
    error::{ImportError, RecordFailure},
};
use connectors::target::{ARTICLE_NUMBER_COUNTER, TargetTx};
use model::{core::entity::EntityType, params::NumberValidationMode};
use tracing::warn;

/// Longest order number the target schema accepts.
pub const MAX_NUMBER_LEN: usize = 40;

/// Fabricated candidates tried before the record is given up.
const MAX_REPAIR_ATTEMPTS: usize = 100;

/// `[A-Za-z0-9-_.]{1,40}`
pub fn is_valid_number(number: &str) -> bool {
    !number.is_empty()
        && number.len() <= MAX_NUMBER_LEN
        && number
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Applies the run's number validation mode to a product order number.
pub struct NumberValidator<'a> {
    ctx: &'a ImportContext,
}

impl<'a> NumberValidator<'a> {
    pub fn new(ctx: &'a ImportContext) -> Self {
        NumberValidator { ctx }
    }

    /// Returns the order number to store for the product `source_id`.
    pub async fn validate(
        &self,
        tx: &mut dyn TargetTx,
        source_id: &str,
        number: Option<&str>,
    ) -> Result<String, RecordFailure> {
        let number = number.unwrap_or_default();
        if is_valid_number(number) {
            return Ok(number.to_string());
        }

        let mode = self.ctx.params.number_validation;
        match mode {
            NumberValidationMode::Ignore => Ok(number.to_string()),
            NumberValidationMode::Complain => Err(ImportError::InvalidNumber {
                source_id: source_id.to_string(),
                number: number.to_string(),
                mode,
            }
            .into()),
            NumberValidationMode::MakeValid => {
                let repaired = self.repair(tx, source_id).await?;
                warn!(source_key = source_id, invalid = number, %repaired, "Replaced invalid order number");
                Ok(repaired)
            }
        }
    }

    /// Fabricated number for `source_id`. Repeated calls for the same source
    /// id return the same number without touching the counter.
    pub async fn repair(
        &self,
        tx: &mut dyn TargetTx,
        source_id: &str,
    ) -> Result<String, RecordFailure> {
        let mappings = self.ctx.mappings.as_ref();
        if let Some(number) = mappings.get(EntityType::ValidNumber, source_id).await? {
            return Ok(number);
        }

        let prefix = &self.ctx.params.number_prefix;
        if !prefix.is_empty() && !is_valid_number(prefix) {
            return Err(ImportError::Config(format!(
                "number prefix '{prefix}' contains characters not allowed in order numbers"
            ))
            .into());
        }

        for _ in 0..MAX_REPAIR_ATTEMPTS {
            let counter = self
                .ctx
                .target
                .next_number(ARTICLE_NUMBER_COUNTER)
                .await
                .map_err(ImportError::Target)?;
            let candidate = format!("{prefix}{counter}");
            if !is_valid_number(&candidate) {
                return Err(ImportError::Config(format!(
                    "fabricated number '{candidate}' exceeds {MAX_NUMBER_LEN} characters"
                ))
                .into());
            }
            if tx.detail_by_number(&candidate).await?.is_none() {
                mappings
                    .put(EntityType::ValidNumber, source_id, &candidate)
                    .await?;
                return Ok(candidate);
            }
        }
        Err(RecordFailure::failed(format!(
            "no free order number after {MAX_REPAIR_ATTEMPTS} attempts"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::target::{TargetStore, memory::MemoryTarget, rows::DetailRow};
    use engine_core::mapping::sled_store::SledMappingStore;
    use model::{params::RunParams, shop::article::DetailKind};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(mode: NumberValidationMode) -> (TempDir, Arc<MemoryTarget>, ImportContext) {
        let dir = tempfile::tempdir().unwrap();
        let target = Arc::new(MemoryTarget::new());
        let mappings = Arc::new(SledMappingStore::open(dir.path()).unwrap());
        let params = RunParams {
            number_validation: mode,
            ..RunParams::default()
        };
        let ctx = ImportContext::new(target.clone(), mappings, params);
        (dir, target, ctx)
    }

    #[test]
    fn character_set_and_length() {
        assert!(is_valid_number("SW-10_2.a"));
        assert!(!is_valid_number(""));
        assert!(!is_valid_number("SW 10"));
        assert!(!is_valid_number("Ä1"));
        assert!(!is_valid_number(&"9".repeat(41)));
    }

    #[tokio::test]
    async fn complain_mode_is_fatal() {
        let (_dir, target, ctx) = context(NumberValidationMode::Complain);
        let mut tx = target.begin().await.unwrap();
        let err = NumberValidator::new(&ctx)
            .validate(tx.as_mut(), "7", Some("bad number"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecordFailure::Fatal(ImportError::InvalidNumber { .. })
        ));
    }

    #[tokio::test]
    async fn ignore_mode_keeps_number() {
        let (_dir, target, ctx) = context(NumberValidationMode::Ignore);
        let mut tx = target.begin().await.unwrap();
        let number = NumberValidator::new(&ctx)
            .validate(tx.as_mut(), "7", Some("bad number"))
            .await
            .unwrap();
        assert_eq!(number, "bad number");
    }

    #[tokio::test]
    async fn repair_is_idempotent_per_source_id() {
        let (_dir, target, ctx) = context(NumberValidationMode::MakeValid);
        let mut tx = target.begin().await.unwrap();
        let validator = NumberValidator::new(&ctx);

        let first = validator.validate(tx.as_mut(), "7", Some("")).await.unwrap();
        let counter = target.counter(ARTICLE_NUMBER_COUNTER).await;
        let second = validator.validate(tx.as_mut(), "7", None).await.unwrap();

        assert_eq!(first, "MIG10001");
        assert_eq!(first, second);
        assert_eq!(target.counter(ARTICLE_NUMBER_COUNTER).await, counter);
        assert!(is_valid_number(&first));
    }

    #[tokio::test]
    async fn repair_skips_numbers_already_taken() {
        let (_dir, target, ctx) = context(NumberValidationMode::MakeValid);
        let mut tx = target.begin().await.unwrap();
        tx.insert_detail(&DetailRow::new(1, DetailKind::Primary, "MIG10001", &Default::default()))
            .await
            .unwrap();

        let number = NumberValidator::new(&ctx)
            .repair(tx.as_mut(), "8")
            .await
            .unwrap();
        assert_eq!(number, "MIG10002");
    }
}
