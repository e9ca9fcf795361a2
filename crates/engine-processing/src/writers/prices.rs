use crate::error::RecordFailure;
use connectors::target::TargetTx;
use model::shop::price::{PriceRecord, PriceTier, discounted, gross_to_net};
use tracing::debug;

/// Values of one price tier before net conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct TierPrice {
    pub price_group: String,
    pub from: i64,
    pub price: Option<f64>,
    pub pseudo_price: Option<f64>,
    pub base_price: Option<f64>,
    pub percent: Option<f64>,
    /// Gross prices are converted to net when set.
    pub tax_rate: Option<f64>,
}

impl TierPrice {
    pub fn from_record(record: &PriceRecord, price_group: String) -> Self {
        TierPrice {
            price_group,
            from: record.from,
            price: record.price,
            pseudo_price: record.pseudo_price,
            base_price: record.base_price,
            percent: record.percent,
            tax_rate: record.tax_rate,
        }
    }

    fn net(&self, value: f64) -> f64 {
        match self.tax_rate {
            Some(tax) if tax > 0.0 => gross_to_net(value, tax),
            _ => value,
        }
    }
}

/// Writes quantity-break prices keeping the tiers of one (price group,
/// detail) contiguous: `[1, a] [a+1, b] ... [n, unbounded]`.
pub struct PriceWriter;

impl PriceWriter {
    pub async fn write(
        tx: &mut dyn TargetTx,
        article_id: i64,
        detail_id: i64,
        tier: &TierPrice,
    ) -> Result<PriceTier, RecordFailure> {
        let group = tier.price_group.as_str();

        let price = match (tier.price, tier.percent) {
            (Some(price), _) => tier.net(price),
            (None, Some(percent)) => {
                let base = tx
                    .price_tiers(group, detail_id)
                    .await?
                    .into_iter()
                    .find(|t| t.from == 1)
                    .ok_or_else(|| {
                        RecordFailure::failed(format!(
                            "percent discount for detail #{detail_id} needs a tier-1 price in group {group}"
                        ))
                    })?;
                discounted(base.price, percent)
            }
            (None, None) => return Err(RecordFailure::failed("price record carries no price")),
        };

        tx.delete_price_tiers_from(group, detail_id, tier.from).await?;

        if tier.from != 1 {
            let below = tx
                .price_tiers(group, detail_id)
                .await?
                .into_iter()
                .filter(|t| t.from < tier.from)
                .max_by_key(|t| t.from);
            if let Some(below) = below {
                tx.set_price_tier_to(group, detail_id, below.from, tier.from - 1)
                    .await?;
            }
        }

        let row = PriceTier {
            price_group: tier.price_group.clone(),
            article_id,
            detail_id,
            from: tier.from,
            to: None,
            price,
            pseudo_price: tier.pseudo_price.map(|p| tier.net(p)).unwrap_or(0.0),
            base_price: tier.base_price.unwrap_or(0.0),
            percent: tier.percent.unwrap_or(0.0),
        };
        tx.insert_price_tier(&row).await?;
        debug!(detail_id, group, from = tier.from, price, "Wrote price tier");
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::target::{TargetStore, memory::MemoryTarget};

    fn tier(from: i64, price: Option<f64>) -> TierPrice {
        TierPrice {
            price_group: "EK".into(),
            from,
            price,
            pseudo_price: None,
            base_price: None,
            percent: None,
            tax_rate: None,
        }
    }

    #[tokio::test]
    async fn tiers_stay_contiguous() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        for (from, price) in [(1, 10.0), (5, 9.0), (10, 8.0)] {
            PriceWriter::write(tx.as_mut(), 1, 1, &tier(from, Some(price)))
                .await
                .unwrap();
        }
        let tiers = tx.price_tiers("EK", 1).await.unwrap();
        let ranges: Vec<_> = tiers.iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(ranges, vec![(1, Some(4)), (5, Some(9)), (10, None)]);
    }

    #[tokio::test]
    async fn rewriting_a_tier_drops_the_ones_above() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        for from in [1, 5, 10] {
            PriceWriter::write(tx.as_mut(), 1, 1, &tier(from, Some(1.0)))
                .await
                .unwrap();
        }
        PriceWriter::write(tx.as_mut(), 1, 1, &tier(5, Some(2.0)))
            .await
            .unwrap();
        let ranges: Vec<_> = tx
            .price_tiers("EK", 1)
            .await
            .unwrap()
            .iter()
            .map(|t| (t.from, t.to))
            .collect();
        assert_eq!(ranges, vec![(1, Some(4)), (5, None)]);
    }

    #[tokio::test]
    async fn gross_prices_are_stored_net() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        let mut gross = tier(1, Some(119.0));
        gross.tax_rate = Some(19.0);
        let row = PriceWriter::write(tx.as_mut(), 1, 1, &gross).await.unwrap();
        assert!((row.price - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn percent_discount_needs_tier_one() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        let mut discount = tier(5, None);
        discount.percent = Some(10.0);
        assert!(matches!(
            PriceWriter::write(tx.as_mut(), 1, 1, &discount).await,
            Err(RecordFailure::Failed(_))
        ));

        PriceWriter::write(tx.as_mut(), 1, 1, &tier(1, Some(50.0)))
            .await
            .unwrap();
        let row = PriceWriter::write(tx.as_mut(), 1, 1, &discount).await.unwrap();
        assert!((row.price - 45.0).abs() < 1e-9);
    }
}
