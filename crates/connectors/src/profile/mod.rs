use crate::error::ProfileError;
use async_trait::async_trait;
use model::{core::entity::SourceEntity, records::record::SourceRecord};
use std::{collections::VecDeque, sync::Arc};
use tracing::debug;

pub mod csv;
pub mod memory;
pub mod mysql;

/// Rows fetched from a profile per round trip.
pub const DEFAULT_PAGE_SIZE: usize = 250;

/// A legacy shop seen as a set of countable, pageable record lists.
///
/// Pages must be ordered deterministically (by source primary key) so that
/// an offset taken in one invocation addresses the same record in the next.
#[async_trait]
pub trait SourceProfile: Send + Sync {
    fn name(&self) -> &str;

    async fn count_for(&self, entity: SourceEntity) -> Result<u64, ProfileError>;

    async fn page_for(
        &self,
        entity: SourceEntity,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<SourceRecord>, ProfileError>;
}

/// Forward-only, non-restartable sequence of records starting at an offset.
#[async_trait]
pub trait RecordCursor: Send {
    /// Records remaining from the offset the cursor was opened at.
    fn row_count(&self) -> u64;

    async fn fetch(&mut self) -> Result<Option<SourceRecord>, ProfileError>;
}

/// Cursor that lazily pulls pages from a [`SourceProfile`].
pub struct PagedCursor {
    profile: Arc<dyn SourceProfile>,
    entity: SourceEntity,
    next_offset: u64,
    remaining: u64,
    page_size: usize,
    buffer: VecDeque<SourceRecord>,
    exhausted: bool,
}

impl PagedCursor {
    pub async fn open(
        profile: Arc<dyn SourceProfile>,
        entity: SourceEntity,
        offset: u64,
        page_size: usize,
    ) -> Result<Self, ProfileError> {
        let total = profile.count_for(entity).await?;
        let remaining = total.saturating_sub(offset);
        debug!(profile = profile.name(), %entity, offset, total, "Opened cursor");

        Ok(PagedCursor {
            profile,
            entity,
            next_offset: offset,
            remaining,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            exhausted: remaining == 0,
        })
    }

    async fn fill(&mut self) -> Result<(), ProfileError> {
        let page = self
            .profile
            .page_for(self.entity, self.next_offset, self.page_size)
            .await?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        self.next_offset += page.len() as u64;
        self.buffer.extend(page);
        Ok(())
    }
}

#[async_trait]
impl RecordCursor for PagedCursor {
    fn row_count(&self) -> u64 {
        self.remaining
    }

    async fn fetch(&mut self) -> Result<Option<SourceRecord>, ProfileError> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fill().await?;
        }
        Ok(self.buffer.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::memory::MemoryProfile;

    fn profile(rows: usize) -> Arc<dyn SourceProfile> {
        let records = (1..=rows)
            .map(|id| SourceRecord::new().with("id", id as i64))
            .collect();
        Arc::new(MemoryProfile::new("test").with(SourceEntity::Products, records))
    }

    async fn drain(cursor: &mut PagedCursor) -> Vec<i64> {
        let mut ids = Vec::new();
        while let Some(record) = cursor.fetch().await.unwrap() {
            ids.push(record.i64("id").unwrap().unwrap());
        }
        ids
    }

    #[tokio::test]
    async fn resumes_at_offset_across_pages() {
        let mut cursor = PagedCursor::open(profile(7), SourceEntity::Products, 3, 2)
            .await
            .unwrap();
        assert_eq!(cursor.row_count(), 4);
        assert_eq!(drain(&mut cursor).await, vec![4, 5, 6, 7]);
        assert!(cursor.fetch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn offset_past_end_is_empty() {
        let mut cursor = PagedCursor::open(profile(2), SourceEntity::Products, 5, 10)
            .await
            .unwrap();
        assert_eq!(cursor.row_count(), 0);
        assert!(drain(&mut cursor).await.is_empty());
    }
}
