use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use docqa_core::error::Result;
use docqa_core::query::{QueryId, QueryRecord};
use docqa_core::traits::{HistoryFilter, QueryHistory};

/// Process-local query history. Records are stored by value and never
/// rewritten, so they outlive the documents they cite.
#[derive(Default)]
pub struct InMemoryHistory {
    records: RwLock<HashMap<QueryId, QueryRecord>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueryHistory for InMemoryHistory {
    async fn record(&self, record: QueryRecord) -> Result<()> {
        self.records.write().await.entry(record.id).or_insert(record);
        Ok(())
    }

    async fn get(&self, id: QueryId) -> Result<Option<QueryRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &HistoryFilter) -> Result<Vec<QueryRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<QueryRecord> = records
            .values()
            .filter(|r| {
                filter
                    .document_id
                    .as_deref()
                    .map_or(true, |id| r.document_id.as_deref() == Some(id))
                    && filter.domain.map_or(true, |d| d == r.domain)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(filter.offset).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use docqa_core::query::{AnswerFormat, Grounding, Latency};
    use docqa_core::types::Domain;
    use uuid::Uuid;

    fn record(minutes_ago: i64, domain: Domain, document: Option<&str>) -> QueryRecord {
        QueryRecord {
            id: Uuid::new_v4(),
            question: "q".into(),
            domain,
            document_id: document.map(str::to_string),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            answer: "a".into(),
            reasoning: String::new(),
            confidence: 0.5,
            evidence: vec![],
            limitations: vec![],
            follow_up: vec![],
            citations: vec![],
            results: vec![],
            grounding: Grounding::Documents,
            degraded: vec![],
            answer_format: AnswerFormat::Structured,
            latency: Latency::default(),
        }
    }

    #[tokio::test]
    async fn lists_newest_first_with_filters_and_paging() {
        let history = InMemoryHistory::new();
        let old = record(30, Domain::Legal, Some("lease"));
        let mid = record(20, Domain::Insurance, None);
        let new = record(10, Domain::Legal, None);
        for r in [&old, &mid, &new] {
            history.record(r.clone()).await.unwrap();
        }

        let all = history.list(&HistoryFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![new.id, mid.id, old.id]);

        let legal = HistoryFilter { domain: Some(Domain::Legal), ..HistoryFilter::default() };
        assert_eq!(history.list(&legal).await.unwrap().len(), 2);

        let lease = HistoryFilter { document_id: Some("lease".into()), ..HistoryFilter::default() };
        assert_eq!(history.list(&lease).await.unwrap()[0].id, old.id);

        let page = HistoryFilter { offset: 1, limit: Some(1), ..HistoryFilter::default() };
        assert_eq!(history.list(&page).await.unwrap()[0].id, mid.id);
    }

    #[tokio::test]
    async fn records_are_write_once() {
        let history = InMemoryHistory::new();
        let r = record(0, Domain::General, None);
        history.record(r.clone()).await.unwrap();
        let mut changed = r.clone();
        changed.answer = "rewritten".into();
        history.record(changed).await.unwrap();
        assert_eq!(history.get(r.id).await.unwrap().unwrap().answer, "a");
    }
}
