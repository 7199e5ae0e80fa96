use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::post::FeedEntry;

/// Display-level feed row. The sync core operates on [`FeedEntry`] only;
/// separators are layered on top of the read model by the presentation side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedItem {
    Post(FeedEntry),
    Separator(DaySeparator),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySeparator {
    pub bucket: DayBucket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayBucket {
    Today,
    Yesterday,
    Older,
}

fn bucket_of(published: DateTime<Utc>, now: DateTime<Utc>) -> DayBucket {
    let today = now.date_naive();
    let day = published.date_naive();
    if day == today {
        DayBucket::Today
    } else if day == today - Duration::days(1) {
        DayBucket::Yesterday
    } else {
        DayBucket::Older
    }
}

/// Inserts a day marker before the first entry of each new day bucket.
/// Assumes the page is ordered newest first, as the read model emits it.
pub fn insert_day_separators(page: Vec<FeedEntry>, now: DateTime<Utc>) -> Vec<FeedItem> {
    let mut items = Vec::with_capacity(page.len() + 3);
    let mut current: Option<DayBucket> = None;

    for entry in page {
        let bucket = bucket_of(entry.published, now);
        if current != Some(bucket) {
            items.push(FeedItem::Separator(DaySeparator { bucket }));
            current = Some(bucket);
        }
        items.push(FeedItem::Post(entry));
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_published_at(id: i64, published: DateTime<Utc>) -> FeedEntry {
        let mut entry = FeedEntry::new("author".into(), 1, format!("post {id}"));
        entry.id = id;
        entry.published = published;
        entry
    }

    #[test]
    fn separators_mark_day_boundaries() {
        let now = Utc::now();
        let page = vec![
            entry_published_at(5, now),
            entry_published_at(4, now - Duration::hours(1)),
            entry_published_at(3, now - Duration::days(1)),
            entry_published_at(2, now - Duration::days(3)),
            entry_published_at(1, now - Duration::days(10)),
        ];

        let items = insert_day_separators(page, now);

        let buckets: Vec<_> = items
            .iter()
            .filter_map(|item| match item {
                FeedItem::Separator(sep) => Some(sep.bucket),
                FeedItem::Post(_) => None,
            })
            .collect();
        assert_eq!(
            buckets,
            vec![DayBucket::Today, DayBucket::Yesterday, DayBucket::Older]
        );
        assert_eq!(items.len(), 8);
        assert!(matches!(items[0], FeedItem::Separator(_)));
        assert!(matches!(items[1], FeedItem::Post(ref p) if p.id == 5));
    }

    #[test]
    fn empty_page_yields_no_separators() {
        assert!(insert_day_separators(Vec::new(), Utc::now()).is_empty());
    }

    #[test]
    fn single_bucket_gets_one_separator() {
        let now = Utc::now();
        let page = vec![entry_published_at(2, now), entry_published_at(1, now)];
        let items = insert_day_separators(page, now);
        let separators = items
            .iter()
            .filter(|item| matches!(item, FeedItem::Separator(_)))
            .count();
        assert_eq!(separators, 1);
    }
}
