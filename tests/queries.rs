//! Query, sort, and pagination scenarios on both real backends

mod common;

use chrono::{Duration, TimeZone, Utc};
use polystore::{Filter, FilterOp, Query, Record, Repository, RepositoryError, SortDirection};
use std::collections::HashSet;
use std::sync::Arc;

fn seed_articles(repo: &Arc<dyn Repository>, total: usize) -> Vec<String> {
    let mut ids = Vec::with_capacity(total);
    for i in 0..total {
        let mut txn = repo.begin_transaction().unwrap();
        let id = repo
            .add(&mut txn, Record::new().with("views", i as i64))
            .unwrap();
        txn.commit().unwrap();
        ids.push(id);
    }
    ids
}

#[test]
fn test_pagination_covers_everything_without_overlap() {
    for backend in common::backends() {
        let repo = backend.factory.open("article").unwrap();
        let ids: HashSet<String> = seed_articles(&repo, 23).into_iter().collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut total_returned = 0usize;
        for page in 1..=5 {
            let results = repo.get_page(page, 5).unwrap();
            assert_eq!(results.pagination.record_count, 23, "[{}]", backend.name);
            assert_eq!(results.pagination.page_count, 5);
            for record in &results.records {
                // no duplicates across pages
                assert!(seen.insert(record.id().unwrap().to_string()));
                total_returned += 1;
            }
        }
        assert_eq!(total_returned, 23, "[{}] no gaps", backend.name);
        assert_eq!(seen, ids);

        // a page past the end is empty but still reports real counts
        let past = repo.get_page(6, 5).unwrap();
        assert!(past.records.is_empty());
        assert_eq!(past.pagination.record_count, 23);
    }
}

#[test]
fn test_greater_than_is_sound_and_complete() {
    for backend in common::backends() {
        let repo = backend.factory.open("article").unwrap();
        seed_articles(&repo, 10); // views 0..=9

        let results = repo
            .query(
                &Query::builder()
                    .filter("views", FilterOp::GreaterThan, 6i64)
                    .build(),
            )
            .unwrap();

        // sound: every returned record satisfies the predicate
        let mut views: Vec<i64> = results
            .records
            .iter()
            .map(|r| r.get("views").unwrap().as_int().unwrap())
            .collect();
        views.sort();
        // complete: every satisfying record is returned
        assert_eq!(views, vec![7, 8, 9], "[{}]", backend.name);
        assert_eq!(results.pagination.record_count, 3);
    }
}

#[test]
fn test_published_articles_newest_first_page_one() {
    for backend in common::backends() {
        let repo = backend.factory.open("article").unwrap();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        for i in 0..10 {
            let mut txn = repo.begin_transaction().unwrap();
            repo.add(
                &mut txn,
                Record::new()
                    .with("title", format!("article-{i}"))
                    .with("published", i % 3 != 0) // 0,3,6,9 are drafts
                    .with("createdAt", base + Duration::days(i)),
            )
            .unwrap();
            txn.commit().unwrap();
        }

        let results = repo
            .query(
                &Query::builder()
                    .filter("published", FilterOp::Equal, true)
                    .sort("createdAt", SortDirection::Descending)
                    .page(1, 3)
                    .build(),
            )
            .unwrap();

        assert_eq!(results.pagination.record_count, 6, "[{}]", backend.name);
        assert_eq!(results.pagination.page_count, 2);
        let titles: Vec<&str> = results
            .records
            .iter()
            .map(|r| r.get("title").unwrap().as_str().unwrap())
            .collect();
        // newest published first: days 8, 7, 5
        assert_eq!(titles, vec!["article-8", "article-7", "article-5"]);
    }
}

#[test]
fn test_sorted_filtered_page_convenience() {
    for backend in common::backends() {
        let repo = backend.factory.open("article").unwrap();
        seed_articles(&repo, 10); // views 0..=9

        let results = repo
            .get_page_sorted(
                1,
                3,
                &[("views".to_string(), SortDirection::Descending)],
                &[Filter::new("views", FilterOp::LessThan, 8i64)],
            )
            .unwrap();

        let views: Vec<i64> = results
            .records
            .iter()
            .map(|r| r.get("views").unwrap().as_int().unwrap())
            .collect();
        assert_eq!(views, vec![7, 6, 5], "[{}]", backend.name);
        assert_eq!(results.pagination.record_count, 8);
        assert_eq!(results.pagination.page_count, 3);
    }
}

#[test]
fn test_get_all_returns_everything_unpaginated() {
    for backend in common::backends() {
        let repo = backend.factory.open("article").unwrap();
        seed_articles(&repo, 4);
        let results = repo.get_all().unwrap();
        assert_eq!(results.records.len(), 4, "[{}]", backend.name);
        assert_eq!(results.pagination.page_count, 1);
        assert_eq!(results.pagination.record_count, 4);
    }
}

#[test]
fn test_filter_type_violation_fails_the_query() {
    for backend in common::backends() {
        let repo = backend.factory.open("article").unwrap();
        seed_articles(&repo, 2);

        let err = repo
            .query(
                &Query::builder()
                    .filter("views", FilterOp::LessThan, "many")
                    .build(),
            )
            .unwrap_err();
        assert!(
            matches!(err, RepositoryError::FilterTypeMismatch { .. }),
            "[{}] got {err}",
            backend.name
        );
    }
}

#[test]
fn test_filters_on_missing_properties_match_nothing() {
    for backend in common::backends() {
        let repo = backend.factory.open("article").unwrap();
        seed_articles(&repo, 3);

        let results = repo
            .query(
                &Query::builder()
                    .filter("absent", FilterOp::Equal, 1i64)
                    .build(),
            )
            .unwrap();
        assert!(results.records.is_empty(), "[{}]", backend.name);
        assert_eq!(results.pagination.record_count, 0);
    }
}
