//! Candidate selection
//!
//! Picks the episodes that belong on the listen-next playlist.

use crate::catalog::{Catalog, Episode};

/// Selects the playlist candidates from the catalog
///
/// Takes the unfinished episodes in catalog order, drops the first `skip`
/// of them and keeps at most `limit` of the rest. Skipping past the end or a
/// limit of zero simply yields no candidates.
pub fn select_candidates(catalog: &Catalog, skip: usize, limit: usize) -> Vec<&Episode> {
    catalog.unfinished().skip(skip).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CompletionState::{Finished, Unfinished};
    use crate::catalog::read_catalog;
    use crate::catalog::tests::episode;
    use crate::media_server::fake::{FakeServer, podcast, record};
    use proptest::prelude::*;

    fn ids<'a>(episodes: &[&'a Episode]) -> Vec<&'a str> {
        episodes.iter().map(|e| e.key()).collect()
    }

    fn catalog(episodes: Vec<Episode>) -> Catalog {
        Catalog {
            episodes,
            progress_failures: Vec::new(),
        }
    }

    #[test]
    fn test_backlogged_episode_never_selected() {
        let server = FakeServer::with_podcasts(vec![
            podcast("p1", &[], vec![record("p1", "day3", 3), record("p1", "day1", 1)]),
            podcast("p2", &["backlog"], vec![record("p2", "day2", 2)]),
        ]);
        let catalog = read_catalog(&server, "lib").unwrap();

        assert_eq!(ids(&select_candidates(&catalog, 0, 10)), vec!["day1", "day3"]);
    }

    #[test]
    fn test_skip_applies_after_unfinished_filter() {
        let catalog = catalog(vec![
            episode("done", 0, Finished),
            episode("a", 1, Unfinished),
            episode("b", 2, Unfinished),
            episode("c", 3, Unfinished),
        ]);

        assert_eq!(ids(&select_candidates(&catalog, 1, 1)), vec!["b"]);
        assert_eq!(ids(&select_candidates(&catalog, 0, 2)), vec!["a", "b"]);
    }

    #[test]
    fn test_finished_episodes_are_excluded() {
        let catalog = catalog(vec![
            episode("a", 1, Finished),
            episode("b", 2, Unfinished),
            episode("c", 3, Finished),
        ]);

        assert_eq!(ids(&select_candidates(&catalog, 0, 10)), vec!["b"]);
    }

    #[test]
    fn test_out_of_range_values() {
        let catalog = catalog(vec![episode("a", 1, Unfinished), episode("b", 2, Unfinished)]);

        assert!(select_candidates(&catalog, 5, 10).is_empty());
        assert!(select_candidates(&catalog, 2, 10).is_empty());
        assert!(select_candidates(&catalog, 0, 0).is_empty());
        assert!(select_candidates(&Catalog::default(), 0, 10).is_empty());
    }

    fn arbitrary_catalog() -> impl Strategy<Value = Catalog> {
        prop::collection::vec(any::<bool>(), 0..20).prop_map(|states| {
            catalog(
                states
                    .into_iter()
                    .enumerate()
                    .map(|(day, finished)| {
                        let state = if finished { Finished } else { Unfinished };
                        episode(&format!("ep{day}"), day as i64, state)
                    })
                    .collect(),
            )
        })
    }

    proptest! {
        #[test]
        fn test_selection_is_repeatable(
            catalog in arbitrary_catalog(),
            skip in 0usize..25,
            limit in 0usize..25,
        ) {
            let first = ids(&select_candidates(&catalog, skip, limit));
            let second = ids(&select_candidates(&catalog, skip, limit));
            prop_assert_eq!(&first, &second);

            let unfinished = catalog.unfinished().count();
            prop_assert_eq!(first.len(), unfinished.saturating_sub(skip).min(limit));
            for selected in select_candidates(&catalog, skip, limit) {
                prop_assert!(!selected.is_finished());
            }
        }
    }
}
