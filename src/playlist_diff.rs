//! Playlist diffing module
//!
//! Computes which entries have to be added to and removed from an existing
//! playlist so that it ends up with the desired content.

use crate::catalog::Episode;
use std::collections::HashMap;

/// One (episode, library item) pair as it appears in a playlist
///
/// Entries are compared by [`PlaylistEntry::key`] only; the display name is
/// informational.
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    pub episode_id: String,
    pub library_item_id: String,
    /// Episode title for display purposes
    pub name: Option<String>,
}

/// Identity of a playlist entry
pub type EntryKey<'a> = (&'a str, &'a str);

impl PlaylistEntry {
    pub fn new(episode_id: impl Into<String>, library_item_id: impl Into<String>) -> Self {
        Self {
            episode_id: episode_id.into(),
            library_item_id: library_item_id.into(),
            name: None,
        }
    }

    /// The `(episode_id, library_item_id)` pair identifying this entry
    pub fn key(&self) -> EntryKey<'_> {
        (self.episode_id.as_str(), self.library_item_id.as_str())
    }

    /// Name to show for this entry, falling back to the episode id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.episode_id)
    }
}

impl From<&Episode> for PlaylistEntry {
    fn from(episode: &Episode) -> Self {
        Self {
            episode_id: episode.id.clone(),
            library_item_id: episode.library_item_id.clone(),
            name: Some(episode.title.clone()),
        }
    }
}

/// The changes needed to turn an existing playlist into the desired one
#[derive(Debug, Clone, Default)]
pub struct PlaylistDiff {
    /// Entries of the desired playlist missing from the existing one
    pub to_add: Vec<PlaylistEntry>,
    /// Entries of the existing playlist not part of the desired one
    pub to_remove: Vec<PlaylistEntry>,
}

impl PlaylistDiff {
    /// Whether the playlist is already in the desired state
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compares the desired playlist content with the existing one
///
/// Both sides are treated as multisets: every entry on one side cancels out
/// at most one equal entry on the other side. The resulting lists keep the
/// order of the list they were taken from.
pub fn diff(desired: &[PlaylistEntry], existing: &[PlaylistEntry]) -> PlaylistDiff {
    PlaylistDiff {
        to_add: subtract(desired, existing),
        to_remove: subtract(existing, desired),
    }
}

/// Multiset subtraction `from - other`, keeping the order of `from`
fn subtract(from: &[PlaylistEntry], other: &[PlaylistEntry]) -> Vec<PlaylistEntry> {
    let mut remaining: HashMap<EntryKey<'_>, usize> = HashMap::new();
    for entry in other {
        *remaining.entry(entry.key()).or_insert(0) += 1;
    }

    from.iter()
        .filter(|entry| match remaining.get_mut(&entry.key()) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<PlaylistEntry> {
        pairs
            .iter()
            .map(|(episode, item)| PlaylistEntry::new(*episode, *item))
            .collect()
    }

    fn keys(entries: &[PlaylistEntry]) -> Vec<(String, String)> {
        let mut keys: Vec<_> = entries
            .iter()
            .map(|e| (e.episode_id.clone(), e.library_item_id.clone()))
            .collect();
        keys.sort();
        keys
    }

    /// Applies the diff the way the reconciler does: add first, then remove
    /// one matching entry per removal.
    fn apply(existing: &[PlaylistEntry], diff: &PlaylistDiff) -> Vec<PlaylistEntry> {
        let mut result = existing.to_vec();
        result.extend(diff.to_add.iter().cloned());
        for entry in &diff.to_remove {
            let pos = result
                .iter()
                .position(|e| e.key() == entry.key())
                .expect("removed entry must exist");
            result.remove(pos);
        }
        result
    }

    /// Entries drawn from a small alphabet so that duplicates are common
    fn arbitrary_entries() -> impl Strategy<Value = Vec<PlaylistEntry>> {
        prop::collection::vec(
            (0u8..4, 0u8..2).prop_map(|(episode, item)| {
                PlaylistEntry::new(format!("e{episode}"), format!("l{item}"))
            }),
            0..8,
        )
    }

    #[test]
    fn test_scenario_add_and_remove() {
        let existing = entries(&[("e1", "l1"), ("e2", "l2")]);
        let desired = entries(&[("e2", "l2"), ("e3", "l3")]);

        let diff = diff(&desired, &existing);
        assert_eq!(keys(&diff.to_add), vec![("e3".to_string(), "l3".to_string())]);
        assert_eq!(keys(&diff.to_remove), vec![("e1".to_string(), "l1".to_string())]);
    }

    proptest! {
        #[test]
        fn test_identical_playlists_need_no_changes(set in arbitrary_entries()) {
            let diff = diff(&set, &set);
            prop_assert!(diff.is_empty(), "diff of {:?} with itself: {:?}", set, diff);
        }

        #[test]
        fn test_add_and_remove_are_disjoint(
            desired in arbitrary_entries(),
            existing in arbitrary_entries(),
        ) {
            let diff = diff(&desired, &existing);
            for added in &diff.to_add {
                prop_assert!(
                    diff.to_remove.iter().all(|r| r.key() != added.key()),
                    "{:?} is both added and removed",
                    added
                );
            }
        }

        #[test]
        fn test_applying_diff_yields_desired_content(
            desired in arbitrary_entries(),
            existing in arbitrary_entries(),
        ) {
            let diff = diff(&desired, &existing);
            prop_assert_eq!(keys(&apply(&existing, &diff)), keys(&desired));
        }
    }

    #[test]
    fn test_duplicates_removed_once_per_match() {
        let existing = entries(&[("e1", "l1"), ("e1", "l1"), ("e2", "l2")]);
        let desired = entries(&[("e1", "l1"), ("e2", "l2")]);

        let diff = diff(&desired, &existing);
        assert!(diff.to_add.is_empty());
        assert_eq!(keys(&diff.to_remove), vec![("e1".to_string(), "l1".to_string())]);
    }

    #[test]
    fn test_display_name_is_ignored() {
        let mut named = PlaylistEntry::new("e1", "l1");
        named.name = Some("Episode One".to_string());
        let unnamed = PlaylistEntry::new("e1", "l1");

        assert!(diff(&[named], &[unnamed]).is_empty());
    }

    #[test]
    fn test_input_order_does_not_change_membership() {
        let desired = entries(&[("e1", "l1"), ("e2", "l2"), ("e4", "l4")]);
        let existing = entries(&[("e3", "l3"), ("e2", "l2")]);
        let mut reversed_desired = desired.clone();
        reversed_desired.reverse();
        let mut reversed_existing = existing.clone();
        reversed_existing.reverse();

        let a = diff(&desired, &existing);
        let b = diff(&reversed_desired, &reversed_existing);
        assert_eq!(keys(&a.to_add), keys(&b.to_add));
        assert_eq!(keys(&a.to_remove), keys(&b.to_remove));
        assert_eq!(a.to_add[0].episode_id, "e1");
    }
}
