//! Reconciliation of a stored association set with a desired one.
//!
//! Both meal↔recipe links (untagged) and plan↔meal schedules (tagged with a
//! timestamp) are updated by computing additions and removals instead of
//! clearing and rewriting the whole link table.

use std::collections::BTreeMap;

#[derive(Debug, Default, PartialEq)]
pub struct LinkDiff<K, V> {
    /// Keys present only in the desired map, with their tags.
    pub added: Vec<(K, V)>,
    /// Keys present only in the current map.
    pub removed: Vec<K>,
    /// Keys present in both whose tag differs; carries the desired tag.
    pub patched: Vec<(K, V)>,
}

pub fn diff_links<K, V>(current: &BTreeMap<K, V>, desired: &BTreeMap<K, V>) -> LinkDiff<K, V>
where
    K: Ord + Clone,
    V: PartialEq + Clone,
{
    let mut diff = LinkDiff {
        added: Vec::new(),
        removed: Vec::new(),
        patched: Vec::new(),
    };

    for (k, v) in desired {
        match current.get(k) {
            None => diff.added.push((k.clone(), v.clone())),
            Some(old) if old != v => diff.patched.push((k.clone(), v.clone())),
            Some(_) => {}
        }
    }
    for k in current.keys() {
        if !desired.contains_key(k) {
            diff.removed.push(k.clone());
        }
    }

    diff
}

/// Convenience for untagged links: a plain id set diff.
pub fn diff_ids<K: Ord + Clone>(current: &[K], desired: &[K]) -> LinkDiff<K, ()> {
    let current: BTreeMap<K, ()> = current.iter().cloned().map(|k| (k, ())).collect();
    let desired: BTreeMap<K, ()> = desired.iter().cloned().map(|k| (k, ())).collect();
    diff_links(&current, &desired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(u32, &str)]) -> BTreeMap<u32, String> {
        entries.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn identical_maps_produce_empty_diff() {
        let m = map(&[(1, "a"), (2, "b")]);
        let d = diff_links(&m, &m);
        assert!(d.added.is_empty());
        assert!(d.removed.is_empty());
        assert!(d.patched.is_empty());
    }

    #[test]
    fn added_removed_and_patched_are_separated() {
        let current = map(&[(1, "08:00"), (2, "12:00"), (3, "18:00")]);
        let desired = map(&[(2, "12:00"), (3, "19:30"), (4, "21:00")]);
        let d = diff_links(&current, &desired);
        assert_eq!(d.added, vec![(4, "21:00".to_string())]);
        assert_eq!(d.removed, vec![1]);
        assert_eq!(d.patched, vec![(3, "19:30".to_string())]);
    }

    #[test]
    fn unchanged_entries_are_untouched() {
        let current = map(&[(1, "x")]);
        let desired = map(&[(1, "x")]);
        let d = diff_links(&current, &desired);
        assert_eq!(d, LinkDiff::default());
    }

    #[test]
    fn everything_added_from_empty() {
        let current = BTreeMap::new();
        let desired = map(&[(1, "a"), (2, "b")]);
        let d = diff_links(&current, &desired);
        assert_eq!(d.added.len(), 2);
        assert!(d.removed.is_empty());
    }

    #[test]
    fn everything_removed_to_empty() {
        let current = map(&[(1, "a"), (2, "b")]);
        let desired = BTreeMap::new();
        let d = diff_links(&current, &desired);
        assert_eq!(d.removed, vec![1, 2]);
        assert!(d.added.is_empty());
    }

    #[test]
    fn id_set_diff_never_patches() {
        // {1,2,3} -> {2,3,4}: remove 1, add 4, leave 2 and 3 alone.
        let d = diff_ids(&[1, 2, 3], &[2, 3, 4]);
        assert_eq!(d.added, vec![(4, ())]);
        assert_eq!(d.removed, vec![1]);
        assert!(d.patched.is_empty());
    }

    #[test]
    fn duplicate_desired_ids_collapse() {
        let d = diff_ids(&[1], &[1, 1, 2, 2]);
        assert_eq!(d.added, vec![(2, ())]);
        assert!(d.removed.is_empty());
    }
}
