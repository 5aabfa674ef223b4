use dupfind::duplicates::bktree::{
    brute_force_find, find_by_distance_brute_force, BkTree, HammingMetric, Metric,
};
use dupfind::duplicates::{find_exact, group_by_size, ExactConfig, GroupKey};
use dupfind::events::CollectingSink;
use dupfind::scanner::{FeatureVector, FileEntry};
use proptest::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn vectors(len: usize, count: usize) -> impl Strategy<Value = Vec<FeatureVector>> {
    prop::collection::vec(
        prop::collection::vec(0u8..2, len).prop_map(FeatureVector::new),
        0..count,
    )
}

fn build(items: &[FeatureVector]) -> BkTree<FeatureVector, HammingMetric> {
    let mut tree = BkTree::new(HammingMetric);
    for item in items {
        tree.insert(item.clone());
    }
    tree
}

proptest! {
    #[test]
    fn test_tree_find_matches_linear_scan(
        items in vectors(12, 40),
        probe in prop::collection::vec(0u8..2, 12).prop_map(FeatureVector::new),
        radius in 0u32..13,
    ) {
        let tree = build(&items);
        prop_assert!(tree.is_consistent());
        prop_assert_eq!(
            tree.find(&probe, radius),
            brute_force_find(&items, &HammingMetric, &probe, radius)
        );
    }

    #[test]
    fn test_every_item_finds_itself(items in vectors(8, 30)) {
        let tree = build(&items);
        for (index, item) in items.iter().enumerate() {
            let hits = tree.find(item, 0);
            prop_assert!(hits.contains(&(0, index)));
            prop_assert!(hits.iter().all(|&(d, i)| d == 0 && items[i] == *item));
        }
    }

    #[test]
    fn test_clusters_match_linear_scan(items in vectors(6, 25), distance in 0u32..7) {
        let tree = build(&items);
        let clusters = tree.find_by_distance(distance);
        prop_assert_eq!(
            &clusters,
            &find_by_distance_brute_force(&items, &HammingMetric, distance)
        );

        // Members are pairwise at the requested distance and appear once
        let mut seen = vec![false; items.len()];
        for cluster in &clusters {
            prop_assert!(cluster.len() >= 2);
            for (k, &a) in cluster.iter().enumerate() {
                prop_assert!(!seen[a]);
                seen[a] = true;
                for &b in &cluster[k + 1..] {
                    prop_assert_eq!(HammingMetric.distance(&items[a], &items[b]), distance);
                }
            }
        }
    }

    #[test]
    fn test_hamming_is_a_metric(
        a in prop::collection::vec(0u8..4, 10).prop_map(FeatureVector::new),
        b in prop::collection::vec(0u8..4, 10).prop_map(FeatureVector::new),
        c in prop::collection::vec(0u8..4, 10).prop_map(FeatureVector::new),
    ) {
        prop_assert_eq!(a.distance(&b), b.distance(&a));
        prop_assert_eq!(a.distance(&a), 0);
        prop_assert!(a.distance(&c) <= a.distance(&b) + b.distance(&c));
    }

    #[test]
    fn test_group_by_size_invariants(sizes in prop::collection::vec(0u64..20, 0..50)) {
        let entries: Vec<FileEntry> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| FileEntry::new(PathBuf::from(format!("/fake/path/{}", i)), size))
            .collect();

        let (buckets, stats) = group_by_size(entries.clone());

        for (size, files) in &buckets {
            prop_assert!(files.len() >= 2);
            for file in files {
                prop_assert_eq!(file.size, *size);
            }
        }

        prop_assert_eq!(stats.total_files, entries.len());
        prop_assert_eq!(
            stats.potential_duplicates + stats.eliminated_unique,
            entries.len()
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_equal_content_means_same_group(contents in prop::collection::vec(0usize..4, 1..10)) {
        const PAYLOADS: [&str; 4] = ["", "a", "b", "ab"];

        let dir = TempDir::new().unwrap();
        for (i, &pick) in contents.iter().enumerate() {
            fs::write(dir.path().join(format!("f{:02}", i)), PAYLOADS[pick]).unwrap();
        }

        let (groups, _) = find_exact(
            &[dir.path().to_path_buf()],
            &ExactConfig::default(),
            &CollectingSink::new(),
        )
        .unwrap();

        let mut expected: HashMap<usize, usize> = HashMap::new();
        for &pick in &contents {
            *expected.entry(pick).or_default() += 1;
        }
        let expected_groups = expected.values().filter(|&&n| n >= 2).count();
        prop_assert_eq!(groups.len(), expected_groups);

        for group in &groups {
            prop_assert!(group.len() >= 2);
            let bucketed = matches!(group.key, GroupKey::Content { size: Some(_), .. });
            prop_assert!(bucketed);
            let first = fs::read(&group.files[0].path).unwrap();
            for file in &group.files[1..] {
                prop_assert_eq!(&fs::read(&file.path).unwrap(), &first);
            }
        }
    }
}
