use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Walks the whole tree and checks every structural invariant that must hold
/// once all pending compaction is done.
fn validate_tree<V>(tree: &DigitTree<V>, compact: bool) {
    let root = tree.root();
    assert_eq!(tree.father(root), None);
    assert_eq!(tree.label(root), Some(""));

    let mut stack = vec![root];
    let mut reachable = 0usize;
    let mut payloads = 0usize;

    while let Some(id) = stack.pop() {
        reachable += 1;
        let node = &tree.nodes[id];

        if node.data.is_some() {
            payloads += 1;
        }

        if !tree.is_root(id) {
            assert!(!node.label.is_empty(), "non-root node with an empty label");
            assert!(node.label.bytes().all(|b| b.is_ascii_digit()));

            let parent = node.parent.expect("non-root node without a parent");
            assert_eq!(
                tree.nodes[parent].children[node.first_digit()],
                Some(id),
                "node does not sit in its parent's slot for its first digit",
            );

            if compact {
                assert!(
                    node.data.is_some() || node.child_count() >= 2,
                    "payload-less node {:?} with {} children left behind",
                    node.label,
                    node.child_count(),
                );
            }
        }

        for (slot, child) in node.children.iter().enumerate() {
            if let Some(child) = *child {
                assert_eq!(tree.nodes[child].parent, Some(id));
                assert_eq!(tree.nodes[child].first_digit(), slot);
                stack.push(child);
            }
        }
    }

    assert_eq!(reachable, tree.node_count(), "unreachable nodes in the arena");
    assert_eq!(payloads, tree.len());
}

fn digit_key() -> impl Strategy<Value = String> {
    "[0-9]{1,10}"
}

/// Keys over a tiny alphabet share long prefixes and force lots of splits.
fn clustered_key() -> impl Strategy<Value = String> {
    "[0-2]{1,8}"
}

#[derive(Clone, Debug)]
enum Op {
    Insert(String, u32),
    Remove(String),
    RemovePrefix(String),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (clustered_key(), any::<u32>()).prop_map(|(key, value)| Op::Insert(key, value)),
        3 => clustered_key().prop_map(Op::Remove),
        1 => "[0-2]{0,3}".prop_map(Op::RemovePrefix),
    ]
}

proptest! {
    #[test]
    fn inserted_keys_are_found_and_rebuilt(keys in prop::collection::btree_set(digit_key(), 0..64)) {
        let mut tree = DigitTree::new();
        for key in &keys {
            let id = tree.insert(key).unwrap();
            tree.set_data(id, key.clone()).unwrap();
        }
        validate_tree(&tree, true);

        for key in &keys {
            let (outcome, id) = tree.find_lite(key).unwrap();
            prop_assert_eq!(outcome, Outcome::Found);
            prop_assert_eq!(tree.full_text(id).unwrap(), key.as_str());
            prop_assert_eq!(tree.data(id), Some(key));
        }

        let listed: Vec<_> = tree.iter().map(|(_, key)| key.clone()).collect();
        let sorted: Vec<_> = keys.iter().cloned().collect();
        prop_assert_eq!(listed, sorted);
    }

    #[test]
    fn insertion_order_does_not_matter(keys in prop::collection::vec(clustered_key(), 0..48)) {
        let forward: DigitMap<()> = {
            let mut map = DigitMap::new();
            map.try_extend(keys.iter().map(|key| (key, ()))).unwrap();
            map
        };
        let backward: DigitMap<()> = {
            let mut map = DigitMap::new();
            map.try_extend(keys.iter().rev().map(|key| (key, ()))).unwrap();
            map
        };

        validate_tree(forward.as_tree(), true);
        validate_tree(backward.as_tree(), true);

        prop_assert!(forward.keys().eq(backward.keys()));
        prop_assert_eq!(forward.as_tree().node_count(), backward.as_tree().node_count());

        let distinct: BTreeSet<_> = keys.iter().collect();
        prop_assert_eq!(forward.len(), distinct.len());
    }

    #[test]
    fn behaves_like_btreemap(ops in prop::collection::vec(op(), 0..128)) {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut map = DigitMap::new();
        let mut model = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let previous = map.insert(&key, value).unwrap();
                    prop_assert_eq!(previous, model.insert(key, value));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(map.remove(&key), model.remove(&key));
                }
                Op::RemovePrefix(prefix) => {
                    let mut released = Vec::new();
                    let count = map.remove_prefix(&prefix, |value| released.push(value)).unwrap();

                    let doomed: Vec<_> = model
                        .keys()
                        .filter(|key| key.starts_with(&prefix))
                        .cloned()
                        .collect();
                    let mut expected: Vec<_> = doomed
                        .iter()
                        .filter_map(|key| model.remove(key))
                        .collect();

                    released.sort_unstable();
                    expected.sort_unstable();
                    prop_assert_eq!(count, expected.len());
                    prop_assert_eq!(released, expected);
                }
            }

            validate_tree(map.as_tree(), true);
            prop_assert_eq!(map.len(), model.len());
        }

        let entries: Vec<_> = map.iter().map(|(key, &value)| (key, value)).collect();
        let expected: Vec<_> = model.into_iter().collect();
        prop_assert_eq!(entries, expected);
    }

    #[test]
    fn repeated_balance_is_a_no_op(keys in prop::collection::btree_set(clustered_key(), 1..48)) {
        let mut tree = DigitTree::new();
        for key in &keys {
            let id = tree.insert(key).unwrap();
            tree.set_data(id, ()).unwrap();
        }

        let snapshot = |tree: &DigitTree<()>| -> Vec<(NodeId, String)> {
            let mut nodes = Vec::new();
            let mut stack = vec![tree.root()];
            while let Some(id) = stack.pop() {
                nodes.push((id, tree.full_text(id).unwrap()));
                stack.extend(tree.children(id));
            }
            nodes
        };

        let before = snapshot(&tree);
        for (id, _) in &before {
            tree.balance(*id);
        }
        prop_assert_eq!(snapshot(&tree), before);
    }

    #[test]
    fn subtree_deletion_releases_exactly_once(
        keys in prop::collection::btree_set(clustered_key(), 1..48),
        prefix in "[0-2]{0,3}",
    ) {
        let mut tree = DigitTree::new();
        for key in &keys {
            let id = tree.insert(key).unwrap();
            tree.set_data(id, key.clone()).unwrap();
        }

        let found = tree.find(&prefix).unwrap();
        prop_assume!(found.outcome != Outcome::NotFound);

        let mut released = Vec::new();
        tree.delete_subtree(found.node, |key| released.push(key)).unwrap();
        validate_tree(&tree, false);

        let released_set: BTreeSet<_> = released.iter().cloned().collect();
        prop_assert_eq!(released_set.len(), released.len());

        let expected: BTreeSet<_> = keys.iter().filter(|key| key.starts_with(&prefix)).cloned().collect();
        prop_assert_eq!(released_set, expected);

        for (_, key) in tree.iter() {
            prop_assert!(!key.starts_with(&prefix));
        }
    }
}
