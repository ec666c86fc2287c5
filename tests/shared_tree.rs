//! Integration tests for the mutex-wrapped tree handle.

use batchtree::SharedBTree;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

#[test]
fn test_readers_and_writers_interleave() {
    let dir = tempdir().unwrap();
    let tree = Arc::new(SharedBTree::open(dir.path().join("shared.data"), 5).unwrap());

    let writer = {
        let tree = Arc::clone(&tree);
        thread::spawn(move || {
            for key in 0..500 {
                tree.put(key, format!("v{}", key).as_bytes()).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for _ in 0..50 {
                    // Whatever prefix is visible must be ordered and intact.
                    let entries = tree.get_in_range(0, 499).unwrap();
                    for pair in entries.windows(2) {
                        assert!(pair[0].0 < pair[1].0);
                    }
                    for (key, value) in entries {
                        assert_eq!(value, format!("v{}", key).into_bytes());
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(tree.get_in_range(0, 499).unwrap().len(), 500);
    assert_eq!(tree.stats().unwrap().entries, 500);
}

#[test]
fn test_reopen_after_shared_use() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.data");

    {
        let tree = SharedBTree::open(&path, 3).unwrap();
        for key in 0..30 {
            tree.put(key, &[key as u8]).unwrap();
        }
        tree.into_inner().close().unwrap();
    }

    let tree = SharedBTree::open(&path, 3).unwrap();
    for key in 0..30 {
        assert_eq!(tree.get(key).unwrap(), Some(vec![key as u8]));
    }
}
