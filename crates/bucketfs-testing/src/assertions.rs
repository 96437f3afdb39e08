//! Common assertions for bucketfs testing

use bucketfs_core::{BucketFs, Fs};

/// Asserts that `key` exists and holds exactly `expected`
pub fn assert_object_eq(fs: &BucketFs, key: &str, expected: &[u8]) {
    match fs.read(key) {
        Ok(actual) => assert_eq!(
            actual,
            expected,
            "Content mismatch for {}: {:?} vs {:?}",
            key,
            String::from_utf8_lossy(&actual),
            String::from_utf8_lossy(expected)
        ),
        Err(e) => panic!("Expected {} to exist, got {}", key, e),
    }
}

/// Asserts that `key` does not exist
pub fn assert_absent(fs: &BucketFs, key: &str) {
    match fs.stat(key) {
        Ok(info) => panic!("Expected {} to be absent, found {} bytes", key, info.size),
        Err(e) => assert!(e.is_not_found(), "Expected not-found for {}, got {}", key, e),
    }
}

/// Asserts that exactly `expected` keys live under `prefix`
pub fn assert_keys(fs: &BucketFs, prefix: &str, expected: &[&str]) {
    let mut actual = fs.list(prefix).expect("listing failed");
    actual.sort();
    let mut expected: Vec<String> = expected.iter().map(|k| k.to_string()).collect();
    expected.sort();
    assert_eq!(actual, expected, "Different keys under {:?}", prefix);
}
