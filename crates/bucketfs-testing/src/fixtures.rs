//! Common test fixtures for bucketfs testing

use anyhow::Result;
use bucketfs_core::BucketFs;

/// Writes `count` small objects named `{prefix}{index:05}.txt` and returns their keys
pub fn seed_prefix(fs: &BucketFs, prefix: &str, count: usize) -> Result<Vec<String>> {
    let mut keys = Vec::with_capacity(count);
    for i in 0..count {
        let key = format!("{}{:05}.txt", prefix, i);
        fs.write(&key, format!("object {}", i).as_bytes())?;
        keys.push(key);
    }
    Ok(keys)
}

/// Writes a mixed tree: nested paths, a multi-dot name, an extensionless
/// name and a binary object
pub fn seed_tree(fs: &BucketFs) -> Result<Vec<String>> {
    let objects: [(&str, &[u8]); 6] = [
        ("docs/readme.md", b"# Readme\n"),
        ("docs/guide/intro.txt", b"Welcome."),
        ("docs/archive.tar.gz", &[0x1f, 0x8b, 0x08, 0x00]),
        ("docs/LICENSE", b"MIT"),
        ("images/logo.png", &[0x89, b'P', b'N', b'G']),
        ("top.txt", b"top level"),
    ];

    for (key, body) in objects.iter() {
        fs.write(key, body)?;
    }
    Ok(objects.iter().map(|(k, _)| k.to_string()).collect())
}
