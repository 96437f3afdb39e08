//! Integration tests for the bucket filesystem

use bucketfs_core::{
    BucketFs, Error, FailureKind, Fs, FsOptions, MemoryClient, ObjectOp, ObjectStoreClient,
    RenameOutcome,
};
use bucketfs_testing::assertions::{assert_absent, assert_keys, assert_object_eq};
use bucketfs_testing::fixtures::{seed_prefix, seed_tree};
use bucketfs_testing::{ClientOp, Fault, FaultyClient, TestBucket, TEST_BUCKET, TEST_KEY, TEST_OBJECT};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

#[test]
fn test_open_seeded_object() {
    let bucket = TestBucket::seeded().unwrap();
    let fs = bucket.fs();

    let mut file = fs.open(TEST_KEY).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    assert_eq!(content, TEST_OBJECT);

    let info = fs.stat(TEST_KEY).unwrap();
    assert_eq!(info.name, TEST_KEY);
    assert_eq!(info.size, TEST_OBJECT.len() as u64);
    assert!(info.modified.is_some());
}

#[test]
fn test_round_trip_binary_content() {
    let bucket = TestBucket::new().unwrap();
    let fs = bucket.fs();

    let payloads: Vec<Vec<u8>> = vec![
        Vec::new(),
        vec![0u8; 1],
        (0..=255u8).collect(),
        (0..100_000u32).map(|i| (i % 251) as u8).collect(),
    ];

    for (i, payload) in payloads.iter().enumerate() {
        let path = format!("bin/{}.dat", i);
        let mut file = fs.create(&path).unwrap();
        file.write_all(payload).unwrap();
        fs.push(&mut file, &path).unwrap();

        let opened = fs.open(&path).unwrap();
        assert_eq!(opened.contents(), payload.as_slice());
    }
}

#[test]
fn test_push_uses_whole_buffer_not_cursor() {
    let bucket = TestBucket::new().unwrap();
    let fs = bucket.fs();

    let mut file = fs.create("cursor.txt").unwrap();
    file.write_all(b"0123456789").unwrap();
    file.seek(SeekFrom::Start(3)).unwrap();
    fs.push(&mut file, "cursor.txt").unwrap();

    assert_eq!(bucket.get("cursor.txt").unwrap(), b"0123456789");
}

#[test]
fn test_edit_existing_object() {
    let bucket = TestBucket::seeded().unwrap();
    let fs = bucket.fs();

    let mut file = fs.open(TEST_KEY).unwrap();
    file.seek(SeekFrom::End(0)).unwrap();
    file.write_all(b"!").unwrap();
    assert!(file.is_dirty());

    // Nothing reaches the store until the push
    assert_object_eq(fs, TEST_KEY, TEST_OBJECT.as_bytes());
    fs.push(&mut file, TEST_KEY).unwrap();
    assert_object_eq(fs, TEST_KEY, format!("{}!", TEST_OBJECT).as_bytes());
}

#[test]
fn test_create_touches_no_remote_state() {
    let bucket = TestBucket::new().unwrap();
    let file = bucket.fs().create("brand/new.txt").unwrap();
    assert!(file.is_empty());
    assert!(bucket.faults().calls().is_empty());
    assert!(bucket.is_empty());
}

#[test]
fn test_stat_uses_head() {
    let bucket = TestBucket::seeded().unwrap();
    bucket.fs().stat(TEST_KEY).unwrap();
    assert_eq!(bucket.faults().count(ClientOp::Head), 1);
    assert_eq!(bucket.faults().count(ClientOp::Get), 0);
}

#[test]
fn test_open_missing_key() {
    let bucket = TestBucket::new().unwrap();
    let err = bucket.fs().open("nope/missing.txt").unwrap_err();
    assert!(err.is_not_found());

    let (file, result) = bucket.fs().fetch("nope/missing.txt");
    assert!(result.is_err());
    assert!(file.is_empty());
}

#[test]
fn test_transient_failure_is_surfaced_once() {
    let bucket = TestBucket::seeded().unwrap();
    bucket
        .faults()
        .inject(Fault::on(ClientOp::Get).times(1).code("SlowDown").status(503));

    let err = bucket.fs().open(TEST_KEY).unwrap_err();
    assert_eq!(err.kind(), Some(FailureKind::Transient));
    assert_eq!(bucket.faults().count(ClientOp::Get), 1);

    // The next call goes through; nothing was retried behind our back
    assert!(bucket.fs().open(TEST_KEY).is_ok());
}

#[test]
fn test_access_denied_classification() {
    let bucket = TestBucket::seeded().unwrap();
    bucket
        .faults()
        .inject(Fault::on(ClientOp::Put).code("AccessDenied").status(403));

    let err = bucket.fs().write("locked.txt", b"x").unwrap_err();
    match err {
        Error::Object(e) => {
            assert_eq!(e.op, ObjectOp::Put);
            assert_eq!(e.kind, FailureKind::AccessDenied);
        }
        other => panic!("unexpected error {}", other),
    }
}

#[test]
fn test_rename_completed() {
    let bucket = TestBucket::seeded().unwrap();
    let fs = bucket.fs();

    let outcome = fs.rename_two_phase(TEST_KEY, "b/moved.ext").unwrap();
    assert!(outcome.is_completed());
    assert_object_eq(fs, "b/moved.ext", TEST_OBJECT.as_bytes());
    assert_absent(fs, TEST_KEY);
}

#[test]
fn test_rename_onto_same_key_keeps_object() {
    let bucket = TestBucket::seeded().unwrap();
    let fs = bucket.fs();

    fs.rename(TEST_KEY, &format!("/{}", TEST_KEY)).unwrap();
    fs.rename(TEST_KEY, TEST_KEY).unwrap();

    assert_object_eq(fs, TEST_KEY, TEST_OBJECT.as_bytes());
    assert_eq!(bucket.faults().count(ClientOp::Copy), 0);
    assert_eq!(bucket.faults().count(ClientOp::Delete), 0);
}

#[test]
fn test_rename_missing_key_onto_itself() {
    let bucket = TestBucket::new().unwrap();
    let fs = bucket.fs();

    let outcome = fs.rename_two_phase("ghost.txt", "/ghost.txt").unwrap();
    match outcome {
        RenameOutcome::CopyFailed(e) => assert_eq!(e.kind, FailureKind::NotFound),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_absent(fs, "ghost.txt");
}

#[test]
fn test_rename_copy_failure_leaves_source() {
    let bucket = TestBucket::seeded().unwrap();
    let fs = bucket.fs();
    bucket.faults().inject(Fault::on(ClientOp::Copy).status(500));

    let outcome = fs.rename_two_phase(TEST_KEY, "b/moved.ext").unwrap();
    assert!(matches!(outcome, RenameOutcome::CopyFailed(_)));
    assert_eq!(bucket.faults().count(ClientOp::Delete), 0);

    bucket.faults().heal();
    assert_object_eq(fs, TEST_KEY, TEST_OBJECT.as_bytes());
    assert_absent(fs, "b/moved.ext");
}

#[test]
fn test_rename_delete_failure_leaves_both() {
    let bucket = TestBucket::seeded().unwrap();
    let fs = bucket.fs();
    bucket.faults().inject(Fault::on(ClientOp::Delete).code("InternalError"));

    let err = fs.rename(TEST_KEY, "b/moved.ext").unwrap_err();
    match &err {
        Error::RenameIncomplete { from, to, source } => {
            assert_eq!(from, TEST_KEY);
            assert_eq!(to, "b/moved.ext");
            assert_eq!(source.kind, FailureKind::Transient);
        }
        other => panic!("unexpected error {}", other),
    }

    bucket.faults().heal();
    assert_object_eq(fs, TEST_KEY, TEST_OBJECT.as_bytes());
    assert_object_eq(fs, "b/moved.ext", TEST_OBJECT.as_bytes());
}

#[test]
fn test_remove_is_consistent_when_repeated() {
    let bucket = TestBucket::seeded().unwrap();
    let fs = bucket.fs();

    let first = fs.remove(TEST_KEY);
    let second = fs.remove(TEST_KEY);
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_absent(fs, TEST_KEY);
}

#[test]
fn test_remove_failure_is_surfaced() {
    let bucket = TestBucket::seeded().unwrap();
    bucket.faults().inject(Fault::on(ClientOp::Delete).status(503));

    let err = bucket.fs().remove(TEST_KEY).unwrap_err();
    assert_eq!(err.kind(), Some(FailureKind::Transient));
    assert_eq!(bucket.get(TEST_KEY).unwrap(), TEST_OBJECT.as_bytes());
}

#[test]
fn test_remove_all_below_page_limit() {
    let bucket = TestBucket::with_page_limit(50).unwrap();
    let fs = bucket.fs();
    seed_prefix(fs, "tmp/", 20).unwrap();
    let outside = seed_prefix(fs, "keep/", 5).unwrap();

    fs.remove_all("tmp/").unwrap();
    assert_eq!(bucket.faults().count(ClientOp::List), 1);
    assert_keys(fs, "tmp/", &[]);
    let outside: Vec<&str> = outside.iter().map(String::as_str).collect();
    assert_keys(fs, "", &outside);
}

#[test]
fn test_remove_all_above_page_limit() {
    let bucket = TestBucket::with_page_limit(7).unwrap();
    let fs = bucket.fs();
    seed_prefix(fs, "tmp/", 50).unwrap();
    seed_prefix(fs, "tmq/", 3).unwrap();
    seed_prefix(fs, "a/", 3).unwrap();

    fs.remove_all("tmp/").unwrap();
    assert_eq!(bucket.faults().count(ClientOp::Delete), 50);
    // 50 keys at 7 per page
    assert_eq!(bucket.faults().count(ClientOp::List), 8);
    assert_keys(fs, "tmp/", &[]);
    assert_eq!(bucket.len(), 6);
}

#[test]
fn test_remove_all_with_requested_page_size() {
    let store = Arc::new(MemoryClient::new());
    let options = FsOptions {
        page_size: Some(10),
        ..Default::default()
    };
    let faults = Arc::new(FaultyClient::new(store.clone()));
    let fs = BucketFs::bootstrap(faults.clone(), TEST_BUCKET, options).unwrap();
    seed_prefix(&fs, "p/", 35).unwrap();

    fs.remove_all("p/").unwrap();
    assert_eq!(store.object_count(TEST_BUCKET), Some(0));
    assert_eq!(faults.count(ClientOp::List), 4);
}

#[test]
fn test_remove_all_partial_failure() {
    let bucket = TestBucket::with_page_limit(4).unwrap();
    let fs = bucket.fs();
    let keys = seed_prefix(fs, "tmp/", 10).unwrap();
    bucket
        .faults()
        .inject(Fault::on(ClientOp::Delete).target(keys[6].as_str()).status(500));

    let err = fs.remove_all("tmp/").unwrap_err();
    match &err {
        Error::RemoveAllFailed {
            prefix,
            deleted,
            source,
        } => {
            assert_eq!(prefix, "tmp/");
            assert_eq!(*deleted, 6);
            assert_eq!(source.op, ObjectOp::Delete);
            assert_eq!(source.key, keys[6]);
        }
        other => panic!("unexpected error {}", other),
    }

    bucket.faults().heal();
    let remaining: Vec<&str> = keys[6..].iter().map(String::as_str).collect();
    assert_keys(fs, "tmp/", &remaining);

    // Running it again finishes the job
    fs.remove_all("tmp/").unwrap();
    assert!(bucket.is_empty());
}

#[test]
fn test_remove_all_list_failure() {
    let bucket = TestBucket::with_page_limit(5).unwrap();
    let fs = bucket.fs();
    seed_prefix(fs, "tmp/", 12).unwrap();
    bucket
        .faults()
        .inject(Fault::on(ClientOp::List).after(1).code("ServiceUnavailable"));

    let err = fs.remove_all("tmp/").unwrap_err();
    match &err {
        Error::RemoveAllFailed { deleted, source, .. } => {
            assert_eq!(*deleted, 5);
            assert_eq!(source.op, ObjectOp::List);
            assert_eq!(source.kind, FailureKind::Transient);
        }
        other => panic!("unexpected error {}", other),
    }
    assert_eq!(bucket.len(), 7);
}

#[test]
fn test_list_tree() {
    let bucket = TestBucket::new().unwrap();
    let fs = bucket.fs();
    seed_tree(fs).unwrap();

    assert_keys(
        fs,
        "docs/",
        &["docs/LICENSE", "docs/archive.tar.gz", "docs/guide/intro.txt", "docs/readme.md"],
    );
    assert_keys(fs, "/images", &["images/logo.png"]);
    assert_eq!(fs.list("").unwrap().len(), 6);
}

#[test]
fn test_bootstrap_existing_bucket_skips_create() {
    let store = Arc::new(MemoryClient::new());
    store.create_bucket(TEST_BUCKET).unwrap();
    let faults = Arc::new(FaultyClient::new(store));

    BucketFs::bootstrap(faults.clone(), TEST_BUCKET, FsOptions::default()).unwrap();
    assert_eq!(faults.count(ClientOp::GetBucketAcl), 1);
    assert_eq!(faults.count(ClientOp::CreateBucket), 0);
}

#[test]
fn test_bootstrap_missing_bucket_creates_and_reprobes() {
    let store = Arc::new(MemoryClient::new());
    let faults = Arc::new(FaultyClient::new(store.clone()));

    BucketFs::bootstrap(faults.clone(), TEST_BUCKET, FsOptions::default()).unwrap();
    assert!(store.has_bucket(TEST_BUCKET));
    assert_eq!(faults.count(ClientOp::CreateBucket), 1);
    assert_eq!(faults.count(ClientOp::GetBucketAcl), 2);
}

#[test]
fn test_bootstrap_access_denied_is_fatal() {
    let store = Arc::new(MemoryClient::new());
    let faults = Arc::new(FaultyClient::new(store.clone()));
    faults.inject(Fault::on(ClientOp::GetBucketAcl).code("AccessDenied").status(403));

    let err = BucketFs::bootstrap(faults.clone(), TEST_BUCKET, FsOptions::default()).unwrap_err();
    match err {
        Error::BucketInaccessible { bucket, source } => {
            assert_eq!(bucket, TEST_BUCKET);
            assert_eq!(source.error_code(), Some("AccessDenied"));
        }
        other => panic!("unexpected error {}", other),
    }
    assert_eq!(faults.count(ClientOp::CreateBucket), 0);
    assert!(!store.has_bucket(TEST_BUCKET));
}

#[test]
fn test_bootstrap_create_failure() {
    let faults = Arc::new(FaultyClient::new(Arc::new(MemoryClient::new())));
    faults.inject(Fault::on(ClientOp::CreateBucket).code("TooManyBuckets"));

    let err = BucketFs::bootstrap(faults, TEST_BUCKET, FsOptions::default()).unwrap_err();
    assert!(matches!(err, Error::BucketCreateFailed { .. }));
}

#[test]
fn test_bootstrap_tolerates_concurrent_create() {
    // The bucket appears between the first lookup and the create
    let store = Arc::new(MemoryClient::new());
    store.create_bucket(TEST_BUCKET).unwrap();
    let faults = Arc::new(FaultyClient::new(store));
    faults.inject(
        Fault::on(ClientOp::GetBucketAcl)
            .code("NoSuchBucket")
            .status(404)
            .times(1),
    );

    BucketFs::bootstrap(faults.clone(), TEST_BUCKET, FsOptions::default()).unwrap();
    assert_eq!(faults.count(ClientOp::CreateBucket), 1);
    assert_eq!(faults.count(ClientOp::GetBucketAcl), 2);
}

#[test]
fn test_delete_bucket_lifecycle() {
    let store = Arc::new(MemoryClient::new());
    let fs = BucketFs::bootstrap(store.clone(), TEST_BUCKET, FsOptions::default()).unwrap();
    fs.write(TEST_KEY, TEST_OBJECT.as_bytes()).unwrap();

    let err = fs.clone().delete_bucket().unwrap_err();
    assert!(matches!(err, Error::BucketDeleteFailed { .. }));

    fs.remove_all("").unwrap();
    fs.delete_bucket().unwrap();
    assert!(!store.has_bucket(TEST_BUCKET));
}

#[test]
fn test_concurrent_writers_on_distinct_keys() {
    let bucket = TestBucket::new().unwrap();
    let fs = bucket.fs().clone();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let fs = fs.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    let key = format!("t{}/{}.txt", t, i);
                    fs.write(&key, key.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(bucket.len(), 200);
    assert_object_eq(&fs, "t3/7.txt", b"t3/7.txt");
}
