// Behavior every Cacher backend must share.
// Each check runs against the local disk backend and the in-memory backend.

use std::io::{Read, Seek, SeekFrom};

use cacher::{Cacher, Context, LocalCacher, MemoryCacher};
use tempfile::TempDir;

fn backends() -> Vec<(&'static str, Box<dyn Cacher>, Option<TempDir>)> {
    let temp_dir = TempDir::new().unwrap();
    let local = LocalCacher::new(temp_dir.path().to_string_lossy().replace('\\', "/"));
    vec![
        ("local", Box::new(local), Some(temp_dir)),
        ("memory", Box::new(MemoryCacher::new()), None),
    ]
}

fn fetch(cacher: &dyn Cacher, name: &str) -> Vec<u8> {
    let mut entry = cacher.get(&Context::background(), name).unwrap();
    let mut out = Vec::new();
    entry.read_to_end(&mut out).unwrap();
    entry.close().unwrap();
    out
}

#[test]
fn test_round_trip() {
    let payloads: [&[u8]; 3] = [b"", b"small", &[0xAB; 200_000]];
    for (kind, cacher, _guard) in backends() {
        for (i, payload) in payloads.iter().enumerate() {
            let name = format!("mods/{i}.zip");
            cacher
                .set(&Context::background(), &name, &mut &payload[..])
                .unwrap();
            assert_eq!(fetch(cacher.as_ref(), &name), *payload, "{kind} payload {i}");
        }
    }
}

#[test]
fn test_miss_is_not_found() {
    for (kind, cacher, _guard) in backends() {
        let err = cacher
            .get(&Context::background(), "github.com/none/@v/list")
            .unwrap_err();
        assert!(err.is_not_found(), "{kind}: {err:?}");
    }
}

#[test]
fn test_overwrite_leaves_no_residue() {
    for (kind, cacher, _guard) in backends() {
        let ctx = Context::background();
        cacher.set(&ctx, "v", &mut &b"a much longer first payload"[..]).unwrap();
        cacher.set(&ctx, "v", &mut &b"short"[..]).unwrap();
        assert_eq!(fetch(cacher.as_ref(), "v"), b"short", "{kind}");
    }
}

#[test]
fn test_nested_names_and_name_echo() {
    for (kind, cacher, _guard) in backends() {
        let ctx = Context::background();
        cacher.set(&ctx, "a/b/c", &mut &b"nested"[..]).unwrap();

        let entry = cacher.get(&ctx, "a/b/c").unwrap();
        assert_eq!(entry.name(), "a/b/c", "{kind}");
    }
}

#[test]
fn test_seek_matches_skipped_read() {
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    for (kind, cacher, _guard) in backends() {
        let ctx = Context::background();
        cacher.set(&ctx, "ranged", &mut payload.as_slice()).unwrap();

        for k in [0usize, 1, 4096, 9_999, 10_000] {
            let mut entry = cacher.get(&ctx, "ranged").unwrap();
            entry.seek(SeekFrom::Start(k as u64)).unwrap();
            let mut rest = Vec::new();
            entry.read_to_end(&mut rest).unwrap();
            assert_eq!(rest, &payload[k..], "{kind} offset {k}");
        }
    }
}

#[test]
fn test_cancellation_is_not_a_miss() {
    for (kind, cacher, _guard) in backends() {
        let ctx = Context::background();
        ctx.cancel();

        let err = cacher.get(&ctx, "anything").unwrap_err();
        assert!(!err.is_not_found(), "{kind}");
        assert!(cacher.set(&ctx, "anything", &mut &b"x"[..]).is_err(), "{kind}");
    }
}
