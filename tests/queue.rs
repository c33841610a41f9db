extern crate assetbundle;
extern crate env_logger;

use std::sync::Arc;
use std::time::Duration;

use assetbundle::prelude::*;

fn testbed(max_active: usize) -> (RequestQueue, BundleCache, Arc<Memory>) {
    let _ = env_logger::try_init();

    let memory = Arc::new(Memory::deferred());
    for name in &["a", "b", "c", "d"] {
        let bytes = BundleBuilder::new(*name)
            .with_asset("payload", name.as_bytes())
            .to_bytes()
            .unwrap();

        memory.insert(*name, &bytes);
    }

    let mut schemas = SchemaResolver::new();
    schemas.add("mem", memory.clone()).unwrap();

    (
        RequestQueue::new(max_active, schemas),
        BundleCache::new(),
        memory,
    )
}

#[test]
fn ceiling() {
    let (mut queue, mut cache, memory) = testbed(2);
    for name in &["a", "b", "c", "d"] {
        queue.enqueue(name, &format!("mem://{}", name), RequestParams::bundle(false));
    }

    assert_eq!(queue.queued_len(), 4);
    assert_eq!(queue.active_len(), 0);

    queue.advance(&mut cache);
    assert_eq!(queue.active_len(), 2);
    assert_eq!(queue.queued().collect::<Vec<_>>(), vec!["c", "d"]);
    assert_eq!(memory.pending_paths(), vec!["a", "b"]);

    assert_eq!(memory.complete("a"), 1);
    assert_eq!(queue.advance(&mut cache), 1);
    assert!(cache.contains("a"));
    assert_eq!(queue.active_len(), 2);
    assert_eq!(queue.queued().collect::<Vec<_>>(), vec!["d"]);
    assert_eq!(memory.pending_paths(), vec!["b", "c"]);

    while !queue.is_idle() {
        memory.complete_all();
        queue.advance(&mut cache);
        assert!(queue.active_len() <= 2);
    }

    for name in &["a", "b", "c", "d"] {
        let bundle = cache.get(name).unwrap();
        let asset = bundle.load_asset("payload").unwrap();
        assert_eq!(downcast::<RawAsset>(&asset).unwrap().bytes(), name.as_bytes());
    }

    assert!(queue.is_empty());
}

#[test]
fn dedup() {
    let (mut queue, mut cache, memory) = testbed(2);

    let h1 = queue.enqueue("a", "mem://a", RequestParams::bundle(false));
    let h2 = queue.enqueue("a", "mem://a", RequestParams::bundle(false));
    assert_eq!(h1, h2);
    assert_eq!(queue.len(), 1);

    queue.advance(&mut cache);
    let h3 = queue.enqueue("a", "mem://a", RequestParams::bundle(false));
    assert_eq!(h1, h3);
    assert!(queue.is_active("a"));

    memory.complete_all();
    queue.advance(&mut cache);
    assert!(!queue.is_active("a"));
    assert!(queue.get(h1).is_none());
    assert_eq!(memory.fetches("a"), 1);
    assert!(cache.get("a").is_some());
}

#[test]
fn failures_are_cached_as_empty() {
    let (mut queue, mut cache, memory) = testbed(4);
    memory.insert_failure("broken", "disk on fire");

    queue.enqueue("broken", "mem://broken", RequestParams::bundle(false));
    queue.enqueue("missing", "mem://missing", RequestParams::bundle(false));
    queue.enqueue("http", "http://missing", RequestParams::bundle(false));
    queue.advance(&mut cache);

    memory.complete_all();
    queue.advance(&mut cache);

    for name in &["broken", "missing", "http"] {
        assert!(!queue.is_active(name));
        assert!(cache.contains(name));
        assert!(cache.is_failed(name));
        assert!(cache.get(name).is_none());
    }

    assert!(queue.is_idle());
    assert_eq!(memory.fetches("http"), 0);
}

#[test]
fn malformed_bundle() {
    let (mut queue, mut cache, memory) = testbed(1);
    memory.insert("garbage", b"definitely not a bundle");

    queue.enqueue("garbage", "mem://garbage", RequestParams::bundle(false));
    queue.advance(&mut cache);
    memory.complete_all();
    queue.advance(&mut cache);

    assert!(cache.is_failed("garbage"));
}

#[test]
fn uncached() {
    let (mut queue, mut cache, memory) = testbed(2);
    memory.insert("motd.txt", b"hello");

    let raw = queue.enqueue("motd.txt", "mem://motd.txt", RequestParams::raw(None));
    let bundle = queue.enqueue("b", "mem://b", RequestParams::bundle(false).uncached());
    queue.advance(&mut cache);
    assert!(!queue.get(raw).unwrap().is_done());

    memory.complete_all();
    queue.advance(&mut cache);

    let request = queue.get(raw).unwrap();
    assert!(request.is_done());
    assert_eq!(request.progress(), 1.0);
    assert_eq!(request.text(), Some("hello"));
    assert!(request.error().is_none());

    let request = queue.get(bundle).unwrap();
    assert_eq!(request.bundle().unwrap().name(), "b");

    assert!(!cache.contains("motd.txt"));
    assert!(!cache.contains("b"));
    assert!(!queue.is_active("b"));
    assert_eq!(queue.len(), 2);

    assert!(queue.dispose(raw));
    assert!(queue.dispose(bundle));
    assert!(!queue.dispose(raw));
    assert!(queue.is_empty());
}

#[test]
fn raw_is_never_cached() {
    let (mut queue, mut cache, memory) = testbed(2);
    memory.insert("motd.txt", b"hello");

    let params = RequestParams {
        no_cache: false,
        ..RequestParams::raw(None)
    };

    let handle = queue.enqueue("motd.txt", "mem://motd.txt", params);
    assert!(queue.get(handle).unwrap().params().no_cache);

    queue.advance(&mut cache);
    memory.complete_all();
    queue.advance(&mut cache);
    assert!(!cache.contains("motd.txt"));
    assert!(queue.get(handle).unwrap().is_done());
}

#[test]
fn dispose() {
    let (mut queue, mut cache, memory) = testbed(1);
    memory.insert("x", b"x");
    memory.insert("y", b"y");

    let cached = queue.enqueue("a", "mem://a", RequestParams::bundle(false));
    let active = queue.enqueue("x", "mem://x", RequestParams::raw(None));
    let queued = queue.enqueue("y", "mem://y", RequestParams::raw(None));
    assert!(!queue.dispose(cached));

    queue.advance(&mut cache);
    assert!(queue.dispose(queued));
    assert!(queue.get(queued).is_none());
    assert!(!queue.is_requested("y"));

    memory.complete_all();
    queue.advance(&mut cache);
    assert!(cache.contains("a"));

    assert!(queue.dispose(active));
    assert!(queue.get(active).is_some());
    assert!(queue.is_requested("x"));
    assert!(!queue.is_active("x"));

    memory.complete_all();
    queue.advance(&mut cache);
    assert!(queue.get(active).is_none());
    assert!(queue.is_empty());
    assert_eq!(memory.fetches("y"), 0);
}

#[test]
fn timeout() {
    let (mut queue, mut cache, memory) = testbed(1);
    memory.insert("slow", b"slow");

    let handle = queue.enqueue("slow", "mem://slow", RequestParams::raw(Some(Duration::from_millis(0))));
    queue.advance(&mut cache);
    queue.advance(&mut cache);

    let request = queue.get(handle).unwrap();
    assert!(request.is_done());
    assert!(request.bytes().is_none());
    assert!(request.error().is_some());

    assert_eq!(memory.complete_all(), 1);
    queue.advance(&mut cache);
    assert!(queue.get(handle).unwrap().bytes().is_none());
}

#[test]
fn progress() {
    let (mut queue, mut cache, memory) = testbed(1);
    queue.enqueue("a", "mem://a", RequestParams::bundle(false));
    queue.enqueue("b", "mem://b", RequestParams::bundle(false));
    assert_eq!(queue.progress_of("a"), Some(0.0));

    queue.advance(&mut cache);
    assert_eq!(queue.progress_of("a"), Some(0.5));
    assert_eq!(queue.progress_of("b"), Some(0.0));
    assert_eq!(queue.progress_of("c"), None);

    memory.complete_all();
    queue.advance(&mut cache);
    assert_eq!(queue.progress_of("a"), None);
}

#[test]
fn cached_and_uncached_keys_apart() {
    let (mut queue, mut cache, memory) = testbed(4);

    let raw = queue.enqueue("a", "mem://a", RequestParams::bundle(false).uncached());
    assert!(!queue.is_active("a"));
    assert!(queue.is_requested("a"));

    let cached = queue.enqueue("a", "mem://a", RequestParams::bundle(true));
    assert!(raw != cached);
    assert!(queue.is_active("a"));
    assert_eq!(queue.find("a"), Some(cached));
    assert_eq!(queue.enqueue("a", "mem://a", RequestParams::bundle(false).uncached()), raw);

    queue.advance(&mut cache);
    memory.complete_all();
    queue.advance(&mut cache);

    assert!(!queue.is_active("a"));
    assert!(!queue.is_requested("a"));
    assert!(cache.get("a").is_some());
    assert_eq!(queue.get(raw).unwrap().bundle().unwrap().name(), "a");
    assert!(queue.get(cached).is_none());
    assert_eq!(memory.fetches("a"), 2);
}
