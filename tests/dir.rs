extern crate assetbundle;
extern crate env_logger;
extern crate rand;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use assetbundle::prelude::*;

fn workspace() -> PathBuf {
    let _ = env_logger::try_init();

    let dir = ::std::env::temp_dir().join(format!("assetbundle-{}", rand::random::<u64>()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn schemas() -> SchemaResolver {
    let mut schemas = SchemaResolver::new();
    schemas.add("file", Arc::new(Dir::new())).unwrap();
    schemas
}

fn drain(queue: &mut RequestQueue, cache: &mut BundleCache) {
    for _ in 0..500 {
        queue.advance(cache);
        if queue.is_idle() {
            return;
        }

        thread::sleep(Duration::from_millis(10));
    }

    panic!("requests never completed.");
}

#[test]
fn bundles() {
    let dir = workspace();
    let mut file = fs::File::create(dir.join("ui")).unwrap();
    BundleBuilder::new("ui")
        .with_dependency("textures")
        .with_asset("Assets/AssetsPackage/ui/login.prefab", b"login")
        .with_asset("Assets/AssetsPackage/ui/main.prefab", b"main")
        .write_to(&mut file)
        .unwrap();
    drop(file);

    let mut queue = RequestQueue::new(2, schemas());
    let mut cache = BundleCache::new();

    let header = format!("file://{}", dir.join("ui").display());
    queue.enqueue("ui", &header, RequestParams::bundle(true));
    let full = queue.enqueue("ui-full", &header, RequestParams::bundle(false).uncached());
    let missing = format!("file://{}", dir.join("missing").display());
    queue.enqueue("missing", &missing, RequestParams::bundle(true));
    drain(&mut queue, &mut cache);

    let bundle = cache.get("ui").unwrap();
    assert_eq!(bundle.dependencies(), &["textures".to_owned()][..]);
    assert_eq!(bundle.asset_names().len(), 2);

    let asset = bundle.load_asset("Assets/AssetsPackage/ui/main.prefab").unwrap();
    assert_eq!(downcast::<RawAsset>(&asset).unwrap().bytes(), b"main");

    let request = queue.get(full).unwrap();
    let asset = request
        .bundle()
        .unwrap()
        .load_asset("Assets/AssetsPackage/ui/login.prefab")
        .unwrap();
    assert_eq!(downcast::<RawAsset>(&asset).unwrap().text(), Some("login"));

    assert!(cache.is_failed("missing"));

    bundle.unload(true);
    assert!(bundle.load_asset("Assets/AssetsPackage/ui/main.prefab").is_none());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn files() {
    let dir = workspace();
    let content: Vec<u8> = (0..200_000).map(|_| rand::random::<u8>()).collect();
    fs::write(dir.join("blob.bin"), &content).unwrap();
    fs::write(dir.join("motd.txt"), b"welcome").unwrap();

    let mut queue = RequestQueue::new(2, schemas());
    let mut cache = BundleCache::new();

    let blob = format!("file://{}", dir.join("blob.bin").display());
    let blob = queue.enqueue("blob.bin", &blob, RequestParams::raw(None));
    let motd = format!("file://{}", dir.join("motd.txt").display());
    let motd = queue.enqueue("motd.txt", &motd, RequestParams::raw(None));
    drain(&mut queue, &mut cache);

    assert_eq!(queue.get(blob).unwrap().bytes(), Some(&content[..]));
    assert_eq!(queue.get(blob).unwrap().progress(), 1.0);
    assert_eq!(queue.get(motd).unwrap().text(), Some("welcome"));
    assert!(cache.is_empty());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn persistent_copies() {
    let dir = workspace();
    fs::write(dir.join("config.json"), b"{}").unwrap();

    let urls = LocalFirstResolver::new("mem://packaged").with_persistent(&dir);
    assert_eq!(
        urls.local_url("config.json", false),
        format!("file://{}", dir.join("config.json").display())
    );
    assert_eq!(urls.local_url("config.json", true), "mem://packaged/config.json");
    assert_eq!(urls.bundle_url("ui"), "mem://packaged/ui");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn direct_pipeline() {
    let dir = workspace();
    let params = BundleParams::default();

    let location = dir.join(params.package_to_assets_path("ui/login.prefab"));
    fs::create_dir_all(location.parent().unwrap()).unwrap();
    fs::write(&location, b"login").unwrap();

    let mut sys = AssetSystem::direct(params, schemas(), DirectDirectory::new(&dir));
    sys.initialize();
    assert!(sys.is_ready());

    let loader = sys.load_asset_async("ui/login.prefab").unwrap();
    let v = sys.asset_loader(loader).unwrap();
    assert!(v.is_done());
    assert_eq!(downcast::<RawAsset>(v.asset().unwrap()).unwrap().bytes(), b"login");
    assert_eq!(sys.asset_loader_progress(loader), 1.0);
    assert!(sys.dispose_asset_loader(loader));

    let asset = sys.load_asset_sync("ui/login.prefab").unwrap();
    assert_eq!(downcast::<RawAsset>(&asset).unwrap().text(), Some("login"));
    assert!(sys.load_asset_sync("ui/missing.prefab").is_none());

    let loader = sys.load_asset_async("ui/missing.prefab").unwrap();
    assert!(sys.asset_loader(loader).unwrap().asset().is_none());

    let loader = sys.load_bundle_async("ui", false).unwrap();
    assert!(sys.bundle_loader(loader).unwrap().is_done());
    assert!(sys.bundle_loader(loader).unwrap().bundle().is_none());

    assert!(sys.download_asset_file("motd.txt", None).is_none());
    assert!(sys.request_asset_bundle("ui").is_none());

    let request = sys
        .request_asset_file("Assets/AssetsPackage/ui/login.prefab", false)
        .unwrap();
    for _ in 0..500 {
        sys.advance();
        if !sys.is_process_running() {
            break;
        }

        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(sys.request(request).unwrap().text(), Some("login"));
    assert!(sys.dispose_request(request));

    sys.teardown();
    assert!(sys.is_torn_down());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn direct_teardown_drains_requests() {
    let dir = workspace();
    let memory = Arc::new(Memory::deferred());
    memory.insert("cdn/motd.txt", b"welcome");

    let mut schemas = schemas();
    schemas.add("mem", memory.clone()).unwrap();

    let reader = DirectDirectory::new(&dir);
    let mut sys = DirectPipeline::new(BundleParams::default(), schemas, reader).with_remote("mem://cdn/");
    let request = sys.download_asset_file("motd.txt", None).unwrap();
    sys.advance();

    sys.teardown();
    assert_eq!(sys.state(), InitState::Closing);
    assert!(!sys.is_torn_down());
    assert!(sys.load_asset_sync("ui/login.prefab").is_none());
    assert!(sys.download_asset_file("motd.txt", None).is_none());

    memory.complete_all();
    sys.advance();
    assert!(sys.is_torn_down());
    assert_eq!(sys.request(request).unwrap().text(), Some("welcome"));

    sys.initialize();
    assert!(sys.is_ready());
    fs::remove_dir_all(&dir).unwrap();
}
