//! Integration tests for `RemoteFs` over the in-memory remote.
//!
//! # Sections
//!
//! - **Directories:** makedir, listing, pagination, removedir
//! - **Files:** open modes, round trips, revision checks at close
//! - **Sub-views:** path rewriting and root protection

use std::io::SeekFrom;
use std::sync::Arc;

use dropfs::remote::{Dimensions, Endpoint, MediaMetadata, MemoryRemote, RemoteMediaInfo};
use dropfs::{Filesystem, RemoteFs, VfsError};

// ============================================================================
// Shared test setup
// ============================================================================

fn setup() -> (Arc<MemoryRemote>, RemoteFs) {
    setup_paged(dropfs::remote::DEFAULT_PAGE_SIZE)
}

fn setup_paged(page_size: usize) -> (Arc<MemoryRemote>, RemoteFs) {
    // Surface remote-call logs when a test fails
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dropfs=debug")
        .with_test_writer()
        .try_init();

    let remote = Arc::new(MemoryRemote::with_page_size(page_size));
    let fs = RemoteFs::from_client(remote.clone());
    (remote, fs)
}

// ============================================================================
// Directories
// ============================================================================

#[tokio::test]
async fn fresh_directory_is_a_directory() {
    let (_, fs) = setup();
    fs.makedir("/photos", false).await.unwrap();

    let info = fs.getinfo("/photos").await.unwrap();
    assert!(info.is_dir());
    assert_eq!(info.name, "photos");
    assert!(fs.listdir("/photos").await.unwrap().is_empty());
}

#[tokio::test]
async fn makedir_existing_directory() {
    let (_, fs) = setup();
    fs.makedir("/d", false).await.unwrap();

    assert!(matches!(
        fs.makedir("/d", false).await,
        Err(VfsError::DirectoryExists(_))
    ));

    let sub = fs.makedir("/d", true).await.unwrap();
    assert_eq!(sub.root(), "/d");
}

#[tokio::test]
async fn makedir_returns_working_subview() {
    let (remote, fs) = setup();
    let sub = fs.makedir("/projects", false).await.unwrap();
    sub.writebytes("/notes.txt", b"hi").await.unwrap();

    assert_eq!(remote.file_content("/projects/notes.txt").unwrap(), b"hi");
    assert_eq!(fs.listdir("/projects").await.unwrap(), ["notes.txt"]);
}

#[tokio::test]
async fn listing_drains_all_pages_in_order() {
    let (remote, fs) = setup_paged(2);
    let names: Vec<String> = (0..7).map(|i| format!("f{i}")).collect();
    for name in &names {
        remote.put_file(&format!("/big/{name}"), b"");
    }

    assert_eq!(fs.listdir("/big").await.unwrap(), names);
    // 7 entries in pages of 2 is one list call and three continuations
    assert_eq!(remote.calls(Endpoint::ListFolder), 1);
    assert_eq!(remote.calls(Endpoint::ListFolderContinue), 3);

    let infos = fs.scandir("/big", Some(5..9)).await.unwrap();
    let window: Vec<_> = infos.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(window, ["f5", "f6"]);
}

#[tokio::test]
async fn listing_root_uses_empty_token() {
    let (remote, fs) = setup();
    remote.put_file("/a", b"");
    remote.put_folder("/b");

    let infos = fs.scandir("/", None).await.unwrap();
    assert_eq!(infos.len(), 2);
    assert!(infos[0].is_file());
    assert!(infos[1].is_dir());
}

#[tokio::test]
async fn removedir_non_empty_then_empty() {
    let (remote, fs) = setup();
    fs.makedir("/d", false).await.unwrap();
    fs.writebytes("/d/f", b"x").await.unwrap();

    assert!(matches!(
        fs.removedir("/d").await,
        Err(VfsError::DirectoryNotEmpty(_))
    ));

    fs.remove("/d/f").await.unwrap();
    fs.removedir("/d").await.unwrap();
    assert!(!remote.contains("/d"));
    assert!(!fs.exists("/d").await.unwrap());
}

#[tokio::test]
async fn removedir_root_is_refused() {
    let (remote, fs) = setup();
    assert!(matches!(fs.removedir("/").await, Err(VfsError::RemoveRoot)));

    remote.put_file("/keep", b"");
    assert!(matches!(fs.removedir("/").await, Err(VfsError::RemoveRoot)));
    assert_eq!(remote.calls(Endpoint::Delete), 0);
}

#[tokio::test]
async fn removedir_missing() {
    let (_, fs) = setup();
    assert!(fs.removedir("/nope").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn case_insensitive_lookup() {
    let (remote, fs) = setup();
    remote.put_file("/Docs/Report.PDF", b"%PDF");
    assert!(fs.isfile("/docs/report.pdf").await.unwrap());
    assert!(fs.isdir("/DOCS").await.unwrap());
}

// ============================================================================
// Files
// ============================================================================

#[tokio::test]
async fn write_then_read_round_trip() {
    let (_, fs) = setup();
    fs.writebytes("/a.bin", &[0, 1, 2, 255]).await.unwrap();
    assert_eq!(fs.readbytes("/a.bin").await.unwrap(), [0, 1, 2, 255]);

    let info = fs.getinfo("/a.bin").await.unwrap();
    assert!(info.is_file());
    assert_eq!(info.size, Some(4));
    assert!(info.rev.is_some());
    assert!(info.content_hash.is_some());
}

#[tokio::test]
async fn append_extends_existing_content() {
    let (_, fs) = setup();
    fs.writebytes("/log", b"AAA").await.unwrap();

    let mut file = fs.openbin("/log", "ab").await.unwrap();
    file.write(b"BBB").unwrap();
    file.close().await.unwrap();

    assert_eq!(fs.readbytes("/log").await.unwrap(), b"AAABBB");
}

#[tokio::test]
async fn update_in_place() {
    let (_, fs) = setup();
    fs.writebytes("/f", b"AAA").await.unwrap();

    let mut file = fs.openbin("/f", "r+b").await.unwrap();
    file.seek(SeekFrom::Start(1)).unwrap();
    file.write(b"X").unwrap();
    file.close().await.unwrap();

    assert_eq!(fs.readbytes("/f").await.unwrap(), b"AXA");
}

#[tokio::test]
async fn growing_truncate_pads_and_keeps_position() {
    let (_, fs) = setup();
    fs.writebytes("/f", b"abc").await.unwrap();

    let mut file = fs.openbin("/f", "r+b").await.unwrap();
    file.seek(SeekFrom::End(0)).unwrap();
    assert_eq!(file.truncate(Some(6)).unwrap(), 6);
    assert_eq!(file.tell().unwrap(), 3);
    file.close().await.unwrap();

    assert_eq!(fs.readbytes("/f").await.unwrap(), b"abc\0\0\0");
}

#[tokio::test]
async fn exclusive_create() {
    let (remote, fs) = setup();
    fs.writebytes("/taken", b"x").await.unwrap();
    assert!(matches!(
        fs.openbin("/taken", "xb").await,
        Err(VfsError::FileExists(_))
    ));

    let uploads = remote.calls(Endpoint::Upload);
    let mut file = fs.openbin("/fresh", "xb").await.unwrap();
    file.write(b"new").unwrap();
    // Nothing exists remotely until close
    assert!(!remote.contains("/fresh"));
    assert_eq!(remote.calls(Endpoint::Upload), uploads);

    file.close().await.unwrap();
    assert_eq!(remote.file_content("/fresh").unwrap(), b"new");
    assert_eq!(remote.calls(Endpoint::Upload), uploads + 1);
}

#[tokio::test]
async fn stale_revision_fails_at_close() {
    let (remote, fs) = setup();
    fs.writebytes("/shared", b"v1").await.unwrap();

    let mut ours = fs.openbin("/shared", "wb").await.unwrap();
    ours.write(b"ours").unwrap();

    // Someone else writes in between
    fs.writebytes("/shared", b"theirs").await.unwrap();

    let err = ours.close().await.unwrap_err();
    assert!(matches!(err, VfsError::OperationFailed { .. }));
    assert!(ours.is_closed());
    assert_eq!(remote.file_content("/shared").unwrap(), b"theirs");
}

#[tokio::test]
async fn new_file_race_fails_at_close() {
    let (remote, fs) = setup();

    let mut ours = fs.openbin("/race", "wb").await.unwrap();
    ours.write(b"ours").unwrap();
    remote.put_file("/race", b"theirs");

    assert!(ours.close().await.is_err());
    assert_eq!(remote.file_content("/race").unwrap(), b"theirs");
}

#[tokio::test]
async fn text_mode_is_rejected() {
    let (_, fs) = setup();
    assert!(matches!(
        fs.openbin("/a", "wt").await,
        Err(VfsError::InvalidMode(_))
    ));
    assert!(matches!(
        fs.openbin("/a", "bogus").await,
        Err(VfsError::InvalidMode(_))
    ));
}

#[tokio::test]
async fn remove_file() {
    let (remote, fs) = setup();
    fs.writebytes("/gone", b"x").await.unwrap();
    fs.remove("/gone").await.unwrap();
    assert!(!remote.contains("/gone"));
    assert!(fs.remove("/gone").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn media_metadata_is_exposed() {
    let (remote, fs) = setup();
    remote.put_file("/img.jpg", b"\xff\xd8");
    remote.set_media_info(
        "/img.jpg",
        RemoteMediaInfo::Metadata {
            metadata: MediaMetadata {
                dimensions: Some(Dimensions {
                    height: 480,
                    width: 640,
                }),
                ..Default::default()
            },
        },
    );

    let info = fs.getinfo("/img.jpg").await.unwrap();
    assert_eq!(info.media.unwrap().dimensions, Some((640, 480)));
}

// ============================================================================
// Sub-views
// ============================================================================

#[tokio::test]
async fn subview_rewrites_paths() {
    let (remote, fs) = setup();
    remote.put_file("/root/inner/a.txt", b"abc");

    let sub = fs.opendir("/root").await.unwrap();
    assert_eq!(sub.readbytes("inner/a.txt").await.unwrap(), b"abc");
    assert_eq!(sub.listdir("/").await.unwrap(), ["inner"]);

    let root_info = sub.getinfo("/").await.unwrap();
    assert!(root_info.is_dir());

    let nested = sub.makedir("/inner", true).await.unwrap();
    assert_eq!(nested.root(), "/root/inner");
}

#[tokio::test]
async fn subview_cannot_escape_or_remove_its_root() {
    let (remote, fs) = setup();
    remote.put_folder("/jail");
    remote.put_file("/secret", b"x");

    let sub = fs.opendir("/jail").await.unwrap();
    assert!(matches!(
        sub.getinfo("../secret").await,
        Err(VfsError::IllegalBackReference(_))
    ));
    assert!(matches!(sub.removedir("/").await, Err(VfsError::RemoveRoot)));
    assert!(remote.contains("/jail"));
}

#[tokio::test]
async fn opendir_requires_directory() {
    let (remote, fs) = setup();
    remote.put_file("/file", b"");
    assert!(matches!(
        fs.opendir("/file").await,
        Err(VfsError::DirectoryExpected(_))
    ));
    assert!(fs.opendir("/none").await.unwrap_err().is_not_found());
}
