//! Folder-backed media source: recursive scan plus a filesystem watcher.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::feed::FeedFrame;
use crate::item::{Item, ItemId, MediaKind};
use crate::source::{FetchError, MediaSource, SourceError};

/// Dimensions assumed for video files; probing container metadata is
/// not worth a demuxer dependency for layout purposes.
const VIDEO_DIMENSIONS: (u32, u32) = (1280, 720);

/// Media library rooted at a directory. Item ids are root-relative
/// paths, stable across scans.
#[derive(Debug, Clone)]
pub struct FolderSource {
    root: PathBuf,
}

impl FolderSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &ItemId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn scan(&self) -> Result<Vec<Item>, SourceError> {
        fs::metadata(&self.root)?;
        let mut items = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            if let Some(item) = probe(&self.root, entry.path()) {
                items.push(item);
            }
        }
        Ok(items)
    }
}

impl MediaSource for FolderSource {
    async fn list_once(&self) -> Result<Vec<Item>, SourceError> {
        self.scan()
    }

    async fn subscribe(&self) -> Result<Receiver<FeedFrame>, SourceError> {
        let snapshot = self.scan()?;
        let (frame_tx, frame_rx) = mpsc::channel::<FeedFrame>(32);
        let (watch_tx, watch_rx) = mpsc::channel::<notify::Result<Event>>(128);
        let mut watcher = recommended_watcher(move |res| {
            let _ = watch_tx.blocking_send(res);
        })?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        match self.root.canonicalize() {
            Ok(abs) => info!(watching = %abs.display(), "library watcher initialized"),
            Err(_) => info!(watching = %self.root.display(), "library watcher initialized"),
        }
        tokio::spawn(forward_events(
            self.root.clone(),
            watcher,
            watch_rx,
            frame_tx,
            snapshot,
        ));
        Ok(frame_rx)
    }

    async fn fetch(&self, item: &Item) -> Result<Vec<u8>, FetchError> {
        let path = self.path_for(&item.id);
        Ok(tokio::fs::read(&path).await?)
    }
}

/// Bridge filesystem notifications into feed frames. The watcher moves
/// in here so it lives exactly as long as the subscription.
async fn forward_events(
    root: PathBuf,
    watcher: impl Watcher + Send + 'static,
    mut watch_rx: Receiver<notify::Result<Event>>,
    frames: Sender<FeedFrame>,
    snapshot: Vec<Item>,
) {
    let _watcher = watcher;
    let mut announced: HashSet<ItemId> = snapshot.iter().map(|item| item.id.clone()).collect();
    if frames
        .send(FeedFrame::Snapshot { images: snapshot })
        .await
        .is_err()
    {
        return;
    }

    while let Some(res) = watch_rx.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                error!("library watch error: {err}");
                continue;
            }
        };
        debug!(kind = ?event.kind, paths = ?event.paths, "library event");
        let frame = match &event.kind {
            // A create can fire before the bytes are all there, so the
            // close-write and data-modify kinds get a probe as well; the
            // announced set keeps each file to one addition.
            EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
                additions_frame(&root, event.paths, &mut announced)
            }
            EventKind::Remove(_) => removals_frame(&root, event.paths, &mut announced),
            // Renames report as Name(Any) on some platforms; decide
            // per-path by existence.
            EventKind::Modify(ModifyKind::Name(_)) => {
                let (arrived, departed): (Vec<PathBuf>, Vec<PathBuf>) = event
                    .paths
                    .into_iter()
                    .filter(|p| media_kind(p).is_some())
                    .partition(|p| p.exists());
                let additions: Vec<Item> = arrived
                    .iter()
                    .filter_map(|p| announce(&root, p, &mut announced))
                    .collect();
                let deletions: Vec<ItemId> = departed
                    .iter()
                    .filter_map(|p| retract(&root, p, &mut announced))
                    .collect();
                if additions.is_empty() && deletions.is_empty() {
                    None
                } else {
                    Some(FeedFrame::Delta {
                        additions,
                        deletions,
                    })
                }
            }
            _ => {
                debug!(kind = ?event.kind, "library event ignored");
                None
            }
        };
        if let Some(frame) = frame {
            if frames.send(frame).await.is_err() {
                return;
            }
        }
    }
}

fn additions_frame(
    root: &Path,
    paths: Vec<PathBuf>,
    announced: &mut HashSet<ItemId>,
) -> Option<FeedFrame> {
    let additions: Vec<Item> = paths
        .iter()
        .filter_map(|p| announce(root, p, announced))
        .collect();
    match additions.len() {
        0 => None,
        1 => {
            let mut additions = additions;
            Some(FeedFrame::Addition {
                addition: additions.remove(0),
            })
        }
        _ => Some(FeedFrame::Delta {
            additions,
            deletions: Vec::new(),
        }),
    }
}

fn removals_frame(
    root: &Path,
    paths: Vec<PathBuf>,
    announced: &mut HashSet<ItemId>,
) -> Option<FeedFrame> {
    let deletions: Vec<ItemId> = paths
        .iter()
        .filter_map(|p| retract(root, p, announced))
        .collect();
    if deletions.is_empty() {
        None
    } else {
        Some(FeedFrame::Delta {
            additions: Vec::new(),
            deletions,
        })
    }
}

fn announce(root: &Path, path: &Path, announced: &mut HashSet<ItemId>) -> Option<Item> {
    let item = probe(root, path)?;
    if !announced.insert(item.id.clone()) {
        return None;
    }
    info!(path = %path.display(), "library: add");
    Some(item)
}

fn retract(root: &Path, path: &Path, announced: &mut HashSet<ItemId>) -> Option<ItemId> {
    media_kind(path)?;
    let id = item_id(root, path);
    if !announced.remove(&id) {
        return None;
    }
    info!(path = %path.display(), "library: remove");
    Some(id)
}

fn probe(root: &Path, path: &Path) -> Option<Item> {
    let kind = media_kind(path)?;
    let (width, height) = match kind {
        MediaKind::Image => match display_dimensions(path) {
            Ok(dims) => dims,
            Err(err) => {
                debug!(path = %path.display(), "dimension probe failed: {err}");
                return None;
            }
        },
        MediaKind::Video => VIDEO_DIMENSIONS,
    };
    let created_at = fs::metadata(path)
        .ok()
        .and_then(|meta| meta.created().or_else(|_| meta.modified()).ok())
        .unwrap_or_else(SystemTime::now);
    Some(Item {
        id: item_id(root, path),
        kind,
        width,
        height,
        created_at,
    })
}

fn item_id(root: &Path, path: &Path) -> ItemId {
    let relative = path.strip_prefix(root).unwrap_or(path);
    ItemId(relative.to_string_lossy().replace('\\', "/"))
}

fn media_kind(path: &Path) -> Option<MediaKind> {
    let ext = path
        .extension()
        .and_then(OsStr::to_str)
        .map(|s| s.to_ascii_lowercase())?;
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" => Some(MediaKind::Image),
        "mp4" | "webm" | "mov" => Some(MediaKind::Video),
        _ => None,
    }
}

/// Header-only dimension read with EXIF orientation applied, so portrait
/// shots report their upright size.
fn display_dimensions(path: &Path) -> Result<(u32, u32), image::ImageError> {
    let (raw_w, raw_h) = image::image_dimensions(path)?;
    let orientation = read_exif_orientation(path).unwrap_or(1);
    let swap = matches!(orientation, 5 | 6 | 7 | 8);
    Ok(if swap { (raw_h, raw_w) } else { (raw_w, raw_h) })
}

fn read_exif_orientation(path: &Path) -> Option<u16> {
    let file = fs::File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let reader = exif::Reader::new().read_from_container(&mut buf).ok()?;
    use exif::{In, Tag, Value};
    let field = reader.get_field(Tag::Orientation, In::PRIMARY)?;
    match &field.value {
        Value::Short(arr) if !arr.is_empty() => Some(arr[0]),
        Value::Long(arr) if !arr.is_empty() => Some(arr[0] as u16),
        _ => Some(1),
    }
}
