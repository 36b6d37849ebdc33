//! File system watcher for live rebuild.
//!
//! `watch` builds once, starts the dev server in the background and then
//! rebuilds the whole site whenever a source file changes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Event Loop                              │
//! │                                                              │
//! │  ┌──────────────┐    ┌──────────────┐    ┌───────────────┐   │
//! │  │ Monitor      │───▶│ Change       │───▶│ build_site()  │   │
//! │  │ event | poll │    │ (filtered)   │    │ full rebuild  │   │
//! │  └──────────────┘    └──────────────┘    └───────────────┘   │
//! │         ▲                                        │           │
//! │         └──────────── rebuilt() ◀────────────────┘           │
//! └──────────────────────────────────────────────────────────────┘
//!
//!   server thread (detached) ── reads _output/ ──▶ HTTP responses
//! ```
//!
//! Two monitors exist. [`EventMonitor`] subscribes to `notify` events for the
//! whole site root and ignores events arriving within the debounce window of
//! the previous build. [`PollMonitor`] rescans the tree on a fixed interval
//! and fires when the newest modification time moves forward. Both skip the
//! output directory, dot-paths and editor temp files.
//!
//! # Known race
//!
//! The server thread is not synchronized with rebuilds. `build_site` deletes
//! and rewrites `_output/`, so a request arriving mid-rebuild may see a
//! missing or half-written file and get a 404 or a truncated page. The next
//! request after the rebuild finishes is served correctly.

use crate::{
    build::build_site,
    config::{SiteConfig, SitePaths, WatchBackend},
    log,
    serve::serve_site,
    shutdown::Shutdown,
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    path::{Component, Path, PathBuf},
    sync::mpsc::{self, Receiver},
    thread,
    time::{Duration, Instant, SystemTime},
};
use walkdir::WalkDir;

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with('#')
}

/// Whether a change at `path` should trigger a rebuild.
///
/// Anything inside the output directory, under a dot-directory (`.git/`) or
/// looking like an editor artifact is ignored.
fn is_source(path: &Path, paths: &SitePaths) -> bool {
    if paths.is_output(path) || is_temp_file(path) {
        return false;
    }

    let rel = path.strip_prefix(&paths.root).unwrap_or(path);
    !rel.components().any(|c| match c {
        Component::Normal(s) => s.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Format path relative to the site root for log display.
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

// =============================================================================
// Monitors
// =============================================================================

/// A source change that should trigger a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: PathBuf,
}

/// Blocks until the site sources change.
pub trait Monitor {
    fn name(&self) -> &'static str;

    /// Wait for the next change. `None` means shutdown was requested.
    fn next_change(&mut self) -> Option<Change>;

    /// Called after every rebuild triggered by a change.
    fn rebuilt(&mut self) {}
}

/// Ignores changes for a fixed window after each build.
#[derive(Debug)]
struct Debouncer {
    window: Duration,
    last_build: Option<Instant>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_build: None,
        }
    }

    fn in_window(&self) -> bool {
        self.last_build.is_some_and(|t| t.elapsed() < self.window)
    }

    fn mark_build(&mut self) {
        self.last_build = Some(Instant::now());
    }
}

enum Message {
    Fs(notify::Result<Event>),
    Stop,
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}

/// `notify`-backed monitor of the whole site root.
pub struct EventMonitor {
    /// `None` only when fed from a bare channel.
    _watcher: Option<RecommendedWatcher>,
    rx: Receiver<Message>,
    paths: SitePaths,
    debouncer: Debouncer,
}

impl EventMonitor {
    pub fn new(config: &SiteConfig, shutdown: &Shutdown) -> Result<Self> {
        let (tx, rx) = mpsc::channel();

        let fs_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = fs_tx.send(Message::Fs(res));
        })
        .context("Failed to create file watcher")?;

        let root = config.get_root();
        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        shutdown.on_trigger(move || {
            let _ = tx.send(Message::Stop);
        });

        Ok(Self {
            _watcher: Some(watcher),
            ..Self::from_channel(rx, &config.paths, config.watch.debounce())
        })
    }

    /// Monitor reading already-subscribed messages from `rx`.
    fn from_channel(rx: Receiver<Message>, paths: &SitePaths, window: Duration) -> Self {
        Self {
            _watcher: None,
            rx,
            paths: paths.clone(),
            debouncer: Debouncer::new(window),
        }
    }

    /// First path of `event` that counts as a source change, if any.
    fn source_path(&self, event: Event) -> Option<PathBuf> {
        if !is_relevant(&event) {
            return None;
        }
        event
            .paths
            .into_iter()
            .find(|p| is_source(p, &self.paths) && !p.is_dir())
    }
}

impl Monitor for EventMonitor {
    fn name(&self) -> &'static str {
        "event"
    }

    fn next_change(&mut self) -> Option<Change> {
        loop {
            match self.rx.recv() {
                Ok(Message::Fs(Ok(event))) => {
                    let Some(path) = self.source_path(event) else {
                        continue;
                    };
                    if self.debouncer.in_window() {
                        continue;
                    }
                    return Some(Change { path });
                }
                Ok(Message::Fs(Err(e))) => log!("watch"; "error: {e}"),
                Ok(Message::Stop) | Err(_) => return None,
            }
        }
    }

    fn rebuilt(&mut self) {
        self.debouncer.mark_build();
    }
}

/// Polling fallback: compares the newest mtime in the tree every interval.
pub struct PollMonitor {
    paths: SitePaths,
    interval: Duration,
    shutdown: Shutdown,
    last: Option<SystemTime>,
}

impl PollMonitor {
    /// Takes the current newest mtime as baseline.
    pub fn new(config: &SiteConfig, shutdown: &Shutdown) -> Self {
        Self::with_interval(&config.paths, config.watch.poll_interval(), shutdown)
    }

    fn with_interval(paths: &SitePaths, interval: Duration, shutdown: &Shutdown) -> Self {
        let last = latest_mtime(paths).map(|(mtime, _)| mtime);
        Self {
            paths: paths.clone(),
            interval,
            shutdown: shutdown.clone(),
            last,
        }
    }
}

impl Monitor for PollMonitor {
    fn name(&self) -> &'static str {
        "poll"
    }

    fn next_change(&mut self) -> Option<Change> {
        loop {
            if self.shutdown.wait_timeout(self.interval) {
                return None;
            }
            if let Some((mtime, path)) = latest_mtime(&self.paths)
                && Some(mtime) > self.last
            {
                self.last = Some(mtime);
                return Some(Change { path });
            }
        }
    }
}

/// Newest modification time among source files, with the file it belongs to.
fn latest_mtime(paths: &SitePaths) -> Option<(SystemTime, PathBuf)> {
    WalkDir::new(&paths.root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || is_source(e.path(), paths))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let mtime = e.metadata().ok()?.modified().ok()?;
            Some((mtime, e.into_path()))
        })
        .max_by_key(|(mtime, _)| *mtime)
}

/// Pick the monitor for `[watch].backend`; `auto` falls back to polling when
/// the platform watcher can't be set up.
fn select_monitor(config: &SiteConfig, shutdown: &Shutdown) -> Result<Box<dyn Monitor>> {
    Ok(match config.watch.backend {
        WatchBackend::Event => Box::new(EventMonitor::new(config, shutdown)?),
        WatchBackend::Poll => Box::new(PollMonitor::new(config, shutdown)),
        WatchBackend::Auto => match EventMonitor::new(config, shutdown) {
            Ok(monitor) => Box::new(monitor),
            Err(e) => {
                log!("watch"; "event watcher unavailable ({e:#}), polling instead");
                Box::new(PollMonitor::new(config, shutdown))
            }
        },
    })
}

// =============================================================================
// Public API
// =============================================================================

/// Build, serve in the background and rebuild on change until Ctrl+C.
pub fn watch_site(config: &'static SiteConfig, shutdown: &Shutdown) -> Result<()> {
    rebuild(config, "initial build");

    // Detached: ends with the process, see "Known race" above.
    let server_shutdown = shutdown.clone();
    thread::spawn(move || {
        if let Err(e) = serve_site(config, &server_shutdown) {
            log!("serve"; "{e:#}");
        }
    });

    let mut monitor = select_monitor(config, shutdown)?;
    log!("watch"; "watching {} ({} mode)", config.get_root().display(), monitor.name());

    run_loop(monitor.as_mut(), shutdown, |change| {
        let reason = format!("{} changed, rebuilding...", rel_path(&change.path, config.get_root()));
        rebuild(config, &reason);
    });

    log!("watch"; "stopped");
    Ok(())
}

/// Drive `monitor` until it reports shutdown, calling `on_change` per change.
fn run_loop(monitor: &mut dyn Monitor, shutdown: &Shutdown, mut on_change: impl FnMut(&Change)) {
    while let Some(change) = monitor.next_change() {
        if shutdown.is_triggered() {
            break;
        }
        on_change(&change);
        monitor.rebuilt();
    }
}

/// Full rebuild; a failure is logged and the caller keeps watching.
fn rebuild(config: &SiteConfig, reason: &str) {
    log!("watch"; "{reason}");
    if let Err(e) = build_site(config) {
        log!("error"; "build failed: {e:#}");
    }
}

// =============================================================================
// Tests
// =============================================================================
