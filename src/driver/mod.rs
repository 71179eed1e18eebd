//! The frame driver: owns the root, coalesces commits, drives the
//! terminal.
//!
//! One driver is active per output stream at a time; a process-wide
//! registry enforces that by superseding the previous driver when a new
//! one mounts (the superseded driver's renders become no-ops). The
//! runtime is cooperative and single-task: rate-limited redraws are
//! drained by [`FrameDriver::poll`], which the host pumps whenever its
//! main task yields.

pub mod paint;
pub mod stream;
pub mod throttle;

use crate::ansi::ColorMode;
use crate::compose::{self, ComposeOptions, Frame};
use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::term;
use paint::Painter;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use stream::OutputStream;
use throttle::Throttle;
use tracing::debug;

/// Default redraw coalescing window.
pub const THROTTLE_WINDOW: Duration = Duration::from_millis(32);

/// Stream id to active driver id. Guarded by the single-task
/// discipline; mutated only during mount/unmount.
static REGISTRY: Mutex<BTreeMap<u64, u64>> = Mutex::new(BTreeMap::new());
static NEXT_DRIVER_ID: AtomicU64 = AtomicU64::new(1);

fn registry_attach(stream_id: u64, driver_id: u64) {
    REGISTRY.lock().unwrap().insert(stream_id, driver_id);
}

fn registry_is_current(stream_id: u64, driver_id: u64) -> bool {
    REGISTRY.lock().unwrap().get(&stream_id) == Some(&driver_id)
}

fn registry_detach(stream_id: u64, driver_id: u64) {
    let mut registry = REGISTRY.lock().unwrap();
    if registry.get(&stream_id) == Some(&driver_id) {
        registry.remove(&stream_id);
    }
}

/// Mount-time options.
#[derive(Clone, Copy, Debug, Default)]
pub struct DriverOptions {
    /// Color mode override; probed from the environment when `None`.
    pub color_mode: Option<ColorMode>,
    /// Redraw window override.
    pub throttle_window: Option<Duration>,
    /// Interactivity override. The default treats a non-TTY stream or a
    /// CI environment as non-interactive (appended frames, no cursor
    /// arithmetic).
    pub interactive: Option<bool>,
}

/// Owns the root node, the reconciler, and the output stream.
pub struct FrameDriver {
    reconciler: Reconciler,
    painter: Painter,
    throttle: Throttle,
    stream: Box<dyn OutputStream>,
    stream_id: u64,
    driver_id: u64,
    columns: u16,
    color_mode: ColorMode,
    interactive: bool,
    mounted: bool,
}

impl FrameDriver {
    /// Mount a driver on a stream, superseding any driver already
    /// attached to it.
    ///
    /// Interactive streams report their own width; otherwise the column
    /// count is taken once from `COLUMNS`, defaulting to 80, and resize
    /// handling is skipped.
    pub fn mount(stream: Box<dyn OutputStream>, options: DriverOptions) -> Result<Self> {
        let interactive = options
            .interactive
            .unwrap_or_else(|| stream.is_tty() && !term::is_ci());
        let columns = stream
            .width()
            .or_else(term::env_columns)
            .unwrap_or(80);
        let color_mode = options
            .color_mode
            .unwrap_or_else(term::detect_color_mode);
        let stream_id = stream.id();
        let driver_id = NEXT_DRIVER_ID.fetch_add(1, Ordering::Relaxed);
        registry_attach(stream_id, driver_id);

        debug!(stream_id, driver_id, columns, interactive, "mount");

        Ok(Self {
            reconciler: Reconciler::new()?,
            painter: Painter::new(interactive),
            throttle: Throttle::new(options.throttle_window.unwrap_or(THROTTLE_WINDOW)),
            stream,
            stream_id,
            driver_id,
            columns,
            color_mode,
            interactive,
            mounted: true,
        })
    }

    /// The reconciler, for the host framework's mutation callbacks.
    pub fn reconciler_mut(&mut self) -> &mut Reconciler {
        &mut self.reconciler
    }

    /// Read-only access to the reconciler.
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Current column count.
    #[must_use]
    pub fn columns(&self) -> u16 {
        self.columns
    }

    /// Whether this driver still owns its stream (a later mount on the
    /// same stream supersedes it).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.mounted && registry_is_current(self.stream_id, self.driver_id)
    }

    /// Finish a commit: sweep detached subtrees, recompute layout, and
    /// drive exactly one repaint.
    ///
    /// Static content that grew this commit reaches the terminal on the
    /// same commit via the immediate path, bypassing the rate limiter;
    /// otherwise the rate-limited render runs.
    pub fn reset_after_commit(&mut self) -> Result<()> {
        self.reconciler.sweep_detached()?;
        self.compute_layout()?;

        if self.reconciler.tree.static_dirty()? {
            self.reconciler.tree.clear_static_dirty()?;
            return self.immediate_render();
        }
        self.render()
    }

    /// Recompute layout at the current column count.
    pub fn compute_layout(&mut self) -> Result<()> {
        self.reconciler.tree.compute_layout(self.columns)
    }

    /// Rate-limited render: first call in a burst paints immediately,
    /// the rest coalesce into a trailing-edge paint drained by
    /// [`FrameDriver::poll`].
    pub fn render(&mut self) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        if self.throttle.request(Instant::now()) {
            self.paint_dynamic(false)
        } else {
            Ok(())
        }
    }

    /// Drain an owed trailing-edge render. Call whenever the host's
    /// main task yields; returns quickly when nothing is due.
    pub fn poll(&mut self) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        if self.throttle.poll(Instant::now()) {
            self.paint_dynamic(false)
        } else {
            Ok(())
        }
    }

    /// When the owed trailing-edge paint becomes due, if any.
    #[must_use]
    pub fn poll_deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }

    /// Unthrottled render carrying newly grown static content above the
    /// dynamic region; flushes unconditionally.
    pub fn immediate_render(&mut self) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let frame = compose::compose_frame(&self.reconciler.tree, self.color_mode)?;
        self.write_frame(&frame, true)
    }

    /// React to a stream size change: invalidate the last-frame cache
    /// (the terminal may have rewrapped the old region), re-run layout,
    /// and repaint in full.
    pub fn handle_resize(&mut self, columns: u16) -> Result<()> {
        if !self.mounted || !self.interactive {
            return Ok(());
        }
        debug!(columns, "resize");
        self.columns = columns;
        self.painter.invalidate();
        self.compute_layout()?;
        self.render()
    }

    /// Unmount: paint one final frame to reach steady state, cancel the
    /// pending trailing edge, unregister, and free the layout tree.
    pub fn unmount(&mut self) -> Result<()> {
        if !self.mounted {
            return Ok(());
        }
        debug!(stream_id = self.stream_id, driver_id = self.driver_id, "unmount");

        let final_paint = if self.is_active() {
            self.paint_dynamic(false)
        } else {
            Ok(())
        };
        self.throttle.cancel();
        registry_detach(self.stream_id, self.driver_id);
        self.mounted = false;

        // Recursively free the layout tree and clear the root.
        let root = self.reconciler.tree.root;
        let children = self.reconciler.tree.node(root)?.children.clone();
        for child in children {
            self.reconciler.tree.detach(child)?;
            self.reconciler.tree.free_subtree(child)?;
        }

        final_paint
    }

    fn paint_dynamic(&mut self, force: bool) -> Result<()> {
        let (output, height) = compose::compose(
            &self.reconciler.tree,
            self.color_mode,
            ComposeOptions { skip_static: true },
        )?;
        let frame = Frame {
            output,
            height,
            static_output: None,
        };
        self.write_frame(&frame, force)
    }

    fn write_frame(&mut self, frame: &Frame, force: bool) -> Result<()> {
        let result = self
            .painter
            .paint(self.stream.as_mut(), frame, force);
        if result.is_err() {
            // A failed stream write is fatal: the driver unmounts and the
            // error surfaces to the host.
            self.throttle.cancel();
            registry_detach(self.stream_id, self.driver_id);
            self.mounted = false;
        }
        result
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        if self.mounted {
            let _ = self.unmount();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;
    use crate::driver::stream::MemoryStream;
    use crate::style::Style;

    fn mount_tty(width: u16) -> (FrameDriver, std::sync::Arc<Mutex<Vec<u8>>>) {
        let stream = MemoryStream::tty(width);
        let handle = stream.handle();
        let driver = FrameDriver::mount(
            Box::new(stream),
            DriverOptions {
                color_mode: Some(ColorMode::TrueColor),
                throttle_window: Some(Duration::from_millis(0)),
                interactive: Some(true),
            },
        )
        .unwrap();
        (driver, handle)
    }

    fn push_text(driver: &mut FrameDriver, content: &str) -> crate::dom::NodeKey {
        let r = driver.reconciler_mut();
        let text = r.tree.create_node(NodeKind::Text).unwrap();
        let leaf = r.tree.create_node(NodeKind::TextLeaf).unwrap();
        let root = r.root();
        r.tree.append_child(root, text).unwrap();
        r.tree.append_child(text, leaf).unwrap();
        r.tree.set_text(leaf, content).unwrap();
        leaf
    }

    fn contents(handle: &std::sync::Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&handle.lock().unwrap()).into_owned()
    }

    #[test]
    fn test_mount_and_render() {
        let (mut driver, handle) = mount_tty(80);
        push_text(&mut driver, "hello");
        driver.reset_after_commit().unwrap();
        assert!(contents(&handle).contains("hello"));
        driver.unmount().unwrap();
    }

    #[test]
    fn test_render_idempotent() {
        let (mut driver, handle) = mount_tty(80);
        push_text(&mut driver, "same");
        driver.reset_after_commit().unwrap();
        let after_first = contents(&handle).len();
        driver.render().unwrap();
        assert_eq!(contents(&handle).len(), after_first);
        driver.unmount().unwrap();
    }

    #[test]
    fn test_second_mount_supersedes_first() {
        use std::io::Write;

        let stream_a = MemoryStream::tty(80);
        // Two drivers on the *same* stream identity.
        let id = stream_a.id();
        struct Fixed(MemoryStream, u64);
        impl std::io::Write for Fixed {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.write(buf)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                self.0.flush()
            }
        }
        impl OutputStream for Fixed {
            fn id(&self) -> u64 {
                self.1
            }
            fn size(&self) -> Option<(u16, u16)> {
                self.0.size()
            }
            fn is_tty(&self) -> bool {
                true
            }
        }

        let handle_a = stream_a.handle();
        let mut first = FrameDriver::mount(
            Box::new(Fixed(stream_a, id)),
            DriverOptions {
                color_mode: Some(ColorMode::TrueColor),
                throttle_window: Some(Duration::from_millis(0)),
                interactive: Some(true),
            },
        )
        .unwrap();

        let stream_b = MemoryStream::tty(80);
        let _second = FrameDriver::mount(
            Box::new(Fixed(stream_b, id)),
            DriverOptions::default(),
        )
        .unwrap();

        assert!(!first.is_active());
        push_text(&mut first, "ghost");
        first.reset_after_commit().unwrap();
        assert!(!contents(&handle_a).contains("ghost"));
    }

    #[test]
    fn test_resize_forces_full_repaint() {
        let (mut driver, handle) = mount_tty(80);
        push_text(&mut driver, "resize me");
        driver.reset_after_commit().unwrap();
        let before = contents(&handle).len();
        driver.handle_resize(60).unwrap();
        assert!(contents(&handle).len() > before);
        assert_eq!(driver.columns(), 60);
        driver.unmount().unwrap();
    }

    #[test]
    fn test_unmount_is_idempotent_and_frees_tree() {
        let (mut driver, _handle) = mount_tty(80);
        push_text(&mut driver, "bye");
        driver.reset_after_commit().unwrap();
        driver.unmount().unwrap();
        driver.unmount().unwrap();
        let root = driver.reconciler().root();
        assert!(driver
            .reconciler()
            .tree
            .node(root)
            .unwrap()
            .children
            .is_empty());
    }

    #[test]
    fn test_throttle_coalesces_burst() {
        let stream = MemoryStream::tty(80);
        let handle = stream.handle();
        let mut driver = FrameDriver::mount(
            Box::new(stream),
            DriverOptions {
                color_mode: Some(ColorMode::TrueColor),
                throttle_window: Some(Duration::from_secs(3600)),
                interactive: Some(true),
            },
        )
        .unwrap();

        let leaf = push_text(&mut driver, "v1");
        driver.reset_after_commit().unwrap();
        assert!(contents(&handle).contains("v1"));

        // Burst: mutations inside the window defer to the trailing edge.
        driver.reconciler_mut().tree.set_text(leaf, "v2").unwrap();
        driver.reset_after_commit().unwrap();
        assert!(!contents(&handle).contains("v2"));
        assert!(driver.poll_deadline().is_some());
        driver.unmount().unwrap();
    }
}
