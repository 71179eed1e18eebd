//! `imprint` - Declarative terminal UI rendering core
//!
//! Imprint renders a retained tree of element nodes to a character
//! terminal and keeps the screen in sync as the tree mutates. It is a
//! rendering core, not a framework: a host library diffs its own
//! element snapshots and drives this crate through the reconciler's
//! host-config operations; imprint owns layout, composition, and the
//! terminal protocol.
//!
//! # Architecture At A Glance
//!
//! - `reconciler`: Host-config surface; applies create/update/move/
//!   delete mutations to the node tree, commit lifecycle
//! - `dom`: Arena-backed node tree (root, boxes, text, virtual text,
//!   leaves) with solver-handle bookkeeping
//! - `layout`: Flexbox adapter over `taffy`; style translation and text
//!   measure callbacks
//! - `compose`: Canvas rasterisation with clip stacks, text squashing,
//!   transforms, styled serialisation
//! - `border`: Box-drawing border painting
//! - `driver`: Frame driver; rate-limited diffed repaints, static
//!   regions, stream registry
//! - `ansi` / `color` / `style` / `text`: Styling primitives, escape
//!   codec, measurement and wrapping
//! - `term` / `error`: Capability probing and error types
//!
//! # Data Flow
//!
//! ```text
//! Host framework delivers mutations
//!     -> Reconciler edits the node tree
//!     -> Layout assigns cell geometry (taffy + text measurement)
//!     -> Compositor rasterises to a styled string
//!     -> Frame driver diffs against the last frame and patches the tty
//! ```
//!
//! The runtime is single-threaded and cooperative: commits run to
//! completion, rate-limited redraws are drained by
//! [`driver::FrameDriver::poll`] when the host's task yields.

#![warn(unsafe_code)] // Unsafe code needs justification (termios FFI only)
#![allow(clippy::cast_possible_truncation)] // Intentional coordinate casts
#![allow(clippy::cast_sign_loss)] // Intentional coordinate conversions
#![allow(clippy::cast_precision_loss)] // Cell counts fit in f32 comfortably
#![allow(clippy::cast_possible_wrap)] // Intentional coordinate conversions
#![allow(clippy::module_name_repetitions)] // BorderStyle, ClipRect etc
#![allow(clippy::missing_errors_doc)] // Error enum documents the cases
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::collapsible_if)] // Sometimes nested ifs are clearer
#![allow(clippy::items_after_statements)] // Common pattern in tests

pub mod ansi;
pub mod border;
pub mod color;
pub mod compose;
pub mod dom;
pub mod driver;
pub mod error;
pub mod layout;
pub mod reconciler;
pub mod style;
pub mod term;
pub mod text;

// Re-export core types at crate root
pub use ansi::{ColorMode, TextAttributes, TextStyle};
pub use border::{BorderChars, BorderStyle};
pub use color::Color;
pub use compose::{compose, compose_frame, ComposeOptions, Frame};
pub use dom::{AttributeValue, Node, NodeArena, NodeKey, NodeKind, TextTransform, Tree};
pub use driver::{
    stream::{MemoryStream, OutputStream, StdoutStream},
    DriverOptions, FrameDriver,
};
pub use error::{Error, Result};
pub use layout::{EdgeInsets, LayoutBox, LayoutEngine, LayoutHandle};
pub use reconciler::{
    get_current_event_priority, resolve_update_priority, set_current_update_priority, ElementType,
    HostContext, Props, Reconciler, UpdatePayload, UpdatePriority,
};
pub use style::{Dimension, Style, StyleBuilder};
pub use text::{measure, wrap_text, WrapMode};
