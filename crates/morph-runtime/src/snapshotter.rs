//! Subtree snapshotting with stable identity keys.
//!
//! The snapshotter walks a subtree through a [`GeometryReader`] and produces
//! one serializable [`SnapshotTree`] per state offset. Keys are assigned from
//! an invocation-scoped monotonic counter the first time an element is seen
//! and read back from the host on every later walk, so the same physical
//! element carries the same key at every offset of one invocation, and
//! repeated runs stay deterministic because the counter restarts per
//! invocation.
//!
//! The per-element reads are spread across the cooperative scheduler; one
//! capture is a breadth-first cascade of read tasks rather than a single
//! synchronous burst.

use morph_core::snapshot::{ElementRecord, SnapshotTree};

use crate::reader::GeometryReader;
use crate::scheduler::{Scheduler, TaskSpawner};

/// Walks subtrees and assigns invocation-scoped identity keys.
#[derive(Debug)]
pub struct Snapshotter {
    prefix: String,
    next_index: u64,
}

/// Scheduler context for one capture pass: the reader plus the flat node
/// list being built (parent index + record, in visit order).
struct CaptureCtx<'a, R: GeometryReader> {
    reader: &'a mut R,
    prefix: &'a str,
    next_index: &'a mut u64,
    offset: f64,
    nodes: Vec<(Option<usize>, ElementRecord)>,
}

impl Snapshotter {
    /// Create a snapshotter for one invocation.
    pub fn new(invocation: &str) -> Self {
        Self {
            prefix: format!("{invocation}-el"),
            next_index: 0,
        }
    }

    /// Capture the subtree under `root` at the given state offset.
    pub fn capture<R: GeometryReader>(
        &mut self,
        reader: &mut R,
        root: &R::Handle,
        offset: f64,
    ) -> SnapshotTree {
        let mut scheduler: Scheduler<CaptureCtx<'_, R>> = Scheduler::new();
        let mut ctx = CaptureCtx {
            reader,
            prefix: &self.prefix,
            next_index: &mut self.next_index,
            offset,
            nodes: Vec::new(),
        };

        let root_handle = root.clone();
        scheduler.enqueue(move |ctx, spawner| {
            visit(ctx, spawner, root_handle, None);
        });
        scheduler.run_to_idle(&mut ctx);

        build_tree(&ctx.nodes, 0)
    }
}

/// Read one element and queue its children.
fn visit<'a, R: GeometryReader>(
    ctx: &mut CaptureCtx<'a, R>,
    spawner: &mut TaskSpawner<'a, CaptureCtx<'a, R>>,
    handle: R::Handle,
    parent: Option<usize>,
) {
    let key = match ctx.reader.element_key(&handle) {
        Some(existing) => existing,
        None => {
            let key = format!("{}-{}", ctx.prefix, *ctx.next_index);
            *ctx.next_index += 1;
            ctx.reader.assign_key(&handle, &key);
            key
        }
    };

    let record = ElementRecord {
        key,
        offset: ctx.offset,
        bounds: ctx.reader.bounding_box(&handle),
        window: ctx.reader.window_size(),
        style: ctx.reader.computed_style(&handle),
        kind: ctx.reader.element_kind(&handle),
        media_ratio: ctx.reader.media_ratio(&handle),
    };

    let index = ctx.nodes.len();
    ctx.nodes.push((parent, record));

    for child in ctx.reader.children(&handle) {
        spawner.spawn(move |ctx, spawner| {
            visit(ctx, spawner, child, Some(index));
        });
    }
}

/// Rebuild the recursive tree from the flat (parent, record) list.
///
/// Children appear in visit order, which the breadth-first scheduler keeps
/// aligned with DOM sibling order.
fn build_tree(nodes: &[(Option<usize>, ElementRecord)], index: usize) -> SnapshotTree {
    let children = nodes
        .iter()
        .enumerate()
        .filter(|(_, (parent, _))| *parent == Some(index))
        .map(|(child_index, _)| build_tree(nodes, child_index))
        .collect();
    SnapshotTree {
        record: nodes[index].1.clone(),
        children,
    }
}
