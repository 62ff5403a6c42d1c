//! The background context's receive loop.
//!
//! Owns no host access: decode a snapshot set, rebuild the invocation arena,
//! run diff and synthesis through this context's own scheduler instance, and
//! ship the transferable result back. A panicking computation becomes a
//! failure reply, never a dead thread; the main context decides how to
//! degrade.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender};
use tracing::{debug, warn};

use morph_core::diff::diff_snapshots;
use morph_core::state::{
    ResultTransferable, WorkerState, apply_ancestor_patches, ingest_report, merge_contribution,
    synthesize_element,
};

use crate::scheduler::Scheduler;
use crate::transport::{SnapshotRequest, WorkerReply, WorkerRequest};

/// Receive loop; runs until a shutdown request or a closed channel.
pub fn run(requests: Receiver<String>, replies: Sender<String>) {
    let mut held: HashMap<String, ResultTransferable> = HashMap::new();

    while let Ok(payload) = requests.recv() {
        let request = match serde_json::from_str::<WorkerRequest>(&payload) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "undecodable worker request dropped");
                continue;
            }
        };

        match request {
            WorkerRequest::Shutdown => break,
            WorkerRequest::StartDelayed { invocation } => {
                if let Some(result) = held.remove(&invocation) {
                    send(&replies, &WorkerReply::Delayed { invocation, result });
                }
            }
            WorkerRequest::Snapshot { request } => {
                let invocation = request.invocation.clone();
                let deferred_keys = request.deferred.clone();
                debug!(%invocation, snapshots = request.snapshots.len(), "computing");

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| compute(request)));
                match outcome {
                    Ok(result) => {
                        let (immediate, deferred) = result.split_deferred(&deferred_keys);
                        if !deferred.is_empty() {
                            held.insert(invocation.clone(), deferred);
                        }
                        send(
                            &replies,
                            &WorkerReply::Result {
                                invocation,
                                result: immediate,
                            },
                        );
                    }
                    Err(cause) => {
                        let message = panic_message(cause);
                        warn!(%invocation, %message, "computation failed");
                        send(&replies, &WorkerReply::Failure { invocation, message });
                    }
                }
            }
        }
    }
}

/// Scheduler context for one computation: the arena, the pending report, and
/// the result being assembled.
struct ComputeCtx {
    state: WorkerState,
    report: Option<morph_core::diff::DiffReport>,
    result: ResultTransferable,
}

/// Diff and synthesize one snapshot set through the worker's scheduler.
///
/// The diff runs as one task that spawns a synthesis task per animated
/// element, so a large tree is spread across many small steps rather than
/// one burst.
fn compute(request: SnapshotRequest) -> ResultTransferable {
    let mut state = WorkerState::new(request.default_easing);
    for (key, window) in &request.windows {
        state.set_window(key, *window);
    }

    let mut ctx = ComputeCtx {
        state,
        report: None,
        result: ResultTransferable::default(),
    };
    let mut scheduler: Scheduler<ComputeCtx> = Scheduler::new();

    let snapshots = request.snapshots;
    scheduler.enqueue(move |ctx: &mut ComputeCtx, spawner| {
        let report = diff_snapshots(&snapshots);
        ingest_report(&mut ctx.state, &report);
        for (index, element) in report.elements.iter().enumerate() {
            if !element.animate {
                continue;
            }
            spawner.spawn(move |ctx: &mut ComputeCtx, _| {
                if let Some(report) = &ctx.report {
                    let contribution = synthesize_element(&ctx.state, &report.elements[index]);
                    merge_contribution(&mut ctx.result, contribution);
                }
            });
        }
        ctx.report = Some(report);
    });
    scheduler.run_to_idle(&mut ctx);

    if let Some(report) = &ctx.report {
        apply_ancestor_patches(&ctx.state, report, &mut ctx.result);
    }
    ctx.result
}

fn send(replies: &Sender<String>, reply: &WorkerReply) {
    match serde_json::to_string(reply) {
        Ok(payload) => {
            let _ = replies.send(payload);
        }
        Err(error) => warn!(%error, "unencodable worker reply dropped"),
    }
}

fn panic_message(cause: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "background computation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_core::easing::EasingFunction;
    use morph_core::geometry::{BoundingBox, WindowSize};
    use morph_core::snapshot::{ComputedStyle, ElementKind, ElementRecord, SnapshotTree};

    fn record(key: &str, offset: f64, left: f64) -> ElementRecord {
        ElementRecord {
            key: key.to_string(),
            offset,
            bounds: BoundingBox::new(left, 0.0, 50.0, 50.0),
            window: WindowSize::new(1280.0, 720.0),
            style: ComputedStyle::default(),
            kind: ElementKind::Default,
            media_ratio: None,
        }
    }

    #[test]
    fn test_compute_matches_the_inline_driver() {
        let snapshots = vec![
            SnapshotTree {
                record: record("root", 0.0, 0.0),
                children: vec![SnapshotTree::leaf(record("a", 0.0, 0.0))],
            },
            SnapshotTree {
                record: record("root", 1.0, 0.0),
                children: vec![SnapshotTree::leaf(record("a", 1.0, 100.0))],
            },
        ];

        let scheduled = compute(SnapshotRequest {
            invocation: "inv-1".to_string(),
            snapshots: snapshots.clone(),
            default_easing: EasingFunction::Linear,
            windows: HashMap::new(),
            deferred: Vec::new(),
        });

        let mut state = WorkerState::new(EasingFunction::Linear);
        let inline = morph_core::state::compute_result(&snapshots, &mut state);

        assert_eq!(
            scheduled.keyframes.keys().collect::<Vec<_>>(),
            inline.keyframes.keys().collect::<Vec<_>>()
        );
        assert_eq!(scheduled.keyframes["a"], inline.keyframes["a"]);
    }
}
