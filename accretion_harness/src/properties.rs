// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end behavior tests: reconciler + recording host + manual
//! scheduler, driven the way an embedding event loop would.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use accretion_core::element::{RefValue, component_fn};
use accretion_core::hooks::Updater;
use accretion_core::lane::{DEFAULT_LANE, SYNC_LANE, TRANSITION_LANE};
use accretion_core::{
    Child, Element, HostHandle, PassState, Reconciler, RootId, TaskStatus,
};

use crate::host::HostOp;
use crate::{ManualScheduler, RecordingHost, drive};

fn setup() -> (Reconciler, RecordingHost, ManualScheduler, HostHandle, RootId) {
    let mut rec = Reconciler::new();
    let mut host = RecordingHost::new();
    let sched = ManualScheduler::new();
    let container = host.create_container();
    let root = rec.create_container(container);
    (rec, host, sched, container, root)
}

fn keyed_item(key: &str) -> Child {
    Child::Element(Element::host("li").with_key(key).child(Child::text(key)))
}

#[test]
fn idempotent_rerender_performs_no_host_operations() {
    let (mut rec, mut host, mut sched, container, root) = setup();
    let app = || {
        Element::host("div").attr("title", "stable").children(vec![
            Child::text("hello"),
            Child::Element(Element::host("span")),
        ])
    };

    rec.update_container(Some(app()), root, &mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);
    let shape = host.tree_to_string(container);
    host.take_ops();

    rec.update_container(Some(app()), root, &mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);

    assert_eq!(host.take_ops(), [], "second identical render must be silent");
    assert_eq!(host.tree_to_string(container), shape);
}

#[test]
fn key_stability_reuses_all_nodes_and_moves_the_documented_set() {
    let (mut rec, mut host, mut sched, container, root) = setup();

    rec.update_container(
        Some(Element::host("ul").children(vec![
            keyed_item("1"),
            keyed_item("2"),
            keyed_item("3"),
        ])),
        root,
        &mut host,
        &mut sched,
    );
    drive(&mut rec, &mut host, &mut sched);
    let ul = host.children_of(container)[0];
    let before: Vec<u64> = host.children_of(ul).iter().map(|h| h.0).collect();
    host.take_ops();

    // [1, 2, 3] -> [3, 1, 2]
    rec.update_container(
        Some(Element::host("ul").children(vec![
            keyed_item("3"),
            keyed_item("1"),
            keyed_item("2"),
        ])),
        root,
        &mut host,
        &mut sched,
    );
    drive(&mut rec, &mut host, &mut sched);

    let ops = host.take_ops();
    // No nodes created or destroyed: pure reuse.
    assert!(
        !ops.iter()
            .any(|op| matches!(op, HostOp::Create(_) | HostOp::CreateText(_) | HostOp::Remove { .. })),
        "reorder must not create or remove: {ops:?}"
    );
    // 3 keeps its place (old index 2 becomes the running maximum); 1 and 2
    // (old indices 0 and 1) are both below it and move.
    let moves: Vec<u64> = ops
        .iter()
        .filter_map(|op| match op {
            HostOp::Append { child, .. } | HostOp::InsertBefore { child, .. } => Some(*child),
            _ => None,
        })
        .collect();
    assert_eq!(moves, [before[0], before[1]], "exactly 1 and 2 move");

    let after: Vec<u64> = host.children_of(ul).iter().map(|h| h.0).collect();
    assert_eq!(after, [before[2], before[0], before[1]]);
}

#[test]
fn update_replay_preserves_total_order_across_lanes() {
    let (mut rec, mut host, mut sched, container, root) = setup();
    let seen: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
    let seen_in = seen.clone();
    let updater: Rc<RefCell<Option<Updater>>> = Rc::new(RefCell::new(None));
    let updater_in = updater.clone();

    let counter = component_fn(move |ctx, _| {
        let (count, handle) = ctx.use_state(|| 0_i32);
        seen_in.borrow_mut().push(count);
        *updater_in.borrow_mut() = Some(handle);
        Child::text(count.to_string())
    });

    rec.update_container(
        Some(Element::component(counter)),
        root,
        &mut host,
        &mut sched,
    );
    drive(&mut rec, &mut host, &mut sched);
    assert_eq!(host.tree_to_string(container), "[\"0\"]");

    // +1 and +10 on the default lane, := 3 on the slower transition lane.
    {
        let updater = updater.borrow();
        let updater = updater.as_ref().expect("updater captured");
        updater.update(|n: &i32| n + 1, DEFAULT_LANE);
        updater.set(3_i32, TRANSITION_LANE);
        updater.update(|n: &i32| n + 10, DEFAULT_LANE);
    }
    rec.flush_dispatched(&mut host, &mut sched);

    // First pass renders the default lane alone: the transition update is
    // skipped, both default updates apply.
    let task = sched.pop_next().expect("default-lane render task");
    let status = rec.perform_task(task.handle, task.token, false, &mut host, &mut sched);
    assert_eq!(status, TaskStatus::Finished);
    assert_eq!(host.tree_to_string(container), "[\"11\"]");

    // The carried base queue replays at the transition lane: := 3 applies,
    // then the downgraded +10, restoring arrival order semantics.
    drive(&mut rec, &mut host, &mut sched);
    assert_eq!(host.tree_to_string(container), "[\"13\"]");

    assert_eq!(*seen.borrow(), [0, 11, 13]);
}

#[test]
fn higher_priority_pass_discards_lower_priority_partial_tree() {
    let (mut rec, mut host, mut sched, container, root) = setup();
    let updater: Rc<RefCell<Option<Updater>>> = Rc::new(RefCell::new(None));
    let updater_in = updater.clone();

    // Wide tree so a yield budget interrupts mid-pass.
    let app = component_fn(move |ctx, _| {
        let (count, handle) = ctx.use_state(|| 0_i32);
        *updater_in.borrow_mut() = Some(handle);
        let items: Vec<Child> = (0..8)
            .map(|i| {
                Child::Element(
                    Element::host("li")
                        .with_key(format!("{i}"))
                        .child(Child::text(format!("{count}"))),
                )
            })
            .collect();
        Child::Element(Element::host("ul").children(items))
    });

    rec.update_container(Some(Element::component(app)), root, &mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);
    host.take_ops();

    // Low-priority increment; give the pass a tiny budget so it interrupts.
    updater
        .borrow()
        .as_ref()
        .expect("updater")
        .update(|n: &i32| n + 1, DEFAULT_LANE);
    rec.flush_dispatched(&mut host, &mut sched);

    let task = sched.pop_next().expect("render task");
    sched.set_yield_budget(2);
    let status = rec.perform_task(task.handle, task.token, false, &mut host, &mut sched);
    sched.restore(task);
    sched.clear_yield_budget();
    assert_eq!(status, TaskStatus::Continuation);
    assert_eq!(rec.pass_state(), PassState::Interrupted);
    assert_eq!(host.take_ops(), [], "interrupted pass must not touch the host");

    // Preempt with a synchronous update before the pass resumes.
    updater
        .borrow()
        .as_ref()
        .expect("updater")
        .update(|n: &i32| n + 10, SYNC_LANE);
    rec.flush_dispatched(&mut host, &mut sched);
    assert!(host.take_sync_request());
    rec.flush_sync_work(&mut host, &mut sched);

    // The sync pass rendered from scratch: the skipped default update is
    // not part of what committed (0 + 10, not 0 + 1 + 10).
    let ul = host.children_of(container)[0];
    let first_li = host.children_of(ul)[0];
    let text = host.children_of(first_li)[0];
    assert_eq!(host.text_of(text), Some("10"));

    // The default lane still replays afterwards, preserving arrival order.
    drive(&mut rec, &mut host, &mut sched);
    let text = host.children_of(host.children_of(ul)[0])[0];
    assert_eq!(host.text_of(text), Some("11"));
}

#[test]
fn passive_effects_mount_child_before_parent_and_unmount_parent_before_child() {
    let (mut rec, mut host, mut sched, _container, root) = setup();
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let child_log = log.clone();
    let child = component_fn(move |ctx, _| {
        let log = child_log.clone();
        ctx.use_effect(
            move || {
                log.borrow_mut().push("child-create".to_string());
                let log = log.clone();
                Some(alloc::boxed::Box::new(move || {
                    log.borrow_mut().push("child-destroy".to_string());
                }) as alloc::boxed::Box<dyn FnOnce()>)
            },
            Some(vec![]),
        );
        Child::text("child")
    });

    let parent_log = log.clone();
    let parent = component_fn(move |ctx, _| {
        let log = parent_log.clone();
        ctx.use_effect(
            move || {
                log.borrow_mut().push("parent-create".to_string());
                let log = log.clone();
                Some(alloc::boxed::Box::new(move || {
                    log.borrow_mut().push("parent-destroy".to_string());
                }) as alloc::boxed::Box<dyn FnOnce()>)
            },
            Some(vec![]),
        );
        Child::Element(Element::component(child.clone()))
    });

    rec.update_container(
        Some(Element::component(parent)),
        root,
        &mut host,
        &mut sched,
    );
    drive(&mut rec, &mut host, &mut sched);

    // Mount collection follows the bottom-up mutation walk: child first.
    assert_eq!(*log.borrow(), ["child-create", "parent-create"]);
    log.borrow_mut().clear();

    // Deleting the subtree queues unmounts in deletion-walk order: the
    // parent is enqueued before the child (documented order, asserted
    // exactly — not the child-first convention).
    rec.update_container(None, root, &mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);
    assert_eq!(*log.borrow(), ["parent-destroy", "child-destroy"]);
}

#[test]
fn effect_rerun_on_dep_change_destroys_before_creating() {
    let (mut rec, mut host, mut sched, _container, root) = setup();
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let updater: Rc<RefCell<Option<Updater>>> = Rc::new(RefCell::new(None));

    let log_in = log.clone();
    let updater_in = updater.clone();
    let app = component_fn(move |ctx, _| {
        let (count, handle) = ctx.use_state(|| 0_i64);
        *updater_in.borrow_mut() = Some(handle);
        let log = log_in.clone();
        ctx.use_effect(
            move || {
                log.borrow_mut().push(format!("create({count})"));
                let log = log.clone();
                Some(alloc::boxed::Box::new(move || {
                    log.borrow_mut().push(format!("destroy({count})"));
                }) as alloc::boxed::Box<dyn FnOnce()>)
            },
            Some(vec![accretion_core::PropValue::Int(count)]),
        );
        Child::text(count.to_string())
    });

    rec.update_container(Some(Element::component(app)), root, &mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);
    assert_eq!(*log.borrow(), ["create(0)"]);

    updater
        .borrow()
        .as_ref()
        .expect("updater")
        .set(1_i64, SYNC_LANE);
    rec.flush_dispatched(&mut host, &mut sched);
    assert!(host.take_sync_request());
    rec.flush_sync_work(&mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);

    assert_eq!(*log.borrow(), ["create(0)", "destroy(0)", "create(1)"]);

    // Unmounting runs the last cleanup and nothing else.
    log.borrow_mut().clear();
    rec.update_container(None, root, &mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);
    assert_eq!(*log.borrow(), ["destroy(1)"]);
}

#[test]
fn updates_dispatched_from_passive_effects_flush_before_returning() {
    let (mut rec, mut host, mut sched, container, root) = setup();
    let bumped = Rc::new(Cell::new(false));

    let bumped_in = bumped.clone();
    let app = component_fn(move |ctx, _| {
        let (count, handle) = ctx.use_state(|| 0_i32);
        let bumped = bumped_in.clone();
        ctx.use_effect(
            move || {
                if !bumped.replace(true) {
                    handle.set(7_i32, SYNC_LANE);
                }
                None
            },
            None,
        );
        Child::text(count.to_string())
    });

    rec.update_container(Some(Element::component(app)), root, &mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);

    assert_eq!(host.tree_to_string(container), "[\"7\"]");
}

#[test]
fn nested_fragments_flatten_in_document_order() {
    let (mut rec, mut host, mut sched, container, root) = setup();

    // Depth 3 of fragment/list nesting under one host parent.
    let app = Element::host("div").children(vec![
        Child::Element(Element::fragment(vec![
            Child::text("a"),
            Child::Element(Element::fragment(vec![
                Child::Element(Element::host("span")),
                Child::List(vec![
                    Child::text("b"),
                    Child::Element(Element::host("em").child(Child::text("c"))),
                ]),
            ])),
        ])),
        Child::text("d"),
    ]);

    rec.update_container(Some(app), root, &mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);

    assert_eq!(
        host.tree_to_string(container),
        "[div(\"a\", span(), \"b\", em(\"c\"), \"d\")]"
    );
}

#[test]
fn refs_attach_after_commit_and_detach_on_unmount() {
    let (mut rec, mut host, mut sched, container, root) = setup();
    let slot = RefValue::object();

    rec.update_container(
        Some(Element::host("div").with_ref(RefValue::Object(slot.clone()))),
        root,
        &mut host,
        &mut sched,
    );
    drive(&mut rec, &mut host, &mut sched);

    let div = host.children_of(container)[0];
    assert_eq!(slot.get(), Some(div), "ref sees the materialized host");

    rec.update_container(None, root, &mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);
    assert_eq!(slot.get(), None, "deletion detaches the ref");
}

#[test]
fn list_growth_and_shrink_touch_only_the_difference() {
    let (mut rec, mut host, mut sched, container, root) = setup();

    rec.update_container(
        Some(Element::host("ul").children(vec![keyed_item("a"), keyed_item("b")])),
        root,
        &mut host,
        &mut sched,
    );
    drive(&mut rec, &mut host, &mut sched);
    let ul = host.children_of(container)[0];
    host.take_ops();

    // Append "c": one instance + one text created, nothing removed.
    rec.update_container(
        Some(Element::host("ul").children(vec![
            keyed_item("a"),
            keyed_item("b"),
            keyed_item("c"),
        ])),
        root,
        &mut host,
        &mut sched,
    );
    drive(&mut rec, &mut host, &mut sched);
    let ops = host.take_ops();
    assert_eq!(
        ops.iter()
            .filter(|op| matches!(op, HostOp::Create(_) | HostOp::CreateText(_)))
            .count(),
        2
    );
    assert!(!ops.iter().any(|op| matches!(op, HostOp::Remove { .. })));
    assert_eq!(host.children_of(ul).len(), 3);

    // Drop "a": exactly one removal, no creations.
    rec.update_container(
        Some(Element::host("ul").children(vec![keyed_item("b"), keyed_item("c")])),
        root,
        &mut host,
        &mut sched,
    );
    drive(&mut rec, &mut host, &mut sched);
    let ops = host.take_ops();
    assert_eq!(
        ops.iter()
            .filter(|op| matches!(op, HostOp::Remove { .. }))
            .count(),
        1
    );
    assert!(
        !ops.iter()
            .any(|op| matches!(op, HostOp::Create(_) | HostOp::CreateText(_)))
    );
    assert_eq!(host.children_of(ul).len(), 2);
}

#[test]
fn transition_updates_render_after_urgent_work() {
    let (mut rec, mut host, mut sched, container, root) = setup();
    let handles: Rc<RefCell<Option<(Updater, accretion_core::hooks::TransitionStart)>>> =
        Rc::new(RefCell::new(None));

    let handles_in = handles.clone();
    let app = component_fn(move |ctx, _| {
        let (count, updater) = ctx.use_state(|| 0_i32);
        let (_pending, start) = ctx.use_transition();
        *handles_in.borrow_mut() = Some((updater, start));
        Child::text(count.to_string())
    });

    rec.update_container(Some(Element::component(app)), root, &mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);

    {
        let handles = handles.borrow();
        let (updater, start) = handles.as_ref().expect("handles");
        // The scoped dispatch is downgraded to the transition lane even
        // though it asks for sync.
        start.start(|| updater.set(5_i32, SYNC_LANE));
    }
    rec.flush_dispatched(&mut host, &mut sched);
    drive(&mut rec, &mut host, &mut sched);

    assert_eq!(host.tree_to_string(container), "[\"5\"]");
}
