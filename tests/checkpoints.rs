mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempdir::TempDir;

use common::CapturedLog;
use drun::{run_graph, run_graph_with_log, RunError, TaskOpts};

#[test]
fn checkpoint_replay() {
    common::setup();
    let dir = TempDir::new("drun-test").unwrap();
    let ckpt = dir.path().join("foo");

    // first run: the command executes and leaves its checkpoint behind
    let ckpt1 = ckpt.clone();
    let result = run_graph(move |g| {
        let produce = g.create_cmd_with(TaskOpts::new().ckpt(ckpt1), vec!["echo", "foo"]);
        let forward = g.create_task(|x| Ok(x.into_iter().next().unwrap()));
        g.chain(produce, forward)
    })
    .unwrap();
    assert_eq!(result, json!("foo\n"));
    assert!(ckpt.exists());

    // second run: the checkpointed task must not run at all, its body would
    // fail loudly if it did
    let log = CapturedLog::new();
    let ckpt2 = ckpt.clone();
    let result = run_graph_with_log(log.clone(), move |g| {
        let produce = g.create_task_with(TaskOpts::new().name("produce").ckpt(ckpt2), |_| {
            anyhow::bail!("this body must never run")
        });
        let extend = g.create_task(|x| {
            Ok(json!(format!("{}bar", x[0].as_str().unwrap())))
        });
        g.chain(produce, extend)
    })
    .unwrap();
    assert_eq!(result, json!("foo\nbar"));
    let contents = log.contents();
    assert!(contents.contains("DR: there is a ckpt"));
    assert!(contents.contains("for produce"));
    assert!(contents.contains("DR: 1 tasks were skipped thanks to ckpts"));
}

#[test]
fn checkpoint_prunes_whole_upstream() {
    common::setup();
    let dir = TempDir::new("drun-test").unwrap();
    let ckpt = dir.path().join("mid");
    drun::checkpoint::store(&ckpt, &json!("precomputed")).unwrap();

    let upstream_runs = Arc::new(AtomicUsize::new(0));
    let upstream_runs2 = upstream_runs.clone();
    let result = run_graph(move |g| {
        let expensive = g.create_task(move |_| {
            upstream_runs2.fetch_add(1, Ordering::SeqCst);
            Ok(json!("expensive"))
        });
        let middle = g.create_task_with(TaskOpts::new().ckpt(&ckpt), |x| {
            Ok(x.into_iter().next().unwrap())
        });
        let consumer = g.create_task(|x| Ok(x.into_iter().next().unwrap()));
        g.chain(expensive, middle);
        g.chain(middle, consumer);
        consumer
    })
    .unwrap();
    assert_eq!(result, json!("precomputed"));
    assert_eq!(upstream_runs.load(Ordering::SeqCst), 0);
}

#[test]
fn second_run_skips_fresh_checkpoint() {
    common::setup();
    let dir = TempDir::new("drun-test").unwrap();
    let ckpt = dir.path().join("counted");
    let runs = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let runs2 = runs.clone();
        let ckpt2 = ckpt.clone();
        let result = run_graph(move |g| {
            g.create_task_with(TaskOpts::new().ckpt(ckpt2), move |_| {
                runs2.fetch_add(1, Ordering::SeqCst);
                Ok(json!("computed once"))
            })
        })
        .unwrap();
        assert_eq!(result, json!("computed once"));
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn corrupted_checkpoint_aborts_the_run() {
    common::setup();
    let dir = TempDir::new("drun-test").unwrap();
    let ckpt = dir.path().join("broken");
    std::fs::write(&ckpt, "} this is not a value {").unwrap();

    let err = run_graph(move |g| {
        g.create_task_with(TaskOpts::new().ckpt(&ckpt), |_| Ok(json!(null)));
    })
    .unwrap_err();
    assert!(matches!(err, RunError::Checkpoint { .. }));
}

#[test]
fn partial_pruning_keeps_other_goals_alive() {
    common::setup();
    let dir = TempDir::new("drun-test").unwrap();
    let ckpt = dir.path().join("done-goal");
    drun::checkpoint::store(&ckpt, &json!("cached")).unwrap();

    let live_runs = Arc::new(AtomicUsize::new(0));
    let live_runs2 = live_runs.clone();
    let result = run_graph(move |g| {
        let shared = g.create_task(move |_| {
            live_runs2.fetch_add(1, Ordering::SeqCst);
            Ok(json!("shared"))
        });
        let cached_goal = g.create_task_with(TaskOpts::new().ckpt(&ckpt), |x| {
            Ok(x.into_iter().next().unwrap())
        });
        let live_goal = g.create_task(|x| Ok(x.into_iter().next().unwrap()));
        g.chain(shared, cached_goal);
        g.chain(shared, live_goal);
        g.bundle(cached_goal, live_goal)
    })
    .unwrap();
    // the shared producer is still needed by the live goal
    assert_eq!(result, json!(["cached", "shared"]));
    assert_eq!(live_runs.load(Ordering::SeqCst), 1);
}
