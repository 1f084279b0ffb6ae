use assetdag::engine::{
    CoreCommand, CoreRuntime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerQueue,
    TriggerReason,
};

fn trigger(task: &str, reason: TriggerReason) -> RuntimeEvent {
    RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason,
    }
}

fn complete(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
    RuntimeEvent::TaskCompleted {
        task: task.to_string(),
        outcome,
    }
}

fn watching() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: false,
        queue_length: 1,
    }
}

#[test]
fn watch_triggers_while_running_coalesce_into_one_rerun() {
    let mut core = CoreRuntime::new(watching());

    let step = core.step(trigger("build-scripts", TriggerReason::FileWatch));
    assert_eq!(step.dispatched(), ["build-scripts"]);

    for _ in 0..5 {
        let step = core.step(trigger("build-scripts", TriggerReason::FileWatch));
        assert!(step.dispatched().is_empty());
    }
    assert_eq!(core.queued_for("build-scripts"), 1);

    let step = core.step(complete("build-scripts", TaskOutcome::Success));
    assert_eq!(step.dispatched(), ["build-scripts"]);
    assert_eq!(core.queued_for("build-scripts"), 0);

    let step = core.step(complete("build-scripts", TaskOutcome::Success));
    assert!(step.dispatched().is_empty());
    assert!(step.keep_running);
    assert!(core.is_idle());
}

#[test]
fn longer_queue_keeps_more_reruns() {
    let mut core = CoreRuntime::new(RuntimeOptions {
        exit_when_idle: false,
        queue_length: 2,
    });

    core.step(trigger("t", TriggerReason::FileWatch));
    core.step(trigger("t", TriggerReason::FileWatch));
    core.step(trigger("t", TriggerReason::FileWatch));
    core.step(trigger("t", TriggerReason::FileWatch));
    assert_eq!(core.queued_for("t"), 2);
}

#[test]
fn command_line_tasks_run_one_after_another() {
    let mut core = CoreRuntime::new(RuntimeOptions::default());

    assert_eq!(core.step(trigger("styles", TriggerReason::Manual)).dispatched(), ["styles"]);
    assert!(core.step(trigger("scripts", TriggerReason::Manual)).dispatched().is_empty());
    assert!(core.step(trigger("images", TriggerReason::Manual)).dispatched().is_empty());

    let step = core.step(complete("styles", TaskOutcome::Success));
    assert_eq!(step.dispatched(), ["scripts"]);
    assert!(step.keep_running);

    let step = core.step(complete("scripts", TaskOutcome::Failed));
    assert_eq!(step.dispatched(), ["images"]);

    let step = core.step(complete("images", TaskOutcome::Success));
    assert!(!step.keep_running);
    assert!(step.commands.contains(&CoreCommand::RequestExit));

    let summary = core.into_summary();
    assert_eq!(summary.completed, ["styles", "scripts", "images"]);
    assert_eq!(summary.failed, ["scripts"]);
    assert!(!summary.is_success());
}

#[test]
fn watch_failures_are_not_fatal() {
    let mut core = CoreRuntime::new(watching());

    core.step(trigger("default", TriggerReason::Manual));
    core.step(complete("default", TaskOutcome::Success));

    core.step(trigger("build-styles", TriggerReason::FileWatch));
    let step = core.step(complete("build-styles", TaskOutcome::Failed));
    assert!(step.keep_running);

    let summary = core.summary();
    assert!(summary.is_success());
    assert_eq!(summary.watch_failures, ["build-styles"]);
}

#[test]
fn watch_trigger_runs_beside_a_manual_task() {
    let mut core = CoreRuntime::new(watching());

    core.step(trigger("default", TriggerReason::Manual));
    let step = core.step(trigger("build-scripts", TriggerReason::FileWatch));
    assert_eq!(step.dispatched(), ["build-scripts"]);
    assert!(core.is_running("default"));
    assert!(core.is_running("build-scripts"));
}

#[test]
fn exits_when_idle_only_when_asked() {
    let mut core = CoreRuntime::new(RuntimeOptions::default());
    core.step(trigger("styles", TriggerReason::Manual));
    assert!(!core.step(complete("styles", TaskOutcome::Success)).keep_running);

    let mut core = CoreRuntime::new(watching());
    core.step(trigger("styles", TriggerReason::Manual));
    let step = core.step(complete("styles", TaskOutcome::Success));
    assert!(step.keep_running);
    assert!(step.commands.is_empty());
}

#[test]
fn stray_completion_is_ignored() {
    let mut core = CoreRuntime::new(RuntimeOptions::default());
    let step = core.step(complete("ghost", TaskOutcome::Success));
    assert!(step.keep_running);
    assert!(step.commands.is_empty());
    assert!(core.summary().completed.is_empty());
}

#[test]
fn shutdown_stops_and_marks_interrupted() {
    let mut core = CoreRuntime::new(watching());
    core.step(trigger("default", TriggerReason::Manual));

    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(!step.keep_running);
    assert!(core.summary().interrupted);
}

#[test]
fn queued_command_line_rerun_keeps_its_reason() {
    let mut core = CoreRuntime::new(watching());

    assert_eq!(
        core.step(trigger("build-styles", TriggerReason::FileWatch)).dispatched(),
        ["build-styles"]
    );
    assert!(core.step(trigger("build-styles", TriggerReason::Manual)).dispatched().is_empty());
    assert!(core.step(trigger("build-styles", TriggerReason::FileWatch)).dispatched().is_empty());

    // Later command-line tasks wait for the queued one.
    assert!(core.step(trigger("scripts", TriggerReason::Manual)).dispatched().is_empty());

    let step = core.step(complete("build-styles", TaskOutcome::Success));
    assert_eq!(step.dispatched(), ["build-styles"]);

    let step = core.step(complete("build-styles", TaskOutcome::Failed));
    assert_eq!(step.dispatched(), ["scripts"]);
    core.step(complete("scripts", TaskOutcome::Success));

    let summary = core.summary();
    assert_eq!(summary.completed, ["build-styles", "scripts"]);
    assert_eq!(summary.failed, ["build-styles"]);
    assert!(summary.watch_failures.is_empty());
    assert!(!summary.is_success());
}

#[test]
fn trigger_queue_watch_trigger_does_not_downgrade_manual() {
    let mut queue = TriggerQueue::new(2);
    queue.record_trigger("t", TriggerReason::Manual);
    queue.record_trigger("t", TriggerReason::FileWatch);
    assert_eq!(queue.pending_for("t"), 2);
    assert_eq!(queue.take("t"), Some(TriggerReason::Manual));
}

#[test]
fn trigger_queue_clamps_and_upgrades_to_manual() {
    let mut queue = TriggerQueue::new(0);
    assert!(queue.record_trigger("t", TriggerReason::FileWatch));
    assert!(!queue.record_trigger("t", TriggerReason::Manual));
    assert_eq!(queue.pending_for("t"), 1);

    assert_eq!(queue.take("t"), Some(TriggerReason::Manual));
    assert_eq!(queue.take("t"), None);
    assert!(queue.is_empty());
}
