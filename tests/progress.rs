//! Properties of the task/progress protocol: stale-result suppression,
//! ordered delivery, and settlement.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::time::sleep;

use cryoet_portal_browser::{
    error::PortalError,
    infra::progress::{LoadState, ProgressController, TaskIdAllocator, Work},
};

struct Recorder {
    steps: Arc<Mutex<Vec<i32>>>,
    results: Arc<Mutex<Vec<&'static str>>>,
    errors: Arc<Mutex<Vec<String>>>,
    settlements: Arc<Mutex<usize>>,
}

fn recording_controller() -> (ProgressController<i32, &'static str>, Recorder) {
    let recorder = Recorder {
        steps: Arc::new(Mutex::new(Vec::new())),
        results: Arc::new(Mutex::new(Vec::new())),
        errors: Arc::new(Mutex::new(Vec::new())),
        settlements: Arc::new(Mutex::new(0)),
    };

    let mut controller = ProgressController::new(TaskIdAllocator::new());
    let steps = Arc::clone(&recorder.steps);
    controller.on_step(move |value| steps.lock().push(value));
    let results = Arc::clone(&recorder.results);
    controller.on_return(move |value| results.lock().push(value));
    let errors = Arc::clone(&recorder.errors);
    controller.on_error(move |error| errors.lock().push(error.to_string()));
    let settlements = Arc::clone(&recorder.settlements);
    controller.on_settled(move || *settlements.lock() += 1);

    (controller, recorder)
}

#[tokio::test]
async fn steps_arrive_in_production_order() {
    let (mut controller, recorder) = recording_controller();

    controller.submit(Work::steps(|sink| async move {
        for value in [1, 2, 3] {
            sleep(Duration::from_millis(5)).await;
            if !sink.emit(value) {
                return Ok("stopped");
            }
        }
        Ok("done")
    }));
    controller.settled().await;

    assert_eq!(*recorder.steps.lock(), vec![1, 2, 3]);
    assert_eq!(*recorder.results.lock(), vec!["done"]);
    assert_eq!(*recorder.settlements.lock(), 1);
    assert_eq!(controller.state(), LoadState::Idle);
}

#[tokio::test]
async fn newest_submission_supersedes_a_slow_one() {
    let (mut controller, recorder) = recording_controller();

    // Task A is slow: its first step comes after 100ms.
    controller.submit(Work::steps(|sink| async move {
        sleep(Duration::from_millis(100)).await;
        sink.emit(1);
        Ok("a")
    }));
    // Task B completes immediately, submitted before A's step fires.
    controller.submit(Work::single(async { Ok("b") }));
    controller.settled().await;

    assert_eq!(*recorder.steps.lock(), Vec::<i32>::new());
    assert_eq!(*recorder.results.lock(), vec!["b"]);
    // Both submissions settle, one notification each.
    assert_eq!(*recorder.settlements.lock(), 2);
    assert_eq!(controller.state(), LoadState::Idle);
}

#[tokio::test]
async fn three_rapid_submissions_settle_three_times() {
    let (mut controller, recorder) = recording_controller();

    for result in ["first", "second", "third"] {
        controller.submit(Work::single(async move {
            sleep(Duration::from_millis(10)).await;
            Ok(result)
        }));
    }
    controller.settled().await;

    assert_eq!(*recorder.settlements.lock(), 3);
    assert_eq!(*recorder.results.lock(), vec!["third"]);
    assert!(recorder.errors.lock().is_empty());
}

#[tokio::test]
async fn cancel_after_the_first_step_suppresses_the_rest() {
    let (mut controller, recorder) = recording_controller();

    controller.submit(Work::steps(|sink| async move {
        for value in [1, 2, 3] {
            if !sink.emit(value) {
                return Ok("stopped");
            }
            sleep(Duration::from_millis(25)).await;
        }
        Ok("done")
    }));

    // Pump until the first step is observed, then cancel.
    while recorder.steps.lock().is_empty() {
        controller.pump_ready();
        sleep(Duration::from_millis(1)).await;
    }
    controller.cancel();
    assert_eq!(controller.state(), LoadState::Cancelling);
    controller.settled().await;

    assert_eq!(*recorder.steps.lock(), vec![1]);
    assert!(recorder.results.lock().is_empty());
    assert_eq!(*recorder.settlements.lock(), 1);
    assert_eq!(controller.state(), LoadState::Idle);
}

#[tokio::test]
async fn cancel_without_an_active_task_is_a_noop() {
    let (mut controller, recorder) = recording_controller();
    controller.cancel();
    controller.cancel();
    controller.settled().await;
    assert_eq!(controller.state(), LoadState::Idle);
    assert_eq!(*recorder.settlements.lock(), 0);
}

#[tokio::test]
async fn cancelling_then_resubmitting_delivers_only_the_new_task() {
    let (mut controller, recorder) = recording_controller();

    let work = || {
        Work::steps(|sink| async move {
            sleep(Duration::from_millis(50)).await;
            sink.emit(7);
            Ok("done")
        })
    };
    controller.submit(work());
    controller.cancel();
    controller.submit(work());
    controller.settled().await;

    assert_eq!(*recorder.steps.lock(), vec![7]);
    assert_eq!(*recorder.results.lock(), vec!["done"]);
    assert_eq!(*recorder.settlements.lock(), 2);
}

#[tokio::test]
async fn a_failing_task_still_settles() {
    let (mut controller, recorder) = recording_controller();

    controller.submit(Work::steps(|sink| async move {
        sink.emit(1);
        Err(PortalError::External("portal went away".into()))
    }));
    controller.settled().await;

    assert_eq!(*recorder.steps.lock(), vec![1]);
    assert!(recorder.results.lock().is_empty());
    assert_eq!(recorder.errors.lock().len(), 1);
    assert!(recorder.errors.lock()[0].contains("portal went away"));
    assert_eq!(*recorder.settlements.lock(), 1);
    assert_eq!(controller.state(), LoadState::Idle);
}

#[tokio::test]
async fn a_panicking_task_still_settles() {
    let (mut controller, recorder) = recording_controller();

    controller.submit(Work::single(async {
        panic!("worker went down");
    }));
    controller.settled().await;

    assert!(recorder.results.lock().is_empty());
    assert_eq!(recorder.errors.lock().len(), 1);
    assert_eq!(*recorder.settlements.lock(), 1);
    assert_eq!(controller.state(), LoadState::Idle);
}

#[tokio::test]
async fn a_cancelled_task_reports_no_error() {
    let (mut controller, recorder) = recording_controller();

    controller.submit(Work::steps(|sink| async move {
        sleep(Duration::from_millis(30)).await;
        sink.emit(1);
        Ok("done")
    }));
    controller.cancel();
    controller.settled().await;

    assert!(recorder.steps.lock().is_empty());
    assert!(recorder.errors.lock().is_empty());
    assert_eq!(*recorder.settlements.lock(), 1);
}
