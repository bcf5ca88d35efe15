//! BDD step definitions for the telemetry feature

use cucumber::{gherkin::Step, given, then, when};
use tokio_util::sync::CancellationToken;

use farmwatch::poller::{apply_poll_result, TelemetrySource};

use crate::world::FarmwatchWorld;

#[given("the backend reports device data:")]
fn backend_reports(world: &mut FarmwatchWorld, step: &Step) {
    let body = step.docstring().expect("missing docstring").trim().to_string();
    *world.backend().device_data.lock().unwrap() = Some((200, body));
}

#[given(expr = "the backend answers device data with status {int}")]
fn backend_answers_status(world: &mut FarmwatchWorld, status: u16) {
    *world.backend().device_data.lock().unwrap() =
        Some((status, r#"{"error": "Token expired"}"#.to_string()));
}

#[when("the backend becomes unreachable")]
fn backend_unreachable(world: &mut FarmwatchWorld) {
    *world.backend().unreachable.lock().unwrap() = true;
}

async fn poll(world: &mut FarmwatchWorld) {
    let device_id = world
        .api()
        .session()
        .device_id()
        .expect("no device in session");
    {
        let mut state = world.telemetry().write().await;
        if state.device_id.as_deref() != Some(device_id.as_str()) {
            state.activate(&device_id);
        }
    }
    world.poll_seq += 1;
    let result = world.api().fetch(&device_id).await;
    apply_poll_result(
        world.telemetry(),
        &device_id,
        world.poll_seq,
        result,
        &CancellationToken::new(),
    )
    .await;
}

#[when("the poller fetches device data")]
async fn poller_fetches(world: &mut FarmwatchWorld) {
    poll(world).await;
}

#[when(expr = "the poller fetches device data {int} times")]
async fn poller_fetches_many(world: &mut FarmwatchWorld, times: u32) {
    for _ in 0..times {
        poll(world).await;
    }
}

#[then(expr = "the chart history holds {int} samples")]
async fn history_holds(world: &mut FarmwatchWorld, expected: usize) {
    assert_eq!(world.telemetry().read().await.history.len(), expected);
}

#[then(expr = "the oldest sample is poll {int}")]
async fn oldest_sample(world: &mut FarmwatchWorld, expected: u64) {
    let state = world.telemetry().read().await;
    assert_eq!(state.history.iter().next().map(|s| s.seq), Some(expected));
}

#[then(expr = "the latest {string} reading is {float}")]
async fn latest_reading(world: &mut FarmwatchWorld, field: String, expected: f64) {
    let state = world.telemetry().read().await;
    let latest = state.latest.as_ref().expect("no snapshot yet");
    assert_eq!(latest.number(&field), Some(expected));
}

#[then(expr = "the poll status shows {int} consecutive error(s)")]
async fn consecutive_errors(world: &mut FarmwatchWorld, expected: u32) {
    assert_eq!(
        world.telemetry().read().await.status().consecutive_errors,
        expected
    );
}
