//! BDD step definitions for the session feature

use cucumber::{given, then, when};

use farmwatch::store::KeyValueStore;

use crate::world::{FakeBackend, FarmwatchWorld};

#[given(expr = "a farm backend that accepts {string} for device {string}")]
fn backend_with_account(world: &mut FarmwatchWorld, email: String, device_id: String) {
    let backend = FakeBackend::default();
    backend.accounts.lock().unwrap().insert(email, device_id);
    world.connect(backend);
}

#[given(expr = "a farm backend that rejects logins with {string}")]
fn backend_rejecting_logins(world: &mut FarmwatchWorld, error: String) {
    let backend = FakeBackend::default();
    *backend.login_error.lock().unwrap() = Some(error);
    world.connect(backend);
}

#[given(expr = "I am logged in as {string}")]
async fn logged_in(world: &mut FarmwatchWorld, email: String) {
    world
        .api()
        .login(&email, "secret")
        .await
        .expect("login failed");
}

#[when(expr = "I log in as {string} with password {string}")]
async fn log_in_through_form(world: &mut FarmwatchWorld, email: String, password: String) {
    let form = format!(
        "email={}&password={}",
        email.replace('@', "%40"),
        password
    );
    world.request("POST", "/login", Some(&form)).await;
}

#[when("I log out")]
async fn log_out(world: &mut FarmwatchWorld) {
    world.request("POST", "/logout", Some("")).await;
}

#[then(expr = "I am redirected to {string}")]
fn redirected_to(world: &mut FarmwatchWorld, expected: String) {
    assert_eq!(world.response_status, Some(303));
    assert_eq!(world.response_location.as_deref(), Some(expected.as_str()));
}

#[then(expr = "the session device is {string}")]
fn session_device(world: &mut FarmwatchWorld, expected: String) {
    assert_eq!(world.api().session().device_id(), Some(expected));
}

#[then("no session is stored")]
fn no_session(world: &mut FarmwatchWorld) {
    assert!(!world.api().session().is_authenticated());
    let store = world.store.as_ref().expect("store not set");
    assert_eq!(store.get("token"), None);
    assert_eq!(store.get("user"), None);
}

#[then("the stored token is cleared")]
fn token_cleared(world: &mut FarmwatchWorld) {
    let store = world.store.as_ref().expect("store not set");
    assert_eq!(store.get("token"), None);
    assert!(!world.api().session().is_authenticated());
}
