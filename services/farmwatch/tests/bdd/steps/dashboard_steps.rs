//! BDD step definitions for dashboard pages

use cucumber::{then, when};

use crate::world::FarmwatchWorld;

#[when(expr = "I open {string}")]
async fn open_page(world: &mut FarmwatchWorld, uri: String) {
    world.request("GET", &uri, None).await;
}

#[when(expr = "I press the toggle for {string}")]
async fn press_toggle(world: &mut FarmwatchWorld, field: String) {
    world
        .request("POST", &format!("/api/toggle/{}", field), Some(""))
        .await;
}

#[then(expr = "requesting {string} redirects to {string}")]
async fn request_redirects(world: &mut FarmwatchWorld, uri: String, expected: String) {
    world.request("GET", &uri, None).await;
    assert_eq!(world.response_status, Some(303));
    assert_eq!(world.response_location.as_deref(), Some(expected.as_str()));
}

#[then(expr = "the response status is {int}")]
fn response_status(world: &mut FarmwatchWorld, expected: u16) {
    assert_eq!(world.response_status, Some(expected));
}

#[then(expr = "the page shows {string}")]
fn page_shows(world: &mut FarmwatchWorld, expected: String) {
    let body = world.body();
    assert!(
        body.contains(&expected),
        "Expected response to contain '{}', but it didn't.\nResponse body:\n{}",
        expected,
        body
    );
}

#[then(expr = "the page does not show {string}")]
fn page_does_not_show(world: &mut FarmwatchWorld, unexpected: String) {
    assert!(!world.body().contains(&unexpected));
}

#[then(expr = "the page has no card for {string}")]
fn no_card(world: &mut FarmwatchWorld, field: String) {
    let marker = format!(r#"data-field="{}""#, field);
    assert!(
        !world.body().contains(&marker),
        "Field '{}' should not be rendered as a card",
        field
    );
}

#[then(expr = "the page shows toggle {string} as {string}")]
fn toggle_shown(world: &mut FarmwatchWorld, label: String, position: String) {
    let class = position.to_lowercase();
    let expected = format!(
        r#"<h3>{}</h3><span class="switch {}">{}</span>"#,
        label, class, position
    );
    assert!(
        world.body().contains(&expected),
        "Expected toggle '{}' to be {}.\nResponse body:\n{}",
        label,
        position,
        world.body()
    );
}

#[then(expr = "the page shows fallback {string} with value {string}")]
fn fallback_shown(world: &mut FarmwatchWorld, label: String, value: String) {
    let expected = format!(
        r#"<div class="card fallback" data-field="{label}"><h3>{label}</h3><p class="value">{value}</p>"#
    );
    assert!(
        world.body().contains(&expected),
        "Expected fallback card for '{}'.\nResponse body:\n{}",
        label,
        world.body()
    );
}
