//! Order notification stream over real HTTP.

use std::time::Duration;

use emporium_core::{OrderCreated, OrderId};
use emporium_integration_tests::TestContext;
use serde_json::json;

/// Read from an open event stream until `needle` shows up or `wait` passes.
async fn read_until(
    response: &mut reqwest::Response,
    buffer: &mut String,
    needle: &str,
    wait: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + wait;
    while !buffer.contains(needle) {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, response.chunk()).await {
            Ok(Ok(Some(chunk))) => buffer.push_str(&String::from_utf8_lossy(&chunk)),
            _ => return false,
        }
    }
    true
}

/// The data line of the first `order` event in `buffer`.
fn order_data(buffer: &str) -> Option<&str> {
    let start = buffer.find("event: order\n")?;
    buffer
        .get(start..)?
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
}

#[tokio::test]
async fn test_connected_admin_receives_created_order_once() {
    let ctx = TestContext::start().await;

    let mut stream = ctx
        .get("/api/notifications/sse", Some("sessionToken=admin-token"))
        .await;
    assert_eq!(stream.status(), 200);
    assert_eq!(
        stream.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let mut buffer = String::new();
    let greeted = read_until(
        &mut stream,
        &mut buffer,
        "event: ping\ndata: ok",
        Duration::from_secs(5),
    )
    .await;
    assert!(greeted);
    assert_eq!(ctx.state.notifications().client_count(), 1);

    let created = ctx
        .post_json(
            "/api/orders",
            Some("sessionToken=customer-token"),
            &json!({"items": [{"productId": 1, "quantity": 2}]}),
        )
        .await;
    assert_eq!(created.status(), 201);

    let delivered =
        read_until(&mut stream, &mut buffer, "event: order", Duration::from_secs(5)).await;
    assert!(delivered);
    // Let any duplicate arrive before counting
    read_until(&mut stream, &mut buffer, "never", Duration::from_millis(200)).await;
    assert_eq!(buffer.matches("event: order").count(), 1);

    let event: OrderCreated = serde_json::from_str(order_data(&buffer).unwrap()).unwrap();
    assert_eq!(event.id, Some(OrderId::new("ord_1001")));
    assert!(event.at > 0);
}

#[tokio::test]
async fn test_late_subscriber_gets_no_replay() {
    let ctx = TestContext::start().await;

    let created = ctx
        .post_json("/api/orders", Some("sessionToken=customer-token"), &json!({}))
        .await;
    assert_eq!(created.status(), 201);

    let mut stream = ctx
        .get("/api/notifications/sse", Some("sessionToken=staff-token"))
        .await;
    let mut buffer = String::new();
    assert!(read_until(&mut stream, &mut buffer, "event: ping", Duration::from_secs(5)).await);
    read_until(&mut stream, &mut buffer, "never", Duration::from_millis(300)).await;
    assert!(!buffer.contains("event: order"));
}

#[tokio::test]
async fn test_failed_order_publishes_nothing() {
    let ctx = TestContext::start().await;
    let mut subscription = ctx.state.notifications().register();

    let response = ctx
        .post_json("/api/orders", Some("sessionToken=expired"), &json!({}))
        .await;
    assert_eq!(response.status(), 401);
    assert!(subscription.try_recv().is_none());
}

#[tokio::test]
async fn test_stream_requires_admin_console_role() {
    let ctx = TestContext::start().await;

    let response = ctx.get("/api/notifications/sse", None).await;
    assert_eq!(response.status(), 401);

    let response = ctx
        .get("/api/notifications/sse", Some("sessionToken=customer-token"))
        .await;
    assert_eq!(response.status(), 403);
    assert_eq!(ctx.state.notifications().client_count(), 0);
}

#[tokio::test]
async fn test_disconnect_unregisters_client() {
    let ctx = TestContext::start().await;

    let mut stream = ctx
        .get("/api/notifications/sse", Some("sessionToken=admin-token"))
        .await;
    let mut buffer = String::new();
    assert!(read_until(&mut stream, &mut buffer, "event: ping", Duration::from_secs(5)).await);
    assert_eq!(ctx.state.notifications().client_count(), 1);
    drop(stream);

    // The server notices the closed connection on its next write
    let mut remaining = 50;
    while ctx.state.notifications().client_count() > 0 && remaining > 0 {
        ctx.state.notifications().publish(&OrderCreated::now(None));
        tokio::time::sleep(Duration::from_millis(20)).await;
        remaining -= 1;
    }
    assert_eq!(ctx.state.notifications().client_count(), 0);
}
