//! Server-sent order notifications for admin dashboards.

use std::convert::Infallible;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use axum_extra::extract::CookieJar;
use futures::stream::{self, Stream, StreamExt};

use crate::routes::admin::require_admin;
use crate::services::{Frame, HEARTBEAT_INTERVAL, Subscription};
use crate::state::AppState;

/// `GET /api/notifications/sse`.
///
/// Opens with a `ping`, then relays every order event until the client
/// disconnects. Dropping the stream drops the subscription, which removes
/// the client from the hub.
pub async fn subscribe(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    let (jar, principal) = match require_admin(&state, &jar, &headers).await {
        Ok(granted) => granted,
        Err(denied) => return denied,
    };

    let subscription = state.notifications().register();
    tracing::debug!(
        user = %principal.id,
        client = ?subscription.id(),
        "Notification stream opened"
    );

    let sse = Sse::new(events(subscription)).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .event(Frame::Ping.into_event()),
    );

    (jar, sse).into_response()
}

fn events(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    let greeting = stream::once(async { Ok(Frame::Ping.into_event()) });
    let frames = stream::unfold(subscription, |mut subscription| async move {
        let frame = subscription.recv().await?;
        Some((Ok(frame.into_event()), subscription))
    });
    greeting.chain(frames)
}
