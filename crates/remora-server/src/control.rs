//! Control routes: validate, enqueue, answer immediately.
//!
//! A handler never waits for its command to take effect. Pointer and key
//! routes answer `200` with an empty body (the viewer fires them from
//! script); navigation-style routes answer `303 See Other` back to the
//! viewer page so they also work from plain links and forms.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use metrics::counter;
use remora_core::Command;
use remora_core::metrics::{COMMANDS_ENQUEUED_TOTAL, COMMANDS_REJECTED_TOTAL};
use tracing::{debug, info, warn};

use crate::errors::ApiError;
use crate::params::{self, Query as Params};
use crate::server::AppState;

/// Hand a command to the dispatcher. Fails fast when the queue is full.
pub fn enqueue(state: &AppState, command: Command) -> Result<u64, ApiError> {
    let kind = command.kind();
    match state.queue.enqueue(command) {
        Ok(ticket) => {
            counter!(COMMANDS_ENQUEUED_TOTAL, "kind" => kind).increment(1);
            debug!(kind, ticket, "command queued");
            Ok(ticket)
        }
        Err(full) => {
            counter!(COMMANDS_REJECTED_TOTAL, "kind" => kind).increment(1);
            warn!(kind, capacity = full.capacity, "command queue full, rejecting");
            Err(ApiError::Busy {
                capacity: full.capacity,
            })
        }
    }
}

fn redirect_after(state: &AppState, command: Command) -> Result<Redirect, ApiError> {
    let _ = enqueue(state, command)?;
    Ok(Redirect::to("/"))
}

fn accepted(state: &AppState, command: Command) -> Result<StatusCode, ApiError> {
    let _ = enqueue(state, command)?;
    Ok(StatusCode::OK)
}

/// GET /navigate?url=
pub async fn navigate(
    State(state): State<AppState>,
    Query(query): Query<Params>,
) -> Result<Redirect, ApiError> {
    redirect_after(&state, params::navigate(&query)?)
}

/// GET /click?x=&y=
pub async fn click(
    State(state): State<AppState>,
    Query(query): Query<Params>,
) -> Result<StatusCode, ApiError> {
    accepted(&state, params::click(&query)?)
}

/// GET /scroll?direction=&amount=
pub async fn scroll(
    State(state): State<AppState>,
    Query(query): Query<Params>,
) -> Result<StatusCode, ApiError> {
    accepted(&state, params::scroll(&query)?)
}

/// GET /type?key=&modifiers=
pub async fn key_input(
    State(state): State<AppState>,
    Query(query): Query<Params>,
) -> Result<StatusCode, ApiError> {
    accepted(&state, params::key_input(&query)?)
}

/// GET /switch_tab?direction=
pub async fn switch_tab(
    State(state): State<AppState>,
    Query(query): Query<Params>,
) -> Result<Redirect, ApiError> {
    redirect_after(&state, params::switch_tab(&query)?)
}

/// GET /new_tab
pub async fn new_tab(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    redirect_after(&state, Command::NewTab)
}

/// GET /back
pub async fn back(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    redirect_after(&state, Command::Back)
}

/// GET /forward
pub async fn forward(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    redirect_after(&state, Command::Forward)
}

/// GET /reload
pub async fn reload(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    redirect_after(&state, Command::Reload)
}

/// GET /home
pub async fn home(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    redirect_after(&state, Command::Home)
}

/// GET /toggle_stream: flip the capture switch without stopping its schedule.
pub async fn toggle_stream(State(state): State<AppState>) -> Redirect {
    let streaming = state.switch.toggle();
    info!(streaming, "stream toggled");
    Redirect::to("/")
}
