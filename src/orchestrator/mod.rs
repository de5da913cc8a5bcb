//! Application-level orchestration.
//!
//! Runs user actions against the API, turns outcomes into toasts and decides what
//! to re-fetch. The CLI and the dashboard both go through here.

mod actions;
#[cfg(feature = "tui")]
mod controller;

pub(crate) use actions::{fetch, run_mutation, Mutation, MutationOutcome, Target};
#[cfg(feature = "tui")]
pub(crate) use controller::{run_controller, UiCommand, UiEvent};

use crate::api::ApiError;
use std::future::Future;

/// Race a one-shot call against Ctrl-C so an interrupted command drops its request.
pub(crate) async fn interruptible<T>(
    fut: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::select! {
        res = fut => res,
        _ = tokio::signal::ctrl_c() => Err(ApiError::Cancelled),
    }
}
