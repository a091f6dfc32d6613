// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kandev-wire: the outward JSON/WebSocket envelope protocol — frame
//! shape, recognized actions, and their typed request/notification
//! payloads.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod action;
mod envelope;
mod error;
mod error_payload;

pub use action::{
    Action, AgentCancelRequest, LaunchIntent, LaunchSessionRequest, LaunchSessionResponse,
    OrchestratorCompleteRequest, OrchestratorQueueRequest, OrchestratorQueueResponse,
    OrchestratorStatusResponse, OrchestratorStopRequest, PermissionRequestedNotification,
    PermissionRespondRequest, PromptTaskRequest, SessionMessageAddedNotification,
    SessionStateChangedNotification, SessionTurnCompletedNotification,
    SessionTurnStartedNotification, SessionWaitingForInputNotification, TaskSessionStatusRequest,
    TaskSessionStatusResponse,
};
pub use envelope::{Envelope, FrameType};
pub use error::WireError;
pub use error_payload::ErrorPayload;
