// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `payload` shape carried on a `type: "error"` envelope.

use kandev_core::ErrorKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn from_core(err: &kandev_core::CoreError) -> Self {
        Self { code: err.kind().code().to_string(), message: err.to_string() }
    }

    pub fn kind_code(kind: ErrorKind) -> &'static str {
        kind.code()
    }
}
