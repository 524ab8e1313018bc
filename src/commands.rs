//! Inbound command surface
//!
//! Every command converts failures into a `Result<_, String>`, an empty
//! result, or an error status event; nothing propagates a panic or a typed
//! error to the caller. Long-running commands exist in two forms:
//! fire-and-forget (`refresh_catalog`, `sync_collection`) returning a
//! `CommandAck` immediately, and awaited (`run_*`).

pub mod catalog_commands;
pub mod collection_commands;
pub mod enrichment_commands;
pub mod status_commands;

pub use catalog_commands::*;
pub use collection_commands::*;
pub use enrichment_commands::*;
pub use status_commands::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::OperationKind;

/// Immediate answer to a fire-and-forget command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAck {
    pub ok: bool,
    pub operation_id: Option<Uuid>,
    pub message: String,
}

impl CommandAck {
    pub fn accepted(operation_id: Uuid, operation: OperationKind) -> Self {
        Self {
            ok: true,
            operation_id: Some(operation_id),
            message: format!("{operation} started"),
        }
    }

    pub fn already_running(operation: OperationKind) -> Self {
        Self {
            ok: false,
            operation_id: None,
            message: format!("{operation} already running"),
        }
    }
}
