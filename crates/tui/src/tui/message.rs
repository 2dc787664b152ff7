//! Work requested by the app and results delivered back to it.

use crate::core::error::RequestError;
use crate::core::mutation::{PendingMutation, RemoteAck};
use crate::core::services::FetchTicket;
use crate::model::Task;

/// Remote work the event loop must start on the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    Fetch(FetchTicket),
    Send(PendingMutation),
}

/// Completion of an [`Effect`], fed back into [`super::app::App::on_message`].
#[derive(Debug, Clone)]
pub(crate) enum Message {
    Fetched(FetchTicket, Result<Vec<Task>, RequestError>),
    Settled(PendingMutation, Result<RemoteAck, RequestError>),
}
