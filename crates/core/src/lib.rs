pub mod config;
pub mod directory;
pub mod error;
mod http;
pub mod model;
pub mod mutation;
pub mod remote;
pub mod services;
pub mod session;
#[cfg(test)]
mod testing;
pub mod view;

pub use config::{AppConfig, ConfigOverrides};
pub use directory::{DirectoryClient, UserDirectory};
pub use error::{RequestError, TaskError, ValidationError};
pub use model::*;
pub use mutation::{
    MutationCoordinator, MutationKind, MutationOutcome, MutationPhase, PendingMutation, RemoteAck,
    RemoteRequest,
};
pub use remote::{HttpTaskSource, TaskSource};
pub use services::{
    AuthError, AuthService, FetchTicket, LoadState, RefreshOutcome, TaskBoard,
};
pub use session::{Role, Session, SessionContext, SessionStore};
pub use view::{PageSize, PagedResult, SortDirection, SortField, ViewState};
