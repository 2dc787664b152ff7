pub mod auth;
pub mod tasks;

pub use auth::{role_for, AuthError, AuthService, ADMIN_USER_ID};
pub use tasks::{FetchTicket, LoadState, RefreshOutcome, TaskBoard};
