#![deny(unsafe_code)]
#![allow(clippy::needless_return)]
#![warn(clippy::await_holding_lock, clippy::inefficient_to_string)]

pub mod app_state;
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod hub;
pub mod logging;
pub mod routes;
pub mod schema;
pub mod server;
pub mod sse;
pub mod visibility;

pub use app_state::AppState;
pub use auth::Claims;
pub use error::ApiError;
pub use event::{AuthResultEvent, Event, RecordAction};
pub use hub::{Hub, Subscriber};
pub use server::{Server, ServerOptions};
