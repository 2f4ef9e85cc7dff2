//! Resilient HTTP client for the remote portfolio service.
//!
//! Owns the authentication session and performs every outbound call with
//! retry/backoff and transparent re-authentication. The reasoning loop
//! never sees credentials — operations hold an `Arc<dyn RemoteApi>` and
//! stay oblivious to auth state.

pub mod remote;

pub use remote::{RemoteApi, RemoteClient};
