//! # Chirpy (short posts with session authentication)
//!
//! `chirpy` serves a small social-posting API and carries the authentication
//! and authorization core for it.
//!
//! ## Sessions
//!
//! Logging in with email and password returns two credentials:
//!
//! - a **session token**, an HS256 JWT valid for one hour, presented as
//!   `Authorization: Bearer <token>` on every write;
//! - a **refresh token**, 64 hex characters stored server side for 60 days,
//!   exchanged at `/api/refresh` for new session tokens and revoked at
//!   `/api/revoke`.
//!
//! ## Ownership
//!
//! Every chirp records its author. Deleting a chirp requires a valid session
//! whose subject is that author; otherwise the request is answered with 401
//! (no or bad session), 403 (someone else's chirp) or 404 (no such chirp).
//!
//! ## Service callbacks
//!
//! The payment provider authenticates with a static API key
//! (`Authorization: ApiKey <key>`), compared in constant time.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
