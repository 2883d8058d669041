//! Microsoft Graph implementation of the drive storage trait.
//!
//! [`GraphDriveClient`] talks to the Graph drive endpoints over HTTPS
//! and plugs into `driveup_transfer::DriveUploader` as its
//! [`DriveStore`](driveup_transfer::DriveStore). Access tokens arrive
//! asynchronously through [`TokenProvider`], so a client can be built
//! before sign-in completes; requests wait for the first token instead
//! of failing.

pub mod auth;
pub mod client;

pub use auth::{AuthError, TokenProvider, TokenWriter, token_channel};
pub use client::{ClientError, GraphDriveClient};
