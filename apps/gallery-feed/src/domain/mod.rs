//! Domain Layer - Core gallery types and ordering logic.
//!
//! This layer contains the gallery item collection and the connection
//! vocabulary shared by the rest of the crate. Nothing here performs I/O.

/// Gallery items and the ordered collection maintained under deltas.
pub mod gallery;

/// Connection state, liveness outcomes and credentials.
pub mod connection;
