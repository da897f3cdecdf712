//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on request parsing, session plumbing, and
//! error mapping.

pub mod access;
pub mod design;
pub mod feedback;
pub mod importer;
pub mod layout;
pub mod project;
pub mod session;
pub mod sweeper;
