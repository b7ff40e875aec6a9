//! Messaging sync core of the campus tutoring app.
//!
//! Keeps a student's conversation list and the open conversation consistent
//! with the server of record, live change-feed events and the user's own
//! optimistic sends.

pub mod app;
pub mod backend;
pub mod cli;
pub mod domain;
pub mod infra;
#[cfg(test)]
mod test_support;
pub mod ui;
pub mod usecases;
