//! Persistence for cards, quiz instances, answers and results.
//!
//! `repository` defines the storage contracts and an in-memory adapter;
//! `sqlite` implements the same contracts on top of `sqlx`.

#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;
