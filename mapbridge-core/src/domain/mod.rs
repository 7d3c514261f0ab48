//! Core domain types
//!
//! This module contains the core domain structures used across mapbridge crates.
//! Tasks travel through the mailbox, remote jobs and files are what the
//! execution service hands back.

pub mod file;
pub mod job;
pub mod task;
