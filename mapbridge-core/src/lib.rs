//! Mapbridge Core
//!
//! Core types and abstractions for the mapbridge task bridge.
//!
//! This crate contains:
//! - Domain types: Tasks, parameter/probe specs, remote jobs and files
//! - DTOs: Mailbox documents and remote service request/response bodies

pub mod domain;
pub mod dto;
