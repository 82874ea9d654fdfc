//! Roster - Employee Search Service
//!
//! This crate implements an HTTP service for searching an organization's
//! employee roster with per-organization field visibility. Every request
//! passes through a sliding-window rate limiter keyed by client address.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
pub mod roster;
