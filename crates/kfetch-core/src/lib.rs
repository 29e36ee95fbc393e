//! kfetch Core - Domain logic for the host information channel
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `InfoFlag`, `InfoMask`, `FieldValue`, `Report`, `SessionManager`
//! - **Use cases** - `Channel` (open/read/write/close) and `ReportRenderer`
//! - **Port definitions** - `IFactsProvider`, implemented by OS adapters
//!
//! # Architecture
//!
//! The domain module contains pure logic: mask interpretation, field
//! formatting, bounded report assembly and session exclusivity. Ports define
//! the trait through which host facts are obtained. Use cases orchestrate the
//! domain through that port and are what adapters (FUSE, CLI) call into.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
