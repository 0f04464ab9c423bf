// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # logzio-core
//!
//! Shared vocabulary for the logzio shipper workspace:
//!
//! - **Types**: [`QueueItem`], the opaque log record every queue stores
//! - **Error**: [`QueueError`], the storage-facing error hierarchy
//!
//! The shipper itself lives in the `logzio-sender` crate; this crate exists
//! so queue implementations and the delivery engine agree on one data unit
//! and one error surface.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod types;

pub use error::QueueError;
pub use types::QueueItem;
