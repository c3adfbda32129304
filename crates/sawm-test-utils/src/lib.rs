// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Sawm integration tests.
//!
//! Provides mock push adapters and a test harness for fast, deterministic,
//! CI-runnable tests without a push provider or wall clock.
//!
//! # Components
//!
//! - [`MockPushAdapter`] - Recording push adapter with scripted outcomes
//! - [`MockTransport`] - Per-token transport with scripted error codes
//! - [`TestHarness`] - Temp database, manual clock and the full dispatch stack

pub mod harness;
pub mod mock_push;
pub mod mock_transport;

pub use harness::TestHarness;
pub use mock_push::MockPushAdapter;
pub use mock_transport::MockTransport;
