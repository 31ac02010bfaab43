// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//! Internal error types for each subsystem. These map onto `api::error::ApiError`
//! for the HTTP boundary; nothing in this module knows about axum or HTTP status codes.

pub mod claim;
pub mod provider;
pub mod scheduler;
pub mod store;

pub use claim::ClaimError;
pub use provider::ProviderError;
pub use scheduler::SchedulerError;
pub use store::StoreError;
