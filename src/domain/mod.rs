// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Domain value types shared by the store, scheduler, and API layers.
//! Pure data — no sqlx, no axum. The store layer maps these onto rows,
//! the API layer maps them onto JSON; neither owns the shape.

mod enums;
mod screen;
mod session;
mod work_pool;
mod worker;

pub use enums::{Browser, BrowserVersion, OperatingSystem, ProviderType, SessionStatus, WorkPoolStatus, WorkerStatus};
pub use screen::Screen;
pub use session::{Proxy, ResourceLimits, Session, SessionEvent, SessionEventType, SessionMetrics};
pub use work_pool::WorkPool;
pub use worker::Worker;
