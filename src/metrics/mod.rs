// SPDX-License-Identifier: MIT
pub mod summary;
pub mod tracker;

pub use summary::SessionSummary;
pub use tracker::MetricsTracker;
