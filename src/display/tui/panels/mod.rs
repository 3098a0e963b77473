// SPDX-License-Identifier: MIT
pub mod events;
pub mod fps_history;
pub mod header;
pub mod stats;
