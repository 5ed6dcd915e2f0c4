// File: src/tasks/mod.rs
//
// Background loops. Each runs on its own tokio task until its cancellation
// token fires.

pub mod auto_post;
pub mod live_check;
pub mod reconnect;

pub use auto_post::{spawn_auto_post_task, AUTO_POST_START_DELAY};
pub use live_check::spawn_live_check_task;
pub use reconnect::{run_reconnect_loop, MAX_RECONNECT_TRIES};
