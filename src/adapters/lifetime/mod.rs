//! Lifetime slot adapters for the external-lifetime tier.
//!
//! Each adapter decides where "one lifetime" begins and ends:
//! - [`ContainerSlot`]: the slot object itself; everyone holding it shares one cache
//! - [`ThreadSlot`]: one cache per OS thread, per slot
//! - [`TaskSlot`]: one cache per tokio task-local scope, per slot

pub mod container;
pub mod task;
pub mod thread;

pub use container::ContainerSlot;
pub use task::TaskSlot;
pub use thread::ThreadSlot;

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier distinguishing slots that share thread- or task-local storage.
fn next_slot_id() -> u64 {
    NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed)
}
