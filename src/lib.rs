//! Policy core of a user-level demand pager: frame table, per-process page
//! tables, swap block allocation and second-chance eviction.

pub mod config;
pub mod error;
pub mod mmu;
pub mod pager;
pub mod process;
pub mod shared;
pub mod sim;
pub mod store;

pub use config::{PagerConfig, DEFAULT_PAGE_SIZE, UVM_BASE_ADDR};
pub use error::PagerError;
pub use frame_table::{Frame, Owner, Pid, Protection};
pub use mmu::Mmu;
pub use pager::{Pager, PagerStats};
pub use process::PageState;
pub use shared::SharedPager;
pub use sim::SimulatedMmu;
pub use store::BackingStore;
