//! Integration test common infrastructure.
//!
//! Provides a kernel harness wired to a recording sink and an in-memory
//! outcome log, plus fake sources and small plugins to drive it with.

pub mod fakes;
pub mod harness;

#[allow(unused_imports)]
pub use fakes::{BrokenFetcher, FailingStore, StaticFetcher, StoreFault};
#[allow(unused_imports)]
pub use harness::{ADMIN_HOST, BOT_NICK, Harness, RecordingSink, admin, eventually, user};
#[allow(unused_imports)]
pub use fakes::{Echo, Fail, FixedPlugin, Panic};
