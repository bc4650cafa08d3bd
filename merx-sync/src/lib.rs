//! Batch reconciliation engine for catalog categories.
//!
//! Takes caller-supplied category drafts and reconciles them against a
//! remote commerce platform: new categories are created, changed ones
//! receive a minimal list of update actions, unchanged ones are left
//! alone. Drafts whose referenced resources do not exist yet are parked
//! in a persisted waiting room and re-attempted once the dependency
//! appears — in the same run or a later one.
//!
//! # Architecture
//!
//! A run splits the input into bounded batches and drives each through a
//! fixed pipeline. Batches run sequentially; drafts inside a batch run
//! concurrently.
//!
//! ## Components
//!
//! - **Validator**: rejects structurally broken drafts and collects the
//!   referenced keys of the rest
//! - **Resolver**: rewrites symbolic (key) references into platform ids,
//!   backed by a bounded identity cache warmed with bulk lookups
//! - **Planner**: diffs a draft against the matching remote category into
//!   an ordered action list
//! - **Writer**: executes creates and updates, recovering exactly once
//!   from an optimistic-concurrency conflict
//! - **Waiting room**: persists drafts blocked on missing references,
//!   plus an out-of-band cleanup for entries that never resolve
//!
//! ## Sync Process
//!
//! 1. **Validate**: drop broken drafts, one recorded failure each
//! 2. **Fetch**: bulk-load the existing categories by key
//! 3. **Resolve**: rewrite references through the identity cache
//! 4. **Plan**: compute update actions, or decide to create
//! 5. **Write**: apply the plan, retrying a stale version once
//! 6. **Re-attempt**: unpark waiting drafts whose references now exist
//!
//! # Example
//!
//! ```
//! use merx_client::{PlatformClient, PlatformClientConfig};
//! use merx_sync::{CategorySync, SyncOptions};
//! use std::sync::Arc;
//!
//! let client = PlatformClient::new(PlatformClientConfig {
//!     project_key: "my-project".to_string(),
//!     auth_token: "secret".to_string(),
//!     ..Default::default()
//! });
//! let options = SyncOptions::builder()
//!     .batch_size(100)
//!     .warning_callback(|message, _draft| eprintln!("{message}"))
//!     .build();
//!
//! let sync = CategorySync::new(Arc::new(client), options);
//! ```

pub mod cache;
pub mod cleanup;
mod error;
pub mod options;
pub mod planner;
pub mod resolver;
pub mod stats;
mod sync;
pub mod unresolved;
pub mod validator;
pub mod writer;

pub use error::{SyncError, SyncResult};
pub use sync::CategorySync;

pub use cache::IdentityCache;
pub use cleanup::{CleanupErrorCallback, CleanupStatistics, UnresolvedEntryCleanup};
pub use options::{
    BeforeCreateHook, BeforeUpdateHook, ErrorCallback, MissingReferenceFallback, SyncOptions,
    SyncOptionsBuilder, WarningCallback, DEFAULT_BATCH_SIZE, DEFAULT_CACHE_CAPACITY,
};
pub use planner::{MutationPlanner, Plan};
pub use resolver::{ReferenceResolver, Resolution};
pub use stats::{StatisticsSnapshot, SyncStatistics};
pub use unresolved::{UnresolvedReferenceStore, WaitingToBeResolved, UNRESOLVED_CONTAINER};
pub use validator::{BatchValidator, ReferencedKeys};
pub use writer::{WriteCoordinator, WriteOutcome};
