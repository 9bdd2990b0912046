// # tentacool-core
//
// Core library for tentacool: declared network state, reconciled.
//
// ## Architecture Overview
//
// This library provides the declared-state reconciliation engine:
// - **ConfigStore**: Trait for durable declared state (one bucket per domain)
// - **SystemAdapter**: Trait for applying/removing a record's live effect
// - **Reconcilers**: Create/Update/Delete/List contract per domain
// - **StartupReplayer**: Reasserts stored state when the process starts
// - **NetworkInspector**: Trait for read-only live network views
//
// ## Design Principles
//
// 1. **Separation of Concerns**: No I/O against the live system in this crate
// 2. **Store is the source of truth**: Live state is driven, never cached
// 3. **Ordered changes**: Remove(previous) always precedes Apply(next) per key
// 4. **Library-First**: The HTTP surface and daemon are thin layers on top

pub mod config;
pub mod error;
pub mod locks;
pub mod reconciler;
pub mod records;
pub mod replay;
pub mod sequence;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{ReconcilerConfig, StoreConfig, TentacoolConfig};
pub use error::{Error, ErrorKind, Result};
pub use locks::KeyLocks;
pub use reconciler::{
    AddressReconciler, Adapters, ApplyStatus, DhcpReconciler, DnsReconciler, GatewayReconciler,
    Reconciled, Reconcilers,
};
pub use records::{
    AddressRecord, Cidr, DhcpState, DnsConfig, Domain, DomainRecord, GatewayRecord, StoredRecord,
};
pub use replay::{ReplayReport, StartupReplayer};
pub use sequence::SequenceAllocator;
pub use store::{FileConfigStore, MemoryConfigStore, open_store};
pub use traits::{ConfigStore, InterfaceAddress, InterfaceInfo, NetworkInspector, SystemAdapter};
