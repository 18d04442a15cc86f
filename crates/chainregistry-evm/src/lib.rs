//! chainregistry-evm — registry contract decoders, event router and listener.

pub mod bindings;
pub mod builder;
pub mod decoder;
pub mod listener;
pub mod pager;
pub mod registry;
pub mod router;
pub mod rpc;
pub mod upgrades;

pub use builder::ListenerBuilder;
pub use decoder::{default_topics, ContractBinding, RegistryEvent};
pub use listener::RegistryListener;
pub use registry::ContractRegistry;
pub use router::EventRouter;
pub use rpc::RawLog;
pub use upgrades::{watch_upgrades, BlockLogs};
