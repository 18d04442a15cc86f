//! chainregistry-core — foundation for the registry contract event listener.
//!
//! # Architecture
//!
//! ```text
//! ListenerBuilder → RegistryListener
//!                      ├── LogSource            (range fetch + live feed)
//!                      ├── ChainClient          (height, block metadata)
//!                      ├── RegistryStateClient  (current state, contract refresh)
//!                      ├── ContractRegistry     (role → address + decoder)
//!                      ├── EventRouter          (log → RegistryMessage)
//!                      └── MessageSink          (HandlerRegistry / ProxySink)
//! ```
//!
//! This crate holds the chain-agnostic pieces; the decoders, router and
//! listener live in `chainregistry-evm`.

pub mod client;
pub mod config;
pub mod contracts;
pub mod error;
pub mod handler;
pub mod memory;
pub mod message;
pub mod proxy;
pub mod subject;
pub mod telemetry;
pub mod types;

pub use client::{
    AgentState, ChainClient, FeedEvent, FeedOptions, LogSource, LogStream, RegistryStateClient,
};
pub use config::{ListenerConfig, ListenerState};
pub use contracts::{ContractAddresses, ContractFilter, ContractRole};
pub use error::ListenerError;
pub use handler::{BlockHandler, HandlerRegistry, MessageHandler, MessageProxy, MessageSink, ProxySink};
pub use message::{MessageKind, RegistryMessage, Source};
pub use proxy::BroadcastProxy;
pub use subject::SubjectType;
pub use types::{BlockSummary, Log};
