//! Module loader and supervisor.
//!
//! Modules register a name and a constructor in a [`ModuleRegistry`]. The
//! [`Loader`] builds every module once, feeds all of them the same
//! configuration document, wires the enabled ones to the transport and the
//! shared HTTP mux, and finally runs everything under one cancellation scope
//! where the first failure stops the whole process.

pub mod error;
pub mod group;
pub mod http;
pub mod loader;
pub mod loopback;
pub mod module;
pub mod registry;
pub mod transport;

pub use {
    error::{Error, Result},
    group::TaskGroup,
    loader::{DispatchConfig, HttpConfig, LOADER_NAME, Loader, LoaderConfig, RESERVED_NAMES},
    loopback::{LoopbackConfig, LoopbackTransport},
    module::{
        CommandHandler, Handler, HttpHandler, MessageHandler, ModuleConfig, TransportBinder,
    },
    registry::{Module, ModuleRegistry},
    transport::{TRANSPORT_NAME, Transport, TransportFactory},
};
