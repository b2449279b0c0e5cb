//! Gatesim is a netlist compiler and simulation engine for digital logic
//! circuits built from primitive gates, bus split/merge primitives, SR
//! latches, and user-defined hierarchical components.
//!
//! A [`Circuit`] is compiled into a [`Netlist`] with [`compile`]. The
//! netlist carries every validation finding rather than failing, and is
//! evaluated by a [`Sim`] session, which owns the persistent latch state.
//! Netlists restricted to plain two-input gates can additionally be packed
//! ([`pack`]) into a flat [`PackedNetlist`] and driven by the incremental
//! [`Engine`], either directly or on a dedicated compute thread through a
//! [`Worker`].

mod circuit;
mod compile;
mod depends;
mod engine;
mod error;
mod netlist;
mod pack;
mod path;
mod shared;
pub mod sim;
mod worker;

#[cfg(test)]
mod tests;

pub use circuit::{BoardPin, BusMode, BusSpec, Circuit, Component, ComponentDef, ComponentKind, Library, Terminal, Wire};
pub use compile::compile;
pub use depends::Depends;
pub use engine::Engine;
pub use error::{Finding, LibraryError, PackError};
pub use netlist::{CompiledComponent, Net, Netlist};
pub use pack::{pack, GateOp, PackOptions, PackedNetlist};
pub use path::Path;
pub use shared::SharedValues;
pub use sim::{Sim, Value};
pub use worker::{Backend, BackendFactory, Request, Response, SharedConfig, Worker};

/// Identifier of a component instance or a custom component definition.
pub type Name = String;

/// Numeric identifier of an input-board or output-board pin.
pub type PinId = u32;

/// Bit width of a net or of a bus partition.
pub type Width = u32;

/// Index of a net within a [`Netlist`].
pub type NetId = usize;
