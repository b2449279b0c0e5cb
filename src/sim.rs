use super::*;

mod eval;
mod value;

pub use value::{Value, MAX_WIDTH};

use log::*;
use std::collections::BTreeMap;

/// How deep custom components may nest. A subtree past the cap evaluates to
/// all-zero outputs instead of recursing further.
pub const MAX_DEPTH: usize = 100;

/// An evaluation session.
///
/// The session owns the persistent state of every SR latch it has
/// evaluated, keyed by instance path, so latches hold their value across
/// calls. Independent circuits must use independent sessions.
///
/// Nothing invalidates latch state automatically: when the editing layer
/// removes a component or restructures its subtree it must call
/// [`Sim::remove_latch_state`] (or [`Sim::reset_latch_states`]).
pub struct Sim {
    latches: BTreeMap<Path, bool>,
}

impl Sim {
    pub fn new() -> Sim {
        Sim {
            latches: BTreeMap::new(),
        }
    }

    /// Evaluate a compiled netlist once.
    ///
    /// Nets are reset to zero, input-board values are applied, components
    /// run in topological order, and the values seen by output-board pins
    /// are returned. An invalid netlist yields an empty mapping.
    pub fn evaluate(
        &mut self,
        netlist: &Netlist,
        inputs: &BTreeMap<PinId, Value>,
        library: &Library,
    ) -> BTreeMap<PinId, Value> {
        self.evaluate_at(netlist, inputs, library, 0, &Path::root())
    }

    pub(crate) fn evaluate_at(
        &mut self,
        netlist: &Netlist,
        inputs: &BTreeMap<PinId, Value>,
        library: &Library,
        depth: usize,
        path: &Path,
    ) -> BTreeMap<PinId, Value> {
        if !netlist.valid {
            debug!("refusing to evaluate invalid netlist");
            return BTreeMap::new();
        }

        let mut net_values: Vec<Value> = netlist.nets.iter().map(|net| Value::zero(net.width())).collect();

        for (net_id, net) in netlist.nets.iter().enumerate() {
            if let Some(Terminal::BoardIn(pin)) = net.driver() {
                if let Some(value) = inputs.get(pin) {
                    net_values[net_id] = value.resize(net.width());
                }
            }
        }

        for &index in &netlist.order {
            let component = &netlist.components[index];
            self.eval_component(component, netlist, &mut net_values, library, depth, path);
        }

        let mut outputs = BTreeMap::new();
        for (net_id, net) in netlist.nets.iter().enumerate() {
            for reader in net.readers() {
                if let Terminal::BoardOut(pin) = reader {
                    outputs.insert(*pin, net_values[net_id]);
                }
            }
        }
        outputs
    }

    /// Forget all latch state.
    pub fn reset_latch_states(&mut self) {
        self.latches.clear();
    }

    /// Forget the state of every latch whose instance path runs through the
    /// given component. Call this when the component (or the subtree it
    /// heads) is removed or replaced.
    pub fn remove_latch_state(&mut self, component: &str) {
        self.latches.retain(|path, _| !path.contains_segment(component));
    }

    /// The stored bit of the latch at an instance path, if one exists.
    pub fn latch_state<P: Into<Path>>(&self, path: P) -> Option<bool> {
        self.latches.get(&path.into()).copied()
    }

    pub(crate) fn latch_entry(&mut self, path: Path) -> &mut bool {
        self.latches.entry(path).or_insert(false)
    }

    pub(crate) fn store_latch(&mut self, path: Path, value: bool) {
        self.latches.insert(path, value);
    }
}

impl Default for Sim {
    fn default() -> Sim {
        Sim::new()
    }
}
