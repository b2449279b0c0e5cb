use super::*;

use log::*;
use std::collections::BTreeMap;
use std::collections::VecDeque;

/// The incremental evaluation engine over a [`PackedNetlist`].
///
/// The first [`Engine::run`] sweeps every gate in topological order to
/// establish a baseline. After that, runs re-evaluate only the transitive
/// fan-out of nets whose value actually changed: input changes mark nets
/// dirty, dirty nets enqueue their reader gates, and a gate whose output
/// does not change stops the wave there.
///
/// The packed arrays are immutable for the engine's lifetime; structural
/// edits mean packing a new netlist and building a new engine.
pub struct Engine {
    packed: PackedNetlist,
    net_by_input: BTreeMap<PinId, NetId>,

    net_values: Vec<bool>,
    outputs: Vec<bool>,

    dirty: Vec<NetId>,
    queue: VecDeque<usize>,
    /// Generation stamp per gate. A gate is queued iff its stamp equals the
    /// current generation; bumping the generation unqueues everything at
    /// once instead of clearing the array.
    queued: Vec<u64>,
    generation: u64,

    primed: bool,
}

impl Engine {
    pub fn new(packed: PackedNetlist) -> Engine {
        let net_by_input = packed.inputs.iter().map(|&(pin, net_id)| (pin, net_id)).collect();
        let net_values = vec![false; packed.net_count];
        let outputs = vec![false; packed.outputs.len()];
        let queued = vec![0; packed.gate_count()];
        Engine {
            packed,
            net_by_input,
            net_values,
            outputs,
            dirty: vec![],
            queue: VecDeque::new(),
            queued,
            generation: 0,
            primed: false,
        }
    }

    pub fn packed(&self) -> &PackedNetlist {
        &self.packed
    }

    /// Apply input values. A value equal to the stored one is a no-op; a
    /// changed one marks the input's net dirty for the next run. Unknown
    /// pin ids are ignored.
    pub fn set_inputs(&mut self, pins: &[PinId], values: &[bool]) {
        for (&pin, &value) in pins.iter().zip(values.iter()) {
            let net_id = match self.net_by_input.get(&pin) {
                Some(&net_id) => net_id,
                None => {
                    debug!("ignoring unknown input pin {pin}");
                    continue;
                }
            };
            if self.net_values[net_id] != value {
                self.net_values[net_id] = value;
                self.dirty.push(net_id);
            }
        }
    }

    /// Propagate pending changes and refresh the output buffer. Returns the
    /// number of gate evaluations performed.
    ///
    /// `max_steps` bounds the evaluations in this call; when the bound is
    /// hit, propagation stops and downstream nets stay stale until
    /// something re-dirties them.
    pub fn run(&mut self, max_steps: Option<usize>) -> usize {
        let limit = max_steps.unwrap_or(usize::MAX);
        let mut steps = 0;

        if !self.primed {
            // cold start: unconditional sweep in topological order
            for i in 0..self.packed.order.len() {
                let gate = self.packed.order[i];
                self.net_values[self.packed.out[gate]] = self.eval_gate(gate);
                steps += 1;
            }
            self.dirty.clear();
            self.primed = true;
            self.refresh_outputs();
            debug!("cold run evaluated {steps} gates");
            return steps;
        }

        if self.dirty.is_empty() {
            self.refresh_outputs();
            return 0;
        }

        self.generation += 1;
        for i in 0..self.dirty.len() {
            let net_id = self.dirty[i];
            self.enqueue_readers(net_id);
        }
        self.dirty.clear();

        while let Some(gate) = self.queue.pop_front() {
            if steps == limit {
                warn!("propagation stopped after {steps} steps with {} gates pending", self.queue.len() + 1);
                self.queue.clear();
                break;
            }
            let value = self.eval_gate(gate);
            steps += 1;

            let out_net = self.packed.out[gate];
            if self.net_values[out_net] != value {
                self.net_values[out_net] = value;
                self.enqueue_readers(out_net);
            }
        }

        self.refresh_outputs();
        steps
    }

    pub fn outputs(&self) -> &[bool] {
        &self.outputs
    }

    pub fn net_values(&self) -> &[bool] {
        &self.net_values
    }

    /// Drop all value state and return to the cold-start condition.
    pub fn reset(&mut self) {
        self.net_values.iter_mut().for_each(|v| *v = false);
        self.outputs.iter_mut().for_each(|v| *v = false);
        self.dirty.clear();
        self.queue.clear();
        self.primed = false;
    }

    fn eval_gate(&self, gate: usize) -> bool {
        let a = self.net_values[self.packed.in0[gate]];
        let b = self.net_values[self.packed.in1[gate]];
        match self.packed.ops[gate] {
            GateOp::Nand => !(a && b),
            GateOp::Nor => !(a || b),
        }
    }

    fn enqueue_readers(&mut self, net_id: NetId) {
        let start = self.packed.reader_start[net_id];
        let count = self.packed.reader_count[net_id];
        for i in start..start + count {
            let gate = self.packed.reader_gates[i];
            if self.queued[gate] != self.generation {
                self.queued[gate] = self.generation;
                self.queue.push_back(gate);
            }
        }
    }

    fn refresh_outputs(&mut self) {
        for (slot, &(_pin, net_id)) in self.outputs.iter_mut().zip(self.packed.outputs.iter()) {
            *slot = self.net_values[net_id];
        }
    }
}
