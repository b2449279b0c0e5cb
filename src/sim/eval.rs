use super::*;
use crate::{BusMode, CompiledComponent, ComponentKind, Library, Netlist, Path, PinId};
use log::*;
use std::collections::BTreeMap;

impl Sim {
    pub(super) fn eval_component(
        &mut self,
        component: &CompiledComponent,
        netlist: &Netlist,
        net_values: &mut [Value],
        library: &Library,
        depth: usize,
        path: &Path,
    ) {
        match &component.kind {
            ComponentKind::Nand => {
                let a = input_bit(component, 0, net_values);
                let b = input_bit(component, 1, net_values);
                write_output(component, 0, netlist, net_values, Value::bit(!(a && b)));
            }
            ComponentKind::Nor => {
                let a = input_bit(component, 0, net_values);
                let b = input_bit(component, 1, net_values);
                write_output(component, 0, netlist, net_values, Value::bit(!(a || b)));
            }
            ComponentKind::Bus(spec) => match spec.mode {
                BusMode::Split => {
                    let bus = input_value(component, 0, net_values).resize(spec.total_width());
                    let mut offset = 0;
                    for (pin, &partition) in spec.partitions.iter().enumerate() {
                        write_output(component, pin, netlist, net_values, bus.slice(offset, partition));
                        offset += partition;
                    }
                }
                BusMode::Merge => {
                    let mut bus = Value::zero(0);
                    for (pin, &partition) in spec.partitions.iter().enumerate() {
                        let segment = input_value(component, pin, net_values).resize(partition);
                        bus = bus.concat(&segment);
                    }
                    write_output(component, 0, netlist, net_values, bus);
                }
            },
            ComponentKind::Latch => self.eval_latch(component, netlist, net_values, path),
            ComponentKind::Custom(name) => {
                self.eval_custom(component, name, netlist, net_values, library, depth, path)
            }
        }
    }

    /// SR latch. Set and reset high together is an invalid input: both
    /// outputs go low for the pass and the stored bit is left untouched.
    fn eval_latch(&mut self, component: &CompiledComponent, netlist: &Netlist, net_values: &mut [Value], path: &Path) {
        let set = input_bit(component, 0, net_values);
        let reset = input_bit(component, 1, net_values);
        let key = path.join(&component.id);
        let stored = *self.latch_entry(key.clone());

        let (q, q_bar) = match (set, reset) {
            (true, true) => (false, false),
            (true, false) => {
                self.store_latch(key, true);
                (true, false)
            }
            (false, true) => {
                self.store_latch(key, false);
                (false, true)
            }
            (false, false) => (stored, !stored),
        };

        write_output(component, 0, netlist, net_values, Value::bit(q));
        write_output(component, 1, netlist, net_values, Value::bit(q_bar));
    }

    fn eval_custom(
        &mut self,
        component: &CompiledComponent,
        name: &str,
        netlist: &Netlist,
        net_values: &mut [Value],
        library: &Library,
        depth: usize,
        path: &Path,
    ) {
        let def = match library.get(name) {
            Some(def) => def,
            None => {
                warn!("skipping {}: unknown component type {name}", component.id);
                return;
            }
        };
        if depth >= MAX_DEPTH {
            warn!("recursion cap reached at {}; {} evaluates to zero", path, component.id);
            return;
        }

        let mut sub_inputs: BTreeMap<PinId, Value> = BTreeMap::new();
        for (pin, &net_id) in def.inputs.iter().zip(component.inputs.iter()) {
            sub_inputs.insert(pin.id, net_values[net_id]);
        }

        let sub_netlist = def.netlist(library);
        let child_path = path.join(&component.id);
        let result = self.evaluate_at(&sub_netlist, &sub_inputs, library, depth + 1, &child_path);

        // Scatter in output declaration order. Missing outputs stay zero.
        for (pin, &net_id) in def.outputs.iter().zip(component.outputs.iter()) {
            if let Some(value) = result.get(&pin.id) {
                net_values[net_id] = value.resize(netlist.nets[net_id].width());
            }
        }
    }
}

fn input_value(component: &CompiledComponent, pin: usize, net_values: &[Value]) -> Value {
    component
        .inputs
        .get(pin)
        .map(|&net_id| net_values[net_id])
        .unwrap_or(Value::zero(1))
}

fn input_bit(component: &CompiledComponent, pin: usize, net_values: &[Value]) -> bool {
    input_value(component, pin, net_values).bit0()
}

fn write_output(component: &CompiledComponent, pin: usize, netlist: &Netlist, net_values: &mut [Value], value: Value) {
    if let Some(&net_id) = component.outputs.get(pin) {
        net_values[net_id] = value.resize(netlist.nets[net_id].width());
    }
}
