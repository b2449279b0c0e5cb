use super::*;

use log::*;
use std::collections::BTreeMap;

/// The gate kinds the packed form can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOp {
    Nand,
    Nor,
}

/// A struct-of-arrays projection of a [`Netlist`] restricted to two-input,
/// one-output, single-bit gates.
///
/// Everything is index-based and flat so the whole structure can be handed
/// to a compute thread once and then driven with nothing but input ids and
/// bits. `reader_start`/`reader_count`/`reader_gates` form a CSR adjacency
/// from each net to the distinct gates that read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedNetlist {
    pub ops: Vec<GateOp>,
    pub in0: Vec<NetId>,
    pub in1: Vec<NetId>,
    pub out: Vec<NetId>,

    pub reader_start: Vec<usize>,
    pub reader_count: Vec<usize>,
    pub reader_gates: Vec<usize>,

    /// Input-board pins paired with the nets they drive.
    pub inputs: Vec<(PinId, NetId)>,
    /// Output-board pins paired with the nets they read.
    pub outputs: Vec<(PinId, NetId)>,

    /// Gate indices in dependency order, copied from the source netlist.
    pub order: Vec<usize>,

    pub net_count: usize,
}

impl PackedNetlist {
    pub fn gate_count(&self) -> usize {
        self.ops.len()
    }

    /// The gates reading a net.
    pub fn readers_of(&self, net_id: NetId) -> &[usize] {
        let start = self.reader_start[net_id];
        &self.reader_gates[start..start + self.reader_count[net_id]]
    }

    /// Structural consistency of the parallel arrays. Used by transport
    /// layers to reject a bad payload without crashing the host thread.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = vec![];
        let gates = self.ops.len();
        if self.in0.len() != gates || self.in1.len() != gates || self.out.len() != gates {
            problems.push(format!(
                "gate arrays disagree: {} ops, {}/{}/{} pins",
                gates,
                self.in0.len(),
                self.in1.len(),
                self.out.len()
            ));
        }
        if self.order.len() != gates {
            problems.push(format!("order has {} entries for {} gates", self.order.len(), gates));
        }
        if self.reader_start.len() != self.net_count || self.reader_count.len() != self.net_count {
            problems.push(format!(
                "adjacency has {}/{} entries for {} nets",
                self.reader_start.len(),
                self.reader_count.len(),
                self.net_count
            ));
        }
        for &net_id in self.in0.iter().chain(&self.in1).chain(&self.out) {
            if net_id >= self.net_count {
                problems.push(format!("net index {net_id} out of range"));
                break;
            }
        }
        for &(pin, net_id) in self.inputs.iter().chain(&self.outputs) {
            if net_id >= self.net_count {
                problems.push(format!("pin {pin} maps to net {net_id}, out of range"));
                break;
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Explicit ordering of input-board pins. Ascending id order if absent.
    pub input_order: Option<Vec<PinId>>,
    /// Explicit ordering of output-board pins. Ascending id order if absent.
    pub output_order: Option<Vec<PinId>>,
}

/// Project a netlist into its packed form, or explain why it cannot be.
///
/// Anything outside the restricted subset (buses, split/merge, latches,
/// custom components, invalid netlists) is rejected with errors rather than
/// silently dropped; those circuits belong on the reference evaluator.
pub fn pack(netlist: &Netlist, options: &PackOptions) -> Result<PackedNetlist, Vec<PackError>> {
    let mut errors = vec![];

    if !netlist.valid {
        return Err(vec![PackError::InvalidNetlist]);
    }
    for component in &netlist.components {
        match component.kind {
            ComponentKind::Nand | ComponentKind::Nor => (),
            _ => errors.push(PackError::Unsupported(component.id.clone(), component.kind.describe())),
        }
    }
    for (net_id, net) in netlist.nets.iter().enumerate() {
        if net.width() != 1 {
            errors.push(PackError::WideNet(net_id, net.width()));
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let gate_count = netlist.components.len();
    let net_count = netlist.nets.len();

    let mut ops = Vec::with_capacity(gate_count);
    let mut in0 = Vec::with_capacity(gate_count);
    let mut in1 = Vec::with_capacity(gate_count);
    let mut out = Vec::with_capacity(gate_count);
    for component in &netlist.components {
        let op = match component.kind {
            ComponentKind::Nand => GateOp::Nand,
            ComponentKind::Nor => GateOp::Nor,
            _ => unreachable!("rejected above"),
        };
        ops.push(op);
        in0.push(component.inputs[0]);
        in1.push(component.inputs[1]);
        out.push(component.outputs[0]);
    }

    // Net-to-readers adjacency in two passes over the gates. The seen
    // marker is stamped rather than cleared between gates; pass two uses
    // stamps offset by gate_count so pass one's marks read as unseen.
    let mut seen = vec![usize::MAX; net_count];
    let mut reader_count = vec![0usize; net_count];
    for gate in 0..gate_count {
        for net_id in [in0[gate], in1[gate]] {
            if seen[net_id] != gate {
                seen[net_id] = gate;
                reader_count[net_id] += 1;
            }
        }
    }

    let mut reader_start = vec![0usize; net_count];
    let mut total = 0;
    for net_id in 0..net_count {
        reader_start[net_id] = total;
        total += reader_count[net_id];
    }

    let mut reader_gates = vec![0usize; total];
    let mut fill = reader_start.clone();
    for gate in 0..gate_count {
        for net_id in [in0[gate], in1[gate]] {
            if seen[net_id] != gate + gate_count {
                seen[net_id] = gate + gate_count;
                reader_gates[fill[net_id]] = gate;
                fill[net_id] += 1;
            }
        }
    }

    let mut input_nets: BTreeMap<PinId, NetId> = BTreeMap::new();
    let mut output_nets: BTreeMap<PinId, NetId> = BTreeMap::new();
    for (net_id, net) in netlist.nets.iter().enumerate() {
        if let Some(Terminal::BoardIn(pin)) = net.driver() {
            input_nets.insert(*pin, net_id);
        }
        for reader in net.readers() {
            if let Terminal::BoardOut(pin) = reader {
                output_nets.insert(*pin, net_id);
            }
        }
    }

    let inputs = order_pins(&input_nets, options.input_order.as_deref(), &mut errors);
    let outputs = order_pins(&output_nets, options.output_order.as_deref(), &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    debug!("packed {gate_count} gates over {net_count} nets");

    Ok(PackedNetlist {
        ops,
        in0,
        in1,
        out,
        reader_start,
        reader_count,
        reader_gates,
        inputs,
        outputs,
        order: netlist.order.clone(),
        net_count,
    })
}

fn order_pins(
    nets_by_pin: &BTreeMap<PinId, NetId>,
    explicit: Option<&[PinId]>,
    errors: &mut Vec<PackError>,
) -> Vec<(PinId, NetId)> {
    match explicit {
        Some(pins) => {
            let mut ordered = vec![];
            for &pin in pins {
                match nets_by_pin.get(&pin) {
                    Some(&net_id) => ordered.push((pin, net_id)),
                    None => errors.push(PackError::UnknownPin(pin)),
                }
            }
            ordered
        }
        // BTreeMap iteration is already ascending by id
        None => nets_by_pin.iter().map(|(&pin, &net_id)| (pin, net_id)).collect(),
    }
}
