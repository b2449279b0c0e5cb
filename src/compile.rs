use super::*;

use log::*;
use std::collections::BTreeMap;

/// Compile a circuit description into a validated [`Netlist`].
///
/// Compilation never fails: every problem is recorded as a [`Finding`] and
/// the returned netlist's `valid` flag summarizes whether any of them was
/// hard. Wires are walked in order, merging endpoints into nets as
/// connections are discovered; a merge of two driven nets records the
/// conflict once and keeps the driver of the surviving net.
pub fn compile(circuit: &Circuit, library: &Library) -> Netlist {
    let mut builder = NetBuilder::new();

    for Wire(from, to) in &circuit.wires {
        builder.connect(circuit, library, from, to);
    }

    let mut components: Vec<CompiledComponent> = vec![];
    for component in &circuit.components {
        if let ComponentKind::Custom(name) = &component.kind {
            if library.get(name).is_none() {
                warn!("component {} has unknown type {name} and will be skipped", component.id);
            }
        }

        let mut inputs = vec![];
        for pin in 0..component.kind.input_count(library) {
            let terminal = Terminal::CompIn(component.id.clone(), pin);
            let net_id = match builder.net_of(&terminal) {
                Some(net_id) => net_id,
                None => {
                    let net_id = builder.fresh(component.kind.input_width(pin, library));
                    builder.assign(terminal.clone(), net_id);
                    builder.net_mut(net_id).add_reader(terminal);
                    builder.findings.push(Finding::FloatingInput(component.id.clone(), pin));
                    net_id
                }
            };
            inputs.push(net_id);
        }

        let mut outputs = vec![];
        for pin in 0..component.kind.output_count(library) {
            let terminal = Terminal::CompOut(component.id.clone(), pin);
            let net_id = match builder.net_of(&terminal) {
                Some(net_id) => net_id,
                None => {
                    let width = component.kind.output_width(pin, library);
                    let net_id = builder.fresh(width);
                    builder.assign(terminal.clone(), net_id);
                    builder.net_mut(net_id).set_driver(terminal, width);
                    net_id
                }
            };
            outputs.push(net_id);
        }

        components.push(CompiledComponent {
            id: component.id.clone(),
            kind: component.kind.clone(),
            inputs,
            outputs,
        });
    }

    for pin in &circuit.outputs {
        if builder.net_of(&Terminal::BoardOut(pin.id)).is_none() {
            builder.findings.push(Finding::FloatingOutput(pin.id));
        }
    }

    let (nets, remap) = builder.compact();
    for component in &mut components {
        for net_id in component.inputs.iter_mut().chain(component.outputs.iter_mut()) {
            *net_id = remap[*net_id];
        }
    }

    let mut findings = builder.findings;
    let order = sort_components(&components, &nets, &mut findings);
    let valid = !findings.iter().any(|finding| finding.is_hard());

    debug!(
        "compiled {} nets, {} components, {} findings, valid={valid}",
        nets.len(),
        components.len(),
        findings.len()
    );

    Netlist {
        nets,
        components,
        order,
        valid,
        findings,
    }
}

/// Dependency-order the compiled components by following each input net
/// back to its driving component. On a cycle the order is withheld entirely
/// and the stuck components are reported.
fn sort_components(components: &[CompiledComponent], nets: &[Net], findings: &mut Vec<Finding>) -> Vec<usize> {
    let mut index_by_id: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, component) in components.iter().enumerate() {
        index_by_id.insert(component.id.as_str(), i);
    }

    let mut depends: Depends<usize> = Depends::new();
    for i in 0..components.len() {
        depends.add(i);
    }
    for (i, component) in components.iter().enumerate() {
        for &net_id in &component.inputs {
            if let Some(Terminal::CompOut(driver_id, _pin)) = nets[net_id].driver() {
                if let Some(&driver_index) = index_by_id.get(driver_id.as_str()) {
                    depends.add_dependency(driver_index, i);
                }
            }
        }
    }

    match depends.sort() {
        Ok(order) => order,
        Err(cycle) => {
            let names = cycle.0.iter().map(|&i| components[i].id.clone()).collect();
            findings.push(Finding::Cycle(names));
            vec![]
        }
    }
}

struct NetBuilder {
    nets: Vec<Option<Net>>,
    assignment: BTreeMap<Terminal, NetId>,
    findings: Vec<Finding>,
}

impl NetBuilder {
    fn new() -> NetBuilder {
        NetBuilder {
            nets: vec![],
            assignment: BTreeMap::new(),
            findings: vec![],
        }
    }

    fn net_of(&self, terminal: &Terminal) -> Option<NetId> {
        self.assignment.get(terminal).copied()
    }

    fn assign(&mut self, terminal: Terminal, net_id: NetId) {
        self.assignment.insert(terminal, net_id);
    }

    fn fresh(&mut self, width: Width) -> NetId {
        let mut net = Net::new();
        net.set_width(width);
        self.nets.push(Some(net));
        self.nets.len() - 1
    }

    fn net_mut(&mut self, net_id: NetId) -> &mut Net {
        self.nets[net_id].as_mut().expect("merged-away net is never referenced")
    }

    fn connect(&mut self, circuit: &Circuit, library: &Library, from: &Terminal, to: &Terminal) {
        let net_id = match (self.net_of(from), self.net_of(to)) {
            (Some(a), Some(b)) if a != b => {
                self.merge(a, b);
                a
            }
            (Some(a), Some(_)) => a,
            (Some(a), None) => {
                self.assign(to.clone(), a);
                a
            }
            (None, Some(b)) => {
                self.assign(from.clone(), b);
                b
            }
            (None, None) => {
                let net_id = self.fresh(1);
                self.assign(from.clone(), net_id);
                self.assign(to.clone(), net_id);
                net_id
            }
        };

        for terminal in [from, to] {
            if terminal.is_driver() {
                let width = driver_width(circuit, library, terminal);
                self.offer_driver(net_id, terminal.clone(), width);
            } else {
                self.net_mut(net_id).add_reader(terminal.clone());
            }
        }
    }

    /// Merge the net `gone` into `keep`: readers move over, assignments are
    /// redirected, and if both nets carried a driver the surviving net keeps
    /// its own.
    fn merge(&mut self, keep: NetId, gone: NetId) {
        let mut removed = self.nets[gone].take().expect("merged-away net is never referenced");
        let removed_width = removed.width();
        for reader in removed.take_readers() {
            self.net_mut(keep).add_reader(reader);
        }
        if let Some(driver) = removed.take_driver() {
            self.offer_driver(keep, driver, removed_width);
        }
        for net_id in self.assignment.values_mut() {
            if *net_id == gone {
                *net_id = keep;
            }
        }
    }

    fn offer_driver(&mut self, net_id: NetId, terminal: Terminal, width: Width) {
        let net = self.net_mut(net_id);
        match net.driver().cloned() {
            None => net.set_driver(terminal, width),
            Some(existing) => {
                if existing != terminal {
                    self.findings.push(Finding::MultipleDrivers(existing, terminal));
                }
            }
        }
    }

    /// Drop merged-away slots and renumber. Returns the live nets and the
    /// old-to-new index map.
    fn compact(&mut self) -> (Vec<Net>, Vec<NetId>) {
        let slots = std::mem::take(&mut self.nets);
        let mut nets = vec![];
        let mut remap = vec![usize::MAX; slots.len()];
        for (old_id, slot) in slots.into_iter().enumerate() {
            if let Some(net) = slot {
                remap[old_id] = nets.len();
                nets.push(net);
            }
        }
        (nets, remap)
    }
}

fn driver_width(circuit: &Circuit, library: &Library, terminal: &Terminal) -> Width {
    match terminal {
        Terminal::BoardIn(pin) => circuit.input_width(*pin),
        Terminal::CompOut(name, pin) => {
            for component in &circuit.components {
                if &component.id == name {
                    return component.kind.output_width(*pin, library);
                }
            }
            debug!("wire references output of unknown component {name}");
            1
        }
        _ => 1,
    }
}
