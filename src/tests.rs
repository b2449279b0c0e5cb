use crate::*;

fn comp_in(id: &str, pin: usize) -> Terminal {
    Terminal::CompIn(id.to_string(), pin)
}

fn comp_out(id: &str, pin: usize) -> Terminal {
    Terminal::CompOut(id.to_string(), pin)
}

/// Board inputs 0 and 1 feed gate g1; g2 inverts g1's output into board
/// output 2. Used by the pack, engine, and worker tests as well.
pub(crate) fn two_gate_chain() -> Circuit {
    let mut circuit = Circuit::new();
    circuit.add_input(0, 1);
    circuit.add_input(1, 1);
    circuit.add_output(2, 1);
    circuit.add_component("g1", ComponentKind::Nand);
    circuit.add_component("g2", ComponentKind::Nand);
    circuit.add_wire(Terminal::BoardIn(0), comp_in("g1", 0));
    circuit.add_wire(Terminal::BoardIn(1), comp_in("g1", 1));
    circuit.add_wire(comp_out("g1", 0), comp_in("g2", 0));
    circuit.add_wire(comp_out("g1", 0), comp_in("g2", 1));
    circuit.add_wire(comp_out("g2", 0), Terminal::BoardOut(2));
    circuit
}

#[test]
fn acyclic_single_driver_circuit_is_valid() {
    let library = Library::new();
    let netlist = compile(&two_gate_chain(), &library);

    assert!(netlist.valid);
    assert!(netlist.findings.is_empty());
    assert_eq!(netlist.components.len(), 2);
    assert_eq!(netlist.order.len(), 2);
}

#[test]
fn second_driver_on_an_input_is_a_hard_finding() {
    let library = Library::new();
    let mut circuit = Circuit::new();
    circuit.add_input(0, 1);
    circuit.add_input(1, 1);
    circuit.add_output(2, 1);
    circuit.add_component("g", ComponentKind::Nand);
    circuit.add_wire(Terminal::BoardIn(0), comp_in("g", 0));
    circuit.add_wire(Terminal::BoardIn(1), comp_in("g", 0));
    circuit.add_wire(comp_out("g", 0), Terminal::BoardOut(2));

    let netlist = compile(&circuit, &library);
    assert!(!netlist.valid);
    assert!(netlist
        .findings
        .iter()
        .any(|f| matches!(f, Finding::MultipleDrivers(_, _))));

    // the net keeps a single driver, the one wired first
    let net_id = netlist.net_of(&comp_in("g", 0)).unwrap();
    assert_eq!(netlist.nets[net_id].driver(), Some(&Terminal::BoardIn(0)));
}

#[test]
fn merging_two_driven_nets_records_one_conflict() {
    let library = Library::new();
    let mut circuit = Circuit::new();
    circuit.add_input(0, 1);
    circuit.add_input(1, 1);
    circuit.add_component("a", ComponentKind::Nand);
    circuit.add_component("b", ComponentKind::Nand);
    // two independently driven nets, then a wire joining their reader pins
    circuit.add_wire(Terminal::BoardIn(0), comp_in("a", 0));
    circuit.add_wire(Terminal::BoardIn(1), comp_in("b", 0));
    circuit.add_wire(comp_in("a", 0), comp_in("b", 0));

    let netlist = compile(&circuit, &library);
    let conflicts = netlist
        .findings
        .iter()
        .filter(|f| matches!(f, Finding::MultipleDrivers(_, _)))
        .count();
    assert_eq!(conflicts, 1);
    assert!(!netlist.valid);

    // both reader pins ended up on the surviving net
    let net_id = netlist.net_of(&comp_in("a", 0)).unwrap();
    assert_eq!(netlist.net_of(&comp_in("b", 0)), Some(net_id));
}

#[test]
fn junction_chain_merges_into_one_net() {
    let library = Library::new();
    let mut circuit = Circuit::new();
    circuit.add_input(0, 1);
    circuit.add_component("g1", ComponentKind::Nand);
    circuit.add_component("g2", ComponentKind::Nand);
    // fan out through a reader pin rather than from the source
    circuit.add_wire(Terminal::BoardIn(0), comp_in("g1", 0));
    circuit.add_wire(comp_in("g1", 0), comp_in("g2", 0));

    let netlist = compile(&circuit, &library);
    let net_id = netlist.net_of(&Terminal::BoardIn(0)).unwrap();
    assert_eq!(netlist.net_of(&comp_in("g1", 0)), Some(net_id));
    assert_eq!(netlist.net_of(&comp_in("g2", 0)), Some(net_id));
    assert_eq!(netlist.nets[net_id].readers().len(), 2);
}

#[test]
fn wire_direction_does_not_matter() {
    let library = Library::new();
    let mut circuit = Circuit::new();
    circuit.add_input(0, 1);
    circuit.add_input(1, 1);
    circuit.add_output(2, 1);
    circuit.add_component("g", ComponentKind::Nand);
    // wires stored target-first
    circuit.add_wire(comp_in("g", 0), Terminal::BoardIn(0));
    circuit.add_wire(comp_in("g", 1), Terminal::BoardIn(1));
    circuit.add_wire(Terminal::BoardOut(2), comp_out("g", 0));

    let netlist = compile(&circuit, &library);
    assert!(netlist.valid);

    let net_id = netlist.net_of(&comp_in("g", 0)).unwrap();
    assert_eq!(netlist.nets[net_id].driver(), Some(&Terminal::BoardIn(0)));
    assert!(netlist.output_net(2).is_some());
}

#[test]
fn floating_output_is_advisory_only() {
    let library = Library::new();
    let mut circuit = two_gate_chain();
    circuit.add_output(9, 1);

    let netlist = compile(&circuit, &library);
    assert!(netlist.valid);
    assert!(netlist
        .findings
        .iter()
        .any(|f| matches!(f, Finding::FloatingOutput(9))));
}

#[test]
fn topological_order_follows_the_chain() {
    let library = Library::new();
    let mut circuit = Circuit::new();
    circuit.add_input(0, 1);
    circuit.add_output(1, 1);
    for id in ["a", "b", "c"] {
        circuit.add_component(id, ComponentKind::Nand);
    }
    circuit.add_wire(Terminal::BoardIn(0), comp_in("a", 0));
    circuit.add_wire(Terminal::BoardIn(0), comp_in("a", 1));
    circuit.add_wire(comp_out("a", 0), comp_in("b", 0));
    circuit.add_wire(comp_out("a", 0), comp_in("b", 1));
    circuit.add_wire(comp_out("b", 0), comp_in("c", 0));
    circuit.add_wire(comp_out("b", 0), comp_in("c", 1));
    circuit.add_wire(comp_out("c", 0), Terminal::BoardOut(1));

    let netlist = compile(&circuit, &library);
    assert!(netlist.valid);

    let position = |id: &str| {
        netlist
            .order
            .iter()
            .position(|&i| netlist.components[i].id == id)
            .unwrap()
    };
    assert!(position("a") < position("b"));
    assert!(position("b") < position("c"));
}

#[test]
fn feedback_loop_reports_every_component_on_the_cycle() {
    let library = Library::new();
    let mut circuit = Circuit::new();
    circuit.add_output(0, 1);
    for id in ["a", "b", "c"] {
        circuit.add_component(id, ComponentKind::Nand);
    }
    circuit.add_wire(comp_out("a", 0), comp_in("b", 0));
    circuit.add_wire(comp_out("a", 0), comp_in("b", 1));
    circuit.add_wire(comp_out("b", 0), comp_in("c", 0));
    circuit.add_wire(comp_out("b", 0), comp_in("c", 1));
    circuit.add_wire(comp_out("c", 0), comp_in("a", 0));
    circuit.add_wire(comp_out("c", 0), comp_in("a", 1));
    circuit.add_wire(comp_out("c", 0), Terminal::BoardOut(0));

    let netlist = compile(&circuit, &library);
    assert!(!netlist.valid);
    assert!(netlist.order.is_empty());

    let cycle = netlist
        .findings
        .iter()
        .find_map(|f| match f {
            Finding::Cycle(names) => Some(names.clone()),
            _ => None,
        })
        .expect("cycle finding");
    for id in ["a", "b", "c"] {
        assert!(cycle.iter().any(|name| name == id), "{id} missing from {cycle:?}");
    }
}

#[test]
fn compilation_is_deterministic() {
    let library = Library::new();
    let first = compile(&two_gate_chain(), &library);
    let second = compile(&two_gate_chain(), &library);
    assert_eq!(first, second);
}

#[test]
fn library_check_orders_definitions_and_flags_recursion() {
    let mut library = Library::new();

    let mut leaf = Circuit::new();
    leaf.add_input(0, 1);
    leaf.add_output(1, 1);
    leaf.add_component("n", ComponentKind::Nand);
    leaf.add_wire(Terminal::BoardIn(0), comp_in("n", 0));
    leaf.add_wire(Terminal::BoardIn(0), comp_in("n", 1));
    leaf.add_wire(comp_out("n", 0), Terminal::BoardOut(1));
    library.add(ComponentDef::new(
        "leaf",
        vec![BoardPin { id: 0, width: 1 }],
        vec![BoardPin { id: 1, width: 1 }],
        leaf,
    ));

    let mut wrapper = Circuit::new();
    wrapper.add_input(0, 1);
    wrapper.add_output(1, 1);
    wrapper.add_component("inner", ComponentKind::Custom("leaf".into()));
    wrapper.add_wire(Terminal::BoardIn(0), comp_in("inner", 0));
    wrapper.add_wire(comp_out("inner", 0), Terminal::BoardOut(1));
    library.add(ComponentDef::new(
        "wrapper",
        vec![BoardPin { id: 0, width: 1 }],
        vec![BoardPin { id: 1, width: 1 }],
        wrapper,
    ));

    let order = library.check().unwrap();
    let leaf_idx = order.iter().position(|n| n == "leaf").unwrap();
    let wrapper_idx = order.iter().position(|n| n == "wrapper").unwrap();
    assert!(leaf_idx < wrapper_idx);

    let mut selfref = Circuit::new();
    selfref.add_output(0, 1);
    selfref.add_component("me", ComponentKind::Custom("omega".into()));
    selfref.add_wire(comp_out("me", 0), Terminal::BoardOut(0));
    library.add(ComponentDef::new("omega", vec![], vec![BoardPin { id: 0, width: 1 }], selfref));

    let errors = library.check().unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, LibraryError::RecursiveDefinition(names) if names == &vec!["omega".to_string()])));
}
