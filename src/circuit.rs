use super::*;

use log::*;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One endpoint of a [`Wire`].
///
/// A terminal either sources a value (an input-board pin or a component
/// output pin) or consumes one (a component input pin or an output-board
/// pin). The editing layer is free to store wires in either direction;
/// compilation looks only at what kind of terminal each endpoint is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Terminal {
    BoardIn(PinId),
    BoardOut(PinId),
    CompIn(Name, usize),
    CompOut(Name, usize),
}

impl Terminal {
    /// Can this terminal drive a net?
    pub fn is_driver(&self) -> bool {
        match self {
            Terminal::BoardIn(_) => true,
            Terminal::CompOut(_, _) => true,
            _ => false,
        }
    }

    /// Can this terminal read a net?
    pub fn is_reader(&self) -> bool {
        !self.is_driver()
    }
}

impl std::fmt::Display for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Terminal::BoardIn(pin) => write!(f, "in.{pin}"),
            Terminal::BoardOut(pin) => write!(f, "out.{pin}"),
            Terminal::CompIn(name, pin) => write!(f, "{name}.in{pin}"),
            Terminal::CompOut(name, pin) => write!(f, "{name}.out{pin}"),
        }
    }
}

/// A connection between two terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire(pub Terminal, pub Terminal);

/// An input-board or output-board pin declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPin {
    pub id: PinId,
    #[serde(default = "default_width")]
    pub width: Width,
}

fn default_width() -> Width {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusMode {
    /// Slice one input bus into partition-sized output segments.
    Split,
    /// Concatenate partition-sized input segments into one output bus.
    Merge,
}

/// Partition configuration of a bus split/merge component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSpec {
    pub mode: BusMode,
    pub partitions: Vec<Width>,
}

impl BusSpec {
    pub fn total_width(&self) -> Width {
        self.partitions.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentKind {
    Nand,
    Nor,
    Bus(BusSpec),
    Latch,
    Custom(Name),
}

impl ComponentKind {
    pub fn input_count(&self, library: &Library) -> usize {
        match self {
            ComponentKind::Nand => 2,
            ComponentKind::Nor => 2,
            ComponentKind::Bus(spec) => match spec.mode {
                BusMode::Split => 1,
                BusMode::Merge => spec.partitions.len(),
            },
            ComponentKind::Latch => 2,
            ComponentKind::Custom(name) => match library.get(name) {
                Some(def) => def.inputs.len(),
                None => 0,
            },
        }
    }

    pub fn output_count(&self, library: &Library) -> usize {
        match self {
            ComponentKind::Nand => 1,
            ComponentKind::Nor => 1,
            ComponentKind::Bus(spec) => match spec.mode {
                BusMode::Split => spec.partitions.len(),
                BusMode::Merge => 1,
            },
            ComponentKind::Latch => 2,
            ComponentKind::Custom(name) => match library.get(name) {
                Some(def) => def.outputs.len(),
                None => 0,
            },
        }
    }

    pub fn input_width(&self, pin: usize, library: &Library) -> Width {
        match self {
            ComponentKind::Nand => 1,
            ComponentKind::Nor => 1,
            ComponentKind::Bus(spec) => match spec.mode {
                BusMode::Split => spec.total_width(),
                BusMode::Merge => spec.partitions.get(pin).copied().unwrap_or(1),
            },
            ComponentKind::Latch => 1,
            ComponentKind::Custom(name) => library
                .get(name)
                .and_then(|def| def.inputs.get(pin))
                .map(|p| p.width)
                .unwrap_or(1),
        }
    }

    pub fn output_width(&self, pin: usize, library: &Library) -> Width {
        match self {
            ComponentKind::Nand => 1,
            ComponentKind::Nor => 1,
            ComponentKind::Bus(spec) => match spec.mode {
                BusMode::Split => spec.partitions.get(pin).copied().unwrap_or(1),
                BusMode::Merge => spec.total_width(),
            },
            ComponentKind::Latch => 1,
            ComponentKind::Custom(name) => library
                .get(name)
                .and_then(|def| def.outputs.get(pin))
                .map(|p| p.width)
                .unwrap_or(1),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ComponentKind::Nand => "nand".to_string(),
            ComponentKind::Nor => "nor".to_string(),
            ComponentKind::Bus(spec) => match spec.mode {
                BusMode::Split => "bus split".to_string(),
                BusMode::Merge => "bus merge".to_string(),
            },
            ComponentKind::Latch => "latch".to_string(),
            ComponentKind::Custom(name) => format!("custom {name}"),
        }
    }
}

/// A component instance placed in a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: Name,
    pub kind: ComponentKind,
}

/// An unordered description of a circuit: component instances, the wires
/// between their pins, and the board pins at the boundary. This is the form
/// the editing layer builds incrementally; [`compile`](crate::compile) turns
/// it into a validated [`Netlist`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    pub components: Vec<Component>,
    pub wires: Vec<Wire>,
    pub inputs: Vec<BoardPin>,
    pub outputs: Vec<BoardPin>,
}

impl Circuit {
    pub fn new() -> Circuit {
        Circuit::default()
    }

    pub fn add_input(&mut self, id: PinId, width: Width) {
        self.inputs.push(BoardPin { id, width });
    }

    pub fn add_output(&mut self, id: PinId, width: Width) {
        self.outputs.push(BoardPin { id, width });
    }

    pub fn add_component<S: Into<Name>>(&mut self, id: S, kind: ComponentKind) {
        self.components.push(Component { id: id.into(), kind });
    }

    pub fn add_wire(&mut self, from: Terminal, to: Terminal) {
        self.wires.push(Wire(from, to));
    }

    pub fn input_width(&self, id: PinId) -> Width {
        for pin in &self.inputs {
            if pin.id == id {
                return pin.width;
            }
        }
        1
    }
}

/// A user-defined hierarchical component: a named sub-circuit with declared
/// input and output pins. Instances of the definition are evaluated by
/// recursively compiling and evaluating the sub-circuit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDef {
    pub name: Name,
    pub inputs: Vec<BoardPin>,
    pub outputs: Vec<BoardPin>,
    pub circuit: Circuit,
    #[serde(skip)]
    compiled: OnceCell<Arc<Netlist>>,
}

impl ComponentDef {
    pub fn new<S: Into<Name>>(name: S, inputs: Vec<BoardPin>, outputs: Vec<BoardPin>, circuit: Circuit) -> ComponentDef {
        ComponentDef {
            name: name.into(),
            inputs,
            outputs,
            circuit,
            compiled: OnceCell::new(),
        }
    }

    /// The compiled sub-circuit, cached for the lifetime of this definition.
    /// Replacing a definition in the library replaces the cache with it.
    pub fn netlist(&self, library: &Library) -> Arc<Netlist> {
        self.compiled
            .get_or_init(|| Arc::new(crate::compile(&self.circuit, library)))
            .clone()
    }
}

/// The set of custom component definitions a circuit may instantiate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Library {
    defs: BTreeMap<Name, ComponentDef>,
}

impl Library {
    pub fn new() -> Library {
        Library::default()
    }

    pub fn add(&mut self, def: ComponentDef) {
        if self.defs.insert(def.name.clone(), def).is_some() {
            debug!("replaced component definition");
        }
    }

    pub fn get(&self, name: &str) -> Option<&ComponentDef> {
        self.defs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.defs.keys()
    }

    /// Check every definition against the rest of the library.
    ///
    /// Returns the definition names in dependency order (instantiated
    /// definitions before their instantiators), or the problems found.
    /// A definition that reaches itself would only be stopped at evaluation
    /// time by the recursion cap, so it is reported here instead.
    pub fn check(&self) -> Result<Vec<Name>, Vec<LibraryError>> {
        use petgraph::algo::{tarjan_scc, toposort};
        use petgraph::graph::{DiGraph, NodeIndex};

        let mut graph = DiGraph::<Name, ()>::new();
        let mut nodes: BTreeMap<&Name, NodeIndex> = BTreeMap::new();
        for name in self.defs.keys() {
            nodes.insert(name, graph.add_node(name.clone()));
        }

        let mut errors = vec![];
        for (name, def) in &self.defs {
            for component in &def.circuit.components {
                if let ComponentKind::Custom(dep) = &component.kind {
                    if let Some(dep_node) = nodes.get(dep) {
                        graph.add_edge(nodes[name], *dep_node, ());
                    } else {
                        errors.push(LibraryError::UnknownComponent(name.clone(), dep.clone()));
                    }
                }
            }
        }

        for scc in tarjan_scc(&graph) {
            let recursive = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
            if recursive {
                let mut names: Vec<Name> = scc.iter().map(|n| graph[*n].clone()).collect();
                names.sort();
                errors.push(LibraryError::RecursiveDefinition(names));
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut sorted: Vec<NodeIndex> = toposort(&graph, None).expect("acyclic after scc check");
        sorted.reverse();
        Ok(sorted.into_iter().map(|n| graph[n].clone()).collect())
    }
}
