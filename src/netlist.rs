use super::*;

/// A value-carrying node formed by merging every wire endpoint that is
/// electrically connected. A net has at most one driver and any number of
/// readers; a net with no driver is floating and evaluates to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Net {
    driver: Option<Terminal>,
    readers: Vec<Terminal>,
    width: Width,
}

impl Net {
    pub(crate) fn new() -> Net {
        Net {
            driver: None,
            readers: vec![],
            width: 1,
        }
    }

    pub fn driver(&self) -> Option<&Terminal> {
        self.driver.as_ref()
    }

    pub fn readers(&self) -> &[Terminal] {
        &self.readers
    }

    pub fn width(&self) -> Width {
        self.width
    }

    pub fn contains(&self, terminal: &Terminal) -> bool {
        self.driver.as_ref() == Some(terminal) || self.readers.contains(terminal)
    }

    pub(crate) fn set_driver(&mut self, terminal: Terminal, width: Width) {
        self.driver = Some(terminal);
        self.width = width;
    }

    pub(crate) fn set_width(&mut self, width: Width) {
        self.width = width;
    }

    /// Readers keep their first-connection order.
    pub(crate) fn add_reader(&mut self, terminal: Terminal) {
        if !self.readers.contains(&terminal) {
            self.readers.push(terminal);
        }
    }

    pub(crate) fn take_readers(&mut self) -> Vec<Terminal> {
        std::mem::take(&mut self.readers)
    }

    pub(crate) fn take_driver(&mut self) -> Option<Terminal> {
        self.driver.take()
    }
}

/// A component instance with its pins resolved to net indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledComponent {
    pub id: Name,
    pub kind: ComponentKind,
    pub inputs: Vec<NetId>,
    pub outputs: Vec<NetId>,
}

/// The compiled, validated form of a circuit.
///
/// A netlist is an immutable snapshot: the evaluator keeps its scratch net
/// values outside of it, so one netlist may back any number of concurrent
/// evaluations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Netlist {
    pub nets: Vec<Net>,
    pub components: Vec<CompiledComponent>,
    /// A permutation of component indices in dependency order. Empty when a
    /// cycle was found.
    pub order: Vec<usize>,
    /// True iff no cycle or multiple-driver finding was recorded. Floating
    /// pins are advisory and do not affect validity.
    pub valid: bool,
    pub findings: Vec<Finding>,
}

impl Netlist {
    /// The net a terminal was assigned to, if any.
    pub fn net_of(&self, terminal: &Terminal) -> Option<NetId> {
        for (net_id, net) in self.nets.iter().enumerate() {
            if net.contains(terminal) {
                return Some(net_id);
            }
        }
        None
    }

    /// The net driven by an input-board pin.
    pub fn input_net(&self, pin: PinId) -> Option<NetId> {
        self.net_of(&Terminal::BoardIn(pin))
    }

    /// The net read by an output-board pin.
    pub fn output_net(&self, pin: PinId) -> Option<NetId> {
        self.net_of(&Terminal::BoardOut(pin))
    }
}
