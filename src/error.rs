use super::*;

/// A validation finding recorded by the compiler.
///
/// Findings never abort compilation. [`Finding::is_hard`] distinguishes the
/// findings that make a netlist invalid from the advisory ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// A combinational cycle through the named components.
    Cycle(Vec<Name>),
    /// A net ended up with two distinct drivers. The first terminal is the
    /// driver that was kept, the second the one that was rejected.
    MultipleDrivers(Terminal, Terminal),
    /// A declared component input pin with no wire attached. Evaluation
    /// treats the pin as constant false.
    FloatingInput(Name, usize),
    /// A declared output-board pin with no wire attached.
    FloatingOutput(PinId),
}

impl Finding {
    pub fn is_hard(&self) -> bool {
        match self {
            Finding::Cycle(_) => true,
            Finding::MultipleDrivers(_, _) => true,
            Finding::FloatingInput(_, _) => false,
            Finding::FloatingOutput(_) => false,
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Finding::Cycle(names) => write!(f, "Combinational cycle through: {}", names.join(", ")),
            Finding::MultipleDrivers(kept, rejected) => write!(f, "Net has multiple drivers: kept {kept}, rejected {rejected}."),
            Finding::FloatingInput(component, pin) => write!(f, "Input pin {pin} of {component} is floating and reads as 0."),
            Finding::FloatingOutput(pin) => write!(f, "Output pin {pin} is not driven."),
        }
    }
}

/// Why a netlist could not be packed for the incremental engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackError {
    InvalidNetlist,
    /// The named component is not a plain two-input/one-output gate.
    Unsupported(Name, String),
    /// A net wider than one bit; the packed form carries single bits only.
    WideNet(NetId, Width),
    /// A pin id in an explicit input/output order with no resolved net.
    UnknownPin(PinId),
}

impl std::fmt::Display for PackError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PackError::InvalidNetlist => write!(f, "Netlist has hard validation findings and cannot be packed"),
            PackError::Unsupported(name, kind) => write!(f, "Component {name} ({kind}) requires the reference evaluator"),
            PackError::WideNet(net, width) => write!(f, "Net {net} is {width} bits wide; only 1-bit nets can be packed"),
            PackError::UnknownPin(pin) => write!(f, "No net resolved for pin {pin}"),
        }
    }
}

/// A problem with a custom component library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// A definition that instantiates itself, directly or transitively.
    RecursiveDefinition(Vec<Name>),
    /// A definition instantiates a component the library does not define.
    UnknownComponent(Name, Name),
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LibraryError::RecursiveDefinition(names) => write!(f, "Recursive component definition: {}", names.join(", ")),
            LibraryError::UnknownComponent(def, name) => write!(f, "{def} instantiates undefined component {name}"),
        }
    }
}
