use std::sync::Arc;

/// An instance path scopes state to one instantiation of a component
/// through the chain of custom-component instances that contains it,
/// eg `alu/carry_latch`. The root path is empty.
#[derive(Ord, PartialOrd, Eq, PartialEq, Clone)]
pub struct Path(Arc<String>);

impl Path {
    pub fn root() -> Path {
        Path(Arc::new(String::new()))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, segment: &str) -> Path {
        if self.is_root() {
            segment.into()
        } else {
            format!("{self}/{segment}").into()
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    pub fn contains_segment(&self, segment: &str) -> bool {
        self.segments().any(|s| s == segment)
    }
}

impl std::ops::Deref for Path {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", &self.0)
    }
}

impl std::fmt::Debug for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "Path(\"{}\")", &self.0)
    }
}

impl From<String> for Path {
    fn from(path: String) -> Path {
        Path(Arc::new(path))
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Path {
        Path(Arc::new(path.to_string()))
    }
}
