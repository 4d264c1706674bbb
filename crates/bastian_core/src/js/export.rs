use core::fmt;
use std::rc::Rc;

use crate::js::{FunctionContext, Handle, NativeFunction, Value};

/// Callback that fills an [`ExportBuilder`]. Engines keep one and run it for every realm.
pub type Generator = Rc<dyn Fn(&mut ExportBuilder)>;

/// One entry of a script visible namespace.
#[derive(Clone)]
pub enum Export {
    Value(Handle<Value>),
    Function(NativeFunction),
    Namespace(Namespace),
}

impl From<Handle<Value>> for Export {
    fn from(value: Handle<Value>) -> Self {
        Self::Value(value)
    }
}

impl From<NativeFunction> for Export {
    fn from(function: NativeFunction) -> Self {
        Self::Function(function)
    }
}

impl From<Namespace> for Export {
    fn from(namespace: Namespace) -> Self {
        Self::Namespace(namespace)
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Function(_) => f.write_str("Function"),
            Self::Namespace(namespace) => f.debug_tuple("Namespace").field(namespace).finish(),
        }
    }
}

/// Accumulates the names a script will see. Exporting a name twice keeps the position of the
/// first export and the payload of the last one.
#[derive(Default)]
pub struct ExportBuilder {
    entries: Vec<(String, Export)>,
}

impl ExportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export(&mut self, name: impl Into<String>, export: impl Into<Export>) -> &mut Self {
        let name = name.into();
        let export = export.into();

        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = export,
            None => self.entries.push((name, export)),
        }

        self
    }

    /// Exports a native function. Inside the callback, [`FunctionContext::argument`] reads the
    /// script arguments and [`FunctionContext::ret`] sets the result.
    pub fn export_fn(
        &mut self,
        name: impl Into<String>,
        function: impl Fn(&mut FunctionContext) + 'static,
    ) -> &mut Self {
        let function: NativeFunction = Rc::new(function);
        self.export(name, function)
    }

    /// Exports a nested namespace filled by `generator`.
    pub fn export_object(&mut self, name: impl Into<String>, generator: impl Fn(&mut ExportBuilder)) -> &mut Self {
        self.export(name, Namespace::from_generator(&generator))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self) -> Namespace {
        Namespace {
            entries: Rc::new(self.entries),
        }
    }
}

/// Finalised, immutable set of exports.
#[derive(Clone, Default)]
pub struct Namespace {
    entries: Rc<Vec<(String, Export)>>,
}

impl Namespace {
    pub fn from_generator(generator: &dyn Fn(&mut ExportBuilder)) -> Self {
        let mut builder = ExportBuilder::new();
        generator(&mut builder);
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, export)| export)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Export)> {
        self.entries.iter().map(|(name, export)| (name.as_str(), export))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
