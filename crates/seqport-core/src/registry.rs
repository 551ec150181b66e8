use std::collections::HashMap;

use crate::{Error, ModelSpec, Result, Variable, VariableKind};

/// Name-to-variable lookup for one loaded model.
///
/// Names are unique per kind: an input and an output may share a name, two
/// inputs may not. Registration order is kept for listing.
#[derive(Clone, Debug, Default)]
pub struct VariableRegistry {
    variables: Vec<Variable>,
    inputs: HashMap<String, usize>,
    outputs: HashMap<String, usize>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        let mut registry = Self::new();
        for variable in spec.inputs.iter().chain(&spec.outputs) {
            registry.register(variable.clone())?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, variable: Variable) -> Result<()> {
        variable.shape.validate()?;

        let index = self.variables.len();
        let names = match variable.kind {
            VariableKind::Input => &mut self.inputs,
            VariableKind::Output => &mut self.outputs,
        };
        if names.contains_key(&variable.name) {
            return Err(Error::DuplicateName {
                kind: variable.kind,
                name: variable.name,
            });
        }

        names.insert(variable.name.clone(), index);
        self.variables.push(variable);
        Ok(())
    }

    /// Looks a name up among inputs first, then outputs.
    pub fn resolve(&self, name: &str) -> Result<&Variable> {
        self.get(VariableKind::Input, name)
            .or_else(|| self.get(VariableKind::Output, name))
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))
    }

    pub fn resolve_input(&self, name: &str) -> Result<&Variable> {
        self.get(VariableKind::Input, name)
            .ok_or_else(|| Error::UnknownInputVariable(name.to_string()))
    }

    pub fn resolve_output(&self, name: &str) -> Result<&Variable> {
        self.get(VariableKind::Output, name)
            .ok_or_else(|| Error::UnknownOutputVariable(name.to_string()))
    }

    pub fn get(&self, kind: VariableKind, name: &str) -> Option<&Variable> {
        let names = match kind {
            VariableKind::Input => &self.inputs,
            VariableKind::Output => &self.outputs,
        };
        names.get(name).map(|&i| &self.variables[i])
    }

    /// All variables of `kind`, in declaration order.
    pub fn resolve_kind(&self, kind: VariableKind) -> Vec<&Variable> {
        self.variables.iter().filter(|v| v.kind == kind).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
