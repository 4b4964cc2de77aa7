use std::collections::HashMap;

use super::deep::ValueType;

/// Variables visible at some point of a method body
///
/// Nested scopes work on a copy, so bindings never leak outwards.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    variables: HashMap<String, ValueType>,
}

impl Environment {
    pub fn bind(&mut self, name: impl Into<String>, ty: ValueType) {
        self.variables.insert(name.into(), ty);
    }

    pub fn lookup(&self, name: &str) -> Option<&ValueType> {
        self.variables.get(name)
    }

    pub fn child(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::surface::TypeId;

    #[test]
    fn child_bindings_stay_local() {
        let mut outer = Environment::default();
        outer.bind("a", ValueType::Object(TypeId::from_index(0)));

        let mut inner = outer.child();
        inner.bind("b", ValueType::Object(TypeId::from_index(1)));

        assert!(inner.lookup("a").is_some());
        assert!(outer.lookup("b").is_none());
    }
}
