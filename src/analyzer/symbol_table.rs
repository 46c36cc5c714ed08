use std::collections::HashMap;

use crate::{
    error::{CompileError, CompileResult},
    parser::Param,
};

use super::Type;

#[derive(Clone, Debug, PartialEq)]
pub enum SymbolKind {
    Variable,
    Function { params: Vec<Param> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: String,
    /// Declared type of a variable, or the return type of a function.
    pub ty: Type,
    /// Last known constant value.
    pub value: i64,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }
}

/// One flat scope for the whole compilation unit. Declaration order is kept
/// because it lays out the data section.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    table: HashMap<String, usize>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, symbol: Symbol) -> CompileResult<()> {
        if self.table.contains_key(&symbol.name) {
            return Err(CompileError::Redeclaration(symbol.name));
        }
        self.table.insert(symbol.name.clone(), self.symbols.len());
        self.symbols.push(symbol);
        Ok(())
    }

    pub fn declare(&mut self, name: &str, ty: Type) -> CompileResult<()> {
        self.insert(Symbol {
            name: name.to_string(),
            ty,
            value: 0,
            kind: SymbolKind::Variable,
        })
    }

    pub fn declare_function(
        &mut self,
        name: &str,
        params: Vec<Param>,
        return_type: Type,
    ) -> CompileResult<()> {
        self.insert(Symbol {
            name: name.to_string(),
            ty: return_type,
            value: 0,
            kind: SymbolKind::Function { params },
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.table.get(name).map(|&i| &self.symbols[i])
    }

    pub fn type_of(&self, name: &str) -> Option<Type> {
        self.lookup(name).map(|s| s.ty)
    }

    pub fn set_value(&mut self, name: &str, value: i64) {
        if let Some(&i) = self.table.get(name) {
            self.symbols[i].value = value;
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| !s.is_function())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn reset(&mut self) {
        self.table.clear();
        self.symbols.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_then_lookup() {
        let mut symbol_table = SymbolTable::new();
        symbol_table.declare("x", Type::Number).unwrap();
        symbol_table.declare("greeting", Type::String).unwrap();

        assert_eq!(symbol_table.type_of("x"), Some(Type::Number));
        assert_eq!(symbol_table.type_of("greeting"), Some(Type::String));
        assert_eq!(symbol_table.type_of("y"), None);
        assert!(symbol_table.lookup("y").is_none());
    }

    #[test]
    fn redeclaration_fails() {
        let mut symbol_table = SymbolTable::new();
        symbol_table.declare("x", Type::Number).unwrap();
        assert_eq!(
            symbol_table.declare("x", Type::String),
            Err(CompileError::Redeclaration("x".to_string()))
        );
        assert_eq!(
            symbol_table.declare_function("x", vec![], Type::Unknown),
            Err(CompileError::Redeclaration("x".to_string()))
        );
        assert_eq!(symbol_table.type_of("x"), Some(Type::Number));
    }

    #[test]
    fn functions_share_the_namespace_but_have_no_slot() {
        let mut symbol_table = SymbolTable::new();
        symbol_table.declare("a", Type::Number).unwrap();
        symbol_table
            .declare_function("f", vec![], Type::Boolean)
            .unwrap();
        symbol_table.declare("b", Type::Boolean).unwrap();

        let names: Vec<_> = symbol_table.variables().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(symbol_table.lookup("f").unwrap().is_function());
        assert_eq!(symbol_table.type_of("f"), Some(Type::Boolean));
    }

    #[test]
    fn reset_clears_everything() {
        let mut symbol_table = SymbolTable::new();
        symbol_table.declare("x", Type::Number).unwrap();
        symbol_table.set_value("x", 7);
        assert_eq!(symbol_table.lookup("x").unwrap().value, 7);

        symbol_table.reset();
        assert!(symbol_table.is_empty());
        symbol_table.declare("x", Type::String).unwrap();
        assert_eq!(symbol_table.len(), 1);
    }
}
