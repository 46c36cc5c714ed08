use std::collections::HashMap;

/// Distinct string literals in order of first occurrence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiteralPool {
    strings: Vec<String>,
    index: HashMap<String, usize>,
}

impl LiteralPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `s`, adding it on first sight.
    pub fn intern(&mut self, s: &str) -> usize {
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        let i = self.strings.len();
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        i
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.strings.get(i).map(|s| s.as_str())
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn reset(&mut self) {
        self.strings.clear();
        self.index.clear();
    }
}
