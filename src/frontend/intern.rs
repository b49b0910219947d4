use std::sync::{Arc, RwLock};

use hashbrown::HashMap;
use once_cell::sync::Lazy;

#[derive(Debug, Default)]
pub struct InterningTable {
    strings: RwLock<Vec<&'static str>>,
    indices: RwLock<HashMap<&'static str, u32>>,
}

pub static INTERNING_TABLE: Lazy<Arc<InterningTable>> = Lazy::new(Default::default);

impl InterningTable {
    pub fn get(&self, index: u32) -> Option<&str> {
        let strings = self.strings.read().unwrap();

        strings.get(index as usize).copied()
    }

    pub fn insert_if_absent(&self, string: &str) -> u32 {
        if let Some(index) = self.indices.read().unwrap().get(string) {
            return *index;
        }

        let mut strings = self.strings.write().unwrap();
        let mut indices = self.indices.write().unwrap();

        let leaked: &'static str = Box::leak(string.to_owned().into_boxed_str());
        strings.push(leaked);

        let index = (strings.len() - 1) as u32;
        indices.insert(leaked, index);
        index
    }
}

/// An index into the string interning table
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternedSymbol(u32);

impl InternedSymbol {
    pub fn new(value: &str) -> Self {
        let index = INTERNING_TABLE.insert_if_absent(value);

        Self(index)
    }

    pub fn value(&self) -> &'static str {
        INTERNING_TABLE.get(self.0).expect(
            "Once an interned symbol is created, the string it references should never be removed \
             from the table",
        )
    }
}

impl core::fmt::Debug for InternedSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InternedSymbol")
            .field(&self.0)
            .field(&self.value())
            .finish()
    }
}

impl core::fmt::Display for InternedSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.value())
    }
}
