//! The scope table: a tree of lexical frames built by the scope builder and
//! re-walked by the lowering engine in lockstep with the AST. Each symbol's
//! IR identity is written exactly once, at the point its declaration is
//! lowered; lookups elsewhere only see symbols whose identity has already
//! been assigned.

use hashbrown::HashMap;

use crate::{
    backend::ty::IrType,
    frontend::{ast::ReturnKind, intern::InternedSymbol},
    index::{Index, IndexVec, simple_index},
};

simple_index! {
    /// Identifies one lexical frame in the scope tree
    pub struct ScopeId;
}

simple_index! {
    /// Identifies a declared symbol
    pub struct SymbolId;
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    names: HashMap<InternedSymbol, SymbolId>,
}

#[derive(Debug)]
pub struct Symbol {
    pub name: InternedSymbol,
    pub kind: SymbolKind,
    /// IR identity (`@name` for globals, `%n` for locals); `None` until the
    /// declaration is lowered
    pub ir_name: Option<String>,
    /// Realized IR type. For values and parameters this is the pointee type
    /// of the symbol's storage slot.
    pub ir_ty: Option<IrType>,
}

#[derive(Debug)]
pub enum SymbolKind {
    Value {
        is_const: bool,
        /// 0 = scalar, 1 or 2 = array rank
        rank: usize,
        /// Second-dimension extent of a rank-two array, filled in when the
        /// declaration is lowered
        inner_extent: Option<i32>,
    },
    /// A function parameter; its array rank decays one pointer level when
    /// realized
    Param { rank: usize },
    Function {
        return_kind: ReturnKind,
        params: Vec<SymbolId>,
    },
}

impl Symbol {
    pub fn new(name: InternedSymbol, kind: SymbolKind) -> Self {
        Self {
            name,
            kind,
            ir_name: None,
            ir_ty: None,
        }
    }

    pub fn rank(&self) -> usize {
        match &self.kind {
            SymbolKind::Value { rank, .. } | SymbolKind::Param { rank } => *rank,
            SymbolKind::Function { .. } => unreachable!("functions have no value rank"),
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self.kind, SymbolKind::Value { is_const: true, .. })
    }

    pub fn ir_name(&self) -> &str {
        self.ir_name
            .as_deref()
            .expect("symbol is used before its declaration was lowered")
    }

    pub fn ir_ty(&self) -> &IrType {
        self.ir_ty
            .as_ref()
            .expect("symbol is used before its declaration was lowered")
    }
}

#[derive(Debug)]
pub struct ScopeTree {
    scopes: IndexVec<ScopeId, Scope>,
    symbols: IndexVec<SymbolId, Symbol>,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut tree = Self {
            scopes: IndexVec::new(),
            symbols: IndexVec::new(),
        };

        tree.scopes.push(Scope {
            parent: None,
            children: Vec::new(),
            names: HashMap::new(),
        });

        tree
    }

    pub fn root(&self) -> ScopeId {
        ScopeId::new(0)
    }

    pub fn new_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = self.scopes.push(Scope {
            parent: Some(parent),
            children: Vec::new(),
            names: HashMap::new(),
        });

        self.scopes[parent].children.push(id);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    /// Creates a symbol without binding it to a frame (used for intrinsic
    /// function parameters, which have no lexical home)
    pub fn add_detached_symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.push(symbol)
    }

    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> SymbolId {
        let name = symbol.name;
        let id = self.symbols.push(symbol);
        self.scopes[scope].names.insert(name, id);
        id
    }

    /// Looks a name up in one frame only
    pub fn lookup_local(&self, scope: ScopeId, name: InternedSymbol) -> Option<SymbolId> {
        self.scopes[scope].names.get(&name).copied()
    }

    /// Walks from `scope` toward the root and returns the innermost match,
    /// regardless of lowering state. Used by the scope builder, where
    /// declare-before-use is guaranteed by construction order.
    pub fn lookup(&self, scope: ScopeId, name: InternedSymbol) -> Option<SymbolId> {
        let mut current = Some(scope);

        while let Some(id) = current {
            if let Some(symbol) = self.lookup_local(id, name) {
                return Some(symbol);
            }

            current = self.scopes[id].parent;
        }

        None
    }

    /// The lowering engine's lookup: a symbol is only visible once its IR
    /// identity has been assigned, except for the single name currently
    /// being defined
    pub fn lookup_assigned(
        &self,
        scope: ScopeId,
        name: InternedSymbol,
        defining: Option<InternedSymbol>,
    ) -> Option<SymbolId> {
        let mut current = Some(scope);

        while let Some(id) = current {
            if let Some(symbol) = self.lookup_local(id, name) {
                if self.symbols[symbol].ir_name.is_some() || defining == Some(name) {
                    return Some(symbol);
                }
            }

            current = self.scopes[id].parent;
        }

        None
    }

    /// Writes a symbol's IR identity. Panics if it was already assigned:
    /// identity assignment happens exactly once, at the declaration site.
    pub fn assign_identity(&mut self, id: SymbolId, ir_name: String, ir_ty: IrType) {
        let symbol = &mut self.symbols[id];

        assert!(
            symbol.ir_name.is_none(),
            "IR identity for `{}` assigned twice",
            symbol.name
        );

        symbol.ir_name = Some(ir_name);
        symbol.ir_ty = Some(ir_ty);
    }
}

/// Walks the scope tree in lockstep with the AST traversal: entering the
/// n-th nested block of a scope enters that scope's n-th child frame.
#[derive(Debug)]
pub struct ScopeCursor {
    stack: Vec<CursorFrame>,
}

#[derive(Debug)]
struct CursorFrame {
    scope: ScopeId,
    next_child: usize,
}

impl ScopeCursor {
    pub fn new(root: ScopeId) -> Self {
        Self {
            stack: vec![CursorFrame {
                scope: root,
                next_child: 0,
            }],
        }
    }

    pub fn current(&self) -> ScopeId {
        self.stack.last().expect("cursor stack is never empty").scope
    }

    pub fn enter_child(&mut self, tree: &ScopeTree) -> ScopeId {
        let frame = self.stack.last_mut().expect("cursor stack is never empty");
        let child = tree.scope(frame.scope).children[frame.next_child];
        frame.next_child += 1;

        self.stack.push(CursorFrame {
            scope: child,
            next_child: 0,
        });

        child
    }

    pub fn exit(&mut self) {
        self.stack.pop();
        assert!(!self.stack.is_empty(), "cursor exited the root scope");
    }
}
