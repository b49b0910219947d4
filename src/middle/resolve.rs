//! Builds the scope tree the lowering engine walks: one frame per syntactic
//! block, in program order, seeded with the library intrinsics. Also reports
//! the handful of diagnostics the driver needs in order to refuse lowering;
//! anything subtler is assumed to have been checked upstream.

use colored::Colorize;

use crate::{
    frontend::{
        SourceFile,
        ast::{
            Assign, Block, BlockItem, CompUnit, Decl, Expr, ExprKind, FunctionDefinition,
            Initializer, LValue, ReturnKind, Statement, StatementKind,
        },
        intern::InternedSymbol,
        lexer::Span,
    },
    middle::scope::{ScopeId, ScopeTree, Symbol, SymbolKind},
};

#[derive(Debug)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn render(&self, source: &SourceFile) {
        eprintln!(
            "{} {} ({}:{}:{})",
            "error:".red().bold(),
            self.message,
            source.origin,
            source.row_for_position(self.span.start),
            source.column_for_position(self.span.start),
        );
        source.highlight_span(self.span);
    }
}

/// Walks the AST and builds the scope tree, recording a symbol for every
/// declaration and a frame for every block
#[derive(Debug)]
pub struct ScopeBuilder<'ast> {
    unit: &'ast CompUnit,
    tree: ScopeTree,
    stack: Vec<ScopeId>,
    loop_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'ast> ScopeBuilder<'ast> {
    pub fn build_scopes(unit: &'ast CompUnit) -> (ScopeTree, Vec<Diagnostic>) {
        let mut tree = ScopeTree::new();
        let root = tree.root();

        let mut builder = Self {
            unit,
            tree,
            stack: vec![root],
            loop_depth: 0,
            diagnostics: Vec::new(),
        };

        builder.seed_intrinsics();

        let unit = builder.unit;

        for decl in &unit.decls {
            builder.visit_decl(decl);
        }

        for function in &unit.functions {
            builder.visit_function(function);
        }

        builder.visit_function(&unit.entry);

        (builder.tree, builder.diagnostics)
    }

    /// The three fixed library intrinsics every program can reach
    fn seed_intrinsics(&mut self) {
        let root = self.tree.root();

        let getint = Symbol::new(
            InternedSymbol::new("getint"),
            SymbolKind::Function {
                return_kind: ReturnKind::Int,
                params: Vec::new(),
            },
        );
        self.tree.declare(root, getint);

        for name in ["putint", "putch"] {
            let param = self.tree.add_detached_symbol(Symbol::new(
                InternedSymbol::new("a"),
                SymbolKind::Param { rank: 0 },
            ));

            let function = Symbol::new(
                InternedSymbol::new(name),
                SymbolKind::Function {
                    return_kind: ReturnKind::Void,
                    params: vec![param],
                },
            );
            self.tree.declare(root, function);
        }
    }

    fn current(&self) -> ScopeId {
        *self.stack.last().expect("scope stack is never empty")
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            message: message.into(),
            span,
        });
    }

    fn check_redeclaration(&mut self, name: InternedSymbol, span: Span) {
        if self.tree.lookup_local(self.current(), name).is_some() {
            self.error(span, format!("`{name}` is already declared in this scope"));
        }
    }

    fn visit_decl(&mut self, decl: &Decl) {
        for dim in &decl.dims {
            self.visit_expr(dim);
        }

        if let Some(init) = &decl.init {
            self.visit_initializer(init);
        }

        // The name only becomes visible after its own initializer, so
        // `int a = a + 1;` reads the outer `a`
        self.check_redeclaration(decl.name.symbol, decl.name.span);

        self.tree.declare(
            self.current(),
            Symbol::new(
                decl.name.symbol,
                SymbolKind::Value {
                    is_const: decl.is_const,
                    rank: decl.dims.len(),
                    inner_extent: None,
                },
            ),
        );
    }

    fn visit_initializer(&mut self, init: &Initializer) {
        match init {
            Initializer::Scalar(expr) => self.visit_expr(expr),
            Initializer::List(items) => {
                for item in items {
                    self.visit_initializer(item);
                }
            }
        }
    }

    fn visit_function(&mut self, function: &'ast FunctionDefinition) {
        self.check_redeclaration(function.name.symbol, function.name.span);

        // Rank-two parameters carry a constant inner extent that is resolved
        // in the enclosing scope
        for param in &function.params {
            if let Some(inner_len) = &param.inner_len {
                self.visit_expr(inner_len);
            }
        }

        let mut params = Vec::new();
        let frame = self.tree.new_scope(self.current());

        for param in &function.params {
            if self.tree.lookup_local(frame, param.name.symbol).is_some() {
                self.error(
                    param.name.span,
                    format!("parameter `{}` is declared twice", param.name.symbol),
                );
            }

            params.push(self.tree.declare(
                frame,
                Symbol::new(param.name.symbol, SymbolKind::Param { rank: param.rank }),
            ));
        }

        self.tree.declare(
            self.tree.root(),
            Symbol::new(
                function.name.symbol,
                SymbolKind::Function {
                    return_kind: function.return_kind,
                    params,
                },
            ),
        );

        // The function body shares the parameter frame; only nested blocks
        // open further frames
        self.stack.push(frame);

        for item in &function.body.items {
            self.visit_block_item(item);
        }

        self.stack.pop();
    }

    fn visit_block(&mut self, block: &Block) {
        let frame = self.tree.new_scope(self.current());
        self.stack.push(frame);

        for item in &block.items {
            self.visit_block_item(item);
        }

        self.stack.pop();
    }

    fn visit_block_item(&mut self, item: &BlockItem) {
        match item {
            BlockItem::Decl(decl) => self.visit_decl(decl),
            BlockItem::Stmt(stmt) => self.visit_statement(stmt),
        }
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        match &stmt.kind {
            StatementKind::Assign(assign) => self.visit_assign(assign),
            StatementKind::Expr(expr) => {
                if let Some(expr) = expr {
                    self.visit_expr(expr);
                }
            }
            StatementKind::Block(block) => self.visit_block(block),
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(condition);
                self.visit_statement(then_branch);

                if let Some(else_branch) = else_branch {
                    self.visit_statement(else_branch);
                }
            }
            StatementKind::For {
                init,
                condition,
                step,
                body,
            } => {
                if let Some(init) = init {
                    self.visit_assign(init);
                }
                if let Some(condition) = condition {
                    self.visit_expr(condition);
                }
                if let Some(step) = step {
                    self.visit_assign(step);
                }

                self.loop_depth += 1;
                self.visit_statement(body);
                self.loop_depth -= 1;
            }
            StatementKind::Break | StatementKind::Continue => {
                if self.loop_depth == 0 {
                    let name = if matches!(stmt.kind, StatementKind::Break) {
                        "break"
                    } else {
                        "continue"
                    };
                    self.error(stmt.span, format!("`{name}` outside of a loop"));
                }
            }
            StatementKind::Return(value) => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
            }
            StatementKind::Printf {
                format,
                format_span,
                args,
            } => {
                let placeholders = format.value().matches("%d").count();

                if placeholders != args.len() {
                    self.error(
                        *format_span,
                        format!(
                            "format string expects {placeholders} argument(s) but {} were passed",
                            args.len()
                        ),
                    );
                }

                for arg in args {
                    self.visit_expr(arg);
                }
            }
        }
    }

    fn visit_assign(&mut self, assign: &Assign) {
        self.visit_expr(&assign.value);
        self.visit_lvalue(&assign.target);
    }

    fn visit_lvalue(&mut self, lvalue: &LValue) {
        if self
            .tree
            .lookup(self.current(), lvalue.name.symbol)
            .is_none()
        {
            self.error(
                lvalue.name.span,
                format!("`{}` is not declared", lvalue.name.symbol),
            );
        }

        for index in &lvalue.indices {
            self.visit_expr(index);
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::LValue(lvalue) => self.visit_lvalue(lvalue),
            ExprKind::Call { callee, args } => {
                match self.tree.lookup(self.current(), callee.symbol) {
                    None => self.error(
                        callee.span,
                        format!("`{}` is not declared", callee.symbol),
                    ),
                    Some(symbol) => {
                        if !matches!(
                            self.tree.symbol(symbol).kind,
                            SymbolKind::Function { .. }
                        ) {
                            self.error(
                                callee.span,
                                format!("`{}` is not a function", callee.symbol),
                            );
                        }
                    }
                }

                for arg in args {
                    self.visit_expr(arg);
                }
            }
            ExprKind::Unary { operand, .. } => self.visit_expr(operand),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{SourceFileOrigin, parser::Parser};

    fn build(source: &str) -> (ScopeTree, Vec<Diagnostic>) {
        let source = SourceFile {
            contents: source.to_owned(),
            origin: SourceFileOrigin::Memory,
        };
        let unit = Parser::parse_unit(&source);

        // The unit borrows the source, so resolve before returning
        ScopeBuilder::build_scopes(&unit)
    }

    #[test]
    fn one_frame_per_block_in_program_order() {
        let (tree, diagnostics) = build(
            "int f() { { } return 0; }\n\
             int main() { { { } } return 0; }",
        );

        assert!(diagnostics.is_empty());

        // Root has one frame per function; f's frame has its nested block,
        // main's frame has one nested block with one nested block inside
        let root = tree.scope(tree.root());
        assert_eq!(root.children.len(), 2);

        let f_frame = tree.scope(root.children[0]);
        assert_eq!(f_frame.children.len(), 1);

        let main_frame = tree.scope(root.children[1]);
        assert_eq!(main_frame.children.len(), 1);
        assert_eq!(tree.scope(main_frame.children[0]).children.len(), 1);
    }

    #[test]
    fn intrinsics_are_visible_everywhere() {
        let (_, diagnostics) = build("int main() { putint(getint()); return 0; }");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn undeclared_and_misplaced_jumps_are_reported() {
        let (_, diagnostics) = build("int main() { x = 1; break; return 0; }");

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].message.contains("not declared"));
        assert!(diagnostics[1].message.contains("outside of a loop"));
    }

    #[test]
    fn shadowing_initializer_reads_the_outer_name() {
        let (_, diagnostics) = build("int a = 1;\nint main() { int a = a + 1; return a; }");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn printf_argument_count_is_checked() {
        let (_, diagnostics) =
            build("int main() { printf(\"%d %d\\n\", 1); return 0; }");

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("expects 2"));
    }
}
