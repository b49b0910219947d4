use crate::frontend::{
    SourceFile,
    ast::{
        Assign, BinaryOp, Block, BlockItem, CompUnit, Decl, Expr, ExprKind, FunctionDefinition,
        Identifier, Initializer, LValue, NodeId, Param, ReturnKind, Statement, StatementKind,
        UnaryOp,
    },
    intern::InternedSymbol,
    lexer::{Keyword, Lexer, Span, Token, TokenKind},
};

#[derive(Debug)]
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    next_node_id: u32,
}

impl<'source> Parser<'source> {
    pub fn parse_unit(source_file: &'source SourceFile) -> CompUnit {
        let mut parser = Self {
            lexer: Lexer::new(source_file),
            next_node_id: 0,
        };

        parser.parse_comp_unit()
    }

    fn create_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn report_fatal_error(&self, offending_span: Span, message: &str) -> ! {
        eprintln!(
            "{} ({}:{}:{})",
            message,
            self.lexer.source().origin,
            self.lexer.source().row_for_position(offending_span.start),
            self.lexer
                .source()
                .column_for_position(offending_span.start)
        );
        self.lexer.source().highlight_span(offending_span);
        std::process::exit(1);
    }

    fn end_of_file_span(&self) -> Span {
        let end = self.lexer.source().contents.len();
        Span::new(end.saturating_sub(1), end)
    }

    fn expect_peek(&mut self, expecting: &str) -> Token {
        let Some(token) = self.lexer.peek() else {
            self.report_fatal_error(
                self.end_of_file_span(),
                &format!("Expected {expecting} but reached end of file"),
            )
        };

        token
    }

    fn expect_next(&mut self, expecting: &str) -> Token {
        let Some(token) = self.lexer.next() else {
            self.report_fatal_error(
                self.end_of_file_span(),
                &format!("Expected {expecting} but reached end of file"),
            )
        };

        token
    }

    fn expect_next_to_be(&mut self, kind: TokenKind) -> Token {
        let token = self.expect_next(&format!("{kind:?}"));

        if token.kind != kind {
            self.report_fatal_error(
                token.span,
                &format!("Expected {kind:?} but found {:?}", token.kind),
            )
        }

        token
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Token {
        self.expect_next_to_be(TokenKind::Keyword(keyword))
    }

    fn peek_is(&mut self, kind: TokenKind) -> bool {
        self.lexer.peek().is_some_and(|t| t.kind == kind)
    }

    fn eat_if(&mut self, kind: TokenKind) -> Option<Token> {
        self.peek_is(kind).then(|| self.expect_next_to_be(kind))
    }

    /* Top level */

    fn parse_comp_unit(&mut self) -> CompUnit {
        let mut decls = Vec::new();
        let mut functions = Vec::new();
        let mut entry = None;

        while !self.lexer.is_eof() && self.lexer.peek().is_some() {
            let token = self.expect_peek("declaration or function definition");

            match token.kind {
                TokenKind::Keyword(Keyword::Const) => {
                    if !functions.is_empty() || entry.is_some() {
                        self.report_fatal_error(
                            token.span,
                            "Global declarations must come before function definitions",
                        )
                    }

                    decls.extend(self.parse_decl());
                }
                TokenKind::Keyword(Keyword::Int) if !self.looks_like_function() => {
                    if !functions.is_empty() || entry.is_some() {
                        self.report_fatal_error(
                            token.span,
                            "Global declarations must come before function definitions",
                        )
                    }

                    decls.extend(self.parse_decl());
                }
                TokenKind::Keyword(Keyword::Int) | TokenKind::Keyword(Keyword::Void) => {
                    if entry.is_some() {
                        self.report_fatal_error(
                            token.span,
                            "The entry function must be the last definition",
                        )
                    }

                    let function = self.parse_function_definition();

                    if function.name.symbol.value() == "main" {
                        entry = Some(function);
                    } else {
                        functions.push(function);
                    }
                }
                _ => self.report_fatal_error(
                    token.span,
                    &format!(
                        "Expected declaration or function definition but found {:?}",
                        token.kind
                    ),
                ),
            }
        }

        let Some(entry) = entry else {
            self.report_fatal_error(
                self.end_of_file_span(),
                "Missing entry function `int main()`",
            )
        };

        CompUnit {
            decls,
            functions,
            entry,
        }
    }

    /// Distinguishes `int name(` (a function) from `int name...` (a
    /// declaration) without consuming anything
    fn looks_like_function(&mut self) -> bool {
        self.lexer
            .peek_nth(1)
            .is_some_and(|t| t.kind == TokenKind::Identifier)
            && self
                .lexer
                .peek_nth(2)
                .is_some_and(|t| t.kind == TokenKind::OpenParen)
    }

    /* Declarations */

    /// One `[const] int a = .., b[2] = {..};` line, flattened to a `Decl`
    /// per defined name
    fn parse_decl(&mut self) -> Vec<Decl> {
        let is_const = self.eat_if(TokenKind::Keyword(Keyword::Const)).is_some();
        let int_keyword = self.expect_keyword(Keyword::Int);

        let mut decls = Vec::new();

        loop {
            let name = self.parse_identifier();

            let mut dims = Vec::new();
            while self.peek_is(TokenKind::OpenBracket) {
                self.expect_next_to_be(TokenKind::OpenBracket);
                let extent = self.parse_expression();
                let close = self.expect_next_to_be(TokenKind::CloseBracket);

                if dims.len() == 2 {
                    self.report_fatal_error(
                        close.span,
                        "Arrays of rank greater than two are not supported",
                    )
                }

                dims.push(extent);
            }

            let init = self
                .eat_if(TokenKind::Equals)
                .map(|_| self.parse_initializer());

            if is_const && init.is_none() {
                self.report_fatal_error(name.span, "A `const` declaration requires an initializer")
            }

            let span = Span::new(int_keyword.span.start, name.span.end);

            decls.push(Decl {
                id: self.create_node_id(),
                span,
                is_const,
                name,
                dims,
                init,
            });

            if self.eat_if(TokenKind::Comma).is_none() {
                break;
            }
        }

        self.expect_next_to_be(TokenKind::Semicolon);

        decls
    }

    fn parse_initializer(&mut self) -> Initializer {
        if self.peek_is(TokenKind::OpenBrace) {
            self.expect_next_to_be(TokenKind::OpenBrace);

            let mut items = Vec::new();

            if !self.peek_is(TokenKind::CloseBrace) {
                loop {
                    items.push(self.parse_initializer());

                    if self.eat_if(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }

            self.expect_next_to_be(TokenKind::CloseBrace);

            Initializer::List(items)
        } else {
            Initializer::Scalar(self.parse_expression())
        }
    }

    /* Functions */

    fn parse_function_definition(&mut self) -> FunctionDefinition {
        let return_token = self.expect_next("return type");
        let return_kind = match return_token.kind {
            TokenKind::Keyword(Keyword::Int) => ReturnKind::Int,
            TokenKind::Keyword(Keyword::Void) => ReturnKind::Void,
            _ => self.report_fatal_error(
                return_token.span,
                &format!("Expected `int` or `void` but found {:?}", return_token.kind),
            ),
        };

        let name = self.parse_identifier();

        self.expect_next_to_be(TokenKind::OpenParen);

        let mut params = Vec::new();

        if !self.peek_is(TokenKind::CloseParen) {
            loop {
                params.push(self.parse_param());

                if self.eat_if(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }

        self.expect_next_to_be(TokenKind::CloseParen);

        let body = self.parse_block();

        FunctionDefinition {
            id: self.create_node_id(),
            span: Span::new(return_token.span.start, body.span.end),
            return_kind,
            name,
            params,
            body,
        }
    }

    fn parse_param(&mut self) -> Param {
        let int_keyword = self.expect_keyword(Keyword::Int);
        let name = self.parse_identifier();

        let mut rank = 0;
        let mut inner_len = None;
        let mut end = name.span.end;

        if self.peek_is(TokenKind::OpenBracket) {
            self.expect_next_to_be(TokenKind::OpenBracket);
            let close = self.expect_next_to_be(TokenKind::CloseBracket);
            rank = 1;
            end = close.span.end;

            if self.peek_is(TokenKind::OpenBracket) {
                self.expect_next_to_be(TokenKind::OpenBracket);
                inner_len = Some(self.parse_expression());
                let close = self.expect_next_to_be(TokenKind::CloseBracket);
                rank = 2;
                end = close.span.end;
            }
        }

        Param {
            id: self.create_node_id(),
            span: Span::new(int_keyword.span.start, end),
            name,
            rank,
            inner_len,
        }
    }

    /* Statements */

    fn parse_block(&mut self) -> Block {
        let open = self.expect_next_to_be(TokenKind::OpenBrace);

        let mut items = Vec::new();

        while !self.peek_is(TokenKind::CloseBrace) {
            let token = self.expect_peek("statement, declaration, or closing brace");

            match token.kind {
                TokenKind::Keyword(Keyword::Const) | TokenKind::Keyword(Keyword::Int) => {
                    items.extend(self.parse_decl().into_iter().map(BlockItem::Decl));
                }
                _ => items.push(BlockItem::Stmt(self.parse_statement())),
            }
        }

        let close = self.expect_next_to_be(TokenKind::CloseBrace);

        Block {
            id: self.create_node_id(),
            span: Span::new(open.span.start, close.span.end),
            items,
        }
    }

    fn parse_statement(&mut self) -> Statement {
        let token = self.expect_peek("statement");

        match token.kind {
            TokenKind::OpenBrace => {
                let block = self.parse_block();

                Statement {
                    id: self.create_node_id(),
                    span: block.span,
                    kind: StatementKind::Block(block),
                }
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::For) => self.parse_for_statement(),
            TokenKind::Keyword(Keyword::Break) => {
                let keyword = self.expect_keyword(Keyword::Break);
                self.expect_next_to_be(TokenKind::Semicolon);

                Statement {
                    id: self.create_node_id(),
                    span: keyword.span,
                    kind: StatementKind::Break,
                }
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let keyword = self.expect_keyword(Keyword::Continue);
                self.expect_next_to_be(TokenKind::Semicolon);

                Statement {
                    id: self.create_node_id(),
                    span: keyword.span,
                    kind: StatementKind::Continue,
                }
            }
            TokenKind::Keyword(Keyword::Return) => {
                let keyword = self.expect_keyword(Keyword::Return);

                let value = (!self.peek_is(TokenKind::Semicolon)).then(|| self.parse_expression());

                let end = self.expect_next_to_be(TokenKind::Semicolon);

                Statement {
                    id: self.create_node_id(),
                    span: Span::new(keyword.span.start, end.span.end),
                    kind: StatementKind::Return(value),
                }
            }
            TokenKind::Keyword(Keyword::Printf) => self.parse_printf_statement(),
            TokenKind::Semicolon => {
                let token = self.expect_next_to_be(TokenKind::Semicolon);

                Statement {
                    id: self.create_node_id(),
                    span: token.span,
                    kind: StatementKind::Expr(None),
                }
            }
            _ => {
                // Either an assignment or a bare expression; parse an
                // expression first and promote it to an assignment target if
                // an `=` follows
                let expression = self.parse_expression();

                if self.peek_is(TokenKind::Equals) {
                    let ExprKind::LValue(target) = expression.kind else {
                        self.report_fatal_error(
                            expression.span,
                            "Only variables and array elements can be assigned to",
                        )
                    };

                    self.expect_next_to_be(TokenKind::Equals);
                    let value = self.parse_expression();
                    let end = self.expect_next_to_be(TokenKind::Semicolon);
                    let span = Span::new(expression.span.start, end.span.end);

                    return Statement {
                        id: self.create_node_id(),
                        span,
                        kind: StatementKind::Assign(Assign {
                            id: self.create_node_id(),
                            span,
                            target,
                            value,
                        }),
                    };
                }

                let end = self.expect_next_to_be(TokenKind::Semicolon);

                Statement {
                    id: self.create_node_id(),
                    span: Span::new(expression.span.start, end.span.end),
                    kind: StatementKind::Expr(Some(expression)),
                }
            }
        }
    }

    fn parse_if_statement(&mut self) -> Statement {
        let keyword = self.expect_keyword(Keyword::If);

        self.expect_next_to_be(TokenKind::OpenParen);
        let condition = self.parse_expression();
        self.expect_next_to_be(TokenKind::CloseParen);

        let then_branch = Box::new(self.parse_statement());

        let else_branch = self
            .eat_if(TokenKind::Keyword(Keyword::Else))
            .map(|_| Box::new(self.parse_statement()));

        let end = else_branch
            .as_deref()
            .map(|s| s.span.end)
            .unwrap_or(then_branch.span.end);

        Statement {
            id: self.create_node_id(),
            span: Span::new(keyword.span.start, end),
            kind: StatementKind::If {
                condition,
                then_branch,
                else_branch,
            },
        }
    }

    fn parse_for_statement(&mut self) -> Statement {
        let keyword = self.expect_keyword(Keyword::For);

        self.expect_next_to_be(TokenKind::OpenParen);

        let init = (!self.peek_is(TokenKind::Semicolon)).then(|| self.parse_for_assign());
        self.expect_next_to_be(TokenKind::Semicolon);

        let condition = (!self.peek_is(TokenKind::Semicolon)).then(|| self.parse_expression());
        self.expect_next_to_be(TokenKind::Semicolon);

        let step = (!self.peek_is(TokenKind::CloseParen)).then(|| self.parse_for_assign());
        self.expect_next_to_be(TokenKind::CloseParen);

        let body = Box::new(self.parse_statement());

        Statement {
            id: self.create_node_id(),
            span: Span::new(keyword.span.start, body.span.end),
            kind: StatementKind::For {
                init,
                condition,
                step,
                body,
            },
        }
    }

    fn parse_for_assign(&mut self) -> Assign {
        let target = self.parse_lvalue();
        self.expect_next_to_be(TokenKind::Equals);
        let value = self.parse_expression();

        Assign {
            id: self.create_node_id(),
            span: Span::new(target.span.start, value.span.end),
            target,
            value,
        }
    }

    fn parse_printf_statement(&mut self) -> Statement {
        let keyword = self.expect_keyword(Keyword::Printf);

        self.expect_next_to_be(TokenKind::OpenParen);

        let format_token = self.expect_next_to_be(TokenKind::StringLiteral);
        let quoted = self
            .lexer
            .source()
            .value_of_span(format_token.span)
            .to_owned();
        let format = InternedSymbol::new(&quoted[1..quoted.len() - 1]);

        let mut args = Vec::new();
        while self.eat_if(TokenKind::Comma).is_some() {
            args.push(self.parse_expression());
        }

        self.expect_next_to_be(TokenKind::CloseParen);
        let end = self.expect_next_to_be(TokenKind::Semicolon);

        Statement {
            id: self.create_node_id(),
            span: Span::new(keyword.span.start, end.span.end),
            kind: StatementKind::Printf {
                format,
                format_span: format_token.span,
                args,
            },
        }
    }

    /* Expressions */

    fn parse_expression(&mut self) -> Expr {
        self.parse_logical_or_expression()
    }

    fn parse_logical_or_expression(&mut self) -> Expr {
        let mut expression = self.parse_logical_and_expression();

        while self.peek_is(TokenKind::LogicalOr) {
            self.expect_next_to_be(TokenKind::LogicalOr);
            let rhs = self.parse_logical_and_expression();

            expression = self.new_binary(BinaryOp::Or, expression, rhs);
        }

        expression
    }

    fn parse_logical_and_expression(&mut self) -> Expr {
        let mut expression = self.parse_equality_expression();

        while self.peek_is(TokenKind::LogicalAnd) {
            self.expect_next_to_be(TokenKind::LogicalAnd);
            let rhs = self.parse_equality_expression();

            expression = self.new_binary(BinaryOp::And, expression, rhs);
        }

        expression
    }

    fn parse_equality_expression(&mut self) -> Expr {
        let mut expression = self.parse_relational_expression();

        while self
            .lexer
            .peek()
            .is_some_and(|t| t.kind.is_equality_operator())
        {
            let op = match self.expect_next("equality operator").kind {
                TokenKind::DoubleEquals => BinaryOp::Eq,
                TokenKind::NotEquals => BinaryOp::Ne,
                _ => unreachable!(),
            };
            let rhs = self.parse_relational_expression();

            expression = self.new_binary(op, expression, rhs);
        }

        expression
    }

    fn parse_relational_expression(&mut self) -> Expr {
        let mut expression = self.parse_additive_expression();

        while self
            .lexer
            .peek()
            .is_some_and(|t| t.kind.is_relational_operator())
        {
            let op = match self.expect_next("relational operator").kind {
                TokenKind::LessThan => BinaryOp::Lt,
                TokenKind::LessThanOrEqualTo => BinaryOp::Le,
                TokenKind::GreaterThan => BinaryOp::Gt,
                TokenKind::GreaterThanOrEqualTo => BinaryOp::Ge,
                _ => unreachable!(),
            };
            let rhs = self.parse_additive_expression();

            expression = self.new_binary(op, expression, rhs);
        }

        expression
    }

    fn parse_additive_expression(&mut self) -> Expr {
        let mut expression = self.parse_multiplicative_expression();

        while self.lexer.peek().is_some_and(|t| t.kind.is_term_operator()) {
            let op = match self.expect_next("term operator").kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => unreachable!(),
            };
            let rhs = self.parse_multiplicative_expression();

            expression = self.new_binary(op, expression, rhs);
        }

        expression
    }

    fn parse_multiplicative_expression(&mut self) -> Expr {
        let mut expression = self.parse_unary_expression();

        while self
            .lexer
            .peek()
            .is_some_and(|t| t.kind.is_factor_operator())
        {
            let op = match self.expect_next("factor operator").kind {
                TokenKind::Asterisk => BinaryOp::Mul,
                TokenKind::Divide => BinaryOp::Div,
                TokenKind::Modulus => BinaryOp::Rem,
                _ => unreachable!(),
            };
            let rhs = self.parse_unary_expression();

            expression = self.new_binary(op, expression, rhs);
        }

        expression
    }

    fn parse_unary_expression(&mut self) -> Expr {
        let token = self.expect_peek("expression");

        if !token.kind.is_unary_operator() {
            return self.parse_primary_expression();
        }

        let op = match self.expect_next("unary operator").kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => unreachable!(),
        };

        let operand = self.parse_unary_expression();

        Expr {
            id: self.create_node_id(),
            span: Span::new(token.span.start, operand.span.end),
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        }
    }

    fn parse_primary_expression(&mut self) -> Expr {
        let token = self.expect_peek("expression");

        match token.kind {
            TokenKind::OpenParen => {
                self.expect_next_to_be(TokenKind::OpenParen);
                let inner = self.parse_expression();
                self.expect_next_to_be(TokenKind::CloseParen);

                inner
            }
            TokenKind::IntegerLiteral => {
                let token = self.expect_next_to_be(TokenKind::IntegerLiteral);
                let text = self.lexer.source().value_of_span(token.span);

                let Ok(value) = text.parse::<i32>() else {
                    self.report_fatal_error(
                        token.span,
                        &format!("Integer literal `{text}` does not fit in 32 bits"),
                    )
                };

                Expr {
                    id: self.create_node_id(),
                    span: token.span,
                    kind: ExprKind::Literal(value),
                }
            }
            TokenKind::Identifier => {
                // A call if an open paren follows, an lvalue read otherwise
                if self
                    .lexer
                    .peek_nth(1)
                    .is_some_and(|t| t.kind == TokenKind::OpenParen)
                {
                    return self.parse_call_expression();
                }

                let lvalue = self.parse_lvalue();

                Expr {
                    id: self.create_node_id(),
                    span: lvalue.span,
                    kind: ExprKind::LValue(lvalue),
                }
            }
            _ => self.report_fatal_error(
                token.span,
                &format!("Expected expression but found {:?}", token.kind),
            ),
        }
    }

    fn parse_call_expression(&mut self) -> Expr {
        let callee = self.parse_identifier();

        self.expect_next_to_be(TokenKind::OpenParen);

        let mut args = Vec::new();

        if !self.peek_is(TokenKind::CloseParen) {
            loop {
                args.push(self.parse_expression());

                if self.eat_if(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }

        let close = self.expect_next_to_be(TokenKind::CloseParen);

        Expr {
            id: self.create_node_id(),
            span: Span::new(callee.span.start, close.span.end),
            kind: ExprKind::Call { callee, args },
        }
    }

    fn parse_lvalue(&mut self) -> LValue {
        let name = self.parse_identifier();

        let mut indices = Vec::new();
        let mut end = name.span.end;

        while self.peek_is(TokenKind::OpenBracket) {
            self.expect_next_to_be(TokenKind::OpenBracket);
            let index = self.parse_expression();
            let close = self.expect_next_to_be(TokenKind::CloseBracket);

            if indices.len() == 2 {
                self.report_fatal_error(
                    close.span,
                    "Arrays of rank greater than two are not supported",
                )
            }

            end = close.span.end;
            indices.push(index);
        }

        LValue {
            id: self.create_node_id(),
            span: Span::new(name.span.start, end),
            name,
            indices,
        }
    }

    fn parse_identifier(&mut self) -> Identifier {
        let token = self.expect_next_to_be(TokenKind::Identifier);

        Identifier {
            id: self.create_node_id(),
            span: token.span,
            symbol: InternedSymbol::new(self.lexer.source().value_of_span(token.span)),
        }
    }

    fn new_binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr {
            id: self.create_node_id(),
            span: Span::new(lhs.span.start, rhs.span.end),
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::SourceFileOrigin;

    fn parse(source: &str) -> CompUnit {
        let source = SourceFile {
            contents: source.to_owned(),
            origin: SourceFileOrigin::Memory,
        };

        Parser::parse_unit(&source)
    }

    #[test]
    fn globals_functions_and_entry_are_separated() {
        let unit = parse(
            "const int n = 4;\n\
             int table[2][3];\n\
             int helper(int x) { return x; }\n\
             int main() { return helper(n); }",
        );

        assert_eq!(unit.decls.len(), 2);
        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.entry.name.symbol.value(), "main");
        assert_eq!(unit.decls[1].dims.len(), 2);
    }

    #[test]
    fn comma_separated_defs_flatten() {
        let unit = parse("int a = 1, b, c[2] = {1, 2};\nint main() { return 0; }");

        assert_eq!(unit.decls.len(), 3);
        assert!(unit.decls[1].init.is_none());
        assert!(matches!(
            unit.decls[2].init,
            Some(Initializer::List(ref items)) if items.len() == 2
        ));
    }

    #[test]
    fn assignment_is_distinguished_from_expression_statement() {
        let unit = parse("int main() { int a; a = 1; a; return a; }");

        let kinds: Vec<_> = unit
            .entry
            .body
            .items
            .iter()
            .map(|item| match item {
                BlockItem::Decl(_) => "decl",
                BlockItem::Stmt(s) => match s.kind {
                    StatementKind::Assign(_) => "assign",
                    StatementKind::Expr(_) => "expr",
                    StatementKind::Return(_) => "return",
                    _ => "other",
                },
            })
            .collect();

        assert_eq!(kinds, vec!["decl", "assign", "expr", "return"]);
    }

    #[test]
    fn precedence_nests_or_above_and() {
        let unit = parse("int main() { if (1 || 2 && 3) return 1; return 0; }");

        let BlockItem::Stmt(stmt) = &unit.entry.body.items[0] else {
            panic!("expected statement");
        };
        let StatementKind::If { condition, .. } = &stmt.kind else {
            panic!("expected if");
        };
        let ExprKind::Binary { op, rhs, .. } = &condition.kind else {
            panic!("expected binary condition");
        };

        assert_eq!(*op, BinaryOp::Or);
        assert!(matches!(
            rhs.kind,
            ExprKind::Binary {
                op: BinaryOp::And,
                ..
            }
        ));
    }

    #[test]
    fn for_clauses_may_all_be_absent() {
        let unit = parse("int main() { for (;;) break; return 0; }");

        let BlockItem::Stmt(stmt) = &unit.entry.body.items[0] else {
            panic!("expected statement");
        };
        let StatementKind::For {
            init,
            condition,
            step,
            ..
        } = &stmt.kind
        else {
            panic!("expected for");
        };

        assert!(init.is_none() && condition.is_none() && step.is_none());
    }
}
