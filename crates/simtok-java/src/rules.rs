//! Java token emission rules.
//!
//! Most constructs emit a marker before their children and, for block-like
//! constructs, a closing marker at their end. A handful (methods,
//! constructors, `if`, `try`, `new`) walk selected children themselves so
//! their tokens follow a fixed order, and they skip the rest.
//!
//! Matches are exhaustive with no wildcard arms: adding a node kind forces
//! a decision about its tokens.

use simtok_core::position::{end_of, resolve_start, start_of, Position};
use simtok_core::token::TokenKind;
use simtok_core::walk::{Dispatch, DispatchRules, WalkError, Walker};

use crate::ast::{Declaration, Directive, Expression, Node, NodeKind, Statement};

type JavaWalker<'a> = Walker<'a, JavaRules>;

/// Dispatch rules for Java syntax trees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JavaRules;

impl DispatchRules for JavaRules {
    type Node = Node;

    fn before_dispatch(&self, walker: &mut JavaWalker<'_>, node: &Node) -> Result<Dispatch, WalkError> {
        let pos = start_of(node, None);
        match &node.kind {
            NodeKind::CompilationUnit { .. } => {}
            NodeKind::Package { .. } => walker.emit_text(TokenKind::Package, pos, "package"),
            NodeKind::Import { .. } => walker.emit_text(TokenKind::Import, pos, "import"),
            NodeKind::Module { .. } => walker.emit_text(TokenKind::ModuleBegin, pos, "module"),
            NodeKind::Directive(directive) => before_directive(walker, directive, pos),
            NodeKind::Declaration(decl) => return before_declaration(walker, node, decl, pos),
            NodeKind::Statement(stmt) => return before_statement(walker, node, stmt, pos),
            NodeKind::Expression(expr) => return before_expression(walker, expr, pos),
            NodeKind::CatchClause { .. } => walker.emit_text(TokenKind::CatchBegin, pos, "catch"),
            NodeKind::SwitchEntry { .. } => walker.emit_text(TokenKind::Case, pos, "case"),
            NodeKind::VariableDeclarator { name, .. } => {
                walker.emit_text(TokenKind::VarDef, pos, name)
            }
            NodeKind::Parameter { .. }
            | NodeKind::ArrayCreationLevel { .. }
            | NodeKind::Type { .. }
            | NodeKind::MemberValuePair { .. } => {}
        }
        Ok(Dispatch::UseDefault)
    }

    fn after_dispatch(&self, walker: &mut JavaWalker<'_>, node: &Node) {
        if let Some(kind) = closing_token(node) {
            walker.emit_end(kind, node);
        }
    }
}

/// END-class token emitted after the children of a default-walked node.
fn closing_token(node: &Node) -> Option<TokenKind> {
    match &node.kind {
        NodeKind::Module { .. } => Some(TokenKind::ModuleEnd),
        NodeKind::CatchClause { .. } => Some(TokenKind::CatchEnd),
        NodeKind::Declaration(decl) => match decl {
            Declaration::Class { interface, .. } => Some(if *interface {
                TokenKind::InterfaceEnd
            } else {
                TokenKind::ClassEnd
            }),
            Declaration::Enum { .. } => Some(TokenKind::EnumEnd),
            Declaration::AnnotationType { .. } => Some(TokenKind::AnnoTypeEnd),
            Declaration::AnnotationMember { .. } => Some(TokenKind::MethodEnd),
            Declaration::EnumConstant { .. } => Some(TokenKind::EnumConstant),
            Declaration::Method { .. }
            | Declaration::Constructor { .. }
            | Declaration::Field { .. }
            | Declaration::Initializer { .. } => None,
        },
        NodeKind::Statement(stmt) => match stmt {
            Statement::While { .. } => Some(TokenKind::WhileEnd),
            Statement::Do { .. } => Some(TokenKind::DoEnd),
            Statement::For { .. } | Statement::ForEach { .. } => Some(TokenKind::ForEnd),
            Statement::Switch { .. } => Some(TokenKind::SwitchEnd),
            Statement::Synchronized { .. } => Some(TokenKind::SyncEnd),
            Statement::Block { .. }
            | Statement::Expression { .. }
            | Statement::LocalClass { .. }
            | Statement::Labeled { .. }
            | Statement::If { .. }
            | Statement::Try { .. }
            | Statement::Break { .. }
            | Statement::Continue { .. }
            | Statement::Return { .. }
            | Statement::Throw { .. }
            | Statement::Yield { .. }
            | Statement::Assert { .. }
            | Statement::ExplicitConstructorInvocation { .. }
            | Statement::Empty => None,
        },
        NodeKind::Expression(expr) => match expr {
            Expression::Switch { .. } => Some(TokenKind::SwitchEnd),
            Expression::Name { .. }
            | Expression::Literal { .. }
            | Expression::This { .. }
            | Expression::Super { .. }
            | Expression::FieldAccess { .. }
            | Expression::ArrayAccess { .. }
            | Expression::MethodCall { .. }
            | Expression::MethodReference { .. }
            | Expression::ObjectCreation { .. }
            | Expression::ArrayCreation { .. }
            | Expression::ArrayInitializer { .. }
            | Expression::Assign { .. }
            | Expression::Binary { .. }
            | Expression::Unary { .. }
            | Expression::Conditional { .. }
            | Expression::Lambda { .. }
            | Expression::Cast { .. }
            | Expression::InstanceOf { .. }
            | Expression::ClassLiteral { .. }
            | Expression::Enclosed { .. }
            | Expression::Annotation { .. }
            | Expression::VariableDeclaration { .. } => None,
        },
        NodeKind::CompilationUnit { .. }
        | NodeKind::Package { .. }
        | NodeKind::Import { .. }
        | NodeKind::Directive(_)
        | NodeKind::SwitchEntry { .. }
        | NodeKind::VariableDeclarator { .. }
        | NodeKind::Parameter { .. }
        | NodeKind::ArrayCreationLevel { .. }
        | NodeKind::Type { .. }
        | NodeKind::MemberValuePair { .. } => None,
    }
}

fn before_directive(walker: &mut JavaWalker<'_>, directive: &Directive, pos: Position) {
    match directive {
        Directive::Exports { .. } => walker.emit_text(TokenKind::Exports, pos, "export"),
        Directive::Requires { .. } => walker.emit_text(TokenKind::Requires, pos, "require"),
        Directive::Provides { .. } => walker.emit_text(TokenKind::Provides, pos, "provides"),
        Directive::Opens { .. } | Directive::Uses { .. } => {}
    }
}

fn before_declaration(
    walker: &mut JavaWalker<'_>,
    node: &Node,
    decl: &Declaration,
    pos: Position,
) -> Result<Dispatch, WalkError> {
    match decl {
        Declaration::Class { interface, .. } => {
            if *interface {
                walker.emit_text(TokenKind::InterfaceBegin, pos, "interface");
            } else {
                walker.emit_text(TokenKind::ClassBegin, pos, "class");
            }
        }
        Declaration::Enum { .. } => walker.emit_text(TokenKind::EnumBegin, pos, "enum"),
        Declaration::EnumConstant { .. } => walker.emit(TokenKind::EnumConstant, pos, 1),
        Declaration::AnnotationType { .. } => {
            walker.emit_text(TokenKind::AnnoTypeBegin, pos, "@interface")
        }
        Declaration::AnnotationMember { .. } => walker.emit(TokenKind::MethodBegin, pos, 1),
        Declaration::Method {
            name,
            annotations,
            return_type,
            body,
            ..
        } => {
            walker.dispatch_all(annotations)?;
            walker.emit_text(TokenKind::MethodBegin, start_of(&**return_type, Some(pos)), name);
            if let Some(body) = body {
                walker.dispatch(body)?;
            }
            walker.emit_end(TokenKind::MethodEnd, node);
            return Ok(Dispatch::Handled);
        }
        Declaration::Constructor {
            name,
            name_range,
            annotations,
            body,
            ..
        } => {
            walker.dispatch_all(annotations)?;
            walker.emit_text(TokenKind::ConstrBegin, resolve_start(*name_range, Some(pos)), name);
            walker.dispatch(body)?;
            walker.emit_end(TokenKind::ConstrEnd, node);
            return Ok(Dispatch::Handled);
        }
        Declaration::Field { .. } | Declaration::Initializer { .. } => {}
    }
    Ok(Dispatch::UseDefault)
}

fn before_statement(
    walker: &mut JavaWalker<'_>,
    node: &Node,
    stmt: &Statement,
    pos: Position,
) -> Result<Dispatch, WalkError> {
    match stmt {
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            walker.emit_text(TokenKind::IfBegin, pos, "if");
            walker.dispatch(condition)?;
            walker.dispatch(then_branch)?;
            if let Some(else_branch) = else_branch {
                let else_pos = end_of(&**then_branch, Some(end_of(&**else_branch, Some(pos))));
                walker.emit_text(TokenKind::Else, else_pos, "else");
                walker.dispatch(else_branch)?;
            }
            walker.emit_end(TokenKind::IfEnd, node);
            return Ok(Dispatch::Handled);
        }
        Statement::Try {
            resources,
            catches,
            finally,
            ..
        } => {
            let kind = if resources.is_empty() {
                TokenKind::TryBegin
            } else {
                TokenKind::TryWithResource
            };
            walker.emit_text(kind, pos, "try");
            walker.dispatch_all(resources)?;
            walker.dispatch_all(catches)?;
            if let Some(finally) = finally {
                let finally_pos = match catches.last().and_then(|c| c.range) {
                    Some(range) => range.end,
                    None => start_of(&**finally, Some(pos)),
                };
                walker.emit_text(TokenKind::Finally, finally_pos, "finally");
                walker.dispatch(finally)?;
            }
            return Ok(Dispatch::Handled);
        }
        Statement::While { .. } => walker.emit_text(TokenKind::WhileBegin, pos, "while"),
        Statement::Do { .. } => walker.emit_text(TokenKind::DoBegin, pos, "do"),
        Statement::For { .. } | Statement::ForEach { .. } => {
            walker.emit_text(TokenKind::ForBegin, pos, "for")
        }
        Statement::Switch { .. } => walker.emit_text(TokenKind::SwitchBegin, pos, "switch"),
        Statement::Synchronized { .. } => {
            walker.emit_text(TokenKind::SyncBegin, pos, "synchronized")
        }
        Statement::Break { .. } => walker.emit_text(TokenKind::Break, pos, "break"),
        Statement::Continue { .. } => walker.emit_text(TokenKind::Continue, pos, "continue"),
        Statement::Return { .. } => walker.emit_text(TokenKind::Return, pos, "return"),
        Statement::Throw { .. } => walker.emit_text(TokenKind::Throw, pos, "throw"),
        Statement::Yield { .. } => walker.emit_text(TokenKind::Yield, pos, "yield"),
        Statement::Assert { .. } => walker.emit_text(TokenKind::Assert, pos, "assert"),
        Statement::ExplicitConstructorInvocation { this, .. } => {
            let keyword = if *this { "this" } else { "super" };
            walker.emit_text(TokenKind::Apply, pos, keyword);
        }
        Statement::Block { .. }
        | Statement::Expression { .. }
        | Statement::LocalClass { .. }
        | Statement::Labeled { .. }
        | Statement::Empty => {}
    }
    Ok(Dispatch::UseDefault)
}

fn before_expression(
    walker: &mut JavaWalker<'_>,
    expr: &Expression,
    pos: Position,
) -> Result<Dispatch, WalkError> {
    match expr {
        Expression::ArrayCreation {
            element_type,
            levels,
            initializer,
        } => {
            walker.emit_text(TokenKind::NewArray, pos, "new");
            walker.dispatch_all(levels)?;
            walker.dispatch(element_type)?;
            if let Some(initializer) = initializer {
                walker.emit(TokenKind::ArrayInitBegin, start_of(&**initializer, Some(pos)), 1);
                walker.dispatch(initializer)?;
                walker.emit(TokenKind::ArrayInitEnd, end_of(&**initializer, Some(pos)), 1);
            }
            return Ok(Dispatch::Handled);
        }
        Expression::ObjectCreation {
            scope,
            ty,
            type_arguments,
            arguments,
            body,
        } => {
            walker.emit_text(TokenKind::NewClass, pos, "new");
            if let Some(scope) = scope {
                walker.dispatch(scope)?;
            }
            walker.dispatch(ty)?;
            walker.dispatch_all(type_arguments)?;
            walker.dispatch_all(arguments)?;
            if let Some(members) = body {
                if let (Some(first), Some(last)) = (members.first(), members.last()) {
                    walker.emit_text(TokenKind::InitBegin, start_of(first, Some(pos)), "{");
                    walker.dispatch_all(members)?;
                    walker.emit_text(TokenKind::InitEnd, end_of(last, Some(pos)), "}");
                }
            }
            return Ok(Dispatch::Handled);
        }
        Expression::Annotation { name, .. } => {
            walker.emit(TokenKind::Anno, pos, 1 + name.chars().count())
        }
        Expression::Assign { .. } => walker.emit_text(TokenKind::Assign, pos, "="),
        Expression::Conditional { .. } => walker.emit_text(TokenKind::Cond, pos, "?"),
        Expression::Switch { .. } => walker.emit_text(TokenKind::SwitchBegin, pos, "switch"),
        Expression::MethodCall { name, .. } => walker.emit_text(TokenKind::Apply, pos, name),
        Expression::Lambda { .. } => walker.emit_text(TokenKind::Lambda, pos, "->"),
        Expression::Name { .. }
        | Expression::Literal { .. }
        | Expression::This { .. }
        | Expression::Super { .. }
        | Expression::FieldAccess { .. }
        | Expression::ArrayAccess { .. }
        | Expression::MethodReference { .. }
        | Expression::ArrayInitializer { .. }
        | Expression::Binary { .. }
        | Expression::Unary { .. }
        | Expression::Cast { .. }
        | Expression::InstanceOf { .. }
        | Expression::ClassLiteral { .. }
        | Expression::Enclosed { .. }
        | Expression::VariableDeclaration { .. } => {}
    }
    Ok(Dispatch::UseDefault)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simtok_core::token::TokenStream;

    fn walk(node: &Node) -> TokenStream {
        let mut out = TokenStream::new();
        Walker::new(&JavaRules, "T.java", &mut out)
            .dispatch(node)
            .unwrap();
        out
    }

    #[test]
    fn break_is_a_leaf_marker() {
        let out = walk(&Node::new(Statement::Break { label: None }).at(4, 9, 4, 14));
        assert_eq!(out.kinds(), vec![TokenKind::Break]);
        assert_eq!(out[0].position(), Position::new(4, 9));
        assert_eq!(out[0].length, 5);
    }

    #[test]
    fn annotation_length_counts_at_sign() {
        let anno = Node::new(Expression::Annotation {
            name: "Override".to_string(),
            arguments: vec![],
        })
        .at(2, 5, 2, 13);
        let out = walk(&anno);
        assert_eq!(out[0].kind, TokenKind::Anno);
        assert_eq!(out[0].length, 9);
    }

    #[test]
    fn method_begin_falls_back_to_method_start() {
        let method = Node::new(Declaration::Method {
            name: "run".to_string(),
            annotations: vec![],
            type_parameters: vec![],
            return_type: Box::new(Node::type_named("void")),
            parameters: vec![],
            throws: vec![],
            body: None,
        })
        .at(3, 5, 3, 20);
        let out = walk(&method);
        assert_eq!(out.kinds(), vec![TokenKind::MethodBegin, TokenKind::MethodEnd]);
        assert_eq!(out[0].position(), Position::new(3, 5));
        assert_eq!(out[0].length, 3);
        assert_eq!(out[1].position(), Position::new(3, 20));
    }

    #[test]
    fn method_parameters_are_not_walked() {
        let annotated_param = Node::new(NodeKind::Parameter {
            name: "x".to_string(),
            annotations: vec![Node::new(Expression::Annotation {
                name: "Nullable".to_string(),
                arguments: vec![],
            })],
            ty: Box::new(Node::type_named("String")),
            varargs: false,
        });
        let method = Node::new(Declaration::Method {
            name: "m".to_string(),
            annotations: vec![],
            type_parameters: vec![],
            return_type: Box::new(Node::type_named("void")),
            parameters: vec![annotated_param],
            throws: vec![],
            body: Some(Box::new(Node::block(vec![]))),
        });
        let out = walk(&method);
        assert_eq!(out.kinds(), vec![TokenKind::MethodBegin, TokenKind::MethodEnd]);
    }

    #[test]
    fn missing_ranges_give_sentinels() {
        let out = walk(&Node::new(Statement::While {
            condition: Box::new(Node::literal("true")),
            body: Box::new(Node::block(vec![])),
        }));
        assert_eq!(out.kinds(), vec![TokenKind::WhileBegin, TokenKind::WhileEnd]);
        assert!(out.iter().all(|t| t.position().is_sentinel()));
    }

    #[test]
    fn opens_and_uses_emit_nothing() {
        let module = Node::new(NodeKind::Module {
            name: "m".to_string(),
            open: false,
            annotations: vec![],
            directives: vec![
                Node::new(Directive::Opens {
                    name: "p".to_string(),
                    to: vec![],
                }),
                Node::new(Directive::Uses {
                    name: "S".to_string(),
                }),
                Node::new(Directive::Requires {
                    name: "java.base".to_string(),
                    is_static: false,
                    is_transitive: false,
                }),
            ],
        });
        let out = walk(&module);
        assert_eq!(
            out.kinds(),
            vec![TokenKind::ModuleBegin, TokenKind::Requires, TokenKind::ModuleEnd]
        );
        assert_eq!(out[1].length, 7);
    }

    #[test]
    fn closing_token_table() {
        let interface = Node::new(Declaration::Class {
            name: "I".to_string(),
            interface: true,
            annotations: vec![],
            type_parameters: vec![],
            extends: vec![],
            implements: vec![],
            members: vec![],
        });
        assert_eq!(closing_token(&interface), Some(TokenKind::InterfaceEnd));
        assert_eq!(closing_token(&Node::name("x")), None);
        assert_eq!(
            closing_token(&Node::new(Statement::Try {
                resources: vec![],
                block: Box::new(Node::block(vec![])),
                catches: vec![],
                finally: None,
            })),
            None
        );
    }

    #[test]
    fn try_body_is_not_walked() {
        let work = Node::new(Expression::MethodCall {
            scope: None,
            type_arguments: vec![],
            name: "work".to_string(),
            arguments: vec![],
        })
        .at(2, 5, 2, 10)
        .into_statement();
        let out = walk(
            &Node::new(Statement::Try {
                resources: vec![],
                block: Box::new(Node::block(vec![work]).at(1, 5, 3, 1)),
                catches: vec![],
                finally: None,
            })
            .at(1, 1, 3, 1),
        );
        assert_eq!(out.kinds(), vec![TokenKind::TryBegin]);
        assert_eq!(out[0].length, 3);
    }

    #[test]
    fn enum_constant_marks_both_ends() {
        let constant = Node::new(Declaration::EnumConstant {
            name: "RED".to_string(),
            annotations: vec![],
            arguments: vec![],
            body: vec![],
        })
        .at(2, 5, 2, 8);
        let out = walk(&constant);
        assert_eq!(
            out.kinds(),
            vec![TokenKind::EnumConstant, TokenKind::EnumConstant]
        );
        assert_eq!(out[0].position(), Position::new(2, 5));
        assert_eq!(out[1].position(), Position::new(2, 8));
        assert!(out.iter().all(|t| t.length == 1));
    }
}
