//! Java syntax tree.
//!
//! The tree is produced outside this crate (by any Java parser) and handed
//! over serialized as JSON. Only the distinctions that matter for token
//! emission are modeled; everything else collapses into a few generic
//! variants whose children are still walked.
//!
//! Child order as returned by [`SyntaxNode::children`] is source order.

use serde::{Deserialize, Serialize};
use simtok_core::position::SourceRange;
use simtok_core::walk::SyntaxNode;

// ============================================================================
// Node
// ============================================================================

/// A syntax tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Source range, if the parser recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
    pub kind: NodeKind,
}

/// Node category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    CompilationUnit {
        package: Option<Box<Node>>,
        #[serde(default)]
        imports: Vec<Node>,
        #[serde(default)]
        types: Vec<Node>,
        module: Option<Box<Node>>,
    },
    Package {
        name: String,
        #[serde(default)]
        annotations: Vec<Node>,
    },
    Import {
        name: String,
        #[serde(default)]
        is_static: bool,
        #[serde(default)]
        is_asterisk: bool,
    },
    Module {
        name: String,
        #[serde(default)]
        open: bool,
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(default)]
        directives: Vec<Node>,
    },
    Directive(Directive),
    Declaration(Declaration),
    Statement(Statement),
    Expression(Expression),
    CatchClause {
        parameter: Box<Node>,
        body: Box<Node>,
    },
    /// A `case` or `default` entry; `default` has no labels.
    SwitchEntry {
        #[serde(default)]
        labels: Vec<Node>,
        guard: Option<Box<Node>>,
        #[serde(default)]
        body: Vec<Node>,
    },
    VariableDeclarator {
        name: String,
        #[serde(rename = "type")]
        ty: Option<Box<Node>>,
        initializer: Option<Box<Node>>,
    },
    Parameter {
        name: String,
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(rename = "type")]
        ty: Box<Node>,
        #[serde(default)]
        varargs: bool,
    },
    /// One `[dim]` of an array creation.
    ArrayCreationLevel {
        #[serde(default)]
        annotations: Vec<Node>,
        dimension: Option<Box<Node>>,
    },
    Type {
        name: String,
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(default)]
        type_arguments: Vec<Node>,
    },
    /// `name = value` inside an annotation.
    MemberValuePair {
        name: String,
        value: Box<Node>,
    },
}

/// Module directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    Requires {
        name: String,
        #[serde(default)]
        is_static: bool,
        #[serde(default)]
        is_transitive: bool,
    },
    Exports {
        name: String,
        #[serde(default)]
        to: Vec<String>,
    },
    Opens {
        name: String,
        #[serde(default)]
        to: Vec<String>,
    },
    Uses {
        name: String,
    },
    Provides {
        name: String,
        #[serde(default)]
        with: Vec<String>,
    },
}

/// Type and member declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Declaration {
    /// Class or interface.
    Class {
        name: String,
        #[serde(default)]
        interface: bool,
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(default)]
        type_parameters: Vec<Node>,
        #[serde(default)]
        extends: Vec<Node>,
        #[serde(default)]
        implements: Vec<Node>,
        #[serde(default)]
        members: Vec<Node>,
    },
    Enum {
        name: String,
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(default)]
        implements: Vec<Node>,
        #[serde(default)]
        constants: Vec<Node>,
        #[serde(default)]
        members: Vec<Node>,
    },
    EnumConstant {
        name: String,
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(default)]
        arguments: Vec<Node>,
        /// Constant-specific class body.
        #[serde(default)]
        body: Vec<Node>,
    },
    /// `@interface` declaration.
    AnnotationType {
        name: String,
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(default)]
        members: Vec<Node>,
    },
    AnnotationMember {
        name: String,
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(rename = "type")]
        ty: Box<Node>,
        default: Option<Box<Node>>,
    },
    Method {
        name: String,
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(default)]
        type_parameters: Vec<Node>,
        return_type: Box<Node>,
        #[serde(default)]
        parameters: Vec<Node>,
        #[serde(default)]
        throws: Vec<Node>,
        /// Absent for abstract and interface methods.
        body: Option<Box<Node>>,
    },
    Constructor {
        name: String,
        /// Range of the name alone.
        name_range: Option<SourceRange>,
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(default)]
        type_parameters: Vec<Node>,
        #[serde(default)]
        parameters: Vec<Node>,
        #[serde(default)]
        throws: Vec<Node>,
        body: Box<Node>,
    },
    Field {
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(rename = "type")]
        ty: Box<Node>,
        #[serde(default)]
        variables: Vec<Node>,
    },
    /// Instance or static initializer block.
    Initializer {
        #[serde(default)]
        is_static: bool,
        body: Box<Node>,
    },
}

/// Statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Block {
        #[serde(default)]
        statements: Vec<Node>,
    },
    Expression {
        expression: Box<Node>,
    },
    LocalClass {
        declaration: Box<Node>,
    },
    Labeled {
        label: String,
        statement: Box<Node>,
    },
    If {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    Do {
        body: Box<Node>,
        condition: Box<Node>,
    },
    For {
        #[serde(default)]
        init: Vec<Node>,
        condition: Option<Box<Node>>,
        #[serde(default)]
        update: Vec<Node>,
        body: Box<Node>,
    },
    ForEach {
        variable: Box<Node>,
        iterable: Box<Node>,
        body: Box<Node>,
    },
    Switch {
        selector: Box<Node>,
        #[serde(default)]
        entries: Vec<Node>,
    },
    Synchronized {
        lock: Box<Node>,
        body: Box<Node>,
    },
    Try {
        #[serde(default)]
        resources: Vec<Node>,
        block: Box<Node>,
        #[serde(default)]
        catches: Vec<Node>,
        finally: Option<Box<Node>>,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Return {
        value: Option<Box<Node>>,
    },
    Throw {
        exception: Box<Node>,
    },
    Yield {
        value: Box<Node>,
    },
    Assert {
        check: Box<Node>,
        message: Option<Box<Node>>,
    },
    /// `this(...)` or `super(...)` as the first constructor statement.
    ExplicitConstructorInvocation {
        #[serde(default)]
        this: bool,
        scope: Option<Box<Node>>,
        #[serde(default)]
        type_arguments: Vec<Node>,
        #[serde(default)]
        arguments: Vec<Node>,
    },
    Empty,
}

/// Expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Name {
        name: String,
    },
    /// Any literal, kept as source text.
    Literal {
        text: String,
    },
    This {
        qualifier: Option<Box<Node>>,
    },
    Super {
        qualifier: Option<Box<Node>>,
    },
    FieldAccess {
        scope: Box<Node>,
        name: String,
    },
    ArrayAccess {
        array: Box<Node>,
        index: Box<Node>,
    },
    MethodCall {
        scope: Option<Box<Node>>,
        #[serde(default)]
        type_arguments: Vec<Node>,
        name: String,
        #[serde(default)]
        arguments: Vec<Node>,
    },
    MethodReference {
        scope: Box<Node>,
        identifier: String,
    },
    ObjectCreation {
        scope: Option<Box<Node>>,
        #[serde(rename = "type")]
        ty: Box<Node>,
        #[serde(default)]
        type_arguments: Vec<Node>,
        #[serde(default)]
        arguments: Vec<Node>,
        /// Anonymous class body, if any.
        body: Option<Vec<Node>>,
    },
    ArrayCreation {
        element_type: Box<Node>,
        #[serde(default)]
        levels: Vec<Node>,
        initializer: Option<Box<Node>>,
    },
    ArrayInitializer {
        #[serde(default)]
        values: Vec<Node>,
    },
    /// Plain or compound assignment.
    Assign {
        target: Box<Node>,
        #[serde(default = "default_assign_operator")]
        operator: String,
        value: Box<Node>,
    },
    Binary {
        left: Box<Node>,
        operator: String,
        right: Box<Node>,
    },
    Unary {
        operator: String,
        operand: Box<Node>,
    },
    Conditional {
        condition: Box<Node>,
        then_expr: Box<Node>,
        else_expr: Box<Node>,
    },
    Lambda {
        #[serde(default)]
        parameters: Vec<Node>,
        body: Box<Node>,
    },
    Cast {
        #[serde(rename = "type")]
        ty: Box<Node>,
        expression: Box<Node>,
    },
    InstanceOf {
        expression: Box<Node>,
        #[serde(rename = "type")]
        ty: Box<Node>,
    },
    ClassLiteral {
        #[serde(rename = "type")]
        ty: Box<Node>,
    },
    Enclosed {
        inner: Box<Node>,
    },
    Switch {
        selector: Box<Node>,
        #[serde(default)]
        entries: Vec<Node>,
    },
    /// Marker, single-member or normal annotation.
    Annotation {
        name: String,
        #[serde(default)]
        arguments: Vec<Node>,
    },
    /// Local variable declaration (`int a = 1, b;`).
    VariableDeclaration {
        #[serde(default)]
        annotations: Vec<Node>,
        #[serde(default)]
        variables: Vec<Node>,
    },
}

fn default_assign_operator() -> String {
    "=".to_string()
}

// ============================================================================
// Construction helpers
// ============================================================================

impl Node {
    /// A node without a range.
    pub fn new(kind: impl Into<NodeKind>) -> Self {
        Node {
            range: None,
            kind: kind.into(),
        }
    }

    /// Set the range to `begin_line:begin_column .. end_line:end_column`.
    pub fn at(mut self, begin_line: i32, begin_column: i32, end_line: i32, end_column: i32) -> Self {
        self.range = Some(SourceRange::lines(
            begin_line,
            begin_column,
            end_line,
            end_column,
        ));
        self
    }

    /// Set or clear the range.
    pub fn with_range(mut self, range: Option<SourceRange>) -> Self {
        self.range = range;
        self
    }

    pub fn block(statements: Vec<Node>) -> Self {
        Node::new(Statement::Block { statements })
    }

    pub fn name(name: &str) -> Self {
        Node::new(Expression::Name {
            name: name.to_string(),
        })
    }

    pub fn literal(text: &str) -> Self {
        Node::new(Expression::Literal {
            text: text.to_string(),
        })
    }

    pub fn type_named(name: &str) -> Self {
        Node::new(NodeKind::Type {
            name: name.to_string(),
            annotations: Vec::new(),
            type_arguments: Vec::new(),
        })
    }

    /// Wrap in an expression statement.
    pub fn into_statement(self) -> Self {
        let range = self.range;
        Node::new(Statement::Expression {
            expression: Box::new(self),
        })
        .with_range(range)
    }
}

impl From<Directive> for NodeKind {
    fn from(d: Directive) -> Self {
        NodeKind::Directive(d)
    }
}

impl From<Declaration> for NodeKind {
    fn from(d: Declaration) -> Self {
        NodeKind::Declaration(d)
    }
}

impl From<Statement> for NodeKind {
    fn from(s: Statement) -> Self {
        NodeKind::Statement(s)
    }
}

impl From<Expression> for NodeKind {
    fn from(e: Expression) -> Self {
        NodeKind::Expression(e)
    }
}

// ============================================================================
// Children
// ============================================================================

/// Accumulates children in source order.
struct Children<'a>(Vec<&'a Node>);

impl<'a> Children<'a> {
    fn new() -> Self {
        Children(Vec::new())
    }

    fn one(mut self, node: &'a Node) -> Self {
        self.0.push(node);
        self
    }

    fn opt(mut self, node: &'a Option<Box<Node>>) -> Self {
        if let Some(node) = node {
            self.0.push(node);
        }
        self
    }

    fn all(mut self, nodes: &'a [Node]) -> Self {
        self.0.extend(nodes);
        self
    }

    fn done(self) -> Vec<&'a Node> {
        self.0
    }
}

impl SyntaxNode for Node {
    fn range(&self) -> Option<SourceRange> {
        self.range
    }

    fn children(&self) -> Vec<&Node> {
        let c = Children::new();
        let c = match &self.kind {
            NodeKind::CompilationUnit {
                package,
                imports,
                types,
                module,
            } => c.opt(package).all(imports).all(types).opt(module),
            NodeKind::Package { annotations, .. } => c.all(annotations),
            NodeKind::Import { .. } => c,
            NodeKind::Module {
                annotations,
                directives,
                ..
            } => c.all(annotations).all(directives),
            NodeKind::Directive(_) => c,
            NodeKind::Declaration(decl) => declaration_children(c, decl),
            NodeKind::Statement(stmt) => statement_children(c, stmt),
            NodeKind::Expression(expr) => expression_children(c, expr),
            NodeKind::CatchClause { parameter, body } => c.one(parameter).one(body),
            NodeKind::SwitchEntry {
                labels,
                guard,
                body,
            } => c.all(labels).opt(guard).all(body),
            NodeKind::VariableDeclarator {
                ty, initializer, ..
            } => c.opt(ty).opt(initializer),
            NodeKind::Parameter {
                annotations, ty, ..
            } => c.all(annotations).one(ty),
            NodeKind::ArrayCreationLevel {
                annotations,
                dimension,
            } => c.all(annotations).opt(dimension),
            NodeKind::Type {
                annotations,
                type_arguments,
                ..
            } => c.all(annotations).all(type_arguments),
            NodeKind::MemberValuePair { value, .. } => c.one(value),
        };
        c.done()
    }
}

fn declaration_children<'a>(c: Children<'a>, decl: &'a Declaration) -> Children<'a> {
    match decl {
        Declaration::Class {
            annotations,
            type_parameters,
            extends,
            implements,
            members,
            ..
        } => c
            .all(annotations)
            .all(type_parameters)
            .all(extends)
            .all(implements)
            .all(members),
        Declaration::Enum {
            annotations,
            implements,
            constants,
            members,
            ..
        } => c
            .all(annotations)
            .all(implements)
            .all(constants)
            .all(members),
        Declaration::EnumConstant {
            annotations,
            arguments,
            body,
            ..
        } => c.all(annotations).all(arguments).all(body),
        Declaration::AnnotationType {
            annotations,
            members,
            ..
        } => c.all(annotations).all(members),
        Declaration::AnnotationMember {
            annotations,
            ty,
            default,
            ..
        } => c.all(annotations).one(ty).opt(default),
        Declaration::Method {
            annotations,
            type_parameters,
            return_type,
            parameters,
            throws,
            body,
            ..
        } => c
            .all(annotations)
            .all(type_parameters)
            .one(return_type)
            .all(parameters)
            .all(throws)
            .opt(body),
        Declaration::Constructor {
            annotations,
            type_parameters,
            parameters,
            throws,
            body,
            ..
        } => c
            .all(annotations)
            .all(type_parameters)
            .all(parameters)
            .all(throws)
            .one(body),
        Declaration::Field {
            annotations,
            ty,
            variables,
        } => c.all(annotations).one(ty).all(variables),
        Declaration::Initializer { body, .. } => c.one(body),
    }
}

fn statement_children<'a>(c: Children<'a>, stmt: &'a Statement) -> Children<'a> {
    match stmt {
        Statement::Block { statements } => c.all(statements),
        Statement::Expression { expression } => c.one(expression),
        Statement::LocalClass { declaration } => c.one(declaration),
        Statement::Labeled { statement, .. } => c.one(statement),
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => c.one(condition).one(then_branch).opt(else_branch),
        Statement::While { condition, body } => c.one(condition).one(body),
        Statement::Do { body, condition } => c.one(body).one(condition),
        Statement::For {
            init,
            condition,
            update,
            body,
        } => c.all(init).opt(condition).all(update).one(body),
        Statement::ForEach {
            variable,
            iterable,
            body,
        } => c.one(variable).one(iterable).one(body),
        Statement::Switch { selector, entries } => c.one(selector).all(entries),
        Statement::Synchronized { lock, body } => c.one(lock).one(body),
        Statement::Try {
            resources,
            block,
            catches,
            finally,
        } => c.all(resources).one(block).all(catches).opt(finally),
        Statement::Break { .. } | Statement::Continue { .. } | Statement::Empty => c,
        Statement::Return { value } => c.opt(value),
        Statement::Throw { exception } => c.one(exception),
        Statement::Yield { value } => c.one(value),
        Statement::Assert { check, message } => c.one(check).opt(message),
        Statement::ExplicitConstructorInvocation {
            scope,
            type_arguments,
            arguments,
            ..
        } => c.opt(scope).all(type_arguments).all(arguments),
    }
}

fn expression_children<'a>(c: Children<'a>, expr: &'a Expression) -> Children<'a> {
    match expr {
        Expression::Name { .. } | Expression::Literal { .. } => c,
        Expression::This { qualifier } | Expression::Super { qualifier } => c.opt(qualifier),
        Expression::FieldAccess { scope, .. } => c.one(scope),
        Expression::ArrayAccess { array, index } => c.one(array).one(index),
        Expression::MethodCall {
            scope,
            type_arguments,
            arguments,
            ..
        } => c.opt(scope).all(type_arguments).all(arguments),
        Expression::MethodReference { scope, .. } => c.one(scope),
        Expression::ObjectCreation {
            scope,
            ty,
            type_arguments,
            arguments,
            body,
        } => {
            let c = c.opt(scope).one(ty).all(type_arguments).all(arguments);
            match body {
                Some(members) => c.all(members),
                None => c,
            }
        }
        Expression::ArrayCreation {
            element_type,
            levels,
            initializer,
        } => c.one(element_type).all(levels).opt(initializer),
        Expression::ArrayInitializer { values } => c.all(values),
        Expression::Assign { target, value, .. } => c.one(target).one(value),
        Expression::Binary { left, right, .. } => c.one(left).one(right),
        Expression::Unary { operand, .. } => c.one(operand),
        Expression::Conditional {
            condition,
            then_expr,
            else_expr,
        } => c.one(condition).one(then_expr).one(else_expr),
        Expression::Lambda { parameters, body } => c.all(parameters).one(body),
        Expression::Cast { ty, expression } => c.one(ty).one(expression),
        Expression::InstanceOf { expression, ty } => c.one(expression).one(ty),
        Expression::ClassLiteral { ty } => c.one(ty),
        Expression::Enclosed { inner } => c.one(inner),
        Expression::Switch { selector, entries } => c.one(selector).all(entries),
        Expression::Annotation { arguments, .. } => c.all(arguments),
        Expression::VariableDeclaration {
            annotations,
            variables,
        } => c.all(annotations).all(variables),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_with_defaults() {
        let value = json!({
            "range": {"begin": {"line": 1, "column": 1}, "end": {"line": 3, "column": 1}},
            "kind": {"declaration": {"class": {"name": "A"}}}
        });
        let node: Node = serde_json::from_value(value).unwrap();
        match &node.kind {
            NodeKind::Declaration(Declaration::Class {
                name,
                interface,
                members,
                ..
            }) => {
                assert_eq!(name, "A");
                assert!(!interface);
                assert!(members.is_empty());
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        assert_eq!(node.range, Some(SourceRange::lines(1, 1, 3, 1)));
    }

    #[test]
    fn unit_variant_and_missing_range() {
        let node: Node =
            serde_json::from_value(json!({"kind": {"statement": "empty"}})).unwrap();
        assert_eq!(node, Node::new(Statement::Empty));
        assert!(node.range.is_none());
    }

    #[test]
    fn type_field_is_renamed() {
        let node = Node::new(NodeKind::Parameter {
            name: "x".to_string(),
            annotations: vec![],
            ty: Box::new(Node::type_named("int")),
            varargs: false,
        });
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["kind"]["parameter"]["type"]["kind"]["type"]["name"], "int");
    }

    #[test]
    fn assign_operator_defaults_to_plain() {
        let value = json!({"kind": {"expression": {"assign": {
            "target": {"kind": {"expression": {"name": {"name": "a"}}}},
            "value": {"kind": {"expression": {"literal": {"text": "1"}}}}
        }}}});
        let node: Node = serde_json::from_value(value).unwrap();
        match node.kind {
            NodeKind::Expression(Expression::Assign { operator, .. }) => assert_eq!(operator, "="),
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn if_children_in_source_order() {
        let node = Node::new(Statement::If {
            condition: Box::new(Node::name("c")),
            then_branch: Box::new(Node::block(vec![])),
            else_branch: Some(Box::new(Node::new(Statement::Empty))),
        });
        let children = node.children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0], &Node::name("c"));
        assert_eq!(children[2], &Node::new(Statement::Empty));
    }

    #[test]
    fn try_children_include_block_between_resources_and_catches() {
        let resource = Node::name("r");
        let block = Node::block(vec![]);
        let catch = Node::new(NodeKind::CatchClause {
            parameter: Box::new(Node::name("e")),
            body: Box::new(Node::block(vec![])),
        });
        let node = Node::new(Statement::Try {
            resources: vec![resource.clone()],
            block: Box::new(block.clone()),
            catches: vec![catch.clone()],
            finally: None,
        });
        assert_eq!(node.children(), vec![&resource, &block, &catch]);
    }

    #[test]
    fn anonymous_body_members_are_children() {
        let member = Node::new(Declaration::Initializer {
            is_static: false,
            body: Box::new(Node::block(vec![])),
        });
        let node = Node::new(Expression::ObjectCreation {
            scope: None,
            ty: Box::new(Node::type_named("Runnable")),
            type_arguments: vec![],
            arguments: vec![],
            body: Some(vec![member.clone()]),
        });
        let children = node.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1], &member);
    }

    #[test]
    fn leaves_have_no_children() {
        assert!(Node::name("x").children().is_empty());
        assert!(Node::new(Statement::Break { label: None }).children().is_empty());
        assert!(Node::new(Directive::Uses {
            name: "S".to_string()
        })
        .children()
        .is_empty());
    }
}
