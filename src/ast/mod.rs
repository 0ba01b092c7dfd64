//! The Ash abstract syntax tree.
//!
//! The AST is an arena: one [`Ast`] per source file owns all expression
//! nodes, bodies, and function prototypes, which refer to each other by
//! [`ExprId`], [`BodyId`], and [`ProtoId`] indices. Bodies link upward to
//! their parent body, which gives the scope checker its walk and avoids
//! ownership cycles between bodies and the prototypes they declare.
//!
//! Every expression node carries two caches written by the analysis
//! passes: `result_type` (set once by the type checker, `None` until then)
//! and `constant` (set once by the constant checker). The passes mutate
//! only these caches; the tree shape is fixed after parsing.
//!
//! # See Also
//!
//! * [`crate::parser`] - Produces the arena
//! * [`crate::semantic`] - Walks and annotates it
//! * [`crate::codegen`] - Lowers it to LLVM IR

mod dump;

use std::collections::{BTreeMap, HashMap};

use crate::interner::NameId;
use crate::ops::{BinaryOp, UnaryOp};
use crate::token::Span;
use crate::types::{LiteralValue, Type};

/// Index of an expression node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

/// Index of a body in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u32);

/// Index of a function prototype in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtoId(u32);

/// The three-valued constant classification attached to every expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantStatus {
    /// Not yet computed.
    Unknown,
    /// The expression folds to a compile-time constant.
    Constant,
    /// The expression must be evaluated at runtime.
    Variable,
}

/// What kind of block a body is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// The file's top-level body.
    Global,
    /// A function's body. Variable lookups stop here.
    Function,
    /// An `if`, `else`, or `case` block.
    Conditional,
    /// A `for` or `while` block.
    Loop,
}

/// The kind of name recorded in a body's in-scope registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Variable,
    Function,
}

/// An expression variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal with its declared type and parsed payload.
    Literal { ty: Type, value: LiteralValue },
    /// A block of expressions; the payload indexes [`Ast::body`].
    Body(BodyId),
    /// `type name (= init)?`
    VariableDeclaration {
        ty: Type,
        name: NameId,
        init: Option<ExprId>,
    },
    /// A reference to a variable.
    VariableReference { name: NameId },
    /// A binary operation.
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// A unary operation.
    Unary { op: UnaryOp, operand: ExprId },
    /// `(type) expr`
    Cast { target: Type, operand: ExprId },
    /// A function call. `callee` starts as the bare name and is rewritten
    /// to the resolved mangled id by the type checker.
    Call {
        callee: NameId,
        is_extern: bool,
        args: Vec<ExprId>,
    },
    /// `if cond { .. } (else { .. })?`. `yields_value` is true only in
    /// expression position.
    If {
        cond: ExprId,
        then_body: ExprId,
        else_body: Option<ExprId>,
        yields_value: bool,
    },
    /// `for type name = start, cond (, step)? { .. }`
    For {
        var_type: Type,
        var_name: NameId,
        start: ExprId,
        end: ExprId,
        step: Option<ExprId>,
        body: ExprId,
    },
    /// `while cond { .. }`
    While { cond: ExprId, body: ExprId },
    /// A `#` comment.
    Comment,
    /// `return expr?;`
    Return { value: Option<ExprId> },
    /// `continue;`
    Continue,
    /// `break;`
    Break,
    /// `switch value { case* }`
    Switch { value: ExprId, cases: Vec<ExprId> },
    /// One arm of a switch. `value` is absent for the default case.
    Case {
        value: Option<ExprId>,
        body: ExprId,
        is_default: bool,
    },
}

/// An expression node: a variant plus its links and caches.
#[derive(Debug)]
pub struct ExprNode {
    /// The variant.
    pub kind: ExprKind,
    /// The enclosing body. `None` only for a file's root body expression.
    pub body: Option<BodyId>,
    /// Result type cache, written once by the type checker.
    pub result_type: Option<Type>,
    /// Constant status cache, written once by the constant checker.
    pub constant: ConstantStatus,
    /// Source location.
    pub span: Span,
    /// True once the type checker has rewritten a call's callee to its
    /// mangled id. Meaningful only on `Call` nodes.
    pub mangled: bool,
}

impl ExprNode {
    /// Returns true if the constant checker classified this node Constant.
    pub fn is_constant(&self) -> bool {
        self.constant == ConstantStatus::Constant
    }
}

/// A lexical block: declarations, nested functions, and expressions.
#[derive(Debug)]
pub struct Body {
    /// The enclosing body, `None` for the file's root.
    pub parent: Option<BodyId>,
    /// What kind of block this is.
    pub kind: BodyKind,
    /// The enclosing function's prototype, `None` at global scope.
    pub parent_function: Option<ProtoId>,
    /// The expression node wrapping this body (carries its caches).
    pub self_expr: ExprId,
    /// Child expressions in source order.
    pub expressions: Vec<ExprId>,
    /// Nested function definitions.
    pub functions: Vec<FunctionDefinition>,
    /// Prototypes visible at this body, including externs. Keys are the
    /// mangled ids after the prototype pass has run.
    pub prototypes: BTreeMap<NameId, ProtoId>,
    /// Types of the variables this body declares.
    pub named_types: HashMap<NameId, Type>,
    /// Declaration-order registry used by the scope checker to enforce
    /// use-after-declare and detect redeclarations.
    pub in_scope: Vec<(NameId, RefKind)>,
    /// Extern prototypes declared at this body, by mangled id.
    pub externs: Vec<NameId>,
}

/// A function signature: name, return type, parameter types and names.
///
/// The name starts as the bare identifier and is rewritten to the mangled
/// id by the prototype pass.
#[derive(Debug, Clone)]
pub struct FunctionPrototype {
    pub name: NameId,
    pub return_type: Type,
    pub params: Vec<Type>,
    pub param_names: Vec<NameId>,
    pub is_extern: bool,
}

/// A function definition: a prototype plus the body implementing it.
#[derive(Debug, Clone, Copy)]
pub struct FunctionDefinition {
    pub prototype: ProtoId,
    /// The body expression (always an [`ExprKind::Body`] node).
    pub body: ExprId,
}

/// The arena for one source file.
#[derive(Debug)]
pub struct Ast {
    exprs: Vec<ExprNode>,
    bodies: Vec<Body>,
    protos: Vec<FunctionPrototype>,
    root: BodyId,
}

impl Ast {
    /// Creates an arena containing just the root global body.
    pub fn new() -> Self {
        let mut ast = Ast {
            exprs: Vec::new(),
            bodies: Vec::new(),
            protos: Vec::new(),
            root: BodyId(0),
        };
        ast.root = ast.new_body(None, BodyKind::Global);
        ast
    }

    /// The file's root body.
    pub fn root(&self) -> BodyId {
        self.root
    }

    /// Creates a body and the expression node wrapping it.
    pub fn new_body(&mut self, parent: Option<BodyId>, kind: BodyKind) -> BodyId {
        let body_id = BodyId(self.bodies.len() as u32);
        let expr_id = ExprId(self.exprs.len() as u32);
        self.exprs.push(ExprNode {
            kind: ExprKind::Body(body_id),
            body: parent,
            result_type: None,
            constant: ConstantStatus::Unknown,
            span: Span::new(0, 0, 1, 1),
            mangled: false,
        });
        self.bodies.push(Body {
            parent,
            kind,
            parent_function: None,
            self_expr: expr_id,
            expressions: Vec::new(),
            functions: Vec::new(),
            prototypes: BTreeMap::new(),
            named_types: HashMap::new(),
            in_scope: Vec::new(),
            externs: Vec::new(),
        });
        body_id
    }

    /// Allocates an expression node inside `body`.
    pub fn add_expr(&mut self, body: BodyId, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(ExprNode {
            kind,
            body: Some(body),
            result_type: None,
            constant: ConstantStatus::Unknown,
            span,
            mangled: false,
        });
        id
    }

    /// Allocates a prototype.
    pub fn add_prototype(&mut self, proto: FunctionPrototype) -> ProtoId {
        let id = ProtoId(self.protos.len() as u32);
        self.protos.push(proto);
        id
    }

    /// Returns the expression node for `id`.
    pub fn expr(&self, id: ExprId) -> &ExprNode {
        &self.exprs[id.0 as usize]
    }

    /// Returns the expression node for `id`, mutably.
    pub fn expr_mut(&mut self, id: ExprId) -> &mut ExprNode {
        &mut self.exprs[id.0 as usize]
    }

    /// Returns the body for `id`.
    pub fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id.0 as usize]
    }

    /// Returns the body for `id`, mutably.
    pub fn body_mut(&mut self, id: BodyId) -> &mut Body {
        &mut self.bodies[id.0 as usize]
    }

    /// Returns the prototype for `id`.
    pub fn proto(&self, id: ProtoId) -> &FunctionPrototype {
        &self.protos[id.0 as usize]
    }

    /// Returns the prototype for `id`, mutably.
    pub fn proto_mut(&mut self, id: ProtoId) -> &mut FunctionPrototype {
        &mut self.protos[id.0 as usize]
    }

    /// Resolves an `ExprKind::Body` expression to its body id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a body expression; callers only pass ids they
    /// created as bodies.
    pub fn expr_body(&self, id: ExprId) -> BodyId {
        match self.expr(id).kind {
            ExprKind::Body(body) => body,
            ref other => panic!("expression is not a body: {:?}", other),
        }
    }

    /// The body enclosing `id` (for a body expression, its parent).
    pub fn enclosing_body(&self, id: ExprId) -> Option<BodyId> {
        self.expr(id).body
    }

    /// The cached result type of `id`, if the type checker has run.
    pub fn cached_type(&self, id: ExprId) -> Option<Type> {
        self.expr(id).result_type
    }

    /// Iterates all expression ids in allocation order.
    pub fn expr_ids(&self) -> impl Iterator<Item = ExprId> {
        (0..self.exprs.len() as u32).map(ExprId)
    }

    /// Iterates all body ids in allocation order.
    pub fn body_ids(&self) -> impl Iterator<Item = BodyId> {
        (0..self.bodies.len() as u32).map(BodyId)
    }
}

impl Default for Ast {
    fn default() -> Self {
        Ast::new()
    }
}
