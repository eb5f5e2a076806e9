//! In-memory compilations that reference Moq, for tests and host adapters.
//!
//! [`MoqFixture`] seeds a compilation with the slice of `System` and `Moq`
//! the analyzer knows about, then offers helpers that build typed, bound
//! expressions and statements the way a host would lower them:
//!
//! ```
//! use mocklint_core::fixture::MoqFixture;
//!
//! let mut fx = MoqFixture::new();
//! let foo = fx.interface("IFoo");
//! let int = fx.int();
//! let run = fx.method(foo, "Run", &[("value", int)], Some(int));
//! let mock = fx.mock_local("mock", foo);
//! let setup = fx.setup(mock, |fx, m| {
//!     let any = fx.it_is_any(int);
//!     fx.call(m, run, &[any])
//! });
//! let returns = fx.returns_value(setup, int);
//! fx.statement(returns);
//! let compilation = fx.finish();
//! assert!(compilation.validate().is_ok());
//! ```
//!
//! Statements are appended to the current method body. [`MoqFixture::begin_method`]
//! starts another method, [`MoqFixture::local_function`] and
//! [`MoqFixture::in_lambda`] open nested bodies.
//!
//! Helpers panic when handed ids the fixture did not create; they are
//! construction tooling, not analysis code.

use std::collections::HashMap;

use crate::model::{
    Accessibility, AssignmentOperator, Compilation, CompilationBuilder, CompilationId, EventDetail,
    FieldDetail, FileId, LiteralKind, LocalDetail, MethodDetail, MethodKind, Modifiers, NodeId,
    NodeKind, ParameterDetail, PropertyDetail, Symbol, SymbolDetail, SymbolId, TypeDetail,
    TypeKind,
};

/// Seeded `System` and `Moq` symbols.
#[derive(Debug, Clone)]
struct Seeds {
    object: SymbolId,
    void: SymbolId,
    int: SymbolId,
    long: SymbolId,
    string: SymbolId,
    boolean: SymbolId,
    event_args: SymbolId,
    event_handler: SymbolId,
    event_handler_def: SymbolId,
    nullable_def: SymbolId,
    mock_base: SymbolId,
    mock_def: SymbolId,
    behavior: SymbolId,
    it: SymbolId,
    any_type: SymbolId,
    times: SymbolId,
    callback: SymbolId,
    returns: SymbolId,
    returns_async: SymbolId,
    throws: SymbolId,
    call_base: SymbolId,
    verifiable: SymbolId,
    raises: SymbolId,
}

/// Builder of Moq-referencing compilations.
#[derive(Debug)]
pub struct MoqFixture {
    b: CompilationBuilder,
    file: FileId,
    seeds: Seeds,
    mock_types: HashMap<SymbolId, SymbolId>,
    mock_methods: HashMap<(SymbolId, String), SymbolId>,
    scopes: Vec<Vec<NodeId>>,
    method_name: String,
    methods: Vec<NodeId>,
}

impl Default for MoqFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl MoqFixture {
    pub fn new() -> Self {
        Self::with_id(CompilationId(1))
    }

    pub fn with_id(id: CompilationId) -> Self {
        let mut b = CompilationBuilder::new(id);
        let file = b.add_file("Tests.cs");
        let seeds = seed(&mut b);
        MoqFixture {
            b,
            file,
            seeds,
            mock_types: HashMap::new(),
            mock_methods: HashMap::new(),
            scopes: vec![Vec::new()],
            method_name: "Test".to_string(),
            methods: Vec::new(),
        }
    }

    /// Close the open method and produce the compilation.
    pub fn finish(mut self) -> Compilation {
        self.end_method();
        let declaration = self.b.node(
            self.file,
            NodeKind::TypeDeclaration {
                name: "Tests".to_string(),
                members: std::mem::take(&mut self.methods),
            },
        );
        let root = self.b.file_root(self.file);
        self.b.add_member(root, declaration);
        self.b.finish()
    }

    /// Direct access to a symbol, e.g. to change modifiers.
    pub fn symbol_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.b.symbol_mut(id)
    }

    // ========================================================================
    // Well-known types
    // ========================================================================

    pub fn object(&self) -> SymbolId {
        self.seeds.object
    }

    pub fn void(&self) -> SymbolId {
        self.seeds.void
    }

    pub fn int(&self) -> SymbolId {
        self.seeds.int
    }

    pub fn long(&self) -> SymbolId {
        self.seeds.long
    }

    pub fn string(&self) -> SymbolId {
        self.seeds.string
    }

    pub fn boolean(&self) -> SymbolId {
        self.seeds.boolean
    }

    pub fn event_args(&self) -> SymbolId {
        self.seeds.event_args
    }

    /// `System.EventHandler`
    pub fn event_handler(&self) -> SymbolId {
        self.seeds.event_handler
    }

    /// `Moq.It.IsAnyType`
    pub fn any_type(&self) -> SymbolId {
        self.seeds.any_type
    }

    pub fn times_type(&self) -> SymbolId {
        self.seeds.times
    }

    /// `MockBehavior.<name>` field.
    pub fn behavior_field(&self, name: &str) -> SymbolId {
        self.member_named(self.seeds.behavior, name, None)
    }

    // ========================================================================
    // Declaring types and members
    // ========================================================================

    pub fn interface(&mut self, name: &str) -> SymbolId {
        add_type(&mut self.b, name, &format!("Demo.{}", name), TypeKind::Interface, None)
    }

    pub fn class(&mut self, name: &str) -> SymbolId {
        let object = self.seeds.object;
        add_type(&mut self.b, name, &format!("Demo.{}", name), TypeKind::Class, Some(object))
    }

    pub fn sealed_class(&mut self, name: &str) -> SymbolId {
        let class = self.class(name);
        if let Some(symbol) = self.b.symbol_mut(class) {
            symbol.modifiers.is_sealed = true;
        }
        class
    }

    pub fn derived_class(&mut self, name: &str, base: SymbolId) -> SymbolId {
        add_type(&mut self.b, name, &format!("Demo.{}", name), TypeKind::Class, Some(base))
    }

    pub fn struct_type(&mut self, name: &str) -> SymbolId {
        add_type(&mut self.b, name, &format!("Demo.{}", name), TypeKind::Struct, None)
    }

    /// Record that `ty` implements (or, for interfaces, extends) `interface`.
    pub fn implement(&mut self, ty: SymbolId, interface: SymbolId) {
        if let Some(SymbolDetail::Type(detail)) = self.b.symbol_mut(ty).map(|s| &mut s.detail) {
            detail.interfaces.push(interface);
        }
    }

    pub fn type_parameter(&mut self, name: &str, reference_constraint: bool) -> SymbolId {
        let ty = add_type(&mut self.b, name, name, TypeKind::TypeParameter, None);
        if let Some(SymbolDetail::Type(detail)) = self.b.symbol_mut(ty).map(|s| &mut s.detail) {
            detail.has_reference_constraint = reference_constraint;
        }
        ty
    }

    /// `Nullable<ty>`
    pub fn nullable_of(&mut self, ty: SymbolId) -> SymbolId {
        let def = self.seeds.nullable_def;
        construct_type(&mut self.b, def, &[ty])
    }

    /// `EventHandler<args>`, with its `Invoke(object sender, args e)`.
    pub fn event_handler_of(&mut self, args: SymbolId) -> SymbolId {
        let def = self.seeds.event_handler_def;
        let handler = construct_type(&mut self.b, def, &[args]);
        let (object, void) = (self.seeds.object, self.seeds.void);
        let invoke = add_method(
            &mut self.b,
            handler,
            "Invoke",
            &[("sender", object), ("e", args)],
            Some(void),
            MethodKind::DelegateInvoke,
        );
        set_delegate_invoke(&mut self.b, handler, invoke);
        handler
    }

    /// A delegate type with the given parameter types.
    pub fn delegate_type(
        &mut self,
        name: &str,
        parameters: &[SymbolId],
        return_type: Option<SymbolId>,
    ) -> SymbolId {
        let delegate = add_type(
            &mut self.b,
            name,
            &format!("Demo.{}", name),
            TypeKind::Delegate,
            None,
        );
        let named: Vec<(String, SymbolId)> = parameters
            .iter()
            .enumerate()
            .map(|(i, ty)| (format!("arg{}", i), *ty))
            .collect();
        let named: Vec<(&str, SymbolId)> = named.iter().map(|(n, t)| (n.as_str(), *t)).collect();
        let ret = return_type.unwrap_or(self.seeds.void);
        let invoke = add_method(
            &mut self.b,
            delegate,
            "Invoke",
            &named,
            Some(ret),
            MethodKind::DelegateInvoke,
        );
        set_delegate_invoke(&mut self.b, delegate, invoke);
        delegate
    }

    /// Ordinary method. `None` return type means `void`. Interface members
    /// are abstract, class members are not virtual.
    pub fn method(
        &mut self,
        owner: SymbolId,
        name: &str,
        parameters: &[(&str, SymbolId)],
        return_type: Option<SymbolId>,
    ) -> SymbolId {
        let ret = return_type.unwrap_or(self.seeds.void);
        let method = add_method(
            &mut self.b,
            owner,
            name,
            parameters,
            Some(ret),
            MethodKind::Ordinary,
        );
        self.mark_interface_member(owner, method);
        method
    }

    pub fn virtual_method(
        &mut self,
        owner: SymbolId,
        name: &str,
        parameters: &[(&str, SymbolId)],
        return_type: Option<SymbolId>,
    ) -> SymbolId {
        let method = self.method(owner, name, parameters, return_type);
        if let Some(symbol) = self.b.symbol_mut(method) {
            symbol.modifiers.is_virtual = true;
        }
        method
    }

    pub fn constructor(
        &mut self,
        owner: SymbolId,
        parameters: &[(&str, SymbolId)],
        accessibility: Accessibility,
    ) -> SymbolId {
        let void = self.seeds.void;
        let ctor = add_method(
            &mut self.b,
            owner,
            ".ctor",
            parameters,
            Some(void),
            MethodKind::Constructor,
        );
        if let Some(symbol) = self.b.symbol_mut(ctor) {
            symbol.accessibility = accessibility;
        }
        ctor
    }

    pub fn property(&mut self, owner: SymbolId, name: &str, ty: SymbolId) -> SymbolId {
        let qualified = format!("{}.{}", self.qualified(owner), name);
        let property = self.b.add_symbol(
            name,
            qualified,
            SymbolDetail::Property(PropertyDetail { type_: ty }),
        );
        self.b.add_type_member(owner, property);
        self.mark_interface_member(owner, property);
        property
    }

    pub fn event(&mut self, owner: SymbolId, name: &str, delegate: SymbolId) -> SymbolId {
        let qualified = format!("{}.{}", self.qualified(owner), name);
        let event = self.b.add_symbol(
            name,
            qualified,
            SymbolDetail::Event(EventDetail {
                delegate_type: delegate,
            }),
        );
        self.b.add_type_member(owner, event);
        self.mark_interface_member(owner, event);
        event
    }

    fn mark_interface_member(&mut self, owner: SymbolId, member: SymbolId) {
        let is_interface = self
            .b
            .symbol(owner)
            .and_then(|s| s.as_type())
            .is_some_and(|t| t.type_kind == TypeKind::Interface);
        if is_interface {
            if let Some(symbol) = self.b.symbol_mut(member) {
                symbol.modifiers.is_abstract = true;
            }
        }
    }

    // ========================================================================
    // Moq symbols
    // ========================================================================

    /// `Mock<ty>`
    pub fn mock_type(&mut self, ty: SymbolId) -> SymbolId {
        if let Some(existing) = self.mock_types.get(&ty) {
            return *existing;
        }
        let def = self.seeds.mock_def;
        let mock = construct_type(&mut self.b, def, &[ty]);
        let base = self.seeds.mock_base;
        if let Some(SymbolDetail::Type(detail)) = self.b.symbol_mut(mock).map(|s| &mut s.detail) {
            detail.base_type = Some(base);
        }
        self.mock_types.insert(ty, mock);
        mock
    }

    /// Instance method `name` as seen on `Mock<ty>`.
    ///
    /// Members of ``Mock`1`` get a constructed symbol per mocked type;
    /// members of the non-generic `Mock` base are returned as declared.
    pub fn mock_method(&mut self, ty: SymbolId, name: &str) -> SymbolId {
        let mock = self.mock_type(ty);
        if let Some(existing) = self.mock_methods.get(&(mock, name.to_string())) {
            return *existing;
        }
        let def_owner = self.seeds.mock_def;
        let constructed = match self.try_member_named(def_owner, name, Some(false)) {
            Some(def) => construct_member(&mut self.b, def, mock),
            None => self.member_named(self.seeds.mock_base, name, Some(false)),
        };
        self.mock_methods.insert((mock, name.to_string()), constructed);
        constructed
    }

    /// Static `Mock.<name>`.
    pub fn static_mock_method(&self, name: &str) -> SymbolId {
        self.member_named(self.seeds.mock_base, name, Some(true))
    }

    fn try_member_named(
        &self,
        owner: SymbolId,
        name: &str,
        is_static: Option<bool>,
    ) -> Option<SymbolId> {
        let detail = self.b.symbol(owner)?.as_type()?;
        detail.members.iter().copied().find(|m| {
            self.b.symbol(*m).is_some_and(|s| {
                s.name == name && is_static.map_or(true, |st| s.modifiers.is_static == st)
            })
        })
    }

    fn member_named(&self, owner: SymbolId, name: &str, is_static: Option<bool>) -> SymbolId {
        self.try_member_named(owner, name, is_static)
            .unwrap_or_else(|| panic!("{} has no seeded member {}", owner, name))
    }

    fn qualified(&self, id: SymbolId) -> String {
        self.b
            .symbol(id)
            .map(|s| s.qualified_name.clone())
            .unwrap_or_default()
    }

    fn value_type(&self, id: SymbolId) -> Option<SymbolId> {
        let symbol = self.b.symbol(id)?;
        match &symbol.detail {
            SymbolDetail::Event(e) => Some(e.delegate_type),
            _ => symbol.value_type(),
        }
    }

    fn return_type(&self, method: SymbolId) -> Option<SymbolId> {
        self.b.symbol(method)?.as_method()?.return_type
    }

    fn node_type(&self, node: NodeId) -> Option<SymbolId> {
        self.b.get_node(node)?.type_
    }

    /// `T` of a variable typed `Mock<T>`.
    fn mocked_type(&self, mock: SymbolId) -> SymbolId {
        self.value_type(mock)
            .and_then(|ty| self.b.symbol(ty))
            .and_then(|s| s.as_type())
            .and_then(|t| t.type_arguments.first().copied())
            .unwrap_or_else(|| panic!("{} is not a Mock<T> variable", mock))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn node(&mut self, kind: NodeKind, symbol: Option<SymbolId>, ty: Option<SymbolId>) -> NodeId {
        self.b.bound_node(self.file, kind, symbol, ty)
    }

    /// Reference to a variable, member or type by simple name.
    pub fn ident(&mut self, symbol: SymbolId) -> NodeId {
        let name = self.b.symbol(symbol).map(|s| s.name.clone()).unwrap_or_default();
        let ty = self.value_type(symbol);
        self.node(NodeKind::Identifier { name }, Some(symbol), ty)
    }

    /// `receiver.member` for a property, field or event.
    pub fn member(&mut self, receiver: NodeId, member: SymbolId) -> NodeId {
        let name = self.b.symbol(member).map(|s| s.name.clone()).unwrap_or_default();
        let ty = self.value_type(member);
        self.node(
            NodeKind::MemberAccess {
                expression: receiver,
                name,
            },
            Some(member),
            ty,
        )
    }

    /// Wrap an expression as a positional argument.
    pub fn argument(&mut self, expression: NodeId) -> NodeId {
        self.node(
            NodeKind::Argument {
                name: None,
                expression,
            },
            None,
            None,
        )
    }

    /// Wrap an expression as a named argument.
    pub fn named_argument(&mut self, name: &str, expression: NodeId) -> NodeId {
        self.node(
            NodeKind::Argument {
                name: Some(name.to_string()),
                expression,
            },
            None,
            None,
        )
    }

    /// `receiver.method(args)`. Arguments that are not already argument
    /// nodes are wrapped positionally.
    pub fn call(&mut self, receiver: NodeId, method: SymbolId, args: &[NodeId]) -> NodeId {
        let name = self.b.symbol(method).map(|s| s.name.clone()).unwrap_or_default();
        let access = self.node(
            NodeKind::MemberAccess {
                expression: receiver,
                name,
            },
            Some(method),
            None,
        );
        let mut arguments = Vec::with_capacity(args.len());
        for arg in args {
            let is_argument = self
                .b
                .get_node(*arg)
                .is_some_and(|n| matches!(n.kind, NodeKind::Argument { .. }));
            arguments.push(if is_argument { *arg } else { self.argument(*arg) });
        }
        let ret = self.return_type(method);
        self.node(
            NodeKind::Invocation {
                expression: access,
                arguments,
            },
            Some(method),
            ret,
        )
    }

    /// `Type.method(args)`
    pub fn static_call(&mut self, ty: SymbolId, method: SymbolId, args: &[NodeId]) -> NodeId {
        let receiver = self.type_name(ty);
        self.call(receiver, method, args)
    }

    fn type_name(&mut self, ty: SymbolId) -> NodeId {
        let name = self.b.symbol(ty).map(|s| s.name.clone()).unwrap_or_default();
        self.node(NodeKind::Identifier { name }, Some(ty), None)
    }

    /// `target = value`
    pub fn assign(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.node(
            NodeKind::Assignment {
                target,
                operator: AssignmentOperator::Assign,
                value,
            },
            None,
            None,
        )
    }

    pub fn parenthesized(&mut self, expression: NodeId) -> NodeId {
        let ty = self.node_type(expression);
        self.node(NodeKind::Parenthesized { expression }, None, ty)
    }

    pub fn null(&mut self) -> NodeId {
        self.literal(LiteralKind::Null, None)
    }

    pub fn default_literal(&mut self) -> NodeId {
        self.literal(LiteralKind::Default, None)
    }

    /// Numeric literal of the given type.
    pub fn number(&mut self, ty: SymbolId) -> NodeId {
        self.literal(LiteralKind::Number, Some(ty))
    }

    pub fn string_literal(&mut self) -> NodeId {
        let string = self.seeds.string;
        self.literal(LiteralKind::String, Some(string))
    }

    pub fn boolean_literal(&mut self) -> NodeId {
        let boolean = self.seeds.boolean;
        self.literal(LiteralKind::Boolean, Some(boolean))
    }

    fn literal(&mut self, literal: LiteralKind, ty: Option<SymbolId>) -> NodeId {
        self.node(NodeKind::Literal { literal }, None, ty)
    }

    /// `new ty()`
    pub fn new_object(&mut self, ty: SymbolId) -> NodeId {
        self.node(NodeKind::ObjectCreation { arguments: vec![] }, None, Some(ty))
    }

    /// `new Mock<ty>(args)`
    pub fn new_mock(&mut self, ty: SymbolId, args: &[NodeId]) -> NodeId {
        let mock = self.mock_type(ty);
        let mut arguments = Vec::with_capacity(args.len());
        for arg in args {
            arguments.push(self.argument(*arg));
        }
        self.node(NodeKind::ObjectCreation { arguments }, None, Some(mock))
    }

    /// `MockBehavior.<name>`
    pub fn behavior(&mut self, name: &str) -> NodeId {
        let behavior = self.seeds.behavior;
        let field = self.behavior_field(name);
        let receiver = self.type_name(behavior);
        self.member(receiver, field)
    }

    /// `It.IsAny<ty>()`
    pub fn it_is_any(&mut self, ty: SymbolId) -> NodeId {
        self.it_matcher("IsAny", ty, false)
    }

    /// `It.Is<ty>(x => true)`
    pub fn it_is(&mut self, ty: SymbolId) -> NodeId {
        self.it_matcher("Is", ty, true)
    }

    /// `It.IsNotNull<ty>()`
    pub fn it_is_not_null(&mut self, ty: SymbolId) -> NodeId {
        self.it_matcher("IsNotNull", ty, false)
    }

    fn it_matcher(&mut self, name: &str, ty: SymbolId, with_predicate: bool) -> NodeId {
        let it = self.seeds.it;
        let def = self.member_named(it, name, Some(true));
        let method = construct_member(&mut self.b, def, it);
        if let Some(SymbolDetail::Method(detail)) = self.b.symbol_mut(method).map(|s| &mut s.detail)
        {
            detail.type_arguments = vec![ty];
            detail.return_type = Some(ty);
        }
        let args = if with_predicate {
            let boolean = self.seeds.boolean;
            vec![self.lambda(&[("x", ty)], Some(boolean), |fx, _| fx.boolean_literal())]
        } else {
            Vec::new()
        };
        self.static_call(it, method, &args)
    }

    /// `Times.Once()`
    pub fn times_once(&mut self) -> NodeId {
        let times = self.seeds.times;
        let once = self.member_named(times, "Once", Some(true));
        self.static_call(times, once, &[])
    }

    /// Lambda with typed parameters. `return_type` defaults to the body's type.
    pub fn lambda(
        &mut self,
        parameters: &[(&str, SymbolId)],
        return_type: Option<SymbolId>,
        body: impl FnOnce(&mut Self, &[SymbolId]) -> NodeId,
    ) -> NodeId {
        let mut parameter_symbols = Vec::with_capacity(parameters.len());
        let mut parameter_nodes = Vec::with_capacity(parameters.len());
        for (ordinal, (name, ty)) in parameters.iter().enumerate() {
            let symbol = self.b.add_symbol(
                *name,
                *name,
                SymbolDetail::Parameter(ParameterDetail {
                    type_: Some(*ty),
                    ordinal: ordinal as u32,
                }),
            );
            parameter_symbols.push(symbol);
            parameter_nodes.push(self.node(
                NodeKind::Parameter {
                    name: name.to_string(),
                },
                Some(symbol),
                Some(*ty),
            ));
        }
        let body = body(self, &parameter_symbols);
        let return_type = return_type.or_else(|| self.node_type(body));
        let method = self.b.add_symbol(
            "lambda",
            "lambda",
            SymbolDetail::Method(MethodDetail {
                method_kind: MethodKind::Lambda,
                parameters: parameter_symbols.clone(),
                return_type,
                type_arguments: Vec::new(),
            }),
        );
        for parameter in &parameter_symbols {
            if let Some(symbol) = self.b.symbol_mut(*parameter) {
                symbol.container = Some(method);
            }
        }
        self.node(
            NodeKind::Lambda {
                parameters: parameter_nodes,
                body,
            },
            Some(method),
            None,
        )
    }

    /// `m => body(m)` over the mocked type.
    fn mock_lambda(
        &mut self,
        parameter: &str,
        mocked: SymbolId,
        body: impl FnOnce(&mut Self, NodeId) -> NodeId,
    ) -> NodeId {
        self.lambda(&[(parameter, mocked)], None, |fx, params| {
            let m = fx.ident(params[0]);
            body(fx, m)
        })
    }

    /// `(params) => { }`
    pub fn statement_lambda(&mut self, parameters: &[(&str, SymbolId)]) -> NodeId {
        let void = self.seeds.void;
        self.lambda(parameters, Some(void), |fx, _| {
            fx.node(NodeKind::Block { statements: vec![] }, None, None)
        })
    }

    // ========================================================================
    // Statements and bodies
    // ========================================================================

    fn push_statement(&mut self, statement: NodeId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(statement);
        }
    }

    /// `expression;`
    pub fn statement(&mut self, expression: NodeId) -> NodeId {
        let statement = self.node(NodeKind::ExpressionStatement { expression }, None, None);
        self.push_statement(statement);
        statement
    }

    /// `var name = initializer;` Returns the local.
    pub fn declare(&mut self, name: &str, initializer: NodeId) -> SymbolId {
        let ty = self.node_type(initializer);
        let local = self
            .b
            .add_symbol(name, name, SymbolDetail::Local(LocalDetail { type_: ty }));
        let declaration = self.node(
            NodeKind::LocalDeclaration {
                name: name.to_string(),
                initializer: Some(initializer),
            },
            Some(local),
            ty,
        );
        self.push_statement(declaration);
        local
    }

    /// `var name = new Mock<ty>();`
    pub fn mock_local(&mut self, name: &str, ty: SymbolId) -> SymbolId {
        let creation = self.new_mock(ty, &[]);
        self.declare(name, creation)
    }

    /// `var name = new Mock<ty>(MockBehavior.Strict);`
    pub fn strict_mock_local(&mut self, name: &str, ty: SymbolId) -> SymbolId {
        let strict = self.behavior("Strict");
        let creation = self.new_mock(ty, &[strict]);
        self.declare(name, creation)
    }

    /// A field typed `Mock<ty>` on the test class, assigned nowhere.
    pub fn mock_field(&mut self, name: &str, ty: SymbolId) -> SymbolId {
        let mock = self.mock_type(ty);
        self.b.add_symbol(
            name,
            format!("Demo.Tests.{}", name),
            SymbolDetail::Field(FieldDetail { type_: mock }),
        )
    }

    /// Start a new method; statements go there from now on.
    pub fn begin_method(&mut self, name: &str) {
        self.end_method();
        self.method_name = name.to_string();
        self.scopes = vec![Vec::new()];
    }

    fn end_method(&mut self) {
        let statements = self.scopes.first_mut().map(std::mem::take).unwrap_or_default();
        if statements.is_empty() {
            return;
        }
        let block = self.node(NodeKind::Block { statements }, None, None);
        let method = self.node(
            NodeKind::MethodDeclaration {
                name: self.method_name.clone(),
                parameters: vec![],
                body: Some(block),
            },
            None,
            None,
        );
        self.methods.push(method);
    }

    fn nested_block(&mut self, body: impl FnOnce(&mut Self)) -> NodeId {
        self.scopes.push(Vec::new());
        body(self);
        let statements = self.scopes.pop().unwrap_or_default();
        self.node(NodeKind::Block { statements }, None, None)
    }

    /// `void name() { body }` inside the current body.
    pub fn local_function(&mut self, name: &str, body: impl FnOnce(&mut Self)) -> NodeId {
        let block = self.nested_block(body);
        let function = self.node(
            NodeKind::LocalFunction {
                name: name.to_string(),
                parameters: vec![],
                body: Some(block),
            },
            None,
            None,
        );
        self.push_statement(function);
        function
    }

    /// `Run(() => { body });` inside the current body. Returns the lambda.
    pub fn in_lambda(&mut self, body: impl FnOnce(&mut Self)) -> NodeId {
        let block = self.nested_block(body);
        let void = self.seeds.void;
        let method = self.b.add_symbol(
            "lambda",
            "lambda",
            SymbolDetail::Method(MethodDetail {
                method_kind: MethodKind::Lambda,
                parameters: vec![],
                return_type: Some(void),
                type_arguments: vec![],
            }),
        );
        let lambda = self.node(
            NodeKind::Lambda {
                parameters: vec![],
                body: block,
            },
            Some(method),
            None,
        );
        let argument = self.argument(lambda);
        let run = self.node(NodeKind::Identifier { name: "Run".into() }, None, None);
        let call = self.node(
            NodeKind::Invocation {
                expression: run,
                arguments: vec![argument],
            },
            None,
            None,
        );
        self.statement(call);
        lambda
    }

    // ========================================================================
    // Moq calls
    // ========================================================================

    /// `mock.Setup(m => body(m))`
    pub fn setup(
        &mut self,
        mock: SymbolId,
        body: impl FnOnce(&mut Self, NodeId) -> NodeId,
    ) -> NodeId {
        self.setup_named(mock, "Setup", body)
    }

    /// `mock.<SetupGet|SetupSet|SetupSequence>(m => body(m))`
    pub fn setup_named(
        &mut self,
        mock: SymbolId,
        method: &str,
        body: impl FnOnce(&mut Self, NodeId) -> NodeId,
    ) -> NodeId {
        self.mock_lambda_call(mock, method, "m", body, None)
    }

    fn mock_lambda_call(
        &mut self,
        mock: SymbolId,
        method: &str,
        parameter: &str,
        body: impl FnOnce(&mut Self, NodeId) -> NodeId,
        extra: Option<NodeId>,
    ) -> NodeId {
        let mocked = self.mocked_type(mock);
        let lambda = self.mock_lambda(parameter, mocked, body);
        let method = self.mock_method(mocked, method);
        let receiver = self.ident(mock);
        let mut args = vec![lambda];
        args.extend(extra);
        self.call(receiver, method, &args)
    }

    /// `previous.Callback((params) => { })`
    pub fn callback(&mut self, previous: NodeId, parameters: &[(&str, SymbolId)]) -> NodeId {
        let lambda = self.statement_lambda(parameters);
        let callback = self.seeds.callback;
        self.call(previous, callback, &[lambda])
    }

    /// `previous.Returns(<literal of ty>)`
    pub fn returns_value(&mut self, previous: NodeId, ty: SymbolId) -> NodeId {
        let value = self.number(ty);
        let returns = self.seeds.returns;
        self.call(previous, returns, &[value])
    }

    /// `previous.Returns((params) => <value of return_type>)`
    pub fn returns_lambda(
        &mut self,
        previous: NodeId,
        parameters: &[(&str, SymbolId)],
        return_type: SymbolId,
    ) -> NodeId {
        let lambda = self.lambda(parameters, Some(return_type), |fx, _| fx.number(return_type));
        let returns = self.seeds.returns;
        self.call(previous, returns, &[lambda])
    }

    /// `previous.ReturnsAsync((params) => <value of return_type>)`
    pub fn returns_async_lambda(
        &mut self,
        previous: NodeId,
        parameters: &[(&str, SymbolId)],
        return_type: SymbolId,
    ) -> NodeId {
        let lambda = self.lambda(parameters, Some(return_type), |fx, _| fx.number(return_type));
        let returns_async = self.seeds.returns_async;
        self.call(previous, returns_async, &[lambda])
    }

    /// `previous.Throws(new Exception())`
    pub fn throws(&mut self, previous: NodeId) -> NodeId {
        let object = self.seeds.object;
        let exception = self.new_object(object);
        let throws = self.seeds.throws;
        self.call(previous, throws, &[exception])
    }

    /// `previous.CallBase()`
    pub fn call_base(&mut self, previous: NodeId) -> NodeId {
        let call_base = self.seeds.call_base;
        self.call(previous, call_base, &[])
    }

    /// `previous.Verifiable()`
    pub fn verifiable(&mut self, previous: NodeId) -> NodeId {
        let verifiable = self.seeds.verifiable;
        self.call(previous, verifiable, &[])
    }

    /// `mock.Verify(m => body(m)[, times])`
    pub fn verify(
        &mut self,
        mock: SymbolId,
        body: impl FnOnce(&mut Self, NodeId) -> NodeId,
        times: Option<NodeId>,
    ) -> NodeId {
        self.mock_lambda_call(mock, "Verify", "m", body, times)
    }

    /// Like [`MoqFixture::verify`] with a different lambda parameter name.
    pub fn verify_with_param_name(
        &mut self,
        mock: SymbolId,
        parameter: &str,
        body: impl FnOnce(&mut Self, NodeId) -> NodeId,
        times: Option<NodeId>,
    ) -> NodeId {
        self.mock_lambda_call(mock, "Verify", parameter, body, times)
    }

    /// `mock.Verify()`
    pub fn verify_empty(&mut self, mock: SymbolId) -> NodeId {
        let verify = self.member_named(self.seeds.mock_base, "Verify", Some(false));
        let receiver = self.ident(mock);
        self.call(receiver, verify, &[])
    }

    /// `mock.VerifyAll()`
    pub fn verify_all(&mut self, mock: SymbolId) -> NodeId {
        let verify_all = self.member_named(self.seeds.mock_base, "VerifyAll", Some(false));
        let receiver = self.ident(mock);
        self.call(receiver, verify_all, &[])
    }

    /// `Mock.<Verify|VerifyAll>(mocks...)`
    pub fn static_verify(&mut self, name: &str, mocks: &[SymbolId]) -> NodeId {
        let method = self.static_mock_method(name);
        let mut args = Vec::with_capacity(mocks.len());
        for mock in mocks {
            args.push(self.ident(*mock));
        }
        let base = self.seeds.mock_base;
        self.static_call(base, method, &args)
    }

    /// `mock.Raise(m => m.event += null, args)`
    pub fn raise(&mut self, mock: SymbolId, event: SymbolId, args: &[NodeId]) -> NodeId {
        self.raise_with(mock, event, AssignmentOperator::AddAssign, args)
    }

    /// `mock.Raise(m => m.member <op> null, args)` for any member.
    pub fn raise_with(
        &mut self,
        mock: SymbolId,
        member: SymbolId,
        operator: AssignmentOperator,
        args: &[NodeId],
    ) -> NodeId {
        let mocked = self.mocked_type(mock);
        let lambda = self.subscription_lambda(mocked, member, operator);
        let raise = self.mock_method(mocked, "Raise");
        let receiver = self.ident(mock);
        let mut all = vec![lambda];
        all.extend_from_slice(args);
        self.call(receiver, raise, &all)
    }

    /// `previous.Raises(m => m.event += null, args)`
    pub fn raises(
        &mut self,
        previous: NodeId,
        mocked: SymbolId,
        event: SymbolId,
        args: &[NodeId],
    ) -> NodeId {
        let lambda = self.subscription_lambda(mocked, event, AssignmentOperator::AddAssign);
        let raises = self.seeds.raises;
        let mut all = vec![lambda];
        all.extend_from_slice(args);
        self.call(previous, raises, &all)
    }

    fn subscription_lambda(
        &mut self,
        mocked: SymbolId,
        member: SymbolId,
        operator: AssignmentOperator,
    ) -> NodeId {
        self.mock_lambda("m", mocked, |fx, m| {
            let target = fx.member(m, member);
            let value = fx.null();
            fx.node(
                NodeKind::Assignment {
                    target,
                    operator,
                    value,
                },
                None,
                None,
            )
        })
    }

    /// `mock.As<ty>()`
    pub fn as_(&mut self, mock: SymbolId, ty: SymbolId) -> NodeId {
        let mocked = self.mocked_type(mock);
        let def = self.member_named(self.seeds.mock_def, "As", Some(false));
        let mock_type = self.mock_type(mocked);
        let method = construct_member(&mut self.b, def, mock_type);
        if let Some(SymbolDetail::Method(detail)) = self.b.symbol_mut(method).map(|s| &mut s.detail)
        {
            detail.type_arguments = vec![ty];
        }
        let receiver = self.ident(mock);
        self.call(receiver, method, &[])
    }
}

// ============================================================================
// Seeding
// ============================================================================

fn add_type(
    b: &mut CompilationBuilder,
    name: &str,
    qualified_name: &str,
    kind: TypeKind,
    base: Option<SymbolId>,
) -> SymbolId {
    let mut detail = TypeDetail::new(kind);
    detail.base_type = base;
    b.add_symbol(name, qualified_name, SymbolDetail::Type(detail))
}

fn add_method(
    b: &mut CompilationBuilder,
    owner: SymbolId,
    name: &str,
    parameters: &[(&str, SymbolId)],
    return_type: Option<SymbolId>,
    method_kind: MethodKind,
) -> SymbolId {
    let owner_name = b
        .symbol(owner)
        .map(|s| s.qualified_name.clone())
        .unwrap_or_default();
    let mut parameter_symbols = Vec::with_capacity(parameters.len());
    for (ordinal, (parameter, ty)) in parameters.iter().enumerate() {
        parameter_symbols.push(b.add_symbol(
            *parameter,
            *parameter,
            SymbolDetail::Parameter(ParameterDetail {
                type_: Some(*ty),
                ordinal: ordinal as u32,
            }),
        ));
    }
    let method = b.add_symbol(
        name,
        format!("{}.{}", owner_name, name),
        SymbolDetail::Method(MethodDetail {
            method_kind,
            parameters: parameter_symbols.clone(),
            return_type,
            type_arguments: Vec::new(),
        }),
    );
    for parameter in parameter_symbols {
        if let Some(symbol) = b.symbol_mut(parameter) {
            symbol.container = Some(method);
        }
    }
    b.add_type_member(owner, method);
    method
}

fn add_static_method(
    b: &mut CompilationBuilder,
    owner: SymbolId,
    name: &str,
    parameters: &[(&str, SymbolId)],
    return_type: Option<SymbolId>,
) -> SymbolId {
    let method = add_method(b, owner, name, parameters, return_type, MethodKind::Ordinary);
    if let Some(symbol) = b.symbol_mut(method) {
        symbol.modifiers = Modifiers {
            is_static: true,
            ..Modifiers::default()
        };
    }
    method
}

fn set_delegate_invoke(b: &mut CompilationBuilder, delegate: SymbolId, invoke: SymbolId) {
    if let Some(SymbolDetail::Type(detail)) = b.symbol_mut(delegate).map(|s| &mut s.detail) {
        detail.delegate_invoke = Some(invoke);
    }
}

/// A constructed generic type `def<arguments>`.
fn construct_type(b: &mut CompilationBuilder, def: SymbolId, arguments: &[SymbolId]) -> SymbolId {
    let Some(definition) = b.symbol(def).cloned() else {
        return def;
    };
    let mut detail = match definition.detail {
        SymbolDetail::Type(detail) => detail,
        _ => TypeDetail::new(TypeKind::Error),
    };
    detail.type_arguments = arguments.to_vec();
    detail.members = Vec::new();
    detail.delegate_invoke = None;
    let constructed = b.add_symbol(
        definition.name,
        definition.qualified_name,
        SymbolDetail::Type(detail),
    );
    if let Some(symbol) = b.symbol_mut(constructed) {
        symbol.original_definition = Some(def);
        symbol.container = definition.container;
        symbol.modifiers = definition.modifiers;
    }
    constructed
}

/// A member of a constructed type, pointing back to its definition.
fn construct_member(b: &mut CompilationBuilder, def: SymbolId, container: SymbolId) -> SymbolId {
    let Some(definition) = b.symbol(def).cloned() else {
        return def;
    };
    let constructed = b.add_symbol(
        definition.name,
        definition.qualified_name,
        definition.detail,
    );
    if let Some(symbol) = b.symbol_mut(constructed) {
        symbol.original_definition = Some(def);
        symbol.container = Some(container);
        symbol.modifiers = definition.modifiers;
        symbol.accessibility = definition.accessibility;
    }
    constructed
}

fn seed(b: &mut CompilationBuilder) -> Seeds {
    // System
    let object = add_type(b, "Object", "System.Object", TypeKind::Class, None);
    let void = add_type(b, "Void", "System.Void", TypeKind::Struct, None);
    let int = add_type(b, "Int32", "System.Int32", TypeKind::Struct, None);
    let long = add_type(b, "Int64", "System.Int64", TypeKind::Struct, None);
    let string = add_type(b, "String", "System.String", TypeKind::Class, Some(object));
    let boolean = add_type(b, "Boolean", "System.Boolean", TypeKind::Struct, None);
    let event_args = add_type(b, "EventArgs", "System.EventArgs", TypeKind::Class, Some(object));

    let event_handler = add_type(b, "EventHandler", "System.EventHandler", TypeKind::Delegate, None);
    let invoke = add_method(
        b,
        event_handler,
        "Invoke",
        &[("sender", object), ("e", event_args)],
        Some(void),
        MethodKind::DelegateInvoke,
    );
    set_delegate_invoke(b, event_handler, invoke);

    let event_handler_def = add_type(
        b,
        "EventHandler",
        "System.EventHandler`1",
        TypeKind::Delegate,
        None,
    );
    add_type(b, "Task", "System.Threading.Tasks.Task", TypeKind::Class, Some(object));
    add_type(
        b,
        "Task",
        "System.Threading.Tasks.Task`1",
        TypeKind::Class,
        Some(object),
    );
    let nullable_def = add_type(b, "Nullable", "System.Nullable`1", TypeKind::Struct, None);

    // Moq core
    let mock_base = add_type(b, "Mock", "Moq.Mock", TypeKind::Class, Some(object));
    add_method(b, mock_base, "Verify", &[], Some(void), MethodKind::Ordinary);
    add_method(b, mock_base, "VerifyAll", &[], Some(void), MethodKind::Ordinary);
    add_static_method(b, mock_base, "Verify", &[("mocks", mock_base)], Some(void));
    add_static_method(b, mock_base, "VerifyAll", &[("mocks", mock_base)], Some(void));

    let mock_def = add_type(b, "Mock", "Moq.Mock`1", TypeKind::Class, Some(mock_base));
    for name in [
        "Setup",
        "SetupGet",
        "SetupSet",
        "SetupSequence",
        "Verify",
        "VerifyGet",
        "VerifySet",
        "Raise",
        "As",
    ] {
        add_method(
            b,
            mock_def,
            name,
            &[("expression", object)],
            Some(object),
            MethodKind::Ordinary,
        );
    }

    let behavior = add_type(b, "MockBehavior", "Moq.MockBehavior", TypeKind::Enum, None);
    for name in ["Strict", "Loose", "Default"] {
        let field = b.add_symbol(
            name,
            format!("Moq.MockBehavior.{}", name),
            SymbolDetail::Field(FieldDetail { type_: behavior }),
        );
        if let Some(symbol) = b.symbol_mut(field) {
            symbol.modifiers.is_static = true;
        }
        b.add_type_member(behavior, field);
    }

    let it = add_type(b, "It", "Moq.It", TypeKind::Class, Some(object));
    let value = add_type(b, "TValue", "TValue", TypeKind::TypeParameter, None);
    add_static_method(b, it, "IsAny", &[], Some(value));
    add_static_method(b, it, "Is", &[("match", object)], Some(value));
    add_static_method(b, it, "IsNotNull", &[], Some(value));
    let any_type = add_type(b, "IsAnyType", "Moq.It+IsAnyType", TypeKind::Class, Some(object));
    if let Some(symbol) = b.symbol_mut(any_type) {
        symbol.container = Some(it);
    }

    let times = add_type(b, "Times", "Moq.Times", TypeKind::Struct, None);
    for name in ["Once", "Never", "AtLeastOnce"] {
        add_static_method(b, times, name, &[], Some(times));
    }

    // Moq fluent interfaces
    let language = |b: &mut CompilationBuilder, ty: &str, qualified: &str, method: &str| {
        let owner = add_type(b, ty, qualified, TypeKind::Interface, None);
        let m = add_method(
            b,
            owner,
            method,
            &[("value", object)],
            Some(object),
            MethodKind::Ordinary,
        );
        if let Some(symbol) = b.symbol_mut(m) {
            symbol.modifiers.is_abstract = true;
        }
        m
    };
    let callback = language(b, "ICallback", "Moq.Language.ICallback", "Callback");
    let returns = language(b, "IReturns", "Moq.Language.IReturns`2", "Returns");
    let throws = language(b, "IThrows", "Moq.Language.IThrows", "Throws");
    let verifiable = language(b, "IVerifies", "Moq.Language.IVerifies", "Verifiable");
    let raises = language(b, "IRaise", "Moq.Language.IRaise`1", "Raises");
    let call_base = language(b, "ICallBase", "Moq.Language.ICallBase", "CallBase");

    let extensions = add_type(
        b,
        "ReturnsExtensions",
        "Moq.ReturnsExtensions",
        TypeKind::Class,
        Some(object),
    );
    let returns_async = add_static_method(
        b,
        extensions,
        "ReturnsAsync",
        &[("value", object)],
        Some(object),
    );
    add_static_method(b, extensions, "ThrowsAsync", &[("exception", object)], Some(object));

    Seeds {
        object,
        void,
        int,
        long,
        string,
        boolean,
        event_args,
        event_handler,
        event_handler_def,
        nullable_def,
        mock_base,
        mock_def,
        behavior,
        it,
        any_type,
        times,
        callback,
        returns,
        returns_async,
        throws,
        call_base,
        verifiable,
        raises,
    }
}
