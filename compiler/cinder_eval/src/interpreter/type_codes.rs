//! Declared types and their resolved method plans.
//!
//! When a composite is declared, every method is resolved once into a
//! `MethodPlan`: the body to run (the composite's own, or an interface
//! default) and the ordered list of condition sources it must check. The
//! registry is shared by an interpreter and all of its sub-interpreters, so
//! imported types resolve to the same code.

use std::rc::Rc;

use cinder_ir::ast::{CompositeDecl, FunctionDecl, InterfaceDecl};
use cinder_ir::{CompositeKind, IntegerKind, Location, Name, TypeId};
use rustc_hash::FxHashMap;

use crate::environment::ScopeRef;
use crate::subtyping::Conformances;
use crate::value::CompositeValue;

/// Where a function body or condition was declared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// The composite itself.
    Own,
    /// An interface the composite conforms to.
    Interface(TypeId),
}

/// A function declaration together with the scope and program it belongs to.
#[derive(Clone, Debug)]
pub struct FunctionSource {
    pub decl: Rc<FunctionDecl>,
    pub origin: Origin,
    pub scope: ScopeRef,
    pub location: Location,
}

impl FunctionSource {
    pub fn is_interface_default(&self) -> bool {
        matches!(self.origin, Origin::Interface(_))
    }
}

/// Conditions contributed by one declaration.
pub type ConditionSource = FunctionSource;

/// A method resolved against the composite's conformances.
#[derive(Debug)]
pub struct MethodPlan {
    pub name: Name,
    /// `Type.method`, for call frames and logs.
    pub qualified_name: String,
    pub body: FunctionSource,
    /// Own conditions first, then inherited ones in conformance order.
    pub conditions: Vec<ConditionSource>,
}

impl MethodPlan {
    pub fn signature(&self) -> &FunctionDecl {
        &self.body.decl
    }
}

/// Resolved destruction behavior of a resource type.
#[derive(Debug, Default)]
pub struct DestructorPlan {
    /// Interface default destructors with bodies, in conformance order.
    /// Each checks its own conditions.
    pub defaults: Vec<FunctionSource>,
    /// The concrete destructor, with inherited body-less conditions.
    pub concrete: Option<Rc<MethodPlan>>,
}

#[derive(Debug)]
pub struct InterfaceCode {
    pub type_id: TypeId,
    pub kind: CompositeKind,
    pub location: Location,
    pub decl: Rc<InterfaceDecl>,
    /// Transitive conformances.
    pub conformances: Vec<TypeId>,
    pub scope: ScopeRef,
}

#[derive(Debug)]
pub struct CompositeCode {
    pub type_id: TypeId,
    pub kind: CompositeKind,
    pub location: Location,
    pub decl: Rc<CompositeDecl>,
    /// Transitive conformances, in declaration order.
    pub conformances: Vec<TypeId>,
    pub initializer: Option<Rc<MethodPlan>>,
    pub destructor: DestructorPlan,
    pub methods: FxHashMap<Name, Rc<MethodPlan>>,
    pub scope: ScopeRef,
    /// Enum cases by name, in declaration order.
    pub enum_cases: Vec<(Name, CompositeValue)>,
    pub enum_raw_type: Option<IntegerKind>,
}

impl CompositeCode {
    pub fn method(&self, name: Name) -> Option<Rc<MethodPlan>> {
        self.methods.get(&name).cloned()
    }

    pub fn enum_case(&self, name: Name) -> Option<CompositeValue> {
        self.enum_cases
            .iter()
            .find(|(case, _)| *case == name)
            .map(|(_, value)| value.clone())
    }
}

/// All composite and interface types known to an interpreter tree.
#[derive(Default)]
pub struct TypeRegistry {
    composites: FxHashMap<TypeId, Rc<CompositeCode>>,
    interfaces: FxHashMap<TypeId, Rc<InterfaceCode>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn composite(&self, type_id: &TypeId) -> Option<Rc<CompositeCode>> {
        self.composites.get(type_id).cloned()
    }

    pub fn interface(&self, type_id: &TypeId) -> Option<Rc<InterfaceCode>> {
        self.interfaces.get(type_id).cloned()
    }

    pub fn insert_composite(&mut self, code: Rc<CompositeCode>) {
        self.composites.insert(code.type_id.clone(), code);
    }

    pub fn insert_interface(&mut self, code: Rc<InterfaceCode>) {
        self.interfaces.insert(code.type_id.clone(), code);
    }

    /// `direct` followed by everything those interfaces inherit, without
    /// duplicates. Unknown interfaces are kept but contribute nothing.
    pub fn transitive_conformances(&self, direct: &[TypeId]) -> Vec<TypeId> {
        let mut result: Vec<TypeId> = Vec::new();
        let mut pending: Vec<TypeId> = direct.iter().rev().cloned().collect();
        while let Some(next) = pending.pop() {
            if result.contains(&next) {
                continue;
            }
            if let Some(interface) = self.interfaces.get(&next) {
                pending.extend(interface.conformances.iter().rev().cloned());
            }
            result.push(next);
        }
        result
    }

    /// Build the method plans of a composite.
    ///
    /// Own methods take precedence over interface defaults; the first
    /// interface in conformance order that provides a default wins.
    pub fn plan_methods(
        &self,
        qualified: &str,
        own: &[Rc<FunctionDecl>],
        conformances: &[TypeId],
        scope: &ScopeRef,
        location: &Location,
        interner: &cinder_ir::StringInterner,
    ) -> FxHashMap<Name, Rc<MethodPlan>> {
        let own_source = |decl: &Rc<FunctionDecl>| FunctionSource {
            decl: decl.clone(),
            origin: Origin::Own,
            scope: scope.clone(),
            location: location.clone(),
        };

        let mut bodies: FxHashMap<Name, FunctionSource> = FxHashMap::default();
        let mut order: Vec<Name> = Vec::new();
        for decl in own {
            if bodies.insert(decl.name, own_source(decl)).is_none() {
                order.push(decl.name);
            }
        }
        for interface in self.interface_codes(conformances) {
            for decl in &interface.decl.functions {
                if decl.body.is_some() && !bodies.contains_key(&decl.name) {
                    bodies.insert(decl.name, interface_source(&interface, decl));
                    order.push(decl.name);
                }
            }
        }

        order
            .into_iter()
            .filter_map(|name| {
                let body = bodies.remove(&name)?;
                let mut conditions = Vec::new();
                if body.origin == Origin::Own && body.decl.has_conditions() {
                    conditions.push(body.clone());
                }
                for interface in self.interface_codes(conformances) {
                    for decl in &interface.decl.functions {
                        if decl.name == name && decl.has_conditions() {
                            conditions.push(interface_source(&interface, decl));
                        }
                    }
                }
                let plan = MethodPlan {
                    name,
                    qualified_name: format!("{qualified}.{}", interner.lookup(name)),
                    body,
                    conditions,
                };
                Some((name, Rc::new(plan)))
            })
            .collect()
    }

    /// Plan a special function (initializer or destructor) whose body, if
    /// any, is the composite's own. Inherited conditions come from the
    /// matching interface declarations selected by `select`.
    pub fn plan_special(
        &self,
        name: Name,
        qualified_name: String,
        own: Option<&Rc<FunctionDecl>>,
        conformances: &[TypeId],
        scope: &ScopeRef,
        location: &Location,
        select: impl Fn(&InterfaceDecl) -> Option<&Rc<FunctionDecl>>,
        skip_bodies: bool,
    ) -> Option<Rc<MethodPlan>> {
        let body = match own {
            Some(decl) => FunctionSource {
                decl: decl.clone(),
                origin: Origin::Own,
                scope: scope.clone(),
                location: location.clone(),
            },
            None => FunctionSource {
                decl: Rc::new(FunctionDecl {
                    name,
                    parameters: Vec::new(),
                    return_type: cinder_ir::StaticType::Void,
                    pre_conditions: Vec::new(),
                    post_conditions: Vec::new(),
                    body: None,
                    span: cinder_ir::Span::DUMMY,
                }),
                origin: Origin::Own,
                scope: scope.clone(),
                location: location.clone(),
            },
        };
        let mut conditions = Vec::new();
        if own.is_some_and(|decl| decl.has_conditions()) {
            conditions.push(body.clone());
        }
        for interface in self.interface_codes(conformances) {
            if let Some(decl) = select(&interface.decl) {
                if skip_bodies && decl.body.is_some() {
                    continue;
                }
                if decl.has_conditions() {
                    conditions.push(interface_source(&interface, decl));
                }
            }
        }
        if own.is_none() && conditions.is_empty() {
            return None;
        }
        Some(Rc::new(MethodPlan {
            name,
            qualified_name,
            body,
            conditions,
        }))
    }

    /// Interface default destructors, in conformance order.
    pub fn default_destructors(&self, conformances: &[TypeId]) -> Vec<FunctionSource> {
        self.interface_codes(conformances)
            .into_iter()
            .filter_map(|interface| {
                let decl = interface.decl.destructor.as_ref()?;
                decl.body.as_ref()?;
                Some(interface_source(&interface, decl))
            })
            .collect()
    }

    fn interface_codes(&self, conformances: &[TypeId]) -> Vec<Rc<InterfaceCode>> {
        conformances
            .iter()
            .filter_map(|id| self.interfaces.get(id).cloned())
            .collect()
    }
}

fn interface_source(interface: &InterfaceCode, decl: &Rc<FunctionDecl>) -> FunctionSource {
    FunctionSource {
        decl: decl.clone(),
        origin: Origin::Interface(interface.type_id.clone()),
        scope: interface.scope.clone(),
        location: interface.location.clone(),
    }
}

impl Conformances for TypeRegistry {
    fn conforms_to(&self, ty: &TypeId, interface: &TypeId) -> bool {
        if let Some(code) = self.composites.get(ty) {
            return code.conformances.contains(interface);
        }
        self.interfaces
            .get(ty)
            .is_some_and(|code| code.conformances.contains(interface))
    }
}
