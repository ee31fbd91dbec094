//! Runtime subtyping.
//!
//! The checker has already validated every static relationship; the
//! evaluator needs subtyping only for dynamic checks: failable and force
//! casts, `isInstance`, storage reads against an expected type, and
//! reference downcasts. Nominal conformance is answered by the type registry
//! through [`Conformances`].

use cinder_ir::{FixedPointKind, NominalType, NumericSupertype, StaticType, TypeId};

/// Source of nominal interface conformances.
pub trait Conformances {
    /// Whether the composite or interface `ty` conforms to `interface`,
    /// directly or transitively.
    fn conforms_to(&self, ty: &TypeId, interface: &TypeId) -> bool;
}

/// No declared conformances; only structural relationships hold.
pub struct NoConformances;

impl Conformances for NoConformances {
    fn conforms_to(&self, _ty: &TypeId, _interface: &TypeId) -> bool {
        false
    }
}

/// Whether `sub` is a subtype of `sup`.
pub fn is_subtype(sub: &StaticType, sup: &StaticType, registry: &dyn Conformances) -> bool {
    if sub == sup {
        return true;
    }
    match (sub, sup) {
        (StaticType::Never, _) => true,
        (_, StaticType::Any) => true,
        (_, StaticType::AnyStruct) => !sub.is_resource() && !matches!(sub, StaticType::Any),
        (_, StaticType::AnyResource) => sub.is_resource(),

        (StaticType::Optional(inner), StaticType::Optional(sup_inner)) => {
            is_subtype(inner, sup_inner, registry)
        }
        (_, StaticType::Optional(sup_inner)) => is_subtype(sub, sup_inner, registry),

        (StaticType::Integer(kind), StaticType::Numeric(sup)) => match sup {
            NumericSupertype::Number | NumericSupertype::Integer => true,
            NumericSupertype::SignedNumber | NumericSupertype::SignedInteger => kind.is_signed(),
            NumericSupertype::FixedPoint | NumericSupertype::SignedFixedPoint => false,
        },
        (StaticType::FixedPoint(kind), StaticType::Numeric(sup)) => match sup {
            NumericSupertype::Number | NumericSupertype::FixedPoint => true,
            NumericSupertype::SignedNumber | NumericSupertype::SignedFixedPoint => {
                *kind == FixedPointKind::Fix64
            }
            NumericSupertype::Integer | NumericSupertype::SignedInteger => false,
        },
        (StaticType::Numeric(sub), StaticType::Numeric(sup)) => numeric_supertype_of(*sub, *sup),

        (StaticType::StoragePath | StaticType::PublicPath, StaticType::Path) => true,

        (StaticType::VariableArray(a), StaticType::VariableArray(b)) => {
            is_subtype(a, b, registry)
        }
        (StaticType::ConstantArray(a, n), StaticType::ConstantArray(b, m)) => {
            n == m && is_subtype(a, b, registry)
        }
        (StaticType::Dictionary(k1, v1), StaticType::Dictionary(k2, v2)) => {
            is_subtype(k1, k2, registry) && is_subtype(v1, v2, registry)
        }

        (StaticType::Composite(a), StaticType::Composite(b)) => a.type_id == b.type_id,
        (StaticType::Composite(a) | StaticType::Interface(a), StaticType::Interface(b)) => {
            nominal_conforms(a, b, registry)
        }
        (StaticType::Composite(a) | StaticType::Interface(a), StaticType::Intersection(set)) => {
            set.iter().all(|b| nominal_conforms(a, b, registry))
        }
        (StaticType::Intersection(set), StaticType::Interface(b)) => {
            set.iter().any(|a| nominal_conforms(a, b, registry))
        }
        (StaticType::Intersection(sub_set), StaticType::Intersection(sup_set)) => sup_set
            .iter()
            .all(|b| sub_set.iter().any(|a| nominal_conforms(a, b, registry))),

        (
            StaticType::Reference {
                authorized: sub_auth,
                referenced: sub_ty,
            },
            StaticType::Reference {
                authorized: sup_auth,
                referenced: sup_ty,
            },
        ) => (*sub_auth || !*sup_auth) && is_subtype(sub_ty, sup_ty, registry),

        (StaticType::Function(a), StaticType::Function(b)) => {
            a.parameters.len() == b.parameters.len()
                && a
                    .parameters
                    .iter()
                    .zip(&b.parameters)
                    .all(|(pa, pb)| is_subtype(pb, pa, registry))
                && is_subtype(&a.return_type, &b.return_type, registry)
        }

        _ => false,
    }
}

fn nominal_conforms(sub: &NominalType, sup: &NominalType, registry: &dyn Conformances) -> bool {
    sub.type_id == sup.type_id || registry.conforms_to(&sub.type_id, &sup.type_id)
}

fn numeric_supertype_of(sub: NumericSupertype, sup: NumericSupertype) -> bool {
    use NumericSupertype::{
        FixedPoint, Integer, Number, SignedFixedPoint, SignedInteger, SignedNumber,
    };
    matches!(
        (sub, sup),
        (_, Number)
            | (SignedInteger | SignedFixedPoint, SignedNumber)
            | (SignedInteger, Integer)
            | (SignedFixedPoint, FixedPoint)
    )
}
