//! Type and multiplicity expressions for generic inference.
//!
//! This crate defines the expressions the inference engine solves over:
//! type parameters, concrete class types carrying type and multiplicity
//! arguments, function types, relation types and type-level operations.
//! These are the *declared* shapes produced by metamodel resolution; the
//! engine in `gmi-infer` binds their parameters against observed types.
//!
//! The [`TypeSystem`] trait is the narrow interface through which the
//! engine consults the metamodel (subtyping, common supertypes, relation
//! column algebra). [`Metamodel`] is an in-memory implementation of it.

pub mod metamodel;

use std::collections::BTreeMap;
use std::fmt;

pub use metamodel::{ClassDecl, Metamodel};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identity of a class, enumeration or primitive, by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawType(String);

impl RawType {
    /// The universal supertype.
    pub const TOP: &'static str = "Any";
    /// The uninhabited type.
    pub const BOTTOM: &'static str = "Nil";
    /// Root class of every function value.
    pub const FUNCTION: &'static str = "Function";

    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn top() -> Self {
        Self::new(Self::TOP)
    }

    pub fn bottom() -> Self {
        Self::new(Self::BOTTOM)
    }

    pub fn function() -> Self {
        Self::new(Self::FUNCTION)
    }

    pub fn path(&self) -> &str {
        &self.0
    }

    pub fn is_top(&self) -> bool {
        self.0 == Self::TOP
    }

    pub fn is_bottom(&self) -> bool {
        self.0 == Self::BOTTOM
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A relation column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub String);

impl Label {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Type parameters
// ---------------------------------------------------------------------------

/// How a type parameter behaves when two concrete values meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Variance {
    /// Values merge upward toward a common supertype.
    #[default]
    Covariant,
    /// Values must already agree; anything else degrades to the top type.
    Invariant,
}

/// A declared type parameter, as it appears inside a template expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeParam {
    pub name: String,
    pub variance: Variance,
}

impl TypeParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Covariant,
        }
    }

    pub fn invariant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Invariant,
        }
    }
}

// ---------------------------------------------------------------------------
// Multiplicities
// ---------------------------------------------------------------------------

/// A cardinality annotation: a concrete bound pair or a named parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Multiplicity {
    /// `upper = None` means unbounded.
    Concrete { lower: u32, upper: Option<u32> },
    Param(String),
}

impl Multiplicity {
    pub fn range(lower: u32, upper: Option<u32>) -> Self {
        Multiplicity::Concrete { lower, upper }
    }

    /// `[1]`
    pub fn one() -> Self {
        Self::range(1, Some(1))
    }

    /// `[0..1]`
    pub fn zero_one() -> Self {
        Self::range(0, Some(1))
    }

    /// `[*]`
    pub fn many() -> Self {
        Self::range(0, None)
    }

    /// `[1..*]`
    pub fn one_many() -> Self {
        Self::range(1, None)
    }

    pub fn param(name: impl Into<String>) -> Self {
        Multiplicity::Param(name.into())
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, Multiplicity::Concrete { .. })
    }

    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            Multiplicity::Param(name) => Some(name),
            Multiplicity::Concrete { .. } => None,
        }
    }

    /// Whether every cardinality accepted by `other` is accepted by `self`.
    ///
    /// Parameters subsume only themselves.
    pub fn subsumes(&self, other: &Multiplicity) -> bool {
        match (self, other) {
            (
                Multiplicity::Concrete { lower, upper },
                Multiplicity::Concrete {
                    lower: other_lower,
                    upper: other_upper,
                },
            ) => {
                let upper_ok = match (upper, other_upper) {
                    (None, _) => true,
                    (Some(_), None) => false,
                    (Some(u), Some(o)) => u >= o,
                };
                lower <= other_lower && upper_ok
            }
            _ => self == other,
        }
    }

    pub fn substitute(&self, muls: &BTreeMap<String, Multiplicity>) -> Multiplicity {
        match self {
            Multiplicity::Param(name) => muls.get(name).cloned().unwrap_or_else(|| self.clone()),
            concrete => concrete.clone(),
        }
    }

    /// Render without the surrounding brackets, as used in argument lists.
    pub fn bare(&self) -> String {
        match self {
            Multiplicity::Param(name) => name.clone(),
            Multiplicity::Concrete { lower, upper } => match upper {
                Some(upper) if upper == lower => format!("{lower}"),
                Some(upper) => format!("{lower}..{upper}"),
                None if *lower == 0 => "*".to_string(),
                None => format!("{lower}..*"),
            },
        }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.bare())
    }
}

// ---------------------------------------------------------------------------
// Type expressions
// ---------------------------------------------------------------------------

/// A class/primitive applied to its type and multiplicity arguments.
///
/// Both argument lists have the length fixed by the raw type's declared
/// arity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConcreteType {
    pub raw: RawType,
    pub type_args: Vec<TypeExpr>,
    pub mul_args: Vec<Multiplicity>,
}

impl ConcreteType {
    pub fn new(raw: RawType, type_args: Vec<TypeExpr>, mul_args: Vec<Multiplicity>) -> Self {
        Self {
            raw,
            type_args,
            mul_args,
        }
    }

    pub fn is_fully_concrete(&self) -> bool {
        self.type_args.iter().all(TypeExpr::is_fully_concrete)
            && self.mul_args.iter().all(Multiplicity::is_concrete)
    }

    pub fn substitute(
        &self,
        types: &BTreeMap<String, TypeExpr>,
        muls: &BTreeMap<String, Multiplicity>,
    ) -> ConcreteType {
        ConcreteType {
            raw: self.raw.clone(),
            type_args: self
                .type_args
                .iter()
                .map(|arg| arg.substitute(types, muls))
                .collect(),
            mul_args: self.mul_args.iter().map(|m| m.substitute(muls)).collect(),
        }
    }
}

/// Function type: `{P1[m1], P2[m2]->R[r]}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<(TypeExpr, Multiplicity)>,
    pub ret: Box<TypeExpr>,
    pub ret_mul: Multiplicity,
}

impl FunctionType {
    pub fn new(params: Vec<(TypeExpr, Multiplicity)>, ret: TypeExpr, ret_mul: Multiplicity) -> Self {
        Self {
            params,
            ret: Box::new(ret),
            ret_mul,
        }
    }
}

/// A named relation column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    pub name: Label,
    pub ty: TypeExpr,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: Label::new(name),
            ty,
        }
    }
}

/// A structural relation type.
///
/// Unlike record rows, columns keep their declaration order: alignment and
/// concatenation are order-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationType {
    pub columns: Vec<Column>,
}

impl RelationType {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn column(&self, name: &Label) -> Option<&Column> {
        self.columns.iter().find(|c| &c.name == name)
    }

    pub fn has(&self, name: &Label) -> bool {
        self.column(name).is_some()
    }
}

/// Binary type-level combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    /// Column-set concatenation (`T+U`).
    Union,
    /// Column-set difference (`T-U`).
    Difference,
    /// `T` is a column subset of `U` (`T⊆U`).
    Subset,
    /// `T` is the same relation as `U` (`T=U`).
    Equal,
}

impl OperationKind {
    pub fn symbol(self) -> &'static str {
        match self {
            OperationKind::Union => "+",
            OperationKind::Difference => "-",
            OperationKind::Subset => "⊆",
            OperationKind::Equal => "=",
        }
    }
}

/// A type whose value is computed by combining two (possibly open) types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeOperation {
    pub kind: OperationKind,
    pub left: Box<TypeExpr>,
    pub right: Box<TypeExpr>,
}

/// A type expression, as declared at a signature position or observed at a
/// call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Param(TypeParam),
    Concrete(ConcreteType),
    Function(FunctionType),
    Relation(RelationType),
    Operation(TypeOperation),
}

impl TypeExpr {
    pub fn param(name: impl Into<String>) -> Self {
        TypeExpr::Param(TypeParam::new(name))
    }

    pub fn invariant_param(name: impl Into<String>) -> Self {
        TypeExpr::Param(TypeParam::invariant(name))
    }

    /// A raw type with no arguments (`String`, `Integer`, ...).
    pub fn class(path: impl Into<String>) -> Self {
        TypeExpr::Concrete(ConcreteType::new(RawType::new(path), Vec::new(), Vec::new()))
    }

    pub fn generic(path: impl Into<String>, type_args: Vec<TypeExpr>) -> Self {
        TypeExpr::Concrete(ConcreteType::new(RawType::new(path), type_args, Vec::new()))
    }

    pub fn generic_with_muls(
        path: impl Into<String>,
        type_args: Vec<TypeExpr>,
        mul_args: Vec<Multiplicity>,
    ) -> Self {
        TypeExpr::Concrete(ConcreteType::new(RawType::new(path), type_args, mul_args))
    }

    pub fn top() -> Self {
        Self::class(RawType::TOP)
    }

    pub fn bottom() -> Self {
        Self::class(RawType::BOTTOM)
    }

    pub fn function(
        params: Vec<(TypeExpr, Multiplicity)>,
        ret: TypeExpr,
        ret_mul: Multiplicity,
    ) -> Self {
        TypeExpr::Function(FunctionType::new(params, ret, ret_mul))
    }

    pub fn relation(columns: Vec<(&str, TypeExpr)>) -> Self {
        TypeExpr::Relation(RelationType::new(
            columns
                .into_iter()
                .map(|(name, ty)| Column::new(name, ty))
                .collect(),
        ))
    }

    pub fn operation(kind: OperationKind, left: TypeExpr, right: TypeExpr) -> Self {
        TypeExpr::Operation(TypeOperation {
            kind,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// The expression has a raw identity at its head: it is neither a
    /// parameter nor an operation. Arguments may still be open.
    pub fn is_concrete(&self) -> bool {
        !matches!(self, TypeExpr::Param(_) | TypeExpr::Operation(_))
    }

    /// No parameter occurs anywhere in the expression.
    pub fn is_fully_concrete(&self) -> bool {
        match self {
            TypeExpr::Param(_) | TypeExpr::Operation(_) => false,
            TypeExpr::Concrete(ct) => ct.is_fully_concrete(),
            TypeExpr::Function(ft) => {
                ft.params
                    .iter()
                    .all(|(ty, mul)| ty.is_fully_concrete() && mul.is_concrete())
                    && ft.ret.is_fully_concrete()
                    && ft.ret_mul.is_concrete()
            }
            TypeExpr::Relation(rel) => rel.columns.iter().all(|c| c.ty.is_fully_concrete()),
        }
    }

    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Param(p) => Some(&p.name),
            _ => None,
        }
    }

    pub fn raw_type(&self) -> Option<&RawType> {
        match self {
            TypeExpr::Concrete(ct) => Some(&ct.raw),
            _ => None,
        }
    }

    pub fn is_top(&self) -> bool {
        self.raw_type().is_some_and(RawType::is_top)
    }

    pub fn is_bottom(&self) -> bool {
        self.raw_type().is_some_and(RawType::is_bottom)
    }

    /// Replace parameters by the given bindings. Unbound parameters stay.
    pub fn substitute(
        &self,
        types: &BTreeMap<String, TypeExpr>,
        muls: &BTreeMap<String, Multiplicity>,
    ) -> TypeExpr {
        match self {
            TypeExpr::Param(p) => types.get(&p.name).cloned().unwrap_or_else(|| self.clone()),
            TypeExpr::Concrete(ct) => TypeExpr::Concrete(ct.substitute(types, muls)),
            TypeExpr::Function(ft) => TypeExpr::Function(FunctionType {
                params: ft
                    .params
                    .iter()
                    .map(|(ty, mul)| (ty.substitute(types, muls), mul.substitute(muls)))
                    .collect(),
                ret: Box::new(ft.ret.substitute(types, muls)),
                ret_mul: ft.ret_mul.substitute(muls),
            }),
            TypeExpr::Relation(rel) => TypeExpr::Relation(RelationType {
                columns: rel
                    .columns
                    .iter()
                    .map(|c| Column {
                        name: c.name.clone(),
                        ty: c.ty.substitute(types, muls),
                    })
                    .collect(),
            }),
            TypeExpr::Operation(op) => TypeExpr::Operation(TypeOperation {
                kind: op.kind,
                left: Box::new(op.left.substitute(types, muls)),
                right: Box::new(op.right.substitute(types, muls)),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Display (modelling-language notation)
// ---------------------------------------------------------------------------

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Param(p) => write!(f, "{}", p.name),
            TypeExpr::Concrete(ct) => write!(f, "{ct}"),
            TypeExpr::Function(ft) => write!(f, "{ft}"),
            TypeExpr::Relation(rel) => write!(f, "{rel}"),
            TypeExpr::Operation(op) => write!(f, "{}{}{}", op.left, op.kind.symbol(), op.right),
        }
    }
}

impl fmt::Display for ConcreteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)?;
        if self.type_args.is_empty() && self.mul_args.is_empty() {
            return Ok(());
        }
        write!(f, "<")?;
        for (idx, arg) in self.type_args.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        if !self.mul_args.is_empty() {
            write!(f, "|")?;
            for (idx, mul) in self.mul_args.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", mul.bare())?;
            }
        }
        write!(f, ">")
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, (ty, mul)) in self.params.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}{mul}")?;
        }
        write!(f, "->{}{}}}", self.ret, self.ret_mul)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", column.name, column.ty)?;
        }
        write!(f, ")")
    }
}

// ---------------------------------------------------------------------------
// Type system interface
// ---------------------------------------------------------------------------

/// What `common_supertype` does when the only common supertype is `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Degrade,
    Error,
}

/// No common supertype other than the top type exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no common supertype for `{}`", .types.join("`, `"))]
pub struct TypeConflict {
    pub types: Vec<String>,
}

/// Metamodel queries the inference engine depends on.
///
/// Implementations own the class hierarchy; the engine never inspects
/// declarations directly.
pub trait TypeSystem {
    /// Reflexive subtype test over raw identities.
    fn is_subtype_of(&self, sub: &RawType, sup: &RawType) -> bool;

    fn is_function_class(&self, raw: &RawType) -> bool {
        self.is_subtype_of(raw, &RawType::function())
    }

    /// Most specific common supertype of `types`.
    fn common_supertype(
        &self,
        types: &[TypeExpr],
        variance: Variance,
        policy: ConflictPolicy,
    ) -> Result<TypeExpr, TypeConflict>;

    /// Smallest multiplicity accepting every element of `muls`.
    fn min_subsuming_multiplicity(&self, muls: &[Multiplicity]) -> Multiplicity;

    /// Pair up columns of `values` and `templates`. The two returned lists
    /// have equal length; element `i` of each belongs together.
    fn align_columns(&self, values: &[Column], templates: &[Column]) -> (Vec<Column>, Vec<Column>);

    fn can_concatenate(&self, left: &RelationType, right: &RelationType) -> bool;

    fn concatenate(&self, left: &RelationType, right: &RelationType) -> RelationType;

    /// The arguments of `ty` expressed as arguments of its ancestor class
    /// `ancestor`, or `None` when `ancestor` is not reachable.
    fn inherited_arguments(
        &self,
        ty: &ConcreteType,
        ancestor: &RawType,
    ) -> Option<(Vec<TypeExpr>, Vec<Multiplicity>)>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
