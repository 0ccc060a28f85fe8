//! In-memory class hierarchy implementing [`TypeSystem`].
//!
//! Classes declare type and multiplicity parameters and generalise other
//! classes through concrete types written in terms of their own
//! parameters (`class ArrayList<T> extends List<T>`). Everything without
//! an explicit generalisation extends `Any`; `Nil` is below every class.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    Column, ConcreteType, ConflictPolicy, Multiplicity, RawType, RelationType, TypeConflict,
    TypeExpr, TypeParam, TypeSystem, Variance,
};

/// Guard against circular generalisations.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// A class (or primitive) declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub raw: RawType,
    pub type_params: Vec<TypeParam>,
    pub multiplicity_params: Vec<String>,
    /// Direct supertypes, expressed over this class's own parameters.
    pub generalizations: Vec<ConcreteType>,
}

impl ClassDecl {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            raw: RawType::new(path),
            type_params: Vec::new(),
            multiplicity_params: Vec::new(),
            generalizations: Vec::new(),
        }
    }

    pub fn with_type_params(mut self, params: Vec<TypeParam>) -> Self {
        self.type_params = params;
        self
    }

    pub fn with_multiplicity_params(mut self, params: &[&str]) -> Self {
        self.multiplicity_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Add a direct supertype. Non-concrete expressions are ignored.
    pub fn extends(mut self, supertype: TypeExpr) -> Self {
        if let TypeExpr::Concrete(ct) = supertype {
            self.generalizations.push(ct);
        }
        self
    }

    /// Map this class's parameters to the arguments of `ty`.
    fn bindings(
        &self,
        ty: &ConcreteType,
    ) -> (BTreeMap<String, TypeExpr>, BTreeMap<String, Multiplicity>) {
        let types = self
            .type_params
            .iter()
            .zip(&ty.type_args)
            .map(|(param, arg)| (param.name.clone(), arg.clone()))
            .collect();
        let muls = self
            .multiplicity_params
            .iter()
            .zip(&ty.mul_args)
            .map(|(param, arg)| (param.clone(), arg.clone()))
            .collect();
        (types, muls)
    }
}

/// Registry of class declarations.
#[derive(Debug, Clone)]
pub struct Metamodel {
    classes: BTreeMap<RawType, ClassDecl>,
}

impl Metamodel {
    /// A metamodel preloaded with the top/bottom types, primitives, `List`
    /// and the function classes.
    pub fn new() -> Self {
        let mut model = Self {
            classes: BTreeMap::new(),
        };
        for primitive in [RawType::TOP, RawType::BOTTOM, "String", "Boolean", "Number", "Date"] {
            model.define(ClassDecl::new(primitive));
        }
        model.define(ClassDecl::new("Integer").extends(TypeExpr::class("Number")));
        model.define(ClassDecl::new("Float").extends(TypeExpr::class("Number")));
        model.define(ClassDecl::new("List").with_type_params(vec![TypeParam::new("T")]));
        model.define(
            ClassDecl::new(RawType::FUNCTION).with_type_params(vec![TypeParam::new("T")]),
        );
        model.define(
            ClassDecl::new("LambdaFunction")
                .with_type_params(vec![TypeParam::new("T")])
                .extends(TypeExpr::generic(
                    RawType::FUNCTION,
                    vec![TypeExpr::param("T")],
                )),
        );
        model
    }

    pub fn define(&mut self, decl: ClassDecl) {
        self.classes.insert(decl.raw.clone(), decl);
    }

    pub fn class(&self, raw: &RawType) -> Option<&ClassDecl> {
        self.classes.get(raw)
    }

    fn direct_supertypes(&self, raw: &RawType) -> Vec<RawType> {
        if raw.is_top() {
            return Vec::new();
        }
        match self.classes.get(raw) {
            Some(decl) if !decl.generalizations.is_empty() => {
                decl.generalizations.iter().map(|g| g.raw.clone()).collect()
            }
            _ => vec![RawType::top()],
        }
    }

    /// `raw` and every class above it, nearest first.
    pub fn ancestors(&self, raw: &RawType) -> Vec<RawType> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([raw.clone()]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            queue.extend(self.direct_supertypes(&next));
            order.push(next);
        }
        order
    }

    /// The unique most specific class above both `a` and `b`.
    fn least_common_ancestor(&self, a: &RawType, b: &RawType) -> Option<RawType> {
        let above_b: BTreeSet<RawType> = self.ancestors(b).into_iter().collect();
        let common: Vec<RawType> = self
            .ancestors(a)
            .into_iter()
            .filter(|raw| above_b.contains(raw))
            .collect();
        let minimal: Vec<&RawType> = common
            .iter()
            .filter(|candidate| {
                !common
                    .iter()
                    .any(|other| other != *candidate && self.is_subtype_of(other, candidate))
            })
            .collect();
        match minimal.as_slice() {
            [only] => Some((*only).clone()),
            _ => None,
        }
    }

    fn view_as(&self, ty: &ConcreteType, ancestor: &RawType, depth: usize) -> Option<ConcreteType> {
        if &ty.raw == ancestor {
            return Some(ty.clone());
        }
        if depth > MAX_HIERARCHY_DEPTH {
            return None;
        }
        let decl = self.classes.get(&ty.raw)?;
        let (types, muls) = decl.bindings(ty);
        decl.generalizations.iter().find_map(|generalization| {
            self.view_as(&generalization.substitute(&types, &muls), ancestor, depth + 1)
        })
    }

    fn merge_pair(
        &self,
        left: &TypeExpr,
        right: &TypeExpr,
        variance: Variance,
        policy: ConflictPolicy,
        depth: usize,
    ) -> Result<TypeExpr, TypeConflict> {
        if left == right {
            return Ok(left.clone());
        }
        match (left.is_concrete(), right.is_concrete()) {
            (false, true) => return Ok(right.clone()),
            (true, false) => return Ok(left.clone()),
            (false, false) => return conflict(policy, left, right),
            (true, true) => {}
        }
        if variance == Variance::Invariant || depth > MAX_HIERARCHY_DEPTH {
            return conflict(policy, left, right);
        }
        if left.is_bottom() {
            return Ok(right.clone());
        }
        if right.is_bottom() {
            return Ok(left.clone());
        }
        let (TypeExpr::Concrete(l), TypeExpr::Concrete(r)) = (left, right) else {
            // Structural types: an open side carries less than a closed one.
            return match (left.is_fully_concrete(), right.is_fully_concrete()) {
                (false, true) => Ok(right.clone()),
                (true, false) => Ok(left.clone()),
                _ => conflict(policy, left, right),
            };
        };
        let raw = match self.least_common_ancestor(&l.raw, &r.raw) {
            Some(raw) if !raw.is_top() => raw,
            _ => return conflict(policy, left, right),
        };
        let (Some(lv), Some(rv)) = (self.view_as(l, &raw, 0), self.view_as(r, &raw, 0)) else {
            return conflict(policy, left, right);
        };
        let params = self
            .classes
            .get(&raw)
            .map(|decl| decl.type_params.clone())
            .unwrap_or_default();

        let mut type_args = Vec::with_capacity(lv.type_args.len());
        for (idx, (la, ra)) in lv.type_args.iter().zip(&rv.type_args).enumerate() {
            let arg_variance = params.get(idx).map(|p| p.variance).unwrap_or_default();
            type_args.push(self.merge_pair(la, ra, arg_variance, policy, depth + 1)?);
        }
        let mul_args = lv
            .mul_args
            .iter()
            .zip(&rv.mul_args)
            .map(|(lm, rm)| {
                if lm == rm {
                    lm.clone()
                } else {
                    self.min_subsuming_multiplicity(&[lm.clone(), rm.clone()])
                }
            })
            .collect();
        Ok(TypeExpr::Concrete(ConcreteType::new(raw, type_args, mul_args)))
    }
}

impl Default for Metamodel {
    fn default() -> Self {
        Self::new()
    }
}

fn conflict(
    policy: ConflictPolicy,
    left: &TypeExpr,
    right: &TypeExpr,
) -> Result<TypeExpr, TypeConflict> {
    match policy {
        ConflictPolicy::Degrade => Ok(TypeExpr::top()),
        ConflictPolicy::Error => Err(TypeConflict {
            types: vec![left.to_string(), right.to_string()],
        }),
    }
}

impl TypeSystem for Metamodel {
    fn is_subtype_of(&self, sub: &RawType, sup: &RawType) -> bool {
        if sub == sup || sup.is_top() || sub.is_bottom() {
            return true;
        }
        if sub.is_top() {
            return false;
        }
        self.ancestors(sub).iter().any(|raw| raw == sup)
    }

    fn common_supertype(
        &self,
        types: &[TypeExpr],
        variance: Variance,
        policy: ConflictPolicy,
    ) -> Result<TypeExpr, TypeConflict> {
        let Some((first, rest)) = types.split_first() else {
            return Ok(TypeExpr::bottom());
        };
        rest.iter().try_fold(first.clone(), |acc, ty| {
            self.merge_pair(&acc, ty, variance, policy, 0)
        })
    }

    fn min_subsuming_multiplicity(&self, muls: &[Multiplicity]) -> Multiplicity {
        if muls.is_empty() {
            return Multiplicity::range(0, Some(0));
        }
        let mut lower = u32::MAX;
        let mut upper = Some(0);
        for mul in muls {
            match mul {
                Multiplicity::Concrete { lower: lo, upper: hi } => {
                    lower = lower.min(*lo);
                    upper = match (upper, hi) {
                        (Some(current), Some(hi)) => Some(current.max(*hi)),
                        _ => None,
                    };
                }
                Multiplicity::Param(_) => {
                    if muls.iter().all(|other| other == mul) {
                        return mul.clone();
                    }
                    return Multiplicity::many();
                }
            }
        }
        Multiplicity::range(lower, upper)
    }

    fn align_columns(&self, values: &[Column], templates: &[Column]) -> (Vec<Column>, Vec<Column>) {
        templates
            .iter()
            .filter_map(|template| {
                values
                    .iter()
                    .find(|value| value.name == template.name)
                    .map(|value| (value.clone(), template.clone()))
            })
            .unzip()
    }

    fn can_concatenate(&self, left: &RelationType, right: &RelationType) -> bool {
        left.columns.iter().all(|column| {
            right
                .column(&column.name)
                .is_none_or(|other| other.ty == column.ty)
        })
    }

    fn concatenate(&self, left: &RelationType, right: &RelationType) -> RelationType {
        let mut columns = left.columns.clone();
        columns.extend(
            right
                .columns
                .iter()
                .filter(|column| !left.has(&column.name))
                .cloned(),
        );
        RelationType::new(columns)
    }

    fn inherited_arguments(
        &self,
        ty: &ConcreteType,
        ancestor: &RawType,
    ) -> Option<(Vec<TypeExpr>, Vec<Multiplicity>)> {
        self.view_as(ty, ancestor, 0)
            .map(|viewed| (viewed.type_args, viewed.mul_args))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
