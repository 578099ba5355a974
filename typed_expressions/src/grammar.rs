use core::fmt;

/// Production types of the expression grammar.
///
/// The set is closed. Subtyping is a static parent table rather than open
/// extension, so dispatch in the generator is a plain `match`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum TypeTag {
    /// Root of the hierarchy; any production is acceptable.
    Any,
    /// A free numeric constant.
    Constant,
    /// A value depending on the input variables.
    Variable,
    /// `c * x`.
    WeightedTerm,
    /// `c * x + c`.
    WeightedSum,
}

impl TypeTag {
    pub const ALL: [TypeTag; 5] = [
        TypeTag::Any,
        TypeTag::Constant,
        TypeTag::Variable,
        TypeTag::WeightedTerm,
        TypeTag::WeightedSum,
    ];

    pub const fn parent(self) -> Option<TypeTag> {
        match self {
            TypeTag::Any => None,
            TypeTag::Constant | TypeTag::Variable => Some(TypeTag::Any),
            TypeTag::WeightedTerm | TypeTag::WeightedSum => Some(TypeTag::Variable),
        }
    }

    /// Reflexive, transitive subtype check along the parent table.
    pub fn is_subtype_of(self, other: TypeTag) -> bool {
        let mut cur = Some(self);
        while let Some(t) = cur {
            if t == other {
                return true;
            }
            cur = t.parent();
        }
        false
    }

    /// Number of tree levels the generator emits when it terminates an
    /// obligation of this type: the weighted skeletons are three and two
    /// levels tall, every other terminal is a single leaf.
    pub const fn reach(self) -> usize {
        match self {
            TypeTag::WeightedSum => 3,
            TypeTag::WeightedTerm => 2,
            _ => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            TypeTag::Any => "Any",
            TypeTag::Constant => "Constant",
            TypeTag::Variable => "Variable",
            TypeTag::WeightedTerm => "WeightedTerm",
            TypeTag::WeightedSum => "WeightedSum",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::TypeTag;

    #[test]
    fn subtyping_is_reflexive_and_follows_parents() {
        for t in TypeTag::ALL {
            assert!(t.is_subtype_of(t));
            assert!(t.is_subtype_of(TypeTag::Any));
        }
        assert!(TypeTag::WeightedSum.is_subtype_of(TypeTag::Variable));
        assert!(TypeTag::WeightedTerm.is_subtype_of(TypeTag::Variable));
        assert!(!TypeTag::WeightedSum.is_subtype_of(TypeTag::WeightedTerm));
        assert!(!TypeTag::Constant.is_subtype_of(TypeTag::Variable));
        assert!(!TypeTag::Variable.is_subtype_of(TypeTag::WeightedSum));
        assert!(!TypeTag::Any.is_subtype_of(TypeTag::Constant));
    }

    #[test]
    fn reach_matches_skeleton_heights() {
        assert_eq!(TypeTag::WeightedSum.reach(), 3);
        assert_eq!(TypeTag::WeightedTerm.reach(), 2);
        assert_eq!(TypeTag::Variable.reach(), 1);
        assert_eq!(TypeTag::Constant.reach(), 1);
    }
}
