use std::sync::Arc;

use crate::metadata::typesystem::{
    AnnotatedType, MethodSymbol, NamedTypeDefRc, TypeRc, TypeSymbol,
};

/// What `!n` (a type-level generic parameter position) resolves to
#[derive(Debug, Clone, Default)]
pub enum TypeContext {
    /// No type-level parameters are in scope
    #[default]
    None,
    /// The parameters of a definition, containing types' parameters first
    Definition(NamedTypeDefRc),
    /// Explicit arguments, e.g. those of the constructed type a MemberRef points into
    Arguments(Vec<AnnotatedType>),
}

impl TypeContext {
    /// The type at position `position`, the unsupported sentinel if there is none
    #[must_use]
    pub fn resolve(&self, position: u32) -> TypeRc {
        let found = match self {
            TypeContext::None => None,
            TypeContext::Definition(definition) => definition.type_parameter_at(position),
            TypeContext::Arguments(arguments) => arguments
                .get(position as usize)
                .map(|argument| argument.ty.clone()),
        };

        found.unwrap_or_else(|| {
            log::debug!("type parameter position {position} has no type in scope");
            TypeSymbol::unsupported()
        })
    }
}

/// What `!!n` (a method-level generic parameter position) resolves to
#[derive(Debug, Clone, Default)]
pub enum MethodContext {
    /// No method-level parameters are in scope
    #[default]
    None,
    /// The type parameters of a method definition
    Parameters(Vec<TypeRc>),
    /// Positional placeholders, for signatures that are matched against candidates
    /// rather than bound to a method
    Placeholders,
}

impl MethodContext {
    /// The parameters of `method`
    #[must_use]
    pub fn for_method(method: &MethodSymbol) -> Self {
        MethodContext::Parameters(method.type_parameters().to_vec())
    }

    /// The type at position `position`, the unsupported sentinel if there is none
    #[must_use]
    pub fn resolve(&self, position: u32) -> TypeRc {
        match self {
            MethodContext::None => {
                log::debug!("method type parameter position {position} has no method in scope");
                TypeSymbol::unsupported()
            }
            MethodContext::Parameters(parameters) => parameters
                .get(position as usize)
                .map_or_else(TypeSymbol::unsupported, Arc::clone),
            MethodContext::Placeholders => TypeSymbol::placeholder(position, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        decoder::testing::Fixture,
        token::Token,
        typesystem::{types_equal, TypeCompareKind},
    };

    #[test]
    fn test_missing_context_is_unsupported() {
        assert!(TypeContext::None.resolve(0).is_unsupported());
        assert!(MethodContext::None.resolve(0).is_unsupported());
        assert!(MethodContext::Parameters(Vec::new()).resolve(0).is_unsupported());
    }

    #[test]
    fn test_arguments_by_position() {
        let first = TypeSymbol::placeholder(7, false);
        let context = TypeContext::Arguments(vec![AnnotatedType::new(first.clone())]);
        assert!(Arc::ptr_eq(&context.resolve(0), &first));
        assert!(context.resolve(1).is_unsupported());
    }

    #[test]
    fn test_method_placeholders() {
        let resolved = MethodContext::Placeholders.resolve(2);
        assert!(types_equal(
            &resolved,
            &TypeSymbol::placeholder(2, true),
            TypeCompareKind::empty()
        ));
    }

    #[test]
    fn test_nested_definition_positions() {
        let (fixture, inner) = Fixture::with_app(|builder| {
            let outer = builder.type_def("App", "Outer`1", Token::new(0));
            builder.generic_param(outer, "T");
            let inner = builder.nested_type_def(outer, "Inner`1", Token::new(0));
            builder.generic_param(inner, "T");
            builder.generic_param(inner, "U");
            inner
        });
        let inner = fixture.app.type_def(inner).unwrap();
        assert_eq!(inner.total_arity(), 2);

        let context = TypeContext::Definition(inner.clone());
        let outer_parameter = context.resolve(0);
        assert_eq!(outer_parameter.to_string(), "T");
        let outer = inner.containing().unwrap();
        assert!(Arc::ptr_eq(&outer_parameter, &outer.type_parameters()[0]));

        let own_parameter = context.resolve(1);
        assert_eq!(own_parameter.to_string(), "U");
        assert!(Arc::ptr_eq(&own_parameter, &inner.type_parameters()[0]));

        assert!(context.resolve(2).is_unsupported());
        assert!(context.resolve(3).is_unsupported());
    }
}
