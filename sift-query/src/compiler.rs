//! Compilation of filter declarations against one request's parameters.
//!
//! The compiler decides, per descriptor, whether a node exists at all for
//! this request: a filter whose parameters are absent (or present but
//! empty) compiles to nothing, uniformly with "filter not requested".
//! Groups propagate absence upward — an AND or OR with no present children
//! is itself absent.

use std::collections::HashMap;

use crate::composite::{Conjunction, Disjunction};
use crate::convert::{Converter, FallbackFn, MismatchPolicy};
use crate::descriptor::{FilterDef, FilterDescriptor, Operator};
use crate::joins::{JoinFetchSpec, JoinSpec};
use crate::specification::{CompareOp, CompareSpec, InSpec, LikeSpec, NullSpec, Specification};

/// Lookup of raw request parameter values, by parameter name.
///
/// The HTTP extraction layer implements this; `None` means the parameter
/// was not present in the request at all.
pub trait ParamSource {
    /// Raw values for a parameter, or `None` when absent.
    fn values(&self, name: &str) -> Option<&[String]>;
}

impl ParamSource for HashMap<String, Vec<String>> {
    fn values(&self, name: &str) -> Option<&[String]> {
        self.get(name).map(Vec::as_slice)
    }
}

/// Compiles [`FilterDef`] trees into [`Specification`] trees.
#[derive(Clone, Default)]
pub struct Compiler {
    fallback: Option<FallbackFn>,
}

impl Compiler {
    /// Create a compiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fallback conversion on every converter the compiler
    /// configures, for field types the engine does not natively recognize.
    pub fn with_fallback(mut self, fallback: FallbackFn) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Compile a declaration tree against the request's parameters.
    ///
    /// Returns `None` when nothing in the tree applies to this request.
    pub fn compile(&self, def: &FilterDef, params: &impl ParamSource) -> Option<Specification> {
        match def {
            FilterDef::Filter(descriptor) => self.compile_filter(descriptor, params),
            FilterDef::And(children) => self
                .compile_group(children, params)
                .map(|specs| collapse(specs, |s| Specification::Conjunction(Conjunction::new(s)))),
            FilterDef::Or(children) => self
                .compile_group(children, params)
                .map(|specs| collapse(specs, |s| Specification::Disjunction(Disjunction::new(s)))),
            FilterDef::Join(def) => Some(Specification::Join(JoinSpec::new(
                def.path.clone(),
                def.alias.clone(),
                def.kind,
            ))),
            FilterDef::JoinFetch(def) => Some(Specification::JoinFetch(JoinFetchSpec::new(
                def.paths.iter().cloned(),
                def.kind,
            ))),
        }
    }

    fn compile_group(
        &self,
        children: &[FilterDef],
        params: &impl ParamSource,
    ) -> Option<Vec<Specification>> {
        let specs: Vec<_> = children
            .iter()
            .filter_map(|child| self.compile(child, params))
            .collect();
        if specs.is_empty() { None } else { Some(specs) }
    }

    fn compile_filter(
        &self,
        descriptor: &FilterDescriptor,
        params: &impl ParamSource,
    ) -> Option<Specification> {
        let raw = self.resolve_values(descriptor, params)?;

        let converter = {
            let converter =
                Converter::new(descriptor.date_format.clone(), descriptor.mismatch);
            match &self.fallback {
                Some(fallback) => converter.with_fallback(fallback.clone()),
                None => converter,
            }
        };

        let path = descriptor.path.clone();
        let spec = match descriptor.op {
            Operator::Equal => Specification::Compare(CompareSpec::new(
                CompareOp::Equal,
                path,
                &raw,
                descriptor.ignore_case,
                converter,
            )),
            Operator::NotEqual => Specification::Compare(CompareSpec::new(
                CompareOp::NotEqual,
                path,
                &raw,
                descriptor.ignore_case,
                converter,
            )),
            Operator::GreaterThan => Specification::Compare(CompareSpec::new(
                CompareOp::GreaterThan,
                path,
                &raw,
                descriptor.ignore_case,
                converter,
            )),
            Operator::GreaterThanOrEqual => Specification::Compare(CompareSpec::new(
                CompareOp::GreaterThanOrEqual,
                path,
                &raw,
                descriptor.ignore_case,
                converter,
            )),
            Operator::LessThan => Specification::Compare(CompareSpec::new(
                CompareOp::LessThan,
                path,
                &raw,
                descriptor.ignore_case,
                converter,
            )),
            Operator::LessThanOrEqual => Specification::Compare(CompareSpec::new(
                CompareOp::LessThanOrEqual,
                path,
                &raw,
                descriptor.ignore_case,
                converter,
            )),
            Operator::Like => {
                Specification::Like(LikeSpec::new(path, &raw, descriptor.ignore_case))
            }
            Operator::In => Specification::In(InSpec::new(false, path, raw, converter)),
            Operator::NotIn => Specification::In(InSpec::new(true, path, raw, converter)),
            Operator::Null => Specification::Null(NullSpec::new(false, path, &raw, converter)),
            Operator::NotNull => Specification::Null(NullSpec::new(true, path, &raw, converter)),
        };

        tracing::debug!(op = ?descriptor.op, path = %descriptor.path, "compiled filter");
        Some(match descriptor.mismatch {
            MismatchPolicy::EmptyResult => spec.empty_on_mismatch(),
            MismatchPolicy::Fail => spec,
        })
    }

    /// Resolve the effective raw values for a descriptor, or `None` when
    /// the filter is not requested.
    fn resolve_values(
        &self,
        descriptor: &FilterDescriptor,
        params: &impl ParamSource,
    ) -> Option<Vec<String>> {
        let raw: Vec<String> = match &descriptor.const_value {
            Some(constant) => vec![constant.clone()],
            None => {
                let mut values = Vec::new();
                if descriptor.params.is_empty() {
                    if let Some(vs) = params.values(&descriptor.path) {
                        values.extend_from_slice(vs);
                    }
                } else {
                    for name in &descriptor.params {
                        if let Some(vs) = params.values(name) {
                            values.extend_from_slice(vs);
                        }
                    }
                }
                if values.is_empty() {
                    tracing::trace!(path = %descriptor.path, "no parameter values, filter absent");
                    return None;
                }
                values
            }
        };

        // a present-but-empty parameter means "not filtering", for every operator
        if raw.iter().any(String::is_empty) {
            return None;
        }

        let raw = match descriptor.separator {
            Some(separator) => raw
                .iter()
                .flat_map(|value| value.split(separator))
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
            None => raw,
        };
        if raw.is_empty() { None } else { Some(raw) }
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("fallback", &self.fallback.as_ref().map(|_| "..."))
            .finish()
    }
}

fn collapse(mut specs: Vec<Specification>, combine: impl FnOnce(Vec<Specification>) -> Specification) -> Specification {
    if specs.len() == 1 {
        specs.remove(0)
    } else {
        combine(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::MismatchPolicy;
    use pretty_assertions::assert_eq;

    fn request(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect()
    }

    fn like(path: &str) -> FilterDef {
        FilterDef::Filter(FilterDescriptor::new(Operator::Like, path))
    }

    #[test]
    fn test_missing_parameter_compiles_to_absent() {
        let compiler = Compiler::new();
        let def = like("last_name");
        assert_eq!(compiler.compile(&def, &request(&[])), None);
    }

    #[test]
    fn test_missing_custom_parameter_compiles_to_absent() {
        let compiler = Compiler::new();
        let def = FilterDef::Filter(
            FilterDescriptor::new(Operator::Like, "last_name").params(["surname"]),
        );
        // a value under the path name does not satisfy a custom binding
        let params = request(&[("last_name", &["Simpson"])]);
        assert_eq!(compiler.compile(&def, &params), None);
    }

    #[test]
    fn test_parameter_defaults_to_path() {
        let compiler = Compiler::new();
        let spec = compiler
            .compile(&like("last_name"), &request(&[("last_name", &["Simpson"])]))
            .unwrap();
        assert_eq!(
            spec,
            Specification::Like(crate::specification::LikeSpec::new(
                "last_name",
                &["Simpson".to_string()],
                false,
            ))
        );
    }

    #[test]
    fn test_custom_parameter_name_binds() {
        let compiler = Compiler::new();
        let def = FilterDef::Filter(
            FilterDescriptor::new(Operator::Like, "last_name").params(["surname"]),
        );
        let spec = compiler
            .compile(&def, &request(&[("surname", &["Simpson"])]))
            .unwrap();
        assert!(matches!(spec, Specification::Like(_)));
    }

    #[test]
    fn test_empty_value_compiles_to_absent() {
        let compiler = Compiler::new();
        assert_eq!(
            compiler.compile(&like("last_name"), &request(&[("last_name", &[""])])),
            None
        );
    }

    #[test]
    fn test_any_empty_value_makes_the_whole_filter_absent() {
        let compiler = Compiler::new();
        let def = FilterDef::Filter(FilterDescriptor::new(Operator::In, "last_name"));
        let params = request(&[("last_name", &["theValue", "theValue2", ""])]);
        assert_eq!(compiler.compile(&def, &params), None);
    }

    #[test]
    fn test_const_value_ignores_request_parameters() {
        let compiler = Compiler::new();
        let def = FilterDef::Filter(
            FilterDescriptor::new(Operator::Equal, "status").const_value("ACTIVE"),
        );
        let with_param = compiler
            .compile(&def, &request(&[("status", &["DELETED"])]))
            .unwrap();
        let without_param = compiler.compile(&def, &request(&[])).unwrap();
        assert_eq!(with_param, without_param);
    }

    #[test]
    fn test_multi_value_without_separator_stays_verbatim() {
        let compiler = Compiler::new();
        let def = FilterDef::Filter(FilterDescriptor::new(Operator::In, "id"));
        let params = request(&[("id", &["val1", "val2,val3,val4", "val5,val6", "val7"])]);
        let spec = compiler.compile(&def, &params).unwrap();
        let expected = Specification::In(crate::specification::InSpec::new(
            false,
            "id",
            ["val1", "val2,val3,val4", "val5,val6", "val7"]
                .map(String::from),
            Converter::with_mismatch(MismatchPolicy::Fail),
        ));
        assert_eq!(spec, expected);
    }

    #[test]
    fn test_separator_flattens_in_order() {
        let compiler = Compiler::new();
        let def =
            FilterDef::Filter(FilterDescriptor::new(Operator::In, "id").separator(','));
        let params = request(&[("id", &["val1", "val2,val3,val4", "val5,val6", "val7"])]);
        let spec = compiler.compile(&def, &params).unwrap();
        let expected = Specification::In(crate::specification::InSpec::new(
            false,
            "id",
            ["val1", "val2", "val3", "val4", "val5", "val6", "val7"]
                .map(String::from),
            Converter::with_mismatch(MismatchPolicy::Fail),
        ));
        assert_eq!(spec, expected);
    }

    #[test]
    fn test_empty_result_policy_wraps_in_decorator() {
        let compiler = Compiler::new();
        let def = FilterDef::Filter(
            FilterDescriptor::new(Operator::Equal, "id").mismatch(MismatchPolicy::EmptyResult),
        );
        let spec = compiler
            .compile(&def, &request(&[("id", &["42"])]))
            .unwrap();
        assert!(matches!(spec, Specification::EmptyOnMismatch(_)));
    }

    #[test]
    fn test_group_with_no_present_children_is_absent() {
        let compiler = Compiler::new();
        let def = FilterDef::And(vec![like("first_name"), like("last_name")]);
        assert_eq!(compiler.compile(&def, &request(&[])), None);
    }

    #[test]
    fn test_group_with_one_present_child_collapses() {
        let compiler = Compiler::new();
        let def = FilterDef::And(vec![like("first_name"), like("last_name")]);
        let params = request(&[("last_name", &["Simpson"])]);
        let spec = compiler.compile(&def, &params).unwrap();
        assert!(matches!(spec, Specification::Like(_)));
    }

    #[test]
    fn test_nested_groups_compile_recursively() {
        let compiler = Compiler::new();
        let def = FilterDef::Or(vec![
            FilterDef::And(vec![like("first_name"), like("nickname")]),
            like("last_name"),
        ]);
        let params = request(&[
            ("first_name", &["Homer"] as &[&str]),
            ("nickname", &["Hom"]),
            ("last_name", &["Simpson"]),
        ]);
        let spec = compiler.compile(&def, &params).unwrap();
        let Specification::Disjunction(disjunction) = spec else {
            panic!("expected a disjunction");
        };
        assert_eq!(disjunction.children().count(), 2);
    }

    #[test]
    fn test_join_declarations_always_compile() {
        let compiler = Compiler::new();
        let def = FilterDef::Join(crate::descriptor::JoinDef::new(
            "orders",
            "o",
            crate::context::JoinKind::Left,
        ));
        assert!(matches!(
            compiler.compile(&def, &request(&[])),
            Some(Specification::Join(_))
        ));
    }

    #[test]
    fn test_separator_yielding_nothing_is_absent() {
        let compiler = Compiler::new();
        let def =
            FilterDef::Filter(FilterDescriptor::new(Operator::In, "id").separator(','));
        // non-empty raw value that splits into nothing but separators
        let params = request(&[("id", &[",,"])]);
        assert_eq!(compiler.compile(&def, &params), None);
    }
}
