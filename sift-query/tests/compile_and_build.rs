//! End-to-end tests: declaration + request parameters -> specification
//! tree -> rendered SQL, across both evaluation passes of a request.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sift_query::{
    Compiler, FilterDef, FilterDescriptor, JoinDef, JoinFetchDef, JoinKind, MismatchPolicy,
    Operator, Predicate, QueryContext, QueryId, QueryRoot, SpecError, Specification, Value,
};
use sift_schema::{EnumDef, FieldType, Model, Relation, Schema};

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .model(
                Model::new("Customer", "customers")
                    .field("id", "id", FieldType::Int)
                    .field("first_name", "first_name", FieldType::String)
                    .field("last_name", "last_name", FieldType::String)
                    .field("registration_date", "registration_date", FieldType::Date)
                    .field("weight", "weight", FieldType::Int)
                    .field("gold", "gold", FieldType::Boolean)
                    .field(
                        "gender",
                        "gender",
                        FieldType::Enum(EnumDef::new("Gender", ["MALE", "FEMALE", "OTHER"])),
                    )
                    .relation(Relation::new("orders", "Order", "id", "customer_id")),
            )
            .model(
                Model::new("Order", "orders")
                    .field("id", "id", FieldType::Int)
                    .field("item_name", "item_name", FieldType::String)
                    .relation(Relation::new("tags", "Tag", "id", "order_id")),
            )
            .model(Model::new("Tag", "tags").field("name", "name", FieldType::String))
            .build(),
    )
}

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

fn root() -> QueryRoot {
    QueryRoot::new(schema(), "Customer", "c", Arc::new(QueryContext::new()))
}

fn build_sql(spec: &Specification, root: &QueryRoot, query: QueryId) -> (String, Vec<Value>) {
    spec.to_predicate(root, query)
        .expect("predicate builds")
        .expect("predicate present")
        .to_sql(0)
}

#[test]
fn like_filter_end_to_end() {
    let def = FilterDef::Filter(FilterDescriptor::new(Operator::Like, "last_name"));
    let params = request(&[("last_name", &["impso"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let root = root();
    let (sql, bound) = build_sql(&spec, &root, QueryId(1));
    assert_eq!(sql, "c.last_name LIKE $1");
    assert_eq!(bound, vec![Value::String("%impso%".into())]);
}

#[test]
fn comparison_converts_to_the_type_on_the_path() {
    let def = FilterDef::Filter(FilterDescriptor::new(
        Operator::GreaterThanOrEqual,
        "registration_date",
    ));
    let params = request(&[("registration_date", &["2014-03-10"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let root = root();
    let (sql, bound) = build_sql(&spec, &root, QueryId(1));
    assert_eq!(sql, "c.registration_date >= $1");
    assert!(matches!(bound[0], Value::Date(_)));
}

#[test]
fn empty_in_parameter_compiles_to_no_node_at_all() {
    // thePath=theValue&thePath= : one empty value disables the filter
    let def = FilterDef::Filter(FilterDescriptor::new(Operator::In, "last_name"));
    let params = request(&[("last_name", &["theValue", ""])]);
    assert_eq!(Compiler::new().compile(&def, &params), None);
}

#[test]
fn separator_expands_in_place_preserving_order() {
    let def = FilterDef::Filter(FilterDescriptor::new(Operator::In, "first_name").separator(','));
    let params = request(&[("first_name", &["a", "b,c", "d"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let root = root();
    let (sql, bound) = build_sql(&spec, &root, QueryId(1));
    assert_eq!(sql, "c.first_name IN ($1, $2, $3, $4)");
    assert_eq!(
        bound,
        ["a", "b", "c", "d"]
            .map(|v| Value::String(v.into()))
            .to_vec()
    );
}

#[test]
fn mismatch_fail_policy_surfaces_the_offending_value() {
    let def = FilterDef::Filter(FilterDescriptor::new(Operator::Equal, "id"));
    let params = request(&[("id", &["not-a-number"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let err = spec.to_predicate(&root(), QueryId(1)).unwrap_err();
    assert_eq!(
        err,
        SpecError::ValueRejected {
            value: "not-a-number".into(),
            reason: "unparseable number".into(),
        }
    );
}

#[test]
fn mismatch_empty_result_policy_degrades_the_branch() {
    // polymorphic OR: numeric id or text name, one query parameter feeds both
    let def = FilterDef::Or(vec![
        FilterDef::Filter(
            FilterDescriptor::new(Operator::Equal, "id")
                .params(["query"])
                .mismatch(MismatchPolicy::EmptyResult),
        ),
        FilterDef::Filter(FilterDescriptor::new(Operator::Like, "last_name").params(["query"])),
    ]);
    let params = request(&[("query", &["Simpson"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let root = root();
    let (sql, bound) = build_sql(&spec, &root, QueryId(1));
    assert_eq!(sql, "(0 = 1 OR c.last_name LIKE $1)");
    assert_eq!(bound, vec![Value::String("%Simpson%".into())]);
}

#[test]
fn null_check_is_selected_by_the_parameter_value() {
    let def = FilterDef::Filter(FilterDescriptor::new(Operator::Null, "gold"));
    let root = root();

    let spec = Compiler::new()
        .compile(&def, &request(&[("gold", &["true"])]))
        .unwrap();
    assert_eq!(build_sql(&spec, &root, QueryId(1)).0, "c.gold IS NULL");

    let spec = Compiler::new()
        .compile(&def, &request(&[("gold", &["false"])]))
        .unwrap();
    assert_eq!(build_sql(&spec, &root, QueryId(2)).0, "c.gold IS NOT NULL");
}

#[test]
fn conjunction_with_join_builds_across_data_and_count_queries() {
    let def = FilterDef::And(vec![
        FilterDef::Join(JoinDef::new("orders", "o", JoinKind::Left)),
        FilterDef::Filter(FilterDescriptor::new(Operator::Like, "o.item_name").params(["item"])),
        FilterDef::Filter(FilterDescriptor::new(Operator::Equal, "gender")),
    ]);
    let params = request(&[("item", &["Duff"]), ("gender", &["MALE"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let root = root();
    let data_query = QueryId(1);
    let count_query = QueryId(2);

    // data pass, twice: the join is realized exactly once for this query
    let (sql, bound) = build_sql(&spec, &root, data_query);
    let again = build_sql(&spec, &root, data_query);
    assert_eq!(sql, "(o.item_name LIKE $1 AND c.gender = $2)");
    assert_eq!((sql.clone(), bound.clone()), again);
    assert_eq!(root.ctx.joins_for(data_query).len(), 1);
    assert_eq!(
        root.ctx.joins_for(data_query)[0].to_sql(),
        "LEFT JOIN orders o ON c.id = o.customer_id"
    );

    // count pass: same tree, fresh identity, independent join realization
    let (count_sql, _) = build_sql(&spec, &root, count_query);
    assert_eq!(count_sql, sql);
    assert_eq!(root.ctx.joins_for(count_query).len(), 1);
    assert_eq!(root.ctx.joins_for(data_query).len(), 1);
}

#[test]
fn fetch_join_is_shared_across_passes() {
    let def = FilterDef::And(vec![
        FilterDef::JoinFetch(JoinFetchDef::new(["orders"], JoinKind::Left)),
        FilterDef::Filter(FilterDescriptor::new(Operator::Like, "last_name")),
    ]);
    let params = request(&[("last_name", &["Simpson"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let root = root();
    build_sql(&spec, &root, QueryId(1));
    build_sql(&spec, &root, QueryId(2));
    assert_eq!(root.ctx.fetches().len(), 1);
}

#[test]
fn nested_path_filters_through_two_relations() {
    let def = FilterDef::Filter(FilterDescriptor::new(Operator::Equal, "orders.tags.name"));
    let params = request(&[("orders.tags.name", &["gift"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let root = root();
    let (sql, _) = build_sql(&spec, &root, QueryId(1));
    assert_eq!(sql, "tags.name = $1");
    let joins: Vec<_> = root
        .ctx
        .joins_for(QueryId(1))
        .iter()
        .map(|j| j.to_sql())
        .collect();
    assert_eq!(
        joins,
        vec![
            "JOIN orders orders ON c.id = orders.customer_id",
            "JOIN tags tags ON orders.id = tags.order_id",
        ]
    );
}

#[test]
fn const_value_filter_needs_no_request_parameter() {
    let def = FilterDef::Filter(
        FilterDescriptor::new(Operator::Equal, "gender").const_value("FEMALE"),
    );
    let spec = Compiler::new().compile(&def, &request(&[])).unwrap();

    let root = root();
    let (sql, bound) = build_sql(&spec, &root, QueryId(1));
    assert_eq!(sql, "c.gender = $1");
    assert_eq!(bound, vec![Value::Enum("FEMALE".into())]);
}

#[test]
fn two_compilation_passes_yield_equal_hashable_trees() {
    let def = FilterDef::And(vec![
        FilterDef::Filter(FilterDescriptor::new(Operator::Like, "last_name")),
        FilterDef::Filter(
            FilterDescriptor::new(Operator::In, "gender").mismatch(MismatchPolicy::EmptyResult),
        ),
    ]);
    let params = request(&[("last_name", &["Simpson"]), ("gender", &["MALE", "FEMALE"])]);

    let first = Compiler::new().compile(&def, &params).unwrap();
    let second = Compiler::new().compile(&def, &params).unwrap();
    assert_eq!(first, second);

    let hash = |spec: &Specification| {
        let mut hasher = DefaultHasher::new();
        spec.hash(&mut hasher);
        hasher.finish()
    };
    assert_eq!(hash(&first), hash(&second));
}

#[test]
fn in_filter_under_empty_result_policy_drops_only_bad_values() {
    let def = FilterDef::Filter(
        FilterDescriptor::new(Operator::In, "id").mismatch(MismatchPolicy::EmptyResult),
    );
    let params = request(&[("id", &["1", "oops", "3"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let root = root();
    let (sql, bound) = build_sql(&spec, &root, QueryId(1));
    assert_eq!(sql, "c.id IN ($1, $2)");
    assert_eq!(bound, vec![Value::Int(1), Value::Int(3)]);
}

#[test]
fn in_filter_with_nothing_convertible_never_matches() {
    let def = FilterDef::Filter(
        FilterDescriptor::new(Operator::In, "id").mismatch(MismatchPolicy::EmptyResult),
    );
    let params = request(&[("id", &["oops", "nope"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let root = root();
    let predicate = spec.to_predicate(&root, QueryId(1)).unwrap().unwrap();
    assert_eq!(predicate, Predicate::In("c.id".into(), vec![]));
    assert_eq!(predicate.to_sql(0).0, "FALSE");
}

#[test]
fn unknown_path_segment_is_not_recoverable() {
    let def = FilterDef::Filter(
        FilterDescriptor::new(Operator::Equal, "no_such_field")
            .mismatch(MismatchPolicy::EmptyResult),
    );
    let params = request(&[("no_such_field", &["x"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    // the decorator only swallows value rejections, not schema errors
    assert!(spec.to_predicate(&root(), QueryId(1)).is_err());
}

#[test]
fn date_format_override_reaches_the_converter() {
    let def = FilterDef::Filter(
        FilterDescriptor::new(Operator::Equal, "registration_date").date_format("%d.%m.%Y"),
    );
    let params = request(&[("registration_date", &["10.03.2014"])]);
    let spec = Compiler::new().compile(&def, &params).unwrap();

    let root = root();
    let (_, bound) = build_sql(&spec, &root, QueryId(1));
    assert!(matches!(bound[0], Value::Date(_)));
}
