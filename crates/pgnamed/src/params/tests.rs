use super::*;
use crate::error::NamedError;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn bag(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// ==================== translate ====================

#[test]
fn translates_placeholders_in_order() {
    let q = translate(
        "SELECT * FROM some_table WHERE id=:id AND some_field_1=:some_field_1 AND some_field_2=:some_field_2;",
    );

    assert_eq!(
        q.sql(),
        "SELECT * FROM some_table WHERE id=$1 AND some_field_1=$2 AND some_field_2=$3;"
    );
    assert_eq!(q.names(), ["id", "some_field_1", "some_field_2"]);
    assert_eq!(q.param_count(), 3);
}

#[test]
fn query_without_placeholders_is_unchanged() {
    let raw = "SELECT 1 FROM users WHERE status = 'active'";
    let q = translate(raw);
    assert_eq!(q.sql(), raw);
    assert!(q.names().is_empty());
}

#[test]
fn empty_query_is_unchanged() {
    let q = translate("");
    assert_eq!(q.sql(), "");
    assert_eq!(q.param_count(), 0);
}

#[test]
fn repeated_name_gets_one_marker_per_occurrence() {
    let q = translate(":id = :id");
    assert_eq!(q.sql(), "$1 = $2");
    assert_eq!(q.names(), ["id", "id"]);
}

#[test]
fn cast_operator_is_left_alone() {
    let q = translate("SELECT created_at::text, payload::jsonb FROM events");
    assert_eq!(q.sql(), "SELECT created_at::text, payload::jsonb FROM events");
    assert!(q.names().is_empty());

    let q = translate("SELECT :id, '1'::int");
    assert_eq!(q.sql(), "SELECT $1, '1'::int");
    assert_eq!(q.names(), ["id"]);
}

#[test]
fn placeholder_followed_by_colon_is_not_recognized() {
    let q = translate("SELECT :value::text");
    assert_eq!(q.sql(), "SELECT :value::text");
    assert!(q.names().is_empty());

    let q = translate("SELECT :a:b");
    assert_eq!(q.sql(), "SELECT :a:b");
    assert!(q.names().is_empty());
}

#[test]
fn identifier_is_not_shortened_to_find_a_match() {
    let q = translate("SELECT :abc::int");
    assert_eq!(q.sql(), "SELECT :abc::int");
    assert!(q.names().is_empty());
}

#[test]
fn colon_after_word_char_or_backslash_is_not_a_placeholder() {
    let q = translate(r"SELECT arr[1:2], '10:30', E'\:escaped' WHERE x = :x");
    assert_eq!(q.sql(), r"SELECT arr[1:2], '10:30', E'\:escaped' WHERE x = $1");
    assert_eq!(q.names(), ["x"]);
}

#[test]
fn lone_colons_are_kept() {
    let q = translate("SELECT ': ' || :name || ':'");
    assert_eq!(q.sql(), "SELECT ': ' || $1 || ':'");
    assert_eq!(q.names(), ["name"]);
}

#[test]
fn placeholder_at_start_and_end() {
    let q = translate(":first,:last");
    assert_eq!(q.sql(), "$1,$2");
    assert_eq!(q.names(), ["first", "last"]);
}

#[test]
fn placeholder_names_may_be_unicode() {
    let q = translate("SELECT * FROM t WHERE name = :имя AND city = :ciudad_1");
    assert_eq!(q.sql(), "SELECT * FROM t WHERE name = $1 AND city = $2");
    assert_eq!(q.names(), ["имя", "ciudad_1"]);
}

#[test]
fn marker_count_matches_name_count() {
    let q = translate("INSERT INTO t VALUES (:a, :b, :c, :d, :e, :f, :g, :h, :i, :j, :k)");
    assert_eq!(q.param_count(), 11);
    assert!(q.sql().contains("$11)"));
    assert!(!q.sql().contains("$12"));
}

#[test]
fn translation_is_deterministic() {
    let raw = "UPDATE t SET a = :a WHERE id = :id";
    assert_eq!(translate(raw), translate(raw));
}

// ==================== bind ====================

#[test]
fn bind_orders_values_by_names() {
    let b = bag(&[("id", json!(1)), ("a", json!("x")), ("b", json!("y"))]);
    let values = bind(&b, &names(&["id", "a", "b"])).unwrap();
    assert_eq!(values, vec![json!(1), json!("x"), json!("y")]);
}

#[test]
fn bind_repeats_values_for_repeated_names() {
    let b = bag(&[("id", json!(5))]);
    let values = bind(&b, &names(&["id", "id"])).unwrap();
    assert_eq!(values, vec![json!(5), json!(5)]);
}

#[test]
fn bind_missing_argument_fails() {
    let b = bag(&[("id", json!(1))]);
    let err = bind(&b, &names(&["id", "a"])).unwrap_err();
    assert!(matches!(err, NamedError::MissingRequiredArgument(ref name) if name == "a"));
}

#[test]
fn bind_reports_only_first_missing_argument() {
    let b = bag(&[]);
    let err = bind(&b, &names(&["b", "a"])).unwrap_err();
    assert!(matches!(err, NamedError::MissingRequiredArgument(ref name) if name == "b"));
}

#[test]
fn bind_unused_arguments_fails_with_full_set() {
    let b = bag(&[("id", json!(1)), ("extra", json!(9)), ("more", json!(0))]);
    let err = bind(&b, &names(&["id"])).unwrap_err();
    match err {
        NamedError::UnusedArguments(unused) => {
            let expected: BTreeSet<String> = ["extra", "more"].map(String::from).into();
            assert_eq!(unused, expected);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn bind_missing_wins_over_unused() {
    let b = bag(&[("extra", json!(9))]);
    let err = bind(&b, &names(&["id"])).unwrap_err();
    assert!(matches!(err, NamedError::MissingRequiredArgument(_)));
}

#[test]
fn bind_empty_names_and_empty_bag() {
    let b = bag(&[]);
    assert!(bind(&b, &[]).unwrap().is_empty());
}

#[test]
fn bind_accepts_btree_map_with_str_keys() {
    let b: BTreeMap<&str, i32> = BTreeMap::from([("b", 2), ("a", 1)]);
    assert_eq!(bind(&b, &names(&["a", "b"])).unwrap(), vec![1, 2]);
}

#[test]
fn bind_named_args_produces_driver_params() {
    let args = NamedArgs::new().set("name", "bob").set("id", 7_i32);
    let q = translate("SELECT * FROM t WHERE id=:id AND name=:name;");
    let values = bind(&args, q.names()).unwrap();

    assert_eq!(q.sql(), "SELECT * FROM t WHERE id=$1 AND name=$2;");
    assert_eq!(values.len(), 2);
    assert_eq!(params_ref(&values).len(), 2);
    assert!(std::sync::Arc::ptr_eq(&values[0], args.get_arg("id").unwrap()));
    assert!(std::sync::Arc::ptr_eq(&values[1], args.get_arg("name").unwrap()));
}

#[test]
fn named_args_macro_builds_bag() {
    let args = crate::named_args! { "id" => 1_i64, "name" => "x" };
    assert_eq!(args.len(), 2);
    assert_eq!(args.arg_names().collect::<Vec<_>>(), vec!["id", "name"]);
    assert!(crate::named_args!().is_empty());
}

#[test]
fn named_args_debug_shows_names_only() {
    let args = NamedArgs::new().set("secret", "hunter2");
    assert_eq!(format!("{args:?}"), r#"{"secret"}"#);
}

// ==================== bind_many ====================

#[test]
fn bind_many_preserves_row_order() {
    let bags = vec![bag(&[("id", json!(1))]), bag(&[("id", json!(2))])];
    let rows = bind_many(&bags, &names(&["id"])).unwrap();
    assert_eq!(rows, vec![vec![json!(1)], vec![json!(2)]]);
}

#[test]
fn bind_many_several_columns() {
    let bags = vec![
        bag(&[("f1", json!("1")), ("f2", json!("2")), ("f3", json!("3"))]),
        bag(&[("f1", json!("4")), ("f2", json!("5")), ("f3", json!("6"))]),
        bag(&[("f1", json!("7")), ("f2", json!("8")), ("f3", json!("9"))]),
    ];
    let rows = bind_many(&bags, &names(&["f1", "f2", "f3"])).unwrap();
    assert_eq!(
        rows,
        vec![
            vec![json!("1"), json!("2"), json!("3")],
            vec![json!("4"), json!("5"), json!("6")],
            vec![json!("7"), json!("8"), json!("9")],
        ]
    );
}

#[test]
fn bind_many_fails_on_any_bad_bag() {
    let bags = vec![
        bag(&[("id", json!(1))]),
        bag(&[("id", json!(2)), ("extra", json!(3))]),
        bag(&[]),
    ];
    let err = bind_many(&bags, &names(&["id"])).unwrap_err();
    assert!(matches!(err, NamedError::UnusedArguments(ref set) if set.contains("extra")));
}

#[test]
fn bind_many_empty_batch() {
    let bags: Vec<HashMap<String, Value>> = Vec::new();
    assert!(bind_many(&bags, &names(&["id"])).unwrap().is_empty());
}

#[test]
fn converters_share_one_interface() {
    fn run<C: ParamsConverter>(c: &C, input: &C::Input, names: &[String]) -> C::Output {
        c.convert(input, names).unwrap()
    }

    let single = bag(&[("id", json!(1))]);
    let batch = vec![single.clone()];
    let n = names(&["id"]);

    let single_converter = BagConverter::<HashMap<String, Value>>::new();
    let batch_converter = BatchConverter::<HashMap<String, Value>>::new();

    assert_eq!(run(&single_converter, &single, &n), vec![json!(1)]);
    assert_eq!(run(&batch_converter, batch.as_slice(), &n), vec![vec![json!(1)]]);
}
