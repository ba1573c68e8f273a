use hyfuzz::catalog::OperatorBuilder;
use hyfuzz::error::ConfigError;
use hyfuzz::prelude::*;
use smallvec::smallvec;

#[test]
fn descriptors_must_match_their_build_function() {
    let arity = OperatorDescriptor {
        name: "Add",
        inputs: smallvec![ValueType::Int],
        result: ValueType::Int,
        builder: OperatorBuilder::Binary(add),
    };
    assert!(matches!(
        OperatorCatalog::new([arity]),
        Err(ConfigError::ArityMismatch {
            operator: "Add",
            declared: 1,
            builder: 2
        })
    ));

    let ill_typed =
        OperatorDescriptor::binary("Add", (ValueType::Int, ValueType::Bool), ValueType::Int, add);
    assert!(
        OperatorCatalog::new([ill_typed])
            .unwrap_err()
            .is_ill_typed_operator()
    );

    let wrong_result =
        OperatorDescriptor::binary("Add", (ValueType::Int, ValueType::Int), ValueType::Bool, add);
    assert!(matches!(
        OperatorCatalog::new([wrong_result]),
        Err(ConfigError::ResultTypeMismatch {
            declared: ValueType::Bool,
            inferred: ValueType::Int,
            ..
        })
    ));
}

#[test]
fn operators_are_partitioned_by_result_type() {
    let catalog = OperatorCatalog::new([
        OperatorDescriptor::binary("Add", (ValueType::Int, ValueType::Int), ValueType::Int, add),
        OperatorDescriptor::unary("IsNull", ValueType::Int, ValueType::Bool, is_null),
        OperatorDescriptor::binary(
            "Like",
            (ValueType::String, ValueType::String),
            ValueType::Bool,
            like,
        ),
    ])
    .unwrap();

    let (binaries, unaries) = catalog.operators_of(ValueType::Bool);
    assert_eq!(binaries.len(), 1);
    assert_eq!(binaries[0].name, "Like");
    assert_eq!(unaries.len(), 1);
    assert_eq!(unaries[0].input, ValueType::Int);

    let (binaries, unaries) = catalog.operators_of(ValueType::Int);
    assert_eq!((binaries.len(), unaries.len()), (1, 0));
    assert!(catalog.nth_of(ValueType::Int, 1).is_none());
    assert!(catalog.nth_of(ValueType::Bool, 1).is_some_and(|op| op.is_right()));
    assert_eq!(catalog.count_of(ValueType::DateTime), 0);

    assert_eq!(
        catalog.value_types(),
        vec![ValueType::Int, ValueType::Bool, ValueType::String]
    );
}

#[test]
fn built_operators_produce_the_expected_nodes() {
    let catalog = OperatorCatalog::standard().unwrap();
    let at_utc_op = catalog.unaries_of(ValueType::DateTime)[0];
    let t = root(0, ValueType::DateTime);
    assert_eq!(at_utc_op.build(t.clone()), at_utc(t));

    let convert_op = catalog
        .unaries_of(ValueType::Int)
        .iter()
        .find(|op| op.name == "Convert")
        .unwrap();
    assert_eq!(convert_op.input, ValueType::Bool);
    assert_eq!(
        convert_op.build(lit(true)).value_type(),
        Ok(ValueType::Int)
    );
}

#[test]
fn constants_must_cover_the_catalog() {
    let catalog = OperatorCatalog::standard().unwrap();
    let pool = ConstantPool::new()
        .with(ValueType::Int, [0, 1])
        .unwrap()
        .with(ValueType::Bool, [true])
        .unwrap()
        .with(ValueType::String, ["A%"])
        .unwrap();
    assert!(matches!(
        pool.validate_for(&catalog),
        Err(ConfigError::MissingConstants(ValueType::DateTime))
    ));

    let config = FuzzConfig::default();
    assert!(matches!(
        Fuzzer::new(config, catalog, pool, &SeedData::standard()),
        Err(ConfigError::MissingConstants(ValueType::DateTime))
    ));
}

#[test]
fn standard_constants_inject_zero_and_like_patterns() {
    let pool = ConstantPool::standard().unwrap();
    assert!(pool.constants_of(ValueType::Int).contains(&Value::Int(0)));
    for pattern in ["A%", "%B"] {
        assert!(pool.constants_of(ValueType::String).contains(&Value::from(pattern)));
    }
}
