//! Serialization Fidelity Tests
//!
//! Documents encoded against a schema must decode back to the same JSON:
//! - Const members come back from the tree, not the blob
//! - Enums travel as indices and come back wrapped in an array
//! - Every kind survives in its variable, fixed-length and const forms
//! - Text needing escapes survives the trip
//! - Measuring, printing and string output agree byte for byte

use serde_json::{json, Value};

use eventcodec::arena::BlockAllocator;
use eventcodec::blob::{Unchecked, Validated};
use eventcodec::codec::{
    decode_into, decode_to_string, encode_to_blob, measure_json, DecodeError, DecodeOptions,
};
use eventcodec::json::JsonConfig;
use eventcodec::tree::{FlagStrictness, SchemaDef, SchemaTree};

// =============================================================================
// Helpers
// =============================================================================

const EVENT: &str = r#"{"type": "object", "properties": [
    {"name": "source", "type": "string", "const": "gateway"},
    {"name": "id", "type": "uint64"},
    {"name": "level", "type": "string[]", "enum": ["debug", "info", "warn", "error"]},
    {"name": "message", "type": "string"},
    {"name": "host", "type": "string", "fixed_length": 12},
    {"name": "latency", "type": "float32[]"},
    {"name": "labels", "type": "string[]"},
    {"name": "payload", "type": "binary"},
    {"name": "peers", "type": "object[]", "properties": [
        {"name": "addr", "type": "uint32"},
        {"name": "alive", "type": "bool"}
    ]},
    {"name": "window", "type": "object[]", "fixed_length": 2, "properties": [
        {"name": "count", "type": "int32"}
    ]}
]}"#;

fn schema(text: &str) -> SchemaTree<BlockAllocator> {
    SchemaDef::from_json_str(text)
        .unwrap()
        .build(FlagStrictness::Strict)
        .unwrap()
}

fn event() -> Value {
    json!({
        "id": 9_007_199_254_740_993u64,
        "level": "warn",
        "message": "disk \"sda\" at 91%\n\tretrying",
        "host": "edge-7",
        "latency": [0.5, 1.25, -3.0],
        "labels": ["zone-a", null, ""],
        "payload": "3q2+7w==",
        "peers": [{"addr": 167772161, "alive": true}, {"addr": 167772162, "alive": false}],
        "window": [{"count": -1}, {"count": 4}]
    })
}

fn decode(tree: &SchemaTree<BlockAllocator>, blob: &[u8]) -> Value {
    let text = decode_to_string::<Validated>(tree.root(), blob, &DecodeOptions::default()).unwrap();
    serde_json::from_str(&text).unwrap()
}

// =============================================================================
// Round Trip Tests
// =============================================================================

/// Every member comes back, the const one included and the enum wrapped.
#[test]
fn test_event_survives_round_trip() {
    let tree = schema(EVENT);
    let blob = encode_to_blob(tree.root(), &event()).unwrap();

    let mut expected = event();
    expected["source"] = json!("gateway");
    expected["level"] = json!(["warn"]);
    assert_eq!(decode(&tree, &blob), expected);
}

/// Decoded members appear in schema order, whatever the input order.
#[test]
fn test_members_follow_schema_order() {
    let tree = schema(
        r#"{"type": "object", "properties": [
            {"name": "b", "type": "int32"},
            {"name": "a", "type": "int32"}
        ]}"#,
    );
    let blob = encode_to_blob(tree.root(), &json!({"a": 1, "b": 2})).unwrap();
    let text = decode_to_string::<Validated>(tree.root(), &blob, &DecodeOptions::default()).unwrap();
    assert_eq!(text, r#"{"b":2,"a":1}"#);
}

/// The constant string never reaches the blob.
#[test]
fn test_const_values_stay_out_of_blob() {
    let with_const = schema(
        r#"{"type": "object", "properties": [
            {"name": "source", "type": "string", "const": "a rather long constant value"},
            {"name": "id", "type": "int32"}
        ]}"#,
    );
    let blob = encode_to_blob(with_const.root(), &json!({"id": 5})).unwrap();
    assert_eq!(blob, 5i32.to_le_bytes());
}

/// Validated and unchecked decoding print identical text for a good blob.
#[test]
fn test_modes_agree_on_valid_blob() {
    let tree = schema(EVENT);
    let blob = encode_to_blob(tree.root(), &event()).unwrap();
    let options = DecodeOptions::default();

    let checked = decode_to_string::<Validated>(tree.root(), &blob, &options).unwrap();
    let unchecked = decode_to_string::<Unchecked>(tree.root(), &blob, &options).unwrap();
    assert_eq!(checked, unchecked);
}

/// One member of every kind, in variable, fixed-length and const form.
/// Each entry is the member's definition, the value handed to the encoder
/// and the value expected back.
fn kind_table() -> Vec<(&'static str, Value, Value)> {
    vec![
        (r#""type": "null""#, json!(null), json!(null)),
        // scalars
        (r#""type": "bool""#, json!(true), json!(true)),
        (r#""type": "int32""#, json!(-2_147_483_648i64), json!(-2_147_483_648i64)),
        (r#""type": "uint32""#, json!(4_294_967_295u64), json!(4_294_967_295u64)),
        (r#""type": "int64""#, json!(i64::MIN), json!(i64::MIN)),
        (r#""type": "uint64""#, json!(u64::MAX), json!(u64::MAX)),
        (r#""type": "float32""#, json!(-0.75), json!(-0.75)),
        (r#""type": "float64""#, json!(1e300), json!(1e300)),
        (r#""type": "bool", "const": false"#, json!(null), json!(false)),
        (r#""type": "int64", "const": -9"#, json!(null), json!(-9)),
        (r#""type": "uint64", "const": 18446744073709551615"#, json!(null), json!(u64::MAX)),
        (r#""type": "float32", "const": 0.5"#, json!(null), json!(0.5)),
        // variable arrays
        (r#""type": "bool[]""#, json!([true, false, true]), json!([true, false, true])),
        (r#""type": "int32[]""#, json!([-1, 0, 1]), json!([-1, 0, 1])),
        (r#""type": "uint32[]""#, json!([]), json!([])),
        (r#""type": "int64[]""#, json!([i64::MIN, 3]), json!([i64::MIN, 3])),
        (r#""type": "uint64[]""#, json!([u64::MAX, 0]), json!([u64::MAX, 0])),
        (r#""type": "float32[]""#, json!([0.25, -8.5]), json!([0.25, -8.5])),
        (r#""type": "float64[]""#, json!([2.5e-10]), json!([2.5e-10])),
        // fixed arrays fill the unused tail with zeros
        (r#""type": "bool[]", "fixed_length": 3"#, json!([true]), json!([true, false, false])),
        (r#""type": "int32[]", "fixed_length": 2"#, json!([7, -7]), json!([7, -7])),
        (r#""type": "uint32[]", "fixed_length": 2"#, json!([9]), json!([9, 0])),
        (r#""type": "int64[]", "fixed_length": 2"#, json!([-1]), json!([-1, 0])),
        (r#""type": "uint64[]", "fixed_length": 1"#, json!([u64::MAX]), json!([u64::MAX])),
        (r#""type": "float32[]", "fixed_length": 2"#, json!([1.5]), json!([1.5, 0.0])),
        (r#""type": "float64[]", "fixed_length": 3"#, json!([]), json!([0.0, 0.0, 0.0])),
        // const arrays
        (r#""type": "bool[]", "const": [false, true]"#, json!(null), json!([false, true])),
        (r#""type": "int32[]", "const": [-3]"#, json!(null), json!([-3])),
        (r#""type": "uint32[]", "const": [80, 443]"#, json!(null), json!([80, 443])),
        (r#""type": "int64[]", "const": [-4294967296]"#, json!(null), json!([-4_294_967_296i64])),
        (r#""type": "uint64[]", "const": [18446744073709551615]"#, json!(null), json!([u64::MAX])),
        (r#""type": "float32[]", "const": [0.125]"#, json!(null), json!([0.125])),
        (r#""type": "float64[]", "const": [-2.0, 3.5]"#, json!(null), json!([-2.0, 3.5])),
        // numeric enums travel as an index
        (r#""type": "bool[]", "enum": [false, true]"#, json!(true), json!([true])),
        (r#""type": "int32[]", "enum": [-1, 1]"#, json!([-1]), json!([-1])),
        (r#""type": "uint32[]", "enum": [200, 404]"#, json!(404), json!([404])),
        (r#""type": "int64[]", "enum": [-5, 10, 1099511627776]"#, json!(1_099_511_627_776i64), json!([1_099_511_627_776i64])),
        (r#""type": "uint64[]", "enum": [1, 18446744073709551615]"#, json!([u64::MAX]), json!([u64::MAX])),
        (r#""type": "float32[]", "enum": [0.5, 0.25]"#, json!(0.25), json!([0.25])),
        (r#""type": "float64[]", "enum": [1.5, 2.5]"#, json!(1.5), json!([1.5])),
        // text and bytes
        (r#""type": "string""#, json!("caf\u{e9}"), json!("caf\u{e9}")),
        (r#""type": "string""#, json!(""), json!("")),
        (r#""type": "string", "fixed_length": 6"#, json!("ab"), json!("ab")),
        (r#""type": "string", "const": "fixed text""#, json!(null), json!("fixed text")),
        (r#""type": "binary""#, json!("AAEC/w=="), json!("AAEC/w==")),
        (r#""type": "binary", "fixed_length": 4"#, json!("AQI="), json!("AQIAAA==")),
        (r#""type": "binary", "const": "3q2+7w==""#, json!(null), json!("3q2+7w==")),
        (r#""type": "string[]""#, json!(["a", null, ""]), json!(["a", null, ""])),
        (r#""type": "string[]", "const": ["x", null]"#, json!(null), json!(["x", null])),
        (r#""type": "string[]", "enum": ["low", "high"]"#, json!("high"), json!(["high"])),
        // nested
        (
            r#""type": "object", "properties": [{"name": "n", "type": "int64[]"}]"#,
            json!({"n": [1, 2]}),
            json!({"n": [1, 2]}),
        ),
        (
            r#""type": "object[]", "properties": [{"name": "n", "type": "uint64"}]"#,
            json!([{"n": 1}, {"n": u64::MAX}]),
            json!([{"n": 1}, {"n": u64::MAX}]),
        ),
        (
            r#""type": "object[]", "fixed_length": 2, "properties": [{"name": "b", "type": "bool[]"}]"#,
            json!([{"b": [true]}, {"b": []}]),
            json!([{"b": [true]}, {"b": []}]),
        ),
    ]
}

/// Each kind, followed by an int32 so misaligned or over-read payloads
/// show up in the next member.
#[test]
fn test_every_kind_round_trips() {
    for (member, input, expected) in kind_table() {
        let definition = format!(
            r#"{{"type": "object", "properties": [{{"name": "v", {}}}, {{"name": "after", "type": "int32"}}]}}"#,
            member
        );
        let tree = schema(&definition);
        let blob = encode_to_blob(tree.root(), &json!({"v": input, "after": 7}))
            .unwrap_or_else(|e| panic!("{}: {}", member, e));

        let options = DecodeOptions::default();
        let checked = decode_to_string::<Validated>(tree.root(), &blob, &options).unwrap();
        let unchecked = decode_to_string::<Unchecked>(tree.root(), &blob, &options).unwrap();
        assert_eq!(checked, unchecked, "{}", member);
        assert_eq!(
            serde_json::from_str::<Value>(&checked).unwrap(),
            json!({"v": expected, "after": 7}),
            "{}",
            member
        );
    }
}

/// A numeric enum index past its choices fails in both modes.
#[test]
fn test_numeric_enum_index_bounds() {
    let tree = schema(r#"{"type": "int64[]", "enum": [-5, 10, 1099511627776]}"#);
    let blob = 3u16.to_le_bytes();
    let options = DecodeOptions::default();

    for err in [
        decode_to_string::<Validated>(tree.root(), &blob, &options).unwrap_err(),
        decode_to_string::<Unchecked>(tree.root(), &blob, &options).unwrap_err(),
    ] {
        assert!(matches!(err, DecodeError::EnumOutOfRange { index: 3, len: 3 }));
    }

    let last = 2u16.to_le_bytes();
    let text = decode_to_string::<Validated>(tree.root(), &last, &options).unwrap();
    assert_eq!(text, "[1099511627776]");
}

// =============================================================================
// Output Form Tests
// =============================================================================

/// Pretty output parses to the same document as compact output.
#[test]
fn test_pretty_matches_compact() {
    let tree = schema(EVENT);
    let blob = encode_to_blob(tree.root(), &event()).unwrap();

    let compact = decode_to_string::<Validated>(tree.root(), &blob, &DecodeOptions::default()).unwrap();
    let pretty_options = DecodeOptions {
        json: JsonConfig::pretty(),
        ..DecodeOptions::default()
    };
    let pretty = decode_to_string::<Validated>(tree.root(), &blob, &pretty_options).unwrap();

    assert!(!compact.contains('\n'));
    assert!(pretty.contains("\n    \"id\": "));
    assert_eq!(
        serde_json::from_str::<Value>(&compact).unwrap(),
        serde_json::from_str::<Value>(&pretty).unwrap()
    );
}

/// A buffer of the measured size holds the document and its terminator;
/// one byte less is refused.
#[test]
fn test_measured_buffer_fits_exactly() {
    let tree = schema(EVENT);
    let blob = encode_to_blob(tree.root(), &event()).unwrap();
    let options = DecodeOptions::default();

    let text = decode_to_string::<Validated>(tree.root(), &blob, &options).unwrap();
    let needed = measure_json::<Validated>(tree.root(), &blob, &options).unwrap();
    assert_eq!(needed, text.len() + 1);

    let mut buffer = vec![0xffu8; needed];
    let written = decode_into::<Validated>(tree.root(), &blob, &mut buffer, &options).unwrap();
    assert_eq!(&buffer[..written], text.as_bytes());
    assert_eq!(buffer[written], 0);

    let mut short = vec![0u8; needed - 1];
    let err = decode_into::<Validated>(tree.root(), &blob, &mut short, &options).unwrap_err();
    assert!(matches!(err, DecodeError::BufferTooSmall { .. }));
}

/// NaN and infinities have no JSON form and print as null.
#[test]
fn test_non_finite_floats_print_null() {
    let tree = schema(
        r#"{"type": "object", "properties": [
            {"name": "samples", "type": "float64[]"}
        ]}"#,
    );
    let mut blob = Vec::new();
    blob.extend_from_slice(&3u16.to_le_bytes());
    blob.extend_from_slice(&[0u8; 6]);
    for value in [f64::NAN, f64::INFINITY, 2.5] {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    assert_eq!(decode(&tree, &blob), json!({"samples": [null, null, 2.5]}));
}

// =============================================================================
// Failure Tests
// =============================================================================

/// A blob cut short is an error, never a partial document.
#[test]
fn test_truncated_blob_fails() {
    let tree = schema(EVENT);
    let blob = encode_to_blob(tree.root(), &event()).unwrap();
    let short = &blob[..blob.len() / 2];

    let err = decode_to_string::<Validated>(tree.root(), short, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, DecodeError::Blob(_)));
    assert!(!err.is_fatal());
}

/// An enum index past the choice table fails even without validation.
#[test]
fn test_enum_index_bounds() {
    let tree = schema(
        r#"{"type": "object", "properties": [
            {"name": "level", "type": "string[]", "enum": ["debug", "info"]}
        ]}"#,
    );
    let blob = 2u16.to_le_bytes();
    let options = DecodeOptions::default();

    for err in [
        decode_to_string::<Validated>(tree.root(), &blob, &options).unwrap_err(),
        decode_to_string::<Unchecked>(tree.root(), &blob, &options).unwrap_err(),
    ] {
        assert!(matches!(err, DecodeError::EnumOutOfRange { index: 2, len: 2 }));
    }
}

/// Encoding an unknown choice names the offending member.
#[test]
fn test_unknown_choice_rejected() {
    let tree = schema(EVENT);
    let mut value = event();
    value["level"] = json!("fatal");

    let err = encode_to_blob(tree.root(), &value).unwrap_err();
    assert!(err.to_string().contains("$.level"));
}
