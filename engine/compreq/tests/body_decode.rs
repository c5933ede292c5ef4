use std::time::{Duration, Instant};

use compreq::{
    decode, decode_with_options, from_json_str, DecodeOptions, ErrorKind, InboundRequest,
    RequestError, UploadedFile, Value,
};

fn form(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn json_body_exposes_every_member() {
    let request = InboundRequest::json(
        "/message/counter",
        r#"{"checksum": "abc", "id": "c1", "epoch": "17", "key": "k", "hash": "h",
            "data": {"count": 1},
            "actionQueue": [{"type": "syncInput", "payload": {"name": "count", "value": 2}}]}"#,
    );
    let document = decode(&request).expect("decode");
    assert_eq!(document.checksum.as_deref(), Some("abc"));
    assert_eq!(document.id.as_deref(), Some("c1"));
    assert_eq!(document.epoch.as_deref(), Some("17"));
    assert_eq!(document.key, "k");
    assert_eq!(document.hash, "h");
    assert_eq!(
        document.data,
        Some(from_json_str(r#"{"count": 1}"#).expect("json"))
    );
    assert_eq!(document.action_queue.len(), 1);
    assert_eq!(document.action_queue[0].action_type, "syncInput");
    assert_eq!(
        document.action_queue[0].payload.get("value"),
        Some(&Value::Int(2))
    );
}

#[test]
fn optional_members_default_to_empty() {
    let request = InboundRequest::json("/", r#"{"id": "c1", "data": {}}"#);
    let document = decode(&request).expect("decode");
    assert_eq!(document.key, "");
    assert_eq!(document.hash, "");
    assert_eq!(document.checksum, None);
    assert_eq!(document.epoch, None);
    assert!(document.action_queue.is_empty());
}

#[test]
fn numeric_epoch_is_rendered_as_text() {
    let request = InboundRequest::json("/", r#"{"id": 42, "epoch": 1700000000123, "data": {}}"#);
    let document = decode(&request).expect("decode");
    assert_eq!(document.id.as_deref(), Some("42"));
    assert_eq!(document.epoch.as_deref(), Some("1700000000123"));
}

#[test]
fn zero_id_and_epoch_count_as_absent() {
    let document = decode(&InboundRequest::json(
        "/",
        r#"{"id": 0, "epoch": 0, "key": 0, "data": {}}"#,
    ))
    .expect("decode");
    assert_eq!(document.id, None);
    assert_eq!(document.epoch, None);
    assert_eq!(document.key, "0");

    let document = decode(&InboundRequest::json("/", r#"{"id": 0.0, "epoch": "0"}"#))
        .expect("decode");
    assert_eq!(document.id, None);
    assert_eq!(document.epoch.as_deref(), Some("0"));
}

#[test]
fn wide_json_objects_decode_in_linear_time() {
    let members: Vec<String> = (0..150_000).map(|i| format!(r#""k{i}":0"#)).collect();
    let body = format!(r#"{{"id": "c1", "epoch": "1", "data": {{{}}}}}"#, members.join(","));
    assert!(body.len() < DecodeOptions::default().max_body_bytes);

    let started = Instant::now();
    let document = decode(&InboundRequest::json("/", body)).expect("decode");
    let elapsed = started.elapsed();
    let data = document.data.expect("data");
    assert_eq!(data.as_mapping().map(|data| data.len()), Some(150_000));
    assert_eq!(data.get("k149999"), Some(&Value::Int(0)));
    assert!(elapsed < Duration::from_secs(15), "took {elapsed:?}");
}

#[test]
fn null_data_counts_as_absent() {
    let request = InboundRequest::json("/", r#"{"id": "c1", "data": null}"#);
    let document = decode(&request).expect("decode");
    assert_eq!(document.data, None);
}

#[test]
fn invalid_json_is_body_parse_error() {
    let request = InboundRequest::json("/", "{not json");
    let err = decode(&request).expect_err("invalid json");
    assert_eq!(err.kind(), ErrorKind::BodyParse);
}

#[test]
fn empty_documents_are_rejected() {
    for body in ["{}", "null", "[]", "\"\"", "0", "false"] {
        let err = decode(&InboundRequest::json("/", body)).expect_err(body);
        match err {
            RequestError::BodyParse(message) => assert_eq!(message, "Invalid body", "{body}"),
            other => panic!("unexpected error for {body}: {other:?}"),
        }
    }
}

#[test]
fn non_object_documents_are_rejected() {
    let err = decode(&InboundRequest::json("/", "[1, 2]")).expect_err("array body");
    assert_eq!(err.kind(), ErrorKind::BodyParse);
}

#[test]
fn oversized_body_is_rejected_before_parsing() {
    let options = DecodeOptions {
        max_body_bytes: 8,
        ..DecodeOptions::default()
    };
    let err = decode_with_options(&InboundRequest::json("/", r#"{"id": "c1"}"#), &options)
        .expect_err("too large");
    assert_eq!(err.kind(), ErrorKind::BodyParse);
}

#[test]
fn action_queue_must_be_a_list_of_objects() {
    let err = decode(&InboundRequest::json("/", r#"{"id": "c1", "actionQueue": {}}"#))
        .expect_err("object queue");
    assert_eq!(err.kind(), ErrorKind::BodyParse);

    let err = decode(&InboundRequest::json("/", r#"{"id": "c1", "actionQueue": [{}, 3]}"#))
        .expect_err("scalar entry");
    match err {
        RequestError::BodyParse(message) => assert!(message.contains("actionQueue[1]"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_payload_is_an_empty_mapping() {
    let document = decode(&InboundRequest::json(
        "/",
        r#"{"id": "c1", "actionQueue": [{"type": "callMethod", "partials": ["p"]}]}"#,
    ))
    .expect("decode");
    let action = &document.action_queue[0];
    assert!(action.payload.is_empty());
    assert_eq!(action.method_expression(), "");
    assert!(action.extra.contains_key("partials"));
}

#[test]
fn multipart_form_matches_equivalent_json() {
    let multipart = InboundRequest::multipart(
        "/message/profile",
        form(&[
            ("checksum", "abc"),
            ("id", "c1"),
            ("epoch", "17"),
            ("data.profile.name", "Ada"),
            ("data.tags[0]", "x"),
            ("data.tags[1]", "y"),
            (
                "actionQueue",
                r#"[{"type": "callMethod", "payload": {"name": "save"}}]"#,
            ),
        ]),
        Vec::new(),
    );
    let json = InboundRequest::json(
        "/message/profile",
        r#"{"data": {"tags": ["x", "y"], "profile": {"name": "Ada"}}, "epoch": "17", "id": "c1",
            "checksum": "abc", "actionQueue": [{"type": "callMethod", "payload": {"name": "save"}}]}"#,
    );
    assert_eq!(
        decode(&multipart).expect("multipart"),
        decode(&json).expect("json")
    );
}

#[test]
fn multipart_files_merge_into_data() {
    let upload = UploadedFile::new("avatar.png", 512, Some("image/png".into()));
    let request = InboundRequest::multipart(
        "/",
        form(&[("id", "c1"), ("data.name", "Ada")]),
        vec![("data.avatar".to_string(), vec![upload.clone()])],
    );
    let document = decode(&request).expect("decode");
    let data = document.data.expect("data");
    assert_eq!(data.get("name"), Some(&Value::from("Ada")));
    assert_eq!(data.get("avatar"), Some(&Value::File(upload)));
}

#[test]
fn multipart_action_queue_must_be_json() {
    let request = InboundRequest::multipart(
        "/",
        form(&[("id", "c1"), ("actionQueue", "[{")]),
        Vec::new(),
    );
    let err = decode(&request).expect_err("bad queue");
    match err {
        RequestError::BodyParse(message) => {
            assert!(message.starts_with("actionQueue is not valid JSON"), "{message}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn multipart_bad_path_is_path_encoding_error() {
    let request = InboundRequest::multipart("/", form(&[("data.items[a]", "v")]), Vec::new());
    let err = decode(&request).expect_err("bad key");
    assert_eq!(err.kind(), ErrorKind::PathEncoding);
}

#[test]
fn multipart_deep_key_is_path_encoding_error() {
    let key = format!("data{}", ".a".repeat(200_000));
    let request = InboundRequest::multipart("/", vec![(key, "x".to_string())], Vec::new());
    let err = decode(&request).expect_err("deep key");
    assert_eq!(err.kind(), ErrorKind::PathEncoding);

    let options = DecodeOptions {
        max_depth: 1,
        ..DecodeOptions::default()
    };
    let request = InboundRequest::multipart("/", form(&[("data.a.b", "x")]), Vec::new());
    let err = decode_with_options(&request, &options).expect_err("depth above option");
    assert_eq!(err.kind(), ErrorKind::PathEncoding);
}

#[test]
fn empty_multipart_body_is_rejected() {
    let request = InboundRequest::multipart("/", Vec::new(), Vec::new());
    let err = decode(&request).expect_err("empty form");
    assert_eq!(err.kind(), ErrorKind::BodyParse);
}

#[test]
fn content_type_parameters_do_not_hide_multipart() {
    let request = InboundRequest {
        content_type: Some("multipart/form-data; boundary=----x".into()),
        form: form(&[("id", "c1")]),
        ..Default::default()
    };
    assert!(request.is_multipart());
    assert!(!InboundRequest::json("/", "{}").is_multipart());
    assert!(!InboundRequest::default().is_multipart());
}
