use bytes::Bytes;
use http::Method;
use serde_json::json;

use crate::request::HttpBody;
use crate::util::{
    APPLICATION_FORM_URLENCODED, APPLICATION_JSON, matches_media_type, serialize_request_body,
    supports_request_body,
};

#[test]
fn media_type_match_ignores_parameters_and_case() {
    assert!(matches_media_type("application/json", APPLICATION_JSON));
    assert!(matches_media_type(
        "Application/JSON; charset=utf-8",
        APPLICATION_JSON
    ));
    assert!(!matches_media_type("application/xml", APPLICATION_JSON));
}

#[test]
fn only_post_put_patch_carry_bodies() {
    assert!(supports_request_body(&Method::POST));
    assert!(supports_request_body(&Method::PUT));
    assert!(supports_request_body(&Method::PATCH));
    assert!(!supports_request_body(&Method::GET));
    assert!(!supports_request_body(&Method::DELETE));
}

#[test]
fn json_body_serializes_for_json_content_type() {
    let body = HttpBody::Json(json!({ "name": "demo" }));
    let bytes = serialize_request_body(body, Some("application/json; charset=utf-8"))
        .expect("json body should serialize")
        .expect("body should not be empty");
    assert_eq!(bytes, Bytes::from_static(b"{\"name\":\"demo\"}"));
}

#[test]
fn json_body_serializes_as_form_for_form_content_type() {
    let body = HttpBody::Json(json!({ "a": "1" }));
    let bytes = serialize_request_body(body, Some(APPLICATION_FORM_URLENCODED))
        .expect("form body should serialize")
        .expect("body should not be empty");
    assert_eq!(bytes, Bytes::from_static(b"a=1"));
}

#[test]
fn form_pairs_serialize_urlencoded() {
    let body = HttpBody::Form(vec![
        ("name".to_owned(), "demo item".to_owned()),
        ("count".to_owned(), "2".to_owned()),
    ]);
    let bytes = serialize_request_body(body, Some(APPLICATION_FORM_URLENCODED))
        .expect("form body should serialize")
        .expect("body should not be empty");
    assert_eq!(bytes, Bytes::from_static(b"name=demo+item&count=2"));
}

#[test]
fn text_and_bytes_bodies_pass_through() {
    let text = serialize_request_body(HttpBody::Text("raw".to_owned()), Some("text/plain"))
        .expect("text body should pass through")
        .expect("body should not be empty");
    assert_eq!(text, Bytes::from_static(b"raw"));

    let raw = serialize_request_body(
        HttpBody::Bytes(Bytes::from_static(b"\x00\x01")),
        Some("application/octet-stream"),
    )
    .expect("bytes body should pass through")
    .expect("body should not be empty");
    assert_eq!(raw, Bytes::from_static(b"\x00\x01"));
}

#[test]
fn empty_body_serializes_to_nothing() {
    assert!(
        serialize_request_body(HttpBody::Empty, Some(APPLICATION_JSON))
            .expect("empty body should serialize")
            .is_none()
    );
}

#[test]
fn structured_body_with_unsupported_content_type_is_an_error() {
    let body = HttpBody::Json(json!({ "a": 1 }));
    assert!(serialize_request_body(body, Some("application/xml")).is_err());
}

#[test]
fn missing_content_type_defaults_structured_bodies_to_json() {
    let body = HttpBody::Json(json!([1, 2]));
    let bytes = serialize_request_body(body, None)
        .expect("body should serialize")
        .expect("body should not be empty");
    assert_eq!(bytes, Bytes::from_static(b"[1,2]"));
}
