// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end dispatch: primitive echo, overload selection, and error
//! envelopes, driven through the full bridge pipeline.

use orb_bridge::Bridge;
use orb_core::{
    CallContext, ClassBuilder, ClassSchema, Instance, IntWidth, NativeValue, TypeDesc, TypeRegistry,
};
use orb_protocol::JsonRpcResult;
use serde_json::{Value, json};
use std::sync::Arc;

// ── Helpers ──────────────────────────────────────────────────────────────

/// Install a test subscriber once so `orb.bridge` debug output is visible
/// under `RUST_LOG` when a test fails.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn echo_schema() -> Arc<ClassSchema> {
    ClassBuilder::new("EchoService")
        .method(
            "echo",
            vec![
                TypeDesc::Int(IntWidth::I32),
                TypeDesc::String,
                TypeDesc::Bool,
                TypeDesc::Any,
            ],
            |_ctx, _this, mut args| Ok(args.remove(0)),
        )
        .build()
}

fn session_with_echo() -> Arc<Bridge> {
    let global = Bridge::global(Arc::new(TypeRegistry::new()));
    let session = Bridge::session(&global);
    session
        .register_object("svc", Instance::new(echo_schema(), ()))
        .unwrap();
    session
}

fn call(bridge: &Arc<Bridge>, request: Value) -> JsonRpcResult {
    bridge.call(&CallContext::none(), &request)
}

// ── Scenario: echo primitives ────────────────────────────────────────────

#[test]
fn echo_primitives() {
    init_tracing();
    let session = session_with_echo();
    let out = call(
        &session,
        json!({"id": 1, "method": "svc.echo", "params": [42, "hi", true, null]}),
    );
    assert_eq!(out.to_value(), json!({"id": 1, "result": 42}));
}

#[test]
fn echo_id_is_echoed_verbatim() {
    let session = session_with_echo();
    let out = call(
        &session,
        json!({"id": "req-9", "method": "svc.echo", "params": [7, "s", false, null]}),
    );
    assert_eq!(out.to_value()["id"], json!("req-9"));
}

// ── Scenario: overload resolution ────────────────────────────────────────

fn overload_session() -> Arc<Bridge> {
    let global = Bridge::global(Arc::new(TypeRegistry::new()));
    let session = Bridge::session(&global);
    let schema = ClassBuilder::new("Overloads")
        .method("f", vec![TypeDesc::Int(IntWidth::I32)], |_, _, _| {
            Ok(NativeValue::String("int".into()))
        })
        .method("f", vec![TypeDesc::String], |_, _, _| {
            Ok(NativeValue::String("string".into()))
        })
        .build();
    session
        .register_object("over", Instance::new(schema, ()))
        .unwrap();
    session
}

#[test]
fn numeric_param_picks_int_overload() {
    let session = overload_session();
    let out = call(&session, json!({"id": 1, "method": "over.f", "params": [3]}));
    assert_eq!(out.result.unwrap(), json!("int"));
}

#[test]
fn string_param_picks_string_overload() {
    // "3" would coerce into the int overload, but the string overload is
    // the better (more specific) match.
    let session = overload_session();
    let out = call(&session, json!({"id": 1, "method": "over.f", "params": ["3"]}));
    assert_eq!(out.result.unwrap(), json!("string"));
}

#[test]
fn overload_resolution_is_stable_across_calls() {
    let session = overload_session();
    for _ in 0..5 {
        let out = call(&session, json!({"id": 1, "method": "over.f", "params": ["3"]}));
        assert_eq!(out.result.unwrap(), json!("string"));
    }
}

// ── Error envelopes ──────────────────────────────────────────────────────

#[test]
fn malformed_request_yields_parse_error() {
    let session = session_with_echo();
    let out = call(&session, json!({"id": 2, "method": "svc.echo"}));
    let error = out.error.unwrap();
    assert_eq!(error.code, 590);
}

#[test]
fn unknown_object_yields_no_method() {
    let session = session_with_echo();
    let out = call(&session, json!({"id": 3, "method": "nope.echo", "params": []}));
    assert_eq!(out.error.unwrap().code, 591);
}

#[test]
fn throwing_handler_yields_remote_exception_with_trace() {
    let global = Bridge::global(Arc::new(TypeRegistry::new()));
    let session = Bridge::session(&global);
    let schema = ClassBuilder::new("Faulty")
        .method("blow", vec![], |_, _, _| Err("division by zero".into()))
        .build();
    session
        .register_object("svc", Instance::new(schema, ()))
        .unwrap();
    let out = call(&session, json!({"id": 4, "method": "svc.blow", "params": []}));
    let error = out.error.unwrap();
    assert_eq!(error.code, 490);
    assert_eq!(error.msg, "division by zero");
    assert!(error.trace.is_some());
}

// ── ASCII rendering of envelopes ─────────────────────────────────────────

#[test]
fn envelope_renders_ascii_clean() {
    let global = Bridge::global(Arc::new(TypeRegistry::new()));
    let session = Bridge::session(&global);
    let schema = ClassBuilder::new("I18n")
        .method("greet", vec![], |_, _, _| {
            Ok(NativeValue::String("héllo — 日本".into()))
        })
        .build();
    session
        .register_object("svc", Instance::new(schema, ()))
        .unwrap();
    let out = call(&session, json!({"id": 5, "method": "svc.greet", "params": []}));
    let rendered = out.to_ascii_string();
    assert!(rendered.is_ascii());
    let back: Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(back["result"], json!("héllo — 日本"));
}

// ── listMethods properties ───────────────────────────────────────────────

#[test]
fn every_listed_entry_is_resolvable() {
    let session = session_with_echo();
    let out = call(
        &session,
        json!({"id": 6, "method": "system.listMethods", "params": []}),
    );
    let listed = out.result.unwrap();
    for entry in listed.as_array().unwrap() {
        let name = entry.as_str().unwrap();
        // Probing with a huge arity still proves the target resolves: a
        // resolvable target fails with a NoMethod arity message, an
        // unresolvable one with "not a registered object or class".
        let probe = call(
            &session,
            json!({"id": 7, "method": name, "params": []}),
        );
        if let Some(error) = probe.error {
            assert!(
                !error.msg.contains("not a registered"),
                "{name} should resolve, got: {}",
                error.msg
            );
        }
    }
}
