//! Integration tests for synchronized wrappers

mod common;

use common::{compile, paths};
use sable_compiler::mangle;

const COUNTER: &str = r#"{
    "name": "a/Counter",
    "super": "java/lang/Object",
    "access": 1,
    "methods": [
        {"name": "bump", "desc": "(I)I", "access": 34, "body": {"instructions": []}},
        {"name": "reset", "desc": "()V", "access": 41, "body": {"instructions": []}},
        {"name": "run", "desc": "()V", "access": 1, "body": {"instructions": [
            {"op": "invokespecial", "owner": "a/Counter", "name": "bump", "desc": "(I)I"},
            {"op": "invokestatic", "owner": "a/Counter", "name": "reset", "desc": "()V"}
        ]}}
    ]
}"#;

#[test]
fn test_wrapper_releases_monitor_on_both_paths() {
    let module = compile(COUNTER);
    assert!(module.validate().is_ok(), "{:?}", module.validate());

    let wrapper = module
        .get_function(&mangle::synchronized_symbol("a/Counter", "bump", "(I)I"))
        .unwrap();
    assert_eq!(wrapper.call_count("_bcMonitorEnter"), 1);
    assert_eq!(wrapper.call_count("_bcMonitorExit"), 2);
    assert_eq!(wrapper.call_count("_bcThrowIfExceptionOccurred"), 1);
    assert_eq!(
        wrapper.call_count(&mangle::method_symbol("a/Counter", "bump", "(I)I")),
        1
    );
    assert!(wrapper.block("failure").is_some_and(|b| b.is_landing_pad()));

    let paths = paths(wrapper);
    assert_eq!(paths.len(), 2);
    for path in &paths {
        assert_eq!(path.count("_bcMonitorEnter"), 1, "{:?}", path.blocks);
        assert_eq!(path.count("_bcMonitorExit"), 1, "{:?}", path.blocks);
        assert_eq!(path.returns, path.unwound.is_empty(), "{:?}", path.blocks);
    }
}

#[test]
fn test_static_wrapper_locks_the_class_object() {
    let module = compile(COUNTER);
    let wrapper = module
        .get_function(&mangle::synchronized_symbol("a/Counter", "reset", "()V"))
        .unwrap();

    assert_eq!(wrapper.call_count("_bcClassObject"), 1);
    assert_eq!(wrapper.ty.to_string(), "void (%Env*)");
}

#[test]
fn test_direct_calls_go_through_the_wrapper() {
    let module = compile(COUNTER);
    let run = module
        .get_function(&mangle::method_symbol("a/Counter", "run", "()V"))
        .unwrap();

    assert_eq!(
        run.call_count(&mangle::synchronized_symbol("a/Counter", "bump", "(I)I")),
        1
    );
    assert_eq!(
        run.call_count(&mangle::synchronized_symbol("a/Counter", "reset", "()V")),
        1
    );
    assert_eq!(run.call_count(&mangle::method_symbol("a/Counter", "bump", "(I)I")), 0);
}
