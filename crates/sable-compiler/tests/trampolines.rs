//! Integration tests for lazy-linking trampolines

mod common;

use common::{callers_of, compile};
use sable_compiler::mangle;

const CALLER: &str = r#"{
    "name": "a/A",
    "super": "java/lang/Object",
    "access": 1,
    "methods": [
        {"name": "run", "desc": "()V", "access": 9, "body": {"instructions": [
            {"op": "invokestatic", "owner": "a/B", "name": "f", "desc": "()V"},
            {"op": "invokestatic", "owner": "a/B", "name": "f", "desc": "()V"},
            {"op": "getstatic", "owner": "a/B", "name": "x", "desc": "I"},
            {"op": "putstatic", "owner": "a/B", "name": "x", "desc": "I"},
            {"op": "invokestatic", "owner": "a/A", "name": "helper", "desc": "()V"},
            {"op": "invokevirtual", "owner": "a/A", "name": "over", "desc": "()V"},
            {"op": "new", "class": "a/C"},
            {"op": "checkcast", "class": "a/C"},
            {"op": "iconst_0"}
        ]}},
        {"name": "helper", "desc": "()V", "access": 10, "body": {"instructions": []}},
        {"name": "over", "desc": "()V", "access": 1, "body": {"instructions": []}}
    ]
}"#;

fn site(kind: &str, owner: &str, name: &str, desc: &str) -> String {
    format!("{}_{}", kind, mangle::method_symbol(owner, name, desc))
}

// ============================================================================
// Deduplication
// ============================================================================

#[test]
fn test_repeated_reference_shares_one_stub() {
    let module = compile(CALLER);
    assert!(module.validate().is_ok(), "{:?}", module.validate());

    let run = module
        .get_function(&mangle::method_symbol("a/A", "run", "()V"))
        .unwrap();
    let stub = site("InvokeStatic", "a/B", "f", "()V");
    assert_eq!(run.call_count(&stub), 2);
    assert!(module.has_global(&format!("{}_Site", stub)));
    assert_eq!(callers_of(&module, &stub), 1);
}

#[test]
fn test_get_and_put_share_a_common_record() {
    let module = compile(CALLER);

    assert_eq!(module.globals_with_prefix("GetPutStaticCommon_").count(), 1);
    assert!(module.has_global(&format!("{}_Site", site("GetStatic", "a/B", "x", "I"))));
    assert!(module.has_global(&format!("{}_Site", site("PutStatic", "a/B", "x", "I"))));
}

#[test]
fn test_class_operations_share_a_common_record() {
    let module = compile(CALLER);

    assert_eq!(module.globals_with_prefix("ClassResCommon_").count(), 1);
    assert!(module.has_global("New_a_C_Site"));
    assert!(module.has_global("Checkcast_a_C_Site"));
    assert!(module.has_function("New_a_C"));
}

// ============================================================================
// Elision
// ============================================================================

#[test]
fn test_statically_bound_call_into_own_class_is_direct() {
    let module = compile(CALLER);
    let run = module
        .get_function(&mangle::method_symbol("a/A", "run", "()V"))
        .unwrap();

    let helper = mangle::method_symbol("a/A", "helper", "()V");
    assert_eq!(run.call_count(&helper), 1);
    assert!(!module.has_function(&site("InvokeStatic", "a/A", "helper", "()V")));
    assert_eq!(module.globals_with_prefix("InvokeStaticCommon_").count(), 1);
}

#[test]
fn test_overridable_call_into_own_class_keeps_trampoline() {
    let module = compile(CALLER);
    let stub = site("InvokeVirtual", "a/A", "over", "()V");

    assert!(module.has_function(&stub));
    assert_eq!(module.globals_with_prefix("InvokeVirtualCommon_").count(), 1);
}

#[test]
fn test_class_with_only_private_calls_has_no_trampolines() {
    let module = compile(
        r#"{
            "name": "a/P",
            "super": "java/lang/Object",
            "methods": [
                {"name": "a", "desc": "()V", "access": 2, "body": {"instructions": [
                    {"op": "invokespecial", "owner": "a/P", "name": "b", "desc": "(I)V"}
                ]}},
                {"name": "b", "desc": "(I)V", "access": 2, "body": {"instructions": []}}
            ]
        }"#,
    );

    assert_eq!(module.globals.iter().filter(|g| g.name.ends_with("_Site")).count(), 0);
    assert_eq!(module.globals.iter().filter(|g| g.name.contains("Common_")).count(), 0);
    let a = module.get_function(&mangle::method_symbol("a/P", "a", "()V")).unwrap();
    assert_eq!(a.call_count(&mangle::method_symbol("a/P", "b", "(I)V")), 1);
}

// ============================================================================
// Isolation
// ============================================================================

#[test]
fn test_each_class_gets_its_own_records() {
    let first = compile(CALLER);
    let second = compile(CALLER);

    // Same input, same output; nothing carried over between compilations
    assert_eq!(first.globals.len(), second.globals.len());
    assert_eq!(
        first.globals_with_prefix("InvokeStaticCommon_").count(),
        second.globals_with_prefix("InvokeStaticCommon_").count()
    );
}
