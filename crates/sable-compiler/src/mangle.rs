//! Symbol mangling
//!
//! All symbol names derived from managed names use the JNI escaping rules so
//! that mangled names are valid C identifiers and never collide:
//! `/` becomes `_`, `_` becomes `_1`, `;` becomes `_2`, `[` becomes `_3`
//! and any other character that is not an ASCII letter or digit becomes
//! `_0xxxx` (UTF-16 code unit in lowercase hex).

use crate::descriptor::MethodSig;
use crate::error::CompileResult;

/// Escape a managed name
pub fn mangle(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '/' => out.push('_'),
            '_' => out.push_str("_1"),
            ';' => out.push_str("_2"),
            '[' => out.push_str("_3"),
            c if c.is_ascii_alphanumeric() => out.push(c),
            c => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("_0{:04x}", unit));
                }
            }
        }
    }
    out
}

/// Symbol of a compiled method body
pub fn method_symbol(owner: &str, name: &str, desc: &str) -> String {
    format!("{}_{}__{}", mangle(owner), mangle(name), mangle(desc))
}

/// Symbol of the synchronized wrapper around a method body
pub fn synchronized_symbol(owner: &str, name: &str, desc: &str) -> String {
    format!("{}_synchronized", method_symbol(owner, name, desc))
}

/// Symbol of the native-callable thunk of a callback method
pub fn callback_symbol(owner: &str, name: &str, desc: &str) -> String {
    format!("{}_callback", method_symbol(owner, name, desc))
}

/// Symbol of the class-constructor routine
pub fn class_init_symbol(class: &str) -> String {
    format!("ClassInit_{}", mangle(class))
}

/// Short JNI name of a native method: `Java_<class>_<method>`
pub fn native_short_name(owner: &str, name: &str) -> String {
    format!("Java_{}_{}", mangle(owner), mangle(name))
}

/// Long (overload-qualified) JNI name: `Java_<class>_<method>__<params>`
pub fn native_long_name(owner: &str, name: &str, desc: &str) -> CompileResult<String> {
    let sig = MethodSig::parse(desc)?;
    Ok(format!(
        "{}__{}",
        native_short_name(owner, name),
        mangle(&sig.params_descriptor())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle_escapes() {
        assert_eq!(mangle("java/lang/String"), "java_lang_String");
        assert_eq!(mangle("a_b"), "a_1b");
        assert_eq!(mangle("[La/B;"), "_3La_B_2");
        assert_eq!(mangle("<init>"), "_0003cinit_0003e");
        assert_eq!(mangle("a$b"), "a_00024b");
        assert_eq!(mangle("é"), "_000e9");
    }

    #[test]
    fn test_native_names() {
        assert_eq!(native_short_name("a/B", "m"), "Java_a_B_m");
        assert_eq!(
            native_long_name("a/B", "m", "(ILjava/lang/String;)V").unwrap(),
            "Java_a_B_m__ILjava_lang_String_2"
        );
        assert_eq!(native_long_name("a/B", "m", "()V").unwrap(), "Java_a_B_m__");
        assert!(native_long_name("a/B", "m", "bogus").is_err());
    }

    #[test]
    fn test_method_symbols_are_distinct() {
        let a = method_symbol("a/B", "m", "(I)V");
        let b = method_symbol("a/B", "m", "(J)V");
        assert_ne!(a, b);
        assert_eq!(synchronized_symbol("a/B", "m", "(I)V"), format!("{}_synchronized", a));
        assert_eq!(class_init_symbol("a/B"), "ClassInit_a_B");
    }
}
