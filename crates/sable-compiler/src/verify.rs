//! Class verification
//!
//! The compiler consults a [`ClassVerifier`] before emitting anything when
//! the verify mode asks for it. [`StructuralVerifier`] checks what can be
//! checked from the class description alone.

use crate::class::{ClassDescriptor, Insn};
use crate::descriptor::{JavaType, MethodSig};
use crate::runtime::PrimitiveArray;
use rustc_hash::FxHashSet;

/// Class verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("Invalid descriptor {descriptor} of {member}")]
    InvalidDescriptor { member: String, descriptor: String },

    #[error("Duplicate method {name}{desc}")]
    DuplicateMethod { name: String, desc: String },

    #[error("Duplicate field {0}")]
    DuplicateField(String),

    #[error("Method {0} is abstract but has a body")]
    AbstractWithBody(String),

    #[error("Method {0} is native but has a body")]
    NativeWithBody(String),

    #[error("Abstract method {0} in concrete class")]
    AbstractInConcreteClass(String),

    #[error("Invalid newarray element type {elem} in {method}")]
    InvalidArrayElement { method: String, elem: char },

    #[error("Invalid reference {owner}.{name}:{desc} in {method}")]
    InvalidReference {
        method: String,
        owner: String,
        name: String,
        desc: String,
    },
}

/// Decides whether a class may be compiled
pub trait ClassVerifier {
    fn verify(&mut self, class: &ClassDescriptor) -> Result<(), VerifyError>;
}

/// Checks descriptors, member uniqueness and body/flag consistency
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralVerifier;

impl ClassVerifier for StructuralVerifier {
    fn verify(&mut self, class: &ClassDescriptor) -> Result<(), VerifyError> {
        let mut fields = FxHashSet::default();
        for field in &class.fields {
            if JavaType::parse(&field.desc).is_err() {
                return Err(VerifyError::InvalidDescriptor {
                    member: field.name.clone(),
                    descriptor: field.desc.clone(),
                });
            }
            if !fields.insert(field.name.as_str()) {
                return Err(VerifyError::DuplicateField(field.name.clone()));
            }
        }

        let mut methods = FxHashSet::default();
        for method in &class.methods {
            let qualified = format!("{}{}", method.name, method.desc);
            if MethodSig::parse(&method.desc).is_err() {
                return Err(VerifyError::InvalidDescriptor {
                    member: method.name.clone(),
                    descriptor: method.desc.clone(),
                });
            }
            if !methods.insert((method.name.as_str(), method.desc.as_str())) {
                return Err(VerifyError::DuplicateMethod {
                    name: method.name.clone(),
                    desc: method.desc.clone(),
                });
            }
            if method.body.is_some() {
                if method.is_abstract() {
                    return Err(VerifyError::AbstractWithBody(qualified));
                }
                if method.is_native() {
                    return Err(VerifyError::NativeWithBody(qualified));
                }
            }
            if method.is_abstract() && !class.access.is_abstract() {
                return Err(VerifyError::AbstractInConcreteClass(qualified));
            }
            verify_references(&qualified, method.instructions())?;
        }
        Ok(())
    }
}

fn verify_references(method: &str, instructions: &[Insn]) -> Result<(), VerifyError> {
    for insn in instructions {
        let (member, is_method) = match insn {
            Insn::GetStatic(m) | Insn::PutStatic(m) | Insn::GetField(m) | Insn::PutField(m) => (m, false),
            Insn::InvokeVirtual(m)
            | Insn::InvokeSpecial(m)
            | Insn::InvokeStatic(m)
            | Insn::InvokeInterface(m) => (m, true),
            Insn::NewArray { elem } => {
                if PrimitiveArray::from_descriptor(*elem).is_none() {
                    return Err(VerifyError::InvalidArrayElement {
                        method: method.to_string(),
                        elem: *elem,
                    });
                }
                continue;
            }
            _ => continue,
        };
        let valid = if is_method {
            MethodSig::parse(&member.desc).is_ok()
        } else {
            JavaType::parse(&member.desc).is_ok_and(|t| t != JavaType::Void)
        };
        if !valid {
            return Err(VerifyError::InvalidReference {
                method: method.to_string(),
                owner: member.owner.clone(),
                name: member.name.clone(),
                desc: member.desc.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(json: &str) -> ClassDescriptor {
        ClassDescriptor::from_json(json).unwrap()
    }

    #[test]
    fn test_accepts_well_formed_class() {
        let c = class(
            r#"{
                "name": "a/A", "super": "java/lang/Object", "access": 1,
                "fields": [{"name": "x", "desc": "I"}],
                "methods": [{"name": "m", "desc": "()V", "body": {"instructions": [
                    {"op": "getstatic", "owner": "a/B", "name": "y", "desc": "J"},
                    {"op": "invokestatic", "owner": "a/B", "name": "n", "desc": "(J)V"}
                ]}}]
            }"#,
        );
        assert_eq!(StructuralVerifier.verify(&c), Ok(()));
    }

    #[test]
    fn test_rejects_duplicates_and_bad_descriptors() {
        let dup = class(
            r#"{"name": "a/A", "methods": [
                {"name": "m", "desc": "()V"}, {"name": "m", "desc": "()V"}
            ]}"#,
        );
        assert!(matches!(
            StructuralVerifier.verify(&dup),
            Err(VerifyError::DuplicateMethod { .. })
        ));

        let bad = class(r#"{"name": "a/A", "fields": [{"name": "x", "desc": "Q"}]}"#);
        assert!(matches!(
            StructuralVerifier.verify(&bad),
            Err(VerifyError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_rejects_abstract_method_in_concrete_class() {
        let c = class(r#"{"name": "a/A", "access": 1, "methods": [{"name": "m", "desc": "()V", "access": 1024}]}"#);
        assert_eq!(
            StructuralVerifier.verify(&c),
            Err(VerifyError::AbstractInConcreteClass("m()V".to_string()))
        );
    }

    #[test]
    fn test_rejects_malformed_reference() {
        let c = class(
            r#"{"name": "a/A", "methods": [{"name": "m", "desc": "()V", "body": {"instructions": [
                {"op": "getfield", "owner": "a/B", "name": "f", "desc": "V"}
            ]}}]}"#,
        );
        let err = StructuralVerifier.verify(&c).unwrap_err();
        assert_eq!(err.to_string(), "Invalid reference a/B.f:V in m()V");
    }

    #[test]
    fn test_newarray_needs_primitive_element() {
        let body = |elem: &str| {
            class(&format!(
                r#"{{"name": "a/A", "methods": [{{"name": "m", "desc": "()V", "body": {{"instructions": [
                    {{"op": "newarray", "elem": "{elem}"}}
                ]}}}}]}}"#
            ))
        };
        assert_eq!(StructuralVerifier.verify(&body("Z")), Ok(()));
        assert_eq!(
            StructuralVerifier.verify(&body("L")),
            Err(VerifyError::InvalidArrayElement {
                method: "m()V".to_string(),
                elem: 'L',
            })
        );
    }
}
