//! Compilation target
//!
//! Architecture and operating system decide pointer width, aggregate layout
//! and which aggregate return values travel in registers.

use crate::error::CompileError;
use crate::ir::Type;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86,
    X86_64,
    Thumbv7,
    Arm64,
}

impl Arch {
    pub fn is_64bit(&self) -> bool {
        matches!(self, Arch::X86_64 | Arch::Arm64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Thumbv7 => "thumbv7",
            Arch::Arm64 => "arm64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    MacOsX,
    Ios,
}

impl Os {
    pub fn is_darwin(&self) -> bool {
        matches!(self, Os::MacOsX | Os::Ios)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::MacOsX => "macosx",
            Os::Ios => "ios",
        }
    }
}

/// An `<arch>-<os>` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub arch: Arch,
    pub os: Os,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            arch: Arch::X86_64,
            os: Os::Linux,
        }
    }
}

impl Target {
    pub fn new(arch: Arch, os: Os) -> Self {
        Self { arch, os }
    }

    pub fn data_layout(&self) -> DataLayout {
        DataLayout { target: *self }
    }

    /// Whether an aggregate of `size` bytes is returned in registers rather
    /// than through a hidden struct-return pointer
    pub fn returns_in_registers(&self, size: u64) -> bool {
        match self.arch {
            // i386 Darwin returns 1, 2, 4 and 8 byte structs in EAX:EDX;
            // the System V i386 ABI always uses memory.
            Arch::X86 => self.os.is_darwin() && matches!(size, 1 | 2 | 4 | 8),
            Arch::Thumbv7 => size <= 4,
            Arch::X86_64 | Arch::Arm64 => size <= 8,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.arch.name(), self.os.name())
    }
}

impl FromStr for Target {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CompileError::Config(format!("unknown target '{}'", s));
        let (arch, os) = s.rsplit_once('-').ok_or_else(err)?;
        let arch = match arch {
            "x86" => Arch::X86,
            "x86_64" => Arch::X86_64,
            "thumbv7" => Arch::Thumbv7,
            "arm64" => Arch::Arm64,
            _ => return Err(err()),
        };
        let os = match os {
            "linux" => Os::Linux,
            "macosx" => Os::MacOsX,
            "ios" => Os::Ios,
            _ => return Err(err()),
        };
        Ok(Target { arch, os })
    }
}

/// Sizes and alignments of IR types on a target
#[derive(Debug, Clone, Copy)]
pub struct DataLayout {
    target: Target,
}

impl DataLayout {
    pub fn pointer_size(&self) -> u64 {
        if self.target.arch.is_64bit() {
            8
        } else {
            4
        }
    }

    /// ABI alignment; named and function types are unsized and report 1
    pub fn align_of(&self, ty: &Type) -> u64 {
        match ty {
            Type::I1 | Type::I8 => 1,
            Type::I16 => 2,
            Type::I32 | Type::Float => 4,
            Type::I64 | Type::Double => {
                if self.target.arch == Arch::X86 {
                    4
                } else {
                    8
                }
            }
            Type::Ptr(_) => self.pointer_size(),
            Type::Struct(fields) => fields.iter().map(|f| self.align_of(f)).max().unwrap_or(1),
            Type::Array(_, elem) => self.align_of(elem),
            Type::Void | Type::Named(_) | Type::Function(_) => 1,
        }
    }

    /// Bytes an allocation of `ty` occupies, including tail padding
    pub fn alloc_size(&self, ty: &Type) -> u64 {
        match ty {
            Type::I1 | Type::I8 => 1,
            Type::I16 => 2,
            Type::I32 | Type::Float => 4,
            Type::I64 | Type::Double => 8,
            Type::Ptr(_) => self.pointer_size(),
            Type::Struct(fields) => {
                let end = self
                    .field_offsets(fields)
                    .last()
                    .zip(fields.last())
                    .map(|(off, f)| off + self.alloc_size(f))
                    .unwrap_or(0);
                align_to(end, self.align_of(ty))
            }
            Type::Array(len, elem) => len * self.alloc_size(elem),
            Type::Void | Type::Named(_) | Type::Function(_) => 0,
        }
    }

    /// Byte offset of every field of a structure with the given fields
    pub fn field_offsets(&self, fields: &[Type]) -> Vec<u64> {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut offset = 0;
        for field in fields {
            offset = align_to(offset, self.align_of(field));
            offsets.push(offset);
            offset += self.alloc_size(field);
        }
        offsets
    }
}

fn align_to(value: u64, align: u64) -> u64 {
    value.div_ceil(align.max(1)) * align.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        let t: Target = "x86_64-macosx".parse().unwrap();
        assert_eq!(t, Target::new(Arch::X86_64, Os::MacOsX));
        assert_eq!(t.to_string(), "x86_64-macosx");
        assert!("x86_64".parse::<Target>().is_err());
        assert!("mips-linux".parse::<Target>().is_err());
    }

    #[test]
    fn test_struct_layout() {
        let layout = Target::default().data_layout();
        let ty = Type::Struct(vec![Type::I8, Type::I32, Type::I8]);
        assert_eq!(layout.field_offsets(&[Type::I8, Type::I32, Type::I8]), vec![0, 4, 8]);
        assert_eq!(layout.alloc_size(&ty), 12);
        assert_eq!(layout.alloc_size(&Type::Struct(vec![])), 0);
        assert_eq!(layout.alloc_size(&Type::object_ptr()), 8);
    }

    #[test]
    fn test_i386_long_alignment() {
        let layout = Target::new(Arch::X86, Os::Linux).data_layout();
        assert_eq!(layout.field_offsets(&[Type::I32, Type::I64]), vec![0, 4]);
        assert_eq!(layout.alloc_size(&Type::Struct(vec![Type::I32, Type::I64])), 12);
    }

    #[test]
    fn test_returns_in_registers() {
        let x64 = Target::new(Arch::X86_64, Os::Linux);
        assert!(x64.returns_in_registers(4));
        assert!(x64.returns_in_registers(8));
        assert!(!x64.returns_in_registers(12));

        let i386_linux = Target::new(Arch::X86, Os::Linux);
        assert!(!i386_linux.returns_in_registers(4));
        let i386_darwin = Target::new(Arch::X86, Os::MacOsX);
        assert!(i386_darwin.returns_in_registers(4));
        assert!(!i386_darwin.returns_in_registers(3));

        let thumb = Target::new(Arch::Thumbv7, Os::Ios);
        assert!(thumb.returns_in_registers(4));
        assert!(!thumb.returns_in_registers(8));
    }
}
