//! Types in the emitted IR. The source language only has `int`, so the
//! vocabulary is small: `i32` values, `i1` comparison results, labels, and
//! the pointer/array shapes that array lowering needs.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrType {
    I32,
    I1,
    Void,
    /// A reserved register number used only as a branch target
    Label,
    Ptr(Box<IrType>),
    Array(i32, Box<IrType>),
}

impl IrType {
    pub fn ptr(self) -> IrType {
        IrType::Ptr(Box::new(self))
    }

    pub fn array(len: i32, element: IrType) -> IrType {
        IrType::Array(len, Box::new(element))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, IrType::I1)
    }

    /// The type of the value stored at one more level of indexing:
    /// `[2 x [3 x i32]]` -> `[3 x i32]` -> `i32`
    pub fn element(&self) -> &IrType {
        match self {
            IrType::Array(_, element) => element,
            IrType::Ptr(pointee) => pointee,
            _ => unreachable!("scalar types have no element type"),
        }
    }
}

impl core::fmt::Display for IrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrType::I32 => write!(f, "i32"),
            IrType::I1 => write!(f, "i1"),
            IrType::Void => write!(f, "void"),
            IrType::Label => write!(f, "label"),
            IrType::Ptr(pointee) => write!(f, "{pointee}*"),
            IrType::Array(len, element) => write!(f, "[{len} x {element}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_ir_syntax() {
        assert_eq!(IrType::I32.to_string(), "i32");
        assert_eq!(IrType::I32.ptr().to_string(), "i32*");
        assert_eq!(IrType::array(5, IrType::I32).to_string(), "[5 x i32]");
        assert_eq!(
            IrType::array(2, IrType::array(3, IrType::I32)).ptr().to_string(),
            "[2 x [3 x i32]]*"
        );
    }
}
