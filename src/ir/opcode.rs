//! Operation codes of the tensor IR.
//!
//! One canonical table defines the closed op-code set together with the
//! stable wire name and fixed operand count (arity) of each op. Variadic ops
//! report no fixed arity.

/// Defines [`OpCode`] and its name/arity tables from a single list.
macro_rules! opcodes {
    ($(($variant:ident, $name:literal, $arity:expr),)*) => {
        /// Op-code of one IR instruction.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OpCode {
            $($variant,)*
        }

        impl OpCode {
            /// Every op-code, in table order.
            pub const ALL: &'static [OpCode] = &[$(OpCode::$variant,)*];

            /// Stable name used in diagnostics and by the external IR layer.
            pub fn name(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $name,)*
                }
            }

            /// Parse a stable op name.
            pub fn from_name(name: &str) -> Option<OpCode> {
                match name {
                    $($name => Some(OpCode::$variant),)*
                    _ => None,
                }
            }

            /// Fixed operand count, or `None` for variadic ops.
            pub fn arity(self) -> Option<usize> {
                match self {
                    $(OpCode::$variant => $arity,)*
                }
            }
        }
    };
}

opcodes! {
    (Parameter, "parameter", Some(0)),
    (Constant, "constant", Some(0)),
    (BatchNormGrad, "batch_norm_grad", Some(5)),
    (BatchNormInference, "batch_norm_inference", Some(5)),
    (BatchNormTraining, "batch_norm_training", Some(3)),
    (Convolution, "convolution", Some(2)),
    (Dot, "dot", Some(2)),
    (Broadcast, "broadcast", Some(1)),
    (Cast, "cast", Some(1)),
    (Copy, "copy", Some(1)),
    (Exp, "exp", Some(1)),
    (Log, "log", Some(1)),
    (Negative, "negative", Some(1)),
    (Not, "not", Some(1)),
    (Reshape, "reshape", Some(1)),
    (Reverse, "reverse", Some(1)),
    (Rsqrt, "rsqrt", Some(1)),
    (Slice, "slice", Some(1)),
    (Sqrt, "sqrt", Some(1)),
    (Transpose, "transpose", Some(1)),
    (Add, "add", Some(2)),
    (And, "and", Some(2)),
    (Compare, "compare", Some(2)),
    (Divide, "divide", Some(2)),
    (Maximum, "maximum", Some(2)),
    (Minimum, "minimum", Some(2)),
    (Multiply, "multiply", Some(2)),
    (Or, "or", Some(2)),
    (Subtract, "subtract", Some(2)),
    (Xor, "xor", Some(2)),
    (Select, "select", Some(3)),
    (Concatenate, "concatenate", None),
    (Reduce, "reduce", None),
    (Rng, "rng", None),
    (Sort, "sort", None),
    (Tuple, "tuple", None),
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for &op in OpCode::ALL {
            assert!(!op.name().is_empty());
            assert_eq!(OpCode::from_name(op.name()), Some(op));
        }
        assert_eq!(OpCode::from_name("no_such_op"), None);
    }

    #[test]
    fn arity_table() {
        assert_eq!(OpCode::Parameter.arity(), Some(0));
        assert_eq!(OpCode::Add.arity(), Some(2));
        assert_eq!(OpCode::BatchNormInference.arity(), Some(5));
        assert_eq!(OpCode::Tuple.arity(), None);
    }
}
