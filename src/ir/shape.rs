//! Shapes and function signatures at the IR boundary.

/// Element type of a tensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    F32,
    F64,
    I32,
    I64,
    Bool,
}

/// Element type plus dimensions of one tensor value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub element_type: ElementType,
    pub dimensions: Vec<i64>,
}

impl Shape {
    pub fn new(element_type: ElementType, dimensions: Vec<i64>) -> Self {
        Self {
            element_type,
            dimensions,
        }
    }

    /// Rank-zero shape of the given element type.
    pub fn scalar(element_type: ElementType) -> Self {
        Self {
            element_type,
            dimensions: Vec::new(),
        }
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }
}

/// Parameter and result shapes of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub parameter_shapes: Vec<Shape>,
    pub parameter_names: Vec<String>,
    pub result_shape: Shape,
}

impl Signature {
    pub fn new(
        parameter_shapes: Vec<Shape>,
        parameter_names: Vec<impl Into<String>>,
        result_shape: Shape,
    ) -> Self {
        Self {
            parameter_shapes,
            parameter_names: parameter_names.into_iter().map(Into::into).collect(),
            result_shape,
        }
    }
}
