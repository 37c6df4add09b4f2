// This module implements the batch-norm expansion pass. Inference-mode batch
// normalization is a fused op at the boundary; lowering it early lets the generic
// element-wise pipeline (and DCE) see through it. Each BatchNormInference instruction
// `bn(x, scale, bias, mean, variance)` is replaced in place by the primitive
// sequence computing `scale * (x - mean) * rsqrt(variance + eps) + bias`, with the
// per-feature operands broadcast to the result shape. The final Add of the sequence
// reuses the replaced instruction's id, name and control edges, so operand references
// and return ids elsewhere in the function stay valid without rewriting. A
// BatchNormInference instruction with the wrong operand count is a violated IR
// invariant and fatal.

//! Expansion of fused batch-norm inference into primitive ops.

use super::{Pass, PassKind};
use crate::context::CompilerContext;
use crate::ir::{Function, Instruction, Module, OpCode, Shape};

/// Module-kind pass lowering `BatchNormInference` into primitive arithmetic.
pub struct ExpandBatchNorm;

impl ExpandBatchNorm {
    pub const NAME: &'static str = "expand_batch_norm";

    pub fn new() -> Self {
        Self
    }
}

impl Default for ExpandBatchNorm {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for ExpandBatchNorm {
    fn kind(&self) -> PassKind {
        PassKind::Module
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&mut self, _cc: &CompilerContext, module: &mut Module) -> bool {
        let mut changed = false;
        for function in module.functions_mut() {
            changed |= expand_in_function(function);
        }
        changed
    }
}

fn expand_in_function(function: &mut Function) -> bool {
    let targets: Vec<i64> = function
        .instructions()
        .iter()
        .filter(|inst| inst.opcode() == OpCode::BatchNormInference)
        .map(Instruction::id)
        .collect();
    if targets.is_empty() {
        return false;
    }

    let mut next_id = function.max_instruction_id() + 1;
    for id in targets {
        expand_one(function, id, &mut next_id);
    }
    log::debug!(
        "{}: expanded batch-norm instruction(s) in `{}`",
        ExpandBatchNorm::NAME,
        function.name(),
    );
    true
}

/// Replace instruction `id` by the primitive sequence. `next_id` supplies
/// fresh instruction ids.
fn expand_one(function: &mut Function, id: i64, next_id: &mut i64) {
    let mut bn = function
        .instruction(id)
        .unwrap_or_else(|| panic!("expand_batch_norm: instruction {id} vanished mid-pass"))
        .clone();
    let operands = bn.operands();
    if operands.len() != 5 {
        panic!(
            "expand_batch_norm: `{}` has {} operand(s), batch_norm_inference takes 5",
            bn.name(),
            operands.len(),
        );
    }
    let (x, scale, bias, mean, variance) =
        (operands[0], operands[1], operands[2], operands[3], operands[4]);

    let result_shape = bn.shape().clone();
    let element_type = result_shape.element_type;
    let feature_shape = |operand: i64| -> Shape {
        function
            .instruction(operand)
            .unwrap_or_else(|| {
                panic!(
                    "expand_batch_norm: `{}` references missing operand {operand}",
                    bn.name(),
                )
            })
            .shape()
            .clone()
    };
    let variance_shape = feature_shape(variance);

    let mut fresh = |opcode: OpCode, shape: Shape, operands: Vec<i64>| -> Instruction {
        let inst_id = *next_id;
        *next_id += 1;
        Instruction::new(inst_id, format!("{opcode}.{inst_id}"), opcode, shape)
            .with_operands(operands)
    };

    // scale * (x - mean) * rsqrt(variance + eps) + bias, element-wise over
    // the result shape. The epsilon payload itself is an attribute of the
    // constant and lives in the external IR layer.
    let eps = fresh(OpCode::Constant, Shape::scalar(element_type), vec![]);
    let eps_wide = fresh(OpCode::Broadcast, variance_shape.clone(), vec![eps.id()]);
    let var_eps = fresh(OpCode::Add, variance_shape.clone(), vec![variance, eps_wide.id()]);
    let inv_stddev = fresh(OpCode::Rsqrt, variance_shape, vec![var_eps.id()]);
    let mean_wide = fresh(OpCode::Broadcast, result_shape.clone(), vec![mean]);
    let centered = fresh(OpCode::Subtract, result_shape.clone(), vec![x, mean_wide.id()]);
    let inv_wide = fresh(OpCode::Broadcast, result_shape.clone(), vec![inv_stddev.id()]);
    let normalized = fresh(
        OpCode::Multiply,
        result_shape.clone(),
        vec![centered.id(), inv_wide.id()],
    );
    let scale_wide = fresh(OpCode::Broadcast, result_shape.clone(), vec![scale]);
    let scaled = fresh(
        OpCode::Multiply,
        result_shape.clone(),
        vec![normalized.id(), scale_wide.id()],
    );
    let bias_wide = fresh(OpCode::Broadcast, result_shape.clone(), vec![bias]);

    // The final op inherits the fused instruction's identity.
    let (preds, succs) = bn.take_ctrl_edges();
    let mut replacement = Instruction::new(id, bn.name(), OpCode::Add, result_shape)
        .with_operands(vec![scaled.id(), bias_wide.id()]);
    replacement.set_ctrl_edges(preds, succs);

    let spliced = function.splice_instruction(
        id,
        vec![
            eps, eps_wide, var_eps, inv_stddev, mean_wide, centered, inv_wide, normalized,
            scale_wide, scaled, bias_wide, replacement,
        ],
    );
    debug_assert!(spliced);
}
