//! Integration tests for the pass registry and the DCE pipeline.
//!
//! The fixture mirrors the classic minimal unit: two parameters feeding an
//! add that produces the return value, plus one orphan instruction with no
//! control edges that only DCE should touch.

use tensorc::ir::{ElementType, Function, Instruction, Module, OpCode, Shape, Signature};
use tensorc::{make_pass, CompilerContext, Pass, PassId, PassKind};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fixture_module() -> Module {
    let shape = Shape::new(ElementType::F32, vec![3, 6]);
    let signature = Signature::new(
        vec![shape.clone(), shape.clone()],
        vec!["arg1.1", "arg2.2"],
        shape.clone(),
    );
    let instructions = vec![
        Instruction::parameter(1, "arg1.1", 0, shape.clone()),
        Instruction::parameter(2, "arg2.2", 1, shape.clone()),
        Instruction::new(3, "add.3", OpCode::Add, shape.clone()).with_operands(vec![1, 2]),
        Instruction::new(4, "mul.4", OpCode::Multiply, shape).with_operands(vec![1, 2]),
    ];
    let mut module = Module::new("union_12510013719728903619");
    module.add_function(Function::new(
        4,
        "union_12510013719728903619",
        signature,
        instructions,
        3,
    ));
    module
}

#[test]
fn verify_all_passes() {
    init_logging();
    for &id in &PassId::ALL {
        let pass = make_pass(id, None);
        assert!(!pass.name().is_empty());
        assert_eq!(pass.name(), id.name());
        log::info!("checked pass: {}", pass.name());
    }
    assert_eq!(PassId::ALL.len(), 3);
}

#[test]
fn registry_covers_every_kind() {
    let kinds: Vec<PassKind> = PassId::ALL.iter().map(|id| id.kind()).collect();
    assert!(kinds.contains(&PassKind::Module));
    assert!(kinds.contains(&PassKind::Function));
    assert!(kinds.contains(&PassKind::Composite));
}

#[test]
fn module_dce_removes_the_orphan_and_is_idempotent() {
    init_logging();
    let cc = CompilerContext::new();
    let mut module = fixture_module();
    module.verify().unwrap();

    let mut pass = make_pass(PassId::ModuleDce, Some(&cc));
    assert!(pass.run(&cc, &mut module));

    let function = &module.functions()[0];
    assert_eq!(function.instructions().len(), 3);
    assert!(function.instruction(4).is_none(), "orphan mul.4 removed");
    assert!(function.instruction(3).is_some(), "return value kept");
    module.verify().unwrap();

    // Already minimized: the second run reports no change.
    assert!(!pass.run(&cc, &mut module));
}

#[test]
fn heap_and_arena_construction_behave_identically() {
    init_logging();
    let cc = CompilerContext::new();

    let mut heap_module = fixture_module();
    let mut arena_module = fixture_module();

    let mut heap_pass = make_pass(PassId::ModuleDce, None);
    let mut arena_pass = make_pass(PassId::ModuleDce, Some(&cc));

    assert_eq!(heap_pass.name(), arena_pass.name());
    assert_eq!(heap_pass.kind(), arena_pass.kind());
    assert_eq!(
        heap_pass.run(&cc, &mut heap_module),
        arena_pass.run(&cc, &mut arena_module),
    );
    assert_eq!(heap_module, arena_module);
}

#[test]
fn function_pass_detects_dead_instructions() {
    init_logging();
    let cc = CompilerContext::new();
    let mut module = fixture_module();

    let mut pass = make_pass(PassId::FunctionDce, Some(&cc));
    assert_eq!(pass.kind(), PassKind::Function);
    assert!(pass.run(&cc, &mut module));
    assert_eq!(module.instruction_count(), 3);
}

#[test]
fn expand_batch_norm_then_dce_round_trip() {
    init_logging();
    let cc = CompilerContext::new();

    let data = Shape::new(ElementType::F32, vec![4, 8]);
    let feature = Shape::new(ElementType::F32, vec![8]);
    let signature = Signature::new(
        vec![
            data.clone(),
            feature.clone(),
            feature.clone(),
            feature.clone(),
            feature.clone(),
        ],
        vec!["x.1", "scale.2", "bias.3", "mean.4", "var.5"],
        data.clone(),
    );
    let instructions = vec![
        Instruction::parameter(1, "x.1", 0, data.clone()),
        Instruction::parameter(2, "scale.2", 1, feature.clone()),
        Instruction::parameter(3, "bias.3", 2, feature.clone()),
        Instruction::parameter(4, "mean.4", 3, feature.clone()),
        Instruction::parameter(5, "var.5", 4, feature),
        Instruction::new(6, "bn.6", OpCode::BatchNormInference, data)
            .with_operands(vec![1, 2, 3, 4, 5]),
    ];
    let mut module = Module::new("bn_unit");
    module.add_function(Function::new(7, "bn_fn", signature, instructions, 6));

    let mut expand = make_pass(PassId::ExpandBatchNorm, Some(&cc));
    assert!(expand.run(&cc, &mut module));
    module.verify().unwrap();
    assert!(module.functions()[0]
        .instructions()
        .iter()
        .all(|inst| inst.opcode() != OpCode::BatchNormInference));

    // Everything the expansion emitted feeds the return value, so DCE has
    // nothing to take back.
    let mut dce = make_pass(PassId::ModuleDce, Some(&cc));
    assert!(!dce.run(&cc, &mut module));
}
