//! End-to-end tests: the pipeline driver over single modules and over a
//! batch fanned out across the pool.

use tensorc::ir::{ElementType, Function, Instruction, Module, OpCode, Shape, Signature};
use tensorc::{CompileError, Compiler, PassId, ThreadPool};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn unit(name: &str, with_orphan: bool) -> Module {
    let shape = Shape::new(ElementType::F32, vec![2, 2]);
    let signature = Signature::new(
        vec![shape.clone(), shape.clone()],
        vec!["a.1", "b.2"],
        shape.clone(),
    );
    let mut instructions = vec![
        Instruction::parameter(1, "a.1", 0, shape.clone()),
        Instruction::parameter(2, "b.2", 1, shape.clone()),
        Instruction::new(3, "dot.3", OpCode::Dot, shape.clone()).with_operands(vec![1, 2]),
    ];
    if with_orphan {
        instructions
            .push(Instruction::new(4, "neg.4", OpCode::Negative, shape).with_operands(vec![1]));
    }
    let mut module = Module::new(name);
    module.add_function(Function::new(100, format!("{name}_fn"), signature, instructions, 3));
    module
}

#[test]
fn compile_module_runs_the_canonical_pipeline() {
    init_logging();
    let compiler = Compiler::new();
    assert_eq!(compiler.pipeline(), &PassId::ALL);

    let mut module = unit("changed_unit", true);
    let changed = compiler.compile_module(&mut module).unwrap();
    assert!(changed);
    assert_eq!(module.instruction_count(), 3);

    let mut minimized = module.clone();
    let changed_again = compiler.compile_module(&mut minimized).unwrap();
    assert!(!changed_again);
}

#[test]
fn compile_module_rejects_malformed_input() {
    init_logging();
    let compiler = Compiler::new();

    let mut empty = Module::new("empty");
    assert_eq!(
        compiler.compile_module(&mut empty),
        Err(CompileError::EmptyModule {
            module: "empty".to_string()
        })
    );

    let shape = Shape::scalar(ElementType::F32);
    let mut dangling = Module::new("dangling");
    dangling.add_function(Function::new(
        1,
        "f",
        Signature::new(vec![shape.clone()], vec!["x.1"], shape.clone()),
        vec![
            Instruction::parameter(1, "x.1", 0, shape.clone()),
            Instruction::new(2, "exp.2", OpCode::Exp, shape).with_operands(vec![9]),
        ],
        2,
    ));
    assert!(matches!(
        compiler.compile_module(&mut dangling),
        Err(CompileError::DanglingOperand { operand: 9, .. })
    ));
}

#[test]
fn custom_pipeline_only_runs_requested_passes() {
    init_logging();
    let compiler = Compiler::with_pipeline(vec![PassId::ExpandBatchNorm]);
    let mut module = unit("no_bn", true);
    // No batch-norm present and no DCE requested: nothing changes.
    assert!(!compiler.compile_module(&mut module).unwrap());
    assert_eq!(module.instruction_count(), 4);
}

#[test]
fn parallel_compilation_preserves_submission_order() {
    init_logging();
    let compiler = Compiler::new();
    let pool = ThreadPool::new(4);

    let modules: Vec<Module> = (0..10)
        .map(|i| unit(&format!("unit_{i}"), i % 2 == 0))
        .collect();
    let results = compiler.compile_modules_parallel(modules, &pool);
    pool.shutdown();

    assert_eq!(results.len(), 10);
    assert_eq!(pool.running_workers(), 0);
    for (i, result) in results.iter().enumerate() {
        let (module, changed) = result.as_ref().unwrap();
        assert_eq!(module.name(), format!("unit_{i}"));
        // Even-numbered units carried an orphan for DCE to remove.
        assert_eq!(*changed, i % 2 == 0);
        assert_eq!(module.instruction_count(), 3);
    }
}

#[test]
fn parallel_compilation_reports_rejected_units() {
    init_logging();
    let compiler = Compiler::new();
    let pool = ThreadPool::new(2);
    pool.shutdown();

    let results = compiler.compile_modules_parallel(vec![unit("late", false)], &pool);
    assert_eq!(
        results,
        vec![Err(CompileError::UnitLost {
            module: "late".to_string()
        })]
    );
}

#[test]
fn parallel_compilation_reports_per_unit_errors() {
    init_logging();
    let compiler = Compiler::new();
    let pool = ThreadPool::new(2);

    let good = unit("good", true);
    let bad = Module::new("bad"); // no functions
    let results = compiler.compile_modules_parallel(vec![good, bad], &pool);
    pool.shutdown();

    assert!(results[0].is_ok());
    assert_eq!(
        results[1],
        Err(CompileError::EmptyModule {
            module: "bad".to_string()
        })
    );
}
