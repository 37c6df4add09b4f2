// This module implements dead-code elimination as a composite of three stages: a
// liveness analysis computing which instructions are transitively necessary (reachable
// from observable outputs — return values and parameters — through operand
// references), a secondary read-only audit collecting auxiliary facts (per-opcode
// counts, control-edge participation) used by the transform for candidate pre-sizing
// and diagnostics, and the removal transform itself. An instruction is removed only
// when it is not live, has empty control predecessor and successor sets, has a
// non-parameter op-code, and is not its function's return instruction; the result is
// idempotent by construction. ModuleDce packages the three stages as one module-kind
// composite pass; FunctionDce is the function-kind sweep over the same predicate.
// Dangling operand references encountered mid-analysis are a violated IR invariant
// and fatal.

//! Dead-code elimination: liveness analysis plus removal transform.

use hashbrown::{HashMap, HashSet};

use super::{Pass, PassKind};
use crate::context::CompilerContext;
use crate::ir::{Function, Instruction, Module, OpCode};

/// Result of [`LivenessAnalysis`]: the live instruction set per function.
pub struct Liveness {
    live: HashMap<i64, HashSet<i64>>,
}

impl Liveness {
    /// Whether `inst` in `function` is transitively necessary.
    pub fn is_live(&self, function: i64, inst: i64) -> bool {
        self.live
            .get(&function)
            .is_some_and(|set| set.contains(&inst))
    }

    /// Number of live instructions in `function`.
    pub fn live_count(&self, function: i64) -> usize {
        self.live.get(&function).map_or(0, HashSet::len)
    }
}

/// Read-only analysis computing transitive reachability from observable
/// outputs.
pub struct LivenessAnalysis {
    /// Treat parameters as observable roots even when nothing reads them.
    pub visit_parameters: bool,
}

impl LivenessAnalysis {
    pub fn new() -> Self {
        Self {
            visit_parameters: true,
        }
    }

    /// Compute liveness for every function in `module`.
    pub fn analyze(&self, module: &Module) -> Liveness {
        let mut live = HashMap::with_capacity(module.functions().len());
        for function in module.functions() {
            live.insert(function.id(), self.analyze_function(function));
        }
        Liveness { live }
    }

    /// Compute the live instruction set of one function.
    pub fn analyze_function(&self, function: &Function) -> HashSet<i64> {
        let index: HashMap<i64, usize> = function
            .instructions()
            .iter()
            .enumerate()
            .map(|(i, inst)| (inst.id(), i))
            .collect();

        let mut worklist = vec![function.return_id()];
        if self.visit_parameters {
            worklist.extend(
                function
                    .instructions()
                    .iter()
                    .filter(|inst| inst.is_parameter())
                    .map(Instruction::id),
            );
        }

        let mut live = HashSet::with_capacity(worklist.len());
        while let Some(id) = worklist.pop() {
            if !live.insert(id) {
                continue;
            }
            let Some(&i) = index.get(&id) else {
                panic!(
                    "liveness: function `{}` references missing instruction {id}",
                    function.name(),
                );
            };
            for &operand in function.instructions()[i].operands() {
                if !live.contains(&operand) {
                    worklist.push(operand);
                }
            }
        }
        live
    }
}

impl Default for LivenessAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

/// Auxiliary facts gathered by [`ModuleAudit`].
pub struct AuditFacts {
    pub opcode_counts: HashMap<OpCode, usize>,
    /// Instructions participating in at least one control edge.
    pub ctrl_connected: usize,
    /// Instructions with no control edges at all.
    pub isolated: usize,
}

impl AuditFacts {
    pub fn count(&self, opcode: OpCode) -> usize {
        self.opcode_counts.get(&opcode).copied().unwrap_or(0)
    }
}

/// Secondary read-only analysis over the module.
pub struct ModuleAudit;

impl ModuleAudit {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, module: &Module) -> AuditFacts {
        let mut opcode_counts = HashMap::new();
        let mut ctrl_connected = 0;
        let mut isolated = 0;
        for function in module.functions() {
            for inst in function.instructions() {
                *opcode_counts.entry(inst.opcode()).or_insert(0) += 1;
                if inst.has_ctrl_edges() {
                    ctrl_connected += 1;
                } else {
                    isolated += 1;
                }
            }
        }
        log::debug!(
            "audit: module `{}`: {} instruction(s), {} control-connected, {} isolated",
            module.name(),
            ctrl_connected + isolated,
            ctrl_connected,
            isolated,
        );
        AuditFacts {
            opcode_counts,
            ctrl_connected,
            isolated,
        }
    }
}

impl Default for ModuleAudit {
    fn default() -> Self {
        Self::new()
    }
}

fn is_dead(inst: &Instruction, live: &HashSet<i64>, return_id: i64) -> bool {
    !live.contains(&inst.id())
        && !inst.has_ctrl_edges()
        && !inst.is_parameter()
        && inst.id() != return_id
}

/// The removal transform of [`ModuleDce`].
pub struct DceTransform;

impl DceTransform {
    pub fn new() -> Self {
        Self
    }

    /// Remove every dead instruction; returns the removal count.
    pub fn transform(
        &self,
        cc: &CompilerContext,
        module: &mut Module,
        liveness: &Liveness,
        facts: &AuditFacts,
    ) -> usize {
        // Removal names go to the context arena; the batch dies with the unit.
        let mut removed: Vec<&str> = Vec::with_capacity(facts.isolated);
        for function in module.functions_mut() {
            let id = function.id();
            let return_id = function.return_id();
            let live = match liveness.live.get(&id) {
                Some(live) => live,
                None => continue,
            };
            function.retain_instructions(|inst| {
                if is_dead(inst, live, return_id) {
                    removed.push(cc.arena().alloc_str(inst.name()));
                    false
                } else {
                    true
                }
            });
        }
        for name in &removed {
            log::debug!("dce: removed `{name}`");
        }
        removed.len()
    }
}

impl Default for DceTransform {
    fn default() -> Self {
        Self::new()
    }
}

/// Function-kind dead-instruction sweep.
pub struct FunctionDce {
    liveness: LivenessAnalysis,
}

impl FunctionDce {
    pub const NAME: &'static str = "function_dce";

    pub fn new() -> Self {
        Self {
            liveness: LivenessAnalysis::new(),
        }
    }

    /// Sweep one function; returns whether anything was removed.
    pub fn run_on_function(&self, function: &mut Function) -> bool {
        let live = self.liveness.analyze_function(function);
        let return_id = function.return_id();
        let removed = function.retain_instructions(|inst| !is_dead(inst, &live, return_id));
        if removed > 0 {
            log::debug!(
                "{}: removed {removed} instruction(s) from `{}`",
                Self::NAME,
                function.name(),
            );
        }
        removed > 0
    }
}

impl Default for FunctionDce {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for FunctionDce {
    fn kind(&self) -> PassKind {
        PassKind::Function
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&mut self, _cc: &CompilerContext, module: &mut Module) -> bool {
        let mut changed = false;
        for function in module.functions_mut() {
            changed |= self.run_on_function(function);
        }
        changed
    }
}

/// Composite module-kind DCE pass: liveness, audit, then the transform.
pub struct ModuleDce {
    liveness: LivenessAnalysis,
    audit: ModuleAudit,
    dce: DceTransform,
}

impl ModuleDce {
    pub const NAME: &'static str = "module_dce";

    pub fn new() -> Self {
        Self {
            liveness: LivenessAnalysis::new(),
            audit: ModuleAudit::new(),
            dce: DceTransform::new(),
        }
    }
}

impl Default for ModuleDce {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for ModuleDce {
    fn kind(&self) -> PassKind {
        PassKind::Composite
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&mut self, cc: &CompilerContext, module: &mut Module) -> bool {
        let liveness = self.liveness.analyze(module);
        let facts = self.audit.analyze(module);
        let removed = self.dce.transform(cc, module, &liveness, &facts);
        if removed > 0 {
            log::info!(
                "{}: removed {removed} instruction(s) from module `{}`",
                Self::NAME,
                module.name(),
            );
        }
        removed > 0
    }
}
