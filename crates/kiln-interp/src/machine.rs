// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The instruction loop.
//!
//! Exceptions use two registers. `SetExc` and a raising callee leave an
//! exception *pending*; `TestExc` moves a matching pending exception into
//! *current*, where a bare re-raise reads it back. An exception still
//! pending when a routine's body ends propagates to its caller.

use std::rc::Rc;

use kiln_ir::{ArmPattern, Instr, IrModule, IrProc, IrType, IrTypeId, LabelId, Rvalue, SelectValue, SymRef};
use rustc_hash::FxHashMap;

use crate::value::{Callable, Value};
use crate::InterpError;

pub(crate) struct Frame {
    pub module: usize,
    pub slots: Vec<Value>,
}

pub struct Machine {
    pub(crate) modules: Rc<[IrModule]>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) globals: FxHashMap<(usize, SymRef), Value>,
    pub(crate) heap: Vec<Value>,
    pub(crate) pending: Option<Value>,
    pub(crate) current: Option<Value>,
    pub(crate) output: String,
    exit_code: Option<i64>,
    steps: u64,
    max_steps: u64,
    labels: FxHashMap<(usize, Option<usize>), Rc<FxHashMap<LabelId, usize>>>,
}

impl Machine {
    pub fn new(modules: Vec<IrModule>) -> Self {
        let modules: Rc<[IrModule]> = modules.into();
        let mut globals = FxHashMap::default();
        for (i, m) in modules.iter().enumerate() {
            for g in &m.globals {
                globals.insert((i, g.sym), Value::zero(&m.types, g.ty));
            }
        }
        Self {
            modules,
            frames: Vec::new(),
            globals,
            heap: Vec::new(),
            pending: None,
            current: None,
            output: String::new(),
            exit_code: None,
            steps: 0,
            max_steps: 10_000_000,
            labels: FxHashMap::default(),
        }
    }

    pub fn with_step_limit(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Everything written by `echo`.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Code passed to `quit`, if it was called.
    pub fn exit_code(&self) -> Option<i64> {
        self.exit_code
    }

    /// Current value of a module-level variable.
    pub fn global(&self, module: &str, name: &str) -> Option<&Value> {
        let (i, m) = self.modules.iter().enumerate().find(|(_, m)| m.name == module)?;
        let decl = m.globals.iter().find(|g| m.string(g.name) == name)?;
        self.globals.get(&(i, decl.sym))
    }

    fn module_index(&self, name: &str) -> Result<usize, InterpError> {
        self.modules
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| InterpError::UnknownModule(name.to_string()))
    }

    /// Run every module initializer, in module order.
    pub fn run_inits(&mut self) -> Result<(), InterpError> {
        for i in 0..self.modules.len() {
            if self.modules[i].init.is_some() {
                self.invoke(i, Callable::Ir { module: i, proc: None }, Vec::new())?;
                self.uncaught()?;
            }
        }
        Ok(())
    }

    /// Call a routine by name. An exception escaping it is an error.
    pub fn call(&mut self, module: &str, name: &str, args: Vec<Value>) -> Result<Value, InterpError> {
        let mi = self.module_index(module)?;
        let pi = self.modules[mi]
            .procs
            .iter()
            .position(|p| self.modules[mi].string(p.name) == name)
            .ok_or_else(|| InterpError::UndefinedRoutine(name.to_string()))?;
        let result = self.invoke(mi, Callable::Ir { module: mi, proc: Some(pi) }, args)?;
        self.uncaught()?;
        Ok(result)
    }

    /// Initialize every module, then call `entry` in `module` if given.
    /// `quit` ends the run successfully; see [`Machine::exit_code`].
    pub fn run(&mut self, module: &str, entry: Option<&str>) -> Result<Value, InterpError> {
        let outcome = self.run_inits().and_then(|()| match entry {
            Some(name) => self.call(module, name, Vec::new()),
            None => Ok(Value::Void),
        });
        match outcome {
            Err(InterpError::Exit(code)) => {
                self.exit_code = Some(code);
                Ok(Value::Void)
            }
            other => other,
        }
    }

    fn uncaught(&mut self) -> Result<(), InterpError> {
        match self.pending.take() {
            Some(exc) => Err(InterpError::Unhandled(self.describe(&exc))),
            None => Ok(()),
        }
    }

    pub(crate) fn describe(&self, exc: &Value) -> String {
        match exc {
            Value::Ptr(p) => self.read(p).map(|v| v.to_string()).unwrap_or_else(|_| "<dangling>".into()),
            other => other.to_string(),
        }
    }

    // ── Calls ───────────────────────────────────────────────────

    pub(crate) fn invoke(&mut self, from: usize, target: Callable, args: Vec<Value>) -> Result<Value, InterpError> {
        let (module, proc) = match target {
            Callable::Host(name) => return self.call_host(from, &name, args),
            Callable::Ir { module, proc } => (module, proc),
        };
        let modules = Rc::clone(&self.modules);
        let p = proc_at(&modules, module, proc)?;
        if args.len() != p.params.len() {
            return Err(InterpError::ArityMismatch {
                expected: p.params.len(),
                got: args.len(),
            });
        }
        let size = p.slots.iter().map(|s| s.id.index() + 1).max().unwrap_or(0);
        let mut slots = vec![Value::Void; size];
        for (slot, arg) in p.params.iter().zip(args) {
            if let Some(s) = slots.get_mut(slot.index()) {
                *s = arg;
            }
        }
        self.frames.push(Frame { module, slots });
        let outcome = self.exec(module, proc, p);
        let frame = self.frames.pop();
        outcome?;
        let result = p
            .result
            .zip(frame)
            .and_then(|(slot, mut f)| f.slots.get_mut(slot.index()).map(std::mem::take))
            .unwrap_or(Value::Void);
        Ok(result)
    }

    /// Find what a symbol operand calls.
    pub(crate) fn resolve(&self, module: usize, sym: SymRef) -> Result<Callable, InterpError> {
        let m = &self.modules[module];
        if let Some(i) = m.procs.iter().position(|p| p.sym == Some(sym)) {
            return Ok(Callable::Ir { module, proc: Some(i) });
        }
        let ext = m
            .extern_for(sym)
            .ok_or_else(|| InterpError::UnresolvedSymbol(format!("{:?} in `{}`", sym, m.name)))?;
        let name = m.string(ext.name);
        if !ext.runtime {
            for (mi, other) in self.modules.iter().enumerate() {
                if let Some(pi) = other.procs.iter().position(|p| other.string(p.name) == name) {
                    return Ok(Callable::Ir { module: mi, proc: Some(pi) });
                }
            }
        }
        if crate::host::is_host(name) {
            return Ok(Callable::Host(name.to_string()));
        }
        Err(InterpError::UndefinedRoutine(name.to_string()))
    }

    // ── Instruction loop ────────────────────────────────────────

    fn labels_for(&mut self, module: usize, proc: Option<usize>, p: &IrProc) -> Rc<FxHashMap<LabelId, usize>> {
        let entry = self.labels.entry((module, proc)).or_insert_with(|| {
            let map = p
                .body
                .iter()
                .enumerate()
                .filter_map(|(i, instr)| match instr {
                    Instr::Label(l) | Instr::LoopLabel(l) => Some((*l, i)),
                    _ => None,
                })
                .collect();
            Rc::new(map)
        });
        Rc::clone(entry)
    }

    fn exec(&mut self, module: usize, proc: Option<usize>, p: &IrProc) -> Result<(), InterpError> {
        let modules = Rc::clone(&self.modules);
        let m = &modules[module];
        let labels = self.labels_for(module, proc, p);
        let jump = |l: LabelId| labels.get(&l).copied().ok_or(InterpError::UndefinedLabel(l));

        let mut pc = 0;
        while let Some(instr) = p.body.get(pc) {
            self.steps += 1;
            if self.steps > self.max_steps {
                return Err(InterpError::StepLimit(self.max_steps));
            }
            pc += 1;
            match instr {
                Instr::Summon { slot, ty, .. } => {
                    let zero = Value::zero(&m.types, *ty);
                    self.write(&crate::Pointer::new(self.slot_root(*slot)), zero)?;
                }
                Instr::Asgn { dst, src, .. } => {
                    let value = self.eval(module, src)?;
                    if let Rvalue::Call(call) = src {
                        if let (Some(exit), true) = (call.exit, self.pending.is_some()) {
                            pc = jump(exit)?;
                            continue;
                        }
                    }
                    let ptr = self.place(module, dst)?;
                    self.write(&ptr, value)?;
                }
                Instr::Call(call) => {
                    self.call_value(module, call)?;
                    if let (Some(exit), true) = (call.exit, self.pending.is_some()) {
                        pc = jump(exit)?;
                    }
                }
                Instr::Label(_) | Instr::LoopLabel(_) | Instr::SourceLoc(_) => {}
                Instr::Goto(l) | Instr::GotoLoop(l) => pc = jump(*l)?,
                Instr::Select { value, arms, .. } => {
                    let v = self.operand(module, value)?;
                    for arm in arms {
                        if self.arm_matches(m, &v, &arm.pattern) {
                            pc = jump(arm.target)?;
                            break;
                        }
                    }
                }
                Instr::SetExc { value } => {
                    let exc = self.operand(module, value)?;
                    log::trace!("raise {}", self.describe(&exc));
                    self.pending = Some(exc);
                }
                Instr::TestExc { ty, otherwise } => {
                    let matched = match (&self.pending, ty) {
                        (None, _) => false,
                        (Some(_), None) => true,
                        (Some(exc), Some(ty)) => self.exc_matches(m, exc, *ty),
                    };
                    if matched {
                        self.current = self.pending.take();
                    } else {
                        pc = jump(*otherwise)?;
                    }
                }
                Instr::CheckedGoto { target } => {
                    if self.pending.is_some() {
                        pc = jump(*target)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn arm_matches(&self, m: &IrModule, v: &Value, pattern: &ArmPattern) -> bool {
        let values = match pattern {
            ArmPattern::Else => return true,
            ArmPattern::Values(values) => values,
        };
        values.iter().any(|sv| match sv {
            SelectValue::Value(lit) => self.literal(m, lit) == *v,
            SelectValue::Range(lo, hi) => {
                match (self.literal(m, lo).as_int(), self.literal(m, hi).as_int(), v.as_int()) {
                    (Some(lo), Some(hi), Some(x)) => lo <= x && x <= hi,
                    _ => false,
                }
            }
        })
    }

    /// Exceptions match by object type name.
    fn exc_matches(&self, m: &IrModule, exc: &Value, ty: IrTypeId) -> bool {
        let wanted = match m.types.get(ty) {
            IrType::Object { name, .. } => name,
            IrType::Ptr(inner) => match m.types.get(*inner) {
                IrType::Object { name, .. } => name,
                _ => return false,
            },
            _ => return false,
        };
        let value = match exc {
            Value::Ptr(p) => match self.read(p) {
                Ok(v) => v,
                Err(_) => return false,
            },
            other => other.clone(),
        };
        matches!(value, Value::Object { ref name, .. } if name == wanted)
    }
}

fn proc_at(modules: &[IrModule], module: usize, proc: Option<usize>) -> Result<&IrProc, InterpError> {
    let m = modules
        .get(module)
        .ok_or_else(|| InterpError::UnknownModule(format!("#{}", module)))?;
    match proc {
        Some(i) => m.procs.get(i),
        None => m.init.as_ref(),
    }
    .ok_or_else(|| {
        let what = proc.map_or_else(|| "initializer".to_string(), |i| format!("#{}", i));
        InterpError::UndefinedRoutine(format!("{} of `{}`", what, m.name))
    })
}
