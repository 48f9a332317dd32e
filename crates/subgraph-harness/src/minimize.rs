#![forbid(unsafe_code)]

//! Delta debugging over operation sequences.
//!
//! Given a failing [`Op`] sequence and a predicate that reports whether the
//! failure still reproduces, [`minimize`] removes chunks of operations
//! (ddmin) and then lowers the remaining operands towards zero, keeping
//! each change only while the predicate holds.
//!
//! ```rust
//! use subgraph_harness::minimize::minimize;
//! use subgraph_harness::ops::Op;
//!
//! let ops = vec![
//!     Op::Track,
//!     Op::Clear { sub: 3 },
//!     Op::Notify { slot: 0, key: None },
//!     Op::Clear { sub: 5 },
//! ];
//! // "Fails" whenever a clear of consumer 5 is present.
//! let result = minimize(ops, |ops| ops.contains(&Op::Clear { sub: 5 }));
//! assert_eq!(result.minimized, vec![Op::Clear { sub: 5 }]);
//! ```

use std::fmt;

use serde_json::json;

use crate::ops::Op;

/// A single reduction attempt.
#[derive(Clone, Debug)]
pub struct ReductionStep {
    pub step: usize,
    pub phase: ReductionPhase,
    pub ops_before: usize,
    pub ops_after: usize,
    /// Whether the predicate held and the candidate replaced the input.
    pub accepted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReductionPhase {
    /// Removing a chunk of operations.
    ChunkRemoval,
    /// Keeping only one chunk of operations.
    ChunkRetention,
    /// Lowering one operation's operands.
    OperandLowering,
}

impl fmt::Display for ReductionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChunkRemoval => write!(f, "chunk_removal"),
            Self::ChunkRetention => write!(f, "chunk_retention"),
            Self::OperandLowering => write!(f, "operand_lowering"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MinimizationResult {
    pub minimized: Vec<Op>,
    pub steps: Vec<ReductionStep>,
    pub predicate_calls: usize,
}

impl MinimizationResult {
    /// The reduction log as JSONL.
    #[must_use]
    pub fn steps_to_jsonl(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            if !out.is_empty() {
                out.push('\n');
            }
            let line = json!({
                "step": step.step,
                "phase": step.phase.to_string(),
                "ops_before": step.ops_before,
                "ops_after": step.ops_after,
                "accepted": step.accepted,
            });
            out.push_str(&line.to_string());
        }
        out
    }
}

struct Reducer<F> {
    predicate: F,
    steps: Vec<ReductionStep>,
    calls: usize,
}

impl<F: Fn(&[Op]) -> bool> Reducer<F> {
    fn attempt(&mut self, phase: ReductionPhase, before: usize, candidate: &[Op]) -> bool {
        self.calls += 1;
        let accepted = (self.predicate)(candidate);
        self.steps.push(ReductionStep {
            step: self.steps.len(),
            phase,
            ops_before: before,
            ops_after: if accepted { candidate.len() } else { before },
            accepted,
        });
        accepted
    }

    fn ddmin(&mut self, mut input: Vec<Op>) -> Vec<Op> {
        let mut n = 2usize;
        loop {
            let len = input.len();
            if len == 0 {
                break;
            }
            let chunk_size = len.div_ceil(n);
            let chunks: Vec<(usize, usize)> = (0..n)
                .map(|i| (i * chunk_size, ((i + 1) * chunk_size).min(len)))
                .filter(|(start, _)| *start < len)
                .collect();

            let mut reduced = None;
            for &(start, end) in &chunks {
                let candidate: Vec<Op> = input[..start]
                    .iter()
                    .chain(&input[end..])
                    .copied()
                    .collect();
                if self.attempt(ReductionPhase::ChunkRemoval, len, &candidate) {
                    reduced = Some(candidate);
                    break;
                }
            }
            if reduced.is_none() && chunks.len() > 1 {
                for &(start, end) in &chunks {
                    let candidate = input[start..end].to_vec();
                    if self.attempt(ReductionPhase::ChunkRetention, len, &candidate) {
                        reduced = Some(candidate);
                        break;
                    }
                }
            }

            if let Some(candidate) = reduced {
                input = candidate;
                n = 2;
                continue;
            }
            if n >= len {
                break;
            }
            n = (n * 2).min(len);
        }
        input
    }

    fn lower_operands(&mut self, mut input: Vec<Op>) -> Vec<Op> {
        for i in 0..input.len() {
            // Each accepted lowering zeroes an operand or drops a proxy hop, so
            // this terminates.
            'lower: loop {
                for lowered in lowerings(input[i]) {
                    let mut candidate = input.clone();
                    candidate[i] = lowered;
                    if self.attempt(ReductionPhase::OperandLowering, input.len(), &candidate) {
                        input = candidate;
                        continue 'lower;
                    }
                }
                break;
            }
        }
        input
    }
}

/// Simpler variants of `op`, simplest first.
fn lowerings(op: Op) -> Vec<Op> {
    let mut out = Vec::new();
    match op {
        Op::Track => {}
        Op::Release { slot } => {
            if slot != 0 {
                out.push(Op::Release { slot: 0 });
            }
        }
        Op::Add { slot, sub, key } => {
            if slot != 0 {
                out.push(Op::Add { slot: 0, sub, key });
            }
            if sub != 0 {
                out.push(Op::Add { slot, sub: 0, key });
            }
            if key.is_some_and(|k| k != 0) {
                out.push(Op::Add {
                    slot,
                    sub,
                    key: Some(0),
                });
            }
        }
        Op::AddViaProxy { slot, sub, key } => {
            out.push(Op::Add { slot, sub, key });
            if slot != 0 {
                out.push(Op::AddViaProxy { slot: 0, sub, key });
            }
            if sub != 0 {
                out.push(Op::AddViaProxy { slot, sub: 0, key });
            }
        }
        Op::Notify { slot, key } => {
            if slot != 0 {
                out.push(Op::Notify { slot: 0, key });
            }
            if key.is_some_and(|k| k != 0) {
                out.push(Op::Notify { slot, key: Some(0) });
            }
        }
        Op::Clear { sub } => {
            if sub != 0 {
                out.push(Op::Clear { sub: 0 });
            }
        }
    }
    out
}

/// Minimize a failing operation sequence.
///
/// `predicate` returns `true` while the failure reproduces.
///
/// # Panics
///
/// Panics if the predicate does not hold on `input`.
pub fn minimize<F>(input: Vec<Op>, predicate: F) -> MinimizationResult
where
    F: Fn(&[Op]) -> bool,
{
    let mut reducer = Reducer {
        predicate,
        steps: Vec::new(),
        calls: 1,
    };
    assert!(
        (reducer.predicate)(&input),
        "predicate must hold on the original input"
    );
    let reduced = reducer.ddmin(input);
    let minimized = reducer.lower_operands(reduced);
    MinimizationResult {
        minimized,
        steps: reducer.steps,
        predicate_calls: reducer.calls,
    }
}
