#![forbid(unsafe_code)]

//! Differential driver: applies [`Op`] sequences to a real container and to
//! the reference [`Model`] side by side, and reports the first step where
//! they disagree.
//!
//! After every step the driver also checks that the reverse index agrees
//! with the registrations and that the edge counts match the model.

use std::fmt;

use subgraph_core::{Container, GraphConfig, GraphError, Tracked};
use tracing::debug;

use crate::minimize::{MinimizationResult, minimize};
use crate::model::Model;
use crate::ops::{Op, key, subscriber};
use crate::recorder::RecordingSink;

/// First disagreement between the graph and the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub step: usize,
    pub op: Op,
    pub detail: String,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({}): {}", self.step, self.op, self.detail)
    }
}

impl std::error::Error for Divergence {}

pub struct Driver {
    container: Container,
    sink: RecordingSink,
    slots: Vec<Option<Tracked>>,
    model: Model,
    step: usize,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(GraphConfig::default().with_identity_checks(true))
    }
}

impl Driver {
    #[must_use]
    pub fn new(config: GraphConfig) -> Self {
        let sink = RecordingSink::new();
        Self {
            container: Container::new(config, sink.clone()),
            sink,
            slots: Vec::new(),
            model: Model::new(),
            step: 0,
        }
    }

    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Map a raw slot byte onto an existing slot, if any exist.
    fn slot(&self, raw: u8) -> Option<usize> {
        if self.slots.is_empty() {
            None
        } else {
            Some(usize::from(raw) % self.slots.len())
        }
    }

    fn diverge(&self, op: Op, detail: String) -> Divergence {
        debug!(step = self.step, op = %op, detail = %detail, "graph diverged from model");
        Divergence {
            step: self.step,
            op,
            detail,
        }
    }

    /// Apply one operation to both sides.
    ///
    /// # Errors
    ///
    /// Returns the [`Divergence`] if the graph and the model disagree.
    pub fn apply(&mut self, op: Op) -> Result<(), Divergence> {
        let graph = self.container.subscriptions().clone();
        match op {
            Op::Track => {
                self.slots.push(Some(self.container.track()));
                self.model.track();
            }
            Op::Release { slot } => {
                if let Some(slot) = self.slot(slot) {
                    self.slots[slot] = None;
                    self.model.release(slot);
                }
            }
            Op::Add { slot, sub, key: k } => {
                if let Some(slot) = self.slot(slot)
                    && let Some(tracked) = &self.slots[slot]
                {
                    let local = tracked
                        .local()
                        .map_err(|err| self.diverge(op, format!("get_or_create_local: {err}")))?;
                    local.add_subscriber(subscriber(sub), key(k));
                    self.model.add(slot, subscriber(sub), key(k));
                }
            }
            Op::AddViaProxy { slot, sub, key: k } => {
                // The model has nothing to do: a proxy read registers nothing.
                if let Some(slot) = self.slot(slot)
                    && let Some(tracked) = &self.slots[slot]
                {
                    let Some(proxy) = tracked.proxy() else {
                        return Err(self.diverge(op, "live object has no proxy".into()));
                    };
                    match graph.get_or_create_local(proxy, None) {
                        Err(GraphError::ProxyIdentity { object, target })
                            if object == proxy && target == tracked.id() => {}
                        Ok(local) => {
                            local.add_subscriber(subscriber(sub), key(k));
                            return Err(
                                self.diverge(op, format!("{proxy} accepted a registration"))
                            );
                        }
                        Err(err) => {
                            return Err(self.diverge(
                                op,
                                format!("expected proxy rejection, got {err}"),
                            ));
                        }
                    }
                    if !graph.config().identity_checks
                        && graph.try_get_local(proxy).is_some()
                    {
                        return Err(self.diverge(op, format!("{proxy} owns a registration")));
                    }
                }
            }
            Op::Notify { slot, key: k } => {
                if let Some(slot) = self.slot(slot) {
                    let notified = match &self.slots[slot] {
                        Some(tracked) => graph
                            .try_get_local(tracked.id())
                            .map_or(0, |local| local.notify(key(k))),
                        None => 0,
                    };
                    let actual = self.sink.take_sorted();
                    let expected = self.model.notify(slot, key(k));
                    if actual != expected || notified != expected.len() {
                        return Err(self.diverge(
                            op,
                            format!("notified {actual:?} (count {notified}), expected {expected:?}"),
                        ));
                    }
                }
            }
            Op::Clear { sub } => {
                let target = subscriber(sub);
                let actual = graph.clear_subscriber(&target);
                let expected = self.model.clear(&target);
                if actual != expected {
                    return Err(self.diverge(
                        op,
                        format!("cleared from {actual} registrations, expected {expected}"),
                    ));
                }
                if !graph.registrations_of(&target).is_empty() {
                    return Err(self.diverge(op, "reverse index still lists consumer".into()));
                }
            }
        }

        if !graph.is_consistent() {
            return Err(self.diverge(op, "reverse index disagrees with registrations".into()));
        }
        let edges = graph.stats().edges;
        if edges != self.model.edge_count() {
            return Err(self.diverge(
                op,
                format!("{edges} edges, expected {}", self.model.edge_count()),
            ));
        }
        self.step += 1;
        Ok(())
    }

    /// Apply every operation, stopping at the first divergence.
    ///
    /// # Errors
    ///
    /// Returns the first [`Divergence`].
    pub fn run(&mut self, ops: &[Op]) -> Result<(), Divergence> {
        ops.iter().try_for_each(|op| self.apply(*op))
    }

    /// Release every object and check that nothing is left behind.
    ///
    /// # Errors
    ///
    /// Returns a [`Divergence`] naming the residue.
    pub fn finish(mut self) -> Result<(), Divergence> {
        self.slots.clear();
        let stats = self.container.subscriptions().stats();
        if stats.objects != 0 || stats.registrations != 0 || stats.edges != 0 || stats.hosts != 0
        {
            return Err(self.diverge(Op::Track, format!("residue after release: {stats:?}")));
        }
        Ok(())
    }
}

/// Run `ops` from a fresh driver, then release everything.
///
/// # Errors
///
/// Returns the first [`Divergence`].
pub fn check(ops: &[Op]) -> Result<(), Divergence> {
    check_with(&GraphConfig::default().with_identity_checks(true), ops)
}

/// [`check`] against a container built from `config`.
///
/// # Errors
///
/// Returns the first [`Divergence`].
pub fn check_with(config: &GraphConfig, ops: &[Op]) -> Result<(), Divergence> {
    let mut driver = Driver::new(config.clone());
    driver.run(ops)?;
    driver.finish()
}

/// A divergence together with the smallest sequence that still reproduces
/// it.
#[derive(Debug, Clone)]
pub struct Failure {
    /// Divergence reported by the minimized sequence.
    pub divergence: Divergence,
    pub minimization: MinimizationResult,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.divergence)?;
        write!(
            f,
            "minimal sequence ({} ops, {} predicate calls):",
            self.minimization.minimized.len(),
            self.minimization.predicate_calls
        )?;
        for op in &self.minimization.minimized {
            write!(f, "\n  {op}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {}

/// Run `ops` through `run`; on failure, shrink the sequence before
/// reporting it.
///
/// # Errors
///
/// Returns a [`Failure`] carrying the minimized sequence.
pub fn check_and_shrink_with<F>(ops: &[Op], run: F) -> Result<(), Failure>
where
    F: Fn(&[Op]) -> Result<(), Divergence>,
{
    let Err(original) = run(ops) else {
        return Ok(());
    };
    let minimization = minimize(ops.to_vec(), |candidate| run(candidate).is_err());
    let divergence = run(&minimization.minimized).err().unwrap_or(original);
    debug!(
        ops = ops.len(),
        minimized = minimization.minimized.len(),
        "shrunk failing sequence"
    );
    Err(Failure {
        divergence,
        minimization,
    })
}

/// [`check_with`], shrinking any failure.
///
/// # Errors
///
/// Returns a [`Failure`] carrying the minimized sequence.
pub fn check_and_shrink(config: &GraphConfig, ops: &[Op]) -> Result<(), Failure> {
    check_and_shrink_with(ops, |ops| check_with(config, ops))
}
