#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use subgraph_core::GraphConfig;
use subgraph_harness::{Op, check_and_shrink};

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Track,
    Release(u8),
    Read { slot: u8, sub: u8, key: Option<u8> },
    ReadViaProxy { slot: u8, sub: u8, key: Option<u8> },
    Write { slot: u8, key: Option<u8> },
    Dispose(u8),
}

impl From<FuzzOp> for Op {
    fn from(op: FuzzOp) -> Self {
        match op {
            FuzzOp::Track => Op::Track,
            FuzzOp::Release(slot) => Op::Release { slot },
            FuzzOp::Read { slot, sub, key } => Op::Add { slot, sub, key },
            FuzzOp::ReadViaProxy { slot, sub, key } => Op::AddViaProxy { slot, sub, key },
            FuzzOp::Write { slot, key } => Op::Notify { slot, key },
            FuzzOp::Dispose(sub) => Op::Clear { sub },
        }
    }
}

#[derive(Arbitrary, Debug)]
struct Input {
    identity_checks: bool,
    ops: Vec<FuzzOp>,
}

fuzz_target!(|input: Input| {
    let config = GraphConfig::default().with_identity_checks(input.identity_checks);
    let ops: Vec<Op> = input.ops.into_iter().take(1024).map(Op::from).collect();
    if let Err(failure) = check_and_shrink(&config, &ops) {
        panic!("{failure}");
    }
});
