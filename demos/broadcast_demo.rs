//! Mirrors a three-iteration broadcast benchmark: every rank measures the same
//! `MPI_Bcast` three times, then prints the resulting critical-path vector.
//!
//! Run with `mpirun -n 4 cargo run --example broadcast_demo -- 1024`.

use mpi::traits::*;
use std::env;

fn main() {
    let msg_size: usize = env::args().nth(1).and_then(|s| s.parse().ok()).unwrap_or(1024);

    let universe = mpi::initialize().expect("MPI_Init failed");
    let world = universe.world();
    let root_rank = world.size() - 1;
    let root_process = world.process_at_rank(root_rank);

    critter::allocate(&world).expect("critter::allocate failed");

    let mut buf = vec![0.0f64; msg_size];
    if world.rank() == root_rank {
        for (i, v) in buf.iter_mut().enumerate() {
            *v = i as f64;
        }
    }

    for _ in 0..3 {
        critter::start(&world);

        critter::dispatch::initiate(
            critter::RoutineId::Broadcast,
            &world,
            (msg_size * std::mem::size_of::<f64>()) as i64,
            root_rank,
            root_rank,
        )
        .expect("critter::dispatch::initiate failed");
        root_process.broadcast_into(&mut buf[..]);
        critter::dispatch::complete(critter::RoutineId::Broadcast, &world);

        critter::stop(&world);
    }

    if world.rank() == 0 {
        let totals = critter::collect(&world);
        let broadcast = &totals[critter::RoutineId::Broadcast.tag() as usize];
        println!("broadcast volumetric bytes across {} ranks: {}", world.size(), broadcast.bytes);
    }
}
