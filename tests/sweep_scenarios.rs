//! End-to-end sweep scenarios against the simulated fleet and the mock

use pimbench::backend::{BackendCall, ExecutionBackend, MockBackend, SimulatedFleet};
use pimbench::descriptor::{BenchmarkDescriptor, TestKind, DEFAULT_UNITS_PER_DEVICE};
use pimbench::device::{ClockSource, CostModel};
use pimbench::error::BenchError;
use pimbench::host::{HostTransfer, HostTransferBenchmark, HOST_FILL};
use pimbench::sink::MemorySink;
use pimbench::sweep::{SweepConfig, SweepController, TestMask, Variant};
use pimbench::ResultRow;

fn modeled_fleet(devices: usize, units: usize) -> SimulatedFleet {
    SimulatedFleet::new(devices, units, ClockSource::Modeled(CostModel::default())).unwrap()
}

fn single_size(bytes: usize, reps: u32, tests: TestMask) -> SweepConfig {
    SweepConfig {
        min_bytes: bytes,
        max_bytes: bytes,
        repetitions: reps,
        tests,
        ..SweepConfig::default()
    }
}

fn device_sums(row: &ResultRow) -> (u64, u64) {
    match row {
        ResultRow::Device {
            sum_cycles,
            sum_ops,
            ..
        } => (*sum_cycles, *sum_ops),
        ResultRow::Host { .. } => panic!("expected a device row, got {row:?}"),
    }
}

#[test]
fn test_region_read_single_device() {
    let mut fleet = modeled_fleet(1, DEFAULT_UNITS_PER_DEVICE);
    let mut sink = MemorySink::new();
    let config = single_size(64, 1, TestMask(0x4));
    SweepController::new(config)
        .unwrap()
        .run(&mut fleet, &mut sink)
        .unwrap();

    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    let csv = rows[0].to_csv();
    let fields: Vec<_> = csv.split(',').collect();
    assert_eq!(&fields[..4], &["dpu_test_1", "64", "0", "1"]);
    assert_eq!(fields[6], "16");

    let cost = CostModel::default();
    let per_unit = cost.dma_fixed + cost.dma_per_8_bytes * 8;
    assert_eq!(device_sums(&rows[0]), (16 * per_unit, 16));
}

#[test]
fn test_row_count_matches_steps_times_variants() {
    let mut fleet = modeled_fleet(2, 4);
    let mut sink = MemorySink::new();
    let config = SweepConfig {
        min_bytes: 64,
        max_bytes: 1024,
        factor: 2,
        repetitions: 2,
        tests: TestMask::ALL,
        window: 1,
    };
    let outcome = SweepController::new(config)
        .unwrap()
        .run(&mut fleet, &mut sink)
        .unwrap();

    assert_eq!(outcome.steps, 5);
    assert_eq!(sink.rows().len(), 5 * 9);
    let names: Vec<_> = sink.rows()[..9].iter().map(ResultRow::name).collect();
    assert_eq!(
        names,
        vec![
            "host_h2d",
            "host_d2h",
            "host_h2d_prepare_push",
            "host_d2h_prepare_push",
            "dpu_test_1",
            "dpu_test_2",
            "dpu_test_3",
            "dpu_test_4",
            "dpu_test_5",
        ]
    );
}

#[test]
fn test_zero_bytes_give_zero_sums() {
    let mut fleet = modeled_fleet(2, 8);
    for kind in [TestKind::RegionRead, TestKind::RegionWrite, TestKind::ScratchCopy] {
        let descriptor = BenchmarkDescriptor::new(kind, 0, 0, 10);
        let results = fleet.submit(&descriptor).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .flatten()
            .all(|unit| unit.cycles_total == 0 && unit.ops_completed == 0));
    }
}

#[test]
fn test_unknown_test_id_gives_zero_sums() {
    let mut fleet = modeled_fleet(1, 4);
    let descriptor = BenchmarkDescriptor {
        test_id: 42,
        transfer_bytes: 64,
        stride_bytes: 0,
        repetitions: 5,
        flags: 0,
    };
    let results = fleet.submit(&descriptor).unwrap();
    assert!(results.iter().flatten().all(|u| u.ops_completed == 0));
}

#[test]
fn test_batched_pull_windows_on_large_fleet() {
    let mut mock = MockBackend::new(100, 1);
    HostTransferBenchmark::new(64)
        .run(HostTransfer::BatchedD2H, &mut mock, 64, 2)
        .unwrap();

    let pulls: Vec<Vec<usize>> = mock
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::Pull { devices, .. } => Some(devices),
            _ => None,
        })
        .collect();
    assert_eq!(pulls.len(), 4);
    for rep in pulls.chunks(2) {
        assert_eq!(rep[0].len(), 64);
        assert_eq!(rep[1].len(), 36);
        let mut seen: Vec<usize> = rep.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }
}

#[test]
fn test_direct_h2d_is_idempotent() {
    let mut fleet = modeled_fleet(3, 2);
    let bench = HostTransferBenchmark::default();

    bench
        .run(HostTransfer::DirectH2D, &mut fleet, 256, 1)
        .unwrap();
    let first: Vec<_> = (0..3)
        .map(|d| fleet.region_snapshot(d, 0, 256).unwrap())
        .collect();
    bench
        .run(HostTransfer::DirectH2D, &mut fleet, 256, 4)
        .unwrap();
    let second: Vec<_> = (0..3)
        .map(|d| fleet.region_snapshot(d, 0, 256).unwrap())
        .collect();

    assert_eq!(first, second);
    assert!(first.iter().flatten().all(|&b| b == HOST_FILL));
}

#[test]
fn test_batched_d2h_on_simulated_fleet() {
    let mut fleet = modeled_fleet(5, 1);
    let m = HostTransferBenchmark::new(2)
        .run(HostTransfer::BatchedD2H, &mut fleet, 128, 3)
        .unwrap();
    assert_eq!(m.bytes, 128);
    assert_eq!(m.bytes_moved, 128 * 3 * 5);
}

#[test]
fn test_failure_stops_sweep() {
    let mut mock = MockBackend::new(2, 2).with_failure("submit");
    let mut sink = MemorySink::new();
    let config = single_size(64, 1, TestMask(Variant::DirectH2D.bit() | Variant::RegionRead.bit()));
    let err = SweepController::new(config)
        .unwrap()
        .run(&mut mock, &mut sink)
        .unwrap_err();

    assert!(matches!(err, BenchError::LaunchFailed { .. }));
    assert_eq!(sink.rows().len(), 1);
    assert_eq!(sink.rows()[0].name(), "host_h2d");
}

#[test]
fn test_barrier_cycles_non_decreasing() {
    let mut fleet = modeled_fleet(1, 8);
    let mut previous = 0;
    for reps in [0, 1, 2, 8, 64, 256] {
        let results = fleet
            .submit(&BenchmarkDescriptor::new(TestKind::Barrier, 0, 0, reps))
            .unwrap();
        let cycles: u64 = results.iter().flatten().map(|u| u.cycles_total).sum();
        assert!(cycles >= previous, "{cycles} < {previous} at {reps} reps");
        previous = cycles;
    }
    assert!(previous > 0);
}

#[test]
fn test_reduce_counts_every_increment() {
    let mut fleet = modeled_fleet(2, 4);
    let mut sink = MemorySink::new();
    let config = single_size(64, 1, TestMask(Variant::Reduce.bit()));
    SweepController::new(config)
        .unwrap()
        .run(&mut fleet, &mut sink)
        .unwrap();

    let (_, sum_ops) = device_sums(&sink.rows()[0]);
    assert_eq!(sum_ops, 2 * 4 * 1024);
}

#[test]
fn test_region_write_truncates_near_capacity() {
    let mut fleet = modeled_fleet(1, 2);
    let descriptor = BenchmarkDescriptor::new(TestKind::RegionWrite, 2048, 0, 10_000);
    let results = fleet.submit(&descriptor).unwrap();
    let ops: Vec<u32> = results[0].iter().map(|u| u.ops_completed).collect();
    assert_eq!(ops, vec![4096, 4095]);
}
