//! End-to-end tests of every reduction strategy on simulated ranks.
//!
//! Each test runs one closure per logical rank through `ThreadUniverse`, builds the
//! hierarchy the strategy needs, and checks the value every rank ends up with against a
//! serial reference computed from the same data.

use approx::assert_relative_eq;
use kreduce::group::ProcessGroupBuilder;
use kreduce::parallel::{Comm, ThreadComm, ThreadUniverse};
use kreduce::reduction::{
    Stages, exact_inner, half_inner, multi_group_inner, partial_inner, sequential_inner,
};
use kreduce::{KError, PartitionedVector, ReductionContext, ReductionKind, ReductionOptions};
use rand::Rng;

/// Splits `data` into contiguous, rank-ordered slices of uneven length.
fn slice_for(comm: &ThreadComm, data: &[f64]) -> PartitionedVector {
    let p = comm.size();
    let base = data.len() / p;
    let extra = data.len() % p;
    let lo = comm.rank() * base + comm.rank().min(extra);
    let len = base + usize::from(comm.rank() < extra);
    PartitionedVector::from_local(comm, data[lo..lo + len].to_vec())
}

fn random_data(n: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

#[test]
fn single_process_every_strategy_is_local_dot() {
    let x_data = random_data(17);
    let y_data = random_data(17);
    let local = x_data.iter().zip(&y_data).map(|(a, b)| a * b).fold(0.0, |acc, v| acc + v);

    let results = ThreadUniverse::new(1).run(|comm| {
        let x = PartitionedVector::from_local(&comm, x_data.clone());
        let y = PartitionedVector::from_local(&comm, y_data.clone());
        let builder = ProcessGroupBuilder::new(&comm);
        let half = builder.half(x.local_n()).unwrap();
        let frac = builder.fractional(0.25, x.local_n()).unwrap();
        let multi = builder.multi_group(0.25, x.local_n()).unwrap();
        vec![
            exact_inner(&comm, &x, &y).unwrap().value,
            sequential_inner(&comm, &x, &y).unwrap().value,
            half_inner(half.as_ref(), &x, &y, 0).unwrap().value,
            half_inner(half.as_ref(), &x, &y, 1).unwrap().value,
            partial_inner(frac.as_ref(), &x, &y, 0).unwrap().value,
            multi_group_inner(multi.as_ref(), &x, &y).unwrap().value,
        ]
    });
    for value in &results[0] {
        assert_eq!(value.to_bits(), local.to_bits());
    }
}

#[test]
fn sequential_equals_ordered_sum_for_any_process_count() {
    let x_data = random_data(50);
    let y_data = random_data(50);
    let serial = x_data.iter().zip(&y_data).fold(0.0, |acc, (a, b)| acc + a * b);
    for p in 1..=9 {
        let values = ThreadUniverse::new(p).run(|comm| {
            let x = slice_for(&comm, &x_data);
            let y = slice_for(&comm, &y_data);
            sequential_inner(&comm, &x, &y).unwrap().value
        });
        for v in values {
            assert_relative_eq!(v, serial, epsilon = 1e-12);
        }
    }
}

#[test]
fn sequential_is_bit_reproducible_across_runs() {
    let data = random_data(64);
    let run = || {
        ThreadUniverse::new(6).run(|comm| {
            let x = slice_for(&comm, &data);
            sequential_inner(&comm, &x, &x).unwrap().value.to_bits()
        })
    };
    let first = run();
    for _ in 0..5 {
        assert_eq!(run(), first);
    }
    assert!(first.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn half_is_exact_on_homogeneous_vectors() {
    let c = 1.5;
    for p in 2..=11 {
        for half in 0..2 {
            let values = ThreadUniverse::new(p).run(|comm| {
                // Uneven local sizes: 1, 2, 3, 1, 2, 3, ...
                let local_n = comm.rank() % 3 + 1;
                let x = PartitionedVector::from_local(&comm, vec![c; local_n]);
                let groups = ProcessGroupBuilder::new(&comm).half(local_n).unwrap();
                let r = half_inner(groups.as_ref(), &x, &x, half).unwrap();
                (r.value, x.global_n())
            });
            for (value, global_n) in values {
                assert_eq!(value, c * c * global_n as f64, "P={p} half={half}");
            }
        }
    }
}

#[test]
fn half_scenario_four_ranks_eight_ones() {
    let results = ThreadUniverse::new(4).run(|comm| {
        let x = PartitionedVector::from_local(&comm, vec![1.0, 1.0]);
        let y = x.clone();
        let groups = ProcessGroupBuilder::new(&comm).half(x.local_n()).unwrap().unwrap();
        let exact = exact_inner(&comm, &x, &y).unwrap().value;
        let approx = half_inner(Some(&groups), &x, &y, 1).unwrap();
        (exact, groups.part_global(), approx)
    });
    for (rank, (exact, part_global, approx)) in results.into_iter().enumerate() {
        assert_eq!(exact, 8.0);
        assert_eq!(part_global, 4);
        assert_eq!(approx.value, 8.0);
        let computed = approx.stages.contains(Stages::LOCAL_COMPUTE);
        assert_eq!(computed, rank >= 2, "only ranks 2 and 3 compute");
    }
}

#[test]
fn partial_rotation_eventually_samples_every_group() {
    let data = random_data(40);
    let exact: f64 = data.iter().map(|v| v * v).sum();
    let estimates = ThreadUniverse::new(8).run(|comm| {
        let x = slice_for(&comm, &data);
        let groups = ProcessGroupBuilder::new(&comm).fractional(0.25, x.local_n()).unwrap();
        let group_count = groups.as_ref().map_or(1, |g| g.group_count());
        (0..group_count)
            .map(|round| partial_inner(groups.as_ref(), &x, &x, round).unwrap().value)
            .collect::<Vec<_>>()
    });
    // Four groups of two ranks, ten entries per group: the mean estimate is the exact value.
    let rounds = &estimates[0];
    assert_eq!(rounds.len(), 4);
    let mean = rounds.iter().sum::<f64>() / rounds.len() as f64;
    assert_relative_eq!(mean, exact, epsilon = 1e-10);
    for other in &estimates[1..] {
        assert_eq!(other, rounds);
    }
}

#[test]
fn multi_group_single_group_is_exact() {
    let data = random_data(33);
    let exact = data.iter().map(|v| v * v).sum::<f64>();
    for p in [2, 5, 8] {
        let values = ThreadUniverse::new(p).run(|comm| {
            let x = slice_for(&comm, &data);
            let groups = ProcessGroupBuilder::new(&comm).multi_group(1.0, x.local_n()).unwrap();
            assert_eq!(groups.as_ref().map(|g| g.group_count()), Some(1));
            multi_group_inner(groups.as_ref(), &x, &x).unwrap().value
        });
        for v in values {
            assert_relative_eq!(v, exact, epsilon = 1e-10);
        }
    }
}

#[test]
fn multi_group_fresh_values_are_exact() {
    let data = random_data(45);
    let exact = data.iter().map(|v| v * v).sum::<f64>();
    let values = ThreadUniverse::new(10).run(|comm| {
        let x = slice_for(&comm, &data);
        let groups = ProcessGroupBuilder::new(&comm).multi_group(0.25, x.local_n()).unwrap();
        multi_group_inner(groups.as_ref(), &x, &x).unwrap().value
    });
    for v in values {
        assert_relative_eq!(v, exact, epsilon = 1e-10);
    }
}

#[test]
fn dimension_mismatch_is_reported() {
    let errs = ThreadUniverse::new(4).run(|comm| {
        let x = PartitionedVector::from_local(&comm, vec![1.0; 3]);
        let y = PartitionedVector::from_local(&comm, vec![1.0; 4]);
        let mut ctx =
            ReductionContext::new(&comm, ReductionOptions::new(ReductionKind::Half)).unwrap();
        (
            sequential_inner(&comm, &x, &y).err(),
            ctx.inner_product(&x, &y, 0).err(),
            ctx.has_hierarchy(),
        )
    });
    let mismatch = KError::DimensionMismatch { left: 3, right: 4 };
    for (seq, ctx, built) in errs {
        assert_eq!(seq, Some(mismatch.clone()));
        assert_eq!(ctx, Some(mismatch.clone()));
        assert!(!built, "no hierarchy may be built before the check");
    }
}

#[test]
fn context_drives_every_kind_with_rotation() {
    let data = random_data(24);
    let exact = data.iter().map(|v| v * v).sum::<f64>();
    for kind in [
        ReductionKind::Exact,
        ReductionKind::Sequential,
        ReductionKind::Half,
        ReductionKind::Partial,
        ReductionKind::MultiGroup,
    ] {
        let values = ThreadUniverse::new(6).run(|comm| {
            let x = slice_for(&comm, &data);
            let opts = ReductionOptions::new(kind).with_fraction(0.5);
            let mut ctx = ReductionContext::new(&comm, opts).unwrap();
            (0..4)
                .map(|round| ctx.inner_product(&x, &x, round % 2).unwrap().value)
                .collect::<Vec<_>>()
        });
        for rank_values in &values {
            assert_eq!(rank_values, &values[0]);
        }
        if !kind.is_approximate() {
            for v in &values[0] {
                assert_relative_eq!(*v, exact, epsilon = 1e-10);
            }
        } else {
            // Alternating halves average out to the exact value on equal-size halves.
            let mean = (values[0][0] + values[0][1]) / 2.0;
            assert_relative_eq!(mean, exact, epsilon = 1e-10);
        }
    }
}
