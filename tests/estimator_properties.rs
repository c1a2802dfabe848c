use approx::assert_relative_eq;
use roi_distance::estimator::{Accumulator, Estimate, estimate};
use roi_distance::Point3;

const THRESHOLD: f32 = 120.0;

/// Deterministic mix of close, far and invalid samples.
fn mixed_samples(n: usize, seed: u32) -> Vec<Point3> {
    (0..n)
        .map(|i| {
            let k = (i as u32).wrapping_mul(2_654_435_761).wrapping_add(seed) % 1000;
            match k % 10 {
                0 => Point3::new(f32::NAN, 0.0, 0.0),
                1 => Point3::new(0.0, f32::INFINITY, 0.0),
                2 => Point3::new(0.0, 0.0, 150.0 + k as f32),
                _ => Point3::new(k as f32 / 100.0, -(k as f32) / 50.0, 30.0 + k as f32 / 20.0),
            }
        })
        .collect()
}

#[test]
fn mean_of_all_magnitudes_when_everything_is_valid() {
    let samples: Vec<Point3> = (1..=50)
        .map(|i| Point3::new(i as f32, 0.0, 0.0))
        .collect();
    let e = estimate(&samples, THRESHOLD).unwrap();
    assert_relative_eq!(e.distance().unwrap(), 25.5);
    assert_eq!(e.valid(), 50);
}

#[test]
fn only_rejected_samples_give_sentinel() {
    let samples = vec![
        Point3::new(0.0, 0.0, 200.0),
        Point3::new(f32::NAN, f32::NAN, f32::NAN),
        Point3::new(f32::INFINITY, 0.0, 0.0),
        Point3::new(0.0, 120.0, 0.0),
    ];
    let e = estimate(&samples, THRESHOLD).unwrap();
    assert_eq!(e, Estimate::NoData { total: 4 });
    assert_eq!(e.sentinel(), 0.0);
}

#[test]
fn order_does_not_matter() {
    let samples = mixed_samples(500, 7);
    let mut reversed = samples.clone();
    reversed.reverse();
    let mut rotated = samples.clone();
    rotated.rotate_left(123);

    let a = estimate(&samples, THRESHOLD).unwrap();
    for other in [reversed, rotated] {
        let b = estimate(&other, THRESHOLD).unwrap();
        assert_eq!(a.valid(), b.valid());
        assert_relative_eq!(
            a.distance().unwrap(),
            b.distance().unwrap(),
            max_relative = 1e-6
        );
    }
}

#[test]
fn concatenation_is_the_weighted_mean() {
    let a = mixed_samples(300, 1);
    let b = mixed_samples(170, 99);
    let ea = estimate(&a, THRESHOLD).unwrap();
    let eb = estimate(&b, THRESHOLD).unwrap();

    let joined: Vec<Point3> = a.iter().chain(&b).copied().collect();
    let ej = estimate(&joined, THRESHOLD).unwrap();

    let (na, nb) = (ea.valid() as f32, eb.valid() as f32);
    let weighted = (ea.distance().unwrap() * na + eb.distance().unwrap() * nb) / (na + nb);
    assert_eq!(ej.valid(), ea.valid() + eb.valid());
    assert_relative_eq!(ej.distance().unwrap(), weighted, max_relative = 1e-5);
}

#[test]
fn accumulators_can_be_built_on_several_threads() {
    let samples = mixed_samples(4000, 3);
    let parts: Vec<Accumulator> = std::thread::scope(|s| {
        let handles: Vec<_> = samples
            .chunks(1000)
            .map(|chunk| {
                s.spawn(move || {
                    let mut acc = Accumulator::new();
                    chunk.iter().for_each(|p| acc.push(p, THRESHOLD));
                    acc
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let merged = parts
        .into_iter()
        .fold(Accumulator::new(), Accumulator::merge)
        .finish();
    let whole = estimate(&samples, THRESHOLD).unwrap();
    assert_eq!(merged.valid(), whole.valid());
    assert_relative_eq!(
        merged.distance().unwrap(),
        whole.distance().unwrap(),
        max_relative = 1e-6
    );
}
