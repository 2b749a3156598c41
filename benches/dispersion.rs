use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cliff::components::dispersion::{tang_toennies_damping, TangToennies};
use cliff::logging::Silent;
use cliff::{Atom, Cell, EnergyComponent, Monomer};
use nalgebra::Vector3;
use std::sync::Arc;

/// Waters on a square grid in the z = `height` plane, with fixed properties
fn water_layer(name: &str, per_side: usize, height: f64) -> Monomer {
    let mut atoms = Vec::new();
    let mut widths = Vec::new();
    for i in 0..per_side {
        for j in 0..per_side {
            let origin = Vector3::new(i as f64 * 3.0, j as f64 * 3.0, height);
            atoms.push(Atom::new("O", origin + Vector3::new(0.0, 0.0, 0.1178)).unwrap());
            atoms.push(Atom::new("H", origin + Vector3::new(0.0, 0.7555, -0.4712)).unwrap());
            atoms.push(Atom::new("H", origin + Vector3::new(0.0, -0.7555, -0.4712)).unwrap());
            widths.extend([0.43, 0.52, 0.52]);
        }
    }
    let n = atoms.len();
    let mut monomer = Monomer::new(name, atoms).unwrap();
    monomer.set_hirshfeld_ratios(vec![0.8; n]).unwrap();
    monomer.set_valence_widths(widths).unwrap();
    monomer
}

fn bench_damping(c: &mut Criterion) {
    c.bench_function("tang_toennies_damping", |b| {
        b.iter(|| {
            for n in [6, 8, 10] {
                black_box(tang_toennies_damping(n, black_box(6.5), black_box(1.9)));
            }
        })
    });
}

fn bench_dimer_dispersion(c: &mut Criterion) {
    let a = water_layer("bottom", 6, 0.0);
    let b = water_layer("top", 6, 3.5);
    let cell = Cell::default();
    let component = TangToennies::default().with_logger(Arc::new(Silent));

    c.bench_function("dispersion_108x108", |bench| {
        bench.iter(|| black_box(component.evaluate(&a, &b, &cell).unwrap()))
    });
}

criterion_group!(dispersion_benches, bench_damping, bench_dimer_dispersion);
criterion_main!(dispersion_benches);
