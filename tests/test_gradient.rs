//! Reverse-mode gradients checked against central finite differences on the
//! real and imaginary part of every leaf element.

use num_complex::Complex64;
use phase_sequencer::network::{Network, NetworkConfig};
use phase_sequencer::tape::{Activation, Tape};
use phase_sequencer::types::ComplexTensor;

const H: f64 = 1e-6;
const TOL: f64 = 1e-4;

// =========================================================================
// Helpers
// =========================================================================

fn tensor(values: &[(f64, f64)], rows: usize, cols: usize) -> ComplexTensor {
    let data = values.iter().map(|&(re, im)| Complex64::new(re, im)).collect();
    ComplexTensor::new(data, rows, cols).unwrap()
}

/// Leaves: [w (2x2), x (2x2), b (2x1), t (2x2)].
fn leaves() -> Vec<ComplexTensor> {
    vec![
        tensor(&[(0.3, -0.2), (0.5, 0.1), (-0.4, 0.7), (0.2, 0.2)], 2, 2),
        tensor(&[(0.1, 0.9), (-0.6, 0.3), (0.8, -0.1), (0.05, 0.4)], 2, 2),
        tensor(&[(0.2, -0.3), (-0.1, 0.25)], 2, 1),
        tensor(&[(0.5, 0.5), (-0.2, 0.1), (0.0, -0.3), (0.4, 0.0)], 2, 2),
    ]
}

/// cost = mean(|f(w @ x + b) - t|^2); returns (cost, grads per leaf).
fn evaluate(leaves: &[ComplexTensor], activation: Activation) -> (f64, Vec<Vec<Complex64>>) {
    let mut tape = Tape::new();
    let ids: Vec<_> = leaves.iter().map(|l| tape.leaf(l.clone())).collect();
    let z = tape.matmul(ids[0], ids[1]).unwrap();
    let z = tape.add_bias(z, ids[2]).unwrap();
    let y = tape.activate(z, activation);
    let q = tape.quadratic(y, ids[3]).unwrap();
    let cost = tape.mean(q);
    let value = tape.backward(cost).unwrap();
    assert!(value.im.abs() < 1e-15, "quadratic cost must be real");
    let grads = ids.iter().map(|&id| tape.grad(id).to_vec()).collect();
    (value.re, grads)
}

fn perturbed(leaves: &[ComplexTensor], leaf: usize, idx: usize, delta: Complex64) -> Vec<ComplexTensor> {
    let mut out = leaves.to_vec();
    out[leaf].as_mut_slice()[idx] += delta;
    out
}

fn check_against_finite_differences(activation: Activation) {
    let base = leaves();
    let (_, grads) = evaluate(&base, activation);

    for (leaf, tensor) in base.iter().enumerate() {
        for idx in 0..tensor.len() {
            let directions = [Complex64::new(H, 0.0), Complex64::new(0.0, H)];
            let mut numeric = [0.0; 2];
            for (k, &d) in directions.iter().enumerate() {
                let (plus, _) = evaluate(&perturbed(&base, leaf, idx, d), activation);
                let (minus, _) = evaluate(&perturbed(&base, leaf, idx, -d), activation);
                numeric[k] = (plus - minus) / (2.0 * H);
            }
            let analytic = grads[leaf][idx];
            assert!(
                (analytic.re - numeric[0]).abs() < TOL,
                "{activation} leaf {leaf}[{idx}] re: analytic {} vs numeric {}",
                analytic.re,
                numeric[0]
            );
            assert!(
                (analytic.im - numeric[1]).abs() < TOL,
                "{activation} leaf {leaf}[{idx}] im: analytic {} vs numeric {}",
                analytic.im,
                numeric[1]
            );
        }
    }
}

// =========================================================================
// 1. Primitive graph
// =========================================================================

#[test]
fn gradient_matches_finite_differences_tanh() {
    check_against_finite_differences(Activation::Tanh);
}

#[test]
fn gradient_matches_finite_differences_sigmoid() {
    check_against_finite_differences(Activation::Sigmoid);
}

// =========================================================================
// 2. Full three-layer network
// =========================================================================

#[test]
fn network_gradient_matches_finite_differences() {
    let config = NetworkConfig { width: 3, middle: 2, ..NetworkConfig::default() };
    let mut net = Network::new(config, 9).unwrap();
    let input = tensor(&[(0.5, 0.1), (0.0, 0.0), (0.0, 0.2), (0.3, -0.3), (0.1, 0.0), (0.0, 0.6)], 3, 2);
    let target = tensor(&[(0.0, 0.0), (0.4, 0.4), (0.1, -0.1), (0.0, 0.3), (0.2, 0.0), (0.0, 0.0)], 3, 2);
    net.backprop(&input, &target).unwrap();
    let analytic: Vec<Vec<Complex64>> = net.params().iter().map(|p| p.grad().to_vec()).collect();

    for (pi, grads) in analytic.iter().enumerate() {
        for (idx, g) in grads.iter().enumerate() {
            let mut numeric = [0.0; 2];
            for (k, d) in [Complex64::new(H, 0.0), Complex64::new(0.0, H)].into_iter().enumerate() {
                let mut plus = net.clone();
                plus.params_mut()[pi].values_mut()[idx] += d;
                let mut minus = net.clone();
                minus.params_mut()[pi].values_mut()[idx] -= d;
                let cp = plus.cost(&input, &target).unwrap().re;
                let cm = minus.cost(&input, &target).unwrap().re;
                numeric[k] = (cp - cm) / (2.0 * H);
            }
            assert!((g.re - numeric[0]).abs() < TOL, "param {pi}[{idx}] re");
            assert!((g.im - numeric[1]).abs() < TOL, "param {pi}[{idx}] im");
        }
    }
}

#[test]
fn gradients_do_not_leak_between_passes() {
    let config = NetworkConfig { width: 3, middle: 2, ..NetworkConfig::default() };
    let mut net = Network::new(config, 4).unwrap();
    let input = ComplexTensor::zeros(3, 1);
    let target = ComplexTensor::zeros(3, 1);
    net.backprop(&input, &target).unwrap();
    let first: Vec<Complex64> = net.params().iter().flat_map(|p| p.grad().to_vec()).collect();
    net.backprop(&input, &target).unwrap();
    let second: Vec<Complex64> = net.params().iter().flat_map(|p| p.grad().to_vec()).collect();
    assert_eq!(first, second);
}
