use serde::{Deserialize, Serialize};

/// A fully connected neural network layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    /// Row-major `[out_dim, in_dim]` weight matrix.
    pub w: Vec<f32>,
    pub b: Vec<f32>,
    pub in_dim: usize,
    pub out_dim: usize,
}

impl Dense {
    /// Creates a new `Dense` layer with the given weights and biases.
    ///
    /// # Panics
    ///
    /// Panics if the buffers do not match the dimensions.
    #[must_use]
    pub fn new(weights: Vec<f32>, bias: Vec<f32>, in_d: usize, out_d: usize) -> Self {
        assert_eq!(weights.len(), in_d * out_d);
        assert_eq!(bias.len(), out_d);
        Self { w: weights, b: bias, in_dim: in_d, out_dim: out_d }
    }

    /// Glorot-uniform weights scaled by `gain`, zero bias.
    pub fn random(in_d: usize, out_d: usize, gain: f32, rng: &mut fastrand::Rng) -> Self {
        let limit = gain * (6.0 / (in_d + out_d) as f32).sqrt();
        let weights = (0..in_d * out_d)
            .map(|_| rng.f32() * 2.0 * limit - limit)
            .collect();
        Self::new(weights, vec![0.0; out_d], in_d, out_d)
    }

    /// `y = W x + b`
    #[must_use]
    pub fn forward(&self, x: &[f32]) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.in_dim);
        self.w
            .chunks_exact(self.in_dim)
            .zip(&self.b)
            .map(|(row, b)| row.iter().zip(x).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }

    /// Accumulates `dL/dW` and `dL/db` for one sample and returns `dL/dx`.
    pub fn backward(&self, x: &[f32], grad_out: &[f32], grad_w: &mut [f32], grad_b: &mut [f32]) -> Vec<f32> {
        let mut grad_in = vec![0.0; self.in_dim];
        for (o, &g) in grad_out.iter().enumerate() {
            grad_b[o] += g;
            let row = o * self.in_dim;
            for i in 0..self.in_dim {
                grad_w[row + i] += g * x[i];
                grad_in[i] += g * self.w[row + i];
            }
        }
        grad_in
    }
}

/// Activations kept from a forward pass for the matching backward pass.
pub struct Trace {
    inputs: Vec<Vec<f32>>,
}

/// A stack of [`Dense`] layers with `tanh` between them and a linear output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    pub layers: Vec<Dense>,
}

impl Mlp {
    /// `sizes` lists every width from input to output. Hidden layers use
    /// gain `√2`, the output layer `output_gain`.
    ///
    /// # Panics
    ///
    /// Panics with fewer than two sizes.
    pub fn new(sizes: &[usize], output_gain: f32, rng: &mut fastrand::Rng) -> Self {
        assert!(sizes.len() >= 2, "an MLP needs an input and an output width");
        let last = sizes.len() - 2;
        let layers = sizes
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let gain = if i == last { output_gain } else { std::f32::consts::SQRT_2 };
                Dense::random(w[0], w[1], gain, rng)
            })
            .collect();
        Self { layers }
    }

    #[must_use]
    pub fn in_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.in_dim)
    }

    #[must_use]
    pub fn out_dim(&self) -> usize {
        self.layers.last().map_or(0, |l| l.out_dim)
    }

    #[must_use]
    pub fn forward(&self, x: &[f32]) -> Vec<f32> {
        self.forward_traced(x).0
    }

    #[must_use]
    pub fn forward_traced(&self, x: &[f32]) -> (Vec<f32>, Trace) {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut h = x.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            let mut y = layer.forward(&h);
            if i + 1 < self.layers.len() {
                y.iter_mut().for_each(|v| *v = v.tanh());
            }
            inputs.push(std::mem::replace(&mut h, y));
        }
        (h, Trace { inputs })
    }

    /// Accumulates parameter gradients into `grads` (laid out like
    /// [`Mlp::zero_grads`]).
    pub fn backward(&self, trace: &Trace, grad_out: &[f32], grads: &mut [Vec<f32>]) {
        let mut delta = grad_out.to_vec();
        for (i, layer) in self.layers.iter().enumerate().rev() {
            let x = &trace.inputs[i];
            let (gw, gb) = grads[2 * i..2 * i + 2].split_at_mut(1);
            let grad_in = layer.backward(x, &delta, &mut gw[0], &mut gb[0]);
            if i > 0 {
                // x = tanh(z)
                delta = grad_in.iter().zip(x).map(|(g, a)| g * (1.0 - a * a)).collect();
            }
        }
    }

    /// First layer whose stored buffers disagree with its declared sizes or
    /// with its neighbours, as `(layer, what, expected, got)`.
    #[must_use]
    pub fn shape_mismatch(&self) -> Option<(usize, &'static str, usize, usize)> {
        let mut width = self.in_dim();
        for (i, l) in self.layers.iter().enumerate() {
            if l.in_dim != width {
                return Some((i, "input", width, l.in_dim));
            }
            if l.in_dim == 0 || l.out_dim == 0 {
                return Some((i, "width", 1, 0));
            }
            if l.w.len() != l.in_dim * l.out_dim {
                return Some((i, "weights", l.in_dim * l.out_dim, l.w.len()));
            }
            if l.b.len() != l.out_dim {
                return Some((i, "bias", l.out_dim, l.b.len()));
            }
            width = l.out_dim;
        }
        None
    }

    /// Zeroed gradient buffers: weights then bias, layer by layer.
    #[must_use]
    pub fn zero_grads(&self) -> Vec<Vec<f32>> {
        self.layers
            .iter()
            .flat_map(|l| [vec![0.0; l.w.len()], vec![0.0; l.b.len()]])
            .collect()
    }

    /// Parameter buffers in the order of [`Mlp::zero_grads`].
    pub fn params_mut(&mut self) -> impl Iterator<Item = &mut Vec<f32>> {
        self.layers.iter_mut().flat_map(|l| [&mut l.w, &mut l.b])
    }

    #[must_use]
    pub fn param_count(&self) -> usize {
        self.layers.iter().map(|l| l.w.len() + l.b.len()).sum()
    }
}
