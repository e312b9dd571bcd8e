use rand::Rng;

use crate::activation::activation::ActivationFunction;
use crate::data::dataset::Example;
use crate::error::Result;
use crate::graph::{Bindings, Graph, Mode, NodeId};
use crate::math::{dct::dct_basis, tensor::Tensor};
use crate::network::genome::{Gene, Genome};
use crate::network::parameter_set::{ParameterSet, TensorId};
use crate::network::spec::{Architecture, NetworkSpec};

/// Which side of a chained tensor the square links multiply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mixing {
    /// `m_k = m_{k-1} · A_k + B_k`, `A_k` is cols x cols (weights).
    FanIn,
    /// `m_k = A_k · m_{k-1} + B_k`, `A_k` is rows x rows (biases).
    Rows,
}

/// A trainable tensor followed by its multiplicative links `(A_k, B_k)`.
struct Chain {
    base: TensorId,
    mixing: Mixing,
    links: Vec<(TensorId, TensorId)>,
}

impl Chain {
    fn genes(&self) -> Vec<Gene> {
        self.links.iter().map(|&(weight, bias)| Gene { weight, bias }).collect()
    }
}

/// One network instance: its parameters, the constant tensors its graph
/// reads, and the graph computing output and cost.
#[derive(Debug, Clone)]
pub struct Network {
    spec: NetworkSpec,
    parameters: ParameterSet,
    constants: Vec<Tensor>,
    graph: Graph,
    output: NodeId,
    cost: NodeId,
    genome: Genome,
}

impl Network {
    /// Builds the network and draws every parameter uniformly from [-1, 1)
    /// in `ParameterSet` order.
    pub fn new<R: Rng + ?Sized>(spec: NetworkSpec, rng: &mut R) -> Result<Network> {
        spec.validate()?;
        let depth = spec.architecture.depth();

        let mut parameters = ParameterSet::new();
        let w1 = push_chain(&mut parameters, "w1", (spec.width, spec.inputs), Mixing::FanIn, depth, rng);
        let b1 = push_chain(&mut parameters, "b1", (spec.width, 1), Mixing::Rows, depth, rng);
        let w2 = push_chain(&mut parameters, "w2", (spec.outputs, spec.width), Mixing::FanIn, depth, rng);
        let b2 = push_chain(&mut parameters, "b2", (spec.outputs, 1), Mixing::Rows, depth, rng);

        let mut constants = Vec::new();
        let mut graph = Graph::new();
        let x = graph.input(0, spec.inputs, 1);

        let w1n = weight_node(&mut graph, &parameters, &mut constants, &w1, spec.architecture);
        let b1n = chain_node(&mut graph, &parameters, &b1);
        let z1 = graph.mul(w1n, x);
        let z1 = graph.add(z1, b1n);
        let hidden = graph.activate(ActivationFunction::Sigmoid, z1);

        let w2n = weight_node(&mut graph, &parameters, &mut constants, &w2, spec.architecture);
        let b2n = chain_node(&mut graph, &parameters, &b2);
        let z2 = graph.mul(w2n, hidden);
        let z2 = graph.add(z2, b2n);
        let output = graph.activate(spec.activation, z2);

        let target = graph.input(1, spec.outputs, 1);
        let cost = graph.loss(spec.loss, output, target);

        let mut genome = Genome::default();
        let mut hidden_genes = vec![Gene { weight: w1.base, bias: b1.base }];
        hidden_genes.extend(w1.genes());
        let mut output_genes = vec![Gene { weight: w2.base, bias: b2.base }];
        output_genes.extend(w2.genes());
        genome.push_block("hidden-stage", hidden_genes);
        genome.push_block("hidden-bias-stage", b1.genes());
        genome.push_block("output-stage", output_genes);
        genome.push_block("output-bias-stage", b2.genes());

        Ok(Network { spec, parameters, constants, graph, output, cost, genome })
    }

    pub fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    /// Non-trainable tensors read by the graph (DCT bases).
    pub fn constants(&self) -> &[Tensor] {
        &self.constants
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    /// Zeroes the gradients of every parameter and every constant.
    pub fn zero_grad(&mut self) {
        self.parameters.zero_grad();
        self.constants.iter_mut().for_each(Tensor::zero_grad);
    }

    /// Cost of one example. `Mode::Train` adds its gradient into the
    /// parameter buffers; callers zero them first.
    pub fn cost(&mut self, example: &Example, mode: Mode) -> f32 {
        let inputs: [&[f32]; 2] = [&example.input, &example.target];
        self.graph.evaluate(self.cost, &mut self.parameters, &mut self.constants, &inputs, mode)
    }

    /// Forward and backward pass for one example.
    pub fn present(&mut self, example: &Example) -> f32 {
        self.cost(example, Mode::Train)
    }

    /// Inference-only cost of one example; gradients are left untouched.
    pub fn evaluate(&self, example: &Example) -> f32 {
        let inputs: [&[f32]; 2] = [&example.input, &example.target];
        let bindings = Bindings {
            params: &self.parameters,
            constants: &self.constants,
            inputs: &inputs,
        };
        self.graph.value(self.cost, &bindings).data[0]
    }

    /// Output activations for `input`.
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let inputs: [&[f32]; 1] = [input];
        let bindings = Bindings {
            params: &self.parameters,
            constants: &self.constants,
            inputs: &inputs,
        };
        self.graph.value(self.output, &bindings).data
    }

    /// Index of the largest output; the first one wins ties.
    pub fn predict(&self, input: &[f32]) -> usize {
        argmax(&self.forward(input))
    }
}

/// Index of the maximum element in a slice.
pub fn argmax(v: &[f32]) -> usize {
    v.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &x)| if x > max { (i, x) } else { (best, max) })
        .0
}

fn push_chain<R: Rng + ?Sized>(
    parameters: &mut ParameterSet,
    name: &str,
    (rows, cols): (usize, usize),
    mixing: Mixing,
    depth: usize,
    rng: &mut R,
) -> Chain {
    let side = match mixing {
        Mixing::FanIn => cols,
        Mixing::Rows => rows,
    };
    let base = parameters.push(Tensor::random(name, rows, cols, rng));
    let links = (1..=depth)
        .map(|k| {
            let a = parameters.push(Tensor::random(format!("{name}a{k}"), side, side, rng));
            let b = parameters.push(Tensor::random(format!("{name}b{k}"), rows, cols, rng));
            (a, b)
        })
        .collect();
    Chain { base, mixing, links }
}

/// Applies every link of the chain to its base tensor.
fn chain_node(graph: &mut Graph, parameters: &ParameterSet, chain: &Chain) -> NodeId {
    let mut m = graph.param(parameters, chain.base);
    for &(a, b) in &chain.links {
        let an = graph.param(parameters, a);
        let product = match chain.mixing {
            Mixing::FanIn => graph.mul(m, an),
            Mixing::Rows => graph.mul(an, m),
        };
        let bn = graph.param(parameters, b);
        m = graph.add(product, bn);
    }
    m
}

fn weight_node(
    graph: &mut Graph,
    parameters: &ParameterSet,
    constants: &mut Vec<Tensor>,
    chain: &Chain,
    architecture: Architecture,
) -> NodeId {
    if architecture != Architecture::Dct {
        return chain_node(graph, parameters, chain);
    }

    let freq = parameters.get(chain.base);
    let (rows, cols) = (freq.rows(), freq.cols());
    let (_, rows_t) = dct_basis(rows);
    let (cols_basis, _) = dct_basis(cols);

    constants.push(Tensor::from_matrix(format!("{}-dct-rows", freq.name), rows_t));
    let left = graph.constant(constants, constants.len() - 1);
    constants.push(Tensor::from_matrix(format!("{}-dct-cols", freq.name), cols_basis));
    let right = graph.constant(constants, constants.len() - 1);

    let f = graph.param(parameters, chain.base);
    let lf = graph.mul(left, f);
    graph.mul(lf, right)
}
