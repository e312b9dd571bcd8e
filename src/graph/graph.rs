use crate::activation::activation::ActivationFunction;
use crate::loss::loss_type::LossType;
use crate::math::{matrix::Matrix, tensor::Tensor};
use crate::network::parameter_set::{ParameterSet, TensorId};

/// Handle to a node inside a `Graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Whether an evaluation also back-propagates into gradient buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    /// Forward pass only; every gradient buffer is left untouched.
    Inference,
}

#[derive(Debug, Clone)]
enum Op {
    Param(TensorId),
    Constant(usize),
    Input(usize),
    Mul(NodeId, NodeId),
    Add(NodeId, NodeId),
    Activate(ActivationFunction, NodeId),
    Loss(LossType, NodeId, NodeId),
}

#[derive(Debug, Clone)]
struct Node {
    op: Op,
    rows: usize,
    cols: usize,
}

/// Values bound to the leaves of a graph for one evaluation.
pub struct Bindings<'a> {
    pub params: &'a ParameterSet,
    pub constants: &'a [Tensor],
    pub inputs: &'a [&'a [f32]],
}

/// A fixed expression over parameter, constant and input leaves.
///
/// Nodes are stored in construction order, which is also a valid topological
/// order: every node only refers to nodes created before it.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn shape(&self, id: NodeId) -> (usize, usize) {
        let node = &self.nodes[id.0];
        (node.rows, node.cols)
    }

    fn push(&mut self, op: Op, rows: usize, cols: usize) -> NodeId {
        self.nodes.push(Node { op, rows, cols });
        NodeId(self.nodes.len() - 1)
    }

    pub fn param(&mut self, params: &ParameterSet, id: TensorId) -> NodeId {
        let tensor = params.get(id);
        self.push(Op::Param(id), tensor.rows(), tensor.cols())
    }

    pub fn constant(&mut self, constants: &[Tensor], index: usize) -> NodeId {
        let tensor = &constants[index];
        self.push(Op::Constant(index), tensor.rows(), tensor.cols())
    }

    /// A leaf whose values are supplied at evaluation time in `inputs[slot]`.
    pub fn input(&mut self, slot: usize, rows: usize, cols: usize) -> NodeId {
        self.push(Op::Input(slot), rows, cols)
    }

    /// Matrix product `a · b`.
    pub fn mul(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let (ar, ac) = self.shape(a);
        let (br, bc) = self.shape(b);
        assert_eq!(ac, br, "cannot multiply {ar}x{ac} by {br}x{bc}");
        self.push(Op::Mul(a, b), ar, bc)
    }

    pub fn add(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let (ar, ac) = self.shape(a);
        assert_eq!((ar, ac), self.shape(b), "cannot add tensors of different shapes");
        self.push(Op::Add(a, b), ar, ac)
    }

    pub fn activate(&mut self, function: ActivationFunction, a: NodeId) -> NodeId {
        let (rows, cols) = self.shape(a);
        self.push(Op::Activate(function, a), rows, cols)
    }

    /// Scalar cost of `predicted` against `target`. The target never
    /// receives a gradient.
    pub fn loss(&mut self, loss: LossType, predicted: NodeId, target: NodeId) -> NodeId {
        assert_eq!(self.shape(predicted), self.shape(target), "loss operands differ in shape");
        self.push(Op::Loss(loss, predicted, target), 1, 1)
    }

    /// Value of `root` without touching any gradient.
    pub fn value(&self, root: NodeId, bindings: &Bindings<'_>) -> Matrix {
        let mut values = self.forward(root, bindings);
        values[root.0].take().unwrap_or_default()
    }

    /// Evaluates the scalar node `root`. In `Mode::Train` the gradient of
    /// `root` is added into every contributing parameter and constant.
    pub fn evaluate(
        &self,
        root: NodeId,
        params: &mut ParameterSet,
        constants: &mut [Tensor],
        inputs: &[&[f32]],
        mode: Mode,
    ) -> f32 {
        assert_eq!(self.shape(root), (1, 1), "only scalar nodes can be evaluated as a cost");

        let values = self.forward(root, &Bindings { params, constants, inputs });
        let cost = values[root.0].as_ref().map(|v| v.data[0]).unwrap_or_default();

        if mode == Mode::Train {
            self.backward(root, &values, params, constants);
        }
        cost
    }

    /// Marks the nodes `root` depends on.
    fn reachable(&self, root: NodeId) -> Vec<bool> {
        let mut needed = vec![false; root.0 + 1];
        needed[root.0] = true;
        for id in (0..=root.0).rev() {
            if !needed[id] {
                continue;
            }
            match self.nodes[id].op {
                Op::Mul(a, b) | Op::Add(a, b) | Op::Loss(_, a, b) => {
                    needed[a.0] = true;
                    needed[b.0] = true;
                }
                Op::Activate(_, a) => needed[a.0] = true,
                Op::Param(_) | Op::Constant(_) | Op::Input(_) => {}
            }
        }
        needed
    }

    fn forward(&self, root: NodeId, bindings: &Bindings<'_>) -> Vec<Option<Matrix>> {
        let needed = self.reachable(root);
        let mut values: Vec<Option<Matrix>> = vec![None; root.0 + 1];

        for id in 0..=root.0 {
            if !needed[id] {
                continue;
            }
            let node = &self.nodes[id];
            let get = |n: NodeId| values[n.0].as_ref().expect("operand evaluated before use");
            let value = match &node.op {
                Op::Param(t) => bindings.params.get(*t).value.clone(),
                Op::Constant(c) => bindings.constants[*c].value.clone(),
                Op::Input(slot) => Matrix::from_vec(node.rows, node.cols, bindings.inputs[*slot].to_vec()),
                Op::Mul(a, b) => get(*a) * get(*b),
                Op::Add(a, b) => get(*a) + get(*b),
                Op::Activate(f, a) => f.apply(get(*a)),
                Op::Loss(l, p, t) => Matrix::from_vec(1, 1, vec![l.loss(get(*p), get(*t))]),
            };
            values[id] = Some(value);
        }

        values
    }

    fn backward(
        &self,
        root: NodeId,
        values: &[Option<Matrix>],
        params: &mut ParameterSet,
        constants: &mut [Tensor],
    ) {
        let mut adjoints: Vec<Option<Matrix>> = vec![None; root.0 + 1];
        let (rows, cols) = self.shape(root);
        let mut seed = Matrix::zeros(rows, cols);
        seed.fill(1.0);
        adjoints[root.0] = Some(seed);

        let value = |n: NodeId| values[n.0].as_ref().expect("forward value present");

        for id in (0..=root.0).rev() {
            let Some(g) = adjoints[id].take() else {
                continue;
            };
            match &self.nodes[id].op {
                Op::Param(t) => params.get_mut(*t).grad.accumulate(&g),
                Op::Constant(c) => constants[*c].grad.accumulate(&g),
                Op::Input(_) => {}
                Op::Mul(a, b) => {
                    let ga = &g * &value(*b).transpose();
                    let gb = &value(*a).transpose() * &g;
                    push_adjoint(&mut adjoints, *a, ga);
                    push_adjoint(&mut adjoints, *b, gb);
                }
                Op::Add(a, b) => {
                    push_adjoint(&mut adjoints, *a, g.clone());
                    push_adjoint(&mut adjoints, *b, g);
                }
                Op::Activate(f, a) => {
                    let ga = f.backward(value(NodeId(id)), &g);
                    push_adjoint(&mut adjoints, *a, ga);
                }
                Op::Loss(l, p, t) => {
                    let scale = g.data[0];
                    let gp = l.derivative(value(*p), value(*t)).map(|x| x * scale);
                    push_adjoint(&mut adjoints, *p, gp);
                }
            }
        }
    }
}

fn push_adjoint(adjoints: &mut [Option<Matrix>], node: NodeId, g: Matrix) {
    match &mut adjoints[node.0] {
        Some(existing) => existing.accumulate(&g),
        slot @ None => *slot = Some(g),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, SeedableRng};

    /// cost = cross_entropy(softmax(W·x + b), t) on a 2-input, 3-output layer.
    fn small_graph(rng: &mut StdRng) -> (Graph, ParameterSet, NodeId) {
        let mut params = ParameterSet::new();
        let w = params.push(Tensor::random("w", 3, 2, rng));
        let b = params.push(Tensor::random("b", 3, 1, rng));

        let mut graph = Graph::new();
        let x = graph.input(0, 2, 1);
        let t = graph.input(1, 3, 1);
        let wn = graph.param(&params, w);
        let bn = graph.param(&params, b);
        let z = graph.mul(wn, x);
        let z = graph.add(z, bn);
        let y = graph.activate(ActivationFunction::Softmax, z);
        let cost = graph.loss(LossType::CrossEntropy, y, t);
        (graph, params, cost)
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(11);
        let (graph, mut params, cost) = small_graph(&mut rng);
        let x = [0.3f32, -0.7];
        let t = [0.0f32, 1.0, 0.0];
        let inputs: [&[f32]; 2] = [&x, &t];

        params.zero_grad();
        graph.evaluate(cost, &mut params, &mut [], &inputs, Mode::Train);
        let analytic: Vec<f32> = params.iter().flat_map(|p| p.grad.data.clone()).collect();

        let h = 1e-2f32;
        let mut numeric = Vec::new();
        for k in 0..params.len() {
            for i in 0..params.get(TensorId(k)).len() {
                let original = params.get(TensorId(k)).value.data[i];
                params.get_mut(TensorId(k)).value.data[i] = original + h;
                let up = graph.evaluate(cost, &mut params, &mut [], &inputs, Mode::Inference);
                params.get_mut(TensorId(k)).value.data[i] = original - h;
                let down = graph.evaluate(cost, &mut params, &mut [], &inputs, Mode::Inference);
                params.get_mut(TensorId(k)).value.data[i] = original;
                numeric.push((up - down) / (2.0 * h));
            }
        }

        for (a, n) in analytic.iter().zip(&numeric) {
            assert_abs_diff_eq!(*a, *n, epsilon = 1e-2);
        }
    }

    #[test]
    fn inference_leaves_gradients_alone() {
        let mut rng = StdRng::seed_from_u64(5);
        let (graph, mut params, cost) = small_graph(&mut rng);
        let x = [1.0f32, 0.0];
        let t = [1.0f32, 0.0, 0.0];
        let inputs: [&[f32]; 2] = [&x, &t];

        params.zero_grad();
        let c = graph.evaluate(cost, &mut params, &mut [], &inputs, Mode::Inference);
        assert!(c > 0.0);
        assert_eq!(params.grad_norm(), 0.0);
    }

    #[test]
    fn train_mode_accumulates() {
        let mut rng = StdRng::seed_from_u64(5);
        let (graph, mut params, cost) = small_graph(&mut rng);
        let x = [1.0f32, 0.5];
        let t = [0.0f32, 0.0, 1.0];
        let inputs: [&[f32]; 2] = [&x, &t];

        params.zero_grad();
        graph.evaluate(cost, &mut params, &mut [], &inputs, Mode::Train);
        let once = params.grad_norm();
        graph.evaluate(cost, &mut params, &mut [], &inputs, Mode::Train);
        assert_abs_diff_eq!(params.grad_norm(), 2.0 * once, epsilon = 1e-5);
    }
}
