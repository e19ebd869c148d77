//! Computational graph for reverse-mode AD.
//!
//! Every operation appends a node to an arena and records, on each operand,
//! an outgoing [`Edge`] to the new node weighted by the local partial
//! derivative. Adjoints are recovered by a memoized backward accumulation
//! from a designated terminal node. Used internally by [`crate::Var`].

use std::cell::Cell;

use crate::Float;

/// Sentinel index indicating a constant (not recorded on the graph).
pub const CONSTANT: u32 = u32::MAX;

/// Stable index of a node in its [`Graph`].
pub type NodeId = u32;

/// One chain-rule edge: `∂successor / ∂this_node = local_partial`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge<F> {
    pub successor: NodeId,
    pub local_partial: F,
}

/// A recorded value and the nodes computed from it.
#[derive(Clone, Debug)]
pub struct GraphNode<F> {
    value: F,
    successors: Vec<Edge<F>>,
    adjoint: Option<F>,
}

impl<F: Float> GraphNode<F> {
    /// Primal value at this point of the computation.
    pub fn value(&self) -> F {
        self.value
    }

    /// Outgoing edges, in the order the operations were recorded.
    pub fn successors(&self) -> &[Edge<F>] {
        &self.successors
    }

    /// Memoized adjoint from the last backward pass, if any.
    pub fn cached_adjoint(&self) -> Option<F> {
        self.adjoint
    }
}

/// Arena of [`GraphNode`]s addressed by [`NodeId`].
///
/// Nodes are only ever appended, so every successor id is strictly greater
/// than the id of the node holding the edge. The graph is a DAG by
/// construction.
pub struct Graph<F: Float> {
    nodes: Vec<GraphNode<F>>,
    // Terminal the cached adjoints were computed for.
    terminal: Option<NodeId>,
}

impl<F: Float> Default for Graph<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> Graph<F> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Graph {
            nodes: Vec::new(),
            terminal: None,
        }
    }

    /// Create a graph with pre-allocated capacity.
    pub fn with_capacity(est_nodes: usize) -> Self {
        Graph {
            nodes: Vec::with_capacity(est_nodes),
            terminal: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node. Panics if `id` was not issued by this graph.
    pub fn node(&self, id: NodeId) -> &GraphNode<F> {
        &self.nodes[id as usize]
    }

    pub fn value(&self, id: NodeId) -> F {
        self.nodes[id as usize].value
    }

    /// Register an independent variable (a leaf with no operands).
    #[inline]
    pub fn new_leaf(&mut self, value: F) -> NodeId {
        self.push_node(value)
    }

    /// Record `result = f(operand)` with `partial = ∂f/∂operand`.
    #[inline]
    pub fn push_unary(&mut self, value: F, operand: NodeId, partial: F) -> NodeId {
        let id = self.push_node(value);
        self.link(operand, id, partial);
        id
    }

    /// Record a binary operation with precomputed partial derivatives.
    #[inline]
    pub fn push_binary(
        &mut self,
        value: F,
        lhs: NodeId,
        lhs_partial: F,
        rhs: NodeId,
        rhs_partial: F,
    ) -> NodeId {
        let id = self.push_node(value);
        self.link(lhs, id, lhs_partial);
        self.link(rhs, id, rhs_partial);
        id
    }

    fn push_node(&mut self, value: F) -> NodeId {
        self.invalidate();
        let id = self.nodes.len() as NodeId;
        debug_assert!(id != CONSTANT, "graph node limit reached");
        self.nodes.push(GraphNode {
            value,
            successors: Vec::new(),
            adjoint: None,
        });
        id
    }

    fn link(&mut self, operand: NodeId, successor: NodeId, local_partial: F) {
        if operand != CONSTANT {
            self.nodes[operand as usize].successors.push(Edge {
                successor,
                local_partial,
            });
        }
    }

    // A new node or a new terminal makes every cached adjoint stale.
    fn invalidate(&mut self) {
        if self.terminal.take().is_some() {
            for node in &mut self.nodes {
                node.adjoint = None;
            }
        }
    }

    /// `∂terminal / ∂node`, memoized.
    ///
    /// The terminal is seeded with 1. Any other node accumulates
    /// `Σ adjoint(successor) · local_partial` over its edges; a node with no
    /// path to the terminal ends up with 0. Each node is reduced once per
    /// terminal however many edges fan into it, so a pass is linear in the
    /// number of edges.
    pub fn adjoint(&mut self, node: NodeId, terminal: NodeId) -> F {
        if node == CONSTANT || terminal == CONSTANT {
            return F::zero();
        }
        if self.terminal != Some(terminal) {
            self.invalidate();
            self.terminal = Some(terminal);
        }
        if let Some(a) = self.nodes[node as usize].adjoint {
            return a;
        }

        // Frames are (node, next edge to read, partial sum so far).
        let mut stack: Vec<(NodeId, usize, F)> = vec![(node, 0, F::zero())];
        while let Some(&(id, cursor, acc)) = stack.last() {
            let top = stack.len() - 1;
            if id == terminal {
                self.nodes[id as usize].adjoint = Some(F::one());
                stack.pop();
                continue;
            }
            let Some(&edge) = self.nodes[id as usize].successors.get(cursor) else {
                self.nodes[id as usize].adjoint = Some(acc);
                stack.pop();
                continue;
            };
            // Successors past the terminal were created after it and cannot reach it.
            if edge.successor > terminal {
                stack[top].1 = cursor + 1;
                continue;
            }
            match self.nodes[edge.successor as usize].adjoint {
                Some(a) => stack[top] = (id, cursor + 1, acc + a * edge.local_partial),
                // Re-read this edge once the successor is reduced.
                None => stack.push((edge.successor, 0, F::zero())),
            }
        }
        self.nodes[node as usize].adjoint.unwrap_or_else(F::zero)
    }

    /// Adjoints of `leaves` with respect to `terminal`, in order.
    pub fn gradient(&mut self, leaves: &[NodeId], terminal: NodeId) -> Vec<F> {
        leaves
            .iter()
            .map(|&leaf| self.adjoint(leaf, terminal))
            .collect()
    }
}

// Thread-local active graph pointer.
thread_local! {
    static GRAPH_F32: Cell<*mut Graph<f32>> = const { Cell::new(std::ptr::null_mut()) };
    static GRAPH_F64: Cell<*mut Graph<f64>> = const { Cell::new(std::ptr::null_mut()) };
}

/// Trait to select the correct thread-local for a given float type.
pub trait GraphThreadLocal: Float {
    fn cell() -> &'static std::thread::LocalKey<Cell<*mut Graph<Self>>>;
}

impl GraphThreadLocal for f32 {
    fn cell() -> &'static std::thread::LocalKey<Cell<*mut Graph<Self>>> {
        &GRAPH_F32
    }
}

impl GraphThreadLocal for f64 {
    fn cell() -> &'static std::thread::LocalKey<Cell<*mut Graph<Self>>> {
        &GRAPH_F64
    }
}

/// Access the active graph for the current thread. Panics if no graph is active.
#[inline]
pub fn with_active_graph<F: GraphThreadLocal, R>(f: impl FnOnce(&mut Graph<F>) -> R) -> R {
    F::cell().with(|cell| {
        let ptr = cell.get();
        assert!(
            !ptr.is_null(),
            "No active graph. Use adgrad::reverse_gradient() or a GraphGuard."
        );
        // SAFETY: The GraphGuard guarantees the pointer is valid while it is
        // alive, and only one mutable reference exists at a time
        // (single-threaded access via thread-local).
        let graph = unsafe { &mut *ptr };
        f(graph)
    })
}

/// RAII guard that sets a graph as the thread-local active graph and restores
/// the previous one on drop.
///
/// Drop the guard before reading adjoints from the graph directly.
pub struct GraphGuard<F: GraphThreadLocal> {
    prev: *mut Graph<F>,
}

impl<F: GraphThreadLocal> GraphGuard<F> {
    /// Activate `graph` as the thread-local graph. Returns a guard that
    /// restores the previous graph on drop.
    pub fn new(graph: &mut Graph<F>) -> Self {
        let prev = F::cell().with(|cell| {
            let prev = cell.get();
            cell.set(graph as *mut Graph<F>);
            prev
        });
        GraphGuard { prev }
    }
}

impl<F: GraphThreadLocal> Drop for GraphGuard<F> {
    fn drop(&mut self) {
        F::cell().with(|cell| {
            cell.set(self.prev);
        });
    }
}
