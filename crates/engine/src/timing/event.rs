//! Value-typed timing event nodes and the arena that owns them.
//!
//! Each request builds a small DAG of pipeline-stage events. Nodes live in a
//! flat arena owned by the event recorder and are addressed by [`EventId`],
//! so graphs from nested requests (recursive evictions) can be spliced into
//! an outer graph without pointer juggling. Edges always run from a causal
//! predecessor to its successor, and every node carries an explicit minimum
//! start cycle set before its edges are added.

/// Index of an event node in an [`EventArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventId(pub(crate) u32);

impl EventId {
    /// Position of the node in its arena, matching the order of
    /// [`EventArena::resolve`] output.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Pipeline stage a node represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Begin of tag/data array access on a miss.
    MissStart,
    /// Data available to the requester on a miss.
    MissResponse,
    /// Asynchronous completion of miss-side evictions.
    MissWriteback,
    /// A hit resolving in the arrays.
    Hit,
    /// Asynchronous completion of hit-side (write) evictions.
    HitWriteback,
    /// Pure delay bridging two events.
    Delay,
}

/// One node of the per-request timing DAG.
#[derive(Debug, Clone)]
pub struct EventNode {
    /// Stage this node models.
    pub kind: EventKind,
    /// Intrinsic duration in cycles.
    pub delay: u64,
    /// Earliest cycle this node may start, independent of its parents.
    pub min_start_cycle: u64,
    /// Causal successors.
    pub children: Vec<EventId>,
}

/// Realized schedule of one event after [`EventArena::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEvent {
    /// Cycle the event starts: the max of its minimum start cycle and every
    /// parent's end cycle.
    pub start: u64,
    /// `start + delay`.
    pub end: u64,
}

/// Flat arena of event nodes.
#[derive(Debug, Default)]
pub struct EventArena {
    nodes: Vec<EventNode>,
}

impl EventArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a node with no edges and a zero minimum start cycle.
    pub fn alloc(&mut self, kind: EventKind, delay: u64) -> EventId {
        let id = EventId(self.nodes.len() as u32);
        self.nodes.push(EventNode {
            kind,
            delay,
            min_start_cycle: 0,
            children: Vec::new(),
        });
        id
    }

    /// Sets the explicit minimum start cycle of a node. Must happen before
    /// the node is scheduled, i.e. before resolution.
    pub fn set_min_start_cycle(&mut self, ev: EventId, cycle: u64) {
        self.nodes[ev.0 as usize].min_start_cycle = cycle;
    }

    /// Adds a causal edge `parent -> child` and returns `child` so calls can
    /// be chained the way graphs read: start, delay, end.
    pub fn add_child(&mut self, parent: EventId, child: EventId) -> EventId {
        self.nodes[parent.0 as usize].children.push(child);
        child
    }

    /// Borrows a node.
    pub fn node(&self, ev: EventId) -> &EventNode {
        &self.nodes[ev.0 as usize]
    }

    /// Iterates over all nodes in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (EventId, &EventNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (EventId(i as u32), n))
    }

    /// Number of nodes allocated.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no nodes have been allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Computes the realized schedule of every node.
    ///
    /// A node starts at the maximum of its minimum start cycle and all of
    /// its parents' end cycles, and ends `delay` cycles later. This is what
    /// the enclosing discrete-event scheduler would observe; tests use it to
    /// check causality.
    ///
    /// # Panics
    ///
    /// Panics if the graph contains a cycle, which would be a builder bug.
    pub fn resolve(&self) -> Vec<ResolvedEvent> {
        let n = self.nodes.len();
        let mut indegree = vec![0u32; n];
        for node in &self.nodes {
            for child in &node.children {
                indegree[child.0 as usize] += 1;
            }
        }
        let mut earliest: Vec<u64> = self.nodes.iter().map(|e| e.min_start_cycle).collect();
        let mut resolved = vec![ResolvedEvent { start: 0, end: 0 }; n];
        let mut queue: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut visited = 0usize;
        while let Some(i) = queue.pop() {
            visited += 1;
            let start = earliest[i];
            let end = start + self.nodes[i].delay;
            resolved[i] = ResolvedEvent { start, end };
            for child in &self.nodes[i].children {
                let c = child.0 as usize;
                earliest[c] = earliest[c].max(end);
                indegree[c] -= 1;
                if indegree[c] == 0 {
                    queue.push(c);
                }
            }
        }
        assert!(visited == n, "timing event graph contains a cycle");
        resolved
    }
}
