identifier!(NodeId, usize);

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Processing capacity, in data-rate units.
    pub cap: f64,
}

impl Node {
    pub fn new_ingress(id: NodeId, cap: f64) -> Self {
        Self {
            id,
            kind: NodeKind::Ingress,
            cap,
        }
    }

    pub fn new_normal(id: NodeId, cap: f64) -> Self {
        Self {
            id,
            kind: NodeKind::Normal,
            cap,
        }
    }

    pub fn is_ingress(&self) -> bool {
        matches!(self.kind, NodeKind::Ingress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    Ingress,
    Normal,
}

/// A bidirectional link.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
    /// Data-rate capacity.
    pub cap: f64,
    /// Propagation delay.
    pub delay: f64,
}

impl Link {
    pub fn new(a: NodeId, b: NodeId, cap: f64, delay: f64) -> Self {
        Self { a, b, cap, delay }
    }
}

/// The directed half of a [`Link`] stored on graph edges.
#[derive(Debug, Clone, Copy, PartialEq, derive_new::new)]
pub(crate) struct Channel {
    pub(crate) delay: f64,
}
