use crate::{
    chain::{FunctionSpec, ServiceChain, ServiceFunctions},
    network::types::{Link, Node, NodeId},
};

pub(crate) fn four_node_config() -> (Vec<Node>, Vec<Link>) {
    // Nodes 0 and 1 are ingress nodes
    let nodes = vec![
        Node::new_ingress(NodeId::new(0), 10.0),
        Node::new_ingress(NodeId::new(1), 10.0),
        Node::new_normal(NodeId::new(2), 20.0),
        Node::new_normal(NodeId::new(3), 15.0),
    ];
    let l = |a, b, delay| Link::new(NodeId::new(a), NodeId::new(b), 100.0, delay);
    let links = vec![
        l(0, 1, 1.0),
        l(0, 2, 2.0),
        l(2, 3, 3.0),
        l(0, 3, 10.0),
        l(1, 3, 4.0),
    ];
    (nodes, links)
}

pub(crate) fn abc_chain() -> (ServiceChain, ServiceFunctions) {
    let chain = ServiceChain::new(
        "sfc_1".to_owned(),
        vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
    );
    let functions = [("a", 1.0), ("b", 2.0), ("c", 3.0)]
        .into_iter()
        .map(|(name, delay)| (name.to_owned(), FunctionSpec::with_mean(delay)))
        .collect();
    (chain, functions)
}
