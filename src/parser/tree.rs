use crowbook_text_processing::escape;
use log::debug;
use serde::Serialize;

use super::driver::ParseOutcome;
use crate::error::TreeError;
use crate::grammar::grammar::RuleId;
use crate::lexer::Token;
use crate::Grammar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub symbol: String,
    /// Token text for terminal leaves, the symbol name otherwise.
    pub value: String,
    pub is_epsilon: bool,
    pub is_terminal: bool,
    children: Vec<NodeId>,
}

impl Node {
    fn new(symbol: &str, is_terminal: bool) -> Self {
        Self {
            symbol: symbol.to_string(),
            value: symbol.to_string(),
            is_epsilon: !is_terminal,
            is_terminal,
            children: Vec::new(),
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A syntax tree stored in an arena. Nodes detached by the simplification
/// passes stay in the arena but are no longer reachable from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    /// Replays a derivation history top-down from the start symbol.
    ///
    /// A node on the construction stack whose symbol is not the parent of the
    /// next rule was abandoned by the parser during recovery; it is skipped
    /// and stays childless.
    pub fn build(grammar: &Grammar, history: &[RuleId]) -> Result<Self, TreeError> {
        let mut tree = SyntaxTree {
            nodes: vec![Node::new(grammar.start_symbol(), false)],
            root: NodeId(0),
        };
        let mut stack: Vec<NodeId> = vec![tree.root];

        for (step, &id) in history.iter().enumerate() {
            let (parent, rule) = match (grammar.rule_parent(id), grammar.rule(id)) {
                (Some(parent), Some(rule)) => (parent, rule),
                _ => return Err(TreeError::UnknownRule { step }),
            };

            let node = loop {
                let node = stack.pop().ok_or(TreeError::HistoryMismatch { step })?;
                if tree.node(node).symbol == parent {
                    break node;
                }
                debug!("step {}: {} left unexpanded", step, tree.node(node).symbol);
            };

            let children: Vec<NodeId> = rule
                .entities()
                .iter()
                .map(|entity| tree.push(Node::new(entity, grammar.is_terminal(entity))))
                .collect();
            stack.extend(
                children
                    .iter()
                    .rev()
                    .filter(|&&child| grammar.is_non_terminal(&tree.node(child).symbol)),
            );
            tree.nodes[node.0].children = children;
        }

        Ok(tree)
    }

    /// Builds the tree for a finished run and applies every simplification:
    /// epsilon pruning, single-child collapsing and value binding. Only the
    /// tokens the run matched are bound, so tokens skipped during recovery
    /// never shift the leaf values.
    pub fn from_outcome(
        grammar: &Grammar,
        outcome: &ParseOutcome,
        tokens: &[Token],
    ) -> Result<Self, TreeError> {
        let mut tree = Self::build(grammar, &outcome.history)?;
        tree.prune_epsilon();
        tree.collapse_single_children();
        let matched: Vec<Token> = outcome
            .matched
            .iter()
            .filter_map(|&i| tokens.get(i).cloned())
            .collect();
        tree.bind_values(&matched);
        Ok(tree)
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Pre-order traversal of the reachable nodes with their depth.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![(0, self.root)],
        }
    }

    /// Terminal leaves, left to right.
    pub fn leaves(&self) -> Vec<&Node> {
        self.iter()
            .map(|(_, node)| node)
            .filter(|node| node.is_terminal)
            .collect()
    }

    /// Marks every node whose children are all epsilon (terminal leaves never
    /// are) and detaches the marked nodes. The root is never detached.
    pub fn prune_epsilon(&mut self) {
        self.mark_epsilon(self.root);
        self.remove_epsilon(self.root);
    }

    fn mark_epsilon(&mut self, id: NodeId) -> bool {
        if self.nodes[id.0].is_terminal {
            self.nodes[id.0].is_epsilon = false;
            return false;
        }
        let mut is_epsilon = true;
        for child in self.nodes[id.0].children.clone() {
            if !self.mark_epsilon(child) {
                is_epsilon = false;
            }
        }
        self.nodes[id.0].is_epsilon = is_epsilon;
        is_epsilon
    }

    fn remove_epsilon(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        let kept: Vec<NodeId> = children
            .into_iter()
            .filter(|&child| !self.nodes[child.0].is_epsilon)
            .collect();
        for &child in &kept {
            self.remove_epsilon(child);
        }
        self.nodes[id.0].children = kept;
    }

    /// Replaces every non-root node that has exactly one child by that child.
    pub fn collapse_single_children(&mut self) {
        let children = std::mem::take(&mut self.nodes[self.root.0].children);
        let collapsed: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.collapse(child))
            .collect();
        self.nodes[self.root.0].children = collapsed;
    }

    fn collapse(&mut self, id: NodeId) -> NodeId {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        let collapsed: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.collapse(child))
            .collect();
        let replacement = match collapsed.as_slice() {
            [only] => *only,
            _ => id,
        };
        self.nodes[id.0].children = collapsed;
        replacement
    }

    /// Terminal leaves take the token values in order; leaves past the end
    /// of `tokens` keep their symbol name.
    pub fn bind_values(&mut self, tokens: &[Token]) {
        let order: Vec<NodeId> = self.iter_ids();
        let mut tokens = tokens.iter();
        for id in order {
            let node = &mut self.nodes[id.0];
            node.value = if node.is_terminal {
                match tokens.next() {
                    Some(token) => token.value.clone(),
                    None => node.symbol.clone(),
                }
            } else {
                node.symbol.clone()
            };
        }
    }

    fn iter_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            ids.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev());
        }
        ids
    }

    /// `[S ( [S ( )] )]`
    pub fn to_bracketed(&self) -> String {
        let mut output = String::new();
        self.write_bracketed(self.root, &mut output);
        output
    }

    fn write_bracketed(&self, id: NodeId, output: &mut String) {
        let node = self.node(id);
        if node.children.is_empty() {
            output.push_str(&node.value);
            return;
        }
        output.push('[');
        output.push_str(&node.value);
        for &child in &node.children {
            output.push(' ');
            self.write_bracketed(child, output);
        }
        output.push(']');
    }

    pub fn to_indented(&self) -> String {
        let mut lines = vec![self.node(self.root).value.clone()];
        self.write_indented(self.root, "", &mut lines);
        lines.join("\n")
    }

    fn write_indented(&self, id: NodeId, prefix: &str, lines: &mut Vec<String>) {
        let children = &self.node(id).children;
        for (i, &child) in children.iter().enumerate() {
            let last = i + 1 == children.len();
            lines.push(format!(
                "{}{}{}",
                prefix,
                if last { "└── " } else { "├── " },
                self.node(child).value
            ));
            let prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            self.write_indented(child, &prefix, lines);
        }
    }

    /// `qtree` syntax.
    pub fn to_latex(&self) -> String {
        let mut output = String::from("\\Tree ");
        self.write_latex(self.root, &mut output);
        output
    }

    fn write_latex(&self, id: NodeId, output: &mut String) {
        let node = self.node(id);
        let label = format!("{{{}}}", escape::tex(&node.value));
        if node.children.is_empty() {
            output.push_str(&label);
            return;
        }
        output.push_str("[.");
        output.push_str(&label);
        for &child in &node.children {
            output.push(' ');
            self.write_latex(child, output);
        }
        output.push_str(" ]");
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_output(self.root))
    }

    pub fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.to_output(self.root))
    }

    fn to_output(&self, id: NodeId) -> NodeOutput<'_> {
        let node = self.node(id);
        NodeOutput {
            symbol: &node.symbol,
            value: &node.value,
            children: node.children.iter().map(|&c| self.to_output(c)).collect(),
        }
    }
}

#[derive(Serialize)]
struct NodeOutput<'a> {
    symbol: &'a str,
    value: &'a str,
    children: Vec<NodeOutput<'a>>,
}

pub struct DepthFirst<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<(usize, NodeId)>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, id) = self.stack.pop()?;
        let node = self.tree.node(id);
        self.stack
            .extend(node.children.iter().rev().map(|&child| (depth + 1, child)));
        Some((depth, node))
    }
}
