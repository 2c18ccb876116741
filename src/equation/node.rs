use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BigOpKind {
    Sum,
    Int,
    Prod,
}

impl BigOpKind {
    pub fn from_command(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(BigOpKind::Sum),
            "int" => Some(BigOpKind::Int),
            "prod" => Some(BigOpKind::Prod),
            _ => None,
        }
    }

    pub fn command(self) -> &'static str {
        match self {
            BigOpKind::Sum => "\\sum",
            BigOpKind::Int => "\\int",
            BigOpKind::Prod => "\\prod",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BigOpKind::Sum => "∑",
            BigOpKind::Int => "∫",
            BigOpKind::Prod => "∏",
        }
    }
}

/// Structural form of a formula, independent of any output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum EquationNode {
    Literal {
        symbol: String,
    },
    Fraction {
        num: Box<EquationNode>,
        den: Box<EquationNode>,
    },
    SuperSub {
        base: Box<EquationNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sup: Option<Box<EquationNode>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sub: Option<Box<EquationNode>>,
    },
    BigOperator {
        kind: BigOpKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lower: Option<Box<EquationNode>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upper: Option<Box<EquationNode>>,
        body: Box<EquationNode>,
    },
    Group {
        children: Vec<EquationNode>,
    },
    /// Source the translator could not map, kept verbatim.
    Unsupported {
        raw: String,
    },
}

impl EquationNode {
    pub fn literal(symbol: impl Into<String>) -> Self {
        EquationNode::Literal {
            symbol: symbol.into(),
        }
    }

    pub fn fraction(num: EquationNode, den: EquationNode) -> Self {
        EquationNode::Fraction {
            num: Box::new(num),
            den: Box::new(den),
        }
    }

    pub fn super_sub(base: EquationNode, sup: Option<EquationNode>, sub: Option<EquationNode>) -> Self {
        EquationNode::SuperSub {
            base: Box::new(base),
            sup: sup.map(Box::new),
            sub: sub.map(Box::new),
        }
    }

    pub fn big_operator(
        kind: BigOpKind,
        lower: Option<EquationNode>,
        upper: Option<EquationNode>,
        body: EquationNode,
    ) -> Self {
        EquationNode::BigOperator {
            kind,
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            body: Box::new(body),
        }
    }

    pub fn group(children: Vec<EquationNode>) -> Self {
        EquationNode::Group { children }
    }

    pub fn empty() -> Self {
        EquationNode::Group {
            children: Vec::new(),
        }
    }

    pub fn unsupported(raw: impl Into<String>) -> Self {
        EquationNode::Unsupported { raw: raw.into() }
    }

    /// Collapses a parsed sequence: one element stands for itself.
    pub fn from_sequence(mut children: Vec<EquationNode>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            EquationNode::Group { children }
        }
    }

    pub fn is_empty_group(&self) -> bool {
        matches!(self, EquationNode::Group { children } if children.is_empty())
    }

    /// Number of `Unsupported` leaves anywhere in the tree.
    pub fn unsupported_count(&self) -> usize {
        match self {
            EquationNode::Literal { .. } => 0,
            EquationNode::Unsupported { .. } => 1,
            EquationNode::Fraction { num, den } => num.unsupported_count() + den.unsupported_count(),
            EquationNode::SuperSub { base, sup, sub } => {
                base.unsupported_count()
                    + sup.as_ref().map_or(0, |n| n.unsupported_count())
                    + sub.as_ref().map_or(0, |n| n.unsupported_count())
            }
            EquationNode::BigOperator {
                lower, upper, body, ..
            } => {
                lower.as_ref().map_or(0, |n| n.unsupported_count())
                    + upper.as_ref().map_or(0, |n| n.unsupported_count())
                    + body.unsupported_count()
            }
            EquationNode::Group { children } => children.iter().map(|c| c.unsupported_count()).sum(),
        }
    }

    pub fn depth(&self) -> usize {
        let child_depth = match self {
            EquationNode::Literal { .. } | EquationNode::Unsupported { .. } => 0,
            EquationNode::Fraction { num, den } => num.depth().max(den.depth()),
            EquationNode::SuperSub { base, sup, sub } => base
                .depth()
                .max(sup.as_ref().map_or(0, |n| n.depth()))
                .max(sub.as_ref().map_or(0, |n| n.depth())),
            EquationNode::BigOperator {
                lower, upper, body, ..
            } => body
                .depth()
                .max(lower.as_ref().map_or(0, |n| n.depth()))
                .max(upper.as_ref().map_or(0, |n| n.depth())),
            EquationNode::Group { children } => children.iter().map(|c| c.depth()).max().unwrap_or(0),
        };
        child_depth + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_element_sequence_collapses() {
        let node = EquationNode::from_sequence(vec![EquationNode::literal("x")]);
        assert_eq!(node, EquationNode::literal("x"));
        assert!(EquationNode::from_sequence(vec![]).is_empty_group());
    }

    #[test]
    fn counts_unsupported_leaves() {
        let node = EquationNode::fraction(
            EquationNode::unsupported("\\sqrt{2}"),
            EquationNode::group(vec![EquationNode::literal("x"), EquationNode::unsupported("&")]),
        );
        assert_eq!(node.unsupported_count(), 2);
    }

    #[test]
    fn serializes_with_node_tag() {
        let json = serde_json::to_value(EquationNode::literal("α")).unwrap();
        assert_eq!(json["node"], "literal");
        assert_eq!(json["symbol"], "α");
    }
}
