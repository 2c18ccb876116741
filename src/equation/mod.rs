pub mod latex;
pub mod lexer;
pub mod node;
pub mod omml;
pub mod parser;
pub mod symbols;

pub use node::{BigOpKind, EquationNode};

use serde::{Deserialize, Serialize};

use crate::equation::parser::Parser;

/// Everything downstream needs about one translated formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub tree: EquationNode,
    pub canonical_latex: String,
    pub omml: String,
    pub unsupported_fragments: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Translator {
    max_depth: usize,
}

impl Translator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Parses recognized LaTeX. Never fails; unmappable parts become `Unsupported`.
    pub fn parse(&self, latex: &str) -> EquationNode {
        Parser::new(latex, self.max_depth).parse()
    }

    pub fn translate(&self, latex: &str, display: bool) -> Translation {
        let tree = self.parse(latex);
        Translation::from_tree(tree, display)
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(32)
    }
}

impl Translation {
    pub fn from_tree(tree: EquationNode, display: bool) -> Self {
        Self {
            canonical_latex: latex::to_latex(&tree),
            omml: omml::to_omml(&tree, display),
            unsupported_fragments: tree.unsupported_count(),
            tree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn translates_fraction_scenario() {
        let t = Translator::default().translate(r"\frac{1}{2}", true);
        assert_eq!(
            t.tree,
            EquationNode::fraction(EquationNode::literal("1"), EquationNode::literal("2"))
        );
        assert_eq!(t.canonical_latex, r"\frac{1}{2}");
        assert_eq!(t.unsupported_fragments, 0);
    }

    /// Builds LaTeX from the supported construct set only.
    fn supported_latex() -> impl Strategy<Value = String> {
        let leaf = prop_oneof![
            "[a-z]",
            "[0-9]{1,3}",
            Just(r"\alpha".to_string()),
            Just(r"\infty".to_string()),
            Just(r"\cdot".to_string()),
            Just("+".to_string()),
            Just("=".to_string()),
            Just(r"\sin".to_string()),
        ];
        leaf.prop_recursive(5, 48, 4, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!(r"\frac{{{a}}}{{{b}}}")),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{{{a}}}^{{{b}}}")),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("x_{{{a}}}^{{{b}}}")),
                (inner.clone(), inner.clone(), inner.clone())
                    .prop_map(|(l, u, b)| format!(r"\sum_{{{l}}}^{{{u}}} {b}")),
                (inner.clone(), inner.clone()).prop_map(|(l, b)| format!(r"\int_{{{l}}} {b}")),
                (inner.clone(), inner.clone()).prop_map(|(u, b)| format!(r"\prod^{{{u}}} {b}")),
                prop::collection::vec(inner, 0..4).prop_map(|parts| format!("{{{}}}", parts.join(" "))),
            ]
        })
    }

    /// Long runs of sizers, wrappers and operators with unbalanced braces.
    fn command_soup() -> impl Strategy<Value = String> {
        let token = prop_oneof![
            Just(r"\left"),
            Just(r"\right"),
            Just(r"\big"),
            Just(r"\Bigl"),
            Just(r"\mathrm"),
            Just(r"\frac"),
            Just(r"\sum"),
            Just(r"\text"),
            Just(r"\left."),
            Just("{"),
            Just("}"),
            Just("x"),
            Just("^"),
            Just("_"),
            Just("("),
        ];
        prop::collection::vec(token, 0..400).prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn supported_trees_round_trip(src in supported_latex()) {
            let translator = Translator::default();
            let tree = translator.parse(&src);
            let again = translator.parse(&latex::to_latex(&tree));
            prop_assert_eq!(again, tree);
        }

        #[test]
        fn unbalanced_braces_never_panic(src in r"[{}a-c_^\\+ ]{0,40}") {
            let translator = Translator::new(8);
            let t = translator.translate(&src, false);
            prop_assert!(t.omml.starts_with("<m:oMath>"));
            prop_assert!(t.tree.depth() <= 64);
        }

        #[test]
        fn arbitrary_text_never_panics(src in ".{0,60}") {
            let _ = Translator::new(4).translate(&src, true);
        }

        #[test]
        fn command_soup_stays_within_depth(src in command_soup()) {
            let t = Translator::default().translate(&src, false);
            prop_assert!(t.omml.starts_with("<m:oMath>"));
            prop_assert!(t.tree.depth() <= 64);
        }
    }
}
