//! Canonical LaTeX for an equation tree.
//!
//! The output re-parses to the same tree for everything the parser itself produces,
//! which is what the cross-reference artifact relies on when showing "recognized"
//! next to "as understood".

use crate::equation::lexer::is_number;
use crate::equation::node::EquationNode;
use crate::equation::omml::unsupported_marker;
use crate::equation::symbols;

pub fn to_latex(node: &EquationNode) -> String {
    LatexWriter::new(false).finish(node)
}

/// Like [`to_latex`], but each unsupported fragment is wrapped in the same
/// `⟦LaTeX: …⟧` marker the OMML output uses, so readers of the text outputs can
/// see which parts were not understood.
pub fn to_marked_latex(node: &EquationNode) -> String {
    LatexWriter::new(true).finish(node)
}

struct LatexWriter {
    out: String,
    mark_unsupported: bool,
}

impl LatexWriter {
    fn new(mark_unsupported: bool) -> Self {
        Self {
            out: String::new(),
            mark_unsupported,
        }
    }

    fn finish(mut self, node: &EquationNode) -> String {
        self.write_sequence(node);
        self.out
    }

    /// Top level and braced contents: a group's children without surrounding braces.
    fn write_sequence(&mut self, node: &EquationNode) {
        match node {
            EquationNode::Group { children } => {
                for (idx, child) in children.iter().enumerate() {
                    if idx > 0 {
                        self.out.push(' ');
                    }
                    self.write_item(child);
                }
            }
            other => self.write_item(other),
        }
    }

    fn write_item(&mut self, node: &EquationNode) {
        match node {
            EquationNode::Literal { symbol } => self.out.push_str(&literal_latex(symbol)),
            EquationNode::Fraction { num, den } => {
                self.out.push_str("\\frac");
                self.write_braced(num);
                self.write_braced(den);
            }
            EquationNode::SuperSub { base, sup, sub } => {
                self.write_base(base);
                if let Some(sub) = sub {
                    self.out.push('_');
                    self.write_braced(sub);
                }
                if let Some(sup) = sup {
                    self.out.push('^');
                    self.write_braced(sup);
                }
            }
            EquationNode::BigOperator {
                kind,
                lower,
                upper,
                body,
            } => {
                self.out.push_str(kind.command());
                if let Some(lower) = lower {
                    self.out.push('_');
                    self.write_braced(lower);
                }
                if let Some(upper) = upper {
                    self.out.push('^');
                    self.write_braced(upper);
                }
                self.out.push(' ');
                self.write_item(body);
            }
            EquationNode::Group { .. } => self.write_braced(node),
            EquationNode::Unsupported { raw } if self.mark_unsupported => {
                self.out.push_str(&unsupported_marker(raw))
            }
            EquationNode::Unsupported { raw } => self.out.push_str(raw),
        }
    }

    fn write_braced(&mut self, node: &EquationNode) {
        self.out.push('{');
        self.write_sequence(node);
        self.out.push('}');
    }

    /// Script bases that carry their own scripts or limits need braces to stay one atom.
    fn write_base(&mut self, node: &EquationNode) {
        match node {
            EquationNode::SuperSub { .. } | EquationNode::BigOperator { .. } => {
                self.out.push('{');
                self.write_item(node);
                self.out.push('}');
            }
            other => self.write_item(other),
        }
    }
}

fn literal_latex(symbol: &str) -> String {
    if let Some(command) = symbols::command_for_symbol(symbol) {
        return format!("\\{command}");
    }
    if symbols::is_function_name(symbol) {
        return format!("\\{symbol}");
    }
    let mut chars = symbol.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if symbols::needs_escape(c) {
            return format!("\\{c}");
        }
        if !c.is_whitespace() && !matches!(c, '\\' | '^' | '~' | '$') {
            return c.to_string();
        }
    }
    if is_number(symbol) {
        return symbol.to_string();
    }
    format!("\\text{{{symbol}}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation::node::BigOpKind;
    use crate::equation::parser::Parser;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> EquationNode {
        Parser::new(src, 32).parse()
    }

    #[test]
    fn writes_fraction_and_scripts() {
        let node = EquationNode::fraction(
            EquationNode::super_sub(
                EquationNode::literal("x"),
                Some(EquationNode::literal("2")),
                Some(EquationNode::literal("i")),
            ),
            EquationNode::literal("α"),
        );
        assert_eq!(to_latex(&node), r"\frac{x_{i}^{2}}{\alpha}");
    }

    #[test]
    fn writes_big_operator_with_body() {
        let node = EquationNode::big_operator(
            BigOpKind::Int,
            Some(EquationNode::literal("0")),
            Some(EquationNode::literal("∞")),
            EquationNode::literal("f"),
        );
        assert_eq!(to_latex(&node), r"\int_{0}^{\infty} f");
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(literal_latex("{"), r"\{");
        assert_eq!(literal_latex("%"), r"\%");
        assert_eq!(literal_latex("sin"), r"\sin");
        assert_eq!(literal_latex("if "), r"\text{if }");
        assert_eq!(literal_latex("3.14"), "3.14");
    }

    #[test]
    fn round_trips_actuarial_formulas() {
        for src in [
            r"\frac{1}{2}",
            r"q_{x+k}^{A}",
            r"\sum_{k=0}^{n-1} v^{k+1} {}_{k}p_{x} q_{x+k}",
            r"\ddot{a}_{x} = \sum_{k=0}^{\infty} v^{k}",
            r"A_{x:\overline{n}|}^{1}",
            r"\int_{0}^{\infty} e^{-\delta t} \mu_{x+t} dt",
            r"\prod_{i=1}^{n} (1+i_{t})",
            r"\left( \frac{a}{b} \right)^{2} \leq \alpha \cdot \beta",
            r"x^{2^{3}}",
            r"\text{if } x \neq 0",
            r"{a b}^{c}",
            r"\sum \sum x",
            r"1 2 \, 3",
        ] {
            let tree = parse(src);
            let again = parse(&to_latex(&tree));
            assert_eq!(again, tree, "source: {src}");
        }
    }

    #[test]
    fn marked_output_flags_unsupported_fragments() {
        let node = parse(r"a + \sqrt{b}");
        assert_eq!(to_latex(&node), r"a + \sqrt{b}");
        assert_eq!(to_marked_latex(&node), r"a + ⟦LaTeX: \sqrt{b}⟧");
        assert_eq!(to_marked_latex(&parse(r"\frac{1}{2}")), r"\frac{1}{2}");
    }
}
