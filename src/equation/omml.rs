//! Office Math Markup (OMML) for an equation tree, the form word processors store
//! native equations in.

use quick_xml::escape::escape;

use crate::equation::node::{BigOpKind, EquationNode};

pub const UNSUPPORTED_OPEN: &str = "⟦LaTeX: ";
pub const UNSUPPORTED_CLOSE: &str = "⟧";

/// `<m:oMath>` for inline equations, wrapped in `<m:oMathPara>` for display ones.
pub fn to_omml(node: &EquationNode, display: bool) -> String {
    let mut out = String::new();
    if display {
        out.push_str("<m:oMathPara>");
    }
    out.push_str("<m:oMath>");
    write_node(node, &mut out);
    out.push_str("</m:oMath>");
    if display {
        out.push_str("</m:oMathPara>");
    }
    out
}

/// Visible stand-in for source the translator could not structure.
pub fn unsupported_marker(raw: &str) -> String {
    format!("{UNSUPPORTED_OPEN}{raw}{UNSUPPORTED_CLOSE}")
}

fn write_node(node: &EquationNode, out: &mut String) {
    match node {
        EquationNode::Literal { symbol } => {
            let upright = symbol.chars().count() > 1 && symbol.chars().all(|c| c.is_alphabetic());
            write_run(symbol, upright, out);
        }
        EquationNode::Fraction { num, den } => {
            out.push_str("<m:f><m:fPr><m:type m:val=\"bar\"/></m:fPr>");
            wrap("m:num", num, out);
            wrap("m:den", den, out);
            out.push_str("</m:f>");
        }
        EquationNode::SuperSub { base, sup, sub } => match (sub, sup) {
            (Some(sub), Some(sup)) => {
                out.push_str("<m:sSubSup>");
                wrap("m:e", base, out);
                wrap("m:sub", sub, out);
                wrap("m:sup", sup, out);
                out.push_str("</m:sSubSup>");
            }
            (Some(sub), None) => {
                out.push_str("<m:sSub>");
                wrap("m:e", base, out);
                wrap("m:sub", sub, out);
                out.push_str("</m:sSub>");
            }
            (None, Some(sup)) => {
                out.push_str("<m:sSup>");
                wrap("m:e", base, out);
                wrap("m:sup", sup, out);
                out.push_str("</m:sSup>");
            }
            (None, None) => write_node(base, out),
        },
        EquationNode::BigOperator {
            kind,
            lower,
            upper,
            body,
        } => {
            let lim_loc = match kind {
                BigOpKind::Int => "subSup",
                BigOpKind::Sum | BigOpKind::Prod => "undOvr",
            };
            out.push_str("<m:nary><m:naryPr>");
            out.push_str(&format!("<m:chr m:val=\"{}\"/>", kind.symbol()));
            out.push_str(&format!("<m:limLoc m:val=\"{lim_loc}\"/>"));
            if lower.is_none() {
                out.push_str("<m:subHide m:val=\"1\"/>");
            }
            if upper.is_none() {
                out.push_str("<m:supHide m:val=\"1\"/>");
            }
            out.push_str("</m:naryPr>");
            wrap_optional("m:sub", lower.as_deref(), out);
            wrap_optional("m:sup", upper.as_deref(), out);
            wrap("m:e", body, out);
            out.push_str("</m:nary>");
        }
        EquationNode::Group { children } => {
            for child in children {
                write_node(child, out);
            }
        }
        EquationNode::Unsupported { raw } => write_run(&unsupported_marker(raw), true, out),
    }
}

fn wrap(tag: &str, node: &EquationNode, out: &mut String) {
    out.push_str(&format!("<{tag}>"));
    write_node(node, out);
    out.push_str(&format!("</{tag}>"));
}

fn wrap_optional(tag: &str, node: Option<&EquationNode>, out: &mut String) {
    match node {
        Some(node) => wrap(tag, node, out),
        None => out.push_str(&format!("<{tag}/>")),
    }
}

fn write_run(text: &str, upright: bool, out: &mut String) {
    out.push_str("<m:r>");
    if upright {
        out.push_str("<m:rPr><m:sty m:val=\"p\"/></m:rPr>");
    }
    out.push_str("<m:t xml:space=\"preserve\">");
    out.push_str(&escape(text));
    out.push_str("</m:t></m:r>");
}
