/// LaTeX command to Unicode symbol. When several commands share a symbol the first
/// one listed is the spelling used when writing LaTeX back out.
const SYMBOL_MAP: &[(&str, &str)] = &[
    // Greek lowercase
    ("alpha", "α"),
    ("beta", "β"),
    ("gamma", "γ"),
    ("delta", "δ"),
    ("epsilon", "ϵ"),
    ("varepsilon", "ε"),
    ("zeta", "ζ"),
    ("eta", "η"),
    ("theta", "θ"),
    ("vartheta", "ϑ"),
    ("iota", "ι"),
    ("kappa", "κ"),
    ("lambda", "λ"),
    ("mu", "μ"),
    ("nu", "ν"),
    ("xi", "ξ"),
    ("pi", "π"),
    ("varpi", "ϖ"),
    ("rho", "ρ"),
    ("varrho", "ϱ"),
    ("sigma", "σ"),
    ("varsigma", "ς"),
    ("tau", "τ"),
    ("upsilon", "υ"),
    ("phi", "ϕ"),
    ("varphi", "φ"),
    ("chi", "χ"),
    ("psi", "ψ"),
    ("omega", "ω"),
    // Greek uppercase
    ("Gamma", "Γ"),
    ("Delta", "Δ"),
    ("Theta", "Θ"),
    ("Lambda", "Λ"),
    ("Xi", "Ξ"),
    ("Pi", "Π"),
    ("Sigma", "Σ"),
    ("Upsilon", "Υ"),
    ("Phi", "Φ"),
    ("Psi", "Ψ"),
    ("Omega", "Ω"),
    // Binary operators
    ("cdot", "·"),
    ("times", "×"),
    ("div", "÷"),
    ("pm", "±"),
    ("mp", "∓"),
    ("ast", "∗"),
    ("star", "⋆"),
    ("circ", "∘"),
    ("bullet", "∙"),
    ("cap", "∩"),
    ("cup", "∪"),
    ("setminus", "∖"),
    ("oplus", "⊕"),
    ("otimes", "⊗"),
    ("wedge", "∧"),
    ("land", "∧"),
    ("vee", "∨"),
    ("lor", "∨"),
    // Relations
    ("leq", "≤"),
    ("le", "≤"),
    ("geq", "≥"),
    ("ge", "≥"),
    ("neq", "≠"),
    ("ne", "≠"),
    ("approx", "≈"),
    ("equiv", "≡"),
    ("sim", "∼"),
    ("simeq", "≃"),
    ("cong", "≅"),
    ("propto", "∝"),
    ("ll", "≪"),
    ("gg", "≫"),
    ("in", "∈"),
    ("notin", "∉"),
    ("ni", "∋"),
    ("subset", "⊂"),
    ("subseteq", "⊆"),
    ("supset", "⊃"),
    ("supseteq", "⊇"),
    ("perp", "⊥"),
    ("parallel", "∥"),
    ("mid", "∣"),
    // Arrows
    ("rightarrow", "→"),
    ("to", "→"),
    ("leftarrow", "←"),
    ("gets", "←"),
    ("leftrightarrow", "↔"),
    ("Rightarrow", "⇒"),
    ("implies", "⇒"),
    ("Leftarrow", "⇐"),
    ("Leftrightarrow", "⇔"),
    ("iff", "⇔"),
    ("mapsto", "↦"),
    ("uparrow", "↑"),
    ("downarrow", "↓"),
    // Miscellaneous
    ("infty", "∞"),
    ("partial", "∂"),
    ("nabla", "∇"),
    ("forall", "∀"),
    ("exists", "∃"),
    ("neg", "¬"),
    ("lnot", "¬"),
    ("emptyset", "∅"),
    ("varnothing", "∅"),
    ("angle", "∠"),
    ("triangle", "△"),
    ("prime", "′"),
    ("hbar", "ℏ"),
    ("ell", "ℓ"),
    ("Re", "ℜ"),
    ("Im", "ℑ"),
    ("aleph", "ℵ"),
    ("ldots", "…"),
    ("dots", "…"),
    ("cdots", "⋯"),
    ("vdots", "⋮"),
    ("ddots", "⋱"),
    ("therefore", "∴"),
    ("because", "∵"),
    ("degree", "°"),
    ("langle", "⟨"),
    ("rangle", "⟩"),
    ("lfloor", "⌊"),
    ("rfloor", "⌋"),
    ("lceil", "⌈"),
    ("rceil", "⌉"),
    ("vert", "|"),
    ("Vert", "‖"),
    ("lvert", "|"),
    ("rvert", "|"),
];

/// Upright function names written as `\name`.
const FUNCTION_NAMES: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "arcsin", "arccos", "arctan", "sinh", "cosh",
    "tanh", "coth", "log", "ln", "lg", "exp", "lim", "limsup", "liminf", "max", "min", "sup",
    "inf", "det", "dim", "ker", "deg", "arg", "gcd", "Pr", "mod",
];

/// Commands that only affect spacing or style and carry no content.
const DROPPED_COMMANDS: &[&str] = &[
    ",", ";", ":", "!", " ", "quad", "qquad", "displaystyle", "textstyle", "scriptstyle",
    "scriptscriptstyle", "limits", "nolimits", "nonumber", "notag", "rm", "bf", "it", "cal",
    "normalsize", "small", "large", "Large", "tiny", "scriptsize", "boldmath", "hfill",
    "enspace", "thinspace",
];

/// Font wrappers whose single argument is kept and whose styling is dropped.
const STYLE_WRAPPERS: &[&str] = &[
    "mathrm", "mathbf", "mathit", "mathsf", "mathtt", "mathcal", "mathbb", "mathfrak",
    "mathscr", "boldsymbol", "bm", "operatorname", "mathnormal", "pmb",
];

/// Wrappers whose argument is literal text rather than math.
const TEXT_WRAPPERS: &[&str] = &["text", "textrm", "textit", "textbf", "mbox", "textnormal"];

/// Delimiter sizing commands; the delimiter that follows is kept.
const DELIMITER_SIZERS: &[&str] = &[
    "left", "right", "middle", "big", "Big", "bigg", "Bigg", "bigl", "bigr", "Bigl", "Bigr",
    "biggl", "biggr", "Biggl", "Biggr",
];

/// Control symbols that stand for the escaped character itself.
const ESCAPED_CHARS: &[char] = &['{', '}', '%', '#', '$', '&', '_'];

pub fn lookup_symbol(command: &str) -> Option<&'static str> {
    SYMBOL_MAP
        .iter()
        .find(|&&(name, _)| name == command)
        .map(|&(_, symbol)| symbol)
}

/// Canonical command for a symbol, if the symbol came from one.
pub fn command_for_symbol(symbol: &str) -> Option<&'static str> {
    SYMBOL_MAP
        .iter()
        .find(|&&(_, sym)| sym == symbol)
        .map(|&(name, _)| name)
}

pub fn is_function_name(name: &str) -> bool {
    FUNCTION_NAMES.contains(&name)
}

pub fn is_dropped(name: &str) -> bool {
    DROPPED_COMMANDS.contains(&name)
}

pub fn is_style_wrapper(name: &str) -> bool {
    STYLE_WRAPPERS.contains(&name)
}

pub fn is_text_wrapper(name: &str) -> bool {
    TEXT_WRAPPERS.contains(&name)
}

pub fn is_delimiter_sizer(name: &str) -> bool {
    DELIMITER_SIZERS.contains(&name)
}

pub fn escaped_char(name: &str) -> Option<char> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if ESCAPED_CHARS.contains(&c) => Some(c),
        _ => None,
    }
}

/// Characters that must be written as a control symbol to survive re-parsing.
pub fn needs_escape(c: char) -> bool {
    ESCAPED_CHARS.contains(&c)
}
