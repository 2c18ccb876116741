use crate::core::model::RegionKind;

const TEXT_LABELS: &[&str] = &[
    "text",
    "title",
    "list",
    "header",
    "footer",
    "caption",
    "plain_text",
];

const IMAGE_LABELS: &[&str] = &["image", "figure", "table", "table_body"];

const DISPLAY_FORMULA_LABELS: &[&str] =
    &["equation", "interline_equation", "isolate_formula", "formula"];

const INLINE_FORMULA_LABELS: &[&str] = &["inline_equation"];

/// Maps a detector label to a region kind and, for formulas, whether the
/// formula stands on its own line.
pub fn classify(label: Option<&str>, has_text: bool) -> (RegionKind, bool) {
    let label = label.map(|l| l.trim().to_ascii_lowercase());
    let label = label.as_deref().unwrap_or("");

    if DISPLAY_FORMULA_LABELS.contains(&label) {
        (RegionKind::Formula, true)
    } else if INLINE_FORMULA_LABELS.contains(&label) {
        (RegionKind::Formula, false)
    } else if TEXT_LABELS.contains(&label) {
        (RegionKind::Text, false)
    } else if IMAGE_LABELS.contains(&label) {
        (RegionKind::Image, false)
    } else if has_text {
        (RegionKind::Text, false)
    } else {
        (RegionKind::Image, false)
    }
}
