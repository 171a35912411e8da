//! Product and label file naming.
//!
//! Output names derive from input names by case-preserving token
//! substitution (`psv`→`rad`→`ref`) with raw `.txt` extensions normalized to
//! `.tab`. An output directory, when given, redirects the same file name.
//! Substitution operates on the file name only, never on parent directories.

use std::path::{Path, PathBuf};

/// RAD product name for a PSV input: `psv`→`rad`, `PSV`→`RAD`, and
/// `.txt`/`.TXT` normalized to `.tab`.
pub fn rad_product_name(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let name = file_name(input)
        .replace("psv", "rad")
        .replace("PSV", "RAD")
        .replace(".TXT", ".tab")
        .replace(".txt", ".tab");
    redirect(input, &name, out_dir)
}

/// REF product name for a RAD product: `RAD`→`REF`, `rad`→`ref`.
pub fn ref_product_name(rad_file: &Path, out_dir: Option<&Path>) -> PathBuf {
    let name = file_name(rad_file).replace("RAD", "REF").replace("rad", "ref");
    redirect(rad_file, &name, out_dir)
}

/// Whether a file name qualifies for radiance calibration: contains `psv`
/// (any case) and carries a `.tab` or `.txt` extension (any case).
pub fn is_radiance_candidate(path: &Path) -> bool {
    let lower = file_name(path).to_lowercase();
    lower.contains("psv") && (lower.ends_with(".tab") || lower.ends_with(".txt"))
}

/// Whether a file name qualifies for reflectance calibration: a PSV record
/// or an already-calibrated RAD product.
pub fn is_reflectance_candidate(path: &Path) -> bool {
    let lower = file_name(path).to_lowercase();
    (lower.contains("psv") || lower.contains("rad"))
        && (lower.ends_with(".tab") || lower.ends_with(".txt"))
}

/// Whether an existing file name is a usable RAD product.
pub fn is_rad_product(path: &Path) -> bool {
    let lower = file_name(path).to_lowercase();
    lower.contains("rad") && lower.ends_with(".tab")
}

/// Sibling artifacts (labels and logs) that are never logged as declines.
pub fn is_sibling_artifact(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("lbl") | Some("xml") | Some("log")
    )
}

/// The companion label expected beside an input: extension swapped to `.lbl`.
pub fn original_label_name(input: &Path) -> PathBuf {
    let name = file_name(input)
        .replace(".tab", ".lbl")
        .replace(".txt", ".lbl")
        .replace(".TAB", ".lbl")
        .replace(".TXT", ".lbl");
    input.with_file_name(name)
}

/// The PSV label corresponding to a reflectance-stage input, which may carry
/// RAD tokens: the extension swaps to `.lbl` and `rad` tokens revert to
/// `psv`.
pub fn psv_label_name(input: &Path) -> PathBuf {
    let name = file_name(&original_label_name(input))
        .replace("rad", "psv")
        .replace("RAD", "PSV");
    input.with_file_name(name)
}

/// Name of the regenerated label beside a written product: `PSV` tokens in
/// the original label name become the product tokens and `.lbl` becomes
/// `.xml`.
pub fn derived_label_name(
    original_label: &Path,
    product: &Path,
    upper_token: &str,
    lower_token: &str,
) -> PathBuf {
    let name = file_name(original_label)
        .replace("PSV", upper_token)
        .replace("psv", lower_token)
        .replace("lbl", "xml");
    let dir = product.parent().unwrap_or_else(|| Path::new("."));
    dir.join(name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn redirect(input: &Path, name: &str, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}
