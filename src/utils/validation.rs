//! Centralized validation and helper functions.

/// Maximum number of catalog rows accepted from a single file
pub const MAX_CATALOG_ROWS: usize = 100_000;

/// Check whether a string is a dbSNP reference SNP identifier (`rs` followed by digits).
///
/// # Examples
///
/// ```
/// use snp_resolver::utils::validation::is_valid_rsid;
///
/// assert!(is_valid_rsid("rs4680"));
/// assert!(!is_valid_rsid("rs"));
/// assert!(!is_valid_rsid("i3003137"));
/// assert!(!is_valid_rsid("rs12a"));
/// ```
#[must_use]
pub fn is_valid_rsid(s: &str) -> bool {
    parse_rsid_number(s).is_some()
}

/// Numeric part of an rsID (`rs4680` → 4680). The prefix is case-insensitive.
#[must_use]
pub fn parse_rsid_number(s: &str) -> Option<u64> {
    let digits = s
        .strip_prefix("rs")
        .or_else(|| s.strip_prefix("RS"))
        .or_else(|| s.strip_prefix("Rs"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Canonical contig key used for coordinate matching.
///
/// Strips a `chr` prefix (any case) and maps `MT` to `M`, so `chr22`, `22`
/// and `CHR22` compare equal. Borrows from the input; never allocates.
#[must_use]
pub fn canonical_contig(name: &str) -> &str {
    let stripped = match name.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &name[3..],
        _ => name,
    };
    if stripped == "MT" {
        "M"
    } else {
        stripped
    }
}

/// Compute a stable fingerprint over a set of strings.
///
/// The items are sorted, joined with commas and hashed with MD5, so the
/// result is independent of input order.
#[must_use]
pub fn compute_fingerprint<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = items.into_iter().map(|s| s.as_ref().to_string()).collect();
    if sorted.is_empty() {
        return String::new();
    }
    sorted.sort_unstable();
    let concatenated = sorted.join(",");
    let digest = md5::compute(concatenated.as_bytes());
    format!("{digest:x}")
}

/// Check if adding another catalog row would exceed the maximum allowed.
///
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_row_limit(count: usize) -> Option<String> {
    if count >= MAX_CATALOG_ROWS {
        Some(format!(
            "Too many catalog rows: adding another would exceed maximum of {MAX_CATALOG_ROWS}"
        ))
    } else {
        None
    }
}
