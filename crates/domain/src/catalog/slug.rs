//! Slug derivation for catalog entities.

/// Derives a URL slug from a display name.
///
/// Lowercases ASCII letters, keeps ASCII digits, and collapses every run of
/// other characters into a single hyphen. Leading and trailing hyphens are
/// dropped. Returns `None` when nothing slug-worthy remains.
pub fn slugify(name: &str) -> Option<String> {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() { None } else { Some(slug) }
}
