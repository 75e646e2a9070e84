/// Turns a question title into a URL slug.
///
/// Lower-cases and trims the input, replaces whitespace runs with a single
/// dash, drops anything that is not an ASCII word character or dash, and collapses
/// repeated dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut in_whitespace = false;

    for ch in text.trim().to_lowercase().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            slug.push(ch);
        }
    }

    let mut collapsed = String::with_capacity(slug.len());
    for ch in slug.chars() {
        if ch == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed
}
