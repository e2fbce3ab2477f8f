//! Label helpers.

/// Return `name` if unused, otherwise the first free `"{name} {n}"` with
/// `n` counting up from 2.
pub fn derive_unique_name<S: AsRef<str>>(name: &str, used: &[S]) -> String {
    let taken = |candidate: &str| used.iter().any(|u| u.as_ref() == candidate);
    if !taken(name) {
        return name.to_string();
    }
    (2usize..)
        .map(|n| format!("{name} {n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Turn an identifier (`camelCase`, `snake_case`, `kebab-case`) into a
/// capitalized label: `"inputText"` becomes `"Input Text"`.
pub fn capital_case(identifier: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in identifier.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_name_appends_counter() {
        assert_eq!(derive_unique_name("Control", &[] as &[&str]), "Control");
        assert_eq!(derive_unique_name("Control", &["Control"]), "Control 2");
        assert_eq!(
            derive_unique_name("Control", &["Control", "Control 2", "Control 3"]),
            "Control 4"
        );
        assert_eq!(derive_unique_name("Key", &["Control", "Key 2"]), "Key");
    }

    #[test]
    fn capital_case_splits_identifiers() {
        assert_eq!(capital_case("inputText"), "Input Text");
        assert_eq!(capital_case("output_bytes"), "Output Bytes");
        assert_eq!(capital_case("shift-key"), "Shift Key");
        assert_eq!(capital_case("key"), "Key");
        assert_eq!(capital_case(""), "");
    }
}
