/// Canonical lookup form of a name: invisible characters stripped,
/// whitespace collapsed, lowercased.
pub(crate) fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// Stored display form of a name: normalized, then each word title-cased
/// ("juan perez" becomes "Juan Perez").
pub(crate) fn display_name(value: &str) -> String {
    normalize_name(value)
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of interpreting a raw instructor field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NameParse {
    Single(String),
    Paired { first: String, second: String },
}

fn is_pairing_word(word: &str, token: &str) -> bool {
    word == token || word == format!("{token}.")
}

/// Splits a raw instructor field on the reserved pairing token when it joins
/// two non-empty names ("ana vs maria"). Anything else is a single name.
pub(crate) fn parse_instructor_field(raw: &str, token: &str) -> NameParse {
    let normalized = normalize_name(raw);
    let token = token.to_lowercase();
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();

    if let Some(position) = words.iter().position(|word| is_pairing_word(word, &token)) {
        let first = words[..position].join(" ");
        let second = words[position + 1..].join(" ");
        if !first.is_empty() && !second.is_empty() {
            return NameParse::Paired {
                first: display_name(&first),
                second: display_name(&second),
            };
        }
    }

    NameParse::Single(display_name(&normalized))
}

/// True when the name carries the reserved pairing token as a standalone
/// word, which disqualifies it as a single instructor identity.
pub(crate) fn contains_pairing_token(raw: &str, token: &str) -> bool {
    let normalized = normalize_name(raw);
    let token = token.to_lowercase();
    normalized
        .split(' ')
        .any(|word| is_pairing_word(word, &token))
}
