//! Device model display formatting.
//!
//! Operators type models however they like ("iphone14promax",
//! "Samsung  galaxy s23 ultra"). This turns them into a consistent display
//! form. It is a heuristic, not a parser: unknown text passes through with
//! each lowercase token title-cased.

/// Ordered substring replacements applied to the lowercased input.
///
/// Longer keys come before the keys they contain ("airpods pro" before
/// "airpods" before "airpod", "promax" before "pro"). Replacements are padded
/// with spaces so glued input like "iphone14promax" splits into tokens; the
/// padding is collapsed afterwards. Replaced text carries uppercase letters,
/// so later (all-lowercase) keys never match inside it. A key only matches
/// where it ends a word (see [`ends_word`]), so "maximus" stays whole.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("airpods pro", " AirPods Pro "),
    ("airpodspro", " AirPods Pro "),
    ("airpod pro", " AirPods Pro "),
    ("airpod2", " AirPods 2 "),
    ("airpod3", " AirPods 3 "),
    ("airpod4", " AirPods 4 "),
    ("airpods", " AirPods "),
    ("airpod", " AirPods "),
    ("iphone14", " iPhone 14 "),
    ("iphone13", " iPhone 13 "),
    ("iphone12", " iPhone 12 "),
    ("iphone11", " iPhone 11 "),
    ("iphone xs max", " iPhone Xs Max "),
    ("iphone xs", " iPhone Xs "),
    ("iphone xr", " iPhone Xr "),
    ("iphone x", " iPhone X "),
    ("iphone8", " iPhone 8 "),
    ("iphone7", " iPhone 7 "),
    ("iphone6", " iPhone 6 "),
    ("iphone", " iPhone "),
    ("ipad", " iPad "),
    ("promax", " Pro Max "),
    ("pro max", " Pro Max "),
    ("pro", " Pro "),
    ("max", " Max "),
    ("plus", " Plus "),
    ("mini", " Mini "),
    ("ultra", " Ultra "),
    ("galaxy", " Galaxy "),
    ("samsung", " Samsung "),
    ("xiaomi", " Xiaomi "),
    ("redmi", " Redmi "),
    ("note", " Note "),
];

/// Tokens that collapse when accidentally repeated ("Pro Pro" → "Pro").
const COLLAPSIBLE: &[&str] = &["Pro", "Max"];

/// Normalize a free-text device model for display.
pub fn format_phone_model(raw: &str) -> String {
    let mut text = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();

    for (key, replacement) in REPLACEMENTS {
        if text.contains(key) {
            text = replace_words(&text, key, replacement);
        }
    }

    let mut tokens: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        let repeated = tokens.last().is_some_and(|prev| prev == token);
        if repeated && COLLAPSIBLE.contains(&token) {
            continue;
        }
        tokens.push(title_case(token));
    }

    tokens.join(" ")
}

fn replace_words(text: &str, key: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    let mut rest = text;
    while let Some(at) = rest.find(key) {
        let after = &rest[at + key.len()..];
        out.push_str(&rest[..at]);
        out.push_str(if ends_word(after) { replacement } else { key });
        rest = after;
    }
    out.push_str(rest);
    out
}

/// True when the text following a key is empty, starts with whitespace or a
/// digit, or starts another key ("pro" in "promax", "14" in "iphone14").
fn ends_word(after: &str) -> bool {
    match after.chars().next() {
        None => true,
        Some(c) if c.is_whitespace() || c.is_ascii_digit() => true,
        Some(_) => REPLACEMENTS.iter().any(|(key, _)| after.starts_with(key)),
    }
}

/// Uppercase the first letter of an all-lowercase token. Tokens that already
/// carry capitals ("iPhone", "AirPods") are left alone.
fn title_case(token: &str) -> String {
    if token.chars().any(|c| c.is_uppercase()) {
        return token.to_string();
    }
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
