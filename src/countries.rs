//! Country metadata: ISO 3166-1 alpha-2 code to display name and emoji flag.

/// English short names for the storefronts the monitor is likely to see.
/// Codes missing here still get a flag and their uppercase code as the name.
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("AE", "United Arab Emirates"),
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CL", "Chile"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("CZ", "Czechia"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("EG", "Egypt"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("GR", "Greece"),
    ("HK", "Hong Kong"),
    ("ID", "Indonesia"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("KZ", "Kazakhstan"),
    ("MX", "Mexico"),
    ("MY", "Malaysia"),
    ("NG", "Nigeria"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PE", "Peru"),
    ("PH", "Philippines"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("RU", "Russia"),
    ("SA", "Saudi Arabia"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("TH", "Thailand"),
    ("TR", "Turkey"),
    ("TW", "Taiwan"),
    ("UA", "Ukraine"),
    ("US", "United States"),
    ("VN", "Vietnam"),
    ("ZA", "South Africa"),
];

/// Returns the emoji flag for a two-letter country code, built from
/// regional-indicator code points. Empty string for non-alphabetic input.
pub fn country_flag(code: &str) -> String {
    let code = code.trim().to_uppercase();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return String::new();
    }

    code.chars()
        .filter_map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}

/// Returns `"{flag} {Name}"` for a country code, falling back to the
/// uppercase code when the name is unknown.
pub fn country_name(code: &str) -> String {
    let upper = code.trim().to_uppercase();
    let flag = country_flag(&upper);

    let name = COUNTRY_NAMES
        .iter()
        .find(|(c, _)| *c == upper)
        .map(|(_, n)| (*n).to_string())
        .unwrap_or_else(|| upper.clone());

    if flag.is_empty() {
        name
    } else {
        format!("{} {}", flag, name)
    }
}

/// Returns true if the code is a syntactically valid two-letter country code.
pub fn is_valid_code(code: &str) -> bool {
    let code = code.trim();
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}
