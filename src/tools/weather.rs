/// Value returned for any city missing from the tables.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Weather,
    Humidity,
}

/// Mock sensor lookup. Matching ignores case; unknown cities are not an error.
pub fn lookup(kind: LookupKind, location: &str) -> &'static str {
    match kind {
        LookupKind::Weather => get_weather(location),
        LookupKind::Humidity => get_humidity(location),
    }
}

pub fn get_weather(location: &str) -> &'static str {
    match location.to_lowercase().as_str() {
        "patiala" => "10°C",
        "delhi" => "14°C",
        "nainital" => "5°C",
        "dehradun" => "12°C",
        _ => UNKNOWN,
    }
}

pub fn get_humidity(location: &str) -> &'static str {
    match location.to_lowercase().as_str() {
        "patiala" => "40%",
        "delhi" => "55%",
        "nainital" => "70%",
        "dehradun" => "60%",
        _ => UNKNOWN,
    }
}
