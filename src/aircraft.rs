//! Aircraft label normalization.
//!
//! The logbook and the landing sensor log both carry free-text aircraft
//! labels, and they rarely agree ("Cessna 172SP" vs "C172_SP"). The
//! normalized code is the sole join key between the two record streams,
//! together with the calendar day, so normalization must be deterministic.

/// Canonical (variant, code) table for types that show up under several
/// spellings. Variants are matched against the stripped/uppercased label.
const KNOWN_VARIANTS: &[(&str, &str)] = &[
    // Cessna 172 family
    ("C172", "C172"),
    ("C172SP", "C172"),
    ("CESSNA172", "C172"),
    ("CESSNA172SP", "C172"),
    ("CESSNASKYHAWK", "C172"),
    ("SKYHAWK", "C172"),
    // Cessna 152
    ("C152", "C152"),
    ("CESSNA152", "C152"),
    // Boeing 737-800
    ("B738", "B738"),
    ("B737800", "B738"),
    ("737800", "B738"),
    ("BOEING737800", "B738"),
    // Boeing 747-400
    ("B744", "B744"),
    ("B747400", "B744"),
    ("747400", "B744"),
    // Airbus A320
    ("A320", "A320"),
    ("AIRBUSA320", "A320"),
    ("A320NEO", "A320"),
    // Cirrus SR22
    ("SR22", "SR22"),
    ("CIRRUSSR22", "SR22"),
    // King Air C90
    ("C90B", "BE9L"),
    ("KINGAIRC90B", "BE9L"),
    ("BE9L", "BE9L"),
];

/// Normalize a free-text aircraft label into a canonical code.
///
/// Strips non-alphanumerics, uppercases, then maps known variants onto a
/// single code. Unrecognized labels pass through stripped and uppercased,
/// so two logs that agree on an unusual label still join.
pub fn normalize_aircraft(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();

    for (variant, code) in KNOWN_VARIANTS {
        if stripped == *variant {
            return (*code).to_string();
        }
    }

    stripped
}
