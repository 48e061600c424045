//! # Shruti Table Module
//!
//! The twelve semitone degrees of the Sargam system, each tagged with its
//! swar name, variant, Devanagari label and traditional full name.
//!
//! The table is built once and shared read-only for the life of the
//! process, so any number of readers may hold references into it.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven swar names of the Sargam system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwarName {
    Sa,
    Re,
    Ga,
    Ma,
    Pa,
    Da,
    Ni,
}

impl SwarName {
    pub const ALL: [SwarName; 7] = [
        SwarName::Sa,
        SwarName::Re,
        SwarName::Ga,
        SwarName::Ma,
        SwarName::Pa,
        SwarName::Da,
        SwarName::Ni,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SwarName::Sa => "Sa",
            SwarName::Re => "Re",
            SwarName::Ga => "Ga",
            SwarName::Ma => "Ma",
            SwarName::Pa => "Pa",
            SwarName::Da => "Da",
            SwarName::Ni => "Ni",
        }
    }

    /// Case-insensitive parse of a swar name ("sa", "RE", "Ni").
    pub fn parse(name: &str) -> Option<SwarName> {
        SwarName::ALL
            .into_iter()
            .find(|swar| swar.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for SwarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural, flattened or sharpened form of a swar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Shuddha,
    Komal,
    Tivra,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Shuddha => "shuddha",
            Variant::Komal => "komal",
            Variant::Tivra => "tivra",
        }
    }

    pub fn parse(name: &str) -> Option<Variant> {
        match name.trim().to_ascii_lowercase().as_str() {
            "shuddha" => Some(Variant::Shuddha),
            "komal" => Some(Variant::Komal),
            "tivra" => Some(Variant::Tivra),
            _ => None,
        }
    }

    /// Marker appended to the Roman name in compact displays.
    fn roman_marker(self) -> &'static str {
        match self {
            Variant::Shuddha => "",
            Variant::Komal => "♭",
            Variant::Tivra => "♯",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the twelve semitone degrees relative to Sa.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShrutiDegree {
    /// Semitone above Sa (0-11), also the index in the table.
    pub semitone: u8,
    pub swar: SwarName,
    pub variant: Variant,
    /// Devanagari label, with the komal underline or tivra mark.
    pub hindi: &'static str,
    pub full_name: &'static str,
}

impl ShrutiDegree {
    /// Compact Roman label such as "Re♭" or "Ma♯".
    pub fn roman(&self) -> String {
        format!("{}{}", self.swar, self.variant.roman_marker())
    }
}

/// The shared table of all twelve degrees, ordered by semitone.
pub static SHRUTI_TABLE: Lazy<Vec<ShrutiDegree>> = Lazy::new(|| {
    use SwarName::*;
    use Variant::*;

    const DEGREES: [(SwarName, Variant, &str, &str); 12] = [
        (Sa, Shuddha, "सा", "Shadja"),
        (Re, Komal, "रे॒", "Komal Rishabh"),
        (Re, Shuddha, "रे", "Shuddha Rishabh"),
        (Ga, Komal, "ग॒", "Komal Gandhar"),
        (Ga, Shuddha, "ग", "Shuddha Gandhar"),
        (Ma, Shuddha, "म", "Shuddha Madhyam"),
        (Ma, Tivra, "म॑", "Tivra Madhyam"),
        (Pa, Shuddha, "प", "Pancham"),
        (Da, Komal, "ध॒", "Komal Dhaivat"),
        (Da, Shuddha, "ध", "Shuddha Dhaivat"),
        (Ni, Komal, "नी॒", "Komal Nishad"),
        (Ni, Shuddha, "नी", "Shuddha Nishad"),
    ];

    DEGREES
        .iter()
        .enumerate()
        .map(|(i, &(swar, variant, hindi, full_name))| ShrutiDegree {
            semitone: i as u8,
            swar,
            variant,
            hindi,
            full_name,
        })
        .collect()
});

/// Looks up a degree by semitone index.
///
/// Any integer is accepted and reduced to its pitch class first, so
/// `-1` (lower Ni) and `12` (upper Sa) resolve like `11` and `0`.
pub fn degree(semitone: i32) -> &'static ShrutiDegree {
    &SHRUTI_TABLE[semitone.rem_euclid(12) as usize]
}

/// Finds the degree for a (swar, variant) pair.
///
/// Returns `None` for pairs that do not exist, e.g. komal Sa or tivra Ga.
pub fn find(swar: SwarName, variant: Variant) -> Option<&'static ShrutiDegree> {
    SHRUTI_TABLE
        .iter()
        .find(|d| d.swar == swar && d.variant == variant)
}

/// Same as [`find`] but takes the swar name as text, matched case-insensitively.
pub fn find_by_name(name: &str, variant: Variant) -> Option<&'static ShrutiDegree> {
    SwarName::parse(name).and_then(|swar| find(swar, variant))
}

/// Just-intonation ratios of each degree to Sa.
///
/// Reference data only; every comparison in this crate uses equal temperament.
pub const JUST_INTONATION_RATIOS: [f64; 12] = [
    1.0,
    16.0 / 15.0,
    9.0 / 8.0,
    6.0 / 5.0,
    5.0 / 4.0,
    4.0 / 3.0,
    45.0 / 32.0,
    3.0 / 2.0,
    8.0 / 5.0,
    5.0 / 3.0,
    9.0 / 5.0,
    15.0 / 8.0,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_per_semitone() {
        assert_eq!(SHRUTI_TABLE.len(), 12);
        for (i, d) in SHRUTI_TABLE.iter().enumerate() {
            assert_eq!(d.semitone as usize, i, "degree {} is out of place", d.full_name);
        }
    }

    #[test]
    fn sa_and_pa_are_only_shuddha() {
        for swar in [SwarName::Sa, SwarName::Pa] {
            let variants: Vec<_> = SHRUTI_TABLE
                .iter()
                .filter(|d| d.swar == swar)
                .map(|d| d.variant)
                .collect();
            assert_eq!(variants, vec![Variant::Shuddha], "{swar} should only be shuddha");
        }
    }

    #[test]
    fn ma_has_shuddha_and_tivra() {
        assert_eq!(find(SwarName::Ma, Variant::Shuddha).map(|d| d.semitone), Some(5));
        assert_eq!(find(SwarName::Ma, Variant::Tivra).map(|d| d.semitone), Some(6));
        assert!(find(SwarName::Ma, Variant::Komal).is_none());
    }

    #[test]
    fn komal_variants_sit_one_below_shuddha() {
        for swar in [SwarName::Re, SwarName::Ga, SwarName::Da, SwarName::Ni] {
            let komal = find(swar, Variant::Komal).expect("komal exists");
            let shuddha = find(swar, Variant::Shuddha).expect("shuddha exists");
            assert_eq!(komal.semitone + 1, shuddha.semitone);
        }
    }

    #[test]
    fn name_lookup_ignores_case() {
        assert_eq!(find_by_name("dA", Variant::Komal).map(|d| d.semitone), Some(8));
        assert!(find_by_name("Xa", Variant::Shuddha).is_none());
    }

    #[test]
    fn degree_wraps_octaves() {
        assert_eq!(degree(-1).semitone, 11);
        assert_eq!(degree(12).semitone, 0);
        assert_eq!(degree(25).semitone, 1);
    }

    #[test]
    fn roman_labels_mark_variants() {
        assert_eq!(degree(1).roman(), "Re♭");
        assert_eq!(degree(6).roman(), "Ma♯");
        assert_eq!(degree(7).roman(), "Pa");
    }
}
