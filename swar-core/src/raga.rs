//! # Raga Catalog Module
//!
//! A small read-only database of Hindustani ragas: their aaroh and avroh,
//! emphasis notes, pakad and practice alankars, plus the queries the
//! exercise screens need (scale generation, random notes, pakad labels).
//!
//! Semitones are offsets from Sa. Values below zero are notes of the lower
//! octave and 12 is the upper Sa; reducing any of them modulo 12 gives an
//! index into the shruti table.
//!
//! Lookups take ids from a fixed menu, so an unknown id is answered with
//! `None` rather than an error.

use crate::shruti;
use crate::tuning;
use once_cell::sync::Lazy;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::collections::BTreeMap;

/// A named practice pattern given as semitone offsets from Sa.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alankar {
    pub name: &'static str,
    pub pattern: &'static [i32],
}

/// One raga definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Raga {
    pub id: &'static str,
    pub name: &'static str,
    pub hindi: &'static str,
    /// Parent scale the raga belongs to.
    pub thaat: &'static str,
    pub time_of_day: &'static str,
    pub mood: &'static str,
    pub description: &'static str,
    pub aaroh: &'static [i32],
    pub avroh: &'static [i32],
    pub vadi: u8,
    pub samvadi: u8,
    pub pakad: &'static [i32],
    pub alankars: &'static [Alankar],
}

/// A semitone of a raga together with its frequency on a given Sa.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RagaNote {
    pub semitone: i32,
    pub frequency: f64,
}

impl RagaNote {
    fn on_tonic(semitone: i32, tonic: f64) -> Self {
        Self {
            semitone,
            frequency: tuning::frequency_for_semitone(semitone, tonic),
        }
    }
}

/// Aaroh and avroh of a raga tuned to a particular Sa.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagaScale {
    pub raga: &'static Raga,
    pub tonic: f64,
    pub aaroh: Vec<RagaNote>,
    pub avroh: Vec<RagaNote>,
}

/// A pakad rendered for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PakadDisplay {
    pub semitones: Vec<i32>,
    /// Devanagari labels separated by spaces.
    pub hindi: String,
    /// Roman labels separated by spaces, e.g. "Ga Re♭ Sa".
    pub roman: String,
}

/// All ragas, in menu order.
static RAGAS: Lazy<Vec<Raga>> = Lazy::new(|| {
    vec![
        Raga {
            id: "bilawal",
            name: "Bilawal",
            hindi: "बिलावल",
            thaat: "Bilawal",
            time_of_day: "Morning (6-9 AM)",
            mood: "Peaceful, Devotional",
            description: "The most fundamental raga, equivalent to the Western major scale. Perfect for beginners.",
            aaroh: &[0, 2, 4, 5, 7, 9, 11, 12],
            avroh: &[12, 11, 9, 7, 5, 4, 2, 0],
            vadi: 9,
            samvadi: 4,
            pakad: &[9, 7, 4, 2, 0],
            alankars: &[
                Alankar {
                    name: "Basic Aaroh-Avroh",
                    pattern: &[0, 2, 4, 5, 7, 9, 11, 12, 11, 9, 7, 5, 4, 2, 0],
                },
                Alankar {
                    name: "Meend Practice",
                    pattern: &[0, 2, 4, 2, 0, 2, 4, 5, 4, 2],
                },
            ],
        },
        Raga {
            id: "yaman",
            name: "Yaman",
            hindi: "यमन",
            thaat: "Kalyan",
            time_of_day: "Evening (6-9 PM)",
            mood: "Romantic, Serene, Devotional",
            description: "One of the most popular evening ragas with Tivra Ma (sharp 4th). Creates a deeply moving atmosphere.",
            // Starts from the lower Ni.
            aaroh: &[-1, 2, 4, 6, 9, 11, 12],
            avroh: &[12, 11, 9, 6, 4, 2, 0],
            vadi: 4,
            samvadi: 11,
            pakad: &[11, 2, 4, 6, 4, 2, 0],
            alankars: &[
                Alankar {
                    name: "Yaman Aaroh",
                    pattern: &[-1, 2, 4, 6, 9, 11, 12],
                },
                Alankar {
                    name: "Yaman Avroh",
                    pattern: &[12, 11, 9, 6, 4, 2, 0],
                },
            ],
        },
        Raga {
            id: "bhairav",
            name: "Bhairav",
            hindi: "भैरव",
            thaat: "Bhairav",
            time_of_day: "Early Morning (4-7 AM)",
            mood: "Serious, Devotional, Meditative",
            description: "A morning raga with Komal Re and Komal Da, creating a profound devotional mood.",
            aaroh: &[0, 1, 4, 5, 7, 8, 11, 12],
            avroh: &[12, 11, 8, 7, 5, 4, 1, 0],
            vadi: 8,
            samvadi: 1,
            pakad: &[4, 1, 0, 8, 7, 5, 4, 1, 0],
            alankars: &[
                Alankar {
                    name: "Bhairav Aaroh",
                    pattern: &[0, 1, 4, 5, 7, 8, 11, 12],
                },
                Alankar {
                    name: "Bhairav Avroh",
                    pattern: &[12, 11, 8, 7, 5, 4, 1, 0],
                },
            ],
        },
        Raga {
            id: "kafi",
            name: "Kafi",
            hindi: "काफी",
            thaat: "Kafi",
            time_of_day: "Late Night (9 PM - 12 AM)",
            mood: "Romantic, Light, Playful",
            description: "A versatile raga similar to the Dorian mode, using Komal Ga and Komal Ni.",
            aaroh: &[0, 2, 3, 5, 7, 9, 10, 12],
            avroh: &[12, 10, 9, 7, 5, 3, 2, 0],
            vadi: 7,
            samvadi: 0,
            pakad: &[5, 3, 2, 0, 7, 5, 3, 2, 0],
            alankars: &[Alankar {
                name: "Kafi Basic",
                pattern: &[0, 2, 3, 5, 7, 9, 10, 12, 10, 9, 7, 5, 3, 2, 0],
            }],
        },
        Raga {
            id: "bhairavi",
            name: "Bhairavi",
            hindi: "भैरवी",
            thaat: "Bhairavi",
            time_of_day: "Morning (Concluding raga)",
            mood: "Devotional, Peaceful, Melancholic",
            description: "Queen of ragas, traditionally performed at the end of concerts. Uses all Komal notes except Ma.",
            aaroh: &[0, 1, 3, 5, 7, 8, 10, 12],
            avroh: &[12, 10, 8, 7, 5, 3, 1, 0],
            vadi: 5,
            samvadi: 0,
            pakad: &[3, 1, 0, 5, 3, 1, 0],
            alankars: &[Alankar {
                name: "Bhairavi Basic",
                pattern: &[0, 1, 3, 5, 7, 8, 10, 12, 10, 8, 7, 5, 3, 1, 0],
            }],
        },
    ]
});

/// Raga id to position in [`RAGAS`].
static RAGA_INDEX: Lazy<BTreeMap<&'static str, usize>> = Lazy::new(|| {
    RAGAS
        .iter()
        .enumerate()
        .map(|(i, raga)| (raga.id, i))
        .collect()
});

/// Finds a raga by id.
pub fn get(id: &str) -> Option<&'static Raga> {
    RAGA_INDEX.get(id).map(|&i| &RAGAS[i])
}

/// Every raga, in declaration order.
pub fn list_all() -> &'static [Raga] {
    &RAGAS
}

/// Ragas whose time of day contains `keyword`, ignoring case.
pub fn by_time_of_day(keyword: &str) -> Vec<&'static Raga> {
    let keyword = keyword.to_lowercase();
    RAGAS
        .iter()
        .filter(|raga| raga.time_of_day.to_lowercase().contains(&keyword))
        .collect()
}

/// Aaroh and avroh of a raga with frequencies on the given Sa.
pub fn generate_scale(id: &str, tonic: f64) -> Option<RagaScale> {
    let raga = get(id)?;
    let tune = |semitones: &[i32]| {
        semitones
            .iter()
            .map(|&s| RagaNote::on_tonic(s, tonic))
            .collect::<Vec<_>>()
    };
    Some(RagaScale {
        raga,
        tonic,
        aaroh: tune(raga.aaroh),
        avroh: tune(raga.avroh),
    })
}

/// Distinct aaroh semitones between Sa and upper Sa, in aaroh order.
///
/// Lower-octave notes and notes only found in the avroh never become
/// exercise targets.
pub fn exercise_semitones(raga: &Raga) -> Vec<i32> {
    let mut notes: Vec<i32> = Vec::with_capacity(raga.aaroh.len());
    for &s in raga.aaroh.iter().filter(|&&s| (0..=12).contains(&s)) {
        if !notes.contains(&s) {
            notes.push(s);
        }
    }
    notes
}

/// Picks one exercise note of a raga uniformly at random.
pub fn random_note<R: Rng + ?Sized>(id: &str, tonic: f64, rng: &mut R) -> Option<RagaNote> {
    let raga = get(id)?;
    let semitone = *exercise_semitones(raga).choose(rng)?;
    Some(RagaNote::on_tonic(semitone, tonic))
}

/// The pakad of a raga as Devanagari and Roman text.
pub fn pakad_display(id: &str) -> Option<PakadDisplay> {
    let raga = get(id)?;
    if raga.pakad.is_empty() {
        return None;
    }
    let degrees: Vec<_> = raga.pakad.iter().map(|&s| shruti::degree(s)).collect();
    Some(PakadDisplay {
        semitones: raga.pakad.to_vec(),
        hindi: degrees.iter().map(|d| d.hindi).collect::<Vec<_>>().join(" "),
        roman: degrees.iter().map(|d| d.roman()).collect::<Vec<_>>().join(" "),
    })
}

/// How a common alankar is laid over a raga.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlankarShape {
    Ascending,
    Descending,
    /// Positions within the raga's aaroh.
    Positions(&'static [usize]),
}

/// A practice pattern that applies to any raga.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommonAlankar {
    pub id: &'static str,
    pub name: &'static str,
    pub hindi: &'static str,
    pub description: &'static str,
    pub shape: AlankarShape,
}

pub const COMMON_ALANKARS: [CommonAlankar; 5] = [
    CommonAlankar {
        id: "ascending",
        name: "आरोह (Aaroh)",
        hindi: "आरोह",
        description: "Ascending scale practice",
        shape: AlankarShape::Ascending,
    },
    CommonAlankar {
        id: "descending",
        name: "अवरोह (Avroh)",
        hindi: "अवरोह",
        description: "Descending scale practice",
        shape: AlankarShape::Descending,
    },
    CommonAlankar {
        id: "alankar1",
        name: "अलंकार १",
        hindi: "सारेगम-रेगमप",
        description: "SaReGaMa ReGaMaPa pattern",
        shape: AlankarShape::Positions(&[0, 1, 2, 3, 1, 2, 3, 4, 2, 3, 4, 5]),
    },
    CommonAlankar {
        id: "alankar2",
        name: "अलंकार २",
        hindi: "सारेसा-रेगरे",
        description: "SaReSa ReGaRe pattern",
        shape: AlankarShape::Positions(&[0, 1, 0, 1, 2, 1, 2, 3, 2]),
    },
    CommonAlankar {
        id: "alankar3",
        name: "अलंकार ३",
        hindi: "सारेगरेसा",
        description: "SaReGaReSa pattern",
        shape: AlankarShape::Positions(&[0, 1, 2, 1, 0]),
    },
];

/// Semitones of a common alankar sung in the given raga.
///
/// Positions past the end of the aaroh are skipped.
pub fn apply_alankar(alankar: &CommonAlankar, raga: &Raga) -> Vec<i32> {
    match alankar.shape {
        AlankarShape::Ascending => raga.aaroh.to_vec(),
        AlankarShape::Descending => raga.avroh.to_vec(),
        AlankarShape::Positions(positions) => positions
            .iter()
            .filter_map(|&i| raga.aaroh.get(i).copied())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn bilawal_aaroh() {
        let raga = get("bilawal").expect("bilawal is in the catalog");
        assert_eq!(raga.aaroh, &[0, 2, 4, 5, 7, 9, 11, 12]);
        assert_eq!(raga.hindi, "बिलावल");
    }

    #[test]
    fn unknown_ids_are_not_found() {
        assert!(get("malkauns").is_none());
        assert!(generate_scale("malkauns", 261.63).is_none());
        assert!(random_note("malkauns", 261.63, &mut StdRng::seed_from_u64(1)).is_none());
        assert!(pakad_display("").is_none());
    }

    #[test]
    fn listing_keeps_declaration_order() {
        let ids: Vec<_> = list_all().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["bilawal", "yaman", "bhairav", "kafi", "bhairavi"]);
    }

    #[test]
    fn every_semitone_reduces_into_the_shruti_table() {
        for raga in list_all() {
            let all = raga
                .aaroh
                .iter()
                .chain(raga.avroh)
                .chain(raga.pakad)
                .chain(raga.alankars.iter().flat_map(|a| a.pattern));
            for &s in all {
                assert!((-12..=24).contains(&s), "{}: odd semitone {s}", raga.id);
                assert_eq!(shruti::degree(s).semitone as i32, s.rem_euclid(12));
            }
            assert!(raga.vadi < 12 && raga.samvadi < 12);
        }
    }

    #[test]
    fn scale_frequencies_follow_equal_temperament() {
        let scale = generate_scale("yaman", 200.0).expect("yaman exists");
        assert_eq!(scale.aaroh.len(), 7);
        assert_eq!(scale.aaroh[0].semitone, -1);
        assert!((scale.aaroh[0].frequency - 200.0 * 2f64.powf(-1.0 / 12.0)).abs() < 1e-9);
        assert!((scale.aaroh[6].frequency - 400.0).abs() < 1e-9);
        assert_eq!(scale.avroh.last().map(|n| n.semitone), Some(0));
    }

    #[test]
    fn random_notes_come_from_the_aaroh() {
        let mut rng = StdRng::seed_from_u64(7);
        let allowed = [0, 2, 4, 5, 7, 9, 11, 12];
        for _ in 0..200 {
            let note = random_note("bilawal", 261.63, &mut rng).expect("bilawal exists");
            assert!(allowed.contains(&note.semitone), "unexpected {}", note.semitone);
            let expected = 261.63 * 2f64.powf(note.semitone as f64 / 12.0);
            assert!((note.frequency - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn random_notes_skip_lower_octave() {
        assert_eq!(
            exercise_semitones(get("yaman").expect("yaman exists")),
            vec![2, 4, 6, 9, 11, 12]
        );
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let note = random_note("yaman", 261.63, &mut rng).expect("yaman exists");
            assert!(note.semitone >= 0);
        }
    }

    #[test]
    fn random_notes_cover_the_whole_set() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..500 {
            if let Some(note) = random_note("kafi", 261.63, &mut rng) {
                seen.insert(note.semitone);
            }
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![0, 2, 3, 5, 7, 9, 10, 12]);
    }

    #[test]
    fn bhairav_pakad_labels() {
        let pakad = pakad_display("bhairav").expect("bhairav has a pakad");
        assert_eq!(pakad.semitones, vec![4, 1, 0, 8, 7, 5, 4, 1, 0]);
        assert_eq!(pakad.hindi, "ग रे॒ सा ध॒ प म ग रे॒ सा");
        assert_eq!(pakad.roman, "Ga Re♭ Sa Da♭ Pa Ma Ga Re♭ Sa");
    }

    #[test]
    fn yaman_pakad_uses_tivra_ma() {
        let pakad = pakad_display("yaman").expect("yaman has a pakad");
        assert_eq!(pakad.roman, "Ni Re Ga Ma♯ Ga Re Sa");
    }

    #[test]
    fn time_of_day_filter() {
        let morning: Vec<_> = by_time_of_day("MORNING").iter().map(|r| r.id).collect();
        assert_eq!(morning, vec!["bilawal", "bhairav", "bhairavi"]);
        let night: Vec<_> = by_time_of_day("night").iter().map(|r| r.id).collect();
        assert_eq!(night, vec!["kafi"]);
    }

    #[test]
    fn common_alankars_follow_the_raga() {
        let bhairav = get("bhairav").expect("bhairav exists");
        let alankar3 = &COMMON_ALANKARS[4];
        assert_eq!(apply_alankar(alankar3, bhairav), vec![0, 1, 4, 1, 0]);
        assert_eq!(apply_alankar(&COMMON_ALANKARS[1], bhairav), bhairav.avroh.to_vec());

        let yaman = get("yaman").expect("yaman exists");
        // Yaman's aaroh has seven notes, so position 5 is its Ni.
        assert_eq!(apply_alankar(&COMMON_ALANKARS[2], yaman).last(), Some(&11));
    }
}
