use crate::types::{Astronomy, Language};

const PHASES_EN: [&str; 8] = [
    "New Moon",
    "Waxing Crescent",
    "First Quarter",
    "Waxing Gibbous",
    "Full Moon",
    "Waning Gibbous",
    "Last Quarter",
    "Waning Crescent",
];

const PHASES_CS: [&str; 8] = [
    "Nov",
    "Dorůstající srpek",
    "První čtvrť",
    "Dorůstající měsíc",
    "Úplněk",
    "Couvající měsíc",
    "Poslední čtvrť",
    "Couvající srpek",
];

/// Name of the moon phase for a cycle position in 0..1 (0 = new, 0.5 = full).
///
/// Each named phase covers one eighth of the cycle centred on its nominal point.
pub fn moon_phase_name(phase: f64, language: Language) -> &'static str {
    let phase = phase.rem_euclid(1.0);
    let index = ((phase * 8.0 + 0.5).floor() as usize) % 8;
    match language {
        Language::En => PHASES_EN[index],
        Language::Cs => PHASES_CS[index],
    }
}

/// Phase name from the bundle, or derived from the numeric phase, or empty.
pub fn resolve_moon_phase_name(astronomy: Option<&Astronomy>, language: Language) -> String {
    let Some(astro) = astronomy else {
        return String::new();
    };
    match (&astro.moon_phase_name, astro.moon_phase) {
        (Some(name), _) if !name.trim().is_empty() => name.clone(),
        (_, Some(phase)) => moon_phase_name(phase, language).to_string(),
        _ => String::new(),
    }
}
