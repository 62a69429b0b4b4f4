//! Kp index helpers: activity labels and latitude-based visibility estimates.
//!
//! The backend computes the same numbers; these are used to backfill
//! responses that arrive without them so alert rules always have a value.

use crate::types::Language;

/// Minimum Kp needed to see aurora overhead-ish, by absolute latitude.
const KP_THRESHOLDS: [(f64, f64); 8] = [
    (67.0, 1.0),
    (64.0, 2.0),
    (60.0, 3.0),
    (55.0, 5.0),
    (50.0, 6.0),
    (45.0, 7.0),
    (40.0, 8.0),
    (35.0, 9.0),
];

/// Human-readable activity level for a Kp value.
pub fn kp_description(kp: f64, language: Language) -> &'static str {
    let level = if kp < 2.0 {
        0
    } else if kp < 4.0 {
        1
    } else if kp < 5.0 {
        2
    } else if kp < 6.0 {
        3
    } else if kp < 7.0 {
        4
    } else if kp < 8.0 {
        5
    } else if kp < 9.0 {
        6
    } else {
        7
    };

    match language {
        Language::En => [
            "Quiet",
            "Unsettled",
            "Active",
            "Minor Storm (G1)",
            "Moderate Storm (G2)",
            "Strong Storm (G3)",
            "Severe Storm (G4)",
            "Extreme Storm (G5)",
        ][level],
        Language::Cs => [
            "Klidné",
            "Mírně aktivní",
            "Aktivní",
            "Slabá bouře (G1)",
            "Střední bouře (G2)",
            "Silná bouře (G3)",
            "Velmi silná bouře (G4)",
            "Extrémní bouře (G5)",
        ][level],
    }
}

/// Kp required for a chance of seeing aurora at `latitude`.
pub fn required_kp(latitude: f64) -> f64 {
    let abs_lat = latitude.abs();
    KP_THRESHOLDS
        .iter()
        .find(|(lat, _)| abs_lat >= *lat)
        .map(|(_, kp)| *kp)
        .unwrap_or(9.0)
}

/// Estimated visibility probability in percent (0..=95).
///
/// Ramps 0-25% in the Kp unit below the requirement, 50% at it, 75% one
/// unit above, and otherwise grows 15% per Kp unit capped at 95%.
pub fn visibility_probability(kp: f64, latitude: f64) -> u8 {
    let required = required_kp(latitude);

    let percent = if kp < required - 1.0 {
        0.0
    } else if kp < required {
        (kp - (required - 1.0)) * 25.0
    } else if kp == required {
        50.0
    } else if kp == required + 1.0 {
        75.0
    } else {
        (50.0 + (kp - required) * 15.0).min(95.0)
    };

    percent.clamp(0.0, 95.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kp_description_levels() {
        assert_eq!(kp_description(0.7, Language::En), "Quiet");
        assert_eq!(kp_description(3.3, Language::En), "Unsettled");
        assert_eq!(kp_description(4.0, Language::En), "Active");
        assert_eq!(kp_description(5.2, Language::En), "Minor Storm (G1)");
        assert_eq!(kp_description(9.0, Language::En), "Extreme Storm (G5)");
        assert_eq!(kp_description(6.1, Language::Cs), "Střední bouře (G2)");
    }

    #[test]
    fn test_required_kp_by_latitude() {
        assert_eq!(required_kp(69.6), 1.0); // Tromsø
        assert_eq!(required_kp(64.1), 2.0); // Reykjavík
        assert_eq!(required_kp(50.08), 6.0); // Prague
        assert_eq!(required_kp(-45.9), 7.0); // Dunedin, southern hemisphere
        assert_eq!(required_kp(10.0), 9.0);
    }

    #[test]
    fn test_visibility_probability_prague() {
        assert_eq!(visibility_probability(3.0, 50.08), 0);
        assert_eq!(visibility_probability(5.2, 50.08), 5);
        assert_eq!(visibility_probability(6.0, 50.08), 50);
        assert_eq!(visibility_probability(7.0, 50.08), 75);
        assert_eq!(visibility_probability(9.0, 50.08), 95);
    }

    #[test]
    fn test_visibility_probability_arctic() {
        assert_eq!(visibility_probability(0.5, 69.6), 12);
        assert_eq!(visibility_probability(1.0, 69.6), 50);
        assert_eq!(visibility_probability(5.0, 69.6), 95);
    }
}
