//! Ambient theme selection from current conditions and local hour.

use crate::types::{AmbientTheme, CurrentWeather};

pub fn is_night(hour: u32) -> bool {
    hour < 6 || hour > 20
}

fn theme(name: &str, gradient: [&str; 3], effect: Option<&str>) -> AmbientTheme {
    AmbientTheme {
        theme: name.to_string(),
        gradient: gradient.iter().map(|c| c.to_string()).collect(),
        effect: effect.map(str::to_string),
    }
}

/// Pick the background theme. Precipitation wins over time of day; clear and
/// cloudy skies follow sunrise, sunset and night.
pub fn ambient_theme(current: &CurrentWeather, hour: u32) -> AmbientTheme {
    let code = current.weather_code.unwrap_or(0);

    if code >= 95 {
        return theme("storm", ["#1a0a2e", "#16213e", "#0f0f0f"], Some("lightning"));
    }
    if (51..=67).contains(&code) || (80..=82).contains(&code) {
        return theme("rain", ["#4a6fa5", "#6b8cae", "#8fa8c2"], None);
    }
    if (71..=77).contains(&code) || (85..=86).contains(&code) {
        return theme("snow", ["#e8f4f8", "#d4e8ed", "#b8d4e3"], None);
    }
    if (5..=7).contains(&hour) {
        return theme("sunrise", ["#ff9a9e", "#fecfef", "#ffd89b"], None);
    }
    if (18..=20).contains(&hour) {
        return theme("sunset", ["#fa709a", "#fee140", "#642b73"], None);
    }
    if is_night(hour) {
        return match current.cloud_cover {
            Some(cover) if cover > 50 => {
                theme("cloudy_night", ["#2c3e50", "#34495e", "#1a1a2e"], None)
            }
            _ => theme("clear_night", ["#0f0c29", "#302b63", "#24243e"], Some("stars")),
        };
    }
    if matches!(code, 2 | 3 | 45 | 48) {
        return theme("cloudy", ["#8e9eab", "#c5d5e4", "#eef2f3"], None);
    }
    theme("sunny", ["#f6d365", "#fda085", "#ffecd2"], None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather(code: i32) -> CurrentWeather {
        CurrentWeather {
            temperature: 20.0,
            weather_code: Some(code),
            ..Default::default()
        }
    }

    #[test]
    fn test_storm_beats_time_of_day() {
        let t = ambient_theme(&weather(95), 22);
        assert_eq!(t.theme, "storm");
        assert_eq!(t.effect.as_deref(), Some("lightning"));
    }

    #[test]
    fn test_rain_and_snow() {
        assert_eq!(ambient_theme(&weather(61), 12).theme, "rain");
        assert_eq!(ambient_theme(&weather(71), 12).theme, "snow");
    }

    #[test]
    fn test_time_based_themes() {
        assert_eq!(ambient_theme(&weather(0), 6).theme, "sunrise");
        assert_eq!(ambient_theme(&weather(0), 19).theme, "sunset");
        assert_eq!(ambient_theme(&weather(0), 23).theme, "clear_night");
        assert_eq!(ambient_theme(&weather(3), 12).theme, "cloudy");
        assert_eq!(ambient_theme(&weather(0), 12).theme, "sunny");
    }

    #[test]
    fn test_cloudy_night_uses_cloud_cover() {
        let mut w = weather(3);
        w.cloud_cover = Some(80);
        assert_eq!(ambient_theme(&w, 2).theme, "cloudy_night");
    }

    #[test]
    fn test_is_night_boundaries() {
        assert!(is_night(5));
        assert!(!is_night(6));
        assert!(!is_night(20));
        assert!(is_night(21));
    }
}
