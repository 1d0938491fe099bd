use chrono::{DateTime, Local, Utc};
use weather_core::{FetchState, IconId, WeatherResult, WeatherSession};

pub fn icon_glyph(icon: IconId) -> &'static str {
    match icon {
        IconId::Clear => "☀️",
        IconId::Cloudy => "☁️",
        IconId::Rainy => "🌦️",
        IconId::Downpour => "🌧️",
        IconId::Snow => "❄️",
        IconId::Storm => "⛈️",
        IconId::Atmospheric => "🌫️",
    }
}

pub fn session(session: &WeatherSession) -> String {
    state(session.state(), session.query_label())
}

pub fn state(state: &FetchState, query_label: Option<&str>) -> String {
    match state {
        FetchState::Idle => "Search for a city or use your location.".to_string(),
        FetchState::Loading => {
            format!("Fetching weather for {}...", query_label.unwrap_or("your location"))
        }
        FetchState::Failed(err) => format!("✗ {err}"),
        FetchState::Success(result) => weather(result),
    }
}

fn weather(r: &WeatherResult) -> String {
    let icon = r.icon();
    let temp = r.units.temperature_symbol();

    let place = match &r.country {
        Some(country) => format!("{}, {country}", r.location),
        None => r.location.clone(),
    };

    let mut lines = vec![
        format!("{}  {place}", icon_glyph(icon)),
        format!(
            "   {:.1}{temp} (feels like {:.1}{temp})",
            r.temperature, r.feels_like
        ),
        format!("   {} [{}]", capitalize(&r.description), icon.as_str()),
        format!("   Humidity:   {}%", r.humidity_pct),
        format!("   Wind:       {:.1} {}", r.wind_speed, r.units.speed_unit()),
        format!("   Pressure:   {:.0} hPa", r.pressure_hpa),
    ];

    if let Some(visibility) = r.visibility_m {
        lines.push(format!("   Visibility: {:.1} km", f64::from(visibility) / 1000.0));
    }
    if let Some(clouds) = r.cloudiness_pct {
        lines.push(format!("   Clouds:     {clouds}%"));
    }
    if let Some(sunrise) = r.sunrise {
        lines.push(format!("   Sunrise:    {}", local_time(sunrise, "%H:%M")));
    }
    if let Some(sunset) = r.sunset {
        lines.push(format!("   Sunset:     {}", local_time(sunset, "%H:%M")));
    }
    lines.push(format!("   Updated:    {}", local_time(r.captured_at, "%H:%M:%S")));

    lines.join("\n")
}

fn local_time(ts: DateTime<Utc>, fmt: &str) -> String {
    ts.with_timezone(&Local).format(fmt).to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
