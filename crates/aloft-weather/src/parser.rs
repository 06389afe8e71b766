//! Upstream response decoding.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::WeatherError;
use crate::types::{param, AltitudeLevel, Forecast, ParameterMap};

/// Decode a GML feature document into a forecast.
///
/// The document carries one collection per requested altitude level, or a
/// single flat collection when only one level was requested. Namespace
/// prefixes vary between deployments, so elements are matched by local
/// name. Unparseable or non-finite parameter values drop that single
/// parameter, never the whole collection.
pub fn parse_forecast(xml: &str) -> Result<Forecast, WeatherError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut groups: Vec<ParameterMap> = Vec::new();
    let mut collection_depth = 0usize;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"FeatureCollection" => {
                    collection_depth += 1;
                    // Nested collections start a new per-level group; the
                    // root collection is just the document envelope.
                    if collection_depth >= 2 {
                        groups.push(ParameterMap::new());
                    }
                }
                b"BsWfsElement" => {
                    if groups.is_empty() {
                        groups.push(ParameterMap::new());
                    }
                    if let Some((name, value)) = read_element(&mut reader)? {
                        if let Some(group) = groups.last_mut() {
                            group.insert(name, value);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"FeatureCollection" => {
                collection_depth = collection_depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(WeatherError::Parse(format!(
                    "invalid XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    let mut forecast = Forecast::default();
    for mut map in groups {
        if map.is_empty() {
            continue;
        }
        // The reported geometric height keys the collection; without one
        // the collection is the surface.
        let level = map
            .remove(param::GEOM_HEIGHT)
            .map(AltitudeLevel::from_geom_height)
            .unwrap_or(AltitudeLevel::SURFACE);
        if map.is_empty() {
            continue;
        }
        forecast.levels.insert(level, map);
    }

    if forecast.is_empty() {
        return Err(WeatherError::Parse(
            "no forecast members in response".to_string(),
        ));
    }
    Ok(forecast)
}

enum Field {
    Name,
    Value,
}

/// Read one `BsWfsElement`, returning its (name, value) pair or `None`
/// when the value is missing, unparseable, or non-finite.
fn read_element(reader: &mut Reader<&[u8]>) -> Result<Option<(String, f64)>, WeatherError> {
    let mut name: Option<String> = None;
    let mut value_text: Option<String> = None;
    let mut current: Option<Field> = None;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current = match e.local_name().as_ref() {
                    b"ParameterName" => Some(Field::Name),
                    b"ParameterValue" => Some(Field::Value),
                    _ => None,
                };
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| WeatherError::Parse(e.to_string()))?
                    .into_owned();
                match current {
                    Some(Field::Name) => name = Some(text),
                    Some(Field::Value) => value_text = Some(text),
                    None => {}
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"BsWfsElement" => break,
                b"ParameterName" | b"ParameterValue" => current = None,
                _ => {}
            },
            Ok(Event::Eof) => {
                return Err(WeatherError::Parse(
                    "truncated feature element".to_string(),
                ))
            }
            Err(e) => {
                return Err(WeatherError::Parse(format!(
                    "invalid XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    match (name, value_text) {
        (Some(name), Some(raw)) => Ok(raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| (name, v))),
        _ => Ok(None),
    }
}

/// Pull the first `ExceptionText` out of an OGC exception report, if the
/// body carries one.
pub fn extract_exception_text(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut in_exception = false;
    let mut text = String::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"ExceptionText" => {
                in_exception = true;
            }
            Ok(Event::Text(t)) if in_exception => {
                if let Ok(s) = t.unescape() {
                    text.push_str(&s);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"ExceptionText" => break,
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }

    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
