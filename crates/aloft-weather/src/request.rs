//! Upstream query construction.
//!
//! A request is first described in memory, then serialized; identical
//! inputs produce byte-identical bodies, so request identity lines up with
//! the cache key.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::bucket::TimeBucket;
use crate::error::WeatherError;
use crate::types::{param, AltitudeLevel, Coordinate};

pub const SURFACE_QUERY_ID: &str = "fmi::forecast::harmonie::surface::point::simple";
pub const HYBRID_QUERY_ID: &str = "fmi::forecast::harmonie::hybrid::point::simple";

/// One stored query inside a batched `GetFeature` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredQuery {
    pub id: &'static str,
    pub latlon: String,
    pub height: Option<u32>,
    pub starttime: String,
    pub endtime: String,
    pub timestep: u32,
    pub parameters: String,
}

impl StoredQuery {
    fn for_level(
        level: AltitudeLevel,
        bucket: &TimeBucket,
        coordinate: Coordinate,
        timestep_minutes: u32,
    ) -> Self {
        let time = bucket.as_str().to_string();
        if level.is_surface() {
            Self {
                id: SURFACE_QUERY_ID,
                latlon: coordinate.as_pos(),
                height: None,
                starttime: time.clone(),
                endtime: time,
                timestep: timestep_minutes,
                parameters: join(param::BASE.iter().chain(param::SURFACE_ONLY.iter())),
            }
        } else {
            Self {
                id: HYBRID_QUERY_ID,
                latlon: coordinate.as_pos(),
                height: Some(level.as_meters()),
                starttime: time.clone(),
                endtime: time,
                timestep: timestep_minutes,
                parameters: join(param::BASE.iter()),
            }
        }
    }
}

fn join<'a>(names: impl Iterator<Item = &'a &'a str>) -> String {
    names.copied().collect::<Vec<_>>().join(" ")
}

/// A batched point-in-time `GetFeature` request covering all levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetFeatureRequest {
    pub queries: Vec<StoredQuery>,
}

impl GetFeatureRequest {
    /// One stored query per level, all sharing the same bucket and
    /// coordinate. Start and end time are both the bucket (a point-in-time
    /// query, not a range).
    pub fn build(
        bucket: &TimeBucket,
        coordinate: Coordinate,
        levels: &[AltitudeLevel],
        timestep_minutes: u32,
    ) -> Self {
        let queries = levels
            .iter()
            .map(|level| StoredQuery::for_level(*level, bucket, coordinate, timestep_minutes))
            .collect();
        Self { queries }
    }

    /// Serialize to the WFS 2.0 request body.
    pub fn to_xml(&self) -> Result<String, WeatherError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(serialize_error)?;

        let mut root = BytesStart::new("wfs:GetFeature");
        root.push_attribute(("service", "WFS"));
        root.push_attribute(("version", "2.0.2"));
        root.push_attribute(("outputFormat", "application/gml+xml; version=3.2"));
        root.push_attribute(("xmlns:wfs", "http://www.opengis.net/wfs/2.0"));
        root.push_attribute(("xmlns:fes", "http://www.opengis.net/fes/2.0"));
        root.push_attribute(("xmlns:gml", "http://www.opengis.net/gml/3.2"));
        root.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
        root.push_attribute((
            "xsi:schemaLocation",
            "http://www.opengis.net/wfs/2.0 http://schemas.opengis.net/wfs/2.0/wfs.xsd",
        ));
        writer
            .write_event(Event::Start(root))
            .map_err(serialize_error)?;

        for query in &self.queries {
            write_query(&mut writer, query)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("wfs:GetFeature")))
            .map_err(serialize_error)?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| WeatherError::Request(e.to_string()))
    }
}

fn write_query(writer: &mut Writer<Vec<u8>>, query: &StoredQuery) -> Result<(), WeatherError> {
    let mut start = BytesStart::new("wfs:StoredQuery");
    start.push_attribute(("id", query.id));
    writer
        .write_event(Event::Start(start))
        .map_err(serialize_error)?;

    // latlon is wrapped in a gml:pos element, unlike the scalar parameters.
    let mut latlon = BytesStart::new("wfs:Parameter");
    latlon.push_attribute(("name", "latlon"));
    writer
        .write_event(Event::Start(latlon))
        .map_err(serialize_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("gml:pos")))
        .map_err(serialize_error)?;
    writer
        .write_event(Event::Text(BytesText::new(&query.latlon)))
        .map_err(serialize_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("gml:pos")))
        .map_err(serialize_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("wfs:Parameter")))
        .map_err(serialize_error)?;

    if let Some(height) = query.height {
        write_parameter(writer, "height", &height.to_string())?;
    }
    write_parameter(writer, "starttime", &query.starttime)?;
    write_parameter(writer, "endtime", &query.endtime)?;
    write_parameter(writer, "timestep", &query.timestep.to_string())?;
    write_parameter(writer, "parameters", &query.parameters)?;

    writer
        .write_event(Event::End(BytesEnd::new("wfs:StoredQuery")))
        .map_err(serialize_error)?;
    Ok(())
}

fn write_parameter(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &str,
) -> Result<(), WeatherError> {
    let mut start = BytesStart::new("wfs:Parameter");
    start.push_attribute(("name", name));
    writer
        .write_event(Event::Start(start))
        .map_err(serialize_error)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(serialize_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("wfs:Parameter")))
        .map_err(serialize_error)?;
    Ok(())
}

fn serialize_error(err: quick_xml::Error) -> WeatherError {
    WeatherError::Request(err.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn sample_request(levels: &[u32]) -> GetFeatureRequest {
        let bucket = TimeBucket::from_parts(2024, 1, 15, 12, 0);
        let coordinate = Coordinate::from_degrees(60.17, 24.94);
        let levels: Vec<AltitudeLevel> = levels.iter().map(|m| AltitudeLevel::meters(*m)).collect();
        GetFeatureRequest::build(&bucket, coordinate, &levels, 5)
    }

    #[test]
    fn builds_one_query_per_level() {
        let request = sample_request(&[0, 300, 1000]);
        assert_eq!(request.queries.len(), 3);
    }

    #[test]
    fn surface_query_identity() {
        let request = sample_request(&[0]);
        let query = &request.queries[0];
        assert_eq!(query.id, SURFACE_QUERY_ID);
        assert_eq!(query.height, None);
        assert!(query.parameters.contains("WindGust"));
        assert!(query.parameters.contains("LowCloudCover"));
        assert!(query.parameters.contains("MediumCloudCover"));
    }

    #[test]
    fn hybrid_query_identity() {
        let request = sample_request(&[1000]);
        let query = &request.queries[0];
        assert_eq!(query.id, HYBRID_QUERY_ID);
        assert_eq!(query.height, Some(1000));
        assert!(query.parameters.contains("Temperature"));
        assert!(!query.parameters.contains("WindGust"));
        assert!(!query.parameters.contains("CloudCover"));
    }

    #[test]
    fn start_and_end_time_are_the_bucket() {
        let request = sample_request(&[0, 1000]);
        for query in &request.queries {
            assert_eq!(query.starttime, "2024-01-15T12:00:00Z");
            assert_eq!(query.endtime, query.starttime);
        }
    }

    #[test]
    fn serialization_is_deterministic() {
        let a = sample_request(&[0, 300, 1000]).to_xml().unwrap();
        let b = sample_request(&[0, 300, 1000]).to_xml().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn body_carries_both_query_identities() {
        let xml = sample_request(&[0, 1000]).to_xml().unwrap();
        assert!(xml.contains(SURFACE_QUERY_ID));
        assert!(xml.contains(HYBRID_QUERY_ID));
        assert_eq!(xml.matches("<wfs:StoredQuery").count(), 2);
    }

    #[test]
    fn surface_body_has_no_height_parameter() {
        let xml = sample_request(&[0]).to_xml().unwrap();
        assert!(!xml.contains(r#"name="height""#));

        let xml = sample_request(&[600]).to_xml().unwrap();
        assert!(xml.contains(r#"<wfs:Parameter name="height">600</wfs:Parameter>"#));
    }

    #[test]
    fn latlon_is_space_joined_inside_gml_pos() {
        let xml = sample_request(&[0]).to_xml().unwrap();
        assert!(xml.contains("<gml:pos>60.17 24.94</gml:pos>"));
    }
}
