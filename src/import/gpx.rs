//! Streaming GPX reader.
//!
//! Builds a loose document tree of tracks and routes without interpreting the
//! coordinates, so that one bad `lat`/`lon` attribute only costs its own point
//! during validation instead of the whole file.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum GpxParseError {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error("Unexpected end of document inside <{0}>")]
    UnexpectedEof(String),
}

/// A point exactly as it appears in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPoint {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub ele: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawTrack {
    pub name: Option<String>,
    pub segments: Vec<Vec<RawPoint>>,
}

#[derive(Debug, Clone, Default)]
pub struct RawRoute {
    pub name: Option<String>,
    pub points: Vec<RawPoint>,
}

#[derive(Debug, Clone, Default)]
pub struct GpxDocument {
    /// Local name of the root element, `gpx` for a real GPX file
    pub root: Option<String>,
    pub metadata_name: Option<String>,
    pub tracks: Vec<RawTrack>,
    pub routes: Vec<RawRoute>,
}

impl GpxDocument {
    /// First `<name>` found: metadata, then tracks, then routes.
    pub fn name(&self) -> Option<&str> {
        self.metadata_name
            .as_deref()
            .or_else(|| self.tracks.iter().find_map(|t| t.name.as_deref()))
            .or_else(|| self.routes.iter().find_map(|r| r.name.as_deref()))
            .filter(|name| !name.trim().is_empty())
    }
}

#[instrument(skip(content), fields(bytes = content.len()))]
pub fn read_document(content: &str) -> Result<GpxDocument, GpxParseError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut document = GpxDocument::default();
    // Local names of the currently open elements
    let mut open: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = local_name(&e);
                start_element(&mut document, &open, &tag, &e)?;
                open.push(tag);
            }
            Event::Empty(e) => {
                let tag = local_name(&e);
                start_element(&mut document, &open, &tag, &e)?;
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                element_text(&mut document, &open, &text);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                element_text(&mut document, &open, &text);
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(tag) = open.pop() {
        return Err(GpxParseError::UnexpectedEof(tag));
    }
    debug!(
        tracks = document.tracks.len(),
        routes = document.routes.len(),
        "read gpx document"
    );
    Ok(document)
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn start_element(
    document: &mut GpxDocument,
    open: &[String],
    tag: &str,
    e: &BytesStart,
) -> Result<(), GpxParseError> {
    if open.is_empty() {
        document.root.get_or_insert_with(|| tag.to_owned());
        return Ok(());
    }
    let parent = open.last().map(String::as_str);
    match (parent, tag) {
        (Some("gpx"), "trk") => document.tracks.push(RawTrack::default()),
        (Some("gpx"), "rte") => document.routes.push(RawRoute::default()),
        (Some("trk"), "trkseg") => {
            if let Some(track) = document.tracks.last_mut() {
                track.segments.push(Vec::new());
            }
        }
        (Some("trkseg"), "trkpt") => {
            let point = raw_point(e)?;
            if let Some(segment) = document
                .tracks
                .last_mut()
                .and_then(|t| t.segments.last_mut())
            {
                segment.push(point);
            }
        }
        (Some("rte"), "rtept") => {
            let point = raw_point(e)?;
            if let Some(route) = document.routes.last_mut() {
                route.points.push(point);
            }
        }
        _ => {}
    }
    Ok(())
}

fn raw_point(e: &BytesStart) -> Result<RawPoint, GpxParseError> {
    let mut point = RawPoint::default();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        match attr.key.local_name().as_ref() {
            b"lat" => point.lat = Some(attr.unescape_value()?.into_owned()),
            b"lon" => point.lon = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }
    Ok(point)
}

fn element_text(document: &mut GpxDocument, open: &[String], text: &str) {
    let (Some(tag), Some(parent)) = (open.last(), open.len().checked_sub(2).map(|i| &open[i]))
    else {
        return;
    };
    match (parent.as_str(), tag.as_str()) {
        ("metadata", "name") => document.metadata_name = Some(text.to_owned()),
        ("trk", "name") => {
            if let Some(track) = document.tracks.last_mut() {
                track.name = Some(text.to_owned());
            }
        }
        ("rte", "name") => {
            if let Some(route) = document.routes.last_mut() {
                route.name = Some(text.to_owned());
            }
        }
        ("trkpt", "ele") => {
            if let Some(point) = document
                .tracks
                .last_mut()
                .and_then(|t| t.segments.last_mut())
                .and_then(|s| s.last_mut())
            {
                point.ele = Some(text.to_owned());
            }
        }
        ("rtept", "ele") => {
            if let Some(point) = document
                .routes
                .last_mut()
                .and_then(|r| r.points.last_mut())
            {
                point.ele = Some(text.to_owned());
            }
        }
        _ => {}
    }
}
