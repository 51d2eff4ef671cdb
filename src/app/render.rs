//! Rendering strategies: turn a widget's data payload into view models.
//!
//! A strategy decides which skeleton a widget is mounted with and how the
//! `data` member of a `/get_data` response maps onto what the page draws.
//! Drawing itself (text, list rows, Chart.js) belongs to the [`Dom`]
//! implementation.
//!
//! [`Dom`]: super::dom::Dom

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{DashboardError, Result};
use crate::model::ListTier;

/// Timestamp format of history keys.
pub const HISTORY_KEY_FORMAT: &str = "%Y-%m-%dT%H:%M";
/// Timestamp format of history axis labels.
pub const HISTORY_LABEL_FORMAT: &str = "%d.%m.%Y %H:%M";

pub const SEGMENT_LABELS: [&str; 4] = ["Männlich", "Weiblich", "Divers", "Leer"];

// =============================================================================
// Strategies
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStrategy {
    /// Summary card of one room.
    RoomInfo,
    /// Doughnut of one ward or of the hospital aggregate.
    LocationInfo { hospital_aggregate: bool },
    /// Occupancy line over time.
    LocationHistory { hospital_aggregate: bool },
    BedsList,
    LocationsList(ListTier),
}

/// Static structure mounted into a widget before its first fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Skeleton {
    RoomSummary,
    InfoChart,
    HistoryChart,
    BedList,
    LocationList(ListTier),
}

impl Skeleton {
    /// Column head of a list skeleton.
    pub fn list_head(self) -> Option<&'static str> {
        match self {
            Self::LocationList(ListTier::Wards) => Some("Station"),
            Self::LocationList(ListTier::Rooms) => Some("Zimmer"),
            _ => None,
        }
    }
}

impl RenderStrategy {
    pub fn skeleton(self) -> Skeleton {
        match self {
            Self::RoomInfo => Skeleton::RoomSummary,
            Self::LocationInfo { .. } => Skeleton::InfoChart,
            Self::LocationHistory { .. } => Skeleton::HistoryChart,
            Self::BedsList => Skeleton::BedList,
            Self::LocationsList(tier) => Skeleton::LocationList(tier),
        }
    }

    pub fn render(self, data: &Value) -> Result<RenderedContent> {
        match self {
            Self::RoomInfo => render_room(data),
            Self::LocationInfo { hospital_aggregate } => render_location_info(data, hospital_aggregate),
            Self::LocationHistory { hospital_aggregate } => render_history(data, hospital_aggregate),
            Self::BedsList => render_beds(data),
            Self::LocationsList(tier) => render_locations(data, tier),
        }
    }
}

// =============================================================================
// View models
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum RenderedContent {
    Room(RoomSummary),
    Doughnut(DoughnutChart),
    History(HistorySeries),
    Beds(Vec<BedRow>),
    Locations { tier: ListTier, rows: Vec<LocationRow> },
    /// The server had no data for the current inputs; the data area is hidden.
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SexMarker {
    Male,
    Female,
    Diverse,
    Empty,
}

impl SexMarker {
    pub const ALL_CLASSES: [&'static str; 4] = [
        "male-rectangle",
        "female-rectangle",
        "diverse-rectangle",
        "empty-rectangle",
    ];

    fn of(figures: &OccupancyFigures) -> Self {
        if figures.number_of_men > 0.0 {
            Self::Male
        } else if figures.number_of_women > 0.0 {
            Self::Female
        } else if figures.number_of_diverse > 0.0 {
            Self::Diverse
        } else {
            Self::Empty
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Male => SEGMENT_LABELS[0],
            Self::Female => SEGMENT_LABELS[1],
            Self::Diverse => SEGMENT_LABELS[2],
            Self::Empty => SEGMENT_LABELS[3],
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Male => Self::ALL_CLASSES[0],
            Self::Female => Self::ALL_CLASSES[1],
            Self::Diverse => Self::ALL_CLASSES[2],
            Self::Empty => Self::ALL_CLASSES[3],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoomSummary {
    pub sex: SexMarker,
    pub average_age: String,
    pub occupancy: String,
    pub free_beds: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DoughnutChart {
    /// Men, women, diverse, free.
    pub segments: [f64; 4],
    /// `"number / max"`, drawn in the centre.
    pub centre: String,
    pub occupancy: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistorySeries {
    pub labels: Vec<String>,
    /// Occupancy percent per label; `None` is a gap.
    pub values: Vec<Option<f64>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BedRow {
    pub name: String,
    pub average_age: String,
    pub sex: SexMarker,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocationRow {
    pub name: String,
    pub occupancy: String,
    pub occupied: f64,
    pub free: f64,
}

// =============================================================================
// Payload parsing
// =============================================================================

/// Occupancy figures of one location or bed as the server reports them.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OccupancyFigures {
    pub name: Option<String>,
    pub number: f64,
    pub max_number: f64,
    pub number_of_men: f64,
    pub number_of_women: f64,
    pub number_of_diverse: f64,
    pub average_age: Option<f64>,
    /// Server-computed percentage; derived from the counts when absent.
    pub occupancy: Option<f64>,
}

impl OccupancyFigures {
    fn parse(value: &Value) -> Result<Self> {
        OccupancyFigures::deserialize(value)
            .map_err(|e| DashboardError::MalformedPayload(format!("occupancy figures: {}", e)))
    }

    pub fn occupancy_percent(&self) -> f64 {
        match self.occupancy {
            Some(p) => p,
            None if self.max_number > 0.0 => self.number / self.max_number * 100.0,
            None => 0.0,
        }
    }

    pub fn free(&self) -> f64 {
        (self.max_number - self.number).max(0.0)
    }

    fn name(&self) -> String {
        self.name.clone().unwrap_or_default()
    }

    fn average_age_text(&self) -> String {
        match self.average_age {
            Some(age) => format_count(age),
            None => "/".to_string(),
        }
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn as_list<'a>(data: &'a Value, what: &str) -> Result<&'a [Value]> {
    match data {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(&[]),
        other => Err(DashboardError::MalformedPayload(format!(
            "{} data should be a list, got {}",
            what,
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Strategy bodies
// =============================================================================

fn render_room(data: &Value) -> Result<RenderedContent> {
    let Some(first) = as_list(data, "room")?.first() else {
        return Ok(RenderedContent::Unavailable);
    };
    let room = OccupancyFigures::parse(first)?;

    Ok(RenderedContent::Room(RoomSummary {
        sex: SexMarker::of(&room),
        average_age: room.average_age_text(),
        occupancy: format_percent(room.occupancy_percent()),
        free_beds: format!(
            "{} von {}",
            format_count(room.free()),
            format_count(room.max_number)
        ),
    }))
}

fn render_location_info(data: &Value, hospital_aggregate: bool) -> Result<RenderedContent> {
    let single = if hospital_aggregate {
        match data {
            Value::Object(map) if map.is_empty() => return Ok(RenderedContent::Unavailable),
            Value::Object(_) => data,
            Value::Null => return Ok(RenderedContent::Unavailable),
            other => {
                return Err(DashboardError::MalformedPayload(format!(
                    "hospital data should be an object, got {}",
                    kind_of(other)
                )))
            }
        }
    } else {
        match as_list(data, "location")?.first() {
            Some(first) => first,
            None => return Ok(RenderedContent::Unavailable),
        }
    };
    let figures = OccupancyFigures::parse(single)?;

    Ok(RenderedContent::Doughnut(DoughnutChart {
        segments: [
            figures.number_of_men,
            figures.number_of_women,
            figures.number_of_diverse,
            figures.free(),
        ],
        centre: format!(
            "{} / {}",
            format_count(figures.number),
            format_count(figures.max_number)
        ),
        occupancy: format_percent(figures.occupancy_percent()),
    }))
}

fn render_history(data: &Value, hospital_aggregate: bool) -> Result<RenderedContent> {
    let samples = match data {
        Value::Object(map) => map,
        Value::Null => return Ok(RenderedContent::Unavailable),
        other => {
            return Err(DashboardError::MalformedPayload(format!(
                "history data should be an object keyed by time, got {}",
                kind_of(other)
            )))
        }
    };
    if samples.is_empty() {
        return Ok(RenderedContent::Unavailable);
    }

    let mut points = Vec::with_capacity(samples.len());
    for (key, sample) in samples {
        let at = NaiveDateTime::parse_from_str(key, HISTORY_KEY_FORMAT).map_err(|e| {
            DashboardError::MalformedPayload(format!("history key {:?}: {}", key, e))
        })?;

        // Ward and room samples are single-element lists.
        let sample = if hospital_aggregate {
            Some(sample)
        } else {
            sample.as_array().and_then(|items| items.first())
        };
        let value = match sample {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(sample) => Some(OccupancyFigures::parse(sample)?.occupancy_percent()),
        };
        points.push((at, value));
    }
    points.sort_by_key(|(at, _)| *at);

    Ok(RenderedContent::History(HistorySeries {
        labels: points
            .iter()
            .map(|(at, _)| at.format(HISTORY_LABEL_FORMAT).to_string())
            .collect(),
        values: points.into_iter().map(|(_, v)| v).collect(),
    }))
}

fn render_beds(data: &Value) -> Result<RenderedContent> {
    let rows = as_list(data, "bed")?
        .iter()
        .map(|item| {
            let bed = OccupancyFigures::parse(item)?;
            Ok(BedRow {
                name: bed.name(),
                average_age: bed.average_age_text(),
                sex: SexMarker::of(&bed),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RenderedContent::Beds(rows))
}

fn render_locations(data: &Value, tier: ListTier) -> Result<RenderedContent> {
    let rows = as_list(data, "location list")?
        .iter()
        .map(|item| {
            let location = OccupancyFigures::parse(item)?;
            Ok(LocationRow {
                name: location.name(),
                occupancy: format_percent(location.occupancy_percent()),
                occupied: location.number,
                free: location.free(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RenderedContent::Locations { tier, rows })
}
