//! Wire and domain types shared by the engine, the browser bindings and the CLI.
//!
//! The server and the DOM dataset attributes use single-letter codes for the
//! three descriptor axes. They are parsed once into closed enums here; nothing
//! downstream compares letters.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{DashboardError, Result};

// =============================================================================
// Descriptor axes
// =============================================================================

/// Organizational scope the widget's data is filtered to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LocationType {
    Hospital,
    Ward,
    Room,
}

impl LocationType {
    pub const ALL: [LocationType; 3] = [Self::Hospital, Self::Ward, Self::Room];

    pub fn code(self) -> &'static str {
        match self {
            Self::Hospital => "H",
            Self::Ward => "W",
            Self::Room => "R",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "H" => Ok(Self::Hospital),
            "W" => Ok(Self::Ward),
            "R" => Ok(Self::Room),
            other => Err(DashboardError::UnknownCode {
                kind: "location",
                code: other.to_string(),
            }),
        }
    }

    /// Whether widgets of this scope carry a location selection.
    pub fn needs_selection(self) -> bool {
        !matches!(self, Self::Hospital)
    }
}

/// Which tier a location-list widget enumerates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListTier {
    Wards,
    Rooms,
}

/// Kind of visualization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ThemeType {
    Info,
    History,
    Beds,
    LocationList(ListTier),
}

impl ThemeType {
    pub const ALL: [ThemeType; 5] = [
        Self::Info,
        Self::History,
        Self::Beds,
        Self::LocationList(ListTier::Wards),
        Self::LocationList(ListTier::Rooms),
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Info => "I",
            Self::History => "H",
            Self::Beds => "B",
            Self::LocationList(ListTier::Wards) => "W",
            Self::LocationList(ListTier::Rooms) => "R",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "I" => Ok(Self::Info),
            "H" => Ok(Self::History),
            "B" => Ok(Self::Beds),
            "W" => Ok(Self::LocationList(ListTier::Wards)),
            "R" => Ok(Self::LocationList(ListTier::Rooms)),
            other => Err(DashboardError::UnknownCode {
                kind: "theme",
                code: other.to_string(),
            }),
        }
    }
}

/// Time mode of a widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeType {
    /// Single timestamp.
    Point,
    /// From/to range.
    Period,
    /// Current snapshot, refreshed periodically.
    Near,
}

impl TimeType {
    pub const ALL: [TimeType; 3] = [Self::Point, Self::Period, Self::Near];

    pub fn code(self) -> &'static str {
        match self {
            Self::Point => "T",
            Self::Period => "P",
            Self::Near => "N",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "T" => Ok(Self::Point),
            "P" => Ok(Self::Period),
            "N" => Ok(Self::Near),
            other => Err(DashboardError::UnknownCode {
                kind: "time",
                code: other.to_string(),
            }),
        }
    }
}

macro_rules! code_conversions {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = DashboardError;

                fn try_from(code: String) -> Result<Self> {
                    Self::from_code(&code)
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> String {
                    value.code().to_string()
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.code())
                }
            }
        )*
    };
}

code_conversions!(LocationType, ThemeType, TimeType);

// =============================================================================
// Identifiers
// =============================================================================

/// The server emits numeric primary keys while the DOM hands back strings.
fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

/// Server-assigned identifier of a user data representation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl<'de> Deserialize<'de> for WidgetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        flexible_id(deserializer).map(Self)
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a ward or room.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LocationId(String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for LocationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        flexible_id(deserializer).map(Self)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value of the disabled placeholder option shown when no location is selectable.
pub const EMPTY_SELECTION_VALUE: &str = "-1";

// =============================================================================
// Server payloads
// =============================================================================

/// A selectable ward or room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationOption {
    pub id: LocationId,
    #[serde(default)]
    pub name: String,
}

/// Options for a widget's scope-selection control plus the pre-selected entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationChoices {
    pub options: Vec<LocationOption>,
    pub selected: Option<LocationId>,
}

/// `data_representation` - the catalog entry a widget was created from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepresentationKind {
    pub location_type: LocationType,
    pub theme_type: ThemeType,
    pub time_type: TimeType,
}

/// `user_data_representation` - the persisted per-user widget record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepresentationRecord {
    pub id: WidgetId,
    #[serde(default)]
    pub order: usize,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub ward: Option<LocationId>,
    #[serde(default)]
    pub room: Option<LocationId>,
}

impl RepresentationRecord {
    /// The selected location for a widget of the given scope.
    pub fn selected_for(&self, location: LocationType) -> Option<&LocationId> {
        match location {
            LocationType::Hospital => None,
            LocationType::Ward => self.ward.as_ref(),
            LocationType::Room => self.room.as_ref(),
        }
    }
}

/// Body of `POST /create/user-data-representation`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub location_type: LocationType,
    pub theme_type: ThemeType,
    pub time_type: TimeType,
}

/// Response of `POST /create/user-data-representation`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateResponse {
    pub data_representation: RepresentationKind,
    pub user_data_representation: RepresentationRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<LocationOption>>,
}

/// Body of `DELETE /delete/user-data-representation`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub id: WidgetId,
}

/// One element of the `PUT /update/order` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub id: WidgetId,
    pub order: usize,
}

/// JSON response of `GET /get_data/...`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<LocationOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_representation: Option<RepresentationRecord>,
}

// =============================================================================
// Descriptor
// =============================================================================

/// Raw dataset attributes of a server-rendered widget node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetAttrs {
    pub id: Option<String>,
    pub location: Option<String>,
    pub theme: Option<String>,
    pub time: Option<String>,
    pub order: Option<String>,
}

/// Current values of a widget's input controls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WidgetInputs {
    pub selected_location: Option<String>,
    pub time: Option<String>,
    pub end_time: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DashboardError::InvalidArgument(format!("missing data-{} attribute", name)))
}

/// Identifies and configures one widget.
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetDescriptor {
    pub id: WidgetId,
    pub location: LocationType,
    pub theme: ThemeType,
    pub time_mode: TimeType,
    pub time: Option<String>,
    pub end_time: Option<String>,
    pub selected_location: Option<LocationId>,
    pub order: usize,
}

impl WidgetDescriptor {
    /// Descriptor for a widget the server just created.
    pub fn from_creation(kind: &RepresentationKind, record: &RepresentationRecord) -> Self {
        Self {
            id: record.id.clone(),
            location: kind.location_type,
            theme: kind.theme_type,
            time_mode: kind.time_type,
            time: non_empty(record.time.as_deref()),
            end_time: non_empty(record.end_time.as_deref()),
            selected_location: record.selected_for(kind.location_type).cloned(),
            order: record.order,
        }
    }

    /// Descriptor for a widget rendered into the page by the server.
    ///
    /// `data-order` is read here exactly once to seed the in-memory order.
    pub fn from_dataset(attrs: &DatasetAttrs, inputs: &WidgetInputs) -> Result<Self> {
        let id = WidgetId::new(required(&attrs.id, "id")?);
        let location = LocationType::from_code(required(&attrs.location, "location")?)?;
        let theme = ThemeType::from_code(required(&attrs.theme, "theme")?)?;
        let time_mode = TimeType::from_code(required(&attrs.time, "time")?)?;
        let order = match attrs.order.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse::<usize>().map_err(|_| {
                DashboardError::InvalidArgument(format!("data-order {:?} is not a position", raw))
            })?,
            _ => 0,
        };

        let mut descriptor = Self {
            id,
            location,
            theme,
            time_mode,
            time: None,
            end_time: None,
            selected_location: None,
            order,
        };
        descriptor.apply_inputs(inputs);
        Ok(descriptor)
    }

    /// Take over the values the user currently has in the input controls.
    pub fn apply_inputs(&mut self, inputs: &WidgetInputs) {
        self.time = non_empty(inputs.time.as_deref());
        self.end_time = non_empty(inputs.end_time.as_deref());
        self.selected_location = non_empty(inputs.selected_location.as_deref())
            .filter(|v| v != EMPTY_SELECTION_VALUE)
            .map(LocationId::new);
    }

    /// Take over the canonical record the server returned with a data response.
    pub fn apply_record(&mut self, record: &RepresentationRecord) {
        if let Some(time) = non_empty(record.time.as_deref()) {
            self.time = Some(time);
        }
        if let Some(end_time) = non_empty(record.end_time.as_deref()) {
            self.end_time = Some(end_time);
        }
        if self.location.needs_selection() {
            self.selected_location = record.selected_for(self.location).cloned();
        }
    }
}
