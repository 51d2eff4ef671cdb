//! Query construction for `GET /get_data/{L}/{T}/{Ti}/`.

use crate::error::{DashboardError, Result};
use crate::model::{LocationId, LocationType, ThemeType, TimeType, WidgetDescriptor, WidgetId};

/// Everything the server needs to answer one widget data request.
#[derive(Clone, Debug, PartialEq)]
pub struct DataQuery {
    pub id: WidgetId,
    pub location: LocationType,
    pub theme: ThemeType,
    pub time_mode: TimeType,
    /// Ask the server to persist the inputs and return refreshed location options.
    pub update_inputs: bool,
    /// Ask for a CSV attachment instead of JSON.
    pub download: bool,
    pub location_id: Option<LocationId>,
    pub time: Option<String>,
    pub end_time: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl DataQuery {
    /// Build the query for a widget's current descriptor.
    ///
    /// Fails with `InvalidArgument` when an identifier or time value the
    /// widget's mode requires is missing. Nothing is sent in that case.
    pub fn for_descriptor(
        descriptor: &WidgetDescriptor,
        update_inputs: bool,
        download: bool,
    ) -> Result<Self> {
        if descriptor.id.is_blank() {
            return Err(DashboardError::InvalidArgument(
                "widget has no identifier".to_string(),
            ));
        }

        let location_id = if descriptor.location.needs_selection() {
            match &descriptor.selected_location {
                Some(id) if !id.as_str().trim().is_empty() => Some(id.clone()),
                _ => {
                    return Err(DashboardError::InvalidArgument(format!(
                        "widget {} has no selected location",
                        descriptor.id
                    )))
                }
            }
        } else {
            None
        };

        let (time, end_time) = match descriptor.time_mode {
            TimeType::Point => {
                let time = present(&descriptor.time).ok_or_else(|| {
                    DashboardError::InvalidArgument(format!(
                        "widget {} has no given time",
                        descriptor.id
                    ))
                })?;
                (Some(time.to_string()), None)
            }
            TimeType::Period => match (present(&descriptor.time), present(&descriptor.end_time)) {
                (Some(from), Some(to)) => (Some(from.to_string()), Some(to.to_string())),
                _ => {
                    return Err(DashboardError::InvalidArgument(format!(
                        "widget {} has no given time for from or to",
                        descriptor.id
                    )))
                }
            },
            TimeType::Near => (None, None),
        };

        Ok(Self {
            id: descriptor.id.clone(),
            location: descriptor.location,
            theme: descriptor.theme,
            time_mode: descriptor.time_mode,
            update_inputs,
            download,
            location_id,
            time,
            end_time,
        })
    }

    pub fn path(&self) -> String {
        format!(
            "/get_data/{}/{}/{}/",
            self.location.code(),
            self.theme.code(),
            self.time_mode.code()
        )
    }

    /// Query parameters in wire order, not yet percent-encoded.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("id", self.id.to_string()),
            ("update_flag", self.update_inputs.to_string()),
            ("download", self.download.to_string()),
        ];
        if let Some(location_id) = &self.location_id {
            pairs.push(("location_id", location_id.to_string()));
        }
        if let Some(time) = &self.time {
            pairs.push(("time", time.clone()));
        }
        if let Some(end_time) = &self.end_time {
            pairs.push(("end_time", end_time.clone()));
        }
        pairs
    }

    pub fn query_string(&self) -> String {
        self.pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Full URL below `root` (empty root gives a same-origin relative URL).
    pub fn url(&self, root: &str) -> String {
        format!("{}{}?{}", root, self.path(), self.query_string())
    }
}
