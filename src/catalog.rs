//! Catalog of data representations the server offers.
//!
//! Mirrors the representation table seeded on the server: every widget a
//! user can add is one of these (location, theme, time) triples. The
//! add-widget menu is built from it and creation requests are checked
//! against it before anything goes over the wire.

use crate::model::{ListTier, LocationType, RepresentationKind, ThemeType, TimeType};

use crate::model::LocationType::{Hospital, Room, Ward};
use crate::model::TimeType::{Near, Period, Point};

const WARD_LIST: ThemeType = ThemeType::LocationList(ListTier::Wards);
const ROOM_LIST: ThemeType = ThemeType::LocationList(ListTier::Rooms);

const fn kind(location_type: LocationType, theme_type: ThemeType, time_type: TimeType) -> RepresentationKind {
    RepresentationKind {
        location_type,
        theme_type,
        time_type,
    }
}

/// All creatable representations, in menu order.
pub const CATALOG: &[RepresentationKind] = &[
    kind(Hospital, ThemeType::Info, Point),
    kind(Hospital, ThemeType::Info, Near),
    kind(Hospital, ThemeType::Info, Period),
    kind(Ward, ThemeType::Info, Point),
    kind(Ward, ThemeType::Info, Near),
    kind(Ward, ThemeType::Info, Period),
    kind(Room, ThemeType::Info, Point),
    kind(Room, ThemeType::Info, Near),
    kind(Room, ThemeType::Info, Period),
    kind(Hospital, WARD_LIST, Point),
    kind(Hospital, WARD_LIST, Near),
    kind(Hospital, WARD_LIST, Period),
    kind(Hospital, ROOM_LIST, Point),
    kind(Hospital, ROOM_LIST, Near),
    kind(Hospital, ROOM_LIST, Period),
    kind(Hospital, ThemeType::Beds, Point),
    kind(Hospital, ThemeType::Beds, Near),
    kind(Hospital, ThemeType::Beds, Period),
    kind(Ward, ROOM_LIST, Point),
    kind(Ward, ROOM_LIST, Near),
    kind(Ward, ROOM_LIST, Period),
    kind(Ward, ThemeType::Beds, Point),
    kind(Ward, ThemeType::Beds, Near),
    kind(Ward, ThemeType::Beds, Period),
    kind(Room, ThemeType::Beds, Point),
    kind(Room, ThemeType::Beds, Near),
    kind(Room, ThemeType::Beds, Period),
    kind(Hospital, ThemeType::History, Period),
    kind(Ward, ThemeType::History, Period),
    kind(Room, ThemeType::History, Period),
];

/// Whether the server offers this combination.
pub fn is_offered(location: LocationType, theme: ThemeType, time: TimeType) -> bool {
    CATALOG
        .iter()
        .any(|k| k.location_type == location && k.theme_type == theme && k.time_type == time)
}
