//! Strategy dispatch and widget construction.

use std::rc::Rc;

use super::dom::{Dom, EventSink};
use super::render::RenderStrategy;
use super::widget::Widget;
use super::Context;
use crate::catalog;
use crate::error::{DashboardError, Result};
use crate::model::{
    ListTier, LocationChoices, LocationType, ThemeType, TimeType, WidgetDescriptor,
};

/// Pick the rendering strategy for a (location, theme) pair.
pub fn select_strategy(location: LocationType, theme: ThemeType) -> Result<RenderStrategy> {
    use LocationType::{Hospital, Room, Ward};

    let strategy = match (location, theme) {
        (Room, ThemeType::Info) => RenderStrategy::RoomInfo,
        (Hospital | Ward, ThemeType::Info) => RenderStrategy::LocationInfo {
            hospital_aggregate: location == Hospital,
        },
        (_, ThemeType::History) => RenderStrategy::LocationHistory {
            hospital_aggregate: location == Hospital,
        },
        (_, ThemeType::Beds) => RenderStrategy::BedsList,
        (Hospital, ThemeType::LocationList(ListTier::Wards)) => {
            RenderStrategy::LocationsList(ListTier::Wards)
        }
        (Hospital | Ward, ThemeType::LocationList(ListTier::Rooms)) => {
            RenderStrategy::LocationsList(ListTier::Rooms)
        }
        (Ward | Room, ThemeType::LocationList(ListTier::Wards))
        | (Room, ThemeType::LocationList(ListTier::Rooms)) => {
            return Err(DashboardError::UnsupportedCombination { location, theme })
        }
    };
    Ok(strategy)
}

/// Widget heading: theme label plus scope qualifier.
pub fn heading(location: LocationType, theme: ThemeType) -> String {
    let label = match theme {
        ThemeType::Info => "Informationen",
        ThemeType::History => "Auslastungsverlauf",
        ThemeType::Beds => "Betten",
        ThemeType::LocationList(ListTier::Wards) => "Stationen",
        ThemeType::LocationList(ListTier::Rooms) => "Zimmer",
    };
    let scope = match location {
        LocationType::Hospital => " des Krankenhauses",
        LocationType::Ward => " der Station",
        LocationType::Room => " des Zimmers",
    };
    format!("{}{}", label, scope)
}

/// Builds [`Widget`]s from server-rendered nodes or fresh server creations.
pub struct WidgetFactory<D: Dom> {
    ctx: Rc<Context<D>>,
}

impl<D: Dom> WidgetFactory<D> {
    pub fn new(ctx: Rc<Context<D>>) -> Self {
        Self { ctx }
    }

    /// Wrap an existing widget node.
    pub fn create_from_descriptor(
        &self,
        descriptor: WidgetDescriptor,
        node: D::Node,
        choices: Option<&LocationChoices>,
        sink: EventSink,
    ) -> Result<Widget<D>> {
        let strategy = select_strategy(descriptor.location, descriptor.theme)?;
        Widget::construct(self.ctx.clone(), node, descriptor, strategy, choices, sink)
    }

    /// Create a widget on the server, build its node and wrap it.
    ///
    /// Combinations outside the catalog are refused before any request.
    pub async fn create_from_server_creation(
        &self,
        location: LocationType,
        theme: ThemeType,
        time: TimeType,
        sink: EventSink,
    ) -> Result<Widget<D>> {
        if !catalog::is_offered(location, theme, time) {
            return Err(DashboardError::UnsupportedCombination { location, theme });
        }

        let created = self.ctx.api.create_widget(location, theme, time).await?;
        // Fail before touching the page if the server hands back a pair we can't draw.
        select_strategy(created.descriptor.location, created.descriptor.theme)?;

        let node = self
            .ctx
            .dom
            .create_widget_node(&self.ctx.templates, &created.descriptor)?;
        self.ctx.dom.scroll_into_view(&node);
        self.create_from_descriptor(created.descriptor, node.clone(), created.choices.as_ref(), sink)
            .inspect_err(|_| self.ctx.dom.remove_node(&node))
    }
}
