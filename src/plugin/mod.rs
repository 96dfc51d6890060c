//! Defines the Bevy [Plugin] for vector fields
//!

use crate::prelude::*;
use bevy::prelude::*;

pub mod goal_layer;

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	/// Goal requests are turned into rebuilds
	Request,
	/// Staged builds are advanced
	Calculate,
}

pub struct VectorFieldPlugin;

impl Plugin for VectorFieldPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.register_type::<Ordinal>()
			.register_type::<Neighbourhood>()
			.register_type::<GridCell>()
			.register_type::<Occupancy>()
			.register_type::<GridMapping>()
			.register_type::<DirectionRule>()
			.register_type::<FlowFieldSettings>()
			.init_resource::<FlowFieldSettings>()
			.add_event::<goal_layer::EventSetGoal>()
			.add_event::<goal_layer::EventFieldRebuilt>()
			.configure_sets(Update, (OrderingSet::Request, OrderingSet::Calculate).chain())
			.add_systems(
				Update,
				(
					goal_layer::process_goal_requests.in_set(OrderingSet::Request),
					goal_layer::advance_staged_builds.in_set(OrderingSet::Calculate),
				),
			);
	}
}
