//! Logic relating to goal changes and rebuilding the fields of each
//! [FlowFieldService]
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Where a requested goal lies
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GoalTarget {
	/// A cell of the grid
	Cell(GridCell),
	/// A world position, converted with the mapping of each grid
	World(Vec2),
}

/// Request that every [FlowFieldService] steers toward a new goal. When
/// several are sent within a tick only the last one is processed
#[derive(Event, Clone, Copy, Debug)]
pub struct EventSetGoal {
	/// The goal to path toward
	target: GoalTarget,
}

impl EventSetGoal {
	/// Create a new instance of [EventSetGoal] from a grid cell
	pub fn from_cell(goal: GridCell) -> Self {
		EventSetGoal {
			target: GoalTarget::Cell(goal),
		}
	}
	/// Create a new instance of [EventSetGoal] from a world position, such as the translation of a target's transform
	pub fn from_world(position: Vec2) -> Self {
		EventSetGoal {
			target: GoalTarget::World(position),
		}
	}
	/// Where the requested goal lies
	pub fn get_target(&self) -> GoalTarget {
		self.target
	}
}

/// Emitted once the live fields of a [FlowFieldService] have been replaced,
/// observers can read a consistent snapshot from the service afterwards
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct EventFieldRebuilt {
	/// Entity holding the rebuilt service
	entity: Entity,
	/// Goal the fields were built for
	goal: Option<GridCell>,
	/// Whether the goal was usable
	is_valid: bool,
}

impl EventFieldRebuilt {
	/// Create a new instance of [EventFieldRebuilt]
	pub fn new(entity: Entity, goal: Option<GridCell>, is_valid: bool) -> Self {
		EventFieldRebuilt {
			entity,
			goal,
			is_valid,
		}
	}
	/// Entity holding the rebuilt service
	pub fn get_entity(&self) -> Entity {
		self.entity
	}
	/// Goal the fields were built for
	pub fn get_goal(&self) -> Option<GridCell> {
		self.goal
	}
	/// Whether the goal was usable
	pub fn is_valid(&self) -> bool {
		self.is_valid
	}
}

/// Controls how rebuilds are scheduled
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
#[reflect(Resource)]
pub struct FlowFieldSettings {
	/// Maximum number of cells the flood fill expands each tick. [None]
	/// rebuilds both fields within the tick the goal arrives
	flood_cells_per_tick: Option<usize>,
}

impl FlowFieldSettings {
	/// Create a new instance of [FlowFieldSettings]. A budget of zero would never finish a build and is treated as one
	pub fn new(flood_cells_per_tick: Option<usize>) -> Self {
		FlowFieldSettings {
			flood_cells_per_tick: flood_cells_per_tick.map(|n| n.max(1)),
		}
	}
	/// Per tick flood budget, [None] when rebuilds are synchronous
	pub fn get_flood_cells_per_tick(&self) -> Option<usize> {
		self.flood_cells_per_tick
	}
	/// From a `ron` file generate the [FlowFieldSettings]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: &str) -> Result<Self, FlowFieldError> {
		let file = std::fs::File::open(path)?;
		let settings: FlowFieldSettings = ron::de::from_reader(file)?;
		Ok(FlowFieldSettings::new(settings.flood_cells_per_tick))
	}
}

/// Resolve a requested goal against the grid of a service
fn resolve_goal(target: GoalTarget, grid: &OccupancyGrid) -> Result<GridCell, FlowFieldError> {
	match target {
		GoalTarget::Cell(cell) => Ok(cell),
		GoalTarget::World(position) => grid.get_cell_from_world(position),
	}
}

/// Apply the latest [EventSetGoal] to every [FlowFieldService], either
/// rebuilding straight away or staging a time-sliced build
#[cfg(not(tarpaulin_include))]
pub fn process_goal_requests(
	mut events: EventReader<EventSetGoal>,
	mut service_q: Query<(Entity, &mut FlowFieldService)>,
	settings: Res<FlowFieldSettings>,
	mut rebuilt: EventWriter<EventFieldRebuilt>,
) {
	// several goals may arrive within one tick, only the freshest matters
	let Some(event) = events.read().last() else {
		return;
	};
	for (entity, mut service) in service_q.iter_mut() {
		let goal = match resolve_goal(event.get_target(), service.get_grid()) {
			Ok(goal) => goal,
			Err(e) => {
				error!("Ignoring goal request for {:?}: {}", entity, e);
				continue;
			}
		};
		match settings.get_flood_cells_per_tick() {
			Some(_) => {
				debug!("Staging flow field build toward {:?} for {:?}", goal, entity);
				service.begin_goal(goal);
			}
			None => {
				service.set_goal(goal);
				rebuilt.write(EventFieldRebuilt::new(
					entity,
					service.get_goal(),
					service.is_field_valid(),
				));
			}
		}
	}
}

/// Step any staged builds by the per tick budget, announcing each one that completes
#[cfg(not(tarpaulin_include))]
pub fn advance_staged_builds(
	mut service_q: Query<(Entity, &mut FlowFieldService)>,
	settings: Res<FlowFieldSettings>,
	mut rebuilt: EventWriter<EventFieldRebuilt>,
) {
	let budget = settings.get_flood_cells_per_tick().unwrap_or(usize::MAX);
	for (entity, mut service) in service_q.iter_mut() {
		if !service.is_building() {
			continue;
		}
		if service.advance(budget) {
			rebuilt.write(EventFieldRebuilt::new(
				entity,
				service.get_goal(),
				service.is_field_valid(),
			));
		}
	}
}
