//! A handful of chasers steer across a walled map toward a goal without any
//! rendering, their progress is logged each second of simulated time
//!
//! ```text
//!  ________________________________________
//! |  |  |  |  |  |  |  |xx|  |  |  |  |  |G |
//! |  |  |  |  |  |  |  |xx|  |  |  |  |  |  |
//! |  |  |  |  |  |  |  |xx|  |  |xx|  |  |  |
//! |c |  |  |  |  |  |  |xx|  |  |xx|  |  |  |
//! |c |  |  |  |  |  |  |  |  |  |xx|  |  |  |
//! |c |  |  |  |  |  |  |  |  |  |xx|  |  |  |
//! ```
//!

use std::time::Duration;

use bevy::{log::LogPlugin, prelude::*, time::TimeUpdateStrategy};
use bevy_vector_field_plugin::prelude::*;

/// World units per cell
const CELL_SIZE: f32 = 16.0;
/// Simulated time per update
const STEP: Duration = Duration::from_millis(50);

fn main() {
	let mut app = App::new();
	app.add_plugins((MinimalPlugins, LogPlugin::default(), VectorFieldPlugin))
		.insert_resource(TimeUpdateStrategy::ManualDuration(STEP))
		.add_systems(Startup, (setup_map, spawn_chasers))
		.add_systems(Update, (steer_chasers, report).after(OrderingSet::Calculate));
	// drive the schedule by hand rather than through the runner loop
	app.finish();
	app.cleanup();
	for _ in 0..400 {
		app.update();
	}
}

/// An actor moving along the field
#[derive(Component)]
struct Chaser {
	/// World units per second
	speed: f32,
	/// Set once the goal cell is reached
	arrived: bool,
}

/// Build the grid, spawn the service and ask for a goal in the top right
fn setup_map(mut cmds: Commands, mut goal_writer: EventWriter<EventSetGoal>) {
	let mut layers = TileLayers::new((0, 0), (14, 6));
	layers.fill_ground();
	for y in 2..6 {
		layers.add_obstacle((7, y));
	}
	for y in 0..4 {
		layers.add_obstacle((10, y));
	}
	let mapping = GridMapping::new(Vec2::new(-7.0 * CELL_SIZE, -3.0 * CELL_SIZE), CELL_SIZE);
	let grid = OccupancyGrid::from_source(&layers, mapping);
	let goal = grid.get_world_from_cell(GridCell::new(13, 5));
	cmds.spawn(FlowFieldService::new(grid));
	goal_writer.write(EventSetGoal::from_world(goal));
}

/// Chasers start stacked in the left most column
fn spawn_chasers(mut cmds: Commands) {
	for row in 0..3 {
		let x = -7.0 * CELL_SIZE + CELL_SIZE / 2.0;
		let y = -3.0 * CELL_SIZE + CELL_SIZE * (row as f32 + 0.5);
		cmds.spawn((
			Chaser {
				speed: 24.0 + 8.0 * row as f32,
				arrived: false,
			},
			Transform::from_xyz(x, y, 0.0),
		));
	}
}

/// Move each chaser along the direction of the cell it stands in
fn steer_chasers(
	service_q: Query<&FlowFieldService>,
	mut chaser_q: Query<(&mut Chaser, &mut Transform)>,
	time: Res<Time>,
) {
	let Ok(service) = service_q.single() else {
		return;
	};
	if !service.is_field_valid() {
		return;
	}
	for (mut chaser, mut tform) in chaser_q.iter_mut() {
		if chaser.arrived {
			continue;
		}
		let position = tform.translation.truncate();
		match service.get_grid().get_cell_from_world(position) {
			Ok(cell) if Some(cell) == service.get_goal() => {
				chaser.arrived = true;
				continue;
			}
			Ok(_) => {}
			Err(e) => {
				warn!("Chaser left the map: {}", e);
				chaser.arrived = true;
				continue;
			}
		}
		if let Ok(direction) = service.query_direction(position) {
			let velocity = direction * chaser.speed * time.delta_secs();
			tform.translation += velocity.extend(0.0);
		}
	}
}

/// Log chaser positions every second of simulated time
fn report(chaser_q: Query<(Entity, &Chaser, &Transform)>, time: Res<Time>, mut ticks: Local<u32>) {
	*ticks += 1;
	if *ticks % 20 != 0 {
		return;
	}
	for (entity, chaser, tform) in chaser_q.iter() {
		info!(
			"{:.1}s {:?} at ({:.1}, {:.1}) arrived: {}",
			time.elapsed_secs(),
			entity,
			tform.translation.x,
			tform.translation.y,
			chaser.arrived
		);
	}
}
