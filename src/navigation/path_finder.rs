//! A PathFinder answers path queries over the [NavGrid] of a single team.
//!
//! Searching is A* over the node graph. The heuristic is the straight line length of the
//! shortest (possibly seam crossing) node delta to the goal which never overestimates as every
//! edge costs at least its distance. When several nodes in the open set are equally promising the
//! one closer to the goal is expanded first, then the lowest node index, so identical queries
//! always give identical paths.
//!
//! The grid sits behind a read/write lock. Any number of searches may run at once on different
//! threads, patching the grid after a terrain change waits for them to finish and blocks new
//! searches until it is done.
//!

use std::{
	cmp::Ordering,
	collections::BinaryHeap,
	sync::{
		atomic::{AtomicBool, Ordering as AtomicOrdering},
		Arc,
	},
};

use bevy::prelude::*;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::prelude::*;

/// Number of node expansions between checks of the cancellation flag
const CANCEL_CHECK_INTERVAL: usize = 256;

/// A route through the scene
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
	/// Node centres from the start node to the end node, in scene coordinates
	waypoints: Vec<Vec2>,
	/// Sum of the costs of every edge taken
	total_cost: f32,
}

impl PathResult {
	/// Create a new instance of [PathResult]
	pub fn new(waypoints: Vec<Vec2>, total_cost: f32) -> Self {
		PathResult {
			waypoints,
			total_cost,
		}
	}
	pub fn get_waypoints(&self) -> &[Vec2] {
		&self.waypoints
	}
	pub fn get_total_cost(&self) -> f32 {
		self.total_cost
	}
	/// Take ownership of the waypoints
	pub fn into_waypoints(self) -> Vec<Vec2> {
		self.waypoints
	}
}

/// The answer to a path query
#[derive(Clone, Debug, PartialEq)]
pub enum PathOutcome {
	/// A route exists
	Found(PathResult),
	/// The start and end are not connected for this dig strength and team, this is an expected
	/// result and not worth retrying until the terrain changes
	NoPath,
	/// The query was abandoned before it finished
	Cancelled,
}

impl PathOutcome {
	pub fn is_found(&self) -> bool {
		matches!(self, PathOutcome::Found(_))
	}
	/// The route if one was found
	pub fn get_path(&self) -> Option<&PathResult> {
		match self {
			PathOutcome::Found(path) => Some(path),
			_ => None,
		}
	}
	/// Convert into the route if one was found
	pub fn into_path(self) -> Option<PathResult> {
		match self {
			PathOutcome::Found(path) => Some(path),
			_ => None,
		}
	}
}

/// Entry of the A* open set, ordered so that [BinaryHeap] pops the best node first
#[derive(Clone, Copy, Debug)]
struct OpenNode {
	/// Cost so far plus heuristic
	f: f32,
	/// Heuristic alone
	h: f32,
	/// Node index
	index: usize,
}

impl Ord for OpenNode {
	fn cmp(&self, other: &Self) -> Ordering {
		// reversed so the smallest f, then h, then index is the greatest
		other
			.f
			.total_cmp(&self.f)
			.then_with(|| other.h.total_cmp(&self.h))
			.then_with(|| other.index.cmp(&self.index))
	}
}

impl PartialOrd for OpenNode {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for OpenNode {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for OpenNode {}

/// Path searching for a single [Team]
#[derive(Debug)]
pub struct PathFinder {
	/// Team whose doors are baked into the grid
	team: Team,
	/// The searchable graph
	grid: RwLock<NavGrid>,
}

impl PathFinder {
	/// Create a new instance of [PathFinder] by building a [NavGrid] of the terrain
	pub fn new<T: TerrainQuery + ?Sized>(
		terrain: &T,
		settings: &NavigationSettings,
		cost_model: Arc<CostModel>,
		team: Team,
	) -> Self {
		let grid = NavGrid::build(terrain, settings, cost_model, team);
		PathFinder {
			team,
			grid: RwLock::new(grid),
		}
	}
	pub fn team(&self) -> Team {
		self.team
	}
	pub fn node_count(&self) -> usize {
		self.grid.read().node_count()
	}
	/// Shared access to the grid, patches wait until the guard is dropped
	pub fn read_grid(&self) -> RwLockReadGuard<'_, NavGrid> {
		self.grid.read()
	}
	/// Resample the nodes under a region of changed terrain, see [NavGrid::patch_region]
	pub fn patch_region<T: TerrainQuery + ?Sized>(&self, terrain: &T, rect: TerrainRect) -> usize {
		self.grid.write().patch_region(terrain, rect)
	}
	/// Resample the entire terrain
	pub fn rebuild<T: TerrainQuery + ?Sized>(&self, terrain: &T) {
		self.grid.write().rebuild(terrain);
	}
	/// Find the cheapest route between two scene positions for a requester able to dig through
	/// `dig_strength` worth of material resistance. Positions off the terrain are wrapped or
	/// clamped onto it
	pub fn find_path(&self, start: Vec2, end: Vec2, dig_strength: f32) -> Option<PathResult> {
		self.find_path_cancellable(start, end, dig_strength, &AtomicBool::new(false))
			.into_path()
	}
	/// Variant of [PathFinder::find_path] which gives up with [PathOutcome::Cancelled] once
	/// `cancel` is raised
	pub fn find_path_cancellable(
		&self,
		start: Vec2,
		end: Vec2,
		dig_strength: f32,
		cancel: &AtomicBool,
	) -> PathOutcome {
		if cancel.load(AtomicOrdering::Acquire) {
			return PathOutcome::Cancelled;
		}
		let grid = self.grid.read();
		let (Some(source), Some(goal)) = (grid.snap(start), grid.snap(end)) else {
			return PathOutcome::NoPath;
		};
		if source == goal {
			return PathOutcome::Found(PathResult::new(vec![grid.node_centre(source)], 0.0));
		}
		if grid.get_nodes()[source].is_blocked() || grid.get_nodes()[goal].is_blocked() {
			return PathOutcome::NoPath;
		}
		astar(&grid, source, goal, dig_strength, cancel)
	}
}

/// One [PathFinder] per team, indexed by [Team::slot], with the shared solver for requests made
/// without a team in slot `0`
#[derive(Debug)]
pub struct PathFinderSet(Vec<Arc<PathFinder>>);

impl PathFinderSet {
	/// Build a [PathFinder] for the shared slot and for each of the `max_teams` teams
	pub fn new<T: TerrainQuery + ?Sized>(
		terrain: &T,
		settings: &NavigationSettings,
		cost_model: Arc<CostModel>,
	) -> Self {
		let path_finders = (0..settings.get_path_finder_count())
			.map(|slot| {
				Arc::new(PathFinder::new(
					terrain,
					settings,
					cost_model.clone(),
					Team::from_slot(slot),
				))
			})
			.collect();
		info!(
			"Built navigation of {}x{} terrain for {} teams",
			terrain.width(),
			terrain.height(),
			settings.get_max_teams()
		);
		PathFinderSet(path_finders)
	}
	/// The solver of a team. A team without its own solver is served by the shared one
	pub fn get(&self, team: Team) -> &Arc<PathFinder> {
		let slot = team.slot();
		if slot < self.0.len() {
			&self.0[slot]
		} else {
			warn!(
				"{:?} is beyond the {} configured teams, using the shared path finder",
				team,
				self.0.len() - 1
			);
			&self.0[0]
		}
	}
	pub fn get_all(&self) -> &[Arc<PathFinder>] {
		&self.0
	}
	/// Resample the entire terrain for every team
	pub fn rebuild<T: TerrainQuery + ?Sized>(&self, terrain: &T) {
		for path_finder in self.0.iter() {
			path_finder.rebuild(terrain);
		}
		info!(
			"Rebuilt navigation of {}x{} terrain",
			terrain.width(),
			terrain.height()
		);
	}
}

/// Straight line estimate of the cost from a node to the goal
fn heuristic(grid: &NavGrid, from: usize, goal_cell: IVec2) -> f32 {
	let cell = grid.get_nodes()[from].get_cell();
	let delta = grid.get_node_wrap().shortest_cell_delta(cell, goal_cell);
	delta.as_vec2().length() * grid.get_node_size() as f32
}

/// Search the grid for the cheapest route from `source` to `goal`
fn astar(
	grid: &NavGrid,
	source: usize,
	goal: usize,
	dig_strength: f32,
	cancel: &AtomicBool,
) -> PathOutcome {
	let nodes = grid.get_nodes();
	let cost_model = grid.get_cost_model();
	let goal_cell = nodes[goal].get_cell();
	let mut g_score = vec![f32::INFINITY; nodes.len()];
	let mut came_from = vec![usize::MAX; nodes.len()];
	let mut closed = vec![false; nodes.len()];
	let mut open = BinaryHeap::new();
	let h = heuristic(grid, source, goal_cell);
	g_score[source] = 0.0;
	open.push(OpenNode {
		f: h,
		h,
		index: source,
	});
	let mut expansions = 0;
	while let Some(current) = open.pop() {
		if closed[current.index] {
			continue;
		}
		if current.index == goal {
			return PathOutcome::Found(reconstruct_path(grid, &came_from, goal, g_score[goal]));
		}
		closed[current.index] = true;
		expansions += 1;
		if expansions % CANCEL_CHECK_INTERVAL == 0 && cancel.load(AtomicOrdering::Acquire) {
			return PathOutcome::Cancelled;
		}
		for edge in nodes[current.index].get_edges().iter() {
			let target = edge.get_target();
			if closed[target] {
				continue;
			}
			let EdgeCost::Passable(cost) = edge.cost(cost_model, dig_strength) else {
				continue;
			};
			let tentative = g_score[current.index] + cost;
			if tentative < g_score[target] {
				g_score[target] = tentative;
				came_from[target] = current.index;
				let h = heuristic(grid, target, goal_cell);
				open.push(OpenNode {
					f: tentative + h,
					h,
					index: target,
				});
			}
		}
	}
	PathOutcome::NoPath
}

/// Walk back from the goal to the start collecting node centres
fn reconstruct_path(grid: &NavGrid, came_from: &[usize], goal: usize, total_cost: f32) -> PathResult {
	let mut indices = vec![goal];
	let mut current = goal;
	while came_from[current] != usize::MAX {
		current = came_from[current];
		indices.push(current);
	}
	indices.reverse();
	let waypoints = indices.iter().map(|i| grid.node_centre(*i)).collect();
	PathResult::new(waypoints, total_cost)
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// Create a solver over some terrain with default settings
	fn path_finder(terrain: &MaterialGrid, team: Team) -> PathFinder {
		let settings = NavigationSettings::default();
		PathFinder::new(terrain, &settings, Arc::new(CostModel::from_settings(&settings)), team)
	}
	#[test]
	fn open_node_order() {
		let mut open = BinaryHeap::new();
		open.push(OpenNode { f: 5.0, h: 1.0, index: 3 });
		open.push(OpenNode { f: 4.0, h: 2.0, index: 7 });
		open.push(OpenNode { f: 4.0, h: 1.0, index: 9 });
		open.push(OpenNode { f: 4.0, h: 1.0, index: 2 });
		let result: Vec<usize> = std::iter::from_fn(|| open.pop().map(|n| n.index)).collect();
		let actual = vec![2, 9, 7, 3];
		assert_eq!(actual, result);
	}
	#[test]
	fn straight_line() {
		let terrain = MaterialGrid::new(10, 1, false, false);
		let solver = path_finder(&terrain, Team::NoTeam);
		let result = solver.find_path(Vec2::new(0.0, 0.0), Vec2::new(9.0, 0.0), 0.0).unwrap();
		assert_eq!(10, result.get_waypoints().len());
		assert_eq!(9.0, result.get_total_cost());
		assert_eq!(Vec2::new(0.5, 0.5), result.get_waypoints()[0]);
		assert_eq!(Vec2::new(9.5, 0.5), result.get_waypoints()[9]);
	}
	#[test]
	fn same_node() {
		let mut terrain = MaterialGrid::new(4, 4, false, false);
		terrain.set_material(1, 1, MaterialId::INDESTRUCTIBLE);
		let solver = path_finder(&terrain, Team::NoTeam);
		let result = solver.find_path(Vec2::new(1.2, 1.2), Vec2::new(1.8, 1.9), 0.0).unwrap();
		let actual = PathResult::new(vec![Vec2::new(1.5, 1.5)], 0.0);
		assert_eq!(actual, result);
	}
	#[test]
	fn blocked_goal() {
		let mut terrain = MaterialGrid::new(4, 4, false, false);
		terrain.set_material(3, 3, MaterialId::INDESTRUCTIBLE);
		let solver = path_finder(&terrain, Team::NoTeam);
		let result = solver.find_path(Vec2::ZERO, Vec2::new(3.5, 3.5), 1000.0);
		assert_eq!(None, result);
	}
	#[test]
	fn wraps_across_seam() {
		let terrain = MaterialGrid::new(20, 1, true, false);
		let solver = path_finder(&terrain, Team::NoTeam);
		let result = solver.find_path(Vec2::new(1.0, 0.0), Vec2::new(18.0, 0.0), 0.0).unwrap();
		// 1 -> 0 -> 19 -> 18
		assert_eq!(3.0, result.get_total_cost());
		assert_eq!(4, result.get_waypoints().len());
		assert_eq!(Vec2::new(19.5, 0.5), result.get_waypoints()[2]);
	}
	#[test]
	fn digs_when_cheaper_than_detour() {
		let mut terrain = MaterialGrid::new(5, 3, false, false);
		terrain.fill_rect(TerrainRect::new(2, 0, 1, 3), MaterialId(10));
		let solver = path_finder(&terrain, Team::NoTeam);
		assert_eq!(None, solver.find_path(Vec2::new(0.5, 1.5), Vec2::new(4.5, 1.5), 5.0));
		let result = solver.find_path(Vec2::new(0.5, 1.5), Vec2::new(4.5, 1.5), 10.0).unwrap();
		// two edges touch the wall, each costing 1 + 10 * 0.1
		assert!((result.get_total_cost() - 6.0).abs() < 1e-5);
	}
	#[test]
	fn door_routes_per_team() {
		let mut terrain = MaterialGrid::new(5, 3, false, false);
		terrain.fill_rect(TerrainRect::new(2, 0, 1, 3), MaterialId::INDESTRUCTIBLE);
		terrain.set_material(2, 1, MaterialId::AIR);
		terrain.set_door(2, 1, TeamMask::single(0));
		let start = Vec2::new(0.5, 1.5);
		let end = Vec2::new(4.5, 1.5);
		assert!(path_finder(&terrain, Team::Id(0)).find_path(start, end, 0.0).is_some());
		assert!(path_finder(&terrain, Team::Id(1)).find_path(start, end, 0.0).is_none());
		assert!(path_finder(&terrain, Team::NoTeam).find_path(start, end, 0.0).is_none());
	}
	#[test]
	fn cancelled_before_start() {
		let terrain = MaterialGrid::new(10, 10, false, false);
		let solver = path_finder(&terrain, Team::NoTeam);
		let cancel = AtomicBool::new(true);
		let result = solver.find_path_cancellable(Vec2::ZERO, Vec2::new(9.0, 9.0), 0.0, &cancel);
		assert_eq!(PathOutcome::Cancelled, result);
	}
	#[test]
	fn degenerate_terrain() {
		let terrain = MaterialGrid::new(0, 0, false, false);
		let solver = path_finder(&terrain, Team::NoTeam);
		assert_eq!(0, solver.node_count());
		assert_eq!(None, solver.find_path(Vec2::ZERO, Vec2::ONE, 0.0));
	}
	#[test]
	fn set_slots_and_fallback() {
		let terrain = MaterialGrid::new(4, 4, false, false);
		let settings = NavigationSettings::default().with_max_teams(2);
		let set = PathFinderSet::new(&terrain, &settings, Arc::new(CostModel::default()));
		assert_eq!(3, set.get_all().len());
		assert_eq!(Team::NoTeam, set.get(Team::NoTeam).team());
		assert_eq!(Team::Id(1), set.get(Team::Id(1)).team());
		assert_eq!(Team::NoTeam, set.get(Team::Id(5)).team());
	}
	#[test]
	fn patch_opens_route() {
		let mut terrain = MaterialGrid::new(5, 3, false, false);
		terrain.fill_rect(TerrainRect::new(2, 0, 1, 3), MaterialId::INDESTRUCTIBLE);
		let solver = path_finder(&terrain, Team::NoTeam);
		let start = Vec2::new(0.5, 1.5);
		let end = Vec2::new(4.5, 1.5);
		assert!(solver.find_path(start, end, 0.0).is_none());
		let tunnel = TerrainRect::cell(2, 1);
		terrain.fill_rect(tunnel, MaterialId::AIR);
		solver.patch_region(&terrain, tunnel);
		let result = solver.find_path(start, end, 0.0).unwrap();
		assert_eq!(4.0, result.get_total_cost());
	}
}
