//! The NavGrid is the graph a [PathFinder] searches. It samples the material bitmap of a scene
//! into square nodes of `node_size` pixels and links each node to its (up to) 8 neighbours.
//!
//! A node is governed by the most resistant material found in its block of pixels, so a single
//! pixel of rock makes the whole node rock. Door pixels don't count towards the governing
//! material, instead the node remembers the teams allowed through all of its door pixels.
//!
//! An edge is priced from every node the move touches. For diagonal moves that includes the two
//! nodes whose corners are cut which stops paths from squeezing between two solid nodes:
//!
//! ```text
//!  _____ _____
//! |     |     |
//! | air | rock|      a diagonal from the bottom left to the top right
//! |_____|_____|      touches both rock nodes so is priced as rock
//! |     |     |
//! | rock| air |
//! |_____|_____|
//! ```
//!
//! Door permissions are resolved for the team owning the grid while linking, so each team's grid
//! holds its own answer to whether a door opens.
//!

use std::sync::Arc;

use bevy::prelude::*;

use crate::prelude::*;

/// A move from one node to a neighbour
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavEdge {
	/// Index of the neighbouring node
	target: usize,
	/// Length of the move in scene units
	distance: f32,
	/// Most resistant non-door material touched by the move
	material: MaterialId,
	/// If the move touches a door, whether it opens for the team owning the grid
	door: Option<bool>,
}

impl NavEdge {
	pub fn get_target(&self) -> usize {
		self.target
	}
	pub fn get_distance(&self) -> f32 {
		self.distance
	}
	pub fn get_material(&self) -> MaterialId {
		self.material
	}
	pub fn get_door(&self) -> Option<bool> {
		self.door
	}
	/// Price the edge for a requester with `dig_strength`
	pub fn cost(&self, cost_model: &CostModel, dig_strength: f32) -> EdgeCost {
		cost_model.edge_cost(
			self.material,
			self.distance,
			dig_strength,
			self.door.is_some(),
			self.door.unwrap_or(true),
		)
	}
}

/// A square block of terrain pixels
#[derive(Clone, Debug, PartialEq)]
pub struct NavNode {
	/// Column and row of the node
	cell: IVec2,
	/// Most resistant non-door material within the block
	material: MaterialId,
	/// Teams allowed through every door pixel of the block, [None] if there are no doors
	door: Option<TeamMask>,
	/// Cost per unit distance of crossing the node without digging
	base_cost: Option<f32>,
	/// Whether the node can never be entered by the team owning the grid
	blocked: bool,
	/// Moves to neighbouring nodes
	edges: Vec<NavEdge>,
}

impl NavNode {
	pub fn get_cell(&self) -> IVec2 {
		self.cell
	}
	pub fn get_material(&self) -> MaterialId {
		self.material
	}
	pub fn get_door(&self) -> Option<TeamMask> {
		self.door
	}
	pub fn get_base_cost(&self) -> Option<f32> {
		self.base_cost
	}
	pub fn is_blocked(&self) -> bool {
		self.blocked
	}
	pub fn get_edges(&self) -> &[NavEdge] {
		&self.edges
	}
}

/// Graph of [NavNode]s sampled from a [TerrainQuery] for a single [Team]
#[derive(Clone, Debug, PartialEq)]
pub struct NavGrid {
	/// Team whose door permissions are baked into the edges
	team: Team,
	/// Pixels per node side
	node_size: u32,
	/// Topology of the terrain in pixels
	wrap: WrapAdapter,
	/// Topology of the node grid
	node_wrap: WrapAdapter,
	/// Pricing of materials
	cost_model: Arc<CostModel>,
	/// Row major nodes
	nodes: Vec<NavNode>,
}

impl NavGrid {
	/// Sample every node of the terrain and link them
	pub fn build<T: TerrainQuery + ?Sized>(
		terrain: &T,
		settings: &NavigationSettings,
		cost_model: Arc<CostModel>,
		team: Team,
	) -> Self {
		let node_size = settings.get_node_size();
		let wrap = WrapAdapter::from_terrain(terrain);
		let node_wrap = WrapAdapter::new(
			terrain.width().div_ceil(node_size),
			terrain.height().div_ceil(node_size),
			terrain.wraps_x(),
			terrain.wraps_y(),
		);
		let mut grid = NavGrid {
			team,
			node_size,
			wrap,
			node_wrap,
			cost_model,
			nodes: Vec::new(),
		};
		grid.sample_all(terrain);
		grid
	}
	/// Throw away every node and sample the terrain again
	pub fn rebuild<T: TerrainQuery + ?Sized>(&mut self, terrain: &T) {
		self.wrap = WrapAdapter::from_terrain(terrain);
		self.node_wrap = WrapAdapter::new(
			terrain.width().div_ceil(self.node_size),
			terrain.height().div_ceil(self.node_size),
			terrain.wraps_x(),
			terrain.wraps_y(),
		);
		self.sample_all(terrain);
	}
	/// Populate every node and then every edge
	fn sample_all<T: TerrainQuery + ?Sized>(&mut self, terrain: &T) {
		let columns = self.get_columns() as i32;
		let rows = self.get_rows() as i32;
		let mut nodes = Vec::with_capacity((columns * rows) as usize);
		for y in 0..rows {
			for x in 0..columns {
				nodes.push(self.sample_node(terrain, IVec2::new(x, y)));
			}
		}
		self.nodes = nodes;
		for i in 0..self.nodes.len() {
			self.nodes[i].edges = self.link_node(i);
		}
	}
	/// Resample the nodes covering a rectangle of terrain pixels and relink them and their
	/// neighbours. The rectangle may hang over the edges of the terrain, it is wrapped or clipped
	/// first. Returns the number of nodes resampled
	pub fn patch_region<T: TerrainQuery + ?Sized>(&mut self, terrain: &T, rect: TerrainRect) -> usize {
		if WrapAdapter::from_terrain(terrain) != self.wrap {
			warn!(
				"Terrain dimensions changed from {}x{} to {}x{}, rebuilding navigation of {:?}",
				self.wrap.get_width(),
				self.wrap.get_height(),
				terrain.width(),
				terrain.height(),
				self.team
			);
			self.rebuild(terrain);
			return self.nodes.len();
		}
		let node_rects: Vec<TerrainRect> = self
			.wrap
			.normalize_region(rect)
			.iter()
			.map(|piece| self.pixel_rect_to_node_rect(piece))
			.collect();
		let mut resampled = 0;
		for node_rect in node_rects.iter() {
			for y in node_rect.y..node_rect.bottom() {
				for x in node_rect.x..node_rect.right() {
					let cell = IVec2::new(x, y);
					let i = self.index(cell);
					let edges = std::mem::take(&mut self.nodes[i].edges);
					let mut node = self.sample_node(terrain, cell);
					node.edges = edges;
					self.nodes[i] = node;
					resampled += 1;
				}
			}
		}
		// relinking reads neighbouring nodes so wait until every node is sampled
		for node_rect in node_rects.iter() {
			for piece in self.node_wrap.normalize_region(node_rect.expand(1)) {
				for y in piece.y..piece.bottom() {
					for x in piece.x..piece.right() {
						let i = self.index(IVec2::new(x, y));
						self.nodes[i].edges = self.link_node(i);
					}
				}
			}
		}
		debug!(
			"Patched {} nodes of {:?} from region {:?}",
			resampled, self.team, rect
		);
		resampled
	}
	/// Nodes covering an in-bounds rectangle of pixels
	fn pixel_rect_to_node_rect(&self, piece: &TerrainRect) -> TerrainRect {
		let size = self.node_size as i32;
		let min = IVec2::new(piece.x / size, piece.y / size);
		let max = IVec2::new(
			(piece.right() + size - 1) / size,
			(piece.bottom() + size - 1) / size,
		);
		TerrainRect::from_corners(min, max)
	}
	/// Read the pixels of a node's block
	fn sample_node<T: TerrainQuery + ?Sized>(&self, terrain: &T, cell: IVec2) -> NavNode {
		let size = self.node_size;
		let x_start = cell.x as u32 * size;
		let y_start = cell.y as u32 * size;
		let x_end = (x_start + size).min(terrain.width());
		let y_end = (y_start + size).min(terrain.height());
		let mut material: Option<MaterialId> = None;
		let mut door: Option<TeamMask> = None;
		for y in y_start..y_end {
			for x in x_start..x_end {
				let pixel = terrain.material_at(x, y);
				let permission = terrain.door_team_permission(x, y).or_else(|| {
					// door material without any permission stays shut
					self.cost_model.is_door(pixel).then_some(TeamMask::NONE)
				});
				match permission {
					Some(mask) => door = Some(door.map_or(mask, |d| d.intersection(mask))),
					None => material = Some(self.stronger(material, pixel)),
				}
			}
		}
		let material = material.unwrap_or(MaterialId::AIR);
		let door_open = door.map(|mask| mask.allows(self.team));
		let base_cost = self
			.cost_model
			.edge_cost(material, 1.0, 0.0, door.is_some(), door_open.unwrap_or(true))
			.get_cost();
		let blocked = self.cost_model.is_indestructible(material) || door_open == Some(false);
		NavNode {
			cell,
			material,
			door,
			base_cost,
			blocked,
			edges: Vec::new(),
		}
	}
	/// The more resistant of two materials, ties keep the higher id
	fn stronger(&self, current: Option<MaterialId>, candidate: MaterialId) -> MaterialId {
		match current {
			None => candidate,
			Some(current) => {
				let a = self.cost_model.resistance(current);
				let b = self.cost_model.resistance(candidate);
				match b.total_cmp(&a).then(candidate.cmp(&current)) {
					std::cmp::Ordering::Greater => candidate,
					_ => current,
				}
			}
		}
	}
	/// Derive the edges of a node from itself and its neighbours
	fn link_node(&self, source: usize) -> Vec<NavEdge> {
		let cell = self.nodes[source].cell;
		let mut edges: Vec<NavEdge> = Vec::with_capacity(8);
		for ordinal in Ordinal::ALL.iter() {
			let Some(target_cell) = self.neighbour_cell(cell + ordinal.offset()) else {
				continue;
			};
			let target = self.index(target_cell);
			// tiny wrapping grids can reach the same node in several directions
			if target == source || edges.iter().any(|e| e.target == target) {
				continue;
			}
			let mut touched = vec![source, target];
			if let Some(flanks) = ordinal.flanks() {
				for flank in flanks.iter() {
					if let Some(c) = self.neighbour_cell(cell + flank.offset()) {
						touched.push(self.index(c));
					}
				}
			}
			let mut material = None;
			let mut door: Option<TeamMask> = None;
			for i in touched.iter() {
				let node = &self.nodes[*i];
				material = Some(self.stronger(material, node.material));
				if let Some(mask) = node.door {
					door = Some(door.map_or(mask, |d| d.intersection(mask)));
				}
			}
			let material = material.unwrap_or(MaterialId::AIR);
			// nothing can ever dig through so don't bother storing the edge
			if self.cost_model.is_indestructible(material) {
				continue;
			}
			edges.push(NavEdge {
				target,
				distance: self.node_size as f32 * ordinal.step_length(),
				material,
				door: door.map(|mask| mask.allows(self.team)),
			});
		}
		edges
	}
	/// Resolve a possibly out of range node coordinate, [None] if it falls off a non-wrapping edge
	fn neighbour_cell(&self, cell: IVec2) -> Option<IVec2> {
		let columns = self.get_columns() as i32;
		let rows = self.get_rows() as i32;
		if (!self.node_wrap.wraps_x() && (cell.x < 0 || cell.x >= columns))
			|| (!self.node_wrap.wraps_y() && (cell.y < 0 || cell.y >= rows))
		{
			return None;
		}
		Some(self.node_wrap.wrap_cell(cell))
	}
	/// Position of an in-range node within the node array
	fn index(&self, cell: IVec2) -> usize {
		cell.y as usize * self.get_columns() as usize + cell.x as usize
	}
	/// Find the node containing a scene position, positions off the terrain are wrapped or
	/// clamped onto it. [None] if the grid has no nodes
	pub fn snap(&self, position: Vec2) -> Option<usize> {
		if self.nodes.is_empty() {
			return None;
		}
		let p = self.wrap.wrap_position(position);
		let size = self.node_size as f32;
		let cell = IVec2::new((p.x / size).floor() as i32, (p.y / size).floor() as i32);
		Some(self.index(self.node_wrap.wrap_cell(cell)))
	}
	/// Scene position of the centre of a node, blocks cut short by the terrain edge are centred
	/// on the pixels they do cover
	pub fn node_centre(&self, index: usize) -> Vec2 {
		let cell = self.nodes[index].cell.as_uvec2();
		let size = self.node_size;
		let x_start = cell.x * size;
		let y_start = cell.y * size;
		let block_width = size.min(self.wrap.get_width() - x_start);
		let block_height = size.min(self.wrap.get_height() - y_start);
		Vec2::new(
			x_start as f32 + block_width as f32 / 2.0,
			y_start as f32 + block_height as f32 / 2.0,
		)
	}
	pub fn get_node(&self, index: usize) -> Option<&NavNode> {
		self.nodes.get(index)
	}
	/// Look up a node by its column and row
	pub fn get_node_at(&self, cell: IVec2) -> Option<&NavNode> {
		if cell.x < 0
			|| cell.y < 0
			|| cell.x >= self.get_columns() as i32
			|| cell.y >= self.get_rows() as i32
		{
			return None;
		}
		self.nodes.get(self.index(cell))
	}
	pub fn get_nodes(&self) -> &[NavNode] {
		&self.nodes
	}
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
	/// Number of node columns
	pub fn get_columns(&self) -> u32 {
		self.node_wrap.get_width()
	}
	/// Number of node rows
	pub fn get_rows(&self) -> u32 {
		self.node_wrap.get_height()
	}
	pub fn get_node_size(&self) -> u32 {
		self.node_size
	}
	pub fn get_team(&self) -> Team {
		self.team
	}
	/// Topology of the terrain in pixels
	pub fn get_wrap(&self) -> &WrapAdapter {
		&self.wrap
	}
	/// Topology of the grid in nodes
	pub fn get_node_wrap(&self) -> &WrapAdapter {
		&self.node_wrap
	}
	pub fn get_cost_model(&self) -> &CostModel {
		&self.cost_model
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// Build a grid over some terrain with default settings
	fn grid(terrain: &MaterialGrid, node_size: u32, team: Team) -> NavGrid {
		let settings = NavigationSettings::default().with_node_size(node_size);
		NavGrid::build(terrain, &settings, Arc::new(CostModel::from_settings(&settings)), team)
	}
	#[test]
	fn dimensions() {
		let terrain = MaterialGrid::new(10, 7, false, false);
		let result = grid(&terrain, 3, Team::NoTeam);
		assert_eq!(4, result.get_columns());
		assert_eq!(3, result.get_rows());
		assert_eq!(12, result.node_count());
	}
	#[test]
	fn degenerate_terrain() {
		let terrain = MaterialGrid::new(0, 5, true, true);
		let result = grid(&terrain, 1, Team::NoTeam);
		assert!(result.is_empty());
		assert_eq!(None, result.snap(Vec2::new(1.0, 1.0)));
	}
	#[test]
	fn corner_edges_non_wrapping() {
		let terrain = MaterialGrid::new(3, 3, false, false);
		let result = grid(&terrain, 1, Team::NoTeam);
		let corner = result.get_node_at(IVec2::new(0, 0)).unwrap();
		assert_eq!(3, corner.get_edges().len());
		let centre = result.get_node_at(IVec2::new(1, 1)).unwrap();
		assert_eq!(8, centre.get_edges().len());
	}
	#[test]
	fn corner_edges_wrapping() {
		let terrain = MaterialGrid::new(4, 4, true, true);
		let result = grid(&terrain, 1, Team::NoTeam);
		let corner = result.get_node_at(IVec2::new(0, 0)).unwrap();
		assert_eq!(8, corner.get_edges().len());
		let targets: Vec<usize> = corner.get_edges().iter().map(|e| e.get_target()).collect();
		// west of the first column is the last column
		assert!(targets.contains(&3));
		// north west is the bottom right corner
		assert!(targets.contains(&15));
	}
	#[test]
	fn tiny_wrapping_grid_skips_duplicates() {
		let terrain = MaterialGrid::new(2, 1, true, false);
		let result = grid(&terrain, 1, Team::NoTeam);
		let node = result.get_node(0).unwrap();
		assert_eq!(1, node.get_edges().len());
		assert_eq!(1, node.get_edges()[0].get_target());
	}
	#[test]
	fn diagonal_distance() {
		let terrain = MaterialGrid::new(3, 3, false, false);
		let result = grid(&terrain, 2, Team::NoTeam);
		let node = result.get_node_at(IVec2::new(0, 0)).unwrap();
		let diagonal = node
			.get_edges()
			.iter()
			.find(|e| e.get_target() == 3)
			.unwrap();
		assert!((diagonal.get_distance() - 2.0 * std::f32::consts::SQRT_2).abs() < 1e-6);
	}
	#[test]
	fn diagonal_priced_by_flanks() {
		let mut terrain = MaterialGrid::new(2, 2, false, false);
		// north flank of the move from the bottom left to the top right
		terrain.set_material(0, 0, MaterialId(50));
		let result = grid(&terrain, 1, Team::NoTeam);
		let node = result.get_node_at(IVec2::new(0, 1)).unwrap();
		let diagonal = node
			.get_edges()
			.iter()
			.find(|e| e.get_target() == 1)
			.unwrap();
		assert_eq!(MaterialId(50), diagonal.get_material());
	}
	#[test]
	fn indestructible_edges_dropped() {
		let mut terrain = MaterialGrid::new(3, 1, false, false);
		terrain.set_material(1, 0, MaterialId::INDESTRUCTIBLE);
		let result = grid(&terrain, 1, Team::NoTeam);
		assert!(result.get_node(0).unwrap().get_edges().is_empty());
		assert!(result.get_node(1).unwrap().is_blocked());
	}
	#[test]
	fn node_governed_by_strongest_material() {
		let mut terrain = MaterialGrid::new(4, 4, false, false);
		terrain.set_material(1, 1, MaterialId(20));
		terrain.set_material(0, 0, MaterialId(5));
		let result = grid(&terrain, 2, Team::NoTeam);
		let node = result.get_node_at(IVec2::ZERO).unwrap();
		assert_eq!(MaterialId(20), node.get_material());
		assert_eq!(None, node.get_base_cost());
		assert_eq!(Some(1.0), result.get_node_at(IVec2::new(1, 1)).unwrap().get_base_cost());
	}
	#[test]
	fn door_per_team() {
		let mut terrain = MaterialGrid::new(3, 1, false, false);
		terrain.set_door(1, 0, TeamMask::single(1));
		let open = grid(&terrain, 1, Team::Id(1));
		let shut = grid(&terrain, 1, Team::Id(2));
		assert!(!open.get_node(1).unwrap().is_blocked());
		assert!(shut.get_node(1).unwrap().is_blocked());
		let edge = open.get_node(0).unwrap().get_edges()[0];
		assert_eq!(Some(true), edge.get_door());
		let edge = shut.get_node(0).unwrap().get_edges()[0];
		assert_eq!(Some(false), edge.get_door());
		assert_eq!(EdgeCost::Impassable, edge.cost(shut.get_cost_model(), 1000.0));
	}
	#[test]
	fn door_material_without_permission_is_shut() {
		let settings = NavigationSettings::default().with_palette(
			MaterialPalette::default().with(MaterialId(9), MaterialProperties::DOOR),
		);
		let mut terrain = MaterialGrid::new(3, 1, false, false);
		terrain.set_material(1, 0, MaterialId(9));
		let result = NavGrid::build(
			&terrain,
			&settings,
			Arc::new(CostModel::from_settings(&settings)),
			Team::Id(0),
		);
		let node = result.get_node(1).unwrap();
		assert_eq!(Some(TeamMask::NONE), node.get_door());
		assert_eq!(MaterialId::AIR, node.get_material());
	}
	#[test]
	fn snap_and_centre() {
		let terrain = MaterialGrid::new(10, 10, true, false);
		let result = grid(&terrain, 4, Team::NoTeam);
		let index = result.snap(Vec2::new(5.5, 9.0)).unwrap();
		assert_eq!(IVec2::new(1, 2), result.get_node(index).unwrap().get_cell());
		// last row only covers two pixels
		assert_eq!(Vec2::new(6.0, 9.0), result.node_centre(index));
		let wrapped = result.snap(Vec2::new(-1.0, 0.0)).unwrap();
		assert_eq!(IVec2::new(2, 0), result.get_node(wrapped).unwrap().get_cell());
	}
	#[test]
	fn patch_matches_rebuild() {
		let mut terrain = MaterialGrid::new(12, 9, true, false);
		let mut patched = grid(&terrain, 2, Team::Id(0));
		let rect = TerrainRect::new(-1, 3, 4, 2);
		terrain.fill_rect(rect, MaterialId(70));
		terrain.set_door(5, 5, TeamMask::single(0));
		patched.patch_region(&terrain, rect);
		patched.patch_region(&terrain, TerrainRect::cell(5, 5));
		let rebuilt = grid(&terrain, 2, Team::Id(0));
		assert_eq!(rebuilt, patched);
	}
	#[test]
	fn patch_is_idempotent() {
		let mut terrain = MaterialGrid::new(8, 8, false, false);
		let mut patched = grid(&terrain, 1, Team::NoTeam);
		let rect = TerrainRect::new(2, 2, 3, 3);
		terrain.fill_rect(rect, MaterialId(12));
		patched.patch_region(&terrain, rect);
		let once = patched.clone();
		patched.patch_region(&terrain, rect);
		assert_eq!(once, patched);
	}
	#[test]
	fn patch_outside_is_noop() {
		let terrain = MaterialGrid::new(8, 8, false, false);
		let mut patched = grid(&terrain, 1, Team::NoTeam);
		let before = patched.clone();
		let result = patched.patch_region(&terrain, TerrainRect::new(20, 20, 4, 4));
		assert_eq!(0, result);
		assert_eq!(before, patched);
	}
	#[test]
	fn patch_resized_terrain_rebuilds() {
		let terrain = MaterialGrid::new(8, 8, false, false);
		let mut patched = grid(&terrain, 1, Team::NoTeam);
		let bigger = MaterialGrid::new(10, 8, false, false);
		patched.patch_region(&bigger, TerrainRect::cell(0, 0));
		assert_eq!(80, patched.node_count());
	}
}
