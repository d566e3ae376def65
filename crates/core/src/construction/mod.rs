use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{BlockShape, BuildingShape, LevelTheme};

const LAYER_HEIGHT: f64 = 0.5;
const SPIRAL_TURN: f64 = 0.5;
const SPIRAL_RADIUS: f64 = 3.0;
const TOWER_OFFSET: f64 = 2.0;
const BRIDGE_SPACING: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Primary,
    Secondary,
}

/// Opaque block identity. Unlike the placement index it keeps counting
/// across runs, so a renderer can key meshes on it after a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(u64);

impl BlockId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// One block added to the structure for a successful hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingBlock {
    pub id: BlockId,
    /// Position in the construction sequence, starting at zero.
    pub placement_index: u64,
    /// Combo value at the hit that produced this block.
    pub combo: u32,
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub color: ColorChoice,
    pub color_hex: String,
    pub shape: BlockShape,
}

/// World position and rotation of block `index` for a building layout.
pub fn placement(shape: BuildingShape, index: u64) -> ([f64; 3], [f64; 3]) {
    let i = index as f64;
    let angle = i * SPIRAL_TURN;
    let height = i * LAYER_HEIGHT;
    let position = match shape {
        BuildingShape::Spiral => [
            angle.sin() * SPIRAL_RADIUS,
            height,
            angle.cos() * SPIRAL_RADIUS,
        ],
        BuildingShape::Tower => {
            let (x, z) = match index % 4 {
                0 => (TOWER_OFFSET, TOWER_OFFSET),
                1 => (-TOWER_OFFSET, TOWER_OFFSET),
                2 => (-TOWER_OFFSET, -TOWER_OFFSET),
                _ => (TOWER_OFFSET, -TOWER_OFFSET),
            };
            [x, height, z]
        }
        BuildingShape::Bridge => [0.0, 0.0, -i * BRIDGE_SPACING],
    };
    (position, [0.0, angle, 0.0])
}

/// Append-only sequence of blocks, one per hit.
#[derive(Debug)]
pub struct ConstructionLog {
    theme: LevelTheme,
    blocks: Vec<BuildingBlock>,
    rng: StdRng,
    next_id: u64,
}

impl ConstructionLog {
    pub fn new(theme: LevelTheme, seed: u64) -> Self {
        Self {
            theme,
            blocks: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            next_id: 0,
        }
    }

    /// Continues block ids from an earlier log.
    pub fn with_first_id(mut self, first_id: u64) -> Self {
        self.next_id = first_id;
        self
    }

    /// The id the next recorded block will get.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Appends the block for a hit made at `combo`.
    pub fn record(&mut self, combo: u32) -> &BuildingBlock {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        let placement_index = self.blocks.len() as u64;
        let (position, rotation) = placement(self.theme.building_shape, placement_index);
        let color = if self.rng.random_bool(0.5) {
            ColorChoice::Primary
        } else {
            ColorChoice::Secondary
        };
        let color_hex = match color {
            ColorChoice::Primary => self.theme.colors.primary.clone(),
            ColorChoice::Secondary => self.theme.colors.secondary.clone(),
        };
        self.blocks.push(BuildingBlock {
            id,
            placement_index,
            combo,
            position,
            rotation,
            color,
            color_hex,
            shape: self.theme.block_shape,
        });
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[BuildingBlock] {
        &self.blocks
    }

    /// Blocks appended at or after `placement_index`.
    pub fn since(&self, placement_index: usize) -> &[BuildingBlock] {
        self.blocks.get(placement_index..).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn spiral_winds_upwards() {
        let (origin, _) = placement(BuildingShape::Spiral, 0);
        assert!(close(origin, [0.0, 0.0, 3.0]));
        let (second, rotation) = placement(BuildingShape::Spiral, 2);
        assert!(close(second, [1.0f64.sin() * 3.0, 1.0, 1.0f64.cos() * 3.0]));
        assert_eq!(rotation, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn tower_cycles_corners() {
        let corners: Vec<_> = (0..5).map(|i| placement(BuildingShape::Tower, i).0).collect();
        assert!(close(corners[1], [-2.0, 0.5, 2.0]));
        assert!(close(corners[3], [2.0, 1.5, -2.0]));
        assert!(close(corners[4], [2.0, 2.0, 2.0]));
    }

    #[test]
    fn bridge_extends_along_negative_z() {
        let (position, _) = placement(BuildingShape::Bridge, 3);
        assert!(close(position, [0.0, 0.0, -6.0]));
    }

    #[test]
    fn log_indexes_blocks_sequentially() {
        let theme = LevelTheme::default();
        let mut log = ConstructionLog::new(theme.clone(), 9);
        for combo in 1..=3 {
            log.record(combo);
        }
        let indices: Vec<_> = log.blocks().iter().map(|b| b.placement_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        let ids: Vec<_> = log.blocks().iter().map(|b| b.id.get()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(log.next_id(), 3);
        assert_eq!(log.since(2).len(), 1);
        assert!(log.since(7).is_empty());

        let block = &log.blocks()[1];
        assert_eq!(block.combo, 2);
        assert_eq!(block.shape, theme.block_shape);
        assert!(block.color_hex == theme.colors.primary || block.color_hex == theme.colors.secondary);
    }

    #[test]
    fn continued_log_keeps_ids_apart_from_placement() {
        let mut log = ConstructionLog::new(LevelTheme::default(), 9).with_first_id(40);
        let block = log.record(1).clone();
        assert_eq!(block.id.get(), 40);
        assert_eq!(block.placement_index, 0);
    }

    #[test]
    fn seeded_colors_are_reproducible() {
        let colors = |seed| {
            let mut log = ConstructionLog::new(LevelTheme::default(), seed);
            (0..16).map(|c| log.record(c).color).collect::<Vec<_>>()
        };
        assert_eq!(colors(5), colors(5));
    }
}
