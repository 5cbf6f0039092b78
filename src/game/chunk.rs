use std::collections::HashMap;

use log::debug;
use tokio::sync::mpsc;

/// Edge length of a chunk section, in blocks.
pub(crate) const SECTION_EDGE: usize = 16;

/// Number of vertically stacked sections in a column.
pub(crate) const SECTIONS_PER_CHUNK: usize = 16;

/// Bytes of block data per section: one little-endian u16 per cell.
const SECTION_BLOCK_BYTES: usize = SECTION_EDGE * SECTION_EDGE * SECTION_EDGE * 2;

/// Bytes of light data per section, block light and skylight together at a
/// nibble per cell each.
const SECTION_LIGHT_BYTES: usize = SECTION_EDGE * SECTION_EDGE * SECTION_EDGE / 2 * 2;

/// Bytes of biome data per column.
const BIOME_BYTES: usize = SECTION_EDGE * SECTION_EDGE;

/// How many updates a subscriber can fall behind before broadcasts to it are
/// dropped. Fan-out happens on the world's own task, so it must never block;
/// the buffer is what absorbs bursts.
pub(crate) const SUBSCRIBER_BACKLOG: usize = 64;

const FULL_BRIGHT: u8 = 15;
const BIOME_PLAINS: u8 = 1;

// Light and biome data never vary in this server, so a single pre-computed
// copy is shared by every chunk in every world.
static LIGHT_DATA: [u8; SECTION_LIGHT_BYTES * SECTIONS_PER_CHUNK] =
    [FULL_BRIGHT << 4 | FULL_BRIGHT; SECTION_LIGHT_BYTES * SECTIONS_PER_CHUNK];
static BIOME_DATA: [u8; BIOME_BYTES] = [BIOME_PLAINS; BIOME_BYTES];

/// A pair of chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ChunkPos {
    pub(crate) x: i32,
    pub(crate) z: i32,
}

impl ChunkPos {
    /// The chunk containing the given world coordinates.
    pub(crate) fn from_world_coords(x: f64, z: f64) -> Self {
        Self {
            x: (x / SECTION_EDGE as f64).floor() as i32,
            z: (z / SECTION_EDGE as f64).floor() as i32,
        }
    }

    /// Chebyshev distance in chunks, which is what view-distance culling
    /// wants: a square border of chunks is all "equally far".
    pub(crate) fn dist(self, other: ChunkPos) -> i32 {
        let dx = (self.x - other.x).abs();
        let dz = (self.z - other.z).abs();
        dx.max(dz)
    }
}

/// A 12-bit block id and 4-bit metadata packed into one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockData(u16);

impl BlockData {
    pub(crate) const AIR: BlockData = BlockData(0);
    pub(crate) const STONE_ID: u16 = 1;

    pub(crate) fn new(id: u16, metadata: u8) -> Self {
        Self((id & 0x0fff) << 4 | (metadata as u16) & 0x000f)
    }

    pub(crate) fn id(self) -> u16 {
        self.0 >> 4
    }

    pub(crate) fn metadata(self) -> u8 {
        (self.0 & 15) as u8
    }

    pub(crate) fn to_u16(self) -> u16 {
        self.0
    }
}

/// A message pushed to chunk subscribers.
#[derive(Debug, Clone)]
pub(crate) enum ChunkUpdate {
    /// Synthetic acknowledgment delivered before the subscription is live.
    Subscribed,
    /// A cell changed; coordinates are world coordinates.
    BlockChanged {
        x: i32,
        y: i32,
        z: i32,
        data: BlockData,
    },
}

type Section = [u8; SECTION_BLOCK_BYTES];

/// A 16x16x256 column of blocks. Sections are allocated on first write; the
/// presence mask has bit n set iff `sections[n]` is populated.
pub(crate) struct Chunk {
    subscribers: HashMap<u32, mpsc::Sender<ChunkUpdate>>,
    section_mask: u16,
    section_count: usize,
    sections: [Option<Box<Section>>; SECTIONS_PER_CHUNK],
}

impl Chunk {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            section_mask: 0,
            section_count: 0,
            sections: std::array::from_fn(|_| None),
        }
    }

    /// Changes a block. `x` and `z` are relative to the chunk, `y` is the
    /// absolute height. Returns false, without touching storage, for
    /// coordinates outside the column.
    pub(crate) fn set_block(&mut self, x: u8, y: i32, z: u8, data: BlockData) -> bool {
        if x > 15 || z > 15 || !(0..SECTIONS_PER_CHUNK as i32 * 16).contains(&y) {
            return false;
        }

        let section_idx = (y >> 4) as usize;
        let section = self.section_mut(section_idx);
        let idx = ((y & 15) as usize) << 9 | (z as usize) << 5 | (x as usize) << 1;
        let v = data.to_u16();
        section[idx] = v as u8;
        section[idx + 1] = (v >> 8) as u8;
        true
    }

    /// Reads a cell back. Cells in unallocated sections are air.
    pub(crate) fn block_at(&self, x: u8, y: i32, z: u8) -> Option<BlockData> {
        if x > 15 || z > 15 || !(0..SECTIONS_PER_CHUNK as i32 * 16).contains(&y) {
            return None;
        }

        let section_idx = (y >> 4) as usize;
        let Some(section) = &self.sections[section_idx] else {
            return Some(BlockData::AIR);
        };
        let idx = ((y & 15) as usize) << 9 | (z as usize) << 5 | (x as usize) << 1;
        let v = section[idx] as u16 | (section[idx + 1] as u16) << 8;
        Some(BlockData(v))
    }

    fn section_mut(&mut self, index: usize) -> &mut Section {
        if self.section_mask & (1 << index) == 0 {
            self.section_mask |= 1 << index;
            self.section_count += 1;
        }
        self.sections[index].get_or_insert_with(|| Box::new([0; SECTION_BLOCK_BYTES]))
    }

    pub(crate) fn section_mask(&self) -> u16 {
        self.section_mask
    }

    /// Size of the payload [`Chunk::write_data`] produces.
    pub(crate) fn data_size(&self) -> usize {
        self.section_count * (SECTION_BLOCK_BYTES + SECTION_LIGHT_BYTES) + BIOME_BYTES
    }

    /// Appends the column's wire payload: block data for each populated
    /// section bottom-up, then light, then biomes.
    pub(crate) fn write_data(&self, out: &mut Vec<u8>) {
        for section in self.sections.iter().flatten() {
            out.extend_from_slice(&section[..]);
        }
        out.extend_from_slice(&LIGHT_DATA[..SECTION_LIGHT_BYTES * self.section_count]);
        out.extend_from_slice(&BIOME_DATA);
    }

    /// Registers a channel to receive updates for this chunk. `id` must be
    /// unique to the subscriber; the ack is pushed before registration so
    /// the subscriber sees it ahead of any broadcast.
    pub(crate) fn subscribe(&mut self, id: u32, ch: mpsc::Sender<ChunkUpdate>) {
        if ch.try_send(ChunkUpdate::Subscribed).is_err() {
            debug!("chunk subscriber {id} rejected the subscription ack");
            return;
        }
        self.subscribers.insert(id, ch);
    }

    /// Removes the subscription with the given id, if any.
    pub(crate) fn unsubscribe(&mut self, id: u32) {
        self.subscribers.remove(&id);
    }

    /// Fans a message out to every subscriber. Subscribers that have fallen
    /// more than [`SUBSCRIBER_BACKLOG`] updates behind miss it.
    pub(crate) fn broadcast(&self, update: &ChunkUpdate) {
        for (id, ch) in &self.subscribers {
            if ch.try_send(update.clone()).is_err() {
                debug!("chunk subscriber {id} is lagging, dropping update");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{BlockData, Chunk, ChunkPos, ChunkUpdate, SUBSCRIBER_BACKLOG};
    use tokio::sync::mpsc;

    #[test]
    fn chebyshev_distance() {
        let cases = [
            ((0, 0), (0, 0), 0),
            ((0, 0), (3, 1), 3),
            ((0, 0), (1, 3), 3),
            ((2, 2), (-2, -2), 4),
            ((-5, 7), (-5, 7), 0),
            ((-3, 4), (2, -1), 5),
            ((10, -10), (-10, 10), 20),
        ];
        for ((ax, az), (bx, bz), want) in cases {
            let a = ChunkPos { x: ax, z: az };
            let b = ChunkPos { x: bx, z: bz };
            assert_eq!(a.dist(b), want, "{a:?} -> {b:?}");
            assert_eq!(b.dist(a), want, "{b:?} -> {a:?}");
        }
    }

    #[test]
    fn chunk_pos_from_world_coords_floors_negatives() {
        assert_eq!(
            ChunkPos::from_world_coords(8.0, 8.0),
            ChunkPos { x: 0, z: 0 }
        );
        assert_eq!(
            ChunkPos::from_world_coords(-0.5, -16.5),
            ChunkPos { x: -1, z: -2 }
        );
        assert_eq!(
            ChunkPos::from_world_coords(31.9, -32.0),
            ChunkPos { x: 1, z: -2 }
        );
    }

    #[test]
    fn block_data_packing() {
        let data = BlockData::new(0x0abc, 0x0d);
        assert_eq!(data.id(), 0x0abc);
        assert_eq!(data.metadata(), 0x0d);
        assert_eq!(data.to_u16(), 0x0abc << 4 | 0x0d);

        // out-of-range inputs are masked to their field widths
        let clamped = BlockData::new(0xffff, 0xff);
        assert_eq!(clamped.id(), 0x0fff);
        assert_eq!(clamped.metadata(), 0x0f);
    }

    #[test]
    fn set_block_round_trips_every_cell() {
        let mut chunk = Chunk::new();
        for y in 0..256 {
            for z in 0..16u8 {
                for x in 0..16u8 {
                    let id = ((y as u16) << 4 ^ (z as u16) << 2 ^ x as u16) & 0x0fff;
                    let meta = (x ^ z) & 15;
                    assert!(chunk.set_block(x, y, z, BlockData::new(id, meta)));
                }
            }
        }
        for y in 0..256 {
            for z in 0..16u8 {
                for x in 0..16u8 {
                    let id = ((y as u16) << 4 ^ (z as u16) << 2 ^ x as u16) & 0x0fff;
                    let meta = (x ^ z) & 15;
                    let got = chunk.block_at(x, y, z).unwrap();
                    assert_eq!(got.id(), id, "({x},{y},{z})");
                    assert_eq!(got.metadata(), meta, "({x},{y},{z})");
                }
            }
        }
    }

    #[test]
    fn out_of_range_writes_are_rejected_without_mutation() {
        let mut chunk = Chunk::new();
        assert!(!chunk.set_block(0, -1, 0, BlockData::new(1, 0)));
        assert!(!chunk.set_block(0, 256, 0, BlockData::new(1, 0)));
        assert!(!chunk.set_block(16, 0, 0, BlockData::new(1, 0)));
        assert!(!chunk.set_block(0, 0, 16, BlockData::new(1, 0)));
        assert_eq!(chunk.section_mask(), 0);
        assert_eq!(chunk.data_size(), 256); // biome trailer only
    }

    #[test]
    fn sections_allocate_lazily() {
        let mut chunk = Chunk::new();
        assert!(chunk.set_block(3, 17, 5, BlockData::new(7, 2)));
        // only section 1 exists
        assert_eq!(chunk.section_mask(), 0b10);
        let mut data = Vec::new();
        chunk.write_data(&mut data);
        assert_eq!(data.len(), chunk.data_size());
    }

    #[tokio::test]
    async fn subscribe_acks_then_broadcasts() {
        let mut chunk = Chunk::new();
        let (tx, mut rx) = mpsc::channel(SUBSCRIBER_BACKLOG);
        chunk.subscribe(9, tx);

        chunk.broadcast(&ChunkUpdate::BlockChanged {
            x: 1,
            y: 2,
            z: 3,
            data: BlockData::new(1, 0),
        });

        assert!(matches!(rx.recv().await, Some(ChunkUpdate::Subscribed)));
        assert!(matches!(
            rx.recv().await,
            Some(ChunkUpdate::BlockChanged { x: 1, y: 2, z: 3, .. })
        ));

        chunk.unsubscribe(9);
        chunk.broadcast(&ChunkUpdate::Subscribed);
        assert!(rx.try_recv().is_err());
    }
}
