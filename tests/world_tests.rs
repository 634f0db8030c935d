use bedrock_world::error::StoreError;
use bedrock_world::world::keys;
use bedrock_world::{
    BlobHash, BlockState, Chunk, ChunkPos, Dimension, HandleArena, KeyValueStore, MemoryStore,
    RuntimeTable, SubChunkPos, World, WorldError,
};
use quartz_nbt::NbtCompound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn table() -> Arc<RuntimeTable> {
    let catalog = vec![
        BlockState::new("minecraft:air"),
        BlockState::new("minecraft:bedrock"),
        BlockState::new("minecraft:grass_block"),
        BlockState::new("minecraft:chest").with_property("facing_direction", 2i32),
    ];
    Arc::new(RuntimeTable::build(catalog, true).unwrap())
}

fn id(table: &RuntimeTable, name: &str) -> u32 {
    table.state_to_runtime_id(name, &Default::default()).unwrap()
}

/// A store whose writes can be switched off to simulate a failing backend.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.inner.delete(key)
    }
}

#[test]
fn test_save_and_load_flat_chunk() {
    let table = table();
    let world = World::new(MemoryStore::new(), table.clone());
    let range = Dimension::Overworld.range();
    let pos = ChunkPos::new(-3, 12);

    let mut chunk = Chunk::new(table.air_runtime_id(), range);
    for z in 0..16u8 {
        for x in 0..16u8 {
            chunk.set_block(x, -64, z, 0, id(&table, "minecraft:bedrock"));
            chunk.set_block(x, -63, z, 0, id(&table, "minecraft:grass_block"));
            chunk.set_biome(x, 100, z, 7);
        }
    }
    chunk.compact();
    world.save_chunk(Dimension::Overworld, pos, &chunk).unwrap();

    // Only the lowest slab holds blocks.
    let stored: Vec<_> = world
        .store()
        .keys()
        .unwrap()
        .into_iter()
        .filter(|key| key.len() == 10 && key[8] == keys::KEY_SUB_CHUNK_DATA)
        .collect();
    assert_eq!(stored, vec![keys::sub_chunk_key(Dimension::Overworld, pos, -4)]);

    let loaded = world.load_chunk(Dimension::Overworld, pos).unwrap().unwrap();
    assert!(loaded.equals(&chunk));
    assert_eq!(loaded.biome(3, 100, 3), 7);
    assert_eq!(loaded.biome(3, 0, 3), 0);

    let sub = world
        .load_sub_chunk(Dimension::Overworld, SubChunkPos::new(-3, -4, 12))
        .unwrap()
        .unwrap();
    assert_eq!(sub.block(0, 1, 0, 0), id(&table, "minecraft:grass_block"));
    let empty = world
        .load_sub_chunk(Dimension::Overworld, SubChunkPos::new(-3, 10, 12))
        .unwrap()
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_dimensions_do_not_share_keys() {
    let table = table();
    let world = World::new(MemoryStore::new(), table.clone());
    let pos = ChunkPos::new(0, 0);

    let mut chunk = Chunk::new(table.air_runtime_id(), Dimension::Nether.range());
    chunk.set_block(1, 1, 1, 0, id(&table, "minecraft:bedrock"));
    world.save_chunk(Dimension::Nether, pos, &chunk).unwrap();

    assert!(world.load_chunk(Dimension::Overworld, pos).unwrap().is_none());
    let loaded = world.load_chunk(Dimension::Nether, pos).unwrap().unwrap();
    assert_eq!(loaded.block(1, 1, 1, 0), id(&table, "minecraft:bedrock"));
}

#[test]
fn test_block_entities_and_sync_metadata_share_a_column() {
    let world = World::new(MemoryStore::new(), table());
    let dim = Dimension::End;
    let pos = ChunkPos::new(5, 5);

    let mut chest = NbtCompound::new();
    chest.insert("id", "minecraft:chest".to_string());
    chest.insert("x", 80i32);
    chest.insert("y", 64i32);
    chest.insert("z", 80i32);
    world.save_block_entities(dim, pos, &[chest]).unwrap();

    world
        .save_blob_hash(
            dim,
            pos,
            &[BlobHash { y: 0, hash: 0xdead_beef }, BlobHash { y: 3, hash: 42 }],
        )
        .unwrap();
    world.save_single_blob_hash(dim, SubChunkPos::new(5, 3, 5), 43).unwrap();
    world.save_time_stamp(dim, pos, 1_234).unwrap();

    let entities = world.load_block_entities(dim, pos).unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].get::<_, &String>("id").unwrap(), "Chest");
    assert_eq!(entities[0].get::<_, i32>("y").unwrap(), 64);

    assert_eq!(
        world.load_sub_chunk_blob_hash(dim, SubChunkPos::new(5, 3, 5)).unwrap(),
        Some(43)
    );
    assert_eq!(world.load_time_stamp(dim, pos).unwrap(), Some(1_234));

    world.save_blob_hash(dim, pos, &[]).unwrap();
    assert!(world.load_blob_hash(dim, pos).unwrap().is_empty());
}

#[test]
fn test_store_failures_propagate() {
    let table = table();
    let world = World::new(FlakyStore::default(), table.clone());
    let pos = ChunkPos::new(1, 1);

    let mut chunk = Chunk::new(table.air_runtime_id(), Dimension::Overworld.range());
    chunk.set_block(0, 0, 0, 0, id(&table, "minecraft:bedrock"));
    world.store().failing.store(true, Ordering::Relaxed);

    assert!(matches!(
        world.save_chunk(Dimension::Overworld, pos, &chunk),
        Err(WorldError::Store(StoreError::Backend(_)))
    ));
    assert!(world.load_chunk(Dimension::Overworld, pos).unwrap().is_none());

    world.store().failing.store(false, Ordering::Relaxed);
    world.save_chunk(Dimension::Overworld, pos, &chunk).unwrap();
    assert!(world.load_chunk(Dimension::Overworld, pos).unwrap().is_some());
}

#[test]
fn test_worlds_behind_handles() {
    let table = table();
    let mut worlds = HandleArena::new();
    let first = worlds.insert(World::new(MemoryStore::new(), table.clone()));
    let second = worlds.insert(World::new(MemoryStore::new(), table.clone()));

    worlds
        .get(first)
        .unwrap()
        .save_time_stamp(Dimension::Overworld, ChunkPos::new(0, 0), 9)
        .unwrap();
    assert!(worlds.get(second).unwrap().store().is_empty());

    let closed = worlds.remove(first).unwrap();
    assert_eq!(closed.into_store().len(), 1);
    assert!(worlds.get(first).is_none());
    assert_eq!(worlds.len(), 1);
}
