use crate::block_state::{canonical_state_bytes, BlockState, Properties, PropertyValue};
use crate::config::TableOptions;
use crate::error::TableError;
use crate::hash::{fnv1_64, hash_canonical};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

pub const AIR_BLOCK_NAME: &str = "minecraft:air";

fn air_canonical_bytes() -> Option<Vec<u8>> {
    canonical_state_bytes(AIR_BLOCK_NAME, &Properties::new()).ok()
}

/// Short printable form of a state for error messages.
fn describe(state: &BlockState) -> String {
    let name: String = state.name.chars().take(64).collect();
    if name.len() < state.name.len() {
        format!("{}... with {} properties", name, state.properties.len())
    } else {
        format!("{} with {} properties", name, state.properties.len())
    }
}

/// A registered block state with its runtime ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    pub state: BlockState,
    pub runtime_id: u32,
}

/// A single block property key and every value it can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEnum {
    pub key: SmolStr,
    pub possible_values: Vec<PropertyValue>,
}

impl StateEnum {
    pub fn new(key: impl Into<SmolStr>, possible_values: Vec<PropertyValue>) -> Self {
        StateEnum {
            key: key.into(),
            possible_values,
        }
    }
}

/// Bidirectional mapping between block states and runtime IDs.
///
/// In hash mode an ID is the network hash of its state. In dense mode an ID
/// is the position of the state in the table, which is fixed by
/// [`finalise_register`](Self::finalise_register). Registration takes
/// `&mut self`; once built and finalised, the table can be shared freely.
#[derive(Debug, Clone)]
pub struct RuntimeTable {
    use_network_id_hashes: bool,
    default_namespace: SmolStr,
    entries: Vec<BlockEntry>,
    /// Canonical state bytes to entry position.
    state_index: FxHashMap<Vec<u8>, usize>,
    /// Block name to the first registered entry of that name.
    default_index: FxHashMap<SmolStr, usize>,
    /// Runtime ID to entry position, hash mode only.
    hash_index: FxHashMap<u32, usize>,
    air_runtime_id: u32,
}

impl RuntimeTable {
    pub fn new(use_network_id_hashes: bool) -> Self {
        let air_runtime_id = if use_network_id_hashes {
            air_canonical_bytes()
                .map(|key| hash_canonical(AIR_BLOCK_NAME, &key))
                .unwrap_or_default()
        } else {
            0
        };
        RuntimeTable {
            use_network_id_hashes,
            default_namespace: "minecraft:".into(),
            entries: Vec::new(),
            state_index: FxHashMap::default(),
            default_index: FxHashMap::default(),
            hash_index: FxHashMap::default(),
            air_runtime_id,
        }
    }

    /// Register every state of a catalog.
    ///
    /// A state listed twice is a corrupt catalog in dense mode. In hash mode
    /// the first registration wins and later copies are skipped.
    pub fn build<I>(catalog: I, use_network_id_hashes: bool) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = BlockState>,
    {
        let mut table = RuntimeTable::new(use_network_id_hashes);
        table.register_catalog(catalog)?;
        Ok(table)
    }

    pub fn with_options<I>(catalog: I, options: &TableOptions) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = BlockState>,
    {
        let mut table = RuntimeTable::new(options.use_network_id_hashes);
        table.default_namespace = options.default_namespace.as_str().into();
        table.register_catalog(catalog)?;
        Ok(table)
    }

    fn register_catalog<I>(&mut self, catalog: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = BlockState>,
    {
        let mut skipped = 0usize;
        for state in catalog {
            let key = state.canonical_bytes().map_err(|e| {
                TableError::CorruptCatalog(format!("{}: {}", describe(&state), e))
            })?;
            if self.state_index.contains_key(&key) {
                if !self.use_network_id_hashes {
                    return Err(TableError::CorruptCatalog(format!(
                        "cannot register the same state twice ({})",
                        state
                    )));
                }
                skipped += 1;
                continue;
            }
            self.insert(state, key);
        }
        tracing::debug!(
            entries = self.entries.len(),
            skipped,
            hashes = self.use_network_id_hashes,
            "built block runtime ID table"
        );
        Ok(())
    }

    fn insert(&mut self, state: BlockState, key: Vec<u8>) {
        let position = self.entries.len();
        let runtime_id = if self.use_network_id_hashes {
            hash_canonical(&state.name, &key)
        } else {
            position as u32
        };

        if self.use_network_id_hashes {
            // Colliding hashes keep the state registered first.
            self.hash_index.entry(runtime_id).or_insert(position);
        }
        if !self.default_index.contains_key(&state.name) {
            self.default_index.insert(state.name.clone(), position);
            if state.name == AIR_BLOCK_NAME {
                self.air_runtime_id = runtime_id;
            }
        }
        self.state_index.insert(key, position);
        self.entries.push(BlockEntry { state, runtime_id });
    }

    pub fn use_network_id_hashes(&self) -> bool {
        self.use_network_id_hashes
    }

    pub fn air_runtime_id(&self) -> u32 {
        self.air_runtime_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    /// Resolve a state to its runtime ID.
    ///
    /// Tries the exact state, then the first registered variant of `name`.
    /// If both miss and `name` has no namespace prefix, the lookup is
    /// repeated once with the default namespace prepended.
    pub fn state_to_runtime_id(&self, name: &str, properties: &Properties) -> Option<u32> {
        if let Some(runtime_id) = self.lookup(name, properties) {
            return Some(runtime_id);
        }
        if !name.starts_with(self.default_namespace.as_str()) {
            let prefixed = format!("{}{}", self.default_namespace, name);
            return self.lookup(&prefixed, properties);
        }
        None
    }

    fn lookup(&self, name: &str, properties: &Properties) -> Option<u32> {
        // A state that cannot be encoded is never registered, but its name
        // may still have a default variant.
        let exact = canonical_state_bytes(name, properties)
            .ok()
            .and_then(|key| self.state_index.get(&key));
        exact
            .or_else(|| self.default_index.get(name))
            .map(|&position| self.entries[position].runtime_id)
    }

    pub fn runtime_id_to_state(&self, runtime_id: u32) -> Option<&BlockState> {
        let position = if self.use_network_id_hashes {
            *self.hash_index.get(&runtime_id)?
        } else {
            runtime_id as usize
        };
        self.entries.get(position).map(|entry| &entry.state)
    }

    /// Register a single state. Fails if the exact state is already known
    /// or cannot be encoded.
    pub fn register_custom_block(&mut self, state: BlockState) -> Result<(), TableError> {
        let key = state
            .canonical_bytes()
            .map_err(|e| TableError::InvalidState(format!("{}: {}", describe(&state), e)))?;
        if self.state_index.contains_key(&key) {
            return Err(TableError::AlreadyRegistered(state.to_string()));
        }
        self.insert(state, key);
        Ok(())
    }

    /// Register every combination of the given property enumerations for
    /// one block name, stopping at the first registration error.
    pub fn register_permutation(
        &mut self,
        name: &str,
        version: i32,
        enums: &[StateEnum],
    ) -> Result<(), TableError> {
        if enums.iter().any(|e| e.possible_values.is_empty()) {
            return Ok(());
        }

        let mut digits = vec![0usize; enums.len()];
        loop {
            let mut state = BlockState::new(name).with_version(version);
            for (state_enum, &digit) in enums.iter().zip(&digits) {
                state.set_property(
                    state_enum.key.clone(),
                    state_enum.possible_values[digit].clone(),
                );
            }
            self.register_custom_block(state)?;

            // Advance the least significant digit, carrying leftwards.
            let mut i = digits.len();
            loop {
                if i == 0 {
                    return Ok(());
                }
                i -= 1;
                digits[i] += 1;
                if digits[i] < enums[i].possible_values.len() {
                    break;
                }
                digits[i] = 0;
            }
        }
    }

    /// Fix dense IDs once registration is over. States are stable-sorted by
    /// the FNV-1 64 hash of their name, so variants of one block stay
    /// together in registration order. Does nothing in hash mode.
    pub fn finalise_register(&mut self) {
        if self.use_network_id_hashes {
            return;
        }

        // Every registered entry has exactly one key in the state index.
        let mut keys: Vec<Vec<u8>> = vec![Vec::new(); self.entries.len()];
        for (key, position) in self.state_index.drain() {
            keys[position] = key;
        }
        let mut entries: Vec<(BlockEntry, Vec<u8>)> =
            std::mem::take(&mut self.entries).into_iter().zip(keys).collect();
        entries.sort_by_cached_key(|(entry, _)| fnv1_64(entry.state.name.as_bytes()));

        self.default_index.clear();
        self.hash_index.clear();
        self.entries.reserve(entries.len());
        for (entry, key) in entries {
            self.insert(entry.state, key);
        }

        tracing::debug!(
            entries = self.entries.len(),
            air = self.air_runtime_id,
            "finalised block runtime ID table"
        );
    }
}
