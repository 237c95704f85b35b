pub mod header;
pub mod summary;

pub mod io;

pub mod material;
pub mod mesh;
pub mod records;
pub mod stride;
pub mod vertex;

pub mod model;
pub mod read;
pub mod write;

pub mod axis;
pub mod builder;

pub use model::Model;
pub use read::{decode, ReadError};
pub use write::{encode, WriteError};

/// Signature that must appear somewhere in the 40-byte magic region.
pub const MAGIC: &[u8] = b"LiOnHeAdMODEL";
pub const MAGIC_NUMBER: u32 = 0x2B00_B1E5;

pub const MIN_FORMAT_VERSION: u32 = 5;
pub const MAX_FORMAT_VERSION: u32 = 6;

pub type HashMap<K, V> = rapidhash::RapidHashMap<K, V>;
pub type HashSet<T> = rapidhash::RapidHashSet<T>;
