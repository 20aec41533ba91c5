#![doc = include_str!("../README.md")]

mod boolean;
mod codec;
mod collection;
mod error;
mod guarded;
mod hash_bag;
mod parallel;
mod primitive;
mod raw;
mod rayon_impls;

#[cfg(feature = "serde")]
mod serde_impls;

pub mod bag;
pub mod set;

pub use bag::{
    ByteBag, CharBag, F32Bag, F64Bag, I16Bag, I32Bag, I64Bag, I8Bag, PrimitiveBag,
};
pub use boolean::{BoolBag, BoolBagIter, BoolSet, BoolSetIter};
pub use collection::{Collection, CollectionMut};
pub use error::Error;
pub use guarded::{Guarded, ReadView, WriteView};
pub use hash_bag::HashBag;
pub use parallel::{Batch, BatchPlan, Batchable, ParallelDriver, ParallelDriverBuilder};
pub use primitive::Primitive;
pub use rayon_impls::{ParBagIter, ParSetIter};
pub use set::{
    ByteSet, CharSet, F32Set, F64Set, I16Set, I32Set, I64Set, I8Set, PrimitiveSet,
};

/// Iterator types for [`HashBag`].
pub mod hash_bag_iter {
    pub use crate::hash_bag::Iter;
}
