#![doc = include_str!("../README.md")]
#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

mod bst;
pub mod rbtree;

pub use rbtree::{FromIterableError, RbTree};
