//! An LC-3 assembler.
//!
//! This crate turns LC-3 assembly source into an object image of 16-bit words,
//! reporting every problem it finds along the way with its location in source.
//!
//! # Usage
//!
//! The simplest way to assemble is [`asm::assemble`], which runs every stage:
//! ```
//! use lc3_asm::asm::assemble;
//! use lc3_asm::err::Diagnostics;
//!
//! let code = "
//!     .orig x3000
//!     AND R0, R0, #0
//!     AND R0, R0, #7
//!     HALT
//!     .end
//! ";
//! let mut diag = Diagnostics::new();
//! let image = assemble(code, &mut diag).unwrap();
//! assert_eq!(image.words(), [0x3000, 0x5020, 0x5027, 0xF025]);
//! ```
//!
//! When assembly fails, the [`Diagnostics`](err::Diagnostics) hold each error,
//! and can be displayed as a report:
//! ```
//! # use lc3_asm::asm::assemble;
//! # use lc3_asm::err::Diagnostics;
//! #
//! let code = ".orig x3000\nADD R0, R0, #99\n.end";
//! let mut diag = Diagnostics::new();
//! assert!(assemble(code, &mut diag).is_err());
//!
//! eprintln!("{diag}");
//! ```
//!
//! The stages can also be run individually. See the [`asm`] module for more details.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod asm;
pub mod err;
