//! Bytecode ABI for the Vireo parsing machine.
//!
//! The compiler lowers a grammar into an abstract program; the encoder
//! linearises that program into a [`Module`]: a flat byte array of
//! single-byte opcodes with little-endian operands, plus the string,
//! charset, expected-set and recovery tables the machine consults at
//! run time. Modules are immutable once built and may be shared between
//! concurrently running machines.

pub mod dump;
pub mod module;
pub mod opcode;
pub mod verify;

pub use module::Module;
pub use opcode::Opcode;
pub use verify::VerifyError;
