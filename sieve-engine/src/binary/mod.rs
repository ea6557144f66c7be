//! The compiled bytecode container.
//!
//! `SIEVE\0` magic, one ABI version byte, a block offset/length table, block
//! 0 the extension table, block 1 the main code, further blocks one per
//! `include`d script. Encoding/decoding follow a small `{Decode, Encode}`
//! trait split: each format type implements its own half, composed rather
//! than one monolithic serializer.

pub mod decode;
pub mod encode;

pub use decode::{Cursor, Decoder};
pub use encode::Encoder;

use sieve_types::ExtensionId;

use crate::error::BinaryError;

pub const MAGIC: &[u8; 6] = b"SIEVE\0";
pub const ABI_VERSION: u8 = 1;

/// One compiled script: an extension table plus one or more code blocks
/// (block 0 is always the extension table's own block index in `blocks`;
/// block 1 is the main program; blocks 2.. are per-`include` sub-programs
/// referenced by jump target (block_id, offset) pairs in the interpreter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub abi_version: u8,
    pub extensions: Vec<(ExtensionId, String)>,
    pub blocks: Vec<Vec<u8>>,
}

impl Binary {
    pub fn new(extensions: Vec<(ExtensionId, String)>, main_code: Vec<u8>) -> Self {
        Self {
            abi_version: ABI_VERSION,
            extensions,
            blocks: vec![main_code],
        }
    }

    pub fn push_block(&mut self, code: Vec<u8>) -> u32 {
        self.blocks.push(code);
        self.blocks.len() as u32
    }

    /// Main code is always block 1 in wire terms (block 0 is the extension
    /// table); `blocks[0]` in memory is the main program, so index 0 here.
    pub fn main_code(&self) -> &[u8] {
        &self.blocks[0]
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode::encode_binary(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BinaryError> {
        decode::decode_binary(bytes)
    }

    /// Checks this binary's extension table against the runtime's active
    /// set; a mismatch is rejected rather than silently ignored, since the
    /// binary would need recompiling against the new extension set anyway.
    /// Returns the first extension name present in the binary but not
    /// recognized at runtime.
    pub fn check_extensions(&self, runtime_names: &[&str]) -> Result<(), BinaryError> {
        for (id, name) in &self.extensions {
            if !runtime_names.contains(&name.as_str()) {
                return Err(BinaryError::UnknownExtension(id.0));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let binary = Binary::new(
            vec![(ExtensionId(1), "fileinto".to_string())],
            vec![0x0A, 0x0D],
        );
        let bytes = binary.to_bytes();
        assert_eq!(&bytes[0..6], MAGIC);
        let decoded = Binary::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, binary);
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 16];
        assert!(matches!(Binary::from_bytes(&bytes), Err(BinaryError::BadMagic)));
    }

    #[test]
    fn check_extensions_flags_unknown_name() {
        let binary = Binary::new(vec![(ExtensionId(1), "vacation".to_string())], vec![]);
        assert!(binary.check_extensions(&["fileinto"]).is_err());
        assert!(binary.check_extensions(&["vacation"]).is_ok());
    }
}
