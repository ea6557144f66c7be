//! Reader half of the binary format.

use sieve_types::ExtensionId;

use crate::error::BinaryError;

use super::Binary;

pub trait Decoder: Sized {
    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, BinaryError>;
}

pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, BinaryError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or(BinaryError::Truncated { wanted: 1, available: 0 })?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], BinaryError> {
        if self.remaining() < n {
            return Err(BinaryError::Truncated {
                wanted: n,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_varint(&mut self) -> Result<u64, BinaryError> {
        let mut value = 0u64;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 63 {
                return Err(BinaryError::BadVarint);
            }
        }
        Ok(value)
    }

    pub fn read_string(&mut self) -> Result<String, BinaryError> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| BinaryError::BadString)
    }

    /// Reads a [`sieve_types::ast::StringLit`] in the `codegen::write_string_lit`
    /// wire shape: a part count followed by tagged parts (0 = literal text,
    /// 1 = variable reference, 2 = match-value reference).
    pub fn read_string_lit(&mut self) -> Result<sieve_types::ast::StringLit, BinaryError> {
        use sieve_types::ast::StringPart;
        let count = self.read_varint()?;
        let mut parts = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let tag = self.read_u8()?;
            parts.push(match tag {
                0 => StringPart::Literal(self.read_string()?),
                1 => StringPart::VarRef(self.read_string()?),
                2 => StringPart::MatchRef(self.read_varint()? as usize),
                _ => return Err(BinaryError::BadString),
            });
        }
        Ok(sieve_types::ast::StringLit { parts })
    }

    pub fn read_string_list(&mut self) -> Result<Vec<sieve_types::ast::StringLit>, BinaryError> {
        let count = self.read_varint()?;
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            out.push(self.read_string_lit()?);
        }
        Ok(out)
    }
}

fn decode_extension_table(bytes: &[u8]) -> Result<Vec<(ExtensionId, String)>, BinaryError> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_varint()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let id = cursor.read_varint()? as u16;
        let name = cursor.read_string()?;
        out.push((ExtensionId(id), name));
    }
    Ok(out)
}

pub fn decode_binary(bytes: &[u8]) -> Result<Binary, BinaryError> {
    if bytes.len() < super::MAGIC.len() + 1 || &bytes[..super::MAGIC.len()] != super::MAGIC {
        return Err(BinaryError::BadMagic);
    }
    let mut cursor = Cursor::new(&bytes[super::MAGIC.len()..]);
    let abi_version = cursor.read_u8()?;
    if abi_version != super::ABI_VERSION {
        return Err(BinaryError::UnsupportedAbi(abi_version));
    }
    let block_count = cursor.read_varint()? as usize;
    let table_len = cursor.read_varint()? as usize;
    let table_bytes = cursor.read_bytes(table_len)?;
    let mut table_cursor = Cursor::new(table_bytes);
    let mut offsets = Vec::with_capacity(block_count);
    for _ in 0..block_count {
        let offset = table_cursor.read_varint()?;
        let len = table_cursor.read_varint()?;
        offsets.push((offset, len));
    }

    let data_start = cursor.pos;
    let data = cursor.bytes;
    let mut blocks = Vec::with_capacity(block_count);
    for (i, (offset, len)) in offsets.iter().enumerate() {
        let start = data_start + *offset as usize;
        let end = start + *len as usize;
        if end > data.len() {
            return Err(BinaryError::BadBlockIndex(i as u32));
        }
        blocks.push(data[start..end].to_vec());
    }

    if blocks.is_empty() {
        return Err(BinaryError::BadBlockIndex(0));
    }
    let extensions = decode_extension_table(&blocks[0])?;
    let code_blocks = blocks.into_iter().skip(1).collect();

    Ok(Binary {
        abi_version,
        extensions,
        blocks: code_blocks,
    })
}
