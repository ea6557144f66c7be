//! Little-endian, ULEB128-varint encoding for the binary format.

use super::Binary;

/// Anything that can serialize itself into a byte buffer.
pub trait Encoder {
    fn encode(&self, out: &mut Vec<u8>);
}

pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        } else {
            out.push(byte | 0x80);
        }
    }
}

pub fn write_string(out: &mut Vec<u8>, s: &str) {
    write_varint(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

fn encode_extension_table(extensions: &[(sieve_types::ExtensionId, String)]) -> Vec<u8> {
    let mut out = Vec::new();
    write_varint(&mut out, extensions.len() as u64);
    for (id, name) in extensions {
        write_varint(&mut out, id.0 as u64);
        write_string(&mut out, name);
    }
    out
}

pub fn encode_binary(binary: &Binary) -> Vec<u8> {
    let ext_table = encode_extension_table(&binary.extensions);

    let mut all_blocks: Vec<&[u8]> = vec![&ext_table];
    for block in &binary.blocks {
        all_blocks.push(block);
    }

    let mut out = Vec::new();
    out.extend_from_slice(super::MAGIC);
    out.push(binary.abi_version);
    write_varint(&mut out, all_blocks.len() as u64);

    let mut offset = 0u64;
    let mut table = Vec::new();
    for block in &all_blocks {
        write_varint(&mut table, offset);
        write_varint(&mut table, block.len() as u64);
        offset += block.len() as u64;
    }
    write_varint(&mut out, table.len() as u64);
    out.extend_from_slice(&table);
    for block in &all_blocks {
        out.extend_from_slice(block);
    }
    out
}
