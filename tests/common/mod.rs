//! Builds synthetic hive images for the integration tests.
//!
//! Records are appended bottom-up: children first, then the lists pointing
//! at them, then their parents. Every `add_*` method returns the stored
//! (relative) offset of the record it wrote.

#![allow(dead_code)]

pub const BASE: usize = 0x1000;
pub const NIL: u32 = 0xFFFF_FFFF;

const KEY_COMP_NAME: u16 = 0x0020;
const KEY_ROOT_FLAGS: u16 = 0x002C;
const VALUE_COMP_NAME: u16 = 0x0001;
pub const REG_SZ: u32 = 1;
pub const REG_BINARY: u32 = 3;
pub const REG_DWORD: u32 = 4;

pub struct HiveBuilder {
    bin: Vec<u8>,
}

impl HiveBuilder {
    pub fn new() -> Self {
        let mut bin = Vec::new();
        bin.extend_from_slice(b"hbin");
        bin.resize(0x20, 0);
        Self { bin }
    }

    /// Appends an allocated cell sized to fit `body`, padded to 8 bytes.
    pub fn add_cell(&mut self, body: &[u8]) -> u32 {
        let size = (4 + body.len() + 7) & !7;
        self.add_raw_cell(-(size as i32), body)
    }

    /// Appends a cell with an explicit length field.
    pub fn add_raw_cell(&mut self, length: i32, body: &[u8]) -> u32 {
        let offset = self.bin.len();
        let size = (length.unsigned_abs() as usize).max(4 + body.len());
        self.bin.extend_from_slice(&length.to_le_bytes());
        self.bin.extend_from_slice(body);
        self.bin.resize(offset + ((size + 7) & !7), 0);
        offset as u32
    }

    /// Appends a key record with an ASCII name.
    pub fn add_key_record(
        &mut self,
        name: &str,
        flags: u16,
        subkeys: (u32, u32),
        values: (u32, u32),
        class_name: Option<u32>,
        class_name_length: u16,
    ) -> u32 {
        let name_bytes = if flags & KEY_COMP_NAME != 0 {
            name.as_bytes().to_vec()
        } else {
            utf16(name)
        };

        let mut body = vec![0u8; 0x4C];
        body[0..2].copy_from_slice(b"nk");
        put_u16(&mut body, 0x02, flags);
        put_u64(&mut body, 0x04, 0x01D9_0000_0000_0000);
        put_u32(&mut body, 0x10, NIL);
        put_u32(&mut body, 0x14, subkeys.0);
        put_u32(&mut body, 0x1C, subkeys.1);
        put_u32(&mut body, 0x20, NIL);
        put_u32(&mut body, 0x24, values.0);
        put_u32(&mut body, 0x28, values.1);
        put_u32(&mut body, 0x2C, NIL);
        put_u32(&mut body, 0x30, class_name.unwrap_or(NIL));
        put_u16(&mut body, 0x48, name_bytes.len() as u16);
        put_u16(&mut body, 0x4A, class_name_length);
        body.extend_from_slice(&name_bytes);
        self.add_cell(&body)
    }

    /// Appends a key with an `lf` list over `subkeys` and a value list over `values`.
    pub fn add_key(&mut self, name: &str, subkeys: &[u32], values: &[u32]) -> u32 {
        self.add_key_with_flags(name, KEY_COMP_NAME, subkeys, values)
    }

    /// Like [`HiveBuilder::add_key`], flagged as the hive root.
    pub fn add_root(&mut self, name: &str, subkeys: &[u32], values: &[u32]) -> u32 {
        self.add_key_with_flags(name, KEY_ROOT_FLAGS, subkeys, values)
    }

    pub fn add_key_with_flags(
        &mut self,
        name: &str,
        flags: u16,
        subkeys: &[u32],
        values: &[u32],
    ) -> u32 {
        let subkey_list = if subkeys.is_empty() {
            NIL
        } else {
            self.add_list(b"lf", subkeys)
        };
        let value_list = if values.is_empty() {
            NIL
        } else {
            self.add_value_list(values)
        };
        self.add_key_record(
            name,
            flags,
            (subkeys.len() as u32, subkey_list),
            (values.len() as u32, value_list),
            None,
            0,
        )
    }

    /// Appends a key whose subkey list was built separately.
    pub fn add_key_with_list(&mut self, name: &str, subkey_count: u32, list: u32) -> u32 {
        self.add_key_record(name, KEY_COMP_NAME, (subkey_count, list), (0, NIL), None, 0)
    }

    /// Appends a subkey list. `li` and `ri` entries are 4 bytes, `lf` and `lh` 8.
    pub fn add_list(&mut self, sig: &[u8; 2], entries: &[u32]) -> u32 {
        let mut body = Vec::new();
        body.extend_from_slice(sig);
        body.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for &entry in entries {
            body.extend_from_slice(&entry.to_le_bytes());
            match sig {
                b"lf" => body.extend_from_slice(b"\0\0\0\0"),
                b"lh" => body.extend_from_slice(&0x1234_5678u32.to_le_bytes()),
                _ => {}
            }
        }
        self.add_cell(&body)
    }

    pub fn add_value_list(&mut self, values: &[u32]) -> u32 {
        let body: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.add_cell(&body)
    }

    /// Appends a value record.
    pub fn add_value_record(
        &mut self,
        name: &str,
        value_type: u32,
        raw_data_length: u32,
        data_field: [u8; 4],
    ) -> u32 {
        let mut body = vec![0u8; 0x14];
        body[0..2].copy_from_slice(b"vk");
        put_u16(&mut body, 0x02, name.len() as u16);
        put_u32(&mut body, 0x04, raw_data_length);
        body[0x08..0x0C].copy_from_slice(&data_field);
        put_u32(&mut body, 0x0C, value_type);
        put_u16(&mut body, 0x10, VALUE_COMP_NAME);
        body.extend_from_slice(name.as_bytes());
        self.add_cell(&body)
    }

    /// Appends a value whose payload (at most 4 bytes) lives in the record.
    pub fn add_inline_value(&mut self, name: &str, value_type: u32, data: &[u8]) -> u32 {
        let mut field = [0u8; 4];
        field[..data.len()].copy_from_slice(data);
        self.add_value_record(name, value_type, 0x8000_0000 | data.len() as u32, field)
    }

    /// Appends a value whose payload is stored in its own cell.
    pub fn add_value(&mut self, name: &str, value_type: u32, data: &[u8]) -> u32 {
        let data_offset = self.add_cell(data);
        self.add_value_record(name, value_type, data.len() as u32, data_offset.to_le_bytes())
    }

    /// Appends a data block whose usable payload is exactly `payload`.
    pub fn add_block(&mut self, payload: &[u8]) -> u32 {
        self.add_raw_cell(-((payload.len() + 8) as i32), payload)
    }

    /// Appends a value whose payload is split into `chunk`-sized blocks behind a "db" header.
    pub fn add_big_value(&mut self, name: &str, value_type: u32, data: &[u8], chunk: usize) -> u32 {
        let blocks: Vec<u32> = data.chunks(chunk).map(|c| self.add_block(c)).collect();
        let block_list = self.add_value_list(&blocks);

        let mut db = Vec::new();
        db.extend_from_slice(b"db");
        db.extend_from_slice(&(blocks.len() as u16).to_le_bytes());
        db.extend_from_slice(&block_list.to_le_bytes());
        let db_offset = self.add_cell(&db);

        self.add_value_record(name, value_type, data.len() as u32, db_offset.to_le_bytes())
    }

    /// Appends a UTF-16 class name cell and returns its offset and byte length.
    pub fn add_class_name(&mut self, class_name: &str) -> (u32, u16) {
        let bytes = utf16(class_name);
        (self.add_cell(&bytes), bytes.len() as u16)
    }

    /// Writes the header in front of the bins and returns the hive image.
    pub fn finish(self, root: u32) -> Vec<u8> {
        let mut bin = self.bin;
        let bin_size = (bin.len() + 0xFFF) & !0xFFF;
        bin.resize(bin_size, 0);
        put_u32(&mut bin, 0x08, bin_size as u32);

        let mut data = vec![0u8; BASE];
        data[0..4].copy_from_slice(b"regf");
        put_u32(&mut data, 0x04, 1);
        put_u32(&mut data, 0x08, 1);
        put_u64(&mut data, 0x0C, 0x01D9_0000_0000_0000);
        put_u32(&mut data, 0x14, 1);
        put_u32(&mut data, 0x18, 5);
        put_u32(&mut data, 0x20, 1);
        put_u32(&mut data, 0x24, root);
        put_u32(&mut data, 0x28, bin_size as u32);
        put_u32(&mut data, 0x2C, 1);
        let name = utf16("SOFTWARE");
        data[0x30..0x30 + name.len()].copy_from_slice(&name);
        fix_checksum(&mut data);

        data.extend_from_slice(&bin);
        data
    }
}

pub fn fix_checksum(data: &mut [u8]) {
    let checksum = data[..508]
        .chunks_exact(4)
        .fold(0u32, |acc, dword| acc ^ u32::from_le_bytes([dword[0], dword[1], dword[2], dword[3]]));
    put_u32(data, 0x1FC, checksum);
}

pub fn utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

pub fn put_u16(data: &mut [u8], pos: usize, value: u16) {
    data[pos..pos + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(data: &mut [u8], pos: usize, value: u32) {
    data[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u64(data: &mut [u8], pos: usize, value: u64) {
    data[pos..pos + 8].copy_from_slice(&value.to_le_bytes());
}

/// A 164-byte `DigitalProductId` whose encoded key is `encoded`.
pub fn digital_product_id(encoded: &[u8; 15]) -> Vec<u8> {
    let mut dpid = vec![0u8; 164];
    put_u32(&mut dpid, 0, 164);
    put_u16(&mut dpid, 4, 3);
    dpid[8..31].copy_from_slice(b"00371-OEM-8992671-00524");
    dpid[52..67].copy_from_slice(encoded);
    dpid
}

/// A SOFTWARE-like hive with `Microsoft\Windows NT\CurrentVersion\DigitalProductId`.
///
/// The product id is stored in a single data cell.
pub fn software_hive(encoded: &[u8; 15]) -> Vec<u8> {
    let mut b = HiveBuilder::new();
    let dpid = b.add_value("DigitalProductId", REG_BINARY, &digital_product_id(encoded));
    let product_name = b.add_value("ProductName", REG_SZ, &utf16("Windows 10 Pro\0"));
    let build = b.add_inline_value("CurrentMajorVersionNumber", REG_DWORD, &10u32.to_le_bytes());
    let current_version = b.add_key("CurrentVersion", &[], &[product_name, build, dpid]);
    let fonts = b.add_key("Fonts", &[], &[]);
    let windows_nt = b.add_key("Windows NT", &[current_version, fonts], &[]);
    let windows = b.add_key("Windows", &[], &[]);
    let microsoft = b.add_key("Microsoft", &[windows, windows_nt], &[]);
    let classes = b.add_key("Classes", &[], &[]);
    let root = b.add_root("ROOT", &[classes, microsoft], &[]);
    b.finish(root)
}
