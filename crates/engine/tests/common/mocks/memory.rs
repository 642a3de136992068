use std::collections::HashMap;

use dedupsim_core::common::LineAddr;
use dedupsim_core::mem::LineSource;

/// Line-content source backed by a hash map.
///
/// Lines that were never set resolve to a deterministic per-address ramp
/// pattern, so unrelated addresses carry distinct, incompressible content
/// unless a test aliases them on purpose.
pub struct ScriptedMemory {
    lines: HashMap<u64, Vec<u8>>,
    line_bytes: usize,
}

impl ScriptedMemory {
    /// Creates an empty memory serving `line_bytes`-byte lines.
    pub fn new(line_bytes: usize) -> Self {
        Self {
            lines: HashMap::new(),
            line_bytes,
        }
    }

    /// Pins the content of one line.
    pub fn set_line(&mut self, addr: u64, content: &[u8]) {
        assert_eq!(content.len(), self.line_bytes);
        let _ = self.lines.insert(addr, content.to_vec());
    }
}

impl LineSource for ScriptedMemory {
    fn read_line(&self, addr: LineAddr, buf: &mut [u8]) {
        if let Some(content) = self.lines.get(&addr.val()) {
            buf.copy_from_slice(content);
        } else {
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = i as u8;
            }
            buf[0] = addr.val() as u8;
            buf[1] = (addr.val() >> 8) as u8 ^ 0xA5;
        }
    }
}
