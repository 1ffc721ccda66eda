//! Protocol commands and their 32-bit wire encoding.
//!
//! On the wire a command is a single word: a 6-bit opcode in the highest
//! bits, a 4-bit disk index below it, and the block index in the low
//! 22 bits. Only seek-to-disk carries a disk and only seek-to-block
//! carries a block; the other commands leave both fields zero. The
//! packing is confined to [`Command::encode`] / [`Command::decode`] —
//! nothing above this module manipulates the raw word.

use jbod_error::{JbodError, Result};
use jbod_types::{BlockIndex, DiskId};

const OPCODE_SHIFT: u32 = 26;
const DISK_SHIFT: u32 = 22;
const DISK_FIELD: u32 = 0xF;
const BLOCK_FIELD: u32 = 0x3F_FFFF;

const OP_MOUNT: u32 = 0;
const OP_UNMOUNT: u32 = 1;
const OP_SEEK_TO_DISK: u32 = 2;
const OP_SEEK_TO_BLOCK: u32 = 3;
const OP_READ_BLOCK: u32 = 4;
const OP_WRITE_BLOCK: u32 = 5;

/// A single array command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Mount,
    Unmount,
    SeekToDisk(DiskId),
    SeekToBlock(BlockIndex),
    ReadBlock,
    WriteBlock,
}

impl Command {
    /// True iff a request frame for this command carries a block payload.
    #[must_use]
    pub fn carries_payload(self) -> bool {
        matches!(self, Self::WriteBlock)
    }

    /// Pack into the wire word.
    ///
    /// Disk and block indices are range-checked against the field widths;
    /// geometry validation upstream keeps them well inside.
    pub fn encode(self) -> Result<u32> {
        let (opcode, disk, block) = match self {
            Self::Mount => (OP_MOUNT, 0, 0),
            Self::Unmount => (OP_UNMOUNT, 0, 0),
            Self::SeekToDisk(disk) => (OP_SEEK_TO_DISK, disk.0, 0),
            Self::SeekToBlock(block) => (OP_SEEK_TO_BLOCK, 0, block.0),
            Self::ReadBlock => (OP_READ_BLOCK, 0, 0),
            Self::WriteBlock => (OP_WRITE_BLOCK, 0, 0),
        };
        if disk > DISK_FIELD {
            return Err(JbodError::Protocol(format!(
                "disk index {disk} does not fit the 4-bit wire field"
            )));
        }
        if block > BLOCK_FIELD {
            return Err(JbodError::Protocol(format!(
                "block index {block} does not fit the 22-bit wire field"
            )));
        }
        Ok((opcode << OPCODE_SHIFT) | (disk << DISK_SHIFT) | block)
    }

    /// Unpack a wire word.
    pub fn decode(word: u32) -> Result<Self> {
        let opcode = word >> OPCODE_SHIFT;
        let disk = (word >> DISK_SHIFT) & DISK_FIELD;
        let block = word & BLOCK_FIELD;
        match opcode {
            OP_MOUNT => Ok(Self::Mount),
            OP_UNMOUNT => Ok(Self::Unmount),
            OP_SEEK_TO_DISK => Ok(Self::SeekToDisk(DiskId(disk))),
            OP_SEEK_TO_BLOCK => Ok(Self::SeekToBlock(BlockIndex(block))),
            OP_READ_BLOCK => Ok(Self::ReadBlock),
            OP_WRITE_BLOCK => Ok(Self::WriteBlock),
            other => Err(JbodError::Protocol(format!("unknown opcode {other}"))),
        }
    }
}
