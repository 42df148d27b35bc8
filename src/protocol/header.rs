use packed_struct::prelude::*;

/// First byte of every frame, in both directions.
pub const MAGIC: u8 = 0xbb;

pub const HEADER_SIZE: usize = 5;
pub const QUERY_COMMAND_SIZE: usize = 8;
pub const STATE_COMMAND_SIZE: usize = 35;
pub const REPORT_SIZE: usize = 61;

/// Sender of a frame, as found in header bytes `01..02` (little-endian).
#[derive(PrimitiveEnum_u16, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Controller = 0x0001,
    Appliance = 0x0100,
}

/// Header byte `03`.
///
/// Reports reuse the same codes: `0x03` answers a state command,
/// `0x04` answers a query.
#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandType {
    SetState = 0x03,
    QueryState = 0x04,
}

/// The 5 byte prefix shared by every frame.
#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(bit_numbering="msb0", size_bytes="5")]
pub struct Header {
    #[packed_field(bytes="0")]
    pub magic: u8,

    #[packed_field(bytes="1:2", endian="lsb")]
    pub source: u16,

    #[packed_field(bytes="3")]
    pub command: u8,

    /// Number of bytes following the header, excluding the trailing checksum.
    #[packed_field(bytes="4")]
    pub length: u8,
}

impl Header {
    pub fn new(source: Source, command: CommandType, length: u8) -> Self {
        Self {
            magic: MAGIC,
            source: source.to_primitive(),
            command: command.to_primitive(),
            length,
        }
    }

    pub fn has_magic(&self) -> bool {
        self.magic == MAGIC
    }

    pub fn source_kind(&self) -> Option<Source> {
        Source::from_primitive(self.source)
    }

    pub fn command_type(&self) -> Option<CommandType> {
        CommandType::from_primitive(self.command)
    }

    /// Size of the whole frame this header announces, checksum included.
    pub fn frame_size(&self) -> usize {
        HEADER_SIZE + self.length as usize + 1
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_pack() {
        let header = Header::new(Source::Controller, CommandType::SetState, 0x1d);
        assert_eq!(header.pack().unwrap(), [0xbb, 0x01, 0x00, 0x03, 0x1d]);
        assert_eq!(header.frame_size(), STATE_COMMAND_SIZE);
    }

    #[test]
    fn test_header_unpack() {
        let header = Header::unpack(&[0xbb, 0x00, 0x01, 0x04, 0x36]).unwrap();
        assert!(header.has_magic());
        assert_eq!(header.source_kind(), Some(Source::Appliance));
        assert_eq!(header.command_type(), Some(CommandType::QueryState));
        assert_eq!(header.frame_size(), 5 + 0x36 + 1);

        let header = Header::unpack(&[0x00, 0x12, 0x34, 0x7f, 0x00]).unwrap();
        assert!(!header.has_magic());
        assert_eq!(header.source, 0x3412);
        assert_eq!(header.source_kind(), None);
        assert_eq!(header.command_type(), None);
    }
}
