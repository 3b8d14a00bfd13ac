//! Static registry of the panel's eight logical tiles.
//!
//! Each tile is one independently addressable display region,
//! identified on the wire by a protocol byte and a single ASCII
//! sequence character. The table is fixed panel firmware
//! configuration: identifiers and sequence characters are sent
//! verbatim, never inferred, even where the firmware assigns the same
//! sequence character to two tiles.

pub mod payload;

/// One logical tile on the panel, in cycling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileId {
    /// CPU model, temperature, usage, frequency.
    Cpu,
    /// GPU name, temperature, utilization.
    Gpu,
    /// Memory usage and vendor label.
    Memory,
    /// Root filesystem usage and disk label.
    Disk,
    /// Date, time, weekday and weather.
    Date,
    /// Fan speed and network throughput.
    Network,
    /// Audio sink volume.
    Volume,
    /// Battery charge.
    Battery,
}

/// Immutable protocol identity of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileDefinition {
    /// Logical tile.
    pub id: TileId,
    /// Tile identifier byte sent in reply frames.
    pub code: u8,
    /// Sequence character used for this tile during steady state.
    pub seq: u8,
}

/// All eight tiles in the fixed cycling order.
///
/// Battery shares '2' with CPU; that is the firmware's own table and
/// must not be deduplicated.
pub const TILE_CYCLE: [TileDefinition; 8] = [
    TileDefinition { id: TileId::Cpu, code: 0x53, seq: b'2' },
    TileDefinition { id: TileId::Gpu, code: 0x36, seq: b'3' },
    TileDefinition { id: TileId::Memory, code: 0x49, seq: b'4' },
    TileDefinition { id: TileId::Disk, code: 0x4F, seq: b'5' },
    TileDefinition { id: TileId::Date, code: 0x6B, seq: b'6' },
    TileDefinition { id: TileId::Network, code: 0x27, seq: b'7' },
    TileDefinition { id: TileId::Volume, code: 0x10, seq: b'9' },
    TileDefinition { id: TileId::Battery, code: 0x1A, seq: b'2' },
];

/// Tile used for the unlock reply: the first tile in cycling order.
pub const KICK_TILE: TileId = TileId::Cpu;

impl TileId {
    /// Look up this tile's protocol definition.
    pub const fn definition(self) -> &'static TileDefinition {
        &TILE_CYCLE[self.index()]
    }

    /// Tile identifier byte.
    pub const fn code(self) -> u8 {
        self.definition().code
    }

    /// Steady-state sequence character.
    pub const fn seq(self) -> u8 {
        self.definition().seq
    }

    /// Position in the cycling order.
    pub const fn index(self) -> usize {
        match self {
            TileId::Cpu => 0,
            TileId::Gpu => 1,
            TileId::Memory => 2,
            TileId::Disk => 3,
            TileId::Date => 4,
            TileId::Network => 5,
            TileId::Volume => 6,
            TileId::Battery => 7,
        }
    }

    /// Short name for logging.
    pub const fn name(self) -> &'static str {
        match self {
            TileId::Cpu => "cpu",
            TileId::Gpu => "gpu",
            TileId::Memory => "mem",
            TileId::Disk => "disk",
            TileId::Date => "date",
            TileId::Network => "net",
            TileId::Volume => "vol",
            TileId::Battery => "bat",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_matches_panel_table() {
        let expected: [(TileId, u8, u8); 8] = [
            (TileId::Cpu, 0x53, b'2'),
            (TileId::Gpu, 0x36, b'3'),
            (TileId::Memory, 0x49, b'4'),
            (TileId::Disk, 0x4F, b'5'),
            (TileId::Date, 0x6B, b'6'),
            (TileId::Network, 0x27, b'7'),
            (TileId::Volume, 0x10, b'9'),
            (TileId::Battery, 0x1A, b'2'),
        ];

        for (i, (id, code, seq)) in expected.into_iter().enumerate() {
            assert_eq!(TILE_CYCLE[i].id, id);
            assert_eq!(id.code(), code);
            assert_eq!(id.seq(), seq);
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_battery_and_cpu_share_sequence_char() {
        // Firmware idiosyncrasy, preserved verbatim.
        assert_eq!(TileId::Battery.seq(), TileId::Cpu.seq());
    }

    #[test]
    fn test_kick_tile_is_first_in_cycle() {
        assert_eq!(KICK_TILE, TILE_CYCLE[0].id);
    }
}
