use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Factory entry of a dispute game: `gameType (32) | timestamp (64) | gameProxy (160)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(pub B256);

impl GameId {
    pub fn pack(game_type: u32, timestamp: u64, game_proxy: Address) -> Self {
        let mut word = [0u8; 32];
        word[0..4].copy_from_slice(&game_type.to_be_bytes());
        word[4..12].copy_from_slice(&timestamp.to_be_bytes());
        word[12..32].copy_from_slice(game_proxy.as_slice());
        Self(B256::from(word))
    }

    pub fn unpack(&self) -> (u32, u64, Address) {
        let bytes = &self.0.0;
        let mut game_type = [0u8; 4];
        game_type.copy_from_slice(&bytes[0..4]);
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&bytes[4..12]);
        (
            u32::from_be_bytes(game_type),
            u64::from_be_bytes(timestamp),
            Address::from_slice(&bytes[12..32]),
        )
    }

    pub fn game_proxy(&self) -> Address {
        self.unpack().2
    }

    pub fn as_word(&self) -> U256 {
        U256::from_be_bytes(self.0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GameStatus {
    InProgress = 0,
    ChallengerWins = 1,
    DefenderWins = 2,
}

impl GameStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(GameStatus::InProgress),
            1 => Some(GameStatus::ChallengerWins),
            2 => Some(GameStatus::DefenderWins),
            _ => None,
        }
    }
}

/// Storage slot 0 of a fault dispute game. Solidity packs the fields from the low-order end:
/// `createdAt (64) | resolvedAt (64) | status (8) | initialized (8) | l2BlockNumberChallenged (8)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatusSlot {
    pub created_at: u64,
    pub resolved_at: u64,
    pub game_status: GameStatus,
    pub initialized: bool,
    pub l2_block_number_challenged: bool,
}

impl GameStatusSlot {
    pub fn to_word(&self) -> U256 {
        U256::from(self.created_at)
            | (U256::from(self.resolved_at) << 64)
            | (U256::from(self.game_status as u8) << 128)
            | (U256::from(self.initialized as u8) << 136)
            | (U256::from(self.l2_block_number_challenged as u8) << 144)
    }

    /// Decodes the packed word; `None` if the status byte is not a known status.
    pub fn from_word(word: U256) -> Option<Self> {
        let bytes = word.to_be_bytes::<32>();
        let mut created_at = [0u8; 8];
        created_at.copy_from_slice(&bytes[24..32]);
        let mut resolved_at = [0u8; 8];
        resolved_at.copy_from_slice(&bytes[16..24]);
        Some(Self {
            created_at: u64::from_be_bytes(created_at),
            resolved_at: u64::from_be_bytes(resolved_at),
            game_status: GameStatus::from_u8(bytes[15])?,
            initialized: bytes[14] != 0,
            l2_block_number_challenged: bytes[13] != 0,
        })
    }

    /// A game's root claim is trusted only once it resolved for the defender.
    pub fn is_finalized(&self) -> bool {
        self.initialized && self.resolved_at != 0 && self.game_status == GameStatus::DefenderWins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_boundaries() {
        let cases = [
            (0u32, 0u64, Address::ZERO),
            (u32::MAX, u64::MAX, Address::repeat_byte(0xff)),
            (1, 1_714_000_000, Address::repeat_byte(0x4d)),
            (u32::MAX, 0, Address::ZERO),
            (0, u64::MAX, Address::repeat_byte(0x01)),
        ];
        for (game_type, timestamp, proxy) in cases {
            let id = GameId::pack(game_type, timestamp, proxy);
            assert_eq!(id.unpack(), (game_type, timestamp, proxy));
        }
    }

    #[test]
    fn test_pack_bit_layout() {
        let proxy = Address::repeat_byte(0xab);
        let id = GameId::pack(1, 2, proxy);
        let expected = (U256::from(1) << 224) | (U256::from(2) << 160) | U256::from_be_slice(proxy.as_slice());
        assert_eq!(id.as_word(), expected);
        assert_eq!(id.game_proxy(), proxy);
    }

    #[test]
    fn test_status_slot_layout() {
        let slot = GameStatusSlot {
            created_at: 0x1111,
            resolved_at: 0x2222,
            game_status: GameStatus::DefenderWins,
            initialized: true,
            l2_block_number_challenged: false,
        };
        let word = slot.to_word();
        assert_eq!(word & U256::from(u64::MAX), U256::from(0x1111));
        assert_eq!((word >> 64) & U256::from(u64::MAX), U256::from(0x2222));
        assert_eq!((word >> 128) & U256::from(0xff), U256::from(2));
        assert_eq!((word >> 136) & U256::from(0xff), U256::from(1));
        assert_eq!(word >> 144, U256::ZERO);
        assert_eq!(GameStatusSlot::from_word(word), Some(slot));
        assert!(slot.is_finalized());
    }

    #[test]
    fn test_finalized_predicate() {
        let resolved = GameStatusSlot {
            created_at: 10,
            resolved_at: 20,
            game_status: GameStatus::DefenderWins,
            initialized: true,
            l2_block_number_challenged: false,
        };
        assert!(!GameStatusSlot { initialized: false, ..resolved }.is_finalized());
        assert!(!GameStatusSlot { resolved_at: 0, ..resolved }.is_finalized());
        assert!(!GameStatusSlot { game_status: GameStatus::InProgress, ..resolved }.is_finalized());
        assert!(!GameStatusSlot { game_status: GameStatus::ChallengerWins, ..resolved }.is_finalized());
        assert_eq!(GameStatusSlot::from_word(U256::from(7) << 128), None);
    }
}
