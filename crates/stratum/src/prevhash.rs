use super::*;

/// The `prevhash` field of `mining.notify`. Unlike [`MerkleNode`], the wire
/// encoding swaps the byte order of each 4-byte word of the block hash
/// relative to its natural (internal) byte order, per the historical stratum
/// convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct PrevHash([u8; 32]);

fn swap_words(bytes: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, chunk) in bytes.chunks(4).enumerate() {
        let mut word = [chunk[0], chunk[1], chunk[2], chunk[3]];
        word.reverse();
        out[i * 4..i * 4 + 4].copy_from_slice(&word);
    }
    out
}

impl PrevHash {
    pub fn as_byte_array(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_byte_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<BlockHash> for PrevHash {
    fn from(hash: BlockHash) -> Self {
        Self(hash.to_byte_array())
    }
}

impl From<PrevHash> for BlockHash {
    fn from(prevhash: PrevHash) -> Self {
        BlockHash::from_byte_array(prevhash.0)
    }
}

impl FromStr for PrevHash {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(InternalError::Parse {
                message: format!("prevhash must be 64 hex characters, got {}", s.len()),
            });
        }

        let mut wire = [0u8; 32];
        hex::decode_to_slice(s, &mut wire).map_err(|e| InternalError::Parse {
            message: format!("invalid prevhash hex '{s}': {e}"),
        })?;

        Ok(PrevHash(swap_words(&wire)))
    }
}

impl fmt::Display for PrevHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(swap_words(&self.0)))
    }
}
