//! Bulletin payloads and their encoding into transaction outputs
//!
//! A bulletin is serialized as a protobuf body behind a magic header and a
//! length prefix, zero padded and split into 20-byte chunks. Each chunk is
//! carried as the hash of a P2PKH output paying the dust floor.

use crate::address::decode_address;
use crate::{Error, Result};
use bitcoin::hashes::Hash;
use bitcoin::{Amount, PubkeyHash, ScriptBuf, TxOut};
use bulletin_params::Network;
use prost::Message;

/// Header identifying bulletin-carrying outputs
pub const MAGIC: [u8; 8] = *b"BRETHREN";

/// Wire format version
pub const WIRE_VERSION: u32 = 1;

/// Maximum board name length in bytes
pub const MAX_BOARD_LENGTH: usize = 30;

/// Maximum message length in bytes
pub const MAX_MESSAGE_LENGTH: usize = 500;

/// Payload bytes carried by each output
pub const CHUNK_SIZE: usize = 20;

const HEADER_LEN: usize = MAGIC.len() + 2;

/// Protobuf body of an encoded bulletin
#[derive(Clone, PartialEq, prost::Message)]
pub struct WireBulletin {
    /// Wire format version
    #[prost(uint32, tag = "1")]
    pub version: u32,
    /// Board the bulletin is posted to (may be empty)
    #[prost(string, tag = "2")]
    pub board: String,
    /// Message text
    #[prost(string, tag = "3")]
    pub message: String,
    /// Creation time, seconds since the Unix epoch
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
}

/// A message to publish, authored by an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bulletin {
    /// Authoring address (string form)
    pub author: String,
    /// Board identifier
    pub board: String,
    /// Message text
    pub message: String,
}

impl Bulletin {
    /// Create a bulletin, validating board and message
    pub fn new(
        author: impl Into<String>,
        board: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self> {
        let bulletin = Self {
            author: author.into(),
            board: board.into(),
            message: message.into(),
        };
        bulletin.validate()?;
        Ok(bulletin)
    }

    /// Check length limits and allowed characters
    pub fn validate(&self) -> Result<()> {
        if self.board.len() > MAX_BOARD_LENGTH {
            return Err(Error::BulletinTooLong(format!(
                "Board is {} bytes, maximum is {} bytes",
                self.board.len(),
                MAX_BOARD_LENGTH
            )));
        }
        if self.message.is_empty() {
            return Err(Error::InvalidBulletin("Message is empty".to_string()));
        }
        if self.message.len() > MAX_MESSAGE_LENGTH {
            return Err(Error::BulletinTooLong(format!(
                "Message is {} bytes, maximum is {} bytes",
                self.message.len(),
                MAX_MESSAGE_LENGTH
            )));
        }
        if !is_valid_text(&self.board) || !is_valid_text(&self.message) {
            return Err(Error::InvalidBulletin(
                "Bulletin contains control characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Allows newline, tab and carriage return; no other control characters.
fn is_valid_text(text: &str) -> bool {
    text.chars()
        .all(|c| c == '\n' || c == '\t' || c == '\r' || !c.is_control())
}

/// Turns a bulletin into the ordered message outputs of a transaction
pub trait BulletinEncoder {
    /// Encode `bulletin` into outputs valued at `dust_floor`
    fn encode(&self, bulletin: &Bulletin, dust_floor: Amount, network: &Network)
        -> Result<Vec<TxOut>>;
}

/// Default bulletin codec
#[derive(Debug, Clone, Default)]
pub struct BulletinCodec {
    timestamp: Option<i64>,
}

impl BulletinCodec {
    /// Codec stamping bulletins with the current time
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec stamping bulletins with a fixed time
    pub fn with_timestamp(timestamp: i64) -> Self {
        Self {
            timestamp: Some(timestamp),
        }
    }

    /// Framed payload: magic, big endian body length, body, zero padding
    pub fn frame(&self, bulletin: &Bulletin) -> Result<Vec<u8>> {
        let wire = WireBulletin {
            version: WIRE_VERSION,
            board: bulletin.board.clone(),
            message: bulletin.message.clone(),
            timestamp: self
                .timestamp
                .unwrap_or_else(|| chrono::Utc::now().timestamp()),
        };
        let body = wire.encode_to_vec();
        let body_len = u16::try_from(body.len())
            .map_err(|_| Error::BulletinTooLong(format!("Encoded body is {} bytes", body.len())))?;

        let mut framed = Vec::with_capacity(HEADER_LEN + body.len() + CHUNK_SIZE);
        framed.extend_from_slice(&MAGIC);
        framed.extend_from_slice(&body_len.to_be_bytes());
        framed.extend_from_slice(&body);

        let padded = framed.len().div_ceil(CHUNK_SIZE) * CHUNK_SIZE;
        framed.resize(padded, 0);
        Ok(framed)
    }
}

impl BulletinEncoder for BulletinCodec {
    fn encode(
        &self,
        bulletin: &Bulletin,
        dust_floor: Amount,
        network: &Network,
    ) -> Result<Vec<TxOut>> {
        bulletin.validate()?;
        decode_address(&bulletin.author, network)?;

        let framed = self.frame(bulletin)?;
        let outputs: Vec<TxOut> = framed
            .chunks_exact(CHUNK_SIZE)
            .map(|chunk| {
                let mut hash = [0u8; CHUNK_SIZE];
                hash.copy_from_slice(chunk);
                TxOut {
                    value: dust_floor,
                    script_pubkey: ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)),
                }
            })
            .collect();

        tracing::debug!(
            "Encoded bulletin for board '{}' into {} outputs",
            bulletin.board,
            outputs.len()
        );

        Ok(outputs)
    }
}

/// Recover a bulletin body from the leading P2PKH outputs of a transaction.
pub fn decode_bulletin(outputs: &[TxOut]) -> Result<WireBulletin> {
    let mut bytes = Vec::new();
    let mut needed = HEADER_LEN;

    for out in outputs {
        if bytes.len() >= needed {
            break;
        }
        if !out.script_pubkey.is_p2pkh() {
            break;
        }
        bytes.extend_from_slice(&out.script_pubkey.as_bytes()[3..3 + CHUNK_SIZE]);

        if bytes.len() >= HEADER_LEN && needed == HEADER_LEN {
            if bytes[..MAGIC.len()] != MAGIC {
                return Err(Error::InvalidBulletin("Missing bulletin header".to_string()));
            }
            let body_len = u16::from_be_bytes([bytes[MAGIC.len()], bytes[MAGIC.len() + 1]]);
            needed = HEADER_LEN + body_len as usize;
        }
    }

    if bytes.len() < needed || needed == HEADER_LEN {
        return Err(Error::InvalidBulletin("Truncated bulletin".to_string()));
    }

    WireBulletin::decode(&bytes[HEADER_LEN..needed])
        .map_err(|e| Error::InvalidBulletin(format!("Malformed bulletin body: {}", e)))
}

/// Sum of the values committed to message outputs
pub fn total_burn(outputs: &[TxOut]) -> Result<Amount> {
    outputs.iter().try_fold(Amount::ZERO, |acc, out| {
        acc.checked_add(out.value)
            .ok_or_else(|| Error::AmountOverflow("Burn total overflow".to_string()))
    })
}
