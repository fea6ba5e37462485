use std::fmt;

/// A 256-bit hash, opaque to this crate beyond byte equality and ordering.
pub type HashBytes = [u8; 32];

macro_rules! define_hash_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(HashBytes);

        impl $name {
            pub const fn from_bytes(bytes: HashBytes) -> Self {
                Self(bytes)
            }

            pub const fn as_bytes(&self) -> &HashBytes {
                &self.0
            }
        }

        impl From<HashBytes> for $name {
            fn from(bytes: HashBytes) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut buf = [0u8; 64];
                // Infallible: buf is exactly 2x the input length.
                faster_hex::hex_encode(&self.0, &mut buf).expect("hex buffer is correctly sized");
                f.write_str(std::str::from_utf8(&buf).expect("hex encoding is ASCII"))
            }
        }
    };
}

define_hash_id!(Txid, "Hash identifying a transaction, excluding witness data.");
define_hash_id!(Wtxid, "Hash identifying a transaction, including witness data.");

/// A transaction id whose kind (txid vs wtxid) is only known at runtime, used
/// at the `HaveTx` query boundary so callers can ask either question through
/// one call without the two hash kinds being implicitly interchangeable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum GenTxid {
    Txid(Txid),
    Wtxid(Wtxid),
}

impl GenTxid {
    pub fn is_wtxid(&self) -> bool {
        matches!(self, GenTxid::Wtxid(_))
    }
}

impl From<Txid> for GenTxid {
    fn from(id: Txid) -> Self {
        GenTxid::Txid(id)
    }
}

impl From<Wtxid> for GenTxid {
    fn from(id: Wtxid) -> Self {
        GenTxid::Wtxid(id)
    }
}

/// A previous output being spent: the id of the transaction that created it
/// and the index of the output within that transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct OutPoint {
    pub txid: Txid,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }
}

/// Opaque handle identifying a peer connection. The orphanage does not
/// interpret this value; it only groups orphans and work-set entries by it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PeerId(pub u64);

impl From<u64> for PeerId {
    fn from(id: u64) -> Self {
        PeerId(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
