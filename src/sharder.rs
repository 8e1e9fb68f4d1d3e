//! Sharder implementation.
use std::fmt;

/// Maps an arbitrary input onto one of `total_shards` shards.
pub trait Sharder {
    /// Return a shard in the range `[0, total_shards)` for `input`.
    fn get_shard(&self, input: impl AsRef<[u8]>, total_shards: u64) -> u64;
}

/// The default sharder: first four bytes of the MD5 digest, read big-endian, modulo the number of
/// shards.
pub struct Md5Sharder;

impl Sharder for Md5Sharder {
    fn get_shard(&self, input: impl AsRef<[u8]>, total_shards: u64) -> u64 {
        shard_from_digest(md5::compute(input), total_shards)
    }
}

/// A sharder with the salt already fed into the hash state. Equivalent to hashing `salt + input`
/// with [`Md5Sharder`], but the salt is only hashed once at compile time.
#[derive(Clone)]
pub struct PreSaltedSharder {
    ctx: md5::Context,
    total_shards: u64,
}

impl PreSaltedSharder {
    /// Create a sharder for the salt formed by concatenating all `salt` parts.
    pub fn new(salt: &[&[u8]], total_shards: u64) -> PreSaltedSharder {
        let mut ctx = md5::Context::new();
        for s in salt {
            ctx.consume(s);
        }
        PreSaltedSharder { ctx, total_shards }
    }

    /// Return a shard for `input`.
    pub fn get_shard(&self, input: impl AsRef<[u8]>) -> u64 {
        let mut ctx = self.ctx.clone();
        ctx.consume(input);
        shard_from_digest(ctx.compute(), self.total_shards)
    }
}

impl fmt::Debug for PreSaltedSharder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreSaltedSharder")
            .field("total_shards", &self.total_shards)
            .finish_non_exhaustive()
    }
}

fn shard_from_digest(digest: md5::Digest, total_shards: u64) -> u64 {
    let [a, b, c, d, ..] = digest.0;
    (u32::from_be_bytes([a, b, c, d]) as u64) % total_shards
}
