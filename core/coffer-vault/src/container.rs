//! Streaming `PVLT1` payload containers.
//!
//! A container holds one encrypted payload as a header plus a run of
//! independently sealed chunks, so arbitrarily large files stream through
//! a single chunk-sized buffer. All integers are big-endian.
//!
//! ```text
//! offset  size  field
//! 0       5     magic          = ASCII "PVLT1"
//! 5       4     chunkSize      (plaintext bytes per non-final chunk)
//! 9       8     noncePrefix    (random, unique per file)
//! 17      8     originalSize   (total plaintext length)
//! 25      4     chunkCount
//! 29      …     chunkCount × { 4  sealedLen | sealedLen  sealedBytes }
//! ```
//!
//! Chunk `i` is sealed with nonce `noncePrefix ‖ INT32BE(i)`. Decoding
//! re-derives that nonce and requires the one embedded in the chunk to
//! match, so a chunk cannot be reordered within its file or spliced in
//! from another file: both change the expected nonce and fail before the
//! cipher is even consulted.
//!
//! Encode and decode both go through a temp file in the destination's
//! parent directory and rename on success; a failed decode never leaves
//! partial plaintext at the destination.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use coffer_crypto::{CryptoError, SecretKey, NONCE_SIZE, SEAL_OVERHEAD};
use rand::rngs::OsRng;
use rand::RngCore;
use tempfile::NamedTempFile;

use crate::error::{VaultError, VaultResult};

/// Container magic: ASCII "PVLT1".
pub const MAGIC: &[u8; 5] = b"PVLT1";

/// Fixed header length: magic + chunkSize + noncePrefix + originalSize + chunkCount.
pub const HEADER_LEN: usize = 5 + 4 + 8 + 8 + 4;

/// Byte offset of the `originalSize` field, patched after streaming.
const ORIGINAL_SIZE_OFFSET: u64 = 17;

/// Length of the per-file random nonce prefix.
pub const NONCE_PREFIX_LEN: usize = 8;

/// Default plaintext chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: u32 = 1_048_576;

/// Chunk sizes must fit a signed 32-bit length downstream.
const MAX_CHUNK_SIZE: u32 = i32::MAX as u32;

/// Deterministic nonce for chunk `index`: prefix ‖ INT32BE(index).
fn chunk_nonce(prefix: &[u8; NONCE_PREFIX_LEN], index: u32) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..NONCE_PREFIX_LEN].copy_from_slice(prefix);
    nonce[NONCE_PREFIX_LEN..].copy_from_slice(&index.to_be_bytes());
    nonce
}

/// Fill `buf` from `reader`, tolerating short reads. Returns the number of
/// bytes read; less than `buf.len()` means end of input.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Map truncated-input I/O errors to the container's own EOF kind.
fn decode_io(e: io::Error) -> VaultError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        VaultError::UnexpectedEof
    } else {
        VaultError::Io(e)
    }
}

fn read_u32<R: Read>(reader: &mut R) -> VaultResult<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(decode_io)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> VaultResult<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).map_err(decode_io)?;
    Ok(u64::from_be_bytes(buf))
}

/// Stream-encrypt `reader` into `writer` as a `PVLT1` container.
///
/// Memory use is bounded by one chunk buffer regardless of input size.
/// `originalSize` and `chunkCount` are written as placeholders and patched
/// once the input is exhausted, so the input length need not be known up
/// front. Returns the total plaintext byte count.
///
/// An empty input produces exactly one sealed chunk over the empty
/// plaintext (decoders also accept `chunkCount = 0` as an empty file).
pub fn encrypt_stream<R, W>(
    key: &SecretKey,
    reader: &mut R,
    writer: &mut W,
    chunk_size: u32,
) -> VaultResult<u64>
where
    R: Read,
    W: Write + Seek,
{
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(VaultError::InvalidChunkSize);
    }

    let mut prefix = [0u8; NONCE_PREFIX_LEN];
    OsRng.fill_bytes(&mut prefix);

    writer.write_all(MAGIC)?;
    writer.write_all(&chunk_size.to_be_bytes())?;
    writer.write_all(&prefix)?;
    writer.write_all(&0u64.to_be_bytes())?; // originalSize, patched below
    writer.write_all(&0u32.to_be_bytes())?; // chunkCount, patched below

    let mut buf = vec![0u8; chunk_size as usize];
    let mut total: u64 = 0;
    let mut chunks: u32 = 0;

    loop {
        let n = read_chunk(reader, &mut buf)?;
        if n == 0 && chunks > 0 {
            break;
        }

        let nonce = chunk_nonce(&prefix, chunks);
        let sealed = coffer_crypto::seal_with_nonce(key, &nonce, &buf[..n])?;
        writer.write_all(&(sealed.len() as u32).to_be_bytes())?;
        writer.write_all(&sealed)?;

        total += n as u64;
        chunks = chunks
            .checked_add(1)
            .ok_or_else(|| VaultError::Malformed("chunk count overflow".into()))?;

        if n == 0 {
            // Empty input: one sealed empty chunk, then stop.
            break;
        }
    }

    writer.seek(SeekFrom::Start(ORIGINAL_SIZE_OFFSET))?;
    writer.write_all(&total.to_be_bytes())?;
    writer.write_all(&chunks.to_be_bytes())?;
    writer.seek(SeekFrom::End(0))?;
    writer.flush()?;

    Ok(total)
}

/// Stream-decrypt a `PVLT1` container from `reader` into `writer`.
///
/// Strict: every chunk's embedded nonce must match its position, every
/// non-final chunk must be exactly `chunkSize` of plaintext, nothing may
/// follow the final chunk, and the decoded length must equal the header's
/// `originalSize`. Returns the plaintext byte count.
pub fn decrypt_stream<R, W>(key: &SecretKey, reader: &mut R, writer: &mut W) -> VaultResult<u64>
where
    R: Read,
    W: Write,
{
    let mut magic = [0u8; MAGIC.len()];
    reader.read_exact(&mut magic).map_err(decode_io)?;
    if &magic != MAGIC {
        return Err(VaultError::InvalidMagic);
    }

    let chunk_size = read_u32(reader)?;
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(VaultError::Malformed(format!(
            "chunk size {chunk_size} out of range"
        )));
    }

    let mut prefix = [0u8; NONCE_PREFIX_LEN];
    reader.read_exact(&mut prefix).map_err(decode_io)?;
    let original_size = read_u64(reader)?;
    let chunk_count = read_u32(reader)?;

    let max_sealed = chunk_size as usize + SEAL_OVERHEAD;
    let mut total: u64 = 0;

    for index in 0..chunk_count {
        let sealed_len = read_u32(reader)? as usize;
        if sealed_len < SEAL_OVERHEAD || sealed_len > max_sealed {
            return Err(VaultError::Malformed(format!(
                "chunk {index} sealed length {sealed_len} out of range"
            )));
        }
        // Only the final chunk may run short; anything else means the
        // header's chunk size was altered or a chunk was resized.
        if index + 1 < chunk_count && sealed_len != max_sealed {
            return Err(VaultError::Malformed(format!(
                "non-final chunk {index} is not a full chunk"
            )));
        }

        let mut sealed = vec![0u8; sealed_len];
        reader.read_exact(&mut sealed).map_err(decode_io)?;

        let expected = chunk_nonce(&prefix, index);
        if sealed[..NONCE_SIZE] != expected {
            return Err(VaultError::NonceMismatch { index });
        }

        let plaintext = coffer_crypto::open(key, &sealed).map_err(|e| match e {
            CryptoError::AuthFailure => VaultError::AuthFailure,
            other => VaultError::Crypto(other),
        })?;
        writer.write_all(&plaintext)?;
        total += plaintext.len() as u64;
    }

    let mut probe = [0u8; 1];
    loop {
        match reader.read(&mut probe) {
            Ok(0) => break,
            Ok(_) => return Err(VaultError::TrailingGarbage),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(VaultError::Io(e)),
        }
    }

    if total != original_size {
        return Err(VaultError::SizeMismatch {
            expected: original_size,
            actual: total,
        });
    }

    writer.flush()?;
    Ok(total)
}

/// Encrypt the file at `source` into a container at `dest`.
///
/// The container is written to a temp file next to `dest` and renamed into
/// place on success, so `dest` either holds a complete container or
/// nothing. Returns the plaintext byte count.
pub fn encrypt_file(
    key: &SecretKey,
    source: &Path,
    dest: &Path,
    chunk_size: u32,
) -> VaultResult<u64> {
    let mut reader = BufReader::new(File::open(source)?);

    let parent = dest.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "destination path has no parent")
    })?;
    let mut tmp = NamedTempFile::new_in(parent)?;

    let total = {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        encrypt_stream(key, &mut reader, &mut writer, chunk_size)?
    };

    tmp.as_file_mut().sync_all()?;
    tmp.persist(dest).map_err(|e| VaultError::Io(e.error))?;
    Ok(total)
}

/// Decrypt the container at `source` into a plaintext file at `dest`.
///
/// Plaintext goes to a temp file next to `dest` and is renamed only after
/// the whole container verifies; any failure drops the temp file and
/// leaves `dest` absent.
pub fn decrypt_file(key: &SecretKey, source: &Path, dest: &Path) -> VaultResult<u64> {
    let mut reader = BufReader::new(File::open(source)?);

    let parent = dest.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "destination path has no parent")
    })?;
    let mut tmp = NamedTempFile::new_in(parent)?;

    let total = {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        decrypt_stream(key, &mut reader, &mut writer)?
    };

    tmp.as_file_mut().sync_all()?;
    tmp.persist(dest).map_err(|e| VaultError::Io(e.error))?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn nonce_is_prefix_plus_counter() {
        let prefix = [0xAB; NONCE_PREFIX_LEN];
        let nonce = chunk_nonce(&prefix, 0x01020304);
        assert_eq!(&nonce[..8], &prefix);
        assert_eq!(&nonce[8..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn header_layout_is_byte_exact() {
        let key = SecretKey::generate();
        let mut out = Cursor::new(Vec::new());
        encrypt_stream(&key, &mut Cursor::new(b"hello\n".to_vec()), &mut out, 1024).unwrap();

        let bytes = out.into_inner();
        assert_eq!(&bytes[..5], b"PVLT1");
        assert_eq!(u32::from_be_bytes(bytes[5..9].try_into().unwrap()), 1024);
        assert_eq!(u64::from_be_bytes(bytes[17..25].try_into().unwrap()), 6);
        assert_eq!(u32::from_be_bytes(bytes[25..29].try_into().unwrap()), 1);
        // 4-byte length + 12-byte nonce + 6-byte ct + 16-byte tag
        assert_eq!(bytes.len(), HEADER_LEN + 4 + 6 + SEAL_OVERHEAD);
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let key = SecretKey::generate();
        let mut out = Cursor::new(Vec::new());
        let err = encrypt_stream(&key, &mut Cursor::new(vec![]), &mut out, 0).unwrap_err();
        assert!(matches!(err, VaultError::InvalidChunkSize));
    }

    #[test]
    fn oversized_chunk_size_rejected() {
        let key = SecretKey::generate();
        let mut out = Cursor::new(Vec::new());
        let err =
            encrypt_stream(&key, &mut Cursor::new(vec![]), &mut out, u32::MAX).unwrap_err();
        assert!(matches!(err, VaultError::InvalidChunkSize));
    }
}
