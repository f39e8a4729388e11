//! ETag computation and comparison.
//!
//! S3 computes the ETag of a singlepart object as the plain hex MD5 of its
//! content. For a multipart upload, the ETag is instead the hex MD5 of the
//! concatenation of each part's raw MD5 digest, followed by `-{part_count}`.
//! Comparing a freshly-downloaded local file against a remote ETag therefore
//! means first checking whether the ETag looks multipart, and if so, finding
//! a part size that reproduces it.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};

/// Part sizes multipart uploads are commonly split at. There is no way to
/// recover the exact size used by a given upload from the ETag alone, so
/// comparison tries each of these in turn.
const CANDIDATE_PART_SIZES: &[u64] = &[
    8 * 1024 * 1024,
    16 * 1024 * 1024,
    32 * 1024 * 1024,
    64 * 1024 * 1024,
    100 * 1024 * 1024,
];

/// The plain hex MD5 of a file's contents, as S3 would report it for a
/// singlepart object.
pub fn local_etag(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// The multipart ETag a file would have if uploaded in `part_size`-sized
/// chunks: MD5-of-part-MD5s, suffixed with the part count.
fn local_multipart_etag(path: &Path, part_size: u64) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; usize::try_from(part_size).unwrap_or(usize::MAX)];
    let mut part_digests = Vec::new();

    loop {
        let mut filled = 0;
        while filled < buf.len() {
            let read = file.read(&mut buf[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        if filled == 0 {
            break;
        }
        part_digests.push(Md5::digest(&buf[..filled]));
        if filled < buf.len() {
            break;
        }
    }

    let mut combined = Md5::new();
    for digest in &part_digests {
        combined.update(digest);
    }
    Ok(format!("{}-{}", hex::encode(combined.finalize()), part_digests.len()))
}

/// Parse the part count out of a multipart ETag (`"<hex>-<count>"`), if it
/// looks like one.
fn multipart_part_count(remote_etag: &str) -> Option<usize> {
    let (_, count) = remote_etag.rsplit_once('-')?;
    count.parse().ok()
}

/// Compare a remote ETag (as returned by [`crate::ObjectStore::etag`],
/// quotes already stripped) against the local file at `path`.
pub fn matches(remote_etag: &str, path: &Path) -> io::Result<bool> {
    let Some(expected_parts) = multipart_part_count(remote_etag) else {
        return Ok(local_etag(path)? == remote_etag);
    };

    for &part_size in CANDIDATE_PART_SIZES {
        let candidate = local_multipart_etag(path, part_size)?;
        if candidate == remote_etag {
            return Ok(true);
        }
        let Some(candidate_parts) = multipart_part_count(&candidate) else {
            continue;
        };
        if candidate_parts > expected_parts {
            // Larger part sizes only produce fewer parts; no point trying
            // smaller candidates below this one.
            break;
        }
    }
    Ok(false)
}
