//! String stream codec (§4.6): plain, single-dictionary, FSST-compressed
//! dictionary, and shared-dictionary layouts.
//!
//! Each layout is exposed as a pure function over already-decoded pieces
//! (UTF-8 bytes, length/offset integer arrays) so the higher-level property
//! and tileset-driven assembly code only needs to route streams by their
//! `StreamMetadata` tag to the right helper here.

use crate::bitset::PackedBitset;
use crate::codec::fsst::{self, SymbolTable};
use crate::error::{Error, Result};

/// Turn a length array into `len+1` cumulative offsets, `offsets[0] == 0`.
fn cumulative_offsets(lengths: &[u32]) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(lengths.len() + 1);
    let mut running = 0_u32;
    offsets.push(0);

    for &length in lengths {
        running += length;
        offsets.push(running);
    }

    offsets
}

fn slice_utf8(bytes: &[u8], start: u32, end: u32) -> Result<String> {
    let slice = bytes.get(start as usize..end as usize).ok_or_else(|| {
        Error::end_of_buffer(format!("string slice [{}, {}) is out of range of {} bytes", start, end, bytes.len()))
    })?;

    std::str::from_utf8(slice)
        .map(str::to_owned)
        .map_err(|e| Error::metadata_mismatch(format!("string bytes are not valid UTF-8: {}", e)))
}

/// Decode the plain layout: one string per feature directly out of the UTF-8
/// blob. When `explicit_offsets` is `None`, offsets are the running
/// cumulative sum of `lengths` (offset_0 = 0) -- *not* `lengths[i]` taken in
/// isolation, which would silently reuse byte 0 as every string's start.
pub fn decode_plain(utf8: &[u8], lengths: &[u32], explicit_offsets: Option<&[u32]>) -> Result<Vec<String>> {
    let owned_offsets;
    let offsets: &[u32] = match explicit_offsets {
        Some(offsets) => offsets,
        None => {
            owned_offsets = cumulative_offsets(lengths);
            &owned_offsets[..lengths.len()]
        }
    };

    if offsets.len() != lengths.len() {
        return Err(Error::count_mismatch(format!(
            "plain string layout has {} offsets but {} lengths", offsets.len(), lengths.len()
        )));
    }

    offsets
        .iter()
        .zip(lengths)
        .map(|(&offset, &length)| slice_utf8(utf8, offset, offset + length))
        .collect()
}

/// Decode a dictionary's entries from its concatenated UTF-8 bytes and their
/// individual lengths (cumulative offsets derived the same way as `decode_plain`).
pub fn decode_dictionary_entries(utf8: &[u8], dictionary_lengths: &[u32]) -> Result<Vec<String>> {
    let offsets = cumulative_offsets(dictionary_lengths);

    (0..dictionary_lengths.len())
        .map(|i| slice_utf8(utf8, offsets[i], offsets[i + 1]))
        .collect()
}

/// Resolve per-feature dictionary indices (the `OFFSET/STRING` stream, in
/// this layout a dictionary index rather than a byte offset) into strings.
pub fn resolve_dictionary_indices(dictionary: &[String], indices: &[u32]) -> Result<Vec<String>> {
    indices
        .iter()
        .map(|&index| {
            dictionary.get(index as usize).cloned().ok_or_else(|| {
                Error::geometry(format!("dictionary index {} out of range ({} entries)", index, dictionary.len()))
            })
        })
        .collect()
}

/// Decode the single-dictionary layout end to end: build the dictionary,
/// then resolve every feature's index into it.
pub fn decode_single_dictionary(utf8: &[u8], dictionary_lengths: &[u32], indices: &[u32]) -> Result<Vec<String>> {
    let dictionary = decode_dictionary_entries(utf8, dictionary_lengths)?;
    resolve_dictionary_indices(&dictionary, indices)
}

/// Decode the FSST-compressed dictionary layout: FSST-decompress the whole
/// dictionary blob in one pass (symbol codes carry no positional framing, so
/// entry boundaries are irrelevant to the decompression itself), then split
/// and resolve exactly as the plain dictionary layout does.
pub fn decode_fsst_dictionary(
    compressed: &[u8],
    table: &SymbolTable,
    dictionary_lengths: &[u32],
    indices: &[u32],
) -> Result<Vec<String>> {
    let plain = fsst::decode(compressed, table)?;
    decode_single_dictionary(&plain, dictionary_lengths, indices)
}

/// Decode a shared-dictionary column: one dictionary built once per feature
/// table, with each present feature in this column looking up its own index;
/// absent features contribute `None`.
pub fn decode_shared_dictionary_column(
    dictionary: &[String],
    indices: &[u32],
    present: &PackedBitset,
) -> Result<Vec<Option<String>>> {
    if indices.len() != present.popcount() {
        return Err(Error::count_mismatch(format!(
            "shared dictionary column has {} indices but {} present features", indices.len(), present.popcount()
        )));
    }

    let mut resolved = Vec::with_capacity(present.len());
    let mut cursor = 0;

    for feature in 0..present.len() {
        if present.test(feature) {
            let index = indices[cursor];
            cursor += 1;

            let value = dictionary.get(index as usize).cloned().ok_or_else(|| {
                Error::geometry(format!("shared dictionary index {} out of range ({} entries)", index, dictionary.len()))
            })?;
            resolved.push(Some(value));
        } else {
            resolved.push(None);
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_layout_decodes_without_explicit_offsets() {
        let utf8 = b"residentialservicefootway";
        let lengths = [11, 7, 7];

        let decoded = decode_plain(utf8, &lengths, None).unwrap();
        assert_eq!(decoded, vec!["residential", "service", "footway"]);
    }

    #[test]
    fn plain_layout_honors_explicit_offsets() {
        let utf8 = b"xxresidentialxxservice";
        let offsets = [2, 13];
        let lengths = [11, 7];

        let decoded = decode_plain(utf8, &lengths, Some(&offsets)).unwrap();
        assert_eq!(decoded, vec!["residential", "service"]);
    }

    #[test]
    fn single_dictionary_layout_resolves_repeated_indices() {
        let utf8 = b"residentialservice";
        let dictionary_lengths = [11, 7];
        let indices = [0, 1, 0, 0, 1];

        let decoded = decode_single_dictionary(utf8, &dictionary_lengths, &indices).unwrap();
        assert_eq!(decoded, vec!["residential", "service", "residential", "residential", "service"]);
    }

    #[test]
    fn fsst_dictionary_layout_round_trips_through_compression() {
        let dictionary_plain = b"residentialserviceresidentialfootway";
        let (table, compressed) = fsst::build_and_compress(dictionary_plain);
        let dictionary_lengths = [11, 7, 11, 7];
        let indices = [2, 0, 3];

        let decoded = decode_fsst_dictionary(&compressed, &table, &dictionary_lengths, &indices).unwrap();
        assert_eq!(decoded, vec!["residential", "residential", "footway"]);
    }

    #[test]
    fn shared_dictionary_skips_absent_features() {
        let dictionary = vec!["a".to_string(), "b".to_string()];
        let present = PackedBitset::from_bytes(vec![0b0000_0101], 4);
        let indices = [0, 1];

        let decoded = decode_shared_dictionary_column(&dictionary, &indices, &present).unwrap();
        assert_eq!(decoded, vec![Some("a".to_string()), None, Some("b".to_string()), None]);
    }

    #[test]
    fn out_of_range_dictionary_index_is_an_error() {
        let dictionary = vec!["a".to_string()];
        assert!(resolve_dictionary_indices(&dictionary, &[5]).is_err());
    }
}
